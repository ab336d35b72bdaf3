use anyhow::{Context, Result};
use codec::ParameterCodec;
use log::{info, warn};
use machine_learning::{
    Model,
    arch::{argmax, builder::{CLASSES, INPUT_SHAPE}},
    preprocessing::preprocess,
};
use scheduler::{Console, SharedModel, TrainingScheduler, drive};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::{Capture, DatasetSource, JudgeConfig};

mod config;
mod load;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let path = config::config_path();
    let config = JudgeConfig::load(&path)?;
    info!(seed = config.seed; "loaded {path}, building {:?}", config.model);

    let model = SharedModel::new(config.model.build(config.seed)?);

    if let Some(weights) = &config.weights {
        let bytes = load::read_blob(weights)?;
        let blob = ParameterCodec::decode(&bytes)
            .with_context(|| format!("malformed weights '{}'", weights.display()))?;
        model.bind(&blob)?;
        info!(layers = blob.len(); "weights bound");
    }

    if let Some(train) = &config.train {
        train_model(&model, &config, train).await?;
    }

    if let Some(capture) = &config.capture {
        judge(&model, capture)?;
    }

    Ok(())
}

async fn train_model<M: Model>(
    model: &SharedModel<M>,
    config: &JudgeConfig,
    train: &DatasetSource,
) -> Result<()> {
    let training = config.training()?;
    let train = load::read_dataset(train)?;
    let validation = config
        .validation
        .as_ref()
        .map(load::read_dataset)
        .transpose()?;

    let mut session = TrainingScheduler::start_with(model, train, validation, training)?;
    let mut console = Console::new(config.console_lines).echo();

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("received SIGINT, stopping after the current step");
                token.cancel();
            }
            Err(e) => warn!("can't listen for ctrl-c: {e}"),
        }
    });

    let summary = drive(&mut session, &mut console, &cancel).await?;

    if let Some(export) = &config.export {
        let bytes = ParameterCodec::encode(&model.snapshot()?)?;
        load::write_blob(export, &bytes)?;
        info!(bytes = bytes.len(), steps = summary.steps; "weights exported to {}", export.display());
    }

    Ok(())
}

fn judge<M: Model>(model: &SharedModel<M>, capture: &Capture) -> Result<()> {
    let pixels = std::fs::read(&capture.path)
        .with_context(|| format!("cannot read capture '{}'", capture.path.display()))?;
    let x = preprocess(&pixels, capture.width, capture.height, &INPUT_SHAPE)
        .context("the capture doesn't match the model input")?;

    let y = model.predict(&x)?;
    let probabilities = y.as_slice();

    for (digit, p) in probabilities.iter().enumerate() {
        println!("{digit}: {:.2}%", p * 100.);
    }

    println!("prediction: {}", argmax(y.rows(CLASSES)?.row(0)));
    Ok(())
}
