use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use machine_learning::arch::builder::{self, Classifier};
use scheduler::TrainingConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG: &str = "judge.json";

const DEFAULT_EPOCHS: usize = 3;
const DEFAULT_BATCH_SIZE: usize = 32;
const DEFAULT_CONSOLE_LINES: usize = 256;

/// The fixed architectures the judge knows how to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Mlp,
    ConvNet,
}

impl ModelKind {
    pub fn build(self, seed: u64) -> Result<Classifier> {
        let model = match self {
            ModelKind::Mlp => builder::mlp(seed)?,
            ModelKind::ConvNet => builder::conv_net(seed)?,
        };

        Ok(model)
    }
}

/// Where a dataset lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum DatasetSource {
    /// `label,p0,...,p783` rows, an optional header line.
    Csv { path: PathBuf },
    /// One byte per pixel and one byte per label, samples back to back.
    Raw { pixels: PathBuf, labels: PathBuf },
}

/// A raw RGBA capture of the drawing surface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Capture {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
}

/// The judge's run description, read from a json file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JudgeConfig {
    pub model: ModelKind,
    pub seed: u64,
    /// Parameters bound before training or judging, raw or base64 (`.txt`, `.b64`).
    pub weights: Option<PathBuf>,
    pub train: Option<DatasetSource>,
    pub validation: Option<DatasetSource>,
    pub epochs: usize,
    pub batch_size: usize,
    /// Seed of the epoch reshuffling, the stored order is used when absent.
    pub shuffle: Option<u64>,
    /// Where to write the parameters after training.
    pub export: Option<PathBuf>,
    pub capture: Option<Capture>,
    pub console_lines: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            seed: 0,
            weights: None,
            train: None,
            validation: None,
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            shuffle: None,
            export: None,
            capture: None,
            console_lines: DEFAULT_CONSOLE_LINES,
        }
    }
}

impl JudgeConfig {
    /// Reads the configuration at `path` and applies the `JUDGE_EPOCHS` and `JUDGE_BATCH_SIZE`
    /// overrides.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("cannot read config '{path}'"))?;
        let mut config = Self::parse(&content)?;

        if let Ok(epochs) = env::var("JUDGE_EPOCHS") {
            config.epochs = epochs
                .parse()
                .with_context(|| format!("invalid JUDGE_EPOCHS '{epochs}'"))?;
        }

        if let Ok(batch_size) = env::var("JUDGE_BATCH_SIZE") {
            config.batch_size = batch_size
                .parse()
                .with_context(|| format!("invalid JUDGE_BATCH_SIZE '{batch_size}'"))?;
        }

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).context("invalid config json")?;

        if config.train.is_none() && config.weights.is_none() {
            bail!("the config needs either a training set or weights to load");
        }

        if config.export.is_some() && config.train.is_none() {
            bail!("there's nothing to export without training");
        }

        Ok(config)
    }

    pub fn training(&self) -> Result<TrainingConfig> {
        let config = TrainingConfig::new(self.epochs, self.batch_size)?;

        Ok(match self.shuffle {
            Some(seed) => config.with_shuffle(seed),
            None => config,
        })
    }
}

/// The path of the config file: the first argument, then `JUDGE_CONFIG`.
pub fn config_path() -> String {
    env::args()
        .nth(1)
        .or_else(|| env::var("JUDGE_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = JudgeConfig::parse(r#"{ "train": { "format": "csv", "path": "train.csv" } }"#)
            .unwrap();

        assert_eq!(config.model, ModelKind::Mlp);
        assert_eq!(config.epochs, DEFAULT_EPOCHS);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.console_lines, DEFAULT_CONSOLE_LINES);
        assert_eq!(
            config.train,
            Some(DatasetSource::Csv {
                path: "train.csv".into()
            })
        );
    }

    #[test]
    fn full_configs_parse() {
        let config = JudgeConfig::parse(
            r#"{
                "model": "conv_net",
                "weights": "conv.marshal.txt",
                "capture": { "path": "digit.rgba", "width": 28, "height": 28 },
                "validation": { "format": "raw", "pixels": "x.bin", "labels": "y.bin" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.model, ModelKind::ConvNet);
        assert_eq!(config.capture.map(|c| c.width), Some(28));
        assert!(matches!(config.validation, Some(DatasetSource::Raw { .. })));
    }

    #[test]
    fn configs_without_work_are_rejected() {
        assert!(JudgeConfig::parse("{}").is_err());
        assert!(JudgeConfig::parse(r#"{ "weights": "w.bin", "export": "out.bin" }"#).is_err());
        assert!(JudgeConfig::parse(r#"{ "weights": "w.bin", "epoch": 3 }"#).is_err());
    }

    #[test]
    fn zero_epochs_fail_when_training() {
        let config = JudgeConfig {
            epochs: 0,
            ..JudgeConfig::default()
        };

        assert!(config.training().is_err());
    }
}
