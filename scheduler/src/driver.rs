use log::{debug, info};
use machine_learning::{Evaluation, Model};
use tokio_util::sync::CancellationToken;

use crate::{EpochMetrics, LogSink, Result, SessionState, TrainingSession};

/// What a `drive` call observed until the session left `Running`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub state: SessionState,
    /// The steps performed by this call.
    pub steps: usize,
    /// The metrics of the epochs closed by this call.
    pub epochs: Vec<EpochMetrics>,
    pub validation: Option<Evaluation>,
}

/// Re-invokes `step` until the session completes, fails or `cancel` fires.
///
/// Yields to the runtime between steps, never within one, so other tasks on the same thread make
/// progress while training. Cancellation is observed before every step and stops the session.
///
/// # Args
/// * `session` - The session to advance, usually fresh from `TrainingScheduler::start`.
/// * `sink` - Receives the user facing progress lines.
/// * `cancel` - Stops the run at the next step boundary.
///
/// # Returns
/// A `RunSummary` once the session is completed or stopped, or the training error after writing
/// it to `sink`.
pub async fn drive<M, S>(
    session: &mut TrainingSession<M>,
    sink: &mut S,
    cancel: &CancellationToken,
) -> Result<RunSummary>
where
    M: Model,
    S: LogSink + ?Sized,
{
    let epochs = session.config().epochs();
    let mut summary = RunSummary {
        state: session.state(),
        steps: 0,
        epochs: Vec::new(),
        validation: None,
    };

    while session.is_running() {
        if cancel.is_cancelled() {
            debug!("training cancelled");
            session.stop();
            break;
        }

        let progress = session.progress();
        if progress.batch == 0 {
            sink.write(&format!("【 epoch {}/{epochs} 】", progress.epoch + 1));
        }

        let result = match session.step() {
            Ok(result) => result,
            Err(e) => {
                sink.write(&format!("training failed: {e}"));
                return Err(e);
            }
        };

        summary.steps += 1;

        if let Some(metrics) = result.epoch_metrics {
            sink.write(&format!(
                "epoch {}/{epochs} loss: {:.4} accuracy: {:.4}",
                metrics.epoch + 1,
                metrics.loss,
                metrics.accuracy
            ));
            summary.epochs.push(metrics);
        }

        if let Some(eval) = result.validation {
            sink.write(&format!("accuracy: {:.4}", eval.accuracy));
            sink.write(&format!("loss: {:.4}", eval.loss));
            summary.validation = Some(eval);
        }

        if result.completed {
            break;
        }

        tokio::task::yield_now().await;
    }

    summary.state = session.state();
    match summary.state {
        SessionState::Completed => sink.write("training finished"),
        SessionState::Stopped => sink.write("training stopped"),
        _ => {}
    }

    info!(steps = summary.steps; "drive finished, session {}", summary.state);

    Ok(summary)
}
