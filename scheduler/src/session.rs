use std::fmt;

use log::{debug, info, warn};
use machine_learning::{BatchStats, Dataset, Evaluation, Model};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{
    Result, SchedulerErr, TrainingConfig,
    shared::{Lease, SharedModel},
};

/// Lifecycle of a training session. Only `Running` accepts steps, every other state is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Completed,
    Stopped,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Running => "running",
            SessionState::Completed => "completed",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        };

        f.write_str(s)
    }
}

/// The aggregate metrics of one finished epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochMetrics {
    /// Zero based index of the epoch.
    pub epoch: usize,
    /// Mean of the batch losses weighted by their amount of samples.
    pub loss: f32,
    /// Correct top-1 predictions over the samples of the epoch.
    pub accuracy: f32,
    pub samples: usize,
}

/// The outcome of a single `TrainingSession::step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// The epoch the step belonged to.
    pub epoch: usize,
    /// The index of the batch within its epoch.
    pub batch: usize,
    pub samples: usize,
    pub loss: f32,
    /// Whether this step closed its epoch.
    pub epoch_advanced: bool,
    /// Whether this step closed the last epoch.
    pub completed: bool,
    pub epoch_metrics: Option<EpochMetrics>,
    /// Validation metrics, only on completion and if a validation set was given.
    pub validation: Option<Evaluation>,
}

/// A snapshot of how far a session got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub epoch: usize,
    pub epochs: usize,
    pub batch: usize,
    pub batches_per_epoch: usize,
    pub steps: usize,
    pub total_steps: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct EpochTotals {
    loss_sum: f64,
    correct: usize,
    samples: usize,
}

impl EpochTotals {
    fn add(&mut self, stats: &BatchStats) {
        self.loss_sum += stats.loss as f64 * stats.samples as f64;
        self.correct += stats.correct;
        self.samples += stats.samples;
    }

    fn close(self, epoch: usize) -> EpochMetrics {
        let samples = self.samples.max(1) as f64;

        EpochMetrics {
            epoch,
            loss: (self.loss_sum / samples) as f32,
            accuracy: (self.correct as f64 / samples) as f32,
            samples: self.samples,
        }
    }
}

/// Starts training sessions.
pub struct TrainingScheduler;

impl TrainingScheduler {
    /// Starts a session that visits the samples in their stored order.
    ///
    /// # Args
    /// * `model` - The model to train, owned by the session until it stops running.
    /// * `train` - The training set, at least one sample.
    /// * `validation` - Evaluated once the last epoch finishes.
    /// * `epochs` - Number of passes over `train`.
    /// * `batch_size` - Samples per step.
    ///
    /// # Errors
    /// `SchedulerErr::Config` on invalid arguments, `SchedulerErr::State` if the model is
    /// already being trained.
    pub fn start<M: Model>(
        model: &SharedModel<M>,
        train: Dataset,
        validation: Option<Dataset>,
        epochs: usize,
        batch_size: usize,
    ) -> Result<TrainingSession<M>> {
        let config = TrainingConfig::new(epochs, batch_size)?;
        Self::start_with(model, train, validation, config)
    }

    /// Starts a session with an already validated configuration.
    pub fn start_with<M: Model>(
        model: &SharedModel<M>,
        train: Dataset,
        validation: Option<Dataset>,
        config: TrainingConfig,
    ) -> Result<TrainingSession<M>> {
        if train.is_empty() {
            return Err(SchedulerErr::Config(
                "the training set has no samples".into(),
            ));
        }

        let lease = model.lease()?;
        {
            let model = lease.model()?;

            for (name, set) in [("training", Some(&train)), ("validation", validation.as_ref())] {
                let Some(set) = set else { continue };

                if set.features() != model.input_size() || set.classes() != model.output_size() {
                    return Err(SchedulerErr::Config(format!(
                        "the {name} set has {} features and {} classes, the model expects {} and {}",
                        set.features(),
                        set.classes(),
                        model.input_size(),
                        model.output_size()
                    )));
                }
            }
        }

        let mut session = TrainingSession {
            lease: Some(lease),
            train,
            validation,
            config,
            state: SessionState::Running,
            epoch: 0,
            batch: 0,
            cursor: 0,
            steps: 0,
            totals: EpochTotals::default(),
            order: None,
            rng: config.shuffle().map(StdRng::seed_from_u64),
            history: Vec::new(),
        };
        session.reshuffle();

        info!(
            epochs = config.epochs(),
            batch_size = config.batch_size(),
            samples = session.train.len();
            "training started"
        );

        Ok(session)
    }
}

/// The state of one training run, advanced one batch per `step`.
pub struct TrainingSession<M> {
    lease: Option<Lease<M>>,
    train: Dataset,
    validation: Option<Dataset>,
    config: TrainingConfig,
    state: SessionState,
    epoch: usize,
    batch: usize,
    cursor: usize,
    steps: usize,
    totals: EpochTotals,
    order: Option<Vec<usize>>,
    rng: Option<StdRng>,
    history: Vec<EpochMetrics>,
}

impl<M: Model> TrainingSession<M> {
    /// Performs exactly one mini-batch update.
    ///
    /// Closing the last batch of an epoch computes its metrics and, after the last epoch,
    /// evaluates the validation set and completes the session.
    ///
    /// # Errors
    /// `SchedulerErr::State` without touching the session if it's not running.
    /// `SchedulerErr::Training` if the model fails, the session ends as `Failed`.
    pub fn step(&mut self) -> Result<StepResult> {
        if self.state != SessionState::Running {
            return Err(SchedulerErr::State(format!(
                "can't step a {} session",
                self.state
            )));
        }

        let n = self.train.len();
        let end = (self.cursor + self.config.batch_size()).min(n);

        let stats = match self.train_batch(self.cursor, end) {
            Ok(stats) => stats,
            Err(SchedulerErr::Training(e)) => {
                warn!(epoch = self.epoch, batch = self.batch; "training step failed: {e}");
                self.finish(SessionState::Failed);
                return Err(SchedulerErr::Training(e));
            }
            Err(e) => return Err(e),
        };

        self.totals.add(&stats);
        let mut result = StepResult {
            epoch: self.epoch,
            batch: self.batch,
            samples: stats.samples,
            loss: stats.loss,
            epoch_advanced: false,
            completed: false,
            epoch_metrics: None,
            validation: None,
        };

        debug!(epoch = self.epoch, batch = self.batch, loss = stats.loss; "training step");

        self.steps += 1;
        self.batch += 1;
        self.cursor = end;

        if self.cursor < n {
            return Ok(result);
        }

        let metrics = std::mem::take(&mut self.totals).close(self.epoch);
        info!(
            epoch = metrics.epoch,
            loss = metrics.loss,
            accuracy = metrics.accuracy;
            "epoch finished"
        );

        self.history.push(metrics);
        self.epoch += 1;
        self.batch = 0;
        self.cursor = 0;
        result.epoch_advanced = true;
        result.epoch_metrics = Some(metrics);

        if self.epoch < self.config.epochs() {
            self.reshuffle();
            return Ok(result);
        }

        result.validation = match self.validate() {
            Ok(validation) => validation,
            Err(e) => {
                warn!("validation failed: {e}");
                self.finish(SessionState::Failed);
                return Err(e);
            }
        };

        result.completed = true;
        self.finish(SessionState::Completed);
        info!(steps = self.steps; "training completed");

        Ok(result)
    }

    /// Ends the run, it takes effect before the next `step`. Idempotent, it doesn't change an
    /// already finished session.
    pub fn stop(&mut self) {
        if self.state == SessionState::Running {
            info!(epoch = self.epoch, batch = self.batch; "training stopped");
            self.finish(SessionState::Stopped);
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// The metrics of every finished epoch, in order.
    pub fn history(&self) -> &[EpochMetrics] {
        &self.history
    }

    pub fn progress(&self) -> Progress {
        let batches_per_epoch = self.config.batches_per_epoch(self.train.len());

        Progress {
            epoch: self.epoch,
            epochs: self.config.epochs(),
            batch: self.batch,
            batches_per_epoch,
            steps: self.steps,
            total_steps: batches_per_epoch * self.config.epochs(),
        }
    }

    fn train_batch(&self, start: usize, end: usize) -> Result<BatchStats> {
        let lease = self
            .lease
            .as_ref()
            .ok_or_else(|| SchedulerErr::State("the session doesn't own its model".into()))?;
        let mut model = lease.model()?;

        let stats = match &self.order {
            Some(order) => {
                let batch = self.train.gather(&order[start..end]);
                model.train_step(batch.inputs(), batch.labels())
            }
            None => {
                let (x, y) = self.train.batch(start..end);
                model.train_step(x, y)
            }
        };

        stats.map_err(SchedulerErr::Training)
    }

    fn validate(&self) -> Result<Option<Evaluation>> {
        let Some(validation) = self.validation.as_ref().filter(|set| !set.is_empty()) else {
            return Ok(None);
        };

        let lease = self
            .lease
            .as_ref()
            .ok_or_else(|| SchedulerErr::State("the session doesn't own its model".into()))?;
        let mut model = lease.model()?;

        let eval = model
            .evaluate(validation.inputs(), validation.labels())
            .map_err(SchedulerErr::Training)?;
        info!(accuracy = eval.accuracy, loss = eval.loss; "validation finished");

        Ok(Some(eval))
    }

    /// Draws a new sample order for the next epoch, when shuffling.
    fn reshuffle(&mut self) {
        let Some(rng) = self.rng.as_mut() else {
            return;
        };

        let order = self
            .order
            .get_or_insert_with(|| (0..self.train.len()).collect());
        order.shuffle(rng);
    }

    fn finish(&mut self, state: SessionState) {
        self.state = state;
        self.lease = None;
    }
}

impl<M> Drop for TrainingSession<M> {
    fn drop(&mut self) {
        if self.state == SessionState::Running {
            debug!("dropping a running training session");
        }
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::arch::builder::{self, CLASSES, INPUT_SIZE};
    use ndarray::Array2;

    use super::*;

    fn blank(samples: usize) -> Dataset {
        let y = Array2::from_shape_fn((samples, CLASSES), |(_, j)| (j == 0) as u8 as f32);
        Dataset::new(Array2::zeros((samples, INPUT_SIZE)), y).unwrap()
    }

    #[test]
    fn validation_reports_a_busy_model() {
        let model = SharedModel::new(builder::mlp(0).unwrap());
        let session =
            TrainingScheduler::start(&model, blank(2), Some(blank(2)), 1, 2).unwrap();

        let lease = session.lease.as_ref().unwrap();
        let _busy = lease.model().unwrap();

        assert!(matches!(session.validate(), Err(SchedulerErr::State(_))));
    }

    #[test]
    fn validation_without_a_set_is_skipped() {
        let model = SharedModel::new(builder::mlp(0).unwrap());
        let session = TrainingScheduler::start(&model, blank(2), None, 1, 2).unwrap();

        assert!(matches!(session.validate(), Ok(None)));
    }
}
