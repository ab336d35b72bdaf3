use std::num::NonZeroUsize;

use crate::{Result, SchedulerErr};

/// Immutable bounds of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingConfig {
    epochs: NonZeroUsize,
    batch_size: NonZeroUsize,
    shuffle: Option<u64>,
}

impl TrainingConfig {
    /// Creates a new training configuration that visits the samples in their stored order.
    ///
    /// # Args
    /// * `epochs` - Number of passes over the training set.
    /// * `batch_size` - Number of samples per step, the last batch of an epoch may be smaller.
    ///
    /// # Returns
    /// A `TrainingConfig` or `SchedulerErr::Config` if either value is zero.
    pub fn new(epochs: usize, batch_size: usize) -> Result<Self> {
        let epochs = NonZeroUsize::new(epochs)
            .ok_or_else(|| SchedulerErr::Config("epochs must be greater than 0".into()))?;
        let batch_size = NonZeroUsize::new(batch_size)
            .ok_or_else(|| SchedulerErr::Config("batch size must be greater than 0".into()))?;

        Ok(Self {
            epochs,
            batch_size,
            shuffle: None,
        })
    }

    /// Reshuffles the sample order at the start of every epoch, never within one.
    ///
    /// # Args
    /// * `seed` - Seed of the permutations, the same seed yields the same order.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = Some(seed);
        self
    }

    pub fn epochs(&self) -> usize {
        self.epochs.get()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    pub fn shuffle(&self) -> Option<u64> {
        self.shuffle
    }

    /// The amount of steps of one epoch over `samples` samples.
    pub fn batches_per_epoch(&self, samples: usize) -> usize {
        samples.div_ceil(self.batch_size())
    }
}
