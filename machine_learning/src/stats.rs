/// The outcome of a single optimization step over one batch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatchStats {
    /// The mean loss over the batch.
    pub loss: f32,
    /// The amount of samples whose top-1 prediction matched the label.
    pub correct: usize,
    pub samples: usize,
}

/// The metrics of a model over a whole dataset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Evaluation {
    pub accuracy: f32,
    pub loss: f32,
}
