use crate::Result;

/// An optimization algorithm: it turns a gradient into a parameter update.
pub trait Optimizer {
    /// Updates `params` in place according to the algorithm's learning rule.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient of the loss with respect to `params`.
    ///
    /// # Returns
    /// An error if `params` and `grad` (or the optimizer's own state) differ in length.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}
