use crate::networks::Network;

/// The activation function applied at every non-input node.
///
/// Blanket-implemented for any `Fn(f32) -> f32`, so plain functions
/// and closures can be passed directly:
///
/// ```
/// use neatwork::ActivationFunction;
///
/// fn sigmoid(x: f32) -> f32 {
///     1.0 / (1.0 + (-4.9 * x).exp())
/// }
///
/// let activation: &dyn ActivationFunction = &sigmoid;
/// assert!((activation.apply(0.0) - 0.5).abs() < f32::EPSILON);
/// ```
pub trait ActivationFunction {
    /// Maps a node's summed input to its output value.
    fn apply(&self, x: f32) -> f32;
}

impl<T: Fn(f32) -> f32> ActivationFunction for T {
    fn apply(&self, x: f32) -> f32 {
        self(x)
    }
}

/// The host-supplied measure of how well a network performs.
///
/// Fitness values must be finite and are expected to be
/// non-negative; higher is better. Each genome is evaluated exactly
/// once, the result is cached for the rest of its life.
pub trait FitnessFunction {
    /// Scores a candidate network.
    fn fitness(&mut self, network: &Network<'_>) -> f32;

    /// Called once per generation with the generation's champion.
    ///
    /// The default implementation does nothing. Hosts can override
    /// it to track progress or drive a visualization.
    fn generation_finished(&mut self, champion: &Network<'_>) {
        let _ = champion;
    }
}
