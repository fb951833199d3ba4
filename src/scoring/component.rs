use super::params::ParameterMap;
use super::record::InputRecord;

/// One additive scoring unit.
///
/// A component declares its tunable numeric parameters explicitly through
/// [`parameters`](ScoringComponent::parameters) and accepts them back through
/// [`set_parameters`](ScoringComponent::set_parameters). Reading and writing
/// back the same map must not change what `compute` returns.
pub trait ScoringComponent: Send + Sync + std::fmt::Debug {
    /// Identifier used to qualify parameter names (`id.param`).
    fn id(&self) -> &str;

    /// Contribution for `record`. `subtotal` is the sum of the contributions of
    /// the components registered before this one.
    ///
    /// `record` has already been sanitized by the engine, but implementations
    /// must still never return a negative amount for out-of-domain inputs.
    fn compute(&self, record: &InputRecord, subtotal: f64) -> f64;

    /// Current parameters in declaration order.
    fn parameters(&self) -> ParameterMap;

    /// Apply the known names in `params`. Unknown names are ignored.
    fn set_parameters(&mut self, params: &ParameterMap);

    fn clone_box(&self) -> Box<dyn ScoringComponent>;
}

impl Clone for Box<dyn ScoringComponent> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
