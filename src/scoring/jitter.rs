use super::component::ScoringComponent;
use super::config::JitterConfig;
use super::params::ParameterMap;
use super::record::InputRecord;

/// Deterministic perturbation in `[-1, 1]` derived from the inputs alone.
///
/// Identical records always produce the same value; there is no shared RNG.
pub fn jitter(record: &InputRecord) -> f64 {
    let mut state = 0x9E37_79B9_7F4A_7C15_u64;
    for value in [record.duration_days, record.distance, record.expense_amount] {
        // +0.0 and -0.0 must hash alike
        let bits = if value == 0.0 { 0 } else { value.to_bits() };
        state = splitmix64(state ^ bits);
    }
    // top 53 bits → [0, 1) → [-1, 1)
    let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
    unit * 2.0 - 1.0
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Adds `amplitude × jitter(record)`. Inert at the default amplitude of 0.
#[derive(Debug, Clone, Default)]
pub struct Jitter {
    amplitude: f64,
}

impl Jitter {
    pub const ID: &'static str = "jitter";

    pub fn from_config(config: &JitterConfig) -> Self {
        Self {
            amplitude: config.amplitude.abs(),
        }
    }
}

impl ScoringComponent for Jitter {
    fn id(&self) -> &str {
        Self::ID
    }

    fn compute(&self, record: &InputRecord, _subtotal: f64) -> f64 {
        if self.amplitude == 0.0 {
            return 0.0;
        }
        self.amplitude * jitter(record)
    }

    fn parameters(&self) -> ParameterMap {
        ParameterMap::new().with("amplitude", self.amplitude)
    }

    fn set_parameters(&mut self, params: &ParameterMap) {
        if let Some(amplitude) = params.get_finite("amplitude") {
            self.amplitude = amplitude.abs();
        }
    }

    fn clone_box(&self) -> Box<dyn ScoringComponent> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_jitter_is_deterministic() {
        let record = InputRecord::new(3.0, 93.0, 1.42);
        assert_eq!(jitter(&record), jitter(&record));
    }

    #[test]
    fn test_jitter_depends_on_inputs() {
        let a = jitter(&InputRecord::new(3.0, 93.0, 1.42));
        let b = jitter(&InputRecord::new(3.0, 93.0, 1.43));
        assert_ne!(a, b);
    }

    #[test]
    fn test_default_is_inert() {
        let component = Jitter::default();
        assert_eq!(component.compute(&InputRecord::new(5.0, 250.0, 700.0), 0.0), 0.0);
    }

    #[test]
    fn test_amplitude_bounds_contribution() {
        let component = Jitter::from_config(&JitterConfig { amplitude: 2.5 });
        let value = component.compute(&InputRecord::new(5.0, 250.0, 700.0), 0.0);
        assert!(value.abs() <= 2.5);
    }

    #[test]
    fn test_set_get_is_noop() {
        let mut component = Jitter::from_config(&JitterConfig { amplitude: 2.5 });
        let params = component.parameters();
        component.set_parameters(&params);
        assert_eq!(component.parameters(), params);
        assert_eq!(params.get("amplitude"), Some(2.5));
    }

    proptest! {
        #[test]
        fn test_set_get_keeps_compute(
            d in 0.0f64..30.0,
            m in 0.0f64..3000.0,
            e in 0.0f64..5000.0,
            amplitude in 0.0f64..25.0,
        ) {
            let mut component = Jitter::from_config(&JitterConfig { amplitude });
            let record = InputRecord::new(d, m, e);
            let before = component.compute(&record, 0.0);
            let params = component.parameters();
            component.set_parameters(&params);
            prop_assert_eq!(component.compute(&record, 0.0).to_bits(), before.to_bits());
        }

        #[test]
        fn test_jitter_in_unit_range(d in 0.0f64..30.0, m in 0.0f64..2000.0, e in 0.0f64..5000.0) {
            let value = jitter(&InputRecord::new(d, m, e));
            prop_assert!((-1.0..1.0).contains(&value));
        }
    }
}
