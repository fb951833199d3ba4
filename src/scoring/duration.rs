use super::component::ScoringComponent;
use super::config::DurationConfig;
use super::params::ParameterMap;
use super::record::InputRecord;

/// Per-day base amount, with flat adjustments keyed by exact trip length.
#[derive(Debug, Clone)]
pub struct DurationBase {
    daily_rate: f64,
    overrides: Vec<(u32, f64)>,
}

impl DurationBase {
    pub const ID: &'static str = "duration";

    pub fn from_config(config: &DurationConfig) -> Self {
        Self {
            daily_rate: config.daily_rate,
            overrides: config.overrides.iter().map(|o| (o.days, o.adjust)).collect(),
        }
    }

    fn override_name(days: u32) -> String {
        format!("day_{}_adjust", days)
    }
}

impl Default for DurationBase {
    fn default() -> Self {
        Self::from_config(&DurationConfig::default())
    }
}

impl ScoringComponent for DurationBase {
    fn id(&self) -> &str {
        Self::ID
    }

    fn compute(&self, record: &InputRecord, _subtotal: f64) -> f64 {
        let days = record.duration_days;
        if days.is_nan() || days <= 0.0 {
            return 0.0;
        }

        let mut amount = days * self.daily_rate;
        for (exact, adjust) in &self.overrides {
            if days == f64::from(*exact) {
                amount += adjust;
            }
        }
        amount
    }

    fn parameters(&self) -> ParameterMap {
        let mut params = ParameterMap::new().with("daily_rate", self.daily_rate);
        for (days, adjust) in &self.overrides {
            params.insert(Self::override_name(*days), *adjust);
        }
        params
    }

    fn set_parameters(&mut self, params: &ParameterMap) {
        if let Some(rate) = params.get_finite("daily_rate") {
            self.daily_rate = rate.max(0.0);
        }
        for (days, adjust) in self.overrides.iter_mut() {
            if let Some(value) = params.get_finite(&Self::override_name(*days)) {
                *adjust = value;
            }
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

    fn record(days: f64) -> InputRecord {
        InputRecord::new(days, 300.0, 400.0)
    }

    #[test]
    fn test_linear_in_days() {
        let component = DurationBase::default();
        assert_eq!(component.compute(&record(3.0), 0.0), 300.0);
        assert_eq!(component.compute(&record(1.5), 0.0), 150.0);
    }

    #[test]
    fn test_exact_duration_override() {
        let component = DurationBase::default();
        // 5 * 100 - 150
        assert_eq!(component.compute(&record(5.0), 0.0), 350.0);
        assert_eq!(component.compute(&record(5.5), 0.0), 550.0);
    }

    #[test]
    fn test_zero_and_negative_duration() {
        let component = DurationBase::default();
        assert_eq!(component.compute(&record(0.0), 0.0), 0.0);
        assert_eq!(component.compute(&record(-4.0), 0.0), 0.0);
        assert_eq!(component.compute(&record(f64::NAN), 0.0), 0.0);
    }

    #[test]
    fn test_parameters_schema() {
        let params = DurationBase::default().parameters();
        assert_eq!(params.get("daily_rate"), Some(100.0));
        assert_eq!(params.get("day_5_adjust"), Some(-150.0));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_set_parameters_ignores_unknown() {
        let mut component = DurationBase::default();
        component.set_parameters(
            &ParameterMap::new()
                .with("daily_rate", 90.0)
                .with("weekend_rate", 12.0),
        );
        assert_eq!(component.compute(&record(2.0), 0.0), 180.0);
        assert!(component.parameters().get("weekend_rate").is_none());
    }

    #[test]
    fn test_set_get_is_noop() {
        let mut component = DurationBase::default();
        let before = component.compute(&record(5.0), 0.0);
        let params = component.parameters();
        component.set_parameters(&params);
        assert_eq!(component.compute(&record(5.0), 0.0), before);
        assert_eq!(component.parameters(), params);
    }

    proptest! {
        #[test]
        fn test_set_get_keeps_compute(
            d in 0.0f64..30.0,
            whole in any::<bool>(),
            m in 0.0f64..3000.0,
            e in 0.0f64..5000.0,
            rate in 0.0f64..300.0,
            adjust in -500.0f64..500.0,
        ) {
            let mut component = DurationBase::default();
            component.set_parameters(
                &ParameterMap::new().with("daily_rate", rate).with("day_5_adjust", adjust),
            );
            // whole days reach the exact-duration override
            let record = InputRecord::new(if whole { d.floor() } else { d }, m, e);
            let before = component.compute(&record, 0.0);
            let params = component.parameters();
            component.set_parameters(&params);
            prop_assert_eq!(component.compute(&record, 0.0).to_bits(), before.to_bits());
        }
    }
}
