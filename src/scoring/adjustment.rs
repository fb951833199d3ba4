use super::component::ScoringComponent;
use super::config::{AdjustmentRule, Bonus, Predicate};
use super::params::ParameterMap;
use super::record::InputRecord;

/// Independent predicate-triggered bonuses. Every rule that matches adds its
/// bonus; rules do not exclude each other.
#[derive(Debug, Clone)]
pub struct Adjustment {
    rules: Vec<AdjustmentRule>,
}

impl Adjustment {
    pub const ID: &'static str = "adjustment";

    pub fn from_rules(rules: &[AdjustmentRule]) -> Self {
        Self {
            rules: rules.to_vec(),
        }
    }

    fn matches(predicate: &Predicate, record: &InputRecord) -> bool {
        match predicate {
            Predicate::DurationEquals(days) => record.duration_days == f64::from(*days),
            Predicate::DistancePerDay { min, max } => record
                .distance_per_day()
                .is_some_and(|v| v >= *min && v <= *max),
            Predicate::ExpensePerDay { min, max } => record
                .expense_per_day()
                .is_some_and(|v| v >= *min && v <= *max),
        }
    }

    /// Names of the rules that fire for `record`.
    pub fn fired<'a>(&'a self, record: &'a InputRecord) -> impl Iterator<Item = &'a str> + 'a {
        self.rules
            .iter()
            .filter(|rule| Self::matches(&rule.when, record))
            .map(|rule| rule.name.as_str())
    }
}

impl Default for Adjustment {
    fn default() -> Self {
        Self::from_rules(&super::config::default_adjustments())
    }
}

impl ScoringComponent for Adjustment {
    fn id(&self) -> &str {
        Self::ID
    }

    fn compute(&self, record: &InputRecord, subtotal: f64) -> f64 {
        self.rules
            .iter()
            .filter(|rule| Self::matches(&rule.when, record))
            .map(|rule| match rule.bonus {
                Bonus::Fixed(amount) => amount,
                Bonus::Percent(rate) => subtotal.max(0.0) * rate,
            })
            .sum()
    }

    fn parameters(&self) -> ParameterMap {
        let mut params = ParameterMap::new();
        for rule in &self.rules {
            match rule.when {
                Predicate::DurationEquals(_) => {}
                Predicate::DistancePerDay { min, max } | Predicate::ExpensePerDay { min, max } => {
                    params.insert(format!("{}_min", rule.name), min);
                    params.insert(format!("{}_max", rule.name), max);
                }
            }
            match rule.bonus {
                Bonus::Fixed(amount) => params.insert(format!("{}_bonus", rule.name), amount),
                Bonus::Percent(rate) => params.insert(format!("{}_rate", rule.name), rate),
            }
        }
        params
    }

    fn set_parameters(&mut self, params: &ParameterMap) {
        for rule in self.rules.iter_mut() {
            let name = rule.name.clone();
            match &mut rule.when {
                Predicate::DurationEquals(_) => {}
                Predicate::DistancePerDay { min, max } | Predicate::ExpensePerDay { min, max } => {
                    if let Some(v) = params.get_finite(&format!("{}_min", name)) {
                        *min = v;
                    }
                    if let Some(v) = params.get_finite(&format!("{}_max", name)) {
                        *max = v;
                    }
                }
            }
            match &mut rule.bonus {
                Bonus::Fixed(amount) => {
                    if let Some(v) = params.get_finite(&format!("{}_bonus", name)) {
                        *amount = v;
                    }
                }
                Bonus::Percent(rate) => {
                    if let Some(v) = params.get_finite(&format!("{}_rate", name)) {
                        *rate = v;
                    }
                }
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

    #[test]
    fn test_five_day_bonus() {
        let component = Adjustment::default();
        let record = InputRecord::new(5.0, 100.0, 300.0);
        assert_eq!(component.compute(&record, 0.0), 75.0);
    }

    #[test]
    fn test_rules_sum_when_both_fire() {
        let component = Adjustment::default();
        // 5 days at 200/day triggers both the five-day and efficiency rules
        let record = InputRecord::new(5.0, 1000.0, 300.0);
        assert_eq!(component.compute(&record, 0.0), 140.0);
        assert_eq!(component.fired(&record).collect::<Vec<_>>(), vec!["five_day", "efficiency"]);
    }

    #[test]
    fn test_band_is_inclusive() {
        let component = Adjustment::default();
        assert_eq!(component.compute(&InputRecord::new(2.0, 360.0, 0.0), 0.0), 65.0);
        assert_eq!(component.compute(&InputRecord::new(2.0, 440.0, 0.0), 0.0), 65.0);
        assert_eq!(component.compute(&InputRecord::new(2.0, 442.0, 0.0), 0.0), 0.0);
    }

    #[test]
    fn test_band_needs_positive_duration() {
        let component = Adjustment::default();
        assert_eq!(component.compute(&InputRecord::new(0.0, 200.0, 0.0), 0.0), 0.0);
    }

    #[test]
    fn test_percent_of_subtotal() {
        let component = Adjustment::from_rules(&[AdjustmentRule {
            name: "thrifty".to_string(),
            when: Predicate::ExpensePerDay { min: 0.0, max: 50.0 },
            bonus: Bonus::Percent(0.08),
        }]);
        let record = InputRecord::new(2.0, 0.0, 60.0);
        assert!((component.compute(&record, 500.0) - 40.0).abs() < 1e-9);
        assert_eq!(component.parameters().get("thrifty_rate"), Some(0.08));
    }

    #[test]
    fn test_parameters_schema() {
        let params = Adjustment::default().parameters();
        let names: Vec<_> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["five_day_bonus", "efficiency_min", "efficiency_max", "efficiency_bonus"]
        );
    }

    #[test]
    fn test_set_parameters_moves_band() {
        let mut component = Adjustment::default();
        component.set_parameters(
            &ParameterMap::new()
                .with("efficiency_min", 100.0)
                .with("efficiency_bonus", 10.0),
        );
        let record = InputRecord::new(1.0, 150.0, 0.0);
        assert_eq!(component.compute(&record, 0.0), 10.0);
    }

    #[test]
    fn test_set_get_is_noop() {
        let mut component = Adjustment::default();
        let record = InputRecord::new(5.0, 1000.0, 300.0);
        let before = component.compute(&record, 812.0);
        let params = component.parameters();
        component.set_parameters(&params);
        assert_eq!(component.compute(&record, 812.0), before);
    }

    proptest! {
        #[test]
        fn test_set_get_keeps_compute(
            d in 0u32..15,
            m in 0.0f64..3000.0,
            e in 0.0f64..5000.0,
            subtotal in 0.0f64..5000.0,
        ) {
            let mut rules = crate::scoring::config::default_adjustments();
            rules.push(AdjustmentRule {
                name: "thrifty".to_string(),
                when: Predicate::ExpensePerDay { min: 0.0, max: 50.0 },
                bonus: Bonus::Percent(0.08),
            });
            let mut component = Adjustment::from_rules(&rules);
            let record = InputRecord::new(f64::from(d), m, e);
            let before = component.compute(&record, subtotal);
            let params = component.parameters();
            component.set_parameters(&params);
            prop_assert_eq!(component.compute(&record, subtotal).to_bits(), before.to_bits());
        }
    }
}
