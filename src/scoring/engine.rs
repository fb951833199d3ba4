use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use super::adjustment::Adjustment;
use super::component::ScoringComponent;
use super::config::{OverrideRule, ScoringConfig};
use super::distance::DistanceTier;
use super::duration::DurationBase;
use super::expense::ExpenseProcessing;
use super::jitter::Jitter;
use super::params::ParameterVector;
use super::quirk::Quirk;
use super::record::InputRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentContribution {
    pub id: String,
    pub amount: f64,
}

/// Every step of one estimate. `subtotal + override_adjustment == total`, and
/// `amount` is `total` clamped to a non-negative value and rounded once.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub contributions: Vec<ComponentContribution>,
    pub subtotal: f64,
    pub override_adjustment: f64,
    pub total: f64,
    pub amount: f64,
}

/// Composes the registered components into one rounded amount.
///
/// Estimation never fails: inputs are sanitized before any component sees
/// them, and the result is always finite and non-negative.
#[derive(Debug, Clone)]
pub struct Engine {
    components: Vec<Box<dyn ScoringComponent>>,
    overrides: Vec<OverrideRule>,
}

impl Engine {
    /// Standard registration order: duration, distance, expense, adjustment,
    /// quirk, jitter. Missing config sections use their defaults.
    pub fn new(config: &ScoringConfig) -> Self {
        let components: Vec<Box<dyn ScoringComponent>> = vec![
            Box::new(DurationBase::from_config(
                &config.duration.clone().unwrap_or_default(),
            )),
            Box::new(DistanceTier::from_config(
                &config.distance.clone().unwrap_or_default(),
            )),
            Box::new(ExpenseProcessing::from_config(
                &config.expense.clone().unwrap_or_default(),
            )),
            Box::new(Adjustment::from_rules(
                &config
                    .adjustments
                    .clone()
                    .unwrap_or_else(super::config::default_adjustments),
            )),
            Box::new(Quirk::from_config(&config.quirk.clone().unwrap_or_default())),
            Box::new(Jitter::from_config(&config.jitter.clone().unwrap_or_default())),
        ];
        let overrides = config
            .overrides
            .clone()
            .unwrap_or_else(super::config::default_overrides);

        Self::with_components(components, overrides)
    }

    pub fn with_components(
        components: Vec<Box<dyn ScoringComponent>>,
        overrides: Vec<OverrideRule>,
    ) -> Self {
        Self {
            components,
            overrides,
        }
    }

    pub fn components(&self) -> impl Iterator<Item = &dyn ScoringComponent> {
        self.components.iter().map(|c| c.as_ref())
    }

    /// Final rounded amount for `record`.
    pub fn compute(&self, record: &InputRecord) -> f64 {
        self.breakdown(record).amount
    }

    pub fn breakdown(&self, record: &InputRecord) -> Breakdown {
        let record = record.sanitized();

        let mut subtotal = 0.0;
        let mut contributions = Vec::with_capacity(self.components.len());
        for component in &self.components {
            let amount = component.compute(&record, subtotal);
            // a misbehaving component must not poison the sum
            let amount = if amount.is_finite() { amount } else { 0.0 };
            subtotal += amount;
            contributions.push(ComponentContribution {
                id: component.id().to_string(),
                amount,
            });
        }

        let total = apply_overrides(&self.overrides, &record, subtotal);
        let clamped = if total.is_finite() { total.max(0.0) } else { 0.0 };

        Breakdown {
            contributions,
            subtotal,
            override_adjustment: total - subtotal,
            total,
            amount: round_cents(clamped),
        }
    }

    /// Every component's parameters, qualified as `componentId.paramName`.
    pub fn collect_parameters(&self) -> ParameterVector {
        let mut vector = ParameterVector::new();
        for component in &self.components {
            vector.extend_component(component.id(), &component.parameters());
        }
        vector
    }

    /// Route each qualified parameter to its component. Names for unknown
    /// components or parameters are ignored.
    pub fn apply_parameters(&mut self, vector: &ParameterVector) {
        for component in self.components.iter_mut() {
            let params = vector.for_component(component.id());
            if !params.is_empty() {
                component.set_parameters(&params);
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

fn apply_overrides(rules: &[OverrideRule], record: &InputRecord, subtotal: f64) -> f64 {
    let mut total = subtotal;
    for rule in rules {
        match *rule {
            OverrideRule::Cap {
                min_days,
                min_expense,
                multiple,
                offset,
            } => {
                if record.duration_days >= min_days && record.expense_amount > min_expense {
                    total = total.min(record.expense_amount * multiple + offset);
                }
            }
            OverrideRule::Floor {
                max_days,
                max_expense,
                minimum,
            } => {
                if record.duration_days <= max_days && record.expense_amount < max_expense {
                    total = total.max(minimum);
                }
            }
        }
    }
    total
}

/// Round to 2 decimals, half away from zero, on the shortest decimal form of
/// `value` (so `2.675` becomes `2.68`, not the binary-float `2.67`).
pub fn round_cents(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    Decimal::from_str(&value.to_string())
        .ok()
        .and_then(|d| {
            d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                .to_f64()
        })
        .unwrap_or_else(|| (value * 100.0).round() / 100.0)
}
