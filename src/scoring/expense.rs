use super::component::ScoringComponent;
use super::config::ExpenseConfig;
use super::params::ParameterMap;
use super::record::InputRecord;

#[derive(Debug, Clone, PartialEq)]
struct Bucket {
    name: String,
    max_days: Option<f64>,
    threshold: f64,
    penalty_factor: f64,
}

/// Reimbursed share of the submitted expenses.
///
/// Daily spend is classified first: below the low-spend threshold only a small
/// fraction is kept, below the moderate threshold a larger fraction is kept.
/// Otherwise, spend above the trip-length bucket's daily threshold is penalized
/// by `excess_per_day × days × penalty_factor`. The result never goes below 0.
#[derive(Debug, Clone)]
pub struct ExpenseProcessing {
    buckets: Vec<Bucket>,
    low_spend_threshold: f64,
    low_spend_factor: f64,
    moderate_spend_threshold: f64,
    moderate_spend_factor: f64,
}

impl ExpenseProcessing {
    pub const ID: &'static str = "expense";

    pub fn from_config(config: &ExpenseConfig) -> Self {
        Self {
            buckets: config
                .buckets
                .iter()
                .map(|b| Bucket {
                    name: b.name.clone(),
                    max_days: b.max_days,
                    threshold: b.threshold,
                    penalty_factor: b.penalty_factor,
                })
                .collect(),
            low_spend_threshold: config.low_spend_threshold,
            low_spend_factor: config.low_spend_factor,
            moderate_spend_threshold: config.moderate_spend_threshold,
            moderate_spend_factor: config.moderate_spend_factor,
        }
    }

    /// First bucket whose `max_days` covers `days`; the open bucket catches the rest.
    fn bucket_for(&self, days: f64) -> Option<&Bucket> {
        self.buckets
            .iter()
            .find(|b| b.max_days.is_none_or(|max| days <= max))
    }
}

impl Default for ExpenseProcessing {
    fn default() -> Self {
        Self::from_config(&ExpenseConfig::default())
    }
}

impl ScoringComponent for ExpenseProcessing {
    fn id(&self) -> &str {
        Self::ID
    }

    fn compute(&self, record: &InputRecord, _subtotal: f64) -> f64 {
        let days = record.duration_days;
        let expense = record.expense_amount;
        let Some(per_day) = record.expense_per_day() else {
            return 0.0;
        };
        if expense.is_nan() || expense <= 0.0 {
            return 0.0;
        }

        let amount = if per_day < self.low_spend_threshold {
            expense * self.low_spend_factor
        } else if per_day < self.moderate_spend_threshold {
            expense * self.moderate_spend_factor
        } else {
            match self.bucket_for(days) {
                Some(bucket) if per_day > bucket.threshold => {
                    let excess = per_day - bucket.threshold;
                    expense - excess * days * bucket.penalty_factor
                }
                _ => expense,
            }
        };

        if amount.is_nan() {
            0.0
        } else {
            amount.max(0.0)
        }
    }

    fn parameters(&self) -> ParameterMap {
        let mut params = ParameterMap::new();
        for bucket in &self.buckets {
            params.insert(format!("{}_threshold", bucket.name), bucket.threshold);
            params.insert(format!("{}_penalty_factor", bucket.name), bucket.penalty_factor);
        }
        params
            .with("low_spend_threshold", self.low_spend_threshold)
            .with("low_spend_factor", self.low_spend_factor)
            .with("moderate_spend_threshold", self.moderate_spend_threshold)
            .with("moderate_spend_factor", self.moderate_spend_factor)
    }

    fn set_parameters(&mut self, params: &ParameterMap) {
        for bucket in self.buckets.iter_mut() {
            if let Some(v) = params.get_finite(&format!("{}_threshold", bucket.name)) {
                bucket.threshold = v.max(0.0);
            }
            if let Some(v) = params.get_finite(&format!("{}_penalty_factor", bucket.name)) {
                bucket.penalty_factor = v.max(0.0);
            }
        }

        let scalars = [
            ("low_spend_threshold", &mut self.low_spend_threshold),
            ("low_spend_factor", &mut self.low_spend_factor),
            ("moderate_spend_threshold", &mut self.moderate_spend_threshold),
            ("moderate_spend_factor", &mut self.moderate_spend_factor),
        ];
        for (name, slot) in scalars {
            if let Some(v) = params.get_finite(name) {
                *slot = v.max(0.0);
            }
        }
    }

    fn clone_box(&self) -> Box<dyn ScoringComponent> {
        Box::new(self.clone())
    }
}
