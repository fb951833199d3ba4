use serde::{Deserialize, Serialize};

/// One trip to be estimated.
///
/// Fields accept the legacy case-file names (`trip_duration_days`,
/// `miles_traveled`, `total_receipts_amount`) as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct InputRecord {
    #[serde(alias = "trip_duration_days")]
    pub duration_days: f64,

    #[serde(alias = "miles_traveled")]
    pub distance: f64,

    #[serde(alias = "total_receipts_amount")]
    pub expense_amount: f64,
}

impl InputRecord {
    pub fn new(duration_days: f64, distance: f64, expense_amount: f64) -> Self {
        Self {
            duration_days,
            distance,
            expense_amount,
        }
    }

    /// Copy of the record with every negative or non-finite field replaced by 0.
    pub fn sanitized(&self) -> Self {
        Self {
            duration_days: non_negative(self.duration_days),
            distance: non_negative(self.distance),
            expense_amount: non_negative(self.expense_amount),
        }
    }

    /// Expense per day, or `None` for trips without a positive duration.
    pub fn expense_per_day(&self) -> Option<f64> {
        (self.duration_days > 0.0).then(|| self.expense_amount / self.duration_days)
    }

    /// Distance per day, or `None` for trips without a positive duration.
    pub fn distance_per_day(&self) -> Option<f64> {
        (self.duration_days > 0.0).then(|| self.distance / self.duration_days)
    }

    pub fn is_finite(&self) -> bool {
        self.duration_days.is_finite() && self.distance.is_finite() && self.expense_amount.is_finite()
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
