use serde::{Deserialize, Serialize};

/// Structural scoring configuration.
///
/// Describes which tiers, buckets and rules each component is built with. The
/// numeric values here are the starting parameters; calibration may move them
/// later. Every section is optional and falls back to its default.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   duration:
///     daily_rate: 100
///     overrides:
///       - { days: 5, adjust: -150 }
///   distance:
///     tiers:
///       - { up_to: 100, rate: 0.58 }
///       - { rate: 0.45 }
///   quirk:
///     enabled: true
///     trigger_cents: [49, 99]
///     bonus: 7.5
///   overrides:
///     - cap: { min_days: 12, min_expense: 2000, multiple: 0.78, offset: 200 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    #[serde(default)]
    pub duration: Option<DurationConfig>,

    #[serde(default)]
    pub distance: Option<DistanceConfig>,

    #[serde(default)]
    pub expense: Option<ExpenseConfig>,

    /// Bonus rules. Multiple rules may fire for the same trip; they are summed.
    #[serde(default)]
    pub adjustments: Option<Vec<AdjustmentRule>>,

    #[serde(default)]
    pub quirk: Option<QuirkConfig>,

    #[serde(default)]
    pub jitter: Option<JitterConfig>,

    /// Engine-level rules applied to the composed subtotal.
    #[serde(default)]
    pub overrides: Option<Vec<OverrideRule>>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            duration: Some(DurationConfig::default()),
            distance: Some(DistanceConfig::default()),
            expense: Some(ExpenseConfig::default()),
            adjustments: Some(default_adjustments()),
            quirk: Some(QuirkConfig::default()),
            jitter: Some(JitterConfig::default()),
            overrides: Some(default_overrides()),
        }
    }
}

/// Per-day base rate plus flat adjustments for exact trip lengths.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DurationConfig {
    pub daily_rate: f64,

    #[serde(default)]
    pub overrides: Vec<DurationOverride>,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            daily_rate: 100.0,
            overrides: vec![DurationOverride {
                days: 5,
                adjust: -150.0,
            }],
        }
    }
}

/// Flat amount added when the trip lasts exactly `days` days.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DurationOverride {
    pub days: u32,
    pub adjust: f64,
}

/// Piecewise-linear distance tariff.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DistanceConfig {
    pub tiers: Vec<TierConfig>,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierConfig {
                    up_to: Some(100.0),
                    rate: 0.58,
                },
                TierConfig {
                    up_to: None,
                    rate: 0.45,
                },
            ],
        }
    }
}

/// One tariff tier. `up_to: None` marks the open-ended last tier.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    #[serde(default)]
    pub up_to: Option<f64>,
    pub rate: f64,
}

/// Expense processing: overspend penalties per trip-length bucket and
/// reductions for suspiciously low daily spend.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExpenseConfig {
    pub buckets: Vec<ExpenseBucket>,

    /// Daily spend below this keeps only `low_spend_factor` of the expense.
    pub low_spend_threshold: f64,
    pub low_spend_factor: f64,

    /// Daily spend below this keeps `moderate_spend_factor` of the expense.
    pub moderate_spend_threshold: f64,
    pub moderate_spend_factor: f64,
}

impl Default for ExpenseConfig {
    fn default() -> Self {
        Self {
            buckets: vec![
                ExpenseBucket {
                    name: "short".to_string(),
                    max_days: Some(3.0),
                    threshold: 100.0,
                    penalty_factor: 0.45,
                },
                ExpenseBucket {
                    name: "medium".to_string(),
                    max_days: Some(7.0),
                    threshold: 150.0,
                    penalty_factor: 0.40,
                },
                ExpenseBucket {
                    name: "long".to_string(),
                    max_days: None,
                    threshold: 120.0,
                    penalty_factor: 0.50,
                },
            ],
            low_spend_threshold: 20.0,
            low_spend_factor: 0.05,
            moderate_spend_threshold: 50.0,
            moderate_spend_factor: 0.80,
        }
    }
}

/// Trips up to `max_days` (inclusive) use this bucket's daily threshold.
/// `max_days: None` marks the catch-all last bucket.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExpenseBucket {
    pub name: String,

    #[serde(default)]
    pub max_days: Option<f64>,

    pub threshold: f64,
    pub penalty_factor: f64,
}

/// A named predicate mapped to a bonus.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AdjustmentRule {
    pub name: String,
    pub when: Predicate,
    pub bonus: Bonus,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Trip lasts exactly this many days.
    DurationEquals(u32),
    /// Distance per day within `[min, max]`.
    DistancePerDay { min: f64, max: f64 },
    /// Expense per day within `[min, max]`.
    ExpensePerDay { min: f64, max: f64 },
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Bonus {
    /// Flat amount.
    Fixed(f64),
    /// Fraction of the running subtotal (0.08 = 8%).
    Percent(f64),
}

pub fn default_adjustments() -> Vec<AdjustmentRule> {
    vec![
        AdjustmentRule {
            name: "five_day".to_string(),
            when: Predicate::DurationEquals(5),
            bonus: Bonus::Fixed(75.0),
        },
        AdjustmentRule {
            name: "efficiency".to_string(),
            when: Predicate::DistancePerDay {
                min: 180.0,
                max: 220.0,
            },
            bonus: Bonus::Fixed(65.0),
        },
    ]
}

/// Legacy cents glitch.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QuirkConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub trigger_cents: Vec<u32>,
    pub bonus: f64,
}

impl Default for QuirkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_cents: vec![49, 99],
            bonus: 7.50,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Deterministic input-derived perturbation. Amplitude 0 disables it.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JitterConfig {
    #[serde(default)]
    pub amplitude: f64,
}

/// Rules that need the composed subtotal together with the raw inputs.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OverrideRule {
    /// When `duration ≥ min_days` and `expense > min_expense`, cap the total
    /// at `expense × multiple + offset`.
    Cap {
        min_days: f64,
        min_expense: f64,
        multiple: f64,
        offset: f64,
    },
    /// When `duration ≤ max_days` and `expense < max_expense`, raise the total
    /// to at least `minimum`.
    Floor {
        max_days: f64,
        max_expense: f64,
        minimum: f64,
    },
}

pub fn default_overrides() -> Vec<OverrideRule> {
    vec![OverrideRule::Cap {
        min_days: 12.0,
        min_expense: 2000.0,
        multiple: 0.78,
        offset: 200.0,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scoring_config() {
        let config = ScoringConfig::default();

        assert_eq!(config.duration.as_ref().map(|d| d.daily_rate), Some(100.0));
        assert_eq!(config.distance.as_ref().map(|d| d.tiers.len()), Some(2));
        assert_eq!(config.adjustments.as_ref().map(|a| a.len()), Some(2));
        assert!(config.quirk.as_ref().is_some_and(|q| q.enabled));
    }

    #[test]
    fn test_scoring_config_serde_roundtrip() {
        let config = ScoringConfig::default();
        let yaml = serde_saphyr::to_string(&config).unwrap();
        let parsed: ScoringConfig = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_scoring_config_parse() {
        let yaml = r#"
duration:
  daily_rate: 110
quirk:
  trigger_cents: [49]
  bonus: 5
"#;
        let config: ScoringConfig = serde_saphyr::from_str(yaml).unwrap();
        let duration = config.duration.unwrap();
        assert_eq!(duration.daily_rate, 110.0);
        assert!(duration.overrides.is_empty());

        let quirk = config.quirk.unwrap();
        assert!(quirk.enabled);
        assert_eq!(quirk.trigger_cents, vec![49]);
        assert!(config.distance.is_none());
        assert!(config.overrides.is_none());
    }

    #[test]
    fn test_open_ended_tier_parse() {
        let yaml = r#"
tiers:
  - up_to: 100
    rate: 0.58
  - rate: 0.45
"#;
        let config: DistanceConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.tiers[0].up_to, Some(100.0));
        assert_eq!(config.tiers[1].up_to, None);
    }

    #[test]
    fn test_empty_scoring_config_parse() {
        let config: ScoringConfig = serde_saphyr::from_str("{}").unwrap();
        assert!(config.duration.is_none());
        assert!(config.adjustments.is_none());
        assert!(config.overrides.is_none());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "daily_rate: 100\nweekend_rate: 20\n";
        assert!(serde_saphyr::from_str::<DurationConfig>(yaml).is_err());
    }
}
