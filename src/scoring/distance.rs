use super::component::ScoringComponent;
use super::config::DistanceConfig;
use super::params::ParameterMap;
use super::record::InputRecord;

#[derive(Debug, Clone, PartialEq)]
struct Tier {
    /// `None` for the open-ended last tier.
    up_to: Option<f64>,
    rate: f64,
}

/// Piecewise-linear distance tariff.
///
/// Each tier charges only the distance between the previous threshold and its
/// own; a distance sitting exactly on a threshold is fully charged at the lower
/// tier. Thresholds that end up out of order (after calibration, say) are
/// treated as empty tiers, which keeps the charge non-decreasing in distance.
#[derive(Debug, Clone)]
pub struct DistanceTier {
    tiers: Vec<Tier>,
}

impl DistanceTier {
    pub const ID: &'static str = "distance";

    pub fn from_config(config: &DistanceConfig) -> Self {
        Self {
            tiers: config
                .tiers
                .iter()
                .map(|t| Tier {
                    up_to: t.up_to,
                    rate: t.rate.max(0.0),
                })
                .collect(),
        }
    }

    /// Charge for `distance` alone. Public so callers can chart the tariff.
    pub fn charge(&self, distance: f64) -> f64 {
        if distance.is_nan() || distance <= 0.0 {
            return 0.0;
        }

        let mut total = 0.0;
        let mut previous = 0.0_f64;
        for tier in &self.tiers {
            let ceiling = tier.up_to.unwrap_or(f64::INFINITY);
            let portion = (distance.min(ceiling) - previous).max(0.0);
            total += portion * tier.rate;

            previous = previous.max(ceiling);
            if distance <= previous {
                break;
            }
        }
        total
    }
}

impl Default for DistanceTier {
    fn default() -> Self {
        Self::from_config(&DistanceConfig::default())
    }
}

impl ScoringComponent for DistanceTier {
    fn id(&self) -> &str {
        Self::ID
    }

    fn compute(&self, record: &InputRecord, _subtotal: f64) -> f64 {
        self.charge(record.distance)
    }

    fn parameters(&self) -> ParameterMap {
        let mut params = ParameterMap::new();
        for (i, tier) in self.tiers.iter().enumerate() {
            if let Some(up_to) = tier.up_to {
                params.insert(format!("tier_{}_threshold", i + 1), up_to);
            }
            params.insert(format!("tier_{}_rate", i + 1), tier.rate);
        }
        params
    }

    fn set_parameters(&mut self, params: &ParameterMap) {
        for (i, tier) in self.tiers.iter_mut().enumerate() {
            if let Some(up_to) = tier.up_to.as_mut() {
                if let Some(value) = params.get_finite(&format!("tier_{}_threshold", i + 1)) {
                    *up_to = value.max(0.0);
                }
            }
            if let Some(value) = params.get_finite(&format!("tier_{}_rate", i + 1)) {
                tier.rate = value.max(0.0);
            }
        }
    }

    fn clone_box(&self) -> Box<dyn ScoringComponent> {
        Box::new(self.clone())
    }
}
