use super::component::ScoringComponent;
use super::config::QuirkConfig;
use super::params::ParameterMap;
use super::record::InputRecord;

/// Reproduces the legacy cents glitch: a small fixed bonus whenever the cents
/// part of the expense amount is one of the trigger values.
///
/// This is not a business rule. It exists so estimates line up with the
/// historical outputs, and can be switched off on its own.
#[derive(Debug, Clone)]
pub struct Quirk {
    enabled: bool,
    trigger_cents: Vec<u32>,
    bonus: f64,
}

impl Quirk {
    pub const ID: &'static str = "quirk";

    pub fn from_config(config: &QuirkConfig) -> Self {
        Self {
            enabled: config.enabled,
            trigger_cents: config.trigger_cents.iter().map(|c| c % 100).collect(),
            bonus: config.bonus,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_triggered(&self, expense_amount: f64) -> bool {
        self.enabled && self.trigger_cents.contains(&cents_of(expense_amount))
    }

    fn trigger_name(index: usize) -> String {
        format!("trigger_cents_{}", index + 1)
    }
}

/// Cents part of a non-negative amount, rounded to the nearest cent first so
/// that `0.49` is not read as 48 cents.
pub fn cents_of(amount: f64) -> u32 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    ((amount * 100.0).round() % 100.0) as u32
}

impl Default for Quirk {
    fn default() -> Self {
        Self::from_config(&QuirkConfig::default())
    }
}

impl ScoringComponent for Quirk {
    fn id(&self) -> &str {
        Self::ID
    }

    fn compute(&self, record: &InputRecord, _subtotal: f64) -> f64 {
        if self.is_triggered(record.expense_amount) {
            self.bonus
        } else {
            0.0
        }
    }

    fn parameters(&self) -> ParameterMap {
        let mut params = ParameterMap::new().with("bonus", self.bonus);
        for (i, cents) in self.trigger_cents.iter().enumerate() {
            params.insert(Self::trigger_name(i), f64::from(*cents));
        }
        params
    }

    fn set_parameters(&mut self, params: &ParameterMap) {
        if let Some(bonus) = params.get_finite("bonus") {
            self.bonus = bonus;
        }
        for (i, cents) in self.trigger_cents.iter_mut().enumerate() {
            if let Some(value) = params.get_finite(&Self::trigger_name(i)) {
                *cents = value.round().clamp(0.0, 99.0) as u32;
            }
        }
    }

    fn clone_box(&self) -> Box<dyn ScoringComponent> {
        Box::new(self.clone())
    }
}
