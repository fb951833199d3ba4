use crate::scoring::ParameterVector;

/// Closed search interval for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    /// Interval between `a` and `b`, whichever order they come in.
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            lower: a.min(b),
            upper: a.max(b),
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    /// Position of `value` in the interval as a fraction in `[0, 1]`.
    pub fn to_unit(&self, value: f64) -> f64 {
        if self.width() > 0.0 {
            ((self.clamp(value) - self.lower) / self.width()).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn from_unit(&self, unit: f64) -> f64 {
        self.lower + unit.clamp(0.0, 1.0) * self.width()
    }
}

/// Guess a search interval from the parameter's name and current value `c`.
///
/// Rules are matched against the unqualified name, first match wins:
///
/// - `rate` → `[max(0.01, 0.5c), 2c]`
/// - `threshold` → `[max(1, 0.5c), 2c]`
/// - `bonus`/`penalty` → `[0, max(200, 3c)]`
/// - `factor` → `[0, 2]`
/// - `cents` → `[0, 99]`
/// - anything else → `[max(0, 0.1c), 10c]`
///
/// Matching is by substring, so `moderate_spend_factor` falls under `rate`
/// and `short_penalty_factor` under `penalty`. Bounds given in the wrong
/// order are swapped.
pub fn infer_bounds(name: &str, current: f64) -> Bounds {
    let param = ParameterVector::split(name)
        .map(|(_, param)| param)
        .unwrap_or(name)
        .to_ascii_lowercase();
    let current = if current.is_finite() { current } else { 0.0 };

    if param.contains("rate") {
        Bounds::new((0.5 * current).max(0.01), 2.0 * current)
    } else if param.contains("threshold") {
        Bounds::new((0.5 * current).max(1.0), 2.0 * current)
    } else if param.contains("bonus") || param.contains("penalty") {
        Bounds::new(0.0, (3.0 * current).max(200.0))
    } else if param.contains("factor") {
        Bounds::new(0.0, 2.0)
    } else if param.contains("cents") {
        Bounds::new(0.0, 99.0)
    } else {
        Bounds::new((0.1 * current).max(0.0), 10.0 * current)
    }
}
