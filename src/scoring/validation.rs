use super::config::{OverrideRule, Predicate, ScoringConfig};
use super::params::QUALIFIER;

const EXPENSE_SCALARS: [&str; 4] = [
    "low_spend_threshold",
    "low_spend_factor",
    "moderate_spend_threshold",
    "moderate_spend_factor",
];

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(ref duration) = config.duration {
        check_non_negative(&mut errors, "scoring.duration.daily_rate", duration.daily_rate);
        for (i, o) in duration.overrides.iter().enumerate() {
            if duration.overrides[..i].iter().any(|p| p.days == o.days) {
                errors.push(format!(
                    "scoring.duration.overrides[{}]: duplicate override for {} days",
                    i, o.days
                ));
            }
            check_finite(&mut errors, &format!("scoring.duration.overrides[{}].adjust", i), o.adjust);
        }
    }

    if let Some(ref distance) = config.distance {
        if distance.tiers.is_empty() {
            errors.push("scoring.distance.tiers: at least one tier is required".to_string());
        }
        let mut previous = 0.0;
        let last = distance.tiers.len().saturating_sub(1);
        for (i, tier) in distance.tiers.iter().enumerate() {
            check_non_negative(&mut errors, &format!("scoring.distance.tiers[{}].rate", i), tier.rate);
            match tier.up_to {
                Some(up_to) => {
                    if !up_to.is_finite() || up_to <= previous {
                        errors.push(format!(
                            "scoring.distance.tiers[{}].up_to: must be greater than {}",
                            i, previous
                        ));
                    } else {
                        previous = up_to;
                    }
                }
                None if i != last => errors.push(format!(
                    "scoring.distance.tiers[{}].up_to: only the last tier may be open-ended",
                    i
                )),
                None => {}
            }
        }
    }

    if let Some(ref expense) = config.expense {
        if expense.buckets.is_empty() {
            errors.push("scoring.expense.buckets: at least one bucket is required".to_string());
        }
        let last = expense.buckets.len().saturating_sub(1);
        let mut previous = 0.0;
        for (i, bucket) in expense.buckets.iter().enumerate() {
            let path = format!("scoring.expense.buckets[{}]", i);
            check_name(&mut errors, &format!("{}.name", path), &bucket.name);
            if expense.buckets[..i].iter().any(|b| b.name == bucket.name) {
                errors.push(format!("{}.name: duplicate bucket '{}'", path, bucket.name));
            }
            check_non_negative(&mut errors, &format!("{}.threshold", path), bucket.threshold);
            check_non_negative(&mut errors, &format!("{}.penalty_factor", path), bucket.penalty_factor);
            match bucket.max_days {
                Some(max) if !max.is_finite() || max <= previous => errors.push(format!(
                    "{}.max_days: must be greater than {}",
                    path, previous
                )),
                Some(max) => previous = max,
                None if i != last => errors.push(format!(
                    "{}.max_days: only the last bucket may be open-ended",
                    path
                )),
                None => {}
            }
        }
        check_non_negative(&mut errors, "scoring.expense.low_spend_threshold", expense.low_spend_threshold);
        check_non_negative(&mut errors, "scoring.expense.low_spend_factor", expense.low_spend_factor);
        check_non_negative(
            &mut errors,
            "scoring.expense.moderate_spend_threshold",
            expense.moderate_spend_threshold,
        );
        check_non_negative(
            &mut errors,
            "scoring.expense.moderate_spend_factor",
            expense.moderate_spend_factor,
        );
        let mut keys: Vec<(String, String)> = EXPENSE_SCALARS
            .iter()
            .map(|name| (format!("scoring.expense.{}", name), name.to_string()))
            .collect();
        for (i, bucket) in expense.buckets.iter().enumerate() {
            // already reported as a duplicate bucket
            if expense.buckets[..i].iter().any(|b| b.name == bucket.name) {
                continue;
            }
            let path = format!("scoring.expense.buckets[{}].name", i);
            keys.push((path.clone(), format!("{}_threshold", bucket.name)));
            keys.push((path, format!("{}_penalty_factor", bucket.name)));
        }
        check_parameter_keys(&mut errors, &keys);
        if expense.low_spend_threshold > expense.moderate_spend_threshold {
            errors.push(
                "scoring.expense.low_spend_threshold: must not exceed moderate_spend_threshold"
                    .to_string(),
            );
        }
    }

    if let Some(ref rules) = config.adjustments {
        for (i, rule) in rules.iter().enumerate() {
            let path = format!("scoring.adjustments[{}]", i);
            check_name(&mut errors, &format!("{}.name", path), &rule.name);
            if rules[..i].iter().any(|r| r.name == rule.name) {
                errors.push(format!("{}.name: duplicate rule '{}'", path, rule.name));
            }
            if let Predicate::DistancePerDay { min, max } | Predicate::ExpensePerDay { min, max } =
                rule.when
            {
                if !(min.is_finite() && max.is_finite()) || min > max {
                    errors.push(format!("{}.when: invalid band [{}, {}]", path, min, max));
                }
            }
        }
    }

    if let Some(ref quirk) = config.quirk {
        for (i, cents) in quirk.trigger_cents.iter().enumerate() {
            if *cents > 99 {
                errors.push(format!(
                    "scoring.quirk.trigger_cents[{}]: {} is not a cents value (0-99)",
                    i, cents
                ));
            }
        }
        check_finite(&mut errors, "scoring.quirk.bonus", quirk.bonus);
    }

    if let Some(ref jitter) = config.jitter {
        check_non_negative(&mut errors, "scoring.jitter.amplitude", jitter.amplitude);
    }

    if let Some(ref overrides) = config.overrides {
        for (i, rule) in overrides.iter().enumerate() {
            let path = format!("scoring.overrides[{}]", i);
            match *rule {
                OverrideRule::Cap { multiple, offset, .. } => {
                    check_non_negative(&mut errors, &format!("{}.cap.multiple", path), multiple);
                    check_finite(&mut errors, &format!("{}.cap.offset", path), offset);
                }
                OverrideRule::Floor { minimum, .. } => {
                    check_non_negative(&mut errors, &format!("{}.floor.minimum", path), minimum);
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Every derived parameter name must be unique within its component, or
/// `set_parameters(parameters())` would write one value into two fields.
fn check_parameter_keys(errors: &mut Vec<String>, keys: &[(String, String)]) {
    for (i, (path, key)) in keys.iter().enumerate() {
        if keys[..i].iter().any(|(_, other)| other == key) {
            errors.push(format!(
                "{}: parameter '{}' collides with another parameter",
                path, key
            ));
        }
    }
}

fn check_finite(errors: &mut Vec<String>, path: &str, value: f64) {
    if !value.is_finite() {
        errors.push(format!("{}: must be a finite number", path));
    }
}

fn check_non_negative(errors: &mut Vec<String>, path: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.push(format!("{}: must be non-negative", path));
    }
}

/// Names become part of qualified parameter names, so they must not contain
/// the qualifier.
fn check_name(errors: &mut Vec<String>, path: &str, name: &str) {
    if name.is_empty() {
        errors.push(format!("{}: must not be empty", path));
    } else if name.contains(QUALIFIER) || name.contains(char::is_whitespace) {
        errors.push(format!("{}: invalid name '{}'", path, name));
    }
}
