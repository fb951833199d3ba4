use std::io::IsTerminal;
use std::time::Duration;

use owo_colors::OwoColorize;

use crate::calibrate::storage::SavedParameters;
use crate::calibrate::CalibrationResult;
use crate::evaluate::Evaluation;
use crate::scoring::{Breakdown, ParameterVector};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Amount with exactly two decimals ("427.75", "120.00")
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Signed amount with two decimals ("+7.50", "-950.00")
pub fn format_signed(amount: f64) -> String {
    // avoid printing "-0.00"
    if amount.abs() < 0.005 {
        "+0.00".to_string()
    } else {
        format!("{:+.2}", amount)
    }
}

/// Fraction as a percentage with one decimal ("12.5%")
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Elapsed time rounded to milliseconds ("1s 234ms")
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = Duration::from_millis(elapsed.as_millis() as u64);
    humantime::format_duration(millis).to_string()
}

/// Per-component contributions, one per line, followed by the total.
/// Zero contributions are listed too so the sum is visible.
pub fn format_breakdown(breakdown: &Breakdown, use_colors: bool) -> String {
    let width = breakdown
        .contributions
        .iter()
        .map(|c| c.id.len())
        .chain(["override".len()])
        .max()
        .unwrap_or(0);

    let mut lines: Vec<String> = breakdown
        .contributions
        .iter()
        .map(|c| format!("  {:<width$}  {:>10}", c.id, format_signed(c.amount), width = width))
        .collect();

    if breakdown.override_adjustment != 0.0 {
        let line = format!(
            "  {:<width$}  {:>10}",
            "override",
            format_signed(breakdown.override_adjustment),
            width = width
        );
        lines.push(if use_colors { line.yellow().to_string() } else { line });
    }

    let total = format!(
        "  {:<width$}  {:>10}",
        "amount",
        format_amount(breakdown.amount),
        width = width
    );
    lines.push(if use_colors { total.bold().to_string() } else { total });

    lines.join("\n")
}

/// Multi-line accuracy report, with the worst cases listed last.
pub fn format_evaluation(evaluation: &Evaluation, use_colors: bool) -> String {
    let exact = format!(
        "{}/{} ({})",
        evaluation.exact_match_count,
        evaluation.count,
        format_percent(evaluation.exact_match_rate())
    );
    let close = format!(
        "{}/{} ({})",
        evaluation.close_match_count,
        evaluation.count,
        format_percent(evaluation.close_match_rate())
    );

    let mut lines = vec![
        format!("Cases:          {}", evaluation.count),
        format!(
            "Exact matches:  {}",
            if use_colors { exact.green().to_string() } else { exact }
        ),
        format!(
            "Close matches:  {}",
            if use_colors { close.cyan().to_string() } else { close }
        ),
        format!("Mean error:     {}", format_amount(evaluation.mean_absolute_error)),
        format!("Median error:   {}", format_amount(evaluation.median_absolute_error)),
        format!("Max error:      {}", format_amount(evaluation.max_absolute_error)),
        format!("Mean % error:   {}", format_percent(evaluation.mean_percent_error)),
    ];

    if !evaluation.worst.is_empty() {
        lines.push(String::new());
        lines.push("Worst cases:".to_string());
        for case in &evaluation.worst {
            let error = format_signed(case.error());
            lines.push(format!(
                "  #{:<5} {}d {}mi {} -> expected {}, got {} ({})",
                case.index + 1,
                case.input.duration_days,
                case.input.distance,
                format_amount(case.input.expense_amount),
                format_amount(case.expected),
                format_amount(case.actual),
                if use_colors { error.red().to_string() } else { error }
            ));
        }
    }

    lines.join("\n")
}

/// Summary of a calibration run.
pub fn format_calibration(result: &CalibrationResult, use_colors: bool) -> String {
    let status = if result.terminated_early {
        "cancelled"
    } else if result.converged {
        "converged"
    } else {
        "iteration limit reached"
    };
    let objective = format!(
        "{:.4} (baseline {:.4})",
        result.objective_value, result.baseline_objective
    );
    let objective = match (use_colors, result.improved()) {
        (true, true) => objective.green().to_string(),
        (true, false) => objective.yellow().to_string(),
        (false, _) => objective,
    };

    let mut lines = vec![
        format!("Objective:    {}", objective),
        format!("Generations:  {} ({})", result.iterations, status),
        format!("Evaluations:  {}", result.evaluations),
        format!("Elapsed:      {}", format_elapsed(result.elapsed)),
    ];
    if !result.improved() {
        lines.push("No improvement found; parameters unchanged.".to_string());
    }
    lines.join("\n")
}

/// Where the loaded parameters came from and how well they scored.
pub fn format_saved_summary(saved: &SavedParameters, use_colors: bool) -> String {
    let saved_at = saved.saved_at.format("%Y-%m-%d %H:%M UTC").to_string();
    let mut lines = vec![format!(
        "Saved:        {}",
        if use_colors { saved_at.dimmed().to_string() } else { saved_at }
    )];
    if let Some(objective) = saved.objective {
        lines.push(format!("Objective:    {:.4}", objective));
    }
    if let Some(performance) = saved.performance {
        let rate = |matches: usize| {
            if performance.cases == 0 {
                0.0
            } else {
                matches as f64 / performance.cases as f64
            }
        };
        lines.push(format!(
            "Exact:        {}/{} ({})",
            performance.exact_matches,
            performance.cases,
            format_percent(rate(performance.exact_matches))
        ));
        lines.push(format!(
            "Close:        {}/{} ({})",
            performance.close_matches,
            performance.cases,
            format_percent(rate(performance.close_matches))
        ));
    }
    lines.join("\n")
}

/// One `name = value` line per qualified parameter, in engine order.
pub fn format_parameters(vector: &ParameterVector, use_colors: bool) -> String {
    if vector.is_empty() {
        return "No parameters.".to_string();
    }

    let width = vector.names().map(str::len).max().unwrap_or(0);
    vector
        .iter()
        .map(|(name, value)| {
            let padded = format!("{:<width$}", name, width = width);
            if use_colors {
                format!("{} = {}", padded.cyan(), value)
            } else {
                format!("{} = {}", padded, value)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrate::storage::StoredPerformance;
    use crate::evaluate::CaseError;
    use crate::scoring::{ComponentContribution, InputRecord};

    fn sample_breakdown() -> Breakdown {
        Breakdown {
            contributions: vec![
                ComponentContribution { id: "duration".to_string(), amount: 1400.0 },
                ComponentContribution { id: "quirk".to_string(), amount: 0.0 },
            ],
            subtotal: 1400.0,
            override_adjustment: -950.0,
            total: 450.0,
            amount: 450.0,
        }
    }

    fn sample_evaluation() -> Evaluation {
        Evaluation {
            count: 4,
            mean_absolute_error: 2.6,
            median_absolute_error: 0.25,
            max_absolute_error: 10.0,
            exact_match_count: 2,
            close_match_count: 3,
            mean_percent_error: 0.0134,
            worst: vec![CaseError {
                index: 3,
                input: InputRecord::new(4.0, 0.0, 0.0),
                expected: 410.0,
                actual: 400.0,
            }],
        }
    }

    fn sample_result(objective_value: f64) -> CalibrationResult {
        CalibrationResult {
            best_vector: ParameterVector::new(),
            objective_value,
            baseline_objective: 110.1,
            iterations: 12,
            converged: true,
            terminated_early: false,
            evaluations: 195,
            elapsed: Duration::from_micros(1_234_567),
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(427.75), "427.75");
        assert_eq!(format_amount(120.0), "120.00");
        assert_eq!(format_amount(0.0), "0.00");
    }

    #[test]
    fn test_format_signed() {
        assert_eq!(format_signed(7.5), "+7.50");
        assert_eq!(format_signed(-950.0), "-950.00");
        assert_eq!(format_signed(-0.001), "+0.00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.125), "12.5%");
        assert_eq!(format_percent(0.0), "0.0%");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_micros(1_234_567)), "1s 234ms");
        assert_eq!(format_elapsed(Duration::from_millis(50)), "50ms");
    }

    #[test]
    fn test_format_breakdown() {
        let output = format_breakdown(&sample_breakdown(), false);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("duration") && lines[0].contains("+1400.00"));
        assert!(lines[1].contains("quirk") && lines[1].contains("+0.00"));
        assert!(lines[2].contains("override") && lines[2].contains("-950.00"));
        assert!(lines[3].contains("amount") && lines[3].ends_with("450.00"));
    }

    #[test]
    fn test_format_breakdown_without_override() {
        let mut breakdown = sample_breakdown();
        breakdown.override_adjustment = 0.0;
        let output = format_breakdown(&breakdown, false);
        assert!(!output.contains("override"));
    }

    #[test]
    fn test_format_evaluation() {
        let output = format_evaluation(&sample_evaluation(), false);
        assert!(output.contains("Cases:          4"));
        assert!(output.contains("Exact matches:  2/4 (50.0%)"));
        assert!(output.contains("Close matches:  3/4 (75.0%)"));
        assert!(output.contains("Mean error:     2.60"));
        assert!(output.contains("Mean % error:   1.3%"));
        assert!(output.contains("#4"));
        assert!(output.contains("expected 410.00, got 400.00 (-10.00)"));
    }

    #[test]
    fn test_format_calibration() {
        let output = format_calibration(&sample_result(3.25), false);
        assert!(output.contains("Objective:    3.2500 (baseline 110.1000)"));
        assert!(output.contains("Generations:  12 (converged)"));
        assert!(output.contains("Elapsed:      1s 234ms"));
        assert!(!output.contains("No improvement"));
    }

    #[test]
    fn test_format_calibration_without_improvement() {
        let output = format_calibration(&sample_result(110.1), false);
        assert!(output.contains("No improvement found"));
    }

    #[test]
    fn test_format_parameters() {
        let vector: ParameterVector = vec![("duration.daily_rate", 100.0), ("quirk.bonus", 7.5)]
            .into_iter()
            .collect();
        let output = format_parameters(&vector, false);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "duration.daily_rate = 100");
        assert_eq!(lines[1], "quirk.bonus         = 7.5");
    }

    #[test]
    fn test_format_saved_summary() {
        let vector: ParameterVector = vec![("duration.daily_rate", 100.0)].into_iter().collect();
        let mut saved = SavedParameters::new(&vector, Some(3.25));
        saved.saved_at = "2026-03-01T09:30:00Z".parse().unwrap();
        saved.performance = Some(StoredPerformance {
            cases: 8,
            exact_matches: 2,
            close_matches: 6,
        });

        let output = format_saved_summary(&saved, false);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "Saved:        2026-03-01 09:30 UTC");
        assert_eq!(lines[1], "Objective:    3.2500");
        assert_eq!(lines[2], "Exact:        2/8 (25.0%)");
        assert_eq!(lines[3], "Close:        6/8 (75.0%)");
    }

    #[test]
    fn test_format_saved_summary_without_performance() {
        let mut saved = SavedParameters::new(&ParameterVector::new(), None);
        saved.saved_at = "2026-03-01T09:30:00Z".parse().unwrap();
        assert_eq!(format_saved_summary(&saved, false), "Saved:        2026-03-01 09:30 UTC");
    }

    #[test]
    fn test_format_parameters_empty() {
        assert_eq!(format_parameters(&ParameterVector::new(), false), "No parameters.");
    }
}
