pub mod formatter;

pub use formatter::{
    format_amount, format_breakdown, format_calibration, format_elapsed, format_evaluation,
    format_parameters, format_percent, format_saved_summary, format_signed, should_use_colors,
};
