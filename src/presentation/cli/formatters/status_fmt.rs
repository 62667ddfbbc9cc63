use colored::{ColoredString, Colorize};

use crate::domain::value_objects::scheduler_state::SchedulerState;

/// Degrees below the threshold at which a reading is shown as a warning.
const WARN_MARGIN: f64 = 5.0;

#[must_use]
pub fn colorize_temperature(temperature: f64, threshold: f64) -> ColoredString {
    let text = format!("{temperature:.2} °C");
    if temperature > threshold {
        text.red().bold()
    } else if temperature > threshold - WARN_MARGIN {
        text.yellow()
    } else {
        text.green()
    }
}

#[must_use]
pub fn colorize_state(state: SchedulerState) -> ColoredString {
    let text = state.to_string();
    match state {
        SchedulerState::Running => text.green().bold(),
        SchedulerState::Stopping => text.yellow(),
        SchedulerState::Stopped => text.red(),
        SchedulerState::Idle => text.dimmed(),
    }
}

pub fn print_banner(title: &str) {
    println!("{}", "━".repeat(50).cyan());
    println!("{}", format!("  {title}").bold().cyan());
    println!("{}", "━".repeat(50).cyan());
}

pub fn print_section_header(title: &str) {
    println!("{}", title.bold().cyan());
    let display_width = title.chars().count();
    println!("{}", "─".repeat(display_width).cyan());
}

#[cfg(test)]
mod tests {
    use super::*;
    use colored::control;

    fn disable_colors() {
        control::set_override(false);
    }

    #[test]
    fn temperature_is_formatted_with_two_decimals() {
        disable_colors();
        assert_eq!(colorize_temperature(25.0, 40.0).to_string(), "25.00 °C");
        assert_eq!(colorize_temperature(41.239, 40.0).to_string(), "41.24 °C");
    }

    #[test]
    fn state_renders_its_name() {
        disable_colors();
        assert_eq!(
            colorize_state(SchedulerState::Running).to_string(),
            SchedulerState::Running.to_string()
        );
    }
}
