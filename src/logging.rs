//! Colored console logging on top of `env_logger`.
//!
//! `log` has no SUCCESS level, so success lines are `Info` records sent to a
//! dedicated target; the formatter renders that target with its own label.

use std::io::Write;

use env_logger::fmt::style::{AnsiColor, Style};
use log::{Level, LevelFilter};

/// Target used by the [`success!`](crate::success) macro.
pub const SUCCESS_TARGET: &str = "reach_probe::success";

/// Log an `Info` record that is rendered with the SUCCESS label.
#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {
        ::log::info!(target: $crate::logging::SUCCESS_TARGET, $($arg)+)
    };
}

/// Color tone used for labels and highlighted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

impl Tone {
    fn style(self) -> Style {
        let color = match self {
            Tone::Debug => AnsiColor::Cyan,
            Tone::Info => AnsiColor::Blue,
            Tone::Success => AnsiColor::Green,
            Tone::Warning => AnsiColor::Yellow,
            Tone::Error => AnsiColor::Red,
        };
        Style::new().fg_color(Some(color.into())).bold()
    }

    fn label(self) -> &'static str {
        match self {
            Tone::Debug => "DEBUG",
            Tone::Info => "INFO",
            Tone::Success => "SUCCESS",
            Tone::Warning => "WARNING",
            Tone::Error => "ERROR",
        }
    }

    fn for_record(level: Level, target: &str) -> Self {
        if target == SUCCESS_TARGET {
            return Tone::Success;
        }
        match level {
            Level::Error => Tone::Error,
            Level::Warn => Tone::Warning,
            Level::Info => Tone::Info,
            Level::Debug | Level::Trace => Tone::Debug,
        }
    }
}

/// Wrap `text` in the ANSI style of `tone`.
///
/// The escapes are stripped by the logger when the output is not a terminal.
pub fn highlight(text: impl std::fmt::Display, tone: Tone) -> String {
    let style = tone.style();
    format!("{style}{text}{style:#}")
}

/// One console line: `HH:MM:SS LEVEL target message`, level colored.
fn render_line(
    time: impl std::fmt::Display,
    tone: Tone,
    target: &str,
    message: impl std::fmt::Display,
) -> String {
    let style = tone.style();
    format!("{time} {style}{:<7}{style:#} {target} {message}", tone.label())
}

fn default_filter(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Install the global logger. `RUST_LOG`, when set, overrides `verbose`.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_filter(verbose));
    builder.parse_default_env();
    builder.format(|buf, record| {
        let tone = Tone::for_record(record.level(), record.target());
        let line = render_line(
            chrono::Local::now().format("%H:%M:%S"),
            tone,
            record.target(),
            record.args(),
        );
        writeln!(buf, "{line}")
    });
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_target_maps_to_success_tone() {
        assert_eq!(Tone::for_record(Level::Info, SUCCESS_TARGET), Tone::Success);
        assert_eq!(Tone::for_record(Level::Info, "reach_probe::batch"), Tone::Info);
        assert_eq!(Tone::for_record(Level::Trace, "x"), Tone::Debug);
    }

    #[test]
    fn test_highlight_keeps_text() {
        let out = highlight("a.example", Tone::Warning);
        assert!(out.contains("a.example"));
        assert!(out.len() > "a.example".len());
    }

    #[test]
    fn test_line_layout() {
        let line = render_line("12:34:56", Tone::Warning, "reach_probe::batch", "3 out of 4");

        let positions: Vec<usize> = ["12:34:56", "WARNING", "reach_probe::batch", "3 out of 4"]
            .iter()
            .map(|part| line.find(part).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{line}");
        assert!(line.starts_with("12:34:56 "));
        assert!(line.ends_with(" reach_probe::batch 3 out of 4"));
    }

    #[test]
    fn test_verbose_filter() {
        assert_eq!(default_filter(true), LevelFilter::Debug);
        assert_eq!(default_filter(false), LevelFilter::Info);
    }
}
