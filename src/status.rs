use crate::logging::Tone;

const FULL_RATE: f64 = 100.0;
const LOW_RATE_THRESHOLD: f64 = 50.0;

/// `part / total` as a percentage, 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Overall classification of a run, used for the final status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    AllWorking,
    SomeWorking,
    NoneWorking,
}

impl RunStatus {
    pub fn from_success_rate(success_rate: f64) -> Self {
        match success_rate {
            rate if rate <= 0.0 => RunStatus::NoneWorking,
            rate if rate < FULL_RATE => RunStatus::SomeWorking,
            _ => RunStatus::AllWorking,
        }
    }
}

/// Tone for displaying a success rate: green when everything works, yellow
/// below half, neutral otherwise.
pub fn rate_tone(success_rate: f64) -> Tone {
    match success_rate {
        rate if rate >= FULL_RATE => Tone::Success,
        rate if rate < LOW_RATE_THRESHOLD => Tone::Warning,
        _ => Tone::Info,
    }
}
