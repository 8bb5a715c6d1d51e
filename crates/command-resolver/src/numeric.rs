//! Frequency extraction for parametrized tone commands

use crate::Command;
use regex::Regex;
use std::sync::OnceLock;

/// Lowest frequency the buzzer accepts (Hz)
pub const MIN_FREQUENCY_HZ: u32 = 20;
/// Highest frequency the buzzer accepts (Hz)
pub const MAX_FREQUENCY_HZ: u32 = 20_000;
/// Tone length used for synthesized commands (seconds)
pub const DEFAULT_TONE_SECONDS: u32 = 2;

/// Words that make an utterance eligible for frequency extraction.
pub const SOUND_TRIGGERS: &[&str] = &[
    "suara",
    "nada",
    "bunyi",
    "frekuensi",
    "frequency",
    "sound",
    "tone",
];

/// True when the text mentions a sound/frequency trigger word.
pub fn has_sound_trigger(text: &str) -> bool {
    let text = text.to_lowercase();
    SOUND_TRIGGERS.iter().any(|t| text.contains(t))
}

/// Build `S<hz>:2` from the first digit run in `text`.
///
/// Returns `None` when no trigger word or no digits are present. The
/// frequency is clamped into the audible range; a digit run too long to
/// represent clamps to the maximum.
pub fn extract_parametrized(text: &str) -> Option<Command> {
    if !has_sound_trigger(text) {
        return None;
    }
    let hz = first_number(text)?;
    let clamped = hz.clamp(u64::from(MIN_FREQUENCY_HZ), u64::from(MAX_FREQUENCY_HZ));
    if clamped != hz {
        tracing::debug!(requested = hz, clamped, "frequency clamped");
    }
    // Clamped value always fits.
    let clamped = u32::try_from(clamped).unwrap_or(MAX_FREQUENCY_HZ);
    Some(Command::tone(clamped, DEFAULT_TONE_SECONDS))
}

fn first_number(text: &str) -> Option<u64> {
    static DIGITS_REGEX: OnceLock<Regex> = OnceLock::new();
    let digits_regex = DIGITS_REGEX
        .get_or_init(|| Regex::new(r"[0-9]+").expect("Invalid regex pattern - this is a bug"));
    let digits = digits_regex.find(text)?.as_str();
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(text: &str) -> Option<String> {
        extract_parametrized(text).map(Command::into_string)
    }

    #[test]
    fn test_in_range() {
        assert_eq!(tone("mainkan suara 500 hz").as_deref(), Some("S500:2"));
        assert_eq!(tone("play a tone at 440").as_deref(), Some("S440:2"));
    }

    #[test]
    fn test_clamped_low_and_high() {
        assert_eq!(tone("suara 5 hz").as_deref(), Some("S20:2"));
        assert_eq!(tone("suara 99999 hz").as_deref(), Some("S20000:2"));
        assert_eq!(tone("nada 0").as_deref(), Some("S20:2"));
        assert_eq!(
            tone("frekuensi 123456789012345678901234567890").as_deref(),
            Some("S20000:2")
        );
    }

    #[test]
    fn test_first_digit_run_is_used() {
        assert_eq!(tone("bunyi 300 lalu 900").as_deref(), Some("S300:2"));
    }

    #[test]
    fn test_no_digits_or_no_trigger() {
        assert_eq!(tone("mainkan suara"), None);
        assert_eq!(tone("maju 500 langkah"), None);
    }
}
