//! HHMM integer encoding for the four punch fields of an attendance entry.
//!
//! A punch is stored as `hour * 100 + minute`. Three reserved values stand in
//! for whole-day states instead of a clock time.

/// No punch recorded. Also the encoding of midnight, which therefore never
/// counts as a punch.
pub const ABSENT: i32 = 0;
/// Whole-day excused absence.
pub const EXCUSED: i32 = 3000;
/// Whole-day holiday.
pub const HOLIDAY: i32 = -2;

/// Largest value that can hold a clock time.
pub const LATEST: i32 = 2359;

/// Placeholder rendered for anything that is not a displayable clock time.
pub const PLACEHOLDER: &str = "--:--";

/// Encodes a clock time as HHMM. Out-of-range input saturates at `i32::MAX`,
/// which [`split`] rejects as malformed.
pub fn encode(hour: u32, minute: u32) -> i32 {
    let code = hour.saturating_mul(100).saturating_add(minute);
    i32::try_from(code).unwrap_or(i32::MAX)
}

/// Splits a code into `(hour, minute)` when it is a well-formed clock time.
pub fn split(code: i32) -> Option<(u32, u32)> {
    if !(ABSENT..=LATEST).contains(&code) {
        return None;
    }
    let hour = (code / 100) as u32;
    let minute = (code % 100) as u32;
    (minute < 60).then_some((hour, minute))
}

/// True when `code` is an actual punch: a well-formed, non-zero clock time.
pub fn is_punch(code: i32) -> bool {
    code != ABSENT && split(code).is_some()
}

/// Renders a code for display as `hh:mm AM/PM`.
///
/// Never fails: zero and malformed codes render as [`PLACEHOLDER`], the
/// excused sentinel as `"Excused"`.
pub fn decode(code: i32) -> String {
    if code == EXCUSED {
        return "Excused".to_string();
    }
    if code == ABSENT {
        return PLACEHOLDER.to_string();
    }
    match split(code) {
        Some((hour, minute)) => {
            let suffix = if hour < 12 { "AM" } else { "PM" };
            let display_hour = match hour % 12 {
                0 => 12,
                other => other,
            };
            format!("{display_hour:02}:{minute:02} {suffix}")
        }
        None => PLACEHOLDER.to_string(),
    }
}
