//! Parameter extraction for chat commands
//!
//! Commands carry loosely-formatted `key: value` tokens anywhere in the
//! message. Extraction is forgiving: a missing or unparsable parameter
//! falls back to its default instead of failing the command.

use chrono::NaiveDate;

/// Fitness levels accepted by `level:`
const LEVELS: [&str; 3] = ["beginner", "intermediate", "advanced"];

pub const DEFAULT_DAYS: u32 = 4;
pub const DEFAULT_LEVEL: &str = "intermediate";
pub const DEFAULT_CALORIES: u32 = 2200;

/// Byte position right after `marker`, matched case-insensitively
fn after_marker(input: &str, marker: &str) -> Option<usize> {
    let lower = input.to_lowercase();
    // When lowercasing changed byte lengths the position cannot be mapped
    // back onto the original; markers are ASCII so this is the rare path.
    let haystack = if lower.len() == input.len() { &lower } else { input };
    haystack.find(marker).map(|pos| pos + marker.len())
}

/// First whitespace-delimited token following `marker`
pub fn extract_token(input: &str, marker: &str) -> Option<String> {
    let pos = after_marker(input, marker)?;
    input
        .get(pos..)?
        .split_whitespace()
        .next()
        .map(|token| token.to_string())
}

/// Everything following `marker`, trimmed
pub fn extract_rest(input: &str, marker: &str) -> Option<String> {
    let pos = after_marker(input, marker)?;
    let rest = input.get(pos..)?.trim();
    if rest.is_empty() { None } else { Some(rest.to_string()) }
}

/// `days:` parameter; default 4, unparsable values fall back
pub fn parse_days(input: &str) -> u32 {
    extract_token(input, "days:")
        .and_then(|token| token.parse::<u32>().ok())
        .filter(|days| *days > 0)
        .unwrap_or(DEFAULT_DAYS)
}

/// `level:` parameter, validated against the known levels; default intermediate
pub fn parse_level(input: &str) -> String {
    extract_token(input, "level:")
        .map(|token| token.to_lowercase())
        .filter(|level| LEVELS.contains(&level.as_str()))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// `calories:` parameter; default 2200
pub fn parse_calories(input: &str) -> u32 {
    extract_token(input, "calories:")
        .and_then(|token| token.parse::<u32>().ok())
        .filter(|calories| *calories > 0)
        .unwrap_or(DEFAULT_CALORIES)
}

/// `name:` parameter for calendar export
///
/// Captures the remainder of the message so multi-word names work, but
/// stops at a following ` date:` marker so both parameters can be given.
pub fn extract_calendar_name(input: &str) -> Option<String> {
    let rest = extract_rest(input, "name:")?;
    let lower = rest.to_lowercase();
    let name = match lower.find("date:") {
        Some(pos) if lower.len() == rest.len() => rest.get(..pos).unwrap_or(&rest).trim(),
        _ => rest.trim(),
    };
    if name.is_empty() { None } else { Some(name.to_string()) }
}

/// `date:` parameter as YYYY-MM-DD; None when absent or unparsable
pub fn parse_start_date(input: &str) -> Option<NaiveDate> {
    let token = extract_token(input, "date:")?;
    NaiveDate::parse_from_str(&token, "%Y-%m-%d").ok()
}

/// Trailing 1-based plan index, converted to 0-based
///
/// The number follows the first `:` when present, otherwise the literal
/// word `plan` ("load workout plan 2").
pub fn parse_plan_index(input: &str) -> Option<usize> {
    let number_part = match input.split_once(':') {
        Some((_, rest)) => rest,
        None => {
            let pos = after_marker(input, "plan")?;
            input.get(pos..)?
        }
    };

    let index = number_part.trim().parse::<i64>().ok()?;
    if index >= 1 { Some((index - 1) as usize) } else { None }
}

/// `update profile k: v, k: v, ...` into trimmed key/value pairs
///
/// Splits the remainder on commas, each segment at its first colon;
/// segments without a colon are ignored.
pub fn parse_profile_updates(input: &str) -> Vec<(String, String)> {
    let rest = after_marker(input, "update profile")
        .and_then(|pos| input.get(pos..))
        .unwrap_or("");

    rest.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once(':')?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                None
            } else {
                Some((key.to_string(), value.to_string()))
            }
        })
        .collect()
}
