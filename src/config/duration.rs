// src/config/duration.rs

use std::time::Duration;

/// Parse a duration string like `"3s"`, `"250ms"`, `"1m"` or `"2h"`.
///
/// Used for `task_duration`, `tick_interval`, `probe_timeout` and the
/// per-stage `duration` override.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;
    if split == 0 {
        return Err(format!("duration '{s}' must start with a number"));
    }

    let (amount, unit) = s.split_at(split);
    let amount: u64 = amount
        .parse()
        .map_err(|e| format!("invalid duration number '{amount}': {e}"))?;

    let per_unit = match unit.trim().to_lowercase().as_str() {
        "ms" => Duration::from_millis(1),
        "s" => Duration::from_secs(1),
        "m" => Duration::from_secs(60),
        "h" => Duration::from_secs(60 * 60),
        other => {
            return Err(format!(
                "unsupported duration unit '{other}'; expected ms, s, m, or h"
            ));
        }
    };

    u32::try_from(amount)
        .ok()
        .and_then(|n| per_unit.checked_mul(n))
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
