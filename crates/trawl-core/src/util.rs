use std::any::Any;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::AppError;

/// Longest interval the engine accepts (30 years).
pub const MAX_INTERVAL: Duration = Duration::from_secs(30 * 365 * 24 * 3600);

const NANOS_PER_UNIT: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3_600 * 1_000_000_000),
];

/// Parse a poll interval such as `"90s"`, `"1h30m"` or `"1.5h"`.
///
/// The string is a sequence of decimal numbers, each followed by a unit
/// (`ns`, `us`/`µs`, `ms`, `s`, `m`, `h`). Only positive durations up to
/// [`MAX_INTERVAL`] are accepted.
pub fn parse_duration(input: &str) -> Result<Duration, AppError> {
    let invalid = |reason: &str| AppError::InvalidDuration(format!("'{input}': {reason}"));

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if s.starts_with('-') {
        return Err(invalid("must be positive"));
    }
    let mut rest = s.strip_prefix('+').unwrap_or(s);

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_number) = match after_int.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
                tail.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_len = after_number
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_number.len());
        let (unit, tail) = after_number.split_at(unit_len);
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| invalid(&format!("unknown unit '{unit}'")))?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid("number out of range"))?
        };
        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid("number out of range"))?;

        if !frac_part.is_empty() {
            // Digits past 1e-18 cannot change the result for any unit.
            let digits = &frac_part[..frac_part.len().min(18)];
            let numerator: u128 = digits.parse().map_err(|_| invalid("bad fraction"))?;
            nanos = nanos
                .checked_add(numerator * scale / 10u128.pow(digits.len() as u32))
                .ok_or_else(|| invalid("number out of range"))?;
        }

        total = total
            .checked_add(nanos)
            .ok_or_else(|| invalid("number out of range"))?;
        rest = tail;
    }

    if total == 0 {
        return Err(invalid("must be positive"));
    }
    if total > MAX_INTERVAL.as_nanos() {
        return Err(invalid("longer than 30 years"));
    }
    let secs = u64::try_from(total / 1_000_000_000).map_err(|_| invalid("number out of range"))?;
    Ok(Duration::new(secs, (total % 1_000_000_000) as u32))
}

/// Render a duration in the notation [`parse_duration`] accepts.
///
/// Example: 5400s → `"1h30m"`, 1.5s → `"1s500ms"`.
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }

    let total_secs = duration.as_secs();
    let (hours, minutes, secs) = (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60);
    let millis = duration.subsec_millis();

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if secs > 0 {
        out.push_str(&format!("{secs}s"));
    }
    if millis > 0 {
        out.push_str(&format!("{millis}ms"));
    }
    if out.is_empty() {
        out = format!("{}ns", duration.subsec_nanos());
    }
    out
}

/// `interval` from now, clamped to [`MAX_INTERVAL`] so the addition cannot
/// overflow the clock.
pub(crate) fn deadline_after(interval: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(interval.min(MAX_INTERVAL)).unwrap_or(now)
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_units() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("10µs").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1m0.25s").unwrap(), Duration::from_millis(60_250));
        assert_eq!(parse_duration(" 45s ").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "   ", "abc", "10", "10x", "s", "1h30", ".s", "1..5s"] {
            let err = parse_duration(input).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidDuration(_)),
                "expected InvalidDuration for {input:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("0h0m").is_err());
        assert!(parse_duration("-5m").is_err());
    }

    #[test]
    fn test_parse_rejects_oversized() {
        assert_eq!(parse_duration("262800h").unwrap(), MAX_INTERVAL);
        for input in ["262801h", "3000000000000000h", "99999999999999999999999s"] {
            let err = parse_duration(input).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidDuration(_)),
                "expected InvalidDuration for {input:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_after_saturates() {
        let now = Instant::now();
        assert_eq!(deadline_after(Duration::from_secs(5)), now + Duration::from_secs(5));
        assert_eq!(deadline_after(Duration::MAX), now + MAX_INTERVAL);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1s500ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn test_panic_message() {
        let caught = std::panic::catch_unwind(|| -> u8 { panic!("missing h1.tm-title") }).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "missing h1.tm-title");

        let caught = std::panic::catch_unwind(|| -> u8 { panic!("{} selector", "bad") }).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "bad selector");
    }

    #[test]
    fn test_format_output_parses_back() {
        let d = Duration::from_secs(3 * 3600 + 7);
        assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
    }
}
