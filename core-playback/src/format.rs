//! Time display helpers for the now-playing surface.

/// Format seconds as `m:ss`, or `h:mm:ss` from one hour up.
///
/// Negative and non-finite inputs render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Fraction of `duration` elapsed at `current`, clamped to `[0, 1]`.
pub fn progress(current: f64, duration: f64) -> f64 {
    if !(duration.is_finite() && duration > 0.0) || !current.is_finite() {
        return 0.0;
    }
    (current / duration).clamp(0.0, 1.0)
}

/// Convert seconds to whole milliseconds for event payloads.
pub(crate) fn to_millis(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(5.9), "0:05");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(599.0), "9:59");
        assert_eq!(format_time(3600.0), "1:00:00");
        assert_eq!(format_time(3725.0), "1:02:05");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn test_progress() {
        assert_eq!(progress(50.0, 200.0), 0.25);
        assert_eq!(progress(10.0, 0.0), 0.0);
        assert_eq!(progress(300.0, 200.0), 1.0);
        assert_eq!(progress(-1.0, 200.0), 0.0);
    }

    #[test]
    fn test_to_millis() {
        assert_eq!(to_millis(1.2345), 1235);
        assert_eq!(to_millis(-1.0), 0);
    }
}
