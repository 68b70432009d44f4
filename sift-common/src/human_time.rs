//! Human-readable elapsed time for run summaries
//!
//! Picks a format from the magnitude of the duration:
//! - under 100 s: `X.XXs`
//! - under 100 min: `M:SS.Xs`
//! - otherwise: `H:MM:SS`

use std::time::Duration;

const SHORT_FORMAT_MAX_SECS: f64 = 100.0;
const MEDIUM_FORMAT_MAX_SECS: f64 = 6000.0;

/// Format an elapsed duration
///
/// # Examples
///
/// ```
/// use sift_common::human_time::format_elapsed;
/// use std::time::Duration;
///
/// assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_elapsed(Duration::from_secs(330)), "5:30.0s");
/// assert_eq!(format_elapsed(Duration::from_secs(7261)), "2:01:01");
/// ```
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < SHORT_FORMAT_MAX_SECS {
        format!("{:.2}s", secs)
    } else if secs < MEDIUM_FORMAT_MAX_SECS {
        // Round to tenths first so 59.96 s carries into the next minute
        let tenths = (secs * 10.0).round() as u64;
        format!("{}:{:02}.{}s", tenths / 600, (tenths % 600) / 10, tenths % 10)
    } else {
        let total = elapsed.as_secs();
        format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    }
}
