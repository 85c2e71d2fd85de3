//! Date-window policy for generated matches.
//!
//! All generated matches start at a fixed local hour; the calendar used to
//! decide "today" and "tomorrow" is the configured UTC offset.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::config::EngineConfig;

/// Span of time league matches are spread across
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Resolve the configured window against `now`
    ///
    /// The start falls back to `now` when missing or already past; the end
    /// falls back to `start + default_span` when missing or not after the start.
    pub fn effective(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        default_span: Duration,
    ) -> Self {
        let start = match start {
            Some(start) if start > now => start,
            _ => now,
        };
        let end = match end {
            Some(end) if end > start => end,
            _ => start + default_span,
        };
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Keep only the leading `share` of the window
    pub fn scaled(&self, share: f64) -> Self {
        let millis = (self.duration().num_milliseconds() as f64 * share) as i64;
        Self {
            start: self.start,
            end: self.start + Duration::milliseconds(millis),
        }
    }

    /// Linear position of item `index` out of `total`
    pub fn slot(&self, index: usize, total: usize) -> DateTime<Utc> {
        if total <= 1 {
            return self.start;
        }
        let span = i128::from(self.duration().num_milliseconds());
        let offset = span * index as i128 / total as i128;
        self.start + Duration::milliseconds(offset as i64)
    }
}

/// Calendar date of `at` in the local offset
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// `date` at `hour`:00 local time
pub fn date_at_hour(date: NaiveDate, hour: u32, offset: FixedOffset) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let local = date.and_time(time) - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&local)
}

/// Same local day as `at`, pinned to the match hour
pub fn pin_to_match_hour(at: DateTime<Utc>, config: &EngineConfig) -> DateTime<Utc> {
    let offset = config.offset();
    date_at_hour(local_date(at, offset), config.match_hour, offset)
}

/// The local day after `at`, pinned to the match hour
pub fn day_after(at: DateTime<Utc>, config: &EngineConfig) -> DateTime<Utc> {
    let offset = config.offset();
    let next = local_date(at, offset)
        .succ_opt()
        .unwrap_or_else(|| local_date(at, offset));
    date_at_hour(next, config.match_hour, offset)
}

/// First match of a standalone bracket: the configured start day if it is
/// after tomorrow, otherwise tomorrow
pub fn bracket_base(
    start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> DateTime<Utc> {
    let tomorrow = day_after(now, config);
    match start.map(|start| pin_to_match_hour(start, config)) {
        Some(start) if start > tomorrow => start,
        _ => tomorrow,
    }
}

/// First match of a follow-up round: the day after the finished round, never
/// earlier than tomorrow
pub fn next_round_base(
    last_match: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> DateTime<Utc> {
    let tomorrow = day_after(now, config);
    match last_match.map(|at| day_after(at, config)) {
        Some(after_round) if after_round > tomorrow => after_round,
        _ => tomorrow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_effective_window_past_start_uses_now() {
        let now = utc(2025, 5, 10, 3);
        let window = DateWindow::effective(
            Some(utc(2025, 5, 1, 0)),
            Some(utc(2025, 5, 20, 0)),
            now,
            Duration::days(7),
        );
        assert_eq!(window.start, now);
        assert_eq!(window.end, utc(2025, 5, 20, 0));
    }

    #[test]
    fn test_effective_window_bad_end_uses_default_span() {
        let now = utc(2025, 5, 10, 3);
        let start = utc(2025, 5, 12, 0);
        let window =
            DateWindow::effective(Some(start), Some(utc(2025, 5, 11, 0)), now, Duration::days(7));
        assert_eq!(window.start, start);
        assert_eq!(window.end, start + Duration::days(7));

        let window = DateWindow::effective(None, None, now, Duration::days(7));
        assert_eq!(window.start, now);
        assert_eq!(window.end, now + Duration::days(7));
    }

    #[test]
    fn test_scaled_window() {
        let start = utc(2025, 5, 1, 0);
        let window = DateWindow {
            start,
            end: start + Duration::days(10),
        };
        assert_eq!(window.scaled(0.8).end, start + Duration::days(8));
    }

    #[test]
    fn test_slot_interpolation() {
        let start = utc(2025, 5, 1, 0);
        let window = DateWindow {
            start,
            end: start + Duration::days(6),
        };
        assert_eq!(window.slot(0, 3), start);
        assert_eq!(window.slot(1, 3), start + Duration::days(2));
        assert_eq!(window.slot(2, 3), start + Duration::days(4));
        assert_eq!(window.slot(0, 1), start);
    }

    #[test]
    fn test_pin_uses_local_calendar() {
        let config = EngineConfig::default();
        // 2025-05-01 20:00 UTC is already 2025-05-02 05:00 at +09:00
        let pinned = pin_to_match_hour(utc(2025, 5, 1, 20), &config);
        assert_eq!(pinned, utc(2025, 5, 2, 9));
        assert_eq!(pinned.with_timezone(&config.offset()).hour(), 18);
    }

    #[test]
    fn test_day_after() {
        let config = EngineConfig::default();
        assert_eq!(day_after(utc(2025, 5, 1, 0), &config), utc(2025, 5, 2, 9));
    }

    #[test]
    fn test_bracket_base() {
        let config = EngineConfig::default();
        let now = utc(2025, 5, 1, 0);

        assert_eq!(bracket_base(None, now, &config), utc(2025, 5, 2, 9));
        assert_eq!(
            bracket_base(Some(utc(2025, 4, 1, 0)), now, &config),
            utc(2025, 5, 2, 9)
        );
        assert_eq!(
            bracket_base(Some(utc(2025, 5, 10, 0)), now, &config),
            utc(2025, 5, 10, 9)
        );
    }

    #[test]
    fn test_next_round_base_never_before_tomorrow() {
        let config = EngineConfig::default();
        let now = utc(2025, 5, 1, 0);

        assert_eq!(
            next_round_base(Some(utc(2025, 4, 1, 9)), now, &config),
            utc(2025, 5, 2, 9)
        );
        assert_eq!(
            next_round_base(Some(utc(2025, 5, 5, 9)), now, &config),
            utc(2025, 5, 6, 9)
        );
    }
}
