use chrono::{DateTime, Duration, LocalResult, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Since midnight of the current day in the user's timezone.
    Day,
    /// Rolling seven days back from now.
    Week,
}

impl TimeWindow {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "day" => Some(TimeWindow::Day),
            "week" => Some(TimeWindow::Week),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TimeWindow::Day => "Mood Chart (Today)",
            TimeWindow::Week => "Mood Chart (Last 7 Days)",
        }
    }

    /// UTC instant where the window opens, relative to `now`.
    pub fn start_utc(&self, tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeWindow::Week => now - Duration::days(7),
            TimeWindow::Day => {
                let local_now = now.with_timezone(&tz);
                let midnight = local_now.date_naive().and_time(NaiveTime::MIN);
                match tz.from_local_datetime(&midnight) {
                    LocalResult::Single(start) => start.with_timezone(&Utc),
                    // Clocks fell back over midnight: take the earlier wall time.
                    LocalResult::Ambiguous(start, _) => start.with_timezone(&Utc),
                    // Midnight was skipped by a DST jump: count back the wall
                    // clock elapsed since local midnight instead.
                    LocalResult::None => {
                        now - local_now.time().signed_duration_since(NaiveTime::MIN)
                    }
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn week_is_rolling_seven_days() {
        let now = at(2026, 1, 15, 10, 0);
        assert_eq!(TimeWindow::Week.start_utc(Tz::UTC, now), at(2026, 1, 8, 10, 0));
    }

    #[test]
    fn day_starts_at_utc_midnight_for_utc_users() {
        let now = at(2026, 1, 15, 10, 0);
        assert_eq!(TimeWindow::Day.start_utc(Tz::UTC, now), at(2026, 1, 15, 0, 0));
    }

    #[test]
    fn day_starts_at_local_midnight() {
        // Warsaw in January is UTC+1, so local midnight is 23:00 UTC the
        // previous day.
        let now = at(2026, 1, 15, 10, 0);
        assert_eq!(
            TimeWindow::Day.start_utc(Tz::Europe__Warsaw, now),
            at(2026, 1, 14, 23, 0)
        );
    }

    #[test]
    fn day_crosses_utc_date_for_far_east_users() {
        // 22:00 UTC on Jan 14 is already Jan 15 in Tokyo (UTC+9). The local
        // day started at Jan 15 00:00 Tokyo time, i.e. Jan 14 15:00 UTC.
        let now = at(2026, 1, 14, 22, 0);
        assert_eq!(
            TimeWindow::Day.start_utc(Tz::Asia__Tokyo, now),
            at(2026, 1, 14, 15, 0)
        );
    }

    #[test]
    fn skipped_midnight_falls_back_to_elapsed_wall_clock() {
        // Chile sprang forward at midnight on 2019-09-08, so 00:00 local never
        // existed. At 12:00 UTC the local clock reads 09:00 (UTC-3), and the
        // fallback counts those nine hours back.
        let now = at(2019, 9, 8, 12, 0);
        assert_eq!(
            TimeWindow::Day.start_utc(Tz::America__Santiago, now),
            at(2019, 9, 8, 3, 0)
        );
    }

    #[test]
    fn keys_round_trip() {
        assert_eq!(TimeWindow::from_key("day"), Some(TimeWindow::Day));
        assert_eq!(TimeWindow::from_key("week"), Some(TimeWindow::Week));
        assert_eq!(TimeWindow::from_key("month"), None);
        assert_eq!(TimeWindow::from_key(TimeWindow::Day.key()), Some(TimeWindow::Day));
    }
}
