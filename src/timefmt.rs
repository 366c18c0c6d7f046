use chrono::{NaiveDateTime, Utc};

/// SQLite `datetime('now')` format.
const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a stored UTC timestamp relative to now. Unparseable input is
/// shown as stored.
pub fn humanize(db_time: &str) -> String {
    NaiveDateTime::parse_from_str(db_time, DB_FORMAT)
        .map(|dt| relative_to(&dt, &Utc::now().naive_utc()))
        .unwrap_or_else(|_| db_time.to_string())
}

fn relative_to(dt: &NaiveDateTime, now: &NaiveDateTime) -> String {
    let diff = now.signed_duration_since(*dt);

    match diff.num_seconds() {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{}m ago", diff.num_minutes().max(1)),
        s if s < 86_400 => format!("{}h ago", diff.num_hours()),
        _ if diff.num_days() < 7 => format!("{}d ago", diff.num_days()),
        _ => dt.format("%b %-d, %Y").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn recent_times_are_relative() {
        let now = at(2025, 3, 10, 12);
        assert_eq!(relative_to(&now, &now), "just now");
        assert_eq!(relative_to(&(now - Duration::minutes(5)), &now), "5m ago");
        assert_eq!(relative_to(&(now - Duration::hours(3)), &now), "3h ago");
        assert_eq!(relative_to(&(now - Duration::days(2)), &now), "2d ago");
    }

    #[test]
    fn old_times_show_the_date() {
        let now = at(2025, 3, 10, 12);
        assert_eq!(relative_to(&at(2025, 1, 15, 12), &now), "Jan 15, 2025");
    }

    #[test]
    fn humanize_parses_db_format() {
        assert_eq!(humanize("2020-01-15 12:00:00"), "Jan 15, 2020");
    }

    #[test]
    fn humanize_bad_input_returns_raw() {
        assert_eq!(humanize("not-a-date"), "not-a-date");
    }
}
