use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// The viewer's UTC offset. Resolve it once at startup: on some platforms it
/// cannot be determined after other threads have been spawned.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn now_in(offset: UtcOffset) -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(offset)
}

/// Card date label for a unix timestamp, compared by calendar day in `now`'s
/// offset.
pub fn date_label(updated_at: i64, now: OffsetDateTime) -> String {
    let Ok(then) = OffsetDateTime::from_unix_timestamp(updated_at) else {
        return String::from("?");
    };
    let then = then.to_offset(now.offset());
    let days = now.date().to_julian_day() - then.date().to_julian_day();
    match days {
        0 => String::from("Today"),
        1 => String::from("Yesterday"),
        _ if then.year() == now.year() => then
            .format(format_description!("[month repr:short] [day padding:none]"))
            .unwrap_or_default(),
        _ => then
            .format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn same_calendar_day_is_today() {
        let now = datetime!(2024-10-30 00:30 UTC);
        let earlier = datetime!(2024-10-30 00:01 UTC).unix_timestamp();
        assert_eq!(date_label(earlier, now), "Today");
    }

    #[test]
    fn previous_calendar_day_is_yesterday_even_if_minutes_ago() {
        let now = datetime!(2024-10-30 00:05 UTC);
        let before_midnight = datetime!(2024-10-29 23:55 UTC).unix_timestamp();
        assert_eq!(date_label(before_midnight, now), "Yesterday");
    }

    #[test]
    fn older_dates_in_same_year_use_month_and_day() {
        let now = datetime!(2024-10-30 12:00 UTC);
        assert_eq!(
            date_label(datetime!(2024-03-05 09:00 UTC).unix_timestamp(), now),
            "Mar 5"
        );
    }

    #[test]
    fn other_years_and_future_use_full_date() {
        let now = datetime!(2024-01-02 12:00 UTC);
        assert_eq!(
            date_label(datetime!(2023-10-29 09:00 UTC).unix_timestamp(), now),
            "2023-10-29"
        );
        assert_eq!(
            date_label(datetime!(2024-01-05 09:00 UTC).unix_timestamp(), now),
            "Jan 5"
        );
    }

    #[test]
    fn day_boundary_follows_viewer_offset() {
        let now = datetime!(2024-10-30 08:00 +09:00);
        let stamp = datetime!(2024-10-29 20:00 UTC).unix_timestamp();
        assert_eq!(date_label(stamp, now), "Today");
    }
}
