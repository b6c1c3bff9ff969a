//! Presentation helpers shared by the views and the terminal host.

use chrono::{DateTime, Utc};
use url::Url;

use crate::api::models::{Message, User};

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_MONTH: i64 = 43_200;

/// Header for a conversation: the other party of the first message, if any.
pub fn counterpart_of<'a>(messages: &'a [Message], me: &str) -> Option<&'a User> {
    messages.first().map(|m| m.counterpart(me))
}

pub fn conversation_title(messages: &[Message], me: &str, fallback: &str) -> String {
    counterpart_of(messages, me)
        .map(|u| u.username.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// Own messages are drawn on the right, everything else on the left.
pub fn is_own(message: &Message, me: &str) -> bool {
    message.is_from(me)
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 { format!("1 {unit}") } else { format!("{n} {unit}s") }
}

fn distance_words(minutes: i64) -> String {
    if minutes < 1 {
        return "less than a minute".to_string();
    }
    if minutes < 45 {
        return plural(minutes, "minute");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        return format!("about {}", plural((minutes + 30) / 60, "hour"));
    }
    if minutes < 2520 {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        return plural((minutes + MINUTES_IN_DAY / 2) / MINUTES_IN_DAY, "day");
    }
    if minutes < 2 * MINUTES_IN_MONTH {
        return format!("about {}", plural((minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH, "month"));
    }
    let months = minutes / MINUTES_IN_MONTH;
    if months < 12 {
        return plural((minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH, "month");
    }
    let years = months / 12;
    match months % 12 {
        0..=2 => format!("about {}", plural(years, "year")),
        3..=8 => format!("over {}", plural(years, "year")),
        _ => format!("almost {}", plural(years + 1, "year")),
    }
}

/// "5 minutes ago", "in about 2 hours", "less than a minute ago".
pub fn relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - ts).num_seconds();
    let minutes = (seconds.abs() + 30) / 60;
    let words = distance_words(minutes);
    if seconds < 0 { format!("in {words}") } else { format!("{words} ago") }
}

/// Avatar paths from the API are usually relative to the asset host.
pub fn avatar_url(asset_base: &Url, path: Option<&str>) -> Option<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    if let Ok(absolute) = Url::parse(path) {
        return Some(absolute.to_string());
    }
    asset_base.join(path).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn ago(d: Duration) -> String {
        relative_time(now() - d, now())
    }

    #[test]
    fn relative_time_matches_familiar_wording() {
        assert_eq!(ago(Duration::seconds(10)), "less than a minute ago");
        assert_eq!(ago(Duration::seconds(50)), "1 minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(ago(Duration::minutes(50)), "about 1 hour ago");
        assert_eq!(ago(Duration::hours(3)), "about 3 hours ago");
        assert_eq!(ago(Duration::hours(30)), "1 day ago");
        assert_eq!(ago(Duration::days(6)), "6 days ago");
        assert_eq!(ago(Duration::days(40)), "about 1 month ago");
        assert_eq!(ago(Duration::days(150)), "5 months ago");
        assert_eq!(ago(Duration::days(370)), "about 1 year ago");
        assert_eq!(ago(Duration::days(365 + 180)), "over 1 year ago");
        assert_eq!(ago(Duration::days(365 + 320)), "almost 2 years ago");
        assert_eq!(relative_time(now() + Duration::hours(2), now()), "in about 2 hours");
    }

    #[test]
    fn avatars_resolve_against_the_asset_host() {
        let base = Url::parse("http://localhost:8080").unwrap();
        assert_eq!(
            avatar_url(&base, Some("/uploads/p/1.png")).as_deref(),
            Some("http://localhost:8080/uploads/p/1.png")
        );
        assert_eq!(
            avatar_url(&base, Some("https://cdn.example.org/a.png")).as_deref(),
            Some("https://cdn.example.org/a.png")
        );
        assert_eq!(avatar_url(&base, Some("  ")), None);
        assert_eq!(avatar_url(&base, None), None);
    }
}
