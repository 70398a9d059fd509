//! Display formatting for episode data.
//!
//! Everything here runs when a record is loaded, so the render path only ever
//! copies ready-made strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Locale used for dates shown in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayLocale {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en-US")]
    EnUs,
}

impl DisplayLocale {
    fn chrono_locale(self) -> chrono::Locale {
        match self {
            DisplayLocale::PtBr => chrono::Locale::pt_BR,
            DisplayLocale::EnUs => chrono::Locale::en_US,
        }
    }
}

impl FromStr for DisplayLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "pt-br" | "pt" => Ok(DisplayLocale::PtBr),
            "en-us" | "en" => Ok(DisplayLocale::EnUs),
            other => Err(format!("unsupported locale '{}'", other)),
        }
    }
}

impl fmt::Display for DisplayLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayLocale::PtBr => write!(f, "pt-BR"),
            DisplayLocale::EnUs => write!(f, "en-US"),
        }
    }
}

/// Format a number of seconds as `HH:MM:SS`.
///
/// # Examples
///
/// ```
/// use podcastr::format::duration_to_time_string;
///
/// assert_eq!(duration_to_time_string(0), "00:00:00");
/// assert_eq!(duration_to_time_string(3981), "01:06:21");
/// ```
pub fn duration_to_time_string(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Parse the API's publication timestamp.
///
/// Accepts RFC 3339 as well as the `YYYY-MM-DD HH:MM:SS` and bare date forms
/// the episode API serves.
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format a publication timestamp as `dd MMM yy` in the given locale.
///
/// Unparseable input is returned unchanged.
pub fn format_published_at(raw: &str, locale: DisplayLocale) -> String {
    match parse_published_at(raw) {
        Some(dt) => dt
            .format_localized("%d %b %y", locale.chrono_locale())
            .to_string(),
        None => raw.to_string(),
    }
}

/// Format the date shown in the header, e.g. `Fri, 8 January`.
pub fn format_header_date<Tz: TimeZone>(date: &DateTime<Tz>, locale: DisplayLocale) -> String
where
    Tz::Offset: fmt::Display,
{
    date.format_localized("%a, %-d %B", locale.chrono_locale())
        .to_string()
}

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>").expect("valid line break pattern")
});
static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(p|div|h[1-6]|li)>").expect("valid block pattern")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line pattern"));

/// Convert an HTML episode description into wrapped-friendly plain text.
///
/// # Examples
///
/// ```
/// use podcastr::format::html_to_text;
///
/// assert_eq!(html_to_text("<p>Hello <b>there</b></p>"), "Hello there");
/// ```
pub fn html_to_text(html: &str) -> String {
    let text = LINE_BREAK.replace_all(html, "\n");
    let text = BLOCK_END.replace_all(&text, "\n\n");
    let text = TAG.replace_all(&text, "");

    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    let lines: Vec<&str> = decoded.lines().map(str::trim).collect();
    BLANK_LINES
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_to_time_string_pads_each_unit() {
        assert_eq!(duration_to_time_string(59), "00:00:59");
        assert_eq!(duration_to_time_string(60), "00:01:00");
        assert_eq!(duration_to_time_string(36_000 + 61), "10:01:01");
    }

    #[test]
    fn test_parse_published_at_variants() {
        let expected = Utc.with_ymd_and_hms(2021, 1, 8, 16, 30, 0).unwrap();
        assert_eq!(parse_published_at("2021-01-08 16:30:00"), Some(expected));
        assert_eq!(parse_published_at("2021-01-08T16:30:00"), Some(expected));
        assert_eq!(parse_published_at("2021-01-08T16:30:00Z"), Some(expected));
        assert_eq!(
            parse_published_at("2021-01-08"),
            Some(Utc.with_ymd_and_hms(2021, 1, 8, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_published_at("yesterday"), None);
    }

    #[test]
    fn test_format_published_at_en_us() {
        assert_eq!(
            format_published_at("2021-01-08 16:30:00", DisplayLocale::EnUs),
            "08 Jan 21"
        );
    }

    #[test]
    fn test_format_published_at_pt_br() {
        assert_eq!(
            format_published_at("2021-01-08 16:30:00", DisplayLocale::PtBr),
            "08 jan 21"
        );
    }

    #[test]
    fn test_format_published_at_passthrough_on_garbage() {
        assert_eq!(format_published_at("soon", DisplayLocale::EnUs), "soon");
    }

    #[test]
    fn test_format_header_date_en_us() {
        let date = Utc.with_ymd_and_hms(2021, 1, 8, 12, 0, 0).unwrap();
        assert_eq!(format_header_date(&date, DisplayLocale::EnUs), "Fri, 8 January");
    }

    #[test]
    fn test_locale_from_str() {
        assert_eq!("pt-BR".parse::<DisplayLocale>(), Ok(DisplayLocale::PtBr));
        assert_eq!("en_US".parse::<DisplayLocale>(), Ok(DisplayLocale::EnUs));
        assert!("fr-FR".parse::<DisplayLocale>().is_err());
    }

    #[test]
    fn test_html_to_text_breaks_and_entities() {
        let html = "<p>Nesse episódio &amp; mais</p><p>Linha<br/>quebrada</p>";
        assert_eq!(html_to_text(html), "Nesse episódio & mais\n\nLinha\nquebrada");
    }

    #[test]
    fn test_html_to_text_plain_input_untouched() {
        assert_eq!(html_to_text("just text"), "just text");
    }
}
