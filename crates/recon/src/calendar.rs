//! Week and month labels derived from a sales date.
//!
//! Month names come from chrono's locale tables; the locale is an explicit
//! argument, nothing here touches process-wide locale state.

use chrono::{Datelike, Locale, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;

/// Locale used to render month names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum MonthLocale {
    #[default]
    #[serde(rename = "es_ES")]
    EsEs,
    #[serde(rename = "es_CO")]
    EsCo,
    #[serde(rename = "en_US")]
    EnUs,
}

impl MonthLocale {
    fn chrono_locale(self) -> Locale {
        match self {
            Self::EsEs => Locale::es_ES,
            Self::EsCo => Locale::es_CO,
            Self::EnUs => Locale::en_US,
        }
    }
}

/// ISO-8601 week label, e.g. 2023-01-15 -> `W02`.
pub fn week_label(date: NaiveDate) -> String {
    format!("W{:02}", date.iso_week().week())
}

/// Full month name in upper case, e.g. 2023-01-15 -> `ENERO` for `es_ES`.
pub fn month_name(date: NaiveDate, locale: MonthLocale) -> String {
    let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    midnight
        .format_localized("%B", locale.chrono_locale())
        .to_string()
        .to_uppercase()
}
