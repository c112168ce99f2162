//! Wire-format parsers.
//!
//! Every parser is total: malformed input yields fewer records, never an
//! error or a panic. Sibling records in the same document are unaffected
//! by one bad unit.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::model::Typhoon;

pub mod alerts;
pub mod atcf;
pub mod digital_typhoon;
pub mod nhc_rss;

pub use alerts::AlertsParser;
pub use atcf::{AtcfParser, AtcfVariant};
pub use digital_typhoon::DigitalTyphoonParser;
pub use nhc_rss::NhcRssParser;

/// Turns one raw upstream document into normalized records.
pub trait SourceParser: Send + Sync + Debug {
    /// Parses relative to `now`, which drives recency windows and stands in
    /// for missing observation times.
    fn parse_at(&self, raw: &str, now: DateTime<Utc>) -> Vec<Typhoon>;

    fn parse(&self, raw: &str) -> Vec<Typhoon> {
        self.parse_at(raw, Utc::now())
    }
}

/// First capture group of `re` in `text`, trimmed and with XML escapes undone.
pub(crate) fn first_capture(re: &Regex, text: &str) -> Option<String> {
    let value = re.captures(text)?.get(1)?.as_str();
    let value = clean_xml_text(value);
    (!value.is_empty()).then_some(value)
}

fn clean_xml_text(value: &str) -> String {
    let value = value.trim();
    let value = value
        .strip_prefix("<![CDATA[")
        .and_then(|v| v.strip_suffix("]]>"))
        .unwrap_or(value);

    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Lowercase, underscore-joined form of a storm name for synthetic ids.
pub(crate) fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_capture_unwraps_cdata_and_entities() {
        let re = Regex::new(r"(?s)<t>(.*?)</t>").unwrap();

        assert_eq!(first_capture(&re, "<t> A &amp; B </t>").as_deref(), Some("A & B"));
        assert_eq!(first_capture(&re, "<t><![CDATA[Milton]]></t>").as_deref(), Some("Milton"));
        assert_eq!(first_capture(&re, "<t>   </t>"), None);
        assert_eq!(first_capture(&re, "<u>x</u>"), None);
    }

    #[test]
    fn slug_joins_words() {
        assert_eq!(slug("Tropical Storm  Kong-rey"), "tropical_storm_kong-rey");
    }
}
