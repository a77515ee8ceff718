//! Draw record data structures.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel written when no draw date could be found.
pub const UNKNOWN_DATE: &str = "Unknown-Date";

/// Sentinel draw number when the title carries none.
pub const UNKNOWN_DRAW: &str = "XX";

/// Canonical prize tiers, declared in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrizeTierKey {
    #[serde(rename = "1st_prize")]
    First,
    #[serde(rename = "consolation_prize")]
    Consolation,
    #[serde(rename = "2nd_prize")]
    Second,
    #[serde(rename = "3rd_prize")]
    Third,
    #[serde(rename = "4th_prize")]
    Fourth,
    #[serde(rename = "5th_prize")]
    Fifth,
    #[serde(rename = "6th_prize")]
    Sixth,
    #[serde(rename = "7th_prize")]
    Seventh,
    #[serde(rename = "8th_prize")]
    Eighth,
    #[serde(rename = "9th_prize")]
    Ninth,
}

impl PrizeTierKey {
    pub const ALL: [PrizeTierKey; 10] = [
        PrizeTierKey::First,
        PrizeTierKey::Consolation,
        PrizeTierKey::Second,
        PrizeTierKey::Third,
        PrizeTierKey::Fourth,
        PrizeTierKey::Fifth,
        PrizeTierKey::Sixth,
        PrizeTierKey::Seventh,
        PrizeTierKey::Eighth,
        PrizeTierKey::Ninth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrizeTierKey::First => "1st_prize",
            PrizeTierKey::Consolation => "consolation_prize",
            PrizeTierKey::Second => "2nd_prize",
            PrizeTierKey::Third => "3rd_prize",
            PrizeTierKey::Fourth => "4th_prize",
            PrizeTierKey::Fifth => "5th_prize",
            PrizeTierKey::Sixth => "6th_prize",
            PrizeTierKey::Seventh => "7th_prize",
            PrizeTierKey::Eighth => "8th_prize",
            PrizeTierKey::Ninth => "9th_prize",
        }
    }

    /// Top tiers are drawn as full six-digit tickets.
    pub fn is_six_digit(&self) -> bool {
        matches!(
            self,
            PrizeTierKey::First
                | PrizeTierKey::Second
                | PrizeTierKey::Third
                | PrizeTierKey::Consolation
        )
    }
}

/// One payout category of a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTier {
    pub amount: u64,
    pub label: String,
    #[serde(default)]
    pub winners: Vec<String>,
}

/// Prize tiers keyed by canonical key, serialized as a JSON object.
pub type PrizeMap = BTreeMap<PrizeTierKey, PrizeTier>;

/// A draw date, or the `Unknown-Date` sentinel.
///
/// `Unknown` orders before every known date so that descending sorts put it last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DrawDate {
    Unknown,
    Known(NaiveDate),
}

impl DrawDate {
    /// Parse `YYYY-MM-DD`; anything else is the sentinel.
    pub fn parse(s: &str) -> Self {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(DrawDate::Known)
            .unwrap_or(DrawDate::Unknown)
    }
}

impl fmt::Display for DrawDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawDate::Known(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DrawDate::Unknown => f.write_str(UNKNOWN_DATE),
        }
    }
}

impl Serialize for DrawDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DrawDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DrawDate::parse(&s))
    }
}

/// One lottery drawing's structured result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub lottery_name: String,

    #[serde(default)]
    pub lottery_code: String,

    /// Draw number as printed, e.g. `SS-498`
    pub draw_number: String,

    pub draw_date: DrawDate,

    #[serde(default, with = "empty_as_none")]
    pub venue: Option<String>,

    #[serde(default)]
    pub prizes: PrizeMap,

    #[serde(rename = "downloadLink", default, with = "empty_as_none")]
    pub download_link: Option<String>,

    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub source_url: String,
}

impl DrawRecord {
    /// Draw number with any leading `{code}-` removed.
    pub fn short_draw_number(&self) -> &str {
        strip_code_prefix(&self.draw_number, &self.lottery_code)
    }

    /// Recompute the filename from the record's own fields.
    pub fn derived_filename(&self) -> String {
        derive_filename(&self.lottery_code, &self.draw_number, self.draw_date)
    }
}

/// Remove a leading `{code}-` from a draw number.
pub fn strip_code_prefix<'a>(draw_number: &'a str, code: &str) -> &'a str {
    if code.is_empty() {
        return draw_number;
    }
    draw_number
        .strip_prefix(code)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(draw_number)
}

/// `{code}-{drawNumberWithoutCodePrefix}-{date}.json`
pub fn derive_filename(code: &str, draw_number: &str, date: DrawDate) -> String {
    format!("{}-{}-{}.json", code, strip_code_prefix(draw_number, code), date)
}

/// Components recovered from a per-draw filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameParts {
    pub code: String,
    pub draw_number: String,
    pub date: NaiveDate,
}

/// Parse `SS-498-2025-09-16.json` back into its parts.
pub fn parse_filename(filename: &str) -> Option<FilenameParts> {
    let pattern = Regex::new(r"^([A-Z]{2,3})-(\d+|XX)-(\d{4}-\d{2}-\d{2})\.json$").ok()?;
    let caps = pattern.captures(filename)?;
    let date = NaiveDate::parse_from_str(&caps[3], "%Y-%m-%d").ok()?;
    Some(FilenameParts {
        code: caps[1].to_string(),
        draw_number: caps[2].to_string(),
        date,
    })
}

/// Optional strings persisted as `""` when absent.
mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|s| !s.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> DrawDate {
        DrawDate::Known(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_filename_strips_code_prefix() {
        assert_eq!(
            derive_filename("SS", "SS-498", date(2025, 9, 16)),
            "SS-498-2025-09-16.json"
        );
        assert_eq!(
            derive_filename("SS", "498", date(2025, 9, 16)),
            "SS-498-2025-09-16.json"
        );
    }

    #[test]
    fn test_filename_round_trip() {
        let name = derive_filename("SS", "SS-498", date(2025, 9, 16));
        let parts = parse_filename(&name).unwrap();
        assert_eq!(parts.code, "SS");
        assert_eq!(parts.draw_number, "498");
        assert_eq!(parts.date, NaiveDate::from_ymd_opt(2025, 9, 16).unwrap());
    }

    #[test]
    fn test_parse_filename_accepts_unknown_draw() {
        let parts = parse_filename("SS-XX-2025-09-16.json").unwrap();
        assert_eq!(parts.draw_number, UNKNOWN_DRAW);
        assert_eq!(parts.date, NaiveDate::from_ymd_opt(2025, 9, 16).unwrap());
    }

    #[test]
    fn test_parse_filename_rejects_others() {
        assert!(parse_filename("latest.json").is_none());
        assert!(parse_filename("SS-XX-Unknown-Date.json").is_none());
        assert!(parse_filename("SS-16/09/2025-2025-09-16.json").is_none());
        assert!(parse_filename("ss-498-2025-09-16.json").is_none());
        assert!(parse_filename("SS-498-2025-13-40.json").is_none());
    }

    #[test]
    fn test_strip_only_exact_prefix() {
        assert_eq!(strip_code_prefix("SSX-12", "SS"), "SSX-12");
        assert_eq!(strip_code_prefix("KR-731", "KR"), "731");
        assert_eq!(strip_code_prefix("KR-731", ""), "KR-731");
    }

    #[test]
    fn test_unknown_date_sorts_first_ascending() {
        assert!(DrawDate::Unknown < date(1990, 1, 1));
        assert_eq!(DrawDate::parse("garbage"), DrawDate::Unknown);
        assert_eq!(DrawDate::Unknown.to_string(), UNKNOWN_DATE);
    }

    #[test]
    fn test_record_json_shape() {
        let mut prizes = PrizeMap::new();
        prizes.insert(
            PrizeTierKey::Consolation,
            PrizeTier {
                amount: 5000,
                label: "Consolation Prize".into(),
                winners: vec!["SA 123456".into()],
            },
        );
        prizes.insert(
            PrizeTierKey::First,
            PrizeTier {
                amount: 10_000_000,
                label: "1st Prize".into(),
                winners: vec!["SS 123456".into()],
            },
        );
        let record = DrawRecord {
            lottery_name: "STHREE SAKTHI".into(),
            lottery_code: "SS".into(),
            draw_number: "SS-498".into(),
            draw_date: date(2025, 9, 16),
            venue: None,
            prizes,
            download_link: Some("https://example.com/r.pdf".into()),
            filename: "SS-498-2025-09-16.json".into(),
            source_url: "https://example.com/kerala-lottery-result-SS-498".into(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["draw_date"], "2025-09-16");
        assert_eq!(value["venue"], "");
        assert_eq!(value["downloadLink"], "https://example.com/r.pdf");
        assert_eq!(value["prizes"]["1st_prize"]["amount"], 10_000_000);

        let keys: Vec<_> = value["prizes"].as_object().unwrap().keys().cloned().collect();
        assert!(keys.contains(&"consolation_prize".to_string()));

        let back: DrawRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_legacy_file_loads() {
        let json = r#"{
            "lottery_name": "KARUNYA",
            "draw_number": "KR-731",
            "draw_date": "2025-11-29",
            "venue": "",
            "prizes": {"1st_prize": {"amount": 10000000, "label": "1st Prize", "winners": ["KA 111111"]}},
            "downloadLink": ""
        }"#;
        let record: DrawRecord = serde_json::from_str(json).unwrap();
        assert!(record.venue.is_none());
        assert!(record.download_link.is_none());
        assert!(record.lottery_code.is_empty());
        assert_eq!(record.prizes.len(), 1);
    }
}
