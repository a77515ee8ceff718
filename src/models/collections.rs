//! Flattened projections of draw records for the persisted collections.

use std::cmp::Ordering;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{DrawRecord, PrizeTierKey, UNKNOWN_DATE};

/// Entry of `result_manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub lottery_code: String,
    pub draw_number: String,
    pub date: String,
    pub title: String,
}

impl ManifestEntry {
    pub fn from_record(record: &DrawRecord) -> Self {
        let draw_number = record.short_draw_number().to_string();
        Self {
            filename: record.filename.clone(),
            lottery_code: record.lottery_code.clone(),
            title: format!(
                "{} {}-{}",
                record.lottery_name, record.lottery_code, draw_number
            ),
            draw_number,
            date: record.draw_date.to_string(),
        }
    }
}

/// Per-tier breakdown inside a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPrize {
    pub prize_key: String,
    pub label: String,
    pub amount: u64,
    pub winners: Vec<String>,
}

/// Entry of `history.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    pub lottery: String,
    pub draw: String,
    pub filename: String,
    pub github_url: String,
    #[serde(default)]
    pub prizes: Vec<HistoryPrize>,
    #[serde(default)]
    pub numbers4: Vec<String>,
    #[serde(default)]
    pub numbers6: Vec<String>,
    #[serde(rename = "downloadLink", default)]
    pub download_link: String,
}

impl HistoryEntry {
    /// Build a history entry; `raw_base_url` is the public base the note files are served from.
    pub fn from_record(record: &DrawRecord, raw_base_url: &str) -> Self {
        let prizes = record
            .prizes
            .iter()
            .map(|(key, tier)| HistoryPrize {
                prize_key: key.as_str().to_string(),
                label: tier.label.clone(),
                amount: tier.amount,
                winners: tier.winners.clone(),
            })
            .collect();

        let (numbers4, numbers6) = collect_numbers(record);

        Self {
            date: record.draw_date.to_string(),
            lottery: record.lottery_name.clone(),
            draw: record.short_draw_number().to_string(),
            filename: record.filename.clone(),
            github_url: raw_url(raw_base_url, &record.filename),
            prizes,
            numbers4,
            numbers6,
            download_link: record.download_link.clone().unwrap_or_default(),
        }
    }
}

/// Canonical download URL of a per-draw file.
pub fn raw_url(raw_base_url: &str, filename: &str) -> String {
    format!("{}/{}", raw_base_url.trim_end_matches('/'), filename)
}

/// Distinct 4-digit endings of the small tiers and 6-digit numbers of the top tiers.
fn collect_numbers(record: &DrawRecord) -> (Vec<String>, Vec<String>) {
    let (Ok(four), Ok(six)) = (Regex::new(r"\b(\d{4})\b"), Regex::new(r"\b(\d{6})\b")) else {
        return (Vec::new(), Vec::new());
    };

    let mut numbers4: Vec<String> = Vec::new();
    let mut numbers6: Vec<String> = Vec::new();

    for (key, tier) in &record.prizes {
        let (pattern, bucket) = if key.is_six_digit() {
            (&six, &mut numbers6)
        } else if is_four_digit_tier(*key) {
            (&four, &mut numbers4)
        } else {
            continue;
        };

        for winner in &tier.winners {
            if let Some(caps) = pattern.captures(winner) {
                let number = caps[1].to_string();
                if !bucket.contains(&number) {
                    bucket.push(number);
                }
            }
        }
    }

    (numbers4, numbers6)
}

fn is_four_digit_tier(key: PrizeTierKey) -> bool {
    matches!(
        key,
        PrizeTierKey::Fourth
            | PrizeTierKey::Fifth
            | PrizeTierKey::Sixth
            | PrizeTierKey::Seventh
            | PrizeTierKey::Eighth
            | PrizeTierKey::Ninth
    )
}

/// Newest first, `Unknown-Date` (and anything unparseable) last.
pub fn cmp_date_desc(a: &str, b: &str) -> Ordering {
    let known = |d: &str| d != UNKNOWN_DATE && !d.is_empty();
    match (known(a), known(b)) {
        (true, true) => b.cmp(a),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}
