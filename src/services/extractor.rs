// src/services/extractor.rs

//! Draw record extraction from one fetched result page.
//!
//! Title, date, draw number and name come from heading heuristics; prize
//! tiers come from a line-based state machine over the page's visible text.

use regex::Regex;
use scraper::Html;

use crate::error::{AppError, Result};
use crate::models::{
    DiscoveryConfig, DrawDate, DrawRecord, ExtractionConfig, PrizeMap, PrizeTier, PrizeTierKey,
    TierDefinition, UNKNOWN_DRAW, derive_filename,
};
use crate::utils::date::{parse_date_from_text, parse_dmy};
use crate::utils::html::{anchors, first_text, visible_lines};
use crate::utils::resolve;
use crate::utils::url::{lottery_code, result_path_regex};

const UNKNOWN_LOTTERY: &str = "Unknown Lottery";
const UNKNOWN_NAME: &str = "Unknown";
const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".jpg", ".jpeg", ".png"];

/// A tier heading that has been seen but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTier {
    pub key: PrizeTierKey,
    pub label: String,
    pub amount: u64,
    pub winners: Vec<String>,
}

impl OpenTier {
    fn from_definition(def: &TierDefinition) -> Self {
        Self {
            key: def.key,
            label: def.label.clone(),
            amount: def.amount,
            winners: Vec::new(),
        }
    }
}

/// Fold an open tier into the prize map, keeping only winners whose
/// alphanumeric content is at least `min_len` characters long.
///
/// A key seen twice accumulates winners from both headings.
pub fn commit_tier(mut prizes: PrizeMap, open: OpenTier, min_len: usize) -> PrizeMap {
    let winners: Vec<String> = open
        .winners
        .into_iter()
        .filter(|w| w.chars().filter(|c| c.is_alphanumeric()).count() >= min_len)
        .collect();

    prizes
        .entry(open.key)
        .or_insert_with(|| PrizeTier {
            amount: open.amount,
            label: open.label,
            winners: Vec::new(),
        })
        .winners
        .extend(winners);
    prizes
}

/// Whether a data line is filler rather than winning numbers.
pub fn is_noise(line: &str) -> bool {
    let lower = line.to_lowercase();
    line.contains("Rs") || line.contains("/-") || lower.contains("lottery") || lower.contains("page")
}

/// Heuristic page-to-record extractor.
///
/// Owns its lookup tables; holds no shared state.
pub struct DrawExtractor {
    config: ExtractionConfig,
    /// Lowercased heading variants, longest first
    variants: Vec<(String, PrizeTierKey)>,
    result_pattern: Regex,
    paren: Regex,
    /// `498` or `SS-498`
    draw_id: Regex,
    name: Regex,
    venue: Regex,
    series: Regex,
    digits: Regex,
}

impl DrawExtractor {
    pub fn new(config: &ExtractionConfig, discovery: &DiscoveryConfig) -> Result<Self> {
        let mut variants: Vec<(String, PrizeTierKey)> = config
            .tiers
            .iter()
            .flat_map(|t| t.variants.iter().map(move |v| (v.to_lowercase(), t.key)))
            .collect();
        variants.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Ok(Self {
            config: config.clone(),
            variants,
            result_pattern: result_path_regex(&discovery.result_path_prefix)?,
            paren: Regex::new(r"\(([^)]+)\)")?,
            draw_id: Regex::new(r"^(?:[A-Z]{1,3}-)?\d+$")?,
            name: Regex::new(r"([A-Za-z\s]+)\s*\(")?,
            venue: Regex::new(r"(?i)\b(venue|at)\b[:\-]?\s*([A-Za-z0-9, .()]+)")?,
            series: Regex::new(r"\b([A-Z]{1,3})\s?-?\s?(\d{6})\b")?,
            digits: Regex::new(r"\b\d{4,6}\b")?,
        })
    }

    /// Turn one fetched page into a draw record.
    ///
    /// Fails only when the URL carries no lottery code; every other gap is
    /// filled with a sentinel or default.
    pub fn extract(&self, url: &str, raw: &str) -> Result<DrawRecord> {
        let code = lottery_code(url, &self.result_pattern)
            .ok_or_else(|| AppError::extraction(url, "no lottery code in URL"))?;

        let document = Html::parse_document(raw);
        let lines = visible_lines(&document);

        let title = self.resolve_title(&document, &lines);
        log::debug!("Extracting '{}' from {}", title, url);

        let draw_date = parse_dmy(&title)
            .or_else(|| parse_date_from_text(&lines.join("\n")))
            .map(DrawDate::Known)
            .unwrap_or(DrawDate::Unknown);

        let draw_number = self.draw_number(&title, &code);
        let lottery_name = self.lottery_name(&title, &code);
        let venue = self.venue(&lines);
        let download_link = download_link(&document, url);

        let prizes = self.apply_defaults(self.prize_tiers(&lines));

        Ok(DrawRecord {
            filename: derive_filename(&code, &draw_number, draw_date),
            lottery_name,
            lottery_code: code,
            draw_number,
            draw_date,
            venue,
            prizes,
            download_link,
            source_url: url.to_string(),
        })
    }

    fn resolve_title(&self, document: &Html, lines: &[String]) -> String {
        if let Some(h1) = first_text(document, "h1") {
            let lower = h1.to_lowercase();
            if !self.config.generic_titles.iter().any(|g| g.to_lowercase() == lower) {
                return h1;
            }
        }

        ["title", "h2", "h3"]
            .iter()
            .find_map(|tag| first_text(document, tag))
            .or_else(|| {
                lines.iter().find_map(|line| {
                    line.strip_prefix("Title:")
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                })
            })
            .unwrap_or_else(|| UNKNOWN_LOTTERY.to_string())
    }

    /// Parenthesised draw id, else a bare `{code}-digits` token, else `XX`.
    ///
    /// Parenthesised dates and other text never become draw numbers.
    fn draw_number(&self, title: &str, code: &str) -> String {
        let from_paren = self
            .paren
            .captures_iter(title)
            .map(|caps| caps[1].trim().to_string())
            .find(|inner| self.draw_id.is_match(inner));
        if let Some(id) = from_paren {
            return id;
        }

        Regex::new(&format!(r"\b{}-\d+\b", regex::escape(code)))
            .ok()
            .and_then(|re| re.find(title).map(|m| m.as_str().to_string()))
            .unwrap_or_else(|| UNKNOWN_DRAW.to_string())
    }

    fn lottery_name(&self, title: &str, code: &str) -> String {
        let from_title = self
            .name
            .captures(title)
            .map(|caps| caps[1].trim().to_uppercase())
            .filter(|name| name.chars().count() >= 3);

        from_title
            .or_else(|| self.config.name_for_code(code).map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }

    /// Lines naming a venue win over lines that merely say "at".
    fn venue(&self, lines: &[String]) -> Option<String> {
        let capture = |line: &String, want_venue: bool| {
            self.venue.captures(line).and_then(|caps| {
                let is_venue = caps[1].eq_ignore_ascii_case("venue");
                let place = caps[2].trim();
                (is_venue == want_venue && !place.is_empty()).then(|| place.to_string())
            })
        };

        lines
            .iter()
            .find_map(|line| capture(line, true))
            .or_else(|| lines.iter().find_map(|line| capture(line, false)))
    }

    fn heading_tier(&self, line: &str) -> Option<&TierDefinition> {
        if line.chars().count() > self.config.heading_max_chars {
            return None;
        }
        let lower = line.to_lowercase();
        self.variants
            .iter()
            .find(|(variant, _)| lower.contains(variant.as_str()))
            .and_then(|(_, key)| self.config.tier(*key))
    }

    /// Winning-ticket tokens of one data line.
    fn winner_tokens(&self, line: &str) -> Vec<String> {
        let series: Vec<String> = self
            .series
            .captures_iter(line)
            .map(|caps| format!("{} {}", &caps[1], &caps[2]))
            .collect();
        if !series.is_empty() {
            return series;
        }
        self.digits
            .find_iter(line)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Run the tier state machine over the page lines.
    pub fn prize_tiers<S: AsRef<str>>(&self, lines: &[S]) -> PrizeMap {
        let min_len = self.config.min_winner_len;
        let mut prizes = PrizeMap::new();
        let mut current: Option<OpenTier> = None;

        for line in lines.iter().map(AsRef::as_ref) {
            if let Some(def) = self.heading_tier(line) {
                if let Some(open) = current.take() {
                    prizes = commit_tier(prizes, open, min_len);
                }
                current = Some(OpenTier::from_definition(def));
                continue;
            }

            let Some(open) = current.as_mut() else {
                continue;
            };
            if is_noise(line) {
                continue;
            }
            open.winners.extend(self.winner_tokens(line));
        }

        if let Some(open) = current.take() {
            prizes = commit_tier(prizes, open, min_len);
        }
        prizes
    }

    /// Fill every tier when none were found, otherwise only the empty ones.
    fn apply_defaults(&self, mut prizes: PrizeMap) -> PrizeMap {
        let placeholder = &self.config.placeholder;

        if prizes.is_empty() {
            for def in &self.config.tiers {
                prizes.insert(
                    def.key,
                    PrizeTier {
                        amount: def.amount,
                        label: def.label.clone(),
                        winners: vec![placeholder.clone()],
                    },
                );
            }
            return prizes;
        }

        for tier in prizes.values_mut() {
            if tier.winners.is_empty() {
                tier.winners.push(placeholder.clone());
            }
        }
        prizes
    }
}

/// First anchor pointing at a result document or image, made absolute.
fn download_link(document: &Html, page_url: &str) -> Option<String> {
    anchors(document).into_iter().find_map(|(href, _)| {
        let lower = href.to_lowercase();
        if DOCUMENT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            resolve(page_url, &href).or(Some(href))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const URL: &str = "https://www.kllotteryresult.com/kerala-lottery-result-SS-498";

    fn extractor() -> DrawExtractor {
        DrawExtractor::new(&ExtractionConfig::default(), &DiscoveryConfig::default()).unwrap()
    }

    fn published_page() -> &'static str {
        r#"<html><head><title>Kerala Lottery Result Today</title></head><body>
        <h1>Sthree Sakthi Lottery (SS-498) 16.09.2025</h1>
        <p>Venue: Gorky Bhavan, Near Bakery Junction, Thiruvananthapuram</p>
        <a href="/uploads/SS-498.pdf">Download PDF</a>
        <table class="w-full">
          <tr><th>1st Prize</th></tr>
          <tr><td>Rs :10000000/-</td></tr>
          <tr><td>SS 123456 (KOTTAYAM)</td></tr>
          <tr><th>Consolation Prize</th></tr>
          <tr><td>SA 123456</td><td>SB 123456</td></tr>
          <tr><th>2nd Prize</th></tr>
          <tr><td>SC-654321 (THRISSUR)</td></tr>
          <tr><th>4th Prize</th></tr>
          <tr><td>0123 4567 12 891011</td></tr>
          <tr><th>5th Prize</th></tr>
          <tr><td>Next page</td></tr>
        </table>
        </body></html>"#
    }

    #[test]
    fn test_extracts_published_result() {
        let record = extractor().extract(URL, published_page()).unwrap();

        assert_eq!(record.lottery_name, "STHREE SAKTHI LOTTERY");
        assert_eq!(record.lottery_code, "SS");
        assert_eq!(record.draw_number, "SS-498");
        assert_eq!(
            record.draw_date,
            DrawDate::Known(NaiveDate::from_ymd_opt(2025, 9, 16).unwrap())
        );
        assert_eq!(record.filename, "SS-498-2025-09-16.json");
        assert_eq!(
            record.venue.as_deref(),
            Some("Gorky Bhavan, Near Bakery Junction, Thiruvananthapuram")
        );
        assert_eq!(
            record.download_link.as_deref(),
            Some("https://www.kllotteryresult.com/uploads/SS-498.pdf")
        );
        assert_eq!(record.source_url, URL);

        let first = &record.prizes[&PrizeTierKey::First];
        assert_eq!(first.winners, vec!["SS 123456"]);
        assert_eq!(first.amount, 10_000_000);
        assert_eq!(
            record.prizes[&PrizeTierKey::Consolation].winners,
            vec!["SA 123456", "SB 123456"]
        );
        assert_eq!(record.prizes[&PrizeTierKey::Second].winners, vec!["SC 654321"]);
        assert_eq!(
            record.prizes[&PrizeTierKey::Fourth].winners,
            vec!["0123", "4567", "891011"]
        );
        assert_eq!(
            record.prizes[&PrizeTierKey::Fifth].winners,
            vec![ExtractionConfig::default().placeholder]
        );
        assert!(!record.prizes.contains_key(&PrizeTierKey::Third));
    }

    #[test]
    fn test_unpublished_page_synthesizes_all_tiers() {
        let page = "<h1>Karunya (KR-720) 20.09.2025</h1><p>Results are not out yet.</p>";
        let url = "https://www.kllotteryresult.com/kerala-lottery-result-KR-720";
        let record = extractor().extract(url, page).unwrap();
        let config = ExtractionConfig::default();

        assert_eq!(record.prizes.len(), 10);
        for def in &config.tiers {
            let tier = &record.prizes[&def.key];
            assert_eq!(tier.amount, def.amount);
            assert_eq!(tier.winners, vec![config.placeholder.clone()]);
        }
        assert_eq!(record.filename, "KR-720-2025-09-20.json");
    }

    #[test]
    fn test_winner_filter_and_noise() {
        let open = OpenTier {
            key: PrizeTierKey::Ninth,
            label: "9th Prize".to_string(),
            amount: 100,
            winners: vec![
                "AB 123456".to_string(),
                "1234".to_string(),
                "12".to_string(),
            ],
        };
        let prizes = commit_tier(PrizeMap::new(), open, 4);
        assert_eq!(
            prizes[&PrizeTierKey::Ninth].winners,
            vec!["AB 123456", "1234"]
        );
        assert!(is_noise("Rs"));
        assert!(is_noise("Kerala Lottery Result"));
        assert!(!is_noise("AB 123456"));
    }

    #[test]
    fn test_repeated_heading_accumulates() {
        let lines = ["7th Prize", "1111 2222", "Cons Prize", "7th Prize", "3333"];
        let prizes = extractor().prize_tiers(&lines);
        assert_eq!(
            prizes[&PrizeTierKey::Seventh].winners,
            vec!["1111", "2222", "3333"]
        );
        assert!(prizes[&PrizeTierKey::Consolation].winners.is_empty());
    }

    #[test]
    fn test_slash_dash_and_page_lines_are_noise() {
        let lines = [
            "5th Prize",
            "Each 1000/- 2222",
            "Next page 3333",
            "Page 2 of 4",
            "4444 5555",
        ];
        let prizes = extractor().prize_tiers(&lines);
        assert_eq!(prizes[&PrizeTierKey::Fifth].winners, vec!["4444", "5555"]);
        assert!(is_noise("2000/-"));
        assert!(is_noise("PAGE 1"));
        assert!(!is_noise("7777 8888"));
    }

    #[test]
    fn test_venue_falls_back_to_at_line() {
        let page = r#"<h1>Sthree Sakthi (SS-498) 16.09.2025</h1>
            <p>Draw held at Gorky Bhavan, Thiruvananthapuram</p>"#;
        let record = extractor().extract(URL, page).unwrap();
        assert_eq!(
            record.venue.as_deref(),
            Some("Gorky Bhavan, Thiruvananthapuram")
        );

        let page = r#"<h1>Sthree Sakthi (SS-498) 16.09.2025</h1>
            <p>Draw held at 3 PM</p>
            <p>Venue: Gorky Bhavan</p>"#;
        let record = extractor().extract(URL, page).unwrap();
        assert_eq!(record.venue.as_deref(), Some("Gorky Bhavan"));
    }

    #[test]
    fn test_long_line_is_data_not_heading() {
        let lines = [
            "8th Prize",
            "Winners of the 1st Prize category get 9999 here",
        ];
        let prizes = extractor().prize_tiers(&lines);
        assert_eq!(prizes.len(), 1);
        assert_eq!(prizes[&PrizeTierKey::Eighth].winners, vec!["9999"]);
    }

    #[test]
    fn test_generic_h1_falls_back_to_title() {
        let page = r#"<html><head><title>Win Win (WW-800) 10/09/2025</title></head>
            <body><h1>Kerala Lottery Results</h1></body></html>"#;
        let url = "https://www.kllotteryresult.com/kerala-lottery-result-WW-800";
        let record = extractor().extract(url, page).unwrap();
        assert_eq!(record.draw_number, "WW-800");
        assert_eq!(record.lottery_name, "WIN WIN");
        assert_eq!(record.draw_date.to_string(), "2025-09-10");
    }

    #[test]
    fn test_plain_text_page() {
        let text = "Title: Akshaya AK-701 Result\n\nDraw held on 14 September 2025\n\n1st Prize\nAY 445566\n";
        let url = "https://www.kllotteryresult.com/kerala-lottery-result-AK-701";
        let record = extractor().extract(url, text).unwrap();

        assert_eq!(record.draw_number, "AK-701");
        assert_eq!(record.lottery_name, "AKSHAYA");
        assert_eq!(record.draw_date.to_string(), "2025-09-14");
        assert_eq!(record.filename, "AK-701-2025-09-14.json");
        assert_eq!(record.prizes[&PrizeTierKey::First].winners, vec!["AY 445566"]);
    }

    #[test]
    fn test_sentinels_when_nothing_is_found() {
        let url = "https://www.kllotteryresult.com/kerala-lottery-result-DL-30";
        let record = extractor().extract(url, "<p>nothing useful</p>").unwrap();
        assert_eq!(record.draw_number, "XX");
        assert_eq!(record.lottery_name, "DHANALEKSHMI");
        assert_eq!(record.draw_date, DrawDate::Unknown);
        assert_eq!(record.filename, "DL-XX-Unknown-Date.json");
        assert!(record.venue.is_none());
        assert!(record.download_link.is_none());
    }

    #[test]
    fn test_parenthesised_date_is_not_a_draw_number() {
        let page = "<h1>Sthree Sakthi Result (16/09/2025)</h1>";
        let record = extractor().extract(URL, page).unwrap();
        assert_eq!(record.draw_number, "XX");
        assert_eq!(record.filename, "SS-XX-2025-09-16.json");

        let page = "<h1>Sthree Sakthi (16/09/2025) SS-498</h1>";
        let record = extractor().extract(URL, page).unwrap();
        assert_eq!(record.draw_number, "SS-498");
        assert_eq!(record.filename, "SS-498-2025-09-16.json");

        let page = "<h1>Sthree Sakthi (Weekly) (498) 16.09.2025</h1>";
        let record = extractor().extract(URL, page).unwrap();
        assert_eq!(record.filename, "SS-498-2025-09-16.json");
    }

    #[test]
    fn test_url_without_code_is_skipped() {
        let err = extractor()
            .extract("https://www.kllotteryresult.com/about", "<h1>About</h1>")
            .unwrap_err();
        assert!(matches!(err, AppError::Extraction { .. }));
    }
}
