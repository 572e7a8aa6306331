// Display formatting for daily match rows.
//
// Every row keeps its raw fields and gains a set of presentation fields.
// Nothing here is persisted, rows are reformatted on every read.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

const FIGURE_SPACE: char = '\u{2007}';

static TRAILING_PARENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:\([^()]*\)\s*)+$").expect("valid parens pattern"));
static TRAILING_ROMAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[IVXLCDM]{1,4}\s*$").expect("valid roman pattern"));
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("valid space pattern"));
static SET_SCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d)(\d)(\(.+?\))?$").expect("valid score pattern"));
static SURFACE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:unknown|unk|n/a|na|none|-|0)$").expect("valid surface pattern"));

/// One row of a daily archive with its derived presentation fields
#[derive(Debug, Clone)]
pub struct DailyMatchRecord {
    pub raw: Map<String, Value>,
    pub display: MatchDisplay,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDisplay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournament_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournament_level: Option<Value>,
    pub surface: String,
    pub tournament_title: String,
    pub player1_label: String,
    pub player2_label: String,
    pub result_text: String,
    pub result_details_text: String,
    pub odds_text: String,
    pub odds_left: String,
    pub odds_right: String,
    pub probability_text: String,
    pub prob_left: String,
    pub prob_right: String,
}

impl DailyMatchRecord {
    pub fn from_raw(raw: Map<String, Value>) -> Self {
        let display = MatchDisplay::derive(&raw);
        Self { raw, display }
    }

    /// Raw fields with display fields layered on top
    pub fn to_value(&self) -> Value {
        let mut merged = self.raw.clone();
        if let Ok(Value::Object(display)) = serde_json::to_value(&self.display) {
            merged.extend(display);
        }
        Value::Object(merged)
    }
}

impl Serialize for DailyMatchRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl MatchDisplay {
    pub fn derive(row: &Map<String, Value>) -> Self {
        let event_iso3 = text(row, "tournamentEventCountryISO3").to_uppercase();
        let country_suffix = if !event_iso3.is_empty() && event_iso3 != "WLD" {
            format!(" ({})", event_iso3)
        } else {
            String::new()
        };

        let surface_name = [text(row, "matchSurfaceName"), text(row, "tournamentEventSurfaceName")]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or_default();

        let odds = DashPair::new(number(row, "player1Odds"), number(row, "player2Odds"));
        let probs = DashPair::new(
            number(row, "winProbabilityPlayer1NN"),
            number(row, "winProbabilityPlayer2NN"),
        );

        Self {
            tournament_type: row.get("tournamentTypeName").cloned(),
            tournament_level: row.get("tournamentLevelName").cloned(),
            surface: display_surface(&surface_name),
            tournament_title: format!("{}{}", clean_tournament_name(&text(row, "tournamentEventName")), country_suffix),
            player1_label: player_label(
                &text(row, "player1Name"),
                &text(row, "player1Seed"),
                &text(row, "player1CountryISO3"),
            ),
            player2_label: player_label(
                &text(row, "player2Name"),
                &text(row, "player2Seed"),
                &text(row, "player2CountryISO3"),
            ),
            result_text: format_result(&text(row, "result")),
            result_details_text: format_result_details(&text(row, "resultDetails")),
            odds_text: odds.text,
            odds_left: odds.left,
            odds_right: odds.right,
            probability_text: probs.text,
            prob_left: probs.left,
            prob_right: probs.right,
        }
    }
}

/// String view of a field; numbers are rendered, anything else is empty
fn text(row: &Map<String, Value>, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn number(row: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match row.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if !s.trim().is_empty() => s.trim().parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Fixed decimals, integer part left-padded with figure spaces so columns align
pub fn fmt_num(value: f64, digits_before: usize, decimals: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let formatted = format!("{:.*}", decimals, value);
    let int_len = formatted.split('.').next().map_or(0, |int| int.chars().count());
    let pad: String = std::iter::repeat(FIGURE_SPACE)
        .take(digits_before.saturating_sub(int_len))
        .collect();
    format!("{}{}", pad, formatted)
}

#[derive(Debug, Default)]
struct DashPair {
    left: String,
    right: String,
    text: String,
}

impl DashPair {
    fn new(a: Option<f64>, b: Option<f64>) -> Self {
        match (a, b) {
            (Some(a), Some(b)) => {
                let left = fmt_num(a, 3, 2);
                let right = fmt_num(b, 3, 2);
                let text = format!("{} - {}", left, right);
                Self { left, right, text }
            }
            _ => Self::default(),
        }
    }
}

pub fn display_surface(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || SURFACE_PLACEHOLDER.is_match(name) {
        String::new()
    } else {
        name.to_string()
    }
}

/// Drops trailing "(...)" groups and a trailing roman numeral edition marker
pub fn clean_tournament_name(name: &str) -> String {
    let name = TRAILING_PARENS.replace(name, "");
    let name = TRAILING_ROMAN.replace(&name, "");
    MULTI_SPACE.replace_all(&name, " ").trim().to_string()
}

pub fn clean_iso3(iso3: &str) -> String {
    let iso3 = iso3.trim().to_uppercase();
    if matches!(iso3.as_str(), "" | "WLD" | "NA" | "N/A" | "---") {
        return String::new();
    }
    if iso3.len() == 3 && iso3.bytes().all(|b| b.is_ascii_uppercase()) {
        iso3
    } else {
        String::new()
    }
}

pub fn player_label(name: &str, seed: &str, iso3: &str) -> String {
    let mut label = name.to_string();
    if !seed.is_empty() {
        label.push_str(&format!(" [{}]", seed));
    }
    let iso3 = clean_iso3(iso3);
    if !iso3.is_empty() {
        label.push_str(&format!(" ({})", iso3));
    }
    label.trim().to_string()
}

/// `"21"` -> `"2:1"`
pub fn format_result(result: &str) -> String {
    let chars: Vec<char> = result.chars().collect();
    match chars.as_slice() {
        [a, b] => format!("{}:{}", a, b),
        _ => String::new(),
    }
}

/// `"64 76(5)"` -> `"6:4 7:6(5)"`
pub fn format_result_details(details: &str) -> String {
    details
        .split_whitespace()
        .map(|token| match SET_SCORE.captures(token) {
            Some(caps) => format!(
                "{}:{}{}",
                &caps[1],
                &caps[2],
                caps.get(3).map_or("", |m| m.as_str())
            ),
            None => token.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
