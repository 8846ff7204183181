use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Inclusive calendar range requested from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `days` consecutive days beginning at `start`.
    pub fn window(start: NaiveDate, days: u64) -> Self {
        let end = start
            .checked_add_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Feed response body, kept as parsed JSON. Object key order is the feed's order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeedPayload {
    body: serde_json::Value,
}

impl RawFeedPayload {
    pub fn new(body: serde_json::Value) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// `element_count` as reported by the feed, if present.
    pub fn element_count(&self) -> Option<u64> {
        self.body.get("element_count").and_then(|v| v.as_u64())
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.body)
    }
}

/// Wire shape of one object entry under a date group.
#[derive(Debug, Clone, Deserialize)]
pub struct RawObjectRecord {
    pub id: String,
    pub name: String,
    pub is_potentially_hazardous_asteroid: bool,
    pub estimated_diameter: EstimatedDiameter,
    pub close_approach_data: Vec<CloseApproach>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimatedDiameter {
    pub kilometers: DiameterBounds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiameterBounds {
    #[serde(deserialize_with = "lenient_f64")]
    pub estimated_diameter_min: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub estimated_diameter_max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseApproach {
    pub relative_velocity: RelativeVelocity,
    pub miss_distance: MissDistance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelativeVelocity {
    #[serde(deserialize_with = "lenient_f64")]
    pub kilometers_per_second: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MissDistance {
    #[serde(deserialize_with = "lenient_f64")]
    pub kilometers: f64,
}

/// The feed sends velocities and distances as decimal strings and diameters as numbers.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("'{}' is not a number: {}", s, e))),
    }
}

/// One persisted close-approach row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeoRow {
    pub id: String,
    pub name: String,
    pub is_potentially_hazardous: bool,
    pub close_approach_date: NaiveDate,
    pub diameter_min_km: f64,
    pub diameter_max_km: f64,
    pub relative_velocity_km_s: f64,
    pub miss_distance_km: f64,
}

/// Column names in storage order.
pub const NEO_ROW_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "is_potentially_hazardous",
    "close_approach_date",
    "diameter_min_km",
    "diameter_max_km",
    "relative_velocity_km_s",
    "miss_distance_km",
];

/// Ordered rows produced by one transform run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    rows: Vec<NeoRow>,
}

impl RowSet {
    pub fn new(rows: Vec<NeoRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NeoRow> {
        self.rows.iter()
    }

    pub fn as_slice(&self) -> &[NeoRow] {
        &self.rows
    }
}

impl From<Vec<NeoRow>> for RowSet {
    fn from(rows: Vec<NeoRow>) -> Self {
        Self::new(rows)
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a NeoRow;
    type IntoIter = std::slice::Iter<'a, NeoRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// A feed record the transformer skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub date: String,
    pub position: usize,
    pub id: Option<String>,
    pub reason: String,
}

impl fmt::Display for RejectedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] (id {}): {}",
            self.date,
            self.position,
            self.id.as_deref().unwrap_or("?"),
            self.reason
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutput {
    pub rows: RowSet,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing to write; the table was not touched.
    Skipped,
    Replaced { rows: usize },
}

/// Result of counting the target table. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub table: String,
    pub count: i64,
    pub ok: bool,
}

impl Verification {
    pub fn failed(table: &str) -> Self {
        Self {
            table: table.to_string(),
            count: 0,
            ok: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub range: DateRange,
    pub rows_transformed: usize,
    pub records_rejected: usize,
    pub load: LoadOutcome,
    pub verification: Verification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_window() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        let range = DateRange::window(start, 7);
        assert_eq!(range.end_param(), "2024-02-05");
        assert_eq!(range.to_string(), "2024-01-30..2024-02-05");

        let single = DateRange::window(start, 1);
        assert_eq!(single.start, single.end);
    }

    #[test]
    fn test_close_approach_accepts_text_and_numbers() {
        let approach: CloseApproach = serde_json::from_value(serde_json::json!({
            "relative_velocity": {"kilometers_per_second": "5.25"},
            "miss_distance": {"kilometers": 1200.5}
        }))
        .unwrap();
        assert_eq!(approach.relative_velocity.kilometers_per_second, 5.25);
        assert_eq!(approach.miss_distance.kilometers, 1200.5);
    }

    #[test]
    fn test_close_approach_rejects_non_numeric_text() {
        let result: Result<CloseApproach, _> = serde_json::from_value(serde_json::json!({
            "relative_velocity": {"kilometers_per_second": "fast"},
            "miss_distance": {"kilometers": "1"}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_element_count() {
        let payload = RawFeedPayload::new(serde_json::json!({"element_count": 12}));
        assert_eq!(payload.element_count(), Some(12));
        assert_eq!(RawFeedPayload::new(serde_json::json!({})).element_count(), None);
    }
}
