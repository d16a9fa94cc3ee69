//! Forecast rows and the ingestion boundary
//!
//! Rows arrive as loosely-shaped JSON objects. They are decoded into
//! [`RawRow`] (every field optional, numbers accepted as numbers or numeric
//! strings) and then validated into [`ForecastRow`], which always carries a
//! full hierarchy path. Malformed values degrade to zero or `"N/A"`; a bad row
//! never aborts a load.
//!
//! Upstream updates reuse [`RawRow`]: fields present on an update overwrite
//! the matching row, fields absent leave it untouched.

use crate::error::{PlanningError, Result};
use crate::hierarchy::Level;
use crate::team::Team;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display, Formatter};
use std::path::Path;

/// Placeholder for a missing label or date
pub const NOT_AVAILABLE: &str = "N/A";

/// Named contribution of the system forecast decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Component {
    Trend,
    Seasonality,
    Discount,
    Spend,
    Lag,
    MovingAverage,
}

impl Component {
    /// All components, in bridge order
    pub const ALL: [Component; 6] = [
        Component::Trend,
        Component::Seasonality,
        Component::Discount,
        Component::Spend,
        Component::Lag,
        Component::MovingAverage,
    ];

    /// Field label as it appears in row payloads
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Component::Trend => "Trend",
            Component::Seasonality => "Seasonality",
            Component::Discount => "Discount",
            Component::Spend => "Spend",
            Component::Lag => "Lag",
            Component::MovingAverage => "MovingAverage",
        }
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Manual-input metadata attached to a row by an upstream system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualNote {
    #[serde(default, deserialize_with = "lenient_text")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub owner: Option<String>,
}

impl ManualNote {
    /// Create note with comment and owner
    #[inline]
    #[must_use]
    pub fn new(comment: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            owner: Some(owner.into()),
        }
    }

    /// Whether the note carries any metadata at all
    #[inline]
    #[must_use]
    pub fn is_present(&self) -> bool {
        let filled = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.comment) || filled(&self.owner)
    }
}

/// Row as decoded at the ingestion boundary
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRow {
    #[serde(default, alias = "key", deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(rename = "Channel", default, deserialize_with = "lenient_text")]
    pub channel: Option<String>,
    #[serde(rename = "Chain", default, deserialize_with = "lenient_text")]
    pub chain: Option<String>,
    #[serde(rename = "Depot", default, deserialize_with = "lenient_text")]
    pub depot: Option<String>,
    #[serde(rename = "SubCat", default, deserialize_with = "lenient_text")]
    pub sub_cat: Option<String>,
    #[serde(rename = "SKU", default, deserialize_with = "lenient_text")]
    pub sku: Option<String>,
    #[serde(rename = "Date", default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(rename = "Actual", default, deserialize_with = "lenient_number")]
    pub actual: Option<f64>,
    #[serde(rename = "Forecast", default, deserialize_with = "lenient_number")]
    pub forecast: Option<f64>,
    #[serde(rename = "Trend", default, deserialize_with = "lenient_number")]
    pub trend: Option<f64>,
    #[serde(rename = "Seasonality", default, deserialize_with = "lenient_number")]
    pub seasonality: Option<f64>,
    #[serde(rename = "Discount", default, deserialize_with = "lenient_number")]
    pub discount: Option<f64>,
    #[serde(rename = "Spend", default, deserialize_with = "lenient_number")]
    pub spend: Option<f64>,
    #[serde(rename = "Lag", default, deserialize_with = "lenient_number")]
    pub lag: Option<f64>,
    #[serde(rename = "MovingAverage", default, deserialize_with = "lenient_number")]
    pub moving_average: Option<f64>,
    #[serde(rename = "Consensus", default, deserialize_with = "lenient_number")]
    pub consensus: Option<f64>,
    #[serde(rename = "salesInput", default)]
    pub sales_input: Option<ManualNote>,
    #[serde(rename = "marketingInput", default)]
    pub marketing_input: Option<ManualNote>,
    #[serde(rename = "financeInput", default)]
    pub finance_input: Option<ManualNote>,
}

impl RawRow {
    /// Component value carried by this payload
    #[must_use]
    pub fn component(&self, component: Component) -> Option<f64> {
        match component {
            Component::Trend => self.trend,
            Component::Seasonality => self.seasonality,
            Component::Discount => self.discount,
            Component::Spend => self.spend,
            Component::Lag => self.lag,
            Component::MovingAverage => self.moving_average,
        }
    }

    /// Manual note carried for a team
    #[must_use]
    pub fn note(&self, team: Team) -> Option<&ManualNote> {
        match team {
            Team::Sales => self.sales_input.as_ref(),
            Team::Marketing => self.marketing_input.as_ref(),
            Team::Finance => self.finance_input.as_ref(),
        }
    }
}

/// One validated forecast observation for a hierarchy path and month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub key: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Chain")]
    pub chain: String,
    #[serde(rename = "Depot")]
    pub depot: String,
    #[serde(rename = "SubCat")]
    pub sub_cat: String,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Actual")]
    pub actual: f64,
    #[serde(rename = "Forecast")]
    pub forecast: f64,
    /// Explicit decomposition components; absent ones fall back to weights
    pub components: BTreeMap<Component, f64>,
    /// Authoritative consensus figure supplied upstream
    #[serde(rename = "Consensus", skip_serializing_if = "Option::is_none")]
    pub consensus: Option<f64>,
    /// Upstream manual-input metadata by team
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<Team, ManualNote>,
}

impl ForecastRow {
    /// Create row with a full hierarchy path and baseline forecast
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        path: [&str; 5],
        date: impl Into<String>,
        forecast: f64,
    ) -> Self {
        let [channel, chain, depot, sub_cat, sku] = path.map(str::to_string);
        Self {
            key: key.into(),
            channel,
            chain,
            depot,
            sub_cat,
            sku,
            date: date.into(),
            actual: 0.0,
            forecast,
            components: BTreeMap::new(),
            consensus: None,
            notes: BTreeMap::new(),
        }
    }

    /// Validate a raw payload into a row
    ///
    /// Missing labels and dates become `"N/A"`, missing numbers become zero.
    /// A missing id is derived from the hierarchy path and date.
    #[must_use]
    pub fn from_raw(raw: &RawRow) -> Self {
        let label = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let mut row = Self {
            key: String::new(),
            channel: label(&raw.channel),
            chain: label(&raw.chain),
            depot: label(&raw.depot),
            sub_cat: label(&raw.sub_cat),
            sku: label(&raw.sku),
            date: label(&raw.date),
            actual: raw.actual.unwrap_or(0.0),
            forecast: raw.forecast.unwrap_or(0.0),
            components: BTreeMap::new(),
            consensus: raw.consensus,
            notes: BTreeMap::new(),
        };
        row.absorb_components(raw);
        row.absorb_notes(raw);
        row.key = raw.id.clone().unwrap_or_else(|| row.path_key());
        row
    }

    /// Overwrite the fields an update carries
    ///
    /// The row key is never changed by a merge.
    pub fn merge(&mut self, update: &RawRow) {
        let overwrite = |slot: &mut String, v: &Option<String>| {
            if let Some(v) = v {
                slot.clone_from(v);
            }
        };
        overwrite(&mut self.channel, &update.channel);
        overwrite(&mut self.chain, &update.chain);
        overwrite(&mut self.depot, &update.depot);
        overwrite(&mut self.sub_cat, &update.sub_cat);
        overwrite(&mut self.sku, &update.sku);
        overwrite(&mut self.date, &update.date);
        if let Some(actual) = update.actual {
            self.actual = actual;
        }
        if let Some(forecast) = update.forecast {
            self.forecast = forecast;
        }
        if update.consensus.is_some() {
            self.consensus = update.consensus;
        }
        self.absorb_components(update);
        self.absorb_notes(update);
    }

    /// Builder: set actual quantity
    #[inline]
    #[must_use]
    pub fn with_actual(mut self, actual: f64) -> Self {
        self.actual = actual;
        self
    }

    /// Builder: set an explicit component value
    #[inline]
    #[must_use]
    pub fn with_component(mut self, component: Component, value: f64) -> Self {
        self.components.insert(component, value);
        self
    }

    /// Builder: set the authoritative consensus figure
    #[inline]
    #[must_use]
    pub fn with_consensus(mut self, consensus: f64) -> Self {
        self.consensus = Some(consensus);
        self
    }

    /// Builder: attach manual-input metadata for a team
    #[inline]
    #[must_use]
    pub fn with_note(mut self, team: Team, note: ManualNote) -> Self {
        self.notes.insert(team, note);
        self
    }

    /// Label at a hierarchy level
    #[inline]
    #[must_use]
    pub fn value_at(&self, level: Level) -> &str {
        match level {
            Level::Channel => &self.channel,
            Level::Chain => &self.chain,
            Level::Depot => &self.depot,
            Level::SubCat => &self.sub_cat,
            Level::Sku => &self.sku,
        }
    }

    /// Explicit component value, if the row carries one
    #[inline]
    #[must_use]
    pub fn component(&self, component: Component) -> Option<f64> {
        self.components.get(&component).copied()
    }

    /// Authoritative consensus if present, else the baseline forecast
    #[inline]
    #[must_use]
    pub fn data_consensus(&self) -> f64 {
        self.consensus.unwrap_or(self.forecast)
    }

    /// Whether any team left manual-input metadata on this row
    #[inline]
    #[must_use]
    pub fn has_manual_input(&self) -> bool {
        self.notes.values().any(ManualNote::is_present)
    }

    /// Teams with metadata on this row, in attribution order
    pub fn touched_teams(&self) -> impl Iterator<Item = (Team, &ManualNote)> + '_ {
        self.notes
            .iter()
            .filter(|(_, note)| note.is_present())
            .map(|(team, note)| (*team, note))
    }

    fn path_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.channel, self.chain, self.depot, self.sub_cat, self.sku, self.date
        )
    }

    fn absorb_components(&mut self, raw: &RawRow) {
        for component in Component::ALL {
            if let Some(value) = raw.component(component) {
                self.components.insert(component, value);
            }
        }
    }

    fn absorb_notes(&mut self, raw: &RawRow) {
        for team in Team::ALL {
            if let Some(note) = raw.note(team) {
                self.notes.insert(team, note.clone());
            }
        }
    }
}

/// Outcome of merging an update batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Updates applied to an existing row
    pub matched: usize,
    /// Updates with no id or no matching row
    pub ignored: usize,
}

/// Merge upstream updates into rows by identifier
///
/// Rows are never appended or removed. Unmatched updates are ignored.
pub fn merge_updates(rows: &mut [ForecastRow], updates: &[RawRow]) -> MergeReport {
    let index: HashMap<String, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.key.clone(), i))
        .collect();

    let mut report = MergeReport::default();
    for update in updates {
        match update.id.as_ref().and_then(|id| index.get(id)) {
            Some(&i) => {
                rows[i].merge(update);
                report.matched += 1;
            }
            None => {
                tracing::warn!(id = ?update.id, "ignoring update with no matching row");
                report.ignored += 1;
            }
        }
    }
    tracing::info!(matched = report.matched, ignored = report.ignored, "merged row updates");
    report
}

/// Decode raw payloads from a JSON array
///
/// # Errors
/// Returns error if the text is not a JSON array of objects
pub fn parse_raw_rows(json: &str) -> Result<Vec<RawRow>> {
    Ok(serde_json::from_str(json)?)
}

/// Decode and validate rows from a JSON array
///
/// # Errors
/// Returns error if the text is not a JSON array of objects
pub fn load_rows(json: &str) -> Result<Vec<ForecastRow>> {
    let rows: Vec<ForecastRow> = parse_raw_rows(json)?.iter().map(ForecastRow::from_raw).collect();
    tracing::info!(count = rows.len(), "loaded forecast rows");
    Ok(rows)
}

/// Read a file into a string, tagging IO errors with the path
///
/// # Errors
/// Returns [`PlanningError::Io`] if the file cannot be read
pub fn read_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|e| PlanningError::io_error(path, e))
}

/// Load rows from a JSON file
///
/// # Errors
/// Returns error if the file cannot be read or decoded
pub fn load_rows_file(path: impl AsRef<Path>) -> Result<Vec<ForecastRow>> {
    load_rows(&read_file(path)?)
}

/// Load updates from a JSON file
///
/// # Errors
/// Returns error if the file cannot be read or decoded
pub fn load_updates_file(path: impl AsRef<Path>) -> Result<Vec<RawRow>> {
    parse_raw_rows(&read_file(path)?)
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::Number(n) => Some(n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0)),
        Value::String(s) => Some(
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .unwrap_or(0.0),
        ),
        _ => Some(0.0),
    })
}
