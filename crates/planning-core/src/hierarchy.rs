//! Hierarchy levels and filter selections
//!
//! The planning hierarchy is a strict containment ordering:
//! `Channel > Chain > Depot > SubCat > SKU`. A [`FilterSelection`] pins zero
//! or more levels to concrete labels; the first level left open decides how
//! rows are grouped.

use crate::error::PlanningError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Sentinel label meaning "do not constrain this level"
pub const ALL: &str = "All";

/// One level of the planning hierarchy, broadest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    /// Sales channel
    Channel,
    /// Retail chain
    Chain,
    /// Depot / distribution point
    Depot,
    /// Product sub-category
    SubCat,
    /// Stock keeping unit
    #[serde(rename = "SKU")]
    Sku,
}

impl Level {
    /// All levels, broadest to narrowest
    pub const ALL: [Level; 5] = [
        Level::Channel,
        Level::Chain,
        Level::Depot,
        Level::SubCat,
        Level::Sku,
    ];

    /// Depth in the hierarchy (0 = broadest)
    #[inline]
    #[must_use]
    pub fn depth(self) -> usize {
        match self {
            Level::Channel => 0,
            Level::Chain => 1,
            Level::Depot => 2,
            Level::SubCat => 3,
            Level::Sku => 4,
        }
    }

    /// Field label as it appears in row payloads
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Level::Channel => "Channel",
            Level::Chain => "Chain",
            Level::Depot => "Depot",
            Level::SubCat => "SubCat",
            Level::Sku => "SKU",
        }
    }

    /// Next narrower level, if any
    #[inline]
    #[must_use]
    pub fn narrower(self) -> Option<Level> {
        Level::ALL.get(self.depth() + 1).copied()
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Level {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "channel" => Ok(Level::Channel),
            "chain" => Ok(Level::Chain),
            "depot" => Ok(Level::Depot),
            "subcat" | "sub_cat" | "sub-cat" => Ok(Level::SubCat),
            "sku" => Ok(Level::Sku),
            _ => Err(PlanningError::UnknownLevel(s.to_string())),
        }
    }
}

/// Selection at a single level
///
/// Unset and the `"All"` sentinel are the same thing: the level is not
/// constrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Selection {
    /// Unconstrained
    #[default]
    All,
    /// Pinned to a concrete label
    Is(String),
}

impl Selection {
    /// Pin to a concrete label (`"All"` still means unconstrained)
    #[inline]
    #[must_use]
    pub fn is(label: impl Into<String>) -> Self {
        Self::from(Some(label.into()))
    }

    /// Whether this selection pins a concrete label
    #[inline]
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        matches!(self, Self::Is(_))
    }

    /// Whether a row value passes this selection
    #[inline]
    #[must_use]
    pub fn admits(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::Is(label) => label == value,
        }
    }
}

impl From<Option<String>> for Selection {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(label) if !label.is_empty() && label != ALL => Self::Is(label),
            _ => Self::All,
        }
    }
}

impl From<Option<&str>> for Selection {
    fn from(value: Option<&str>) -> Self {
        Self::from(value.map(str::to_string))
    }
}

impl From<Selection> for Option<String> {
    fn from(value: Selection) -> Self {
        match value {
            Selection::All => Some(ALL.to_string()),
            Selection::Is(label) => Some(label),
        }
    }
}

/// Active filter selections, one per hierarchy level
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(rename = "Channel", default)]
    pub channel: Selection,
    #[serde(rename = "Chain", default)]
    pub chain: Selection,
    #[serde(rename = "Depot", default)]
    pub depot: Selection,
    #[serde(rename = "SubCat", default)]
    pub sub_cat: Selection,
    #[serde(rename = "SKU", default)]
    pub sku: Selection,
}

impl FilterSelection {
    /// Everything unconstrained
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection at a level
    #[inline]
    #[must_use]
    pub fn get(&self, level: Level) -> &Selection {
        match level {
            Level::Channel => &self.channel,
            Level::Chain => &self.chain,
            Level::Depot => &self.depot,
            Level::SubCat => &self.sub_cat,
            Level::Sku => &self.sku,
        }
    }

    /// Replace the selection at a level
    #[inline]
    pub fn set(&mut self, level: Level, selection: Selection) {
        let slot = match level {
            Level::Channel => &mut self.channel,
            Level::Chain => &mut self.chain,
            Level::Depot => &mut self.depot,
            Level::SubCat => &mut self.sub_cat,
            Level::Sku => &mut self.sku,
        };
        *slot = selection;
    }

    /// Builder form of [`FilterSelection::set`]
    #[inline]
    #[must_use]
    pub fn with(mut self, level: Level, selection: impl Into<Selection>) -> Self {
        self.set(level, selection.into());
        self
    }

    /// Level whose distinct values become groups
    #[inline]
    #[must_use]
    pub fn grouping_level(&self) -> Level {
        resolve_grouping_level(self)
    }
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        Self::from(Some(value))
    }
}

/// Resolve the active grouping level for a selection vector
///
/// Walks broadest to narrowest and returns the first level that is not
/// pinned. When every level is pinned the leaf level is returned.
#[must_use]
pub fn resolve_grouping_level(selection: &FilterSelection) -> Level {
    Level::ALL
        .into_iter()
        .find(|level| !selection.get(*level).is_concrete())
        .unwrap_or(Level::Sku)
}
