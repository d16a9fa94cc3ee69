//! Planning configuration
//!
//! Loaded from TOML; every section is optional and falls back to defaults.
//!
//! ```toml
//! [window]
//! anchor_month = "2024-10"
//! months = 3
//!
//! [fallback_weights]
//! trend = 0.5
//! seasonality = 0.2
//!
//! [norms]
//! window = 6
//! z = 1.65
//! ```

use crate::error::{PlanningError, Result};
use crate::period::ReportingWindow;
use crate::row::{read_file, Component};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Planning configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Reporting window
    pub window: WindowConfig,
    /// Fallback decomposition shares
    pub fallback_weights: FallbackWeights,
    /// Stock-norm parameters
    pub norms: NormsParams,
}

impl PlanningConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With reporting window
    #[inline]
    #[must_use]
    pub fn with_window(mut self, anchor_month: impl Into<String>, months: u32) -> Self {
        self.window = WindowConfig {
            anchor_month: anchor_month.into(),
            months,
        };
        self
    }

    /// With fallback weights
    #[inline]
    #[must_use]
    pub fn with_weights(mut self, weights: FallbackWeights) -> Self {
        self.fallback_weights = weights;
        self
    }

    /// With norms parameters
    #[inline]
    #[must_use]
    pub fn with_norms(mut self, norms: NormsParams) -> Self {
        self.norms = norms;
        self
    }

    /// Parse configuration from TOML text and validate it
    ///
    /// # Errors
    /// Returns error on malformed TOML or out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, decoded, or validated
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&read_file(path)?)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`PlanningError::InvalidConfig`] on the first bad value
    pub fn validate(&self) -> Result<()> {
        self.reporting_window()?;
        self.fallback_weights.validate()?;
        self.norms.validate()
    }

    /// Build the reporting window described by this configuration
    ///
    /// # Errors
    /// Returns error if the anchor month or month count is invalid
    pub fn reporting_window(&self) -> Result<ReportingWindow> {
        ReportingWindow::new(&self.window.anchor_month, self.window.months)
    }
}

/// Reporting window configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// First month of the window, `YYYY-MM`
    pub anchor_month: String,
    /// Number of consecutive months
    pub months: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            anchor_month: "2024-10".to_string(),
            months: 3,
        }
    }
}

/// Share of a row's forecast assigned to a component the row does not carry
///
/// These are placeholder heuristics, not a fitted model, and are not
/// normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackWeights {
    pub trend: f64,
    pub seasonality: f64,
    pub discount: f64,
    pub spend: f64,
    pub lag: f64,
    pub moving_average: f64,
}

impl FallbackWeights {
    /// Weight for a component
    #[inline]
    #[must_use]
    pub fn weight(&self, component: Component) -> f64 {
        match component {
            Component::Trend => self.trend,
            Component::Seasonality => self.seasonality,
            Component::Discount => self.discount,
            Component::Spend => self.spend,
            Component::Lag => self.lag,
            Component::MovingAverage => self.moving_average,
        }
    }

    fn validate(&self) -> Result<()> {
        for component in Component::ALL {
            let w = self.weight(component);
            if !w.is_finite() || w < 0.0 {
                return Err(PlanningError::InvalidConfig(format!(
                    "fallback weight for {component} must be a non-negative number, got {w}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for FallbackWeights {
    fn default() -> Self {
        Self {
            trend: 0.50,
            seasonality: 0.20,
            discount: 0.10,
            spend: 0.10,
            lag: 0.05,
            moving_average: 0.05,
        }
    }
}

/// Parameters for stock-norm derivation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormsParams {
    /// Trailing periods used for the error and demand statistics
    pub window: usize,
    /// Service-level z-score
    pub z: f64,
    /// Replenishment lead time in periods
    pub lead_time: f64,
    /// Periods of demand the norm should cover
    pub cover_periods: f64,
}

impl NormsParams {
    fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(PlanningError::InvalidConfig(
                "norms window must be at least 1".to_string(),
            ));
        }
        for (name, v) in [
            ("z", self.z),
            ("lead_time", self.lead_time),
            ("cover_periods", self.cover_periods),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(PlanningError::InvalidConfig(format!(
                    "norms {name} must be a non-negative number, got {v}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for NormsParams {
    fn default() -> Self {
        Self {
            window: 6,
            z: 1.65,
            lead_time: 1.0,
            cover_periods: 1.0,
        }
    }
}
