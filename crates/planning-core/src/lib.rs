//! Planning Core - Rollup & Bridge Engine
//!
//! Aggregation core of a consensus-planning dashboard:
//! - Resolves the active grouping level from hierarchy filters
//! - Groups and sums forecast rows per reporting period
//! - Layers synchronized and manual team deltas into consensus values
//! - Builds the baseline → consensus bridge per period
//! - Derives stock norms from forecast accuracy
//!
//! All passes are pure, synchronous, and degrade to zero/empty instead of
//! failing. Errors only arise when decoding inputs or configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use planning_core::prelude::*;
//!
//! let config = PlanningConfig::new();
//! let mut store = PlanningStore::new(&config)?;
//!
//! store.dispatch(Action::Load(load_rows_file("rows.json")?));
//! store.dispatch(Action::Select(Level::Channel, Selection::is("North")));
//! let snapshot = store.dispatch(Action::Edit(TeamEdit::value("C1", Team::Sales, "Oct", "20")));
//!
//! println!("Oct final: {}", snapshot.bridge[0].final_total);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod bridge;
pub mod config;
pub mod consensus;
pub mod error;
pub mod hierarchy;
pub mod norms;
pub mod period;
pub mod rollup;
pub mod row;
pub mod store;
pub mod team;

// Re-exports for convenience
pub use bridge::{build_bridge, BridgeRow};
pub use config::{FallbackWeights, NormsParams, PlanningConfig, WindowConfig};
pub use consensus::{
    apply_edits, edited_groups, parse_numeric, refresh_consensus, synchronize, ConsensusValues,
    EntryOrigin, TeamEdit, TeamEntry, TeamInputs,
};
pub use error::{PlanningError, Result};
pub use hierarchy::{resolve_grouping_level, FilterSelection, Level, Selection};
pub use norms::{compute_norms, NormRow};
pub use period::{Period, ReportingWindow};
pub use rollup::{rollup, GroupSummaryRow, PeriodTotals, Rollup};
pub use row::{
    load_rows, load_rows_file, load_updates_file, merge_updates, parse_raw_rows, Component,
    ForecastRow, ManualNote, MergeReport, RawRow,
};
pub use store::{reduce, Action, PlanningState, PlanningStore, Snapshot};
pub use team::{Team, TeamField};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the planning core
    pub use crate::{
        load_rows, load_rows_file, Action, FilterSelection, ForecastRow, Level, PlanningConfig,
        PlanningStore, Selection, Snapshot, Team, TeamEdit,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
