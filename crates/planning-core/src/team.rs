//! Adjustment teams and editable team-input fields

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A source of manual forecast adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Sales,
    Marketing,
    Finance,
}

impl Team {
    /// All teams in attribution order
    pub const ALL: [Team; 3] = [Team::Sales, Team::Marketing, Team::Finance];

    /// Lowercase name used in payloads
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Team::Sales => "sales",
            Team::Marketing => "marketing",
            Team::Finance => "finance",
        }
    }
}

impl Display for Team {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Editable field of a team input cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamField {
    /// Numeric delta, kept as entered text
    Value,
    /// Free-text justification
    Comment,
    /// Person responsible for the adjustment
    Owner,
}
