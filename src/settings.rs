//! # Per-session settings
//!
//! Session settings live in a small JSON document next to the session data,
//! written by the interactive session-preparation tooling and read back by
//! the reduction:
//!
//! ```json
//! {
//!     "bands": ["B", "V", "Rc"],
//!     "diff_photometry": {
//!         "BV":  { "comp": "000-BBC-001", "check": "000-BBC-002" },
//!         "VRc": { "comp": "000-BBC-001" }
//!     },
//!     "disabled": ["000-BBC-717"]
//! }
//! ```
//!
//! Band pairs are keyed by their concatenated label, see
//! [`crate::bands::pair_label`]. The comparison star is required per pair;
//! the check star is optional. Stars listed in `disabled` are excluded from
//! every ensemble regardless of their measurement quality.

use std::collections::HashMap;
use std::fs;

use ahash::RandomState;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::bands::{band_pairs, pair_label};
use crate::constants::{Auid, Band, BandPair, StarSet};
use crate::diffphot_errors::DiffPhotError;

/// Star roles of one band pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSettings {
    /// Comparison star AUID.
    pub comp: Auid,
    /// Check star AUID, when one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<Auid>,
}

/// Settings of one observing session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Bands of the session, in reduction order.
    #[serde(default)]
    pub bands: Vec<Band>,
    /// Per-pair star roles, keyed by pair label.
    #[serde(default)]
    pub diff_photometry: HashMap<String, PairSettings, RandomState>,
    /// Stars excluded from every ensemble.
    #[serde(default)]
    pub disabled: Vec<Auid>,
}

impl SessionSettings {
    /// Parse settings from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, DiffPhotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a settings file.
    pub fn from_path(path: &Utf8Path) -> Result<Self, DiffPhotError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Render the settings as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, DiffPhotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Adjacent band pairs of the session, in band order.
    pub fn band_pairs(&self) -> Vec<BandPair> {
        band_pairs(&self.bands)
    }

    /// Star roles of one band pair.
    ///
    /// # Return
    ///
    /// * `Ok(&PairSettings)` – Roles configured for the pair.
    /// * `Err(DiffPhotError::MissingBandPair)` – No entry under the pair's
    ///   label.
    pub fn pair(&self, pair: &BandPair) -> Result<&PairSettings, DiffPhotError> {
        let label = pair_label(pair);
        self.diff_photometry
            .get(&label)
            .ok_or(DiffPhotError::MissingBandPair(label))
    }

    /// The disabled stars as a set, for ensemble filtering.
    pub fn disabled_set(&self) -> StarSet {
        self.disabled.iter().cloned().collect()
    }

    /// True unless the star is on the disabled list.
    pub fn is_star_enabled(&self, auid: &str) -> bool {
        !self.disabled.iter().any(|a| a == auid)
    }
}
