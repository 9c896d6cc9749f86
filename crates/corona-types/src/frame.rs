//! The heliographic frame a PFSS model is expressed in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Carrington heliographic frame tied to a model: longitude rotates with the
/// Sun, and coordinates only compare meaningfully at the same observation
/// time. The source-surface radius rides along so consumers can interpret
/// radial bounds without holding the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarringtonFrame {
    pub obstime: DateTime<Utc>,
    pub rss: f64,
}

impl CarringtonFrame {
    pub fn new(obstime: DateTime<Utc>, rss: f64) -> Self {
        CarringtonFrame { obstime, rss }
    }

    /// True when `other` was observed at the same instant. Mixing epochs is
    /// physically meaningless but not an error; callers warn and proceed.
    pub fn same_epoch(&self, other: &CarringtonFrame) -> bool {
        self.obstime == other.obstime
    }
}
