//! Stored image identifiers.
//!
//! Photos are named after the nanosecond they were saved at, e.g.
//! `1731058200123456789.jpg`. A per-store counter guarantees names keep
//! increasing even when the clock stalls or steps backwards.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Extension of stored photos.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Extension of capture-record sidecars.
pub const RECORD_EXTENSION: &str = "json";

/// Opaque, stable identifier of a stored photo: its file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    /// Identifier for a photo saved at `nanos` since the Unix epoch.
    #[must_use]
    pub fn from_nanos(nanos: u128) -> Self {
        Self(format!("{nanos}.{IMAGE_EXTENSION}"))
    }

    /// The file name this identifier refers to.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The save time encoded in the name, if it is one of ours.
    #[must_use]
    pub fn nanos(&self) -> Option<u128> {
        self.stem().parse().ok()
    }

    /// Name of the capture-record sidecar belonging to this photo.
    #[must_use]
    pub fn record_file_name(&self) -> String {
        format!("{}.{RECORD_EXTENSION}", self.stem())
    }

    /// Whether the name is a single plain path component.
    #[must_use]
    pub fn is_plain_file_name(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.contains(['/', '\\'])
    }

    fn stem(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(stem, _)| stem)
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ImageId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for ImageId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Hand out strictly increasing nanosecond stamps, starting at the wall clock.
pub(crate) fn next_nanos(last: &mut u128) -> u128 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let next = now.max(last.saturating_add(1));
    *last = next;
    next
}
