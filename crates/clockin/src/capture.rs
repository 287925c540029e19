//! Capture types for clockin.
//!
//! A capture is one press of the clock-in or clock-out button: a raw photo
//! from a [`CameraSource`], tagged with the [`Variant`] that produced it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{DynamicImage, Rgba};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Which of the two attendance actions produced a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Arriving at work.
    ClockIn,
    /// Leaving work.
    ClockOut,
}

impl Variant {
    /// Text drawn as the primary label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ClockIn => "IN",
            Self::ClockOut => "Out",
        }
    }

    /// Color of the primary label.
    #[must_use]
    pub fn color(self) -> Rgba<u8> {
        match self {
            Self::ClockIn => Rgba([0, 255, 0, 255]),
            Self::ClockOut => Rgba([255, 0, 0, 255]),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClockIn => write!(f, "clock_in"),
            Self::ClockOut => write!(f, "clock_out"),
        }
    }
}

/// Structured description of a stamped photo.
///
/// Persisted as a JSON sidecar next to the image so capture time and
/// direction survive as data and not only as pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Clock-in or clock-out.
    pub variant: Variant,
    /// When the photo was stamped.
    pub captured_at: DateTime<Utc>,
    /// The primary label as drawn.
    pub primary_label: String,
    /// The timestamp label as drawn.
    pub timestamp_label: String,
}

impl CaptureRecord {
    /// Build a record for a stamp applied at `captured_at`.
    #[must_use]
    pub fn new(variant: Variant, captured_at: DateTime<Utc>, timestamp_label: String) -> Self {
        Self {
            variant,
            captured_at,
            primary_label: variant.label().to_string(),
            timestamp_label,
        }
    }
}

/// Something that can take a single photo on request.
///
/// On a phone this is the front camera; the CLI uses [`FileCamera`].
#[async_trait::async_trait]
pub trait CameraSource: Send + Sync {
    /// The name of this camera (for logging).
    fn name(&self) -> &'static str;

    /// Take one photo.
    ///
    /// # Errors
    ///
    /// Returns an error if no photo could be produced or it cannot be decoded.
    async fn capture(&self) -> Result<DynamicImage>;
}

/// A camera that "captures" an existing photo from disk.
#[derive(Debug, Clone)]
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    /// Create a camera that returns the photo at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The photo this camera reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl CameraSource for FileCamera {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn capture(&self) -> Result<DynamicImage> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::capture(format!("cannot read {}: {e}", self.path.display())))?;
        debug!("Read {} bytes from {}", bytes.len(), self.path.display());

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes).map_err(|source| Error::ImageDecode { path, source })
        })
        .await
        .map_err(|e| Error::internal(format!("decode task failed: {e}")))?
    }
}
