//! Photo library export.
//!
//! Besides the in-app gallery, every stamped photo is handed to a
//! [`PhotoLibrary`]: the device photo album on a phone, a plain directory
//! here.

use std::fs::OpenOptions;
use std::io::{Cursor, Write as _};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use tracing::{debug, info};

use crate::capture::CaptureRecord;
use crate::error::{Error, Result};

/// Where stamped photos are exported to.
pub trait PhotoLibrary: Send + Sync + std::fmt::Debug {
    /// The name of this library (for logging).
    fn name(&self) -> &'static str;

    /// Hand over one stamped photo.
    ///
    /// # Errors
    ///
    /// Returns an error if the library refuses or fails to store the photo.
    fn export(&self, image: &DynamicImage, record: &CaptureRecord) -> Result<()>;
}

/// A library that drops every export, used when no library is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLibrary;

impl PhotoLibrary for NoLibrary {
    fn name(&self) -> &'static str {
        "none"
    }

    fn export(&self, _image: &DynamicImage, record: &CaptureRecord) -> Result<()> {
        debug!("No photo library configured, skipping {} export", record.variant);
        Ok(())
    }
}

/// A library that writes PNG copies into a directory.
#[derive(Debug, Clone)]
pub struct ExportDirectory {
    dir: PathBuf,
}

impl ExportDirectory {
    /// Export into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The export directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn base_name(record: &CaptureRecord) -> String {
        format!(
            "{}_{}",
            record.variant,
            record.captured_at.format("%Y%m%d_%H%M%S_%f")
        )
    }
}

impl PhotoLibrary for ExportDirectory {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn export(&self, image: &DynamicImage, record: &CaptureRecord) -> Result<()> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::export(format!("cannot encode PNG: {e}")))?;

        let base = Self::base_name(record);
        let mut suffix = 0_u32;
        loop {
            let name = if suffix == 0 {
                format!("{base}.png")
            } else {
                format!("{base}-{suffix}.png")
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(&png)
                        .map_err(|e| Error::export(format!("{}: {e}", path.display())))?;
                    info!("Exported photo to {}", path.display());
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(Error::export(format!("{}: {e}", path.display()))),
            }
        }
    }
}
