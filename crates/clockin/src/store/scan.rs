//! Directory enumeration and decoding.

use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageReader};
use tracing::{debug, warn};

use super::id::{ImageId, RECORD_EXTENSION};
use crate::capture::CaptureRecord;
use crate::error::{Error, Result};

/// A file in the image directory, before decoding.
#[derive(Debug, Clone)]
pub(crate) struct StoredFile {
    pub id: ImageId,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// One decoded photo in the gallery listing.
#[derive(Debug, Clone)]
pub struct GalleryImage {
    /// Stable identifier, usable with [`ImageStore::delete_by_id`](super::ImageStore::delete_by_id).
    pub id: ImageId,
    /// Location of the photo on disk.
    pub path: PathBuf,
    /// Filesystem creation time (modification time where unavailable).
    pub created_at: DateTime<Utc>,
    /// Encoded size on disk.
    pub size_bytes: u64,
    /// The decoded photo.
    pub image: DynamicImage,
    /// Capture record from the sidecar, when one was written.
    pub record: Option<CaptureRecord>,
}

/// Enumerate photo candidates in `dir`, newest first.
///
/// Capture-record sidecars and sub-directories are not candidates.
pub(crate) fn scan_files(dir: &Path) -> Result<Vec<StoredFile>> {
    let read_dir = |source| Error::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir)? {
        let entry = entry.map_err(read_dir)?;
        let path = entry.path();
        if is_record(&path) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(UNIX_EPOCH);

        files.push(StoredFile {
            id: ImageId::from(entry.file_name().to_string_lossy().into_owned()),
            path,
            created_at: to_utc(created),
            size_bytes: metadata.len(),
        });
    }

    sort_newest_first(&mut files);
    Ok(files)
}

/// Scan `dir` and decode every photo, skipping files that fail to decode.
pub(crate) fn load_listing(dir: &Path) -> Result<Vec<GalleryImage>> {
    let files = scan_files(dir)?;
    let total = files.len();

    let listing: Vec<GalleryImage> = files
        .into_iter()
        .filter_map(|file| match decode(&file.path) {
            Ok(image) => {
                let record = read_record(dir, &file.id);
                Some(GalleryImage {
                    id: file.id,
                    path: file.path,
                    created_at: file.created_at,
                    size_bytes: file.size_bytes,
                    image,
                    record,
                })
            }
            Err(e) => {
                warn!("Skipping undecodable file: {}", e);
                None
            }
        })
        .collect();

    debug!(
        "Loaded {} of {} files from {}",
        listing.len(),
        total,
        dir.display()
    );
    Ok(listing)
}

/// Newest first; equal times fall back to the save stamp in the name.
pub(crate) fn sort_newest_first(files: &mut [StoredFile]) {
    files.sort_by_key(|f| Reverse((f.created_at, f.id.nanos(), f.id.clone())));
}

fn decode(path: &Path) -> Result<DynamicImage> {
    let decode_err = |source| Error::ImageDecode {
        path: path.to_path_buf(),
        source,
    };
    ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| decode_err(image::ImageError::IoError(e)))?
        .decode()
        .map_err(decode_err)
}

fn read_record(dir: &Path, id: &ImageId) -> Option<CaptureRecord> {
    let path = dir.join(id.record_file_name());
    let bytes = fs::read(&path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Ignoring malformed capture record {}: {}", path.display(), e);
            None
        }
    }
}

pub(crate) fn is_record(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORD_EXTENSION))
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
