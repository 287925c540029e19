//! Local image store for clockin.
//!
//! Stamped photos live as JPEG files in a single directory, one file per
//! capture, optionally accompanied by a JSON capture record. The store keeps
//! an in-memory listing (newest first) that is rebuilt from disk after every
//! mutation.
//!
//! Every operation holds the store's lock for its whole load-modify-reload
//! cycle, so positional deletes always refer to the listing they were
//! computed against.

mod id;
mod scan;

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::stamp::StampedImage;

pub use id::{ImageId, IMAGE_EXTENSION, RECORD_EXTENSION};
pub use scan::GalleryImage;

/// How many fresh names to try before giving up on a save.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Write options for an [`ImageStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// JPEG quality, 1 to 100.
    pub jpeg_quality: u8,
    /// Write a capture record sidecar for stamped photos.
    pub write_records: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 100,
            write_records: true,
        }
    }
}

impl From<&StoreConfig> for StoreOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality,
            write_records: config.write_records,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    /// Cached listing; `None` until first loaded.
    listing: Option<Vec<GalleryImage>>,
    /// Last save stamp handed out.
    last_nanos: u128,
}

/// A directory of stamped photos.
#[derive(Debug)]
pub struct ImageStore {
    dir: PathBuf,
    options: StoreOptions,
    state: Mutex<StoreState>,
}

impl ImageStore {
    /// Open the store rooted at `dir`, creating the directory if needed.
    ///
    /// The listing is not read until first requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
                path: dir.clone(),
                source,
            })?;
        }

        info!("Image store opened at {}", dir.display());
        Ok(Self {
            dir,
            options,
            state: Mutex::new(StoreState::default()),
        })
    }

    /// The directory backing this store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encode `image` and persist it under a fresh name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageEncode`] if encoding fails and
    /// [`Error::StorageWriteFailed`] if the file cannot be written.
    pub fn save(&self, image: &DynamicImage) -> Result<ImageId> {
        let bytes = encode_jpeg(image, self.options.jpeg_quality)?;
        let mut state = self.lock()?;
        let (id, _) = self.write_new(&mut state, &bytes)?;
        self.refresh(&mut state);
        Ok(id)
    }

    /// Persist a stamped photo together with its capture record.
    ///
    /// The record is skipped when sidecars are disabled. If the record cannot
    /// be written the photo is removed again.
    ///
    /// # Errors
    ///
    /// Same as [`ImageStore::save`].
    pub fn save_stamped(&self, stamped: &StampedImage) -> Result<ImageId> {
        let bytes = encode_jpeg(&stamped.to_dynamic(), self.options.jpeg_quality)?;
        let json = serde_json::to_vec_pretty(&stamped.record)?;
        let mut state = self.lock()?;
        let (id, path) = self.write_new(&mut state, &bytes)?;

        if self.options.write_records {
            let record_path = self.dir.join(id.record_file_name());
            if let Err(source) = fs::write(&record_path, json) {
                discard(&path);
                self.refresh(&mut state);
                return Err(Error::StorageWriteFailed {
                    path: record_path,
                    source,
                });
            }
        }

        info!("Saved {} photo {}", stamped.record.variant, id);
        self.refresh(&mut state);
        Ok(id)
    }

    /// Re-read the directory and return every decodable photo, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryRead`] if the directory cannot be enumerated;
    /// the cached listing is emptied in that case.
    pub fn list(&self) -> Result<Vec<GalleryImage>> {
        let mut state = self.lock()?;
        match scan::load_listing(&self.dir) {
            Ok(listing) => {
                state.listing = Some(listing.clone());
                Ok(listing)
            }
            Err(e) => {
                warn!("Listing {} failed: {}", self.dir.display(), e);
                state.listing = Some(Vec::new());
                Err(e)
            }
        }
    }

    /// The listing as of the last load or mutation, loading it on first use.
    ///
    /// # Errors
    ///
    /// Same as [`ImageStore::list`] when the listing has to be loaded.
    pub fn images(&self) -> Result<Vec<GalleryImage>> {
        {
            let state = self.lock()?;
            if let Some(listing) = &state.listing {
                return Ok(listing.clone());
            }
        }
        self.list()
    }

    /// Number of decodable photos currently on disk.
    ///
    /// # Errors
    ///
    /// Same as [`ImageStore::list`].
    pub fn count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    /// Delete the photo at `index` in the current newest-first listing.
    ///
    /// Returns the identifier of the deleted photo.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if `index` is past the end of the
    /// listing, in which case nothing is removed.
    pub fn delete(&self, index: usize) -> Result<ImageId> {
        let mut state = self.lock()?;
        let listing = scan::load_listing(&self.dir)?;
        let Some(entry) = listing.get(index) else {
            return Err(Error::InvalidIndex {
                index,
                count: listing.len(),
            });
        };

        let id = entry.id.clone();
        self.remove_files(&id)?;
        info!("Deleted photo {} (index {})", id, index);
        self.refresh(&mut state);
        Ok(id)
    }

    /// Delete the photo named by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageNotFound`] if no such photo exists.
    pub fn delete_by_id(&self, id: &ImageId) -> Result<()> {
        let mut state = self.lock()?;
        let path = self.dir.join(id.as_str());
        if !id.is_plain_file_name() || scan::is_record(&path) || !path.is_file() {
            return Err(Error::ImageNotFound { id: id.to_string() });
        }

        self.remove_files(id)?;
        info!("Deleted photo {}", id);
        self.refresh(&mut state);
        Ok(())
    }

    /// Delete every file in the directory.
    ///
    /// Returns the number of non-record files removed. Files that never
    /// decoded are removed and counted too, so this can exceed
    /// [`ImageStore::count`].
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or a file cannot be
    /// removed. Files removed before the failure stay removed.
    pub fn delete_all(&self) -> Result<usize> {
        let mut state = self.lock()?;
        let read_dir = |source| Error::DirectoryRead {
            path: self.dir.clone(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(read_dir)? {
            paths.push(entry.map_err(read_dir)?.path());
        }

        let removed = self.remove_each(&mut state, paths, |path| {
            if !path.is_file() {
                return Ok(false);
            }
            fs::remove_file(&path).map_err(|source| Error::StorageDeleteFailed {
                path: path.clone(),
                source,
            })?;
            Ok(!scan::is_record(&path))
        })?;

        info!("Deleted all {} files from {}", removed, self.dir.display());
        Ok(removed)
    }

    /// Keep only the `keep` newest photos.
    ///
    /// Returns the number of photos deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or a file cannot be
    /// removed.
    pub fn prune_keep_recent(&self, keep: usize) -> Result<usize> {
        let mut state = self.lock()?;
        let listing = scan::load_listing(&self.dir)?;

        let pruned = self.remove_each(&mut state, listing.iter().skip(keep), |file| {
            self.remove_files(&file.id).map(|()| true)
        })?;

        if pruned > 0 {
            info!("Pruned {} photos to keep {} recent", pruned, keep);
        }
        Ok(pruned)
    }

    /// Summary of what is on disk.
    ///
    /// # Errors
    ///
    /// Same as [`ImageStore::list`].
    pub fn stats(&self) -> Result<StoreStats> {
        let listing = self.list()?;
        Ok(StoreStats {
            total_images: listing.len(),
            newest: listing.first().map(|img| img.created_at),
            oldest: listing.last().map(|img| img.created_at),
            total_bytes: listing.iter().map(|img| img.size_bytes).sum(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| Error::internal("image store lock poisoned"))
    }

    /// Write `bytes` under a name that did not exist before.
    fn write_new(&self, state: &mut StoreState, bytes: &[u8]) -> Result<(ImageId, PathBuf)> {
        let mut attempts = 0;
        loop {
            let id = ImageId::from_nanos(id::next_nanos(&mut state.last_nanos));
            let path = self.dir.join(id.as_str());

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempts += 1;
                    if attempts >= MAX_NAME_ATTEMPTS {
                        return Err(Error::StorageWriteFailed { path, source: e });
                    }
                    debug!("{} already exists, picking a new name", path.display());
                    continue;
                }
                Err(source) => return Err(Error::StorageWriteFailed { path, source }),
            };

            if let Err(source) = file.write_all(bytes).and_then(|()| file.sync_all()) {
                drop(file);
                discard(&path);
                return Err(Error::StorageWriteFailed { path, source });
            }

            debug!("Wrote {} bytes to {}", bytes.len(), path.display());
            return Ok((id, path));
        }
    }

    /// Run `remove` over `items`, stopping at the first failure.
    ///
    /// The listing is rebuilt whether or not every removal succeeded. Returns
    /// how many removals reported `true`.
    fn remove_each<T>(
        &self,
        state: &mut StoreState,
        items: impl IntoIterator<Item = T>,
        mut remove: impl FnMut(T) -> Result<bool>,
    ) -> Result<usize> {
        let mut removed = 0;
        let mut outcome = Ok(());
        for item in items {
            match remove(item) {
                Ok(counted) => removed += usize::from(counted),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        self.refresh(state);
        outcome.map(|()| removed)
    }

    /// Remove a photo and its capture record, if any.
    fn remove_files(&self, id: &ImageId) -> Result<()> {
        let path = self.dir.join(id.as_str());
        fs::remove_file(&path).map_err(|source| Error::StorageDeleteFailed {
            path: path.clone(),
            source,
        })?;

        let record = self.dir.join(id.record_file_name());
        match fs::remove_file(&record) {
            Ok(()) => debug!("Removed capture record {}", record.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", record.display(), e),
        }
        Ok(())
    }

    /// Rebuild the cached listing after a mutation.
    ///
    /// The mutation already happened, so a failed reload only empties the
    /// cache.
    fn refresh(&self, state: &mut StoreState) {
        state.listing = Some(scan::load_listing(&self.dir).unwrap_or_else(|e| {
            warn!("Reloading {} failed: {}", self.dir.display(), e);
            Vec::new()
        }));
    }
}

/// Remove a partially saved file.
fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Could not remove partial file {}: {}", path.display(), e);
    }
}

/// Encode `image` as JPEG. Alpha is dropped since JPEG cannot carry it.
fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(bytes)
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of decodable photos.
    pub total_images: usize,
    /// Creation time of the oldest photo.
    pub oldest: Option<DateTime<Utc>>,
    /// Creation time of the newest photo.
    pub newest: Option<DateTime<Utc>>,
    /// Combined size of the photos on disk.
    pub total_bytes: u64,
}
