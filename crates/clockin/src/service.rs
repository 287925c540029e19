//! Clock-in/clock-out orchestration.
//!
//! [`ClockService`] wires camera, stamper, photo library and image store
//! together. Stamping, encoding and file I/O run on tokio's blocking pool so
//! callers on the async runtime never stall on them.

use std::sync::Arc;

use tracing::{info, warn};

use crate::capture::{CameraSource, CaptureRecord, Variant};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::library::{ExportDirectory, NoLibrary, PhotoLibrary};
use crate::stamp::Stamper;
use crate::store::{ImageId, ImageStore, StoreOptions};

/// Outcome of one clock-in or clock-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Punch {
    /// Identifier of the stored photo.
    pub id: ImageId,
    /// What was stamped onto it.
    pub record: CaptureRecord,
    /// Whether the photo library accepted its copy.
    pub exported: bool,
}

/// The application's composition root.
#[derive(Debug, Clone)]
pub struct ClockService {
    stamper: Stamper,
    store: Arc<ImageStore>,
    library: Arc<dyn PhotoLibrary>,
    max_images: Option<usize>,
}

impl ClockService {
    /// Assemble a service from its parts.
    #[must_use]
    pub fn new(stamper: Stamper, store: Arc<ImageStore>, library: Arc<dyn PhotoLibrary>) -> Self {
        Self {
            stamper,
            store,
            library,
            max_images: None,
        }
    }

    /// Build everything described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image or export directory cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = ImageStore::open(
            config.image_directory(),
            StoreOptions::from(&config.store),
        )?;
        let library: Arc<dyn PhotoLibrary> = match &config.library.export_directory {
            Some(dir) => Arc::new(ExportDirectory::open(dir)?),
            None => Arc::new(NoLibrary),
        };

        Ok(Self::new(Stamper::new(config.stamp.clone()), Arc::new(store), library)
            .with_max_images(config.max_images()))
    }

    /// Keep at most `max` photos after each punch.
    #[must_use]
    pub fn with_max_images(mut self, max: Option<usize>) -> Self {
        self.max_images = max;
        self
    }

    /// The image store behind the gallery.
    #[must_use]
    pub fn store(&self) -> &Arc<ImageStore> {
        &self.store
    }

    /// Take a photo, stamp it, export it and save it.
    ///
    /// A failed export is logged and reported through [`Punch::exported`];
    /// the photo is still saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the camera fails or the photo cannot be saved.
    pub async fn punch(&self, camera: &dyn CameraSource, variant: Variant) -> Result<Punch> {
        let photo = camera.capture().await?;
        info!("Captured {}x{} photo from {} camera", photo.width(), photo.height(), camera.name());

        let stamper = self.stamper.clone();
        let stamped = Arc::new(blocking(move || Ok(stamper.stamp_now(&photo, variant))).await?);

        let library = Arc::clone(&self.library);
        let to_export = Arc::clone(&stamped);
        let exported = match blocking(move || library.export(&to_export.to_dynamic(), &to_export.record)).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Export to {} library failed: {}", self.library.name(), e);
                false
            }
        };

        let store = Arc::clone(&self.store);
        let to_save = Arc::clone(&stamped);
        let max_images = self.max_images;
        let id = blocking(move || {
            let id = store.save_stamped(&to_save)?;
            if let Some(keep) = max_images {
                store.prune_keep_recent(keep)?;
            }
            Ok(id)
        })
        .await?;

        Ok(Punch {
            id,
            record: stamped.record.clone(),
            exported,
        })
    }
}

/// Run `f` on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use image::{DynamicImage, Rgb, RgbImage};

    #[derive(Debug)]
    struct StaticCamera(DynamicImage);

    #[async_trait::async_trait]
    impl CameraSource for StaticCamera {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn capture(&self) -> Result<DynamicImage> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct BrokenCamera;

    #[async_trait::async_trait]
    impl CameraSource for BrokenCamera {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn capture(&self) -> Result<DynamicImage> {
            Err(Error::capture("permission to use the camera was not granted"))
        }
    }

    #[derive(Debug, Default)]
    struct RecordingLibrary {
        exports: Mutex<Vec<CaptureRecord>>,
    }

    impl PhotoLibrary for RecordingLibrary {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn export(&self, _image: &DynamicImage, record: &CaptureRecord) -> Result<()> {
            self.exports.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[derive(Debug)]
    struct DeniedLibrary;

    impl PhotoLibrary for DeniedLibrary {
        fn name(&self) -> &'static str {
            "denied"
        }

        fn export(&self, _image: &DynamicImage, _record: &CaptureRecord) -> Result<()> {
            Err(Error::export("photo library access denied"))
        }
    }

    fn camera() -> StaticCamera {
        StaticCamera(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            1200,
            900,
            Rgb([30, 30, 30]),
        )))
    }

    fn service(dir: &std::path::Path, library: Arc<dyn PhotoLibrary>) -> ClockService {
        let store = ImageStore::open(dir, StoreOptions::default()).unwrap();
        ClockService::new(Stamper::default(), Arc::new(store), library)
    }

    #[tokio::test]
    async fn test_punch_in_saves_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let library = Arc::new(RecordingLibrary::default());
        let service = service(dir.path(), library.clone());

        let punch = service.punch(&camera(), Variant::ClockIn).await.unwrap();
        assert!(punch.exported);
        assert_eq!(punch.record.variant, Variant::ClockIn);

        let listing = service.store().list().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, punch.id);
        assert_eq!(listing[0].record.as_ref(), Some(&punch.record));
        assert_eq!(
            (listing[0].image.width(), listing[0].image.height()),
            (800, 600)
        );

        let exports = library.exports.lock().unwrap();
        assert_eq!(exports.as_slice(), [punch.record.clone()]);
    }

    #[tokio::test]
    async fn test_in_then_out_lists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), Arc::new(NoLibrary));

        let first = service.punch(&camera(), Variant::ClockIn).await.unwrap();
        let second = service.punch(&camera(), Variant::ClockOut).await.unwrap();

        let ids: Vec<ImageId> = service
            .store()
            .list()
            .unwrap()
            .into_iter()
            .map(|img| img.id)
            .collect();
        assert_eq!(ids, [second.id, first.id]);
    }

    #[tokio::test]
    async fn test_export_failure_still_saves() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), Arc::new(DeniedLibrary));

        let punch = service.punch(&camera(), Variant::ClockOut).await.unwrap();
        assert!(!punch.exported);
        assert_eq!(service.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_camera_failure_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), Arc::new(NoLibrary));

        let err = service.punch(&BrokenCamera, Variant::ClockIn).await.unwrap_err();
        assert!(matches!(err, Error::Capture { .. }));
        assert_eq!(service.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_max_images_prunes_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), Arc::new(NoLibrary)).with_max_images(Some(2));

        service.punch(&camera(), Variant::ClockIn).await.unwrap();
        let second = service.punch(&camera(), Variant::ClockOut).await.unwrap();
        let third = service.punch(&camera(), Variant::ClockIn).await.unwrap();

        let ids: Vec<ImageId> = service
            .store()
            .list()
            .unwrap()
            .into_iter()
            .map(|img| img.id)
            .collect();
        assert_eq!(ids, [third.id, second.id]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_punches_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), Arc::new(NoLibrary));
        let camera = camera();

        let (a, b, c) = tokio::join!(
            service.punch(&camera, Variant::ClockIn),
            service.punch(&camera, Variant::ClockOut),
            service.punch(&camera, Variant::ClockIn),
        );
        let ids = [a.unwrap().id, b.unwrap().id, c.unwrap().id];

        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
        assert_eq!(service.store().count().unwrap(), 3);
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.directory = Some(dir.path().join("images"));
        config.library.export_directory = Some(dir.path().join("album"));
        config.store.max_images = 3;

        let service = ClockService::from_config(&config).unwrap();
        assert_eq!(service.store().dir(), dir.path().join("images"));
        assert!(dir.path().join("album").is_dir());
        assert_eq!(service.max_images, Some(3));
    }
}
