//! `clockin` - Clock-in/clock-out photo attendance
//!
//! This library captures a photo, stamps it with an `IN`/`Out` label and the
//! time, keeps it in a local image store and hands a copy to a photo library.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod library;
pub mod logging;
pub mod service;
pub mod stamp;
pub mod store;

pub use capture::{CameraSource, CaptureRecord, FileCamera, Variant};
pub use config::Config;
pub use error::{Error, Result};
pub use gate::Passcode;
pub use library::{ExportDirectory, NoLibrary, PhotoLibrary};
pub use logging::init_logging;
pub use service::{ClockService, Punch};
pub use stamp::{StampedImage, Stamper};
pub use store::{GalleryImage, ImageId, ImageStore, StoreOptions, StoreStats};
