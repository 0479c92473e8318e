//! What a media file is, and what it says about itself.
//!
//! - [`MediaKind`]: the closed set of supported media, decided by extension.
//! - [`MediaMetadata`]: the fields used to organize a file (capture time,
//!   device, album, title, place).
//! - [`MetadataSource`]: batch extraction of that metadata, implemented by a
//!   long-lived [`ExifTool`] process.

pub mod error;
mod exiftool;
mod kind;
mod metadata;
#[cfg(feature = "mock")]
mod mock;
mod source;

pub use crate::exiftool::{ExifTool, ExifToolOptions};
pub use crate::kind::MediaKind;
pub use crate::metadata::{Coordinates, InvalidCoordinates, MediaMetadata, format_exif_datetime, parse_exif_datetime};
#[cfg(feature = "mock")]
pub use crate::mock::StaticSource;
pub use crate::source::{MetadataBatch, MetadataSource, TagUpdate};
