use derive_more::{Display, Error};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// How EXIF (and most other embedded metadata) spells a timestamp.
const EXIF_DATETIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]:[month]:[day] [hour]:[minute]:[second]");

// Tags are requested grouped (`-G`), so keys are `Group:Tag`. Candidates are
// tried in order and the first non-empty value wins.
const DATE_TAKEN: &[&str] = &[
    "EXIF:DateTimeOriginal",
    "EXIF:CreateDate",
    "XMP:DateTimeOriginal",
    "XMP:CreateDate",
    "QuickTime:CreationDate",
    "QuickTime:CreateDate",
    "H264:DateTimeOriginal",
];
const TITLE: &[&str] = &["XMP:Title", "IPTC:ObjectName", "QuickTime:Title"];
const ALBUM: &[&str] = &["XMP:Album"];
const ORIGIN: &[&str] = &["XMP:Origin"];
const ORIGINAL_NAME: &[&str] = &["XMP:OriginalFileName"];
const CAMERA_MAKE: &[&str] = &["EXIF:Make", "QuickTime:Make"];
const CAMERA_MODEL: &[&str] = &["EXIF:Model", "QuickTime:Model"];
const CITY: &[&str] = &["XMP:City", "IPTC:City"];
const STATE: &[&str] = &["XMP:State", "IPTC:Province-State"];
const COUNTRY: &[&str] = &["XMP:Country", "IPTC:Country-PrimaryLocationName"];

/// Metadata of a single media file, as far as organizing it is concerned.
///
/// A fresh extraction always produces a fresh value; nothing mutates one in
/// place after the fact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    /// Local capture time, as recorded by the device.
    pub date_taken: Option<PrimitiveDateTime>,
    /// File name the media currently has, without its extension.
    pub base_name: String,
    /// File name the media had before it was first imported, if recorded.
    pub original_name: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    /// Free-form tag naming where the media came from (e.g. a device).
    pub origin: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    /// Lowercase extension without the dot.
    pub extension: String,
}

impl MediaMetadata {
    /// Metadata knowing nothing but the file's name.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            base_name: path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
            extension: path.extension().map(|e| e.to_string_lossy().to_lowercase()).unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Build from one object of ExifTool's grouped JSON output
    /// (`exiftool -json -G`).
    pub fn from_exiftool(path: impl AsRef<Path>, tags: &Value) -> Self {
        let text = |candidates: &[&str]| first_text(tags, candidates);
        Self {
            date_taken: DATE_TAKEN.iter().filter_map(|tag| tags.get(tag)?.as_str()).find_map(parse_exif_datetime),
            original_name: text(ORIGINAL_NAME),
            title: text(TITLE),
            album: text(ALBUM),
            camera_make: text(CAMERA_MAKE),
            camera_model: text(CAMERA_MODEL),
            origin: text(ORIGIN),
            city: text(CITY),
            state: text(STATE),
            country: text(COUNTRY),
            ..Self::from_path(path)
        }
    }
}

fn first_text(tags: &Value, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|tag| {
        let value = match tags.get(tag)? {
            Value::String(s) => s.trim().to_string(),
            // e.g. a camera model that is all digits.
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    })
}

/// Parse `YYYY:MM:DD HH:MM:SS`, ignoring trailing sub-seconds or time zone.
/// Devices without a clock write zeroes, which is treated as no date.
pub fn parse_exif_datetime(value: &str) -> Option<PrimitiveDateTime> {
    let value = value.trim();
    PrimitiveDateTime::parse(value.get(..19)?, EXIF_DATETIME).ok()
}

/// Format a timestamp the way [`parse_exif_datetime`] reads it.
pub fn format_exif_datetime(value: PrimitiveDateTime) -> String {
    // Infallible for a well-formed description and a PrimitiveDateTime.
    value.format(EXIF_DATETIME).unwrap_or_default()
}

/// A position in decimal degrees.
#[derive(Debug, Display, Clone, Copy, PartialEq)]
#[display("{latitude},{longitude}")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("coordinates must be written as `latitude,longitude` in decimal degrees")]
pub struct InvalidCoordinates;

impl FromStr for Coordinates {
    type Err = InvalidCoordinates;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (latitude, longitude) = s.split_once(',').ok_or(InvalidCoordinates)?;
        let latitude: f64 = latitude.trim().parse().map_err(|_| InvalidCoordinates)?;
        let longitude: f64 = longitude.trim().parse().map_err(|_| InvalidCoordinates)?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidCoordinates);
        }
        Ok(Self { latitude, longitude })
    }
}
