//! File names inside the library.
//!
//! Names look like `2020-03-04_10-20-30-iphone-img_0001-beach-day.jpg`:
//! capture time, device tag, original name, title, extension. Running a file
//! that already has such a name through [`file_name`] again gives back the
//! same name.

use crate::consts::{DATE_PREFIX, FILE_NAME_DATE, NON_WORD};
use std::path::Path;
use strata_media::MediaMetadata;
use time::PrimitiveDateTime;

/// Lowercase `title`, collapse every run of non-word characters into a
/// single `-`, and trim `-` from both ends.
pub fn sanitize_title(title: &str) -> String {
    NON_WORD.replace_all(&title.to_lowercase(), "-").trim_matches('-').to_string()
}

/// Capture time a previous run wrote at the front of `base_name`, if any.
pub fn embedded_timestamp(base_name: &str) -> Option<PrimitiveDateTime> {
    let prefix = DATE_PREFIX.find(base_name)?;
    PrimitiveDateTime::parse(prefix.as_str().trim_end_matches('-'), FILE_NAME_DATE).ok()
}

/// Device tag written after the capture time.
fn device_tag(metadata: &MediaMetadata) -> Option<String> {
    [&metadata.origin, &metadata.camera_model]
        .into_iter()
        .filter_map(|tag| tag.as_deref().map(str::trim))
        .find(|tag| !tag.is_empty())
        .map(str::to_lowercase)
}

/// Name the file described by `metadata` gets in the library.
pub fn file_name(metadata: &MediaMetadata) -> String {
    let tag = device_tag(metadata);
    let original_name = metadata
        .original_name
        .as_deref()
        .map(|name| Path::new(name).file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default())
        .filter(|stem| !stem.is_empty());

    let mut base = match original_name {
        Some(stem) => stem.to_lowercase(),
        None => {
            let stripped = DATE_PREFIX.replace(&metadata.base_name, "");
            if stripped.is_empty() {
                metadata.base_name.to_lowercase()
            } else if stripped.len() < metadata.base_name.len() {
                // The name came from a previous run, which also put the tag there.
                let stripped = stripped.to_lowercase();
                tag.as_deref()
                    .and_then(|tag| stripped.strip_prefix(tag)?.strip_prefix('-'))
                    .filter(|rest| !rest.is_empty())
                    .map(str::to_string)
                    .unwrap_or(stripped)
            } else {
                stripped.to_lowercase()
            }
        },
    };

    if let Some(title) = metadata.title.as_deref().map(sanitize_title).filter(|t| !t.is_empty()) {
        base = base.replace(&format!("-{title}"), "");
        base = format!("{base}-{title}");
    }

    let date = metadata.date_taken.and_then(|date| date.format(FILE_NAME_DATE).ok());
    let name = [date, tag, Some(base)].into_iter().flatten().collect::<Vec<_>>().join("-");
    match metadata.extension.is_empty() {
        true => name.to_lowercase(),
        false => format!("{name}.{}", metadata.extension).to_lowercase(),
    }
}
