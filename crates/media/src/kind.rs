use derive_more::Display;
use std::path::Path;

/// The closed set of media this tool knows how to organize.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    #[display("photo")]
    Photo,
    #[display("video")]
    Video,
    #[display("audio")]
    Audio,
    #[display("text")]
    Text,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [Self::Photo, Self::Video, Self::Audio, Self::Text];

    /// Lowercase extensions (without the dot) handled as this kind.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Photo => &["arw", "cr2", "dng", "gif", "heic", "jpeg", "jpg", "nef", "png", "rw2", "tif", "tiff"],
            Self::Video => &["3gp", "avi", "m2ts", "m4v", "mov", "mp4", "mpeg", "mpg", "mts"],
            Self::Audio => &["m4a"],
            Self::Text => &["txt"],
        }
    }

    /// Classify by extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.extensions().contains(&extension.as_str()))
    }

    /// Classify a file by its extension. Files without one are unsupported.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref().extension().and_then(|ext| ext.to_str()).and_then(Self::from_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("IMG_0001.JPG", Some(MediaKind::Photo))]
    #[case("/media/in/raw.Cr2", Some(MediaKind::Photo))]
    #[case("clip.mov", Some(MediaKind::Video))]
    #[case("voice memo.m4a", Some(MediaKind::Audio))]
    #[case("notes.txt", Some(MediaKind::Text))]
    #[case("strata.json", None)]
    #[case("README", None)]
    #[case(".jpg", None)]
    fn test_from_path(#[case] path: &str, #[case] expected: Option<MediaKind>) {
        assert_eq!(MediaKind::from_path(path), expected);
    }

    #[test]
    fn test_extensions_are_unique_and_lowercase() {
        let all: Vec<_> = MediaKind::ALL.iter().flat_map(|kind| kind.extensions()).collect();
        for ext in &all {
            assert_eq!(ext.to_ascii_lowercase(), **ext);
            assert_eq!(all.iter().filter(|other| other == &ext).count(), 1, "{ext} listed twice");
        }
    }
}
