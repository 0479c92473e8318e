//! Folder path patterns.
//!
//! A pattern such as `%date/%album|%city|"Unknown Location"` describes the
//! directory a file is placed in. Every `%`-run up to the next `/` is one
//! directory level (a segment); within it `|` separates alternatives that
//! are tried in order:
//!
//! | Alternative                                                  | Accepted when                 |
//! |--------------------------------------------------------------|-------------------------------|
//! | `date`, `year`/`Y`, `month`/`m`, `day`/`d`                   | always (see below)            |
//! | `album`, `camera_make`, `camera_model`, `origin`, `city`, `state`, `country` | the field is non-empty |
//! | `"quoted text"`                                              | always                        |
//!
//! Field values are used as a single directory name: path separators inside
//! them become `-`, and a value with nothing left after that counts as empty.
//!
//! Temporal alternatives format the capture time (`date` as `YYYY-MM-DD`).
//! Media without a capture time goes into a single `undated` directory: the
//! first temporal segment becomes `undated`, later ones are dropped, so
//! `%year/%month` never produces `undated/undated`.
//!
//! Text between segments that does not start with `%` is ignored.
//!
//! # Example
//!
//! ```
//! use strata_library::PathPattern;
//! use strata_media::MediaMetadata;
//! use std::path::Path;
//!
//! let pattern = PathPattern::compile(r#"%date/%album|%city|"Unknown""#).unwrap();
//! let metadata = MediaMetadata { city: Some("Paris".into()), ..Default::default() };
//! assert_eq!(pattern.directory(&metadata), Path::new("undated/Paris"));
//! ```

use crate::consts::{PATTERN_TOKEN, UNDATED};
use crate::error::{ErrorKind, Result};
use derive_more::{Display, Error};
use exn::ResultExt;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use strata_media::MediaMetadata;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::instrument;

static COMPILED: LazyLock<Mutex<HashMap<String, Arc<PathPattern>>>> = LazyLock::new(Default::default);

/// Why a pattern was rejected. Raised as the child of [`ErrorKind::Pattern`].
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum InvalidPattern {
    #[display("pattern contains no %field token")]
    NoToken,
    #[display("empty alternative in segment `{_0}`")]
    EmptyAlternative(#[error(not(source))] String),
    #[display("unknown field `{_0}`")]
    UnknownField(#[error(not(source))] String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Temporal {
    Date,
    Year,
    Month,
    Day,
}
impl Temporal {
    fn mask(self) -> &'static [BorrowedFormatItem<'static>] {
        match self {
            Self::Date => format_description!("[year]-[month]-[day]"),
            Self::Year => format_description!("[year]"),
            Self::Month => format_description!("[month]"),
            Self::Day => format_description!("[day]"),
        }
    }

    fn format(self, date: PrimitiveDateTime) -> String {
        // Infallible: every mask only uses calendar components.
        date.format(self.mask()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Album,
    CameraMake,
    CameraModel,
    Origin,
    City,
    State,
    Country,
}
impl Field {
    fn value(self, metadata: &MediaMetadata) -> Option<String> {
        let value = match self {
            Self::Album => &metadata.album,
            Self::CameraMake => &metadata.camera_make,
            Self::CameraModel => &metadata.camera_model,
            Self::Origin => &metadata.origin,
            Self::City => &metadata.city,
            Self::State => &metadata.state,
            Self::Country => &metadata.country,
        };
        let name = value
            .as_deref()?
            .split(['/', '\\'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        (!name.is_empty()).then_some(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Alternative {
    Temporal(Temporal),
    Field(Field),
    Literal(String),
}
impl Alternative {
    fn parse(text: &str, segment: &str) -> std::result::Result<Self, exn::Exn<InvalidPattern>> {
        let text = text.trim();
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            let literal = text[1..text.len() - 1].trim();
            if literal.is_empty() {
                exn::bail!(InvalidPattern::EmptyAlternative(segment.to_string()));
            }
            return Ok(Self::Literal(literal.to_string()));
        }
        let alternative = match text.trim_start_matches('%') {
            "" => exn::bail!(InvalidPattern::EmptyAlternative(segment.to_string())),
            "date" => Self::Temporal(Temporal::Date),
            "year" | "Y" => Self::Temporal(Temporal::Year),
            "month" | "m" => Self::Temporal(Temporal::Month),
            "day" | "d" => Self::Temporal(Temporal::Day),
            "album" => Self::Field(Field::Album),
            "camera_make" => Self::Field(Field::CameraMake),
            "camera_model" => Self::Field(Field::CameraModel),
            "origin" => Self::Field(Field::Origin),
            "city" => Self::Field(Field::City),
            "state" => Self::Field(Field::State),
            "country" => Self::Field(Field::Country),
            unknown => exn::bail!(InvalidPattern::UnknownField(unknown.to_string())),
        };
        Ok(alternative)
    }
}

/// One directory level: alternatives in order of preference. Never empty.
type Segment = Vec<Alternative>;

/// A compiled folder path pattern. See the [module documentation](self).
#[derive(Debug, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile `pattern`, or return the already compiled copy.
    ///
    /// Compiled patterns are kept for the lifetime of the process, keyed by
    /// the pattern text.
    #[instrument(skip_all, fields(pattern = pattern))]
    pub fn compile(pattern: &str) -> Result<Arc<Self>> {
        let mut compiled = COMPILED.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = compiled.get(pattern) {
            return Ok(Arc::clone(existing));
        }
        let segments = Self::parse(pattern).or_raise(|| ErrorKind::Pattern)?;
        let pattern_ref = Arc::new(Self { source: pattern.to_string(), segments });
        compiled.insert(pattern.to_string(), Arc::clone(&pattern_ref));
        tracing::debug!(segments = pattern_ref.segments.len(), "Compiled folder path pattern");
        Ok(pattern_ref)
    }

    fn parse(pattern: &str) -> std::result::Result<Vec<Segment>, exn::Exn<InvalidPattern>> {
        let segments = PATTERN_TOKEN
            .find_iter(pattern)
            .map(|token| {
                let token = token.as_str();
                token[1..]
                    .split('|')
                    .map(|alternative| Alternative::parse(alternative, token))
                    .collect::<std::result::Result<Segment, _>>()
            })
            .collect::<std::result::Result<Vec<Segment>, _>>()?;
        if segments.is_empty() {
            exn::bail!(InvalidPattern::NoToken);
        }
        Ok(segments)
    }

    /// Directory components for `metadata`, in order.
    ///
    /// The first accepted alternative of a segment wins. A segment without
    /// an accepted alternative contributes no component.
    pub fn resolve(&self, metadata: &MediaMetadata) -> Vec<String> {
        let mut undated = false;
        let mut components = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            for alternative in segment {
                match alternative {
                    Alternative::Temporal(temporal) => {
                        match metadata.date_taken {
                            Some(date) => components.push(temporal.format(date)),
                            None if !undated => {
                                undated = true;
                                components.push(UNDATED.to_string());
                            },
                            None => {},
                        }
                        break;
                    },
                    Alternative::Field(field) => {
                        if let Some(value) = field.value(metadata) {
                            components.push(value);
                            break;
                        }
                    },
                    Alternative::Literal(literal) => {
                        components.push(literal.clone());
                        break;
                    },
                }
            }
        }
        components
    }

    /// [`resolve()`](Self::resolve) joined into a relative directory.
    pub fn directory(&self, metadata: &MediaMetadata) -> PathBuf {
        self.resolve(metadata).into_iter().collect()
    }

    /// Whether every segment always contributes a component, i.e. ends in a
    /// literal or temporal alternative. Patterns that are not total place
    /// files at different depths depending on their metadata.
    pub fn is_total(&self) -> bool {
        self.segments.iter().all(|segment| matches!(segment.last(), Some(Alternative::Temporal(_) | Alternative::Literal(_))))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
