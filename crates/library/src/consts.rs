use regex::Regex;
use std::sync::LazyLock;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// One pattern segment: a `%` up to the next `/`.
regex!(PATTERN_TOKEN, r"%[^/]+");
/// Date prefix a previous run put in front of a file name.
regex!(DATE_PREFIX, r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}-");
regex!(NON_WORD, r"\W+");

/// How capture time is written at the front of file names.
pub(crate) const FILE_NAME_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");

/// Directory name used for media without a capture time.
pub(crate) const UNDATED: &str = "undated";
