//! Path validation.
//!
//! Destination paths are assembled from metadata values (albums, titles,
//! camera models) that anyone with a photo editor controls. Every relative
//! path a backend receives is checked here first.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Check a path meant to be relative to a backend root and return its lexical
/// normal form: `.` and repeated separators dropped, `..` applied.
///
/// Rejected with [`InvalidPath`](ErrorKind::InvalidPath): absolute paths,
/// Windows prefixes, NUL bytes, and paths that normalize to nothing.
/// Rejected with [`OutsideRoot`](ErrorKind::OutsideRoot): a `..` with nothing
/// left to climb out of.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use strata_storage::validate_path;
///
/// assert_eq!(
///     validate_path("2020/./Paris//../Lyon/img.jpg").unwrap(),
///     Path::new("2020/Lyon/img.jpg")
/// );
/// assert!(validate_path("/etc/passwd").is_err());
/// assert!(validate_path("2020/../../img.jpg").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());

    let mut normal = PathBuf::new();
    for component in original.components() {
        match component {
            Component::CurDir => {},
            Component::Normal(name) if name.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(name) => normal.push(name),
            Component::ParentDir if !normal.pop() => exn::bail!(ErrorKind::OutsideRoot(original.to_path_buf())),
            Component::ParentDir => {},
            Component::RootDir | Component::Prefix(_) => exn::bail!(invalid()),
        }
    }
    if normal.as_os_str().is_empty() {
        exn::bail!(invalid());
    }
    Ok(normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("2020-03-04/Unsorted/img.jpg", "2020-03-04/Unsorted/img.jpg")]
    #[case::single_file("img.jpg", "img.jpg")]
    #[case::doubled_separators("2020//Paris///img.jpg", "2020/Paris/img.jpg")]
    #[case::current_dir("./2020/./img.jpg", "2020/img.jpg")]
    #[case::parent_inside("2020/Paris/../Lyon", "2020/Lyon")]
    #[case::trailing_separator("undated/", "undated")]
    #[case::dotted_name("..hidden/img.jpg", "..hidden/img.jpg")]
    fn test_normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case::absolute("/etc/passwd")]
    #[case::root_only("/")]
    #[case::nul_byte("2020/img\0.jpg")]
    #[case::empty("")]
    #[case::dot_only("./.")]
    #[case::climbs_to_nothing("2020/..")]
    fn test_invalid(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(p) if p == Path::new(input)));
    }

    #[rstest]
    #[case::leading("../img.jpg")]
    #[case::after_descending("2020/../../img.jpg")]
    #[case::album_named_parent("2020/../../../etc")]
    fn test_outside_root(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::OutsideRoot(_)));
    }
}
