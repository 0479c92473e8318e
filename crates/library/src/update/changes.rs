use crate::update::error::{ErrorKind, Result};
use exn::ResultExt;
use strata_media::{Coordinates, TagUpdate};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

const DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DATE_TIME: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Metadata to write into files. Fields left `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    pub album: Option<String>,
    pub location: Option<Coordinates>,
    pub time: Option<PrimitiveDateTime>,
    pub title: Option<String>,
}

impl Changes {
    /// Parse a capture time given as `YYYY-MM-DD HH:MM:SS`, or as `YYYY-MM-DD`
    /// meaning midnight.
    pub fn parse_time(value: &str) -> Result<PrimitiveDateTime> {
        let value = value.trim();
        if let Ok(time) = PrimitiveDateTime::parse(value, DATE_TIME) {
            return Ok(time);
        }
        Date::parse(value, DATE).map(Date::midnight).or_raise(|| ErrorKind::InvalidTime(value.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.tag_updates().is_empty()
    }

    pub fn tag_updates(&self) -> Vec<TagUpdate> {
        [
            self.album.clone().map(TagUpdate::Album),
            self.location.map(TagUpdate::Location),
            self.time.map(TagUpdate::DateTaken),
            self.title.clone().map(TagUpdate::Title),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    #[rstest]
    #[case("2021-06-01", Some(datetime!(2021-06-01 00:00:00)))]
    #[case("2021-06-01 12:34:56", Some(datetime!(2021-06-01 12:34:56)))]
    #[case(" 2021-06-01 ", Some(datetime!(2021-06-01 00:00:00)))]
    #[case("2021-06-01T12:34:56", None)]
    #[case("01/06/2021", None)]
    #[case("2021-02-30", None)]
    fn test_parse_time(#[case] value: &str, #[case] expected: Option<PrimitiveDateTime>) {
        assert_eq!(Changes::parse_time(value).ok(), expected);
    }

    #[test]
    fn test_tag_updates() {
        assert!(Changes::default().is_empty());
        let changes = Changes { title: Some("Beach".into()), album: Some("Summer".into()), ..Default::default() };
        assert_eq!(changes.tag_updates(), vec![TagUpdate::Album("Summer".into()), TagUpdate::Title("Beach".into())]);
    }
}
