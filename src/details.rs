//! Extraction of race details from a rendered detail page.
//!
//! The live session hands over the page's HTML once it has settled, so every
//! rule here can be exercised against saved pages.

use std::collections::BTreeSet;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

pub const TITLE: &str = ".event-header__name";
pub const DETAIL_ROWS: &str = ".tbody .table-row";
const ROW_CELLS: &str = ".g-row.container > div";
const DATE_NODES: &str = ".timezone-date";
const DATE_ATTR: &str = "data-date";

/// Accepted organizer email labels, most preferred first. Matched after
/// trimming and lowercasing the label cell.
pub const EMAIL_LABELS: [&str; 2] = ["entries email :", "general email :"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceDetails {
    /// `None` when the heading is absent, `Some` (possibly empty) otherwise.
    pub title: Option<String>,
    pub organizer_email: Option<String>,
    pub dates: BTreeSet<String>,
}

impl RaceDetails {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let details = Self {
            title: parse_title(&document),
            organizer_email: parse_organizer_email(&document),
            dates: parse_dates(&document),
        };
        debug!(?details, "parsed race details");
        details
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_title(document: &Html) -> Option<String> {
    let title = document.select(&selector(TITLE)).next().map(text_of);
    if title.is_none() {
        warn!("race title heading not found");
    }
    title
}

/// Label/value pairs of the detail table, labels normalized.
fn detail_pairs(document: &Html) -> Vec<(String, String)> {
    let cells = selector(ROW_CELLS);
    let link = selector("a");

    document
        .select(&selector(DETAIL_ROWS))
        .filter_map(|row| {
            let mut cols = row.select(&cells);
            let label = cols.next()?;
            let value = cols.next()?;
            let value = value.select(&link).next().map(text_of).unwrap_or_default();
            Some((text_of(label).to_lowercase(), value))
        })
        .collect()
}

fn parse_organizer_email(document: &Html) -> Option<String> {
    let pairs = detail_pairs(document);
    EMAIL_LABELS.iter().find_map(|wanted| {
        pairs
            .iter()
            .find(|(label, value)| label == wanted && !value.is_empty())
            .map(|(_, value)| deobfuscate_email(value))
    })
}

/// Rewrites every `[at]` marker back to `@`.
pub fn deobfuscate_email(value: &str) -> String {
    value.replace("[at]", "@")
}

fn parse_dates(document: &Html) -> BTreeSet<String> {
    document
        .select(&selector(DATE_NODES))
        .filter_map(|node| node.value().attr(DATE_ATTR))
        .map(|date| date.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn row(label: &str, value: &str) -> String {
        format!(
            r#"<div class="table-row"><div class="g-row container"><div>{}</div><div><a href="mailto:x">{}</a></div></div></div>"#,
            label, value
        )
    }

    fn page(rows: &[String], extra: &str) -> String {
        format!(
            r#"<html><body>{}<div class="tbody">{}</div></body></html>"#,
            extra,
            rows.join("")
        )
    }

    #[test]
    fn parse_fixture_should_work() {
        let content = fs::read_to_string("fixtures/race_detail.html").unwrap();
        let details = RaceDetails::parse(&content);

        assert_eq!(details.title.as_deref(), Some("Val d'Isère, FRA"));
        assert_eq!(details.organizer_email.as_deref(), Some("info@ski.org"));
        insta::assert_debug_snapshot!(details.dates, @r###"
        {
            "2025-01-10",
            "2025-01-11",
        }
        "###);
    }

    #[test]
    fn entries_email_should_win_over_general_email() {
        let html = page(
            &[
                row("General Email :", "office[at]club.fr"),
                row("  Entries Email :  ", "entries[at]club.fr"),
            ],
            "",
        );
        let details = RaceDetails::parse(&html);
        assert_eq!(details.organizer_email.as_deref(), Some("entries@club.fr"));
    }

    #[test]
    fn general_email_should_be_fallback() {
        let html = page(
            &[
                row("Entries Email :", ""),
                row("GENERAL EMAIL :", "office[at]club.fr"),
            ],
            "",
        );
        let details = RaceDetails::parse(&html);
        assert_eq!(details.organizer_email.as_deref(), Some("office@club.fr"));
    }

    #[test]
    fn unknown_labels_should_yield_no_email() {
        let html = page(&[row("Phone :", "+33 4 79 06 06 60")], "");
        assert_eq!(RaceDetails::parse(&html).organizer_email, None);
    }

    #[test]
    fn every_at_marker_should_be_rewritten() {
        assert_eq!(deobfuscate_email("a[at]b[at]c.org"), "a@b@c.org");
        assert_eq!(deobfuscate_email("plain@ski.org"), "plain@ski.org");
    }

    #[test]
    fn missing_title_should_differ_from_empty_title() {
        let rows = [row("Entries Email :", "a[at]b.org")];
        assert_eq!(RaceDetails::parse(&page(&rows, "")).title, None);

        let html = page(&rows, r#"<h1 class="event-header__name">  </h1>"#);
        assert_eq!(RaceDetails::parse(&html).title, Some(String::new()));
    }

    #[test]
    fn dates_should_be_deduplicated() {
        let html = page(
            &[],
            r#"<span class="timezone-date" data-date="2025-01-11"></span>
               <span class="timezone-date" data-date="2025-01-10"></span>
               <span class="timezone-date" data-date="2025-01-11"></span>
               <span class="timezone-date"></span>"#,
        );
        let dates = RaceDetails::parse(&html).dates;
        assert_eq!(dates.len(), 2);
        assert_eq!(
            dates.iter().map(String::as_str).collect::<Vec<_>>(),
            ["2025-01-10", "2025-01-11"]
        );
    }
}
