use anyhow::Result;
use askama::Template;
use tracing::debug;

use crate::fis::RaceInfo;
use crate::period::{period_line, Style};

#[derive(Debug, Template)]
#[template(path = "race.txt", escape = "none")]
pub struct RaceSummary<'a> {
    pub codex: &'a str,
    pub title: &'a str,
    pub organizer_email: &'a str,
    pub dates: Vec<&'a str>,
    pub period: String,
    pub period_link: String,
    pub url: &'a str,
}

impl<'a> RaceSummary<'a> {
    pub fn new(codex: &'a str, info: &'a RaceInfo) -> Self {
        let title = info.title.as_deref().unwrap_or_default();
        let period = info.period();
        if let Some(period) = &period {
            debug!(kind = %period.kind(), label = %period.label(), "race period");
        }

        Self {
            codex,
            title,
            organizer_email: &info.organizer_email,
            dates: info.dates.iter().map(String::as_str).collect(),
            period: period_line(period.as_ref(), title, Style::Colored),
            period_link: copy_link(&period_line(period.as_ref(), title, Style::Plain)),
            url: &info.url,
        }
    }
}

/// Wraps `text` in an OSC 8 hyperlink so terminals offer to copy it.
pub fn copy_link(text: &str) -> String {
    format!("\x1b]8;;copy:{text}\x1b\\{text}\x1b]8;;\x1b\\")
}

pub fn print(codex: &str, info: &RaceInfo) -> Result<()> {
    println!("{}", RaceSummary::new(codex, info).render()?);
    Ok(())
}
