use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use derive_builder::Builder;
use tracing::{debug, info, warn};

use crate::browser::{self, Browser, Wait};
use crate::details::{RaceDetails, DETAIL_ROWS};
use crate::error::RaceError;
use crate::period::{self, Period};

pub const CALENDAR_URL: &str =
    "https://www.fis-ski.com/DB/alpine-skiing/calendar-results.html?noselection=true&mi=menu-calendar";

const CONSENT_PHRASE: &str = "Allow all";
const SEARCH_INPUT: &str = "#racecodex";
const RESULT_ROWS: &str = ".container .g-row";
const RESULT_LINK: &str = ".g-row > a:first-child";

/// Lookup configuration. Every field has a default, so
/// `FisScraperBuilder::default().build()` is a ready-to-use scraper.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct FisScraper {
    #[builder(default = "CALENDAR_URL.to_string()")]
    calendar_url: String,
    #[builder(default = "desktop_viewport()")]
    viewport: Viewport,
    #[builder(default = "Duration::from_secs(15)")]
    timeout: Duration,
    #[builder(default = "Duration::from_millis(250)")]
    poll_interval: Duration,
    #[builder(default = "true")]
    headless: bool,
    #[builder(default)]
    chrome_executable: Option<PathBuf>,
}

/// Everything learned about one race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceInfo {
    pub title: Option<String>,
    pub organizer_email: String,
    /// Day of the lookup, e.g. `19 octobre 2026`.
    pub date: String,
    pub dates: BTreeSet<String>,
    pub url: String,
}

fn desktop_viewport() -> Viewport {
    Viewport {
        width: 1532,
        height: 1080,
        device_scale_factor: Some(1.0),
        emulating_mobile: false,
        is_landscape: true,
        has_touch: false,
    }
}

impl FisScraper {
    /// Runs the whole lookup for `codex`. The browser is closed whatever the
    /// outcome.
    pub async fn scrape(&self, codex: &str) -> Result<RaceInfo> {
        let browser = Browser::launch(
            &self.viewport,
            self.headless,
            self.chrome_executable.as_deref(),
        )
        .await?;

        let result = self.lookup(&browser, codex).await;
        browser.close().await;
        result
    }

    fn wait(&self) -> Wait {
        Wait {
            timeout: self.timeout,
            poll_interval: self.poll_interval,
        }
    }

    async fn lookup(&self, browser: &Browser, codex: &str) -> Result<RaceInfo> {
        let page = browser.open(&self.calendar_url).await?;

        match browser::click_button_with_text(&page, CONSENT_PHRASE).await? {
            Some(text) => {
                info!(button = %text, "cookie consent dismissed");
                browser::wait_for_button_gone(&page, CONSENT_PHRASE, self.wait()).await?;
            }
            None => debug!("no cookie consent dialog"),
        }

        let before = browser::listing(&page, RESULT_ROWS).await?;
        self.search(&page, codex).await?;

        let count = browser::settled_count(&page, RESULT_ROWS, before, self.wait()).await?;
        info!(codex, count, "search results");
        ensure_single_result(codex, count)?;

        let calendar = page.url().await?.unwrap_or_default();
        page.find_element(RESULT_LINK)
            .await
            .map_err(|_| missing(RESULT_LINK))?
            .click()
            .await
            .context("Failed to follow race link")?;

        let url = browser::wait_for_navigation(&page, &calendar, self.wait()).await?;
        // No detail table means no email; extraction reports it as such.
        let rows = browser::wait_for(&page, DETAIL_ROWS, self.wait()).await;
        if !browser::timeout_as_absent(rows)? {
            warn!(url = %url, "race page has no detail rows");
        }
        info!(url = %url, "race page loaded");

        let html = page.content().await.context("Failed to read race page")?;
        let today = chrono::Local::now().date_naive();
        RaceInfo::from_details(
            codex,
            RaceDetails::parse(&html),
            period::format_long_fr(today),
            url,
        )
    }

    async fn search(&self, page: &Page, codex: &str) -> Result<()> {
        browser::wait_for(page, SEARCH_INPUT, self.wait()).await?;

        let input = page
            .find_element(SEARCH_INPUT)
            .await
            .map_err(|_| missing(SEARCH_INPUT))?;
        input.focus().await?;
        input.type_str(codex).await?;
        input.press_key("Enter").await?;

        debug!(codex, "search submitted");
        Ok(())
    }
}

fn missing(selector: &str) -> RaceError {
    RaceError::MissingElement {
        selector: selector.to_string(),
    }
}

/// Exactly one search result is required to continue.
pub fn ensure_single_result(codex: &str, count: usize) -> Result<(), RaceError> {
    match count {
        0 => Err(RaceError::NotFound {
            codex: codex.to_string(),
        }),
        1 => Ok(()),
        count => Err(RaceError::Ambiguous {
            codex: codex.to_string(),
            count,
        }),
    }
}

impl RaceInfo {
    pub fn from_details(
        codex: &str,
        details: RaceDetails,
        date: String,
        url: String,
    ) -> Result<Self> {
        let organizer_email = details
            .organizer_email
            .ok_or_else(|| RaceError::EmailNotFound {
                codex: codex.to_string(),
            })?;

        Ok(Self {
            title: details.title,
            organizer_email,
            date,
            dates: details.dates,
            url,
        })
    }

    pub fn period(&self) -> Option<Period> {
        Period::from_dates(&self.dates)
    }
}
