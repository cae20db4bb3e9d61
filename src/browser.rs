//! Headless browser session using chromiumoxide.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser as ChromeBrowser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::RaceError;

/// Browser wrapper owning the Chrome process and its event loop.
///
/// Call [`Browser::close`] on every exit path.
pub struct Browser {
    browser: ChromeBrowser,
    handle: tokio::task::JoinHandle<()>,
}

impl Browser {
    pub async fn launch(
        viewport: &Viewport,
        headless: bool,
        chrome_executable: Option<&Path>,
    ) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(viewport.width, viewport.height)
            .viewport(viewport.clone());
        if !headless {
            builder = builder.with_head();
        }
        if let Some(path) = chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = ChromeBrowser::launch(config)
            .await
            .context("Failed to launch browser")?;

        // The handler must be polled for the browser to make progress.
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler error: {}", e);
                }
            }
        });

        debug!(headless, "browser launched");
        Ok(Self { browser, handle })
    }

    pub async fn open(&self, url: &str) -> Result<Page> {
        debug!(url, "opening page");
        self.browser
            .new_page(url)
            .await
            .with_context(|| format!("Failed to open {}", url))
    }

    /// Shuts Chrome down. Failures are logged, never returned, so the
    /// outcome of the lookup is what reaches the caller.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("failed to reap browser process: {}", e);
        }
        self.handle.abort();
        debug!("browser closed");
    }
}

/// Bounds and cadence for condition-based waits.
#[derive(Debug, Clone, Copy)]
pub struct Wait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// Number of elements currently matching `selector`.
pub async fn count(page: &Page, selector: &str) -> Result<usize> {
    let js = format!(
        "document.querySelectorAll({}).length",
        serde_json::to_string(selector)?
    );
    let value = page
        .evaluate(js)
        .await
        .with_context(|| format!("Failed to count {}", selector))?;
    Ok(value.into_value::<usize>()?)
}

/// Polls until `selector` matches at least once, failing with `Timeout`.
pub async fn wait_for(page: &Page, selector: &str, wait: Wait) -> Result<()> {
    let deadline = Instant::now() + wait.timeout;
    loop {
        if count(page, selector).await? > 0 {
            debug!(selector, "element present");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(RaceError::Timeout {
                what: selector.to_string(),
                after: wait.timeout,
            }
            .into());
        }
        sleep(wait.poll_interval).await;
    }
}

/// Polls until the page URL differs from `from`, failing with `Timeout`.
pub async fn wait_for_navigation(page: &Page, from: &str, wait: Wait) -> Result<String> {
    let deadline = Instant::now() + wait.timeout;
    loop {
        if let Some(url) = page.url().await? {
            if url != from {
                debug!(url = %url, "navigated");
                return Ok(url);
            }
        }
        if Instant::now() >= deadline {
            return Err(RaceError::Timeout {
                what: format!("navigation away from {}", from),
                after: wait.timeout,
            }
            .into());
        }
        sleep(wait.poll_interval).await;
    }
}

/// What the result listing looked like at one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub count: usize,
    pub url: Option<String>,
    /// Text of the matching rows, joined.
    pub text: String,
}

pub async fn listing(page: &Page, selector: &str) -> Result<Listing> {
    #[derive(Deserialize)]
    struct Rows {
        count: usize,
        text: String,
    }

    let js = format!(
        r#"(() => {{
            const rows = Array.from(document.querySelectorAll({}));
            return {{ count: rows.length, text: rows.map(r => r.textContent || '').join('\n') }};
        }})()"#,
        serde_json::to_string(selector)?
    );
    let rows = page
        .evaluate(js)
        .await
        .with_context(|| format!("Failed to read {}", selector))?
        .into_value::<Rows>()?;

    Ok(Listing {
        count: rows.count,
        url: page.url().await?,
        text: rows.text,
    })
}

/// Tracks successive listings after a search was submitted.
///
/// A listing only counts once it differs from the one seen before the
/// submit; it has settled when a non-zero count then repeats.
#[derive(Debug)]
pub struct Settle {
    before: Listing,
    changed: bool,
    last: Option<usize>,
}

impl Settle {
    pub fn new(before: Listing) -> Self {
        Self {
            before,
            changed: false,
            last: None,
        }
    }

    /// Records `listing` and reports whether the count has settled.
    pub fn observe(&mut self, listing: &Listing) -> bool {
        if !self.changed && *listing != self.before {
            self.changed = true;
            self.last = None;
        }
        let settled = self.changed && listing.count > 0 && self.last == Some(listing.count);
        self.last = Some(listing.count);
        settled
    }

    pub fn last(&self) -> usize {
        self.last.unwrap_or(0)
    }
}

/// Polls the listing of `selector` until it moved away from `before` and its
/// count settled. On timeout the last observed count is returned, so an
/// empty listing yields zero.
pub async fn settled_count(
    page: &Page,
    selector: &str,
    before: Listing,
    wait: Wait,
) -> Result<usize> {
    let deadline = Instant::now() + wait.timeout;
    let mut settle = Settle::new(before);
    loop {
        let current = listing(page, selector).await?;
        if settle.observe(&current) {
            return Ok(current.count);
        }
        if Instant::now() >= deadline {
            debug!(selector, count = current.count, "count did not settle before timeout");
            return Ok(settle.last());
        }
        sleep(wait.poll_interval).await;
    }
}

/// Polls until no visible button contains `phrase`, failing with `Timeout`.
pub async fn wait_for_button_gone(page: &Page, phrase: &str, wait: Wait) -> Result<()> {
    let js = visible_button_script(phrase)?;
    let deadline = Instant::now() + wait.timeout;
    loop {
        let visible = page
            .evaluate(js.clone())
            .await
            .context("Failed to look for consent button")?
            .into_value::<bool>()?;
        if !visible {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(RaceError::Timeout {
                what: format!("fermeture du bouton \"{}\"", phrase),
                after: wait.timeout,
            }
            .into());
        }
        sleep(wait.poll_interval).await;
    }
}

/// Script answering whether a rendered button still contains `phrase`.
fn visible_button_script(phrase: &str) -> Result<String> {
    Ok(format!(
        r#"(() => {{
            const phrase = {};
            return Array.from(document.querySelectorAll('button'))
                .some(b => (b.textContent || '').includes(phrase) && b.offsetParent !== null);
        }})()"#,
        serde_json::to_string(phrase)?
    ))
}

/// Turns a `Timeout` into `Ok(false)`; other failures pass through.
pub fn timeout_as_absent(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if matches!(e.downcast_ref::<RaceError>(), Some(RaceError::Timeout { .. })) => {
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Clicks the first button whose text contains `phrase`.
///
/// Returns the clicked button's text, or `None` when no such button exists.
pub async fn click_button_with_text(page: &Page, phrase: &str) -> Result<Option<String>> {
    #[derive(Deserialize)]
    struct Clicked {
        text: Option<String>,
    }

    let js = format!(
        r#"(() => {{
            const phrase = {};
            const button = Array.from(document.querySelectorAll('button'))
                .find(b => (b.textContent || '').includes(phrase));
            if (!button) return {{ text: null }};
            button.click();
            return {{ text: button.textContent.trim() }};
        }})()"#,
        serde_json::to_string(phrase)?
    );
    let value = page
        .evaluate(js)
        .await
        .context("Failed to look for consent button")?;
    Ok(value.into_value::<Clicked>()?.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(count: usize, text: &str) -> Listing {
        Listing {
            count,
            url: Some(CALENDAR.to_string()),
            text: text.to_string(),
        }
    }

    const CALENDAR: &str = "https://www.fis-ski.com/DB/alpine-skiing/calendar-results.html";

    #[test]
    fn settle_should_need_repeated_non_zero_count() {
        let mut settle = Settle::new(Listing::default());
        assert!(!settle.observe(&rows(0, "")));
        assert!(!settle.observe(&rows(1, "a")));
        assert!(!settle.observe(&rows(3, "abc")));
        assert!(settle.observe(&rows(3, "abc")));
        assert_eq!(settle.last(), 3);
    }

    #[test]
    fn settle_should_ignore_listing_from_before_submit() {
        let before = rows(25, "calendar");
        let mut settle = Settle::new(before.clone());
        assert!(!settle.observe(&before));
        assert!(!settle.observe(&before));
        assert!(!settle.observe(&before));
        assert_eq!(settle.last(), 25);

        assert!(!settle.observe(&rows(1, "1234 Val d'Isère")));
        assert!(settle.observe(&rows(1, "1234 Val d'Isère")));
        assert_eq!(settle.last(), 1);
    }

    #[test]
    fn settle_should_accept_same_count_after_url_change() {
        let before = rows(1, "calendar");
        let mut settle = Settle::new(before.clone());
        let after = Listing {
            url: Some(format!("{}?racecodex=1234", CALENDAR)),
            ..before
        };
        assert!(!settle.observe(&after));
        assert!(settle.observe(&after));
    }

    #[test]
    fn settle_should_report_zero_without_observations() {
        assert_eq!(Settle::new(Listing::default()).last(), 0);
    }

    #[test]
    fn visible_button_script_should_quote_phrase_and_check_rendering() {
        let js = visible_button_script(r#"Allow "all""#).unwrap();
        assert!(js.contains(r#"const phrase = "Allow \"all\"";"#));
        assert!(js.contains("b.offsetParent !== null"));
    }

    #[test]
    fn timeout_as_absent_should_only_swallow_timeouts() {
        assert!(timeout_as_absent(Ok(())).unwrap());

        let timeout = RaceError::Timeout {
            what: ".tbody .table-row".into(),
            after: Duration::from_secs(1),
        };
        assert!(!timeout_as_absent(Err(timeout.into())).unwrap());

        let other = anyhow::anyhow!("connection reset");
        assert!(timeout_as_absent(Err(other)).is_err());
    }
}
