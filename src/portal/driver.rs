//! fantoccini-backed [`PortalPage`] implementation.
//!
//! Connects to an already-running WebDriver (chromedriver/geckodriver) whose
//! browser the operator logs into by hand; session and credential handling
//! stay outside this crate.

use super::{PortalError, PortalPage, jitter};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator, key::Key};
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::debug;

const SETTLE_POLL_MS: u64 = 250;

pub struct DriverPage {
    client: Client,
    wait_budget: Duration,
}

impl DriverPage {
    pub async fn connect(webdriver_url: &str, wait_budget: Duration) -> Result<Self> {
        let client = ClientBuilder::native()
            .connect(webdriver_url)
            .await
            .with_context(|| format!("Failed to connect to WebDriver at {webdriver_url}"))?;
        Ok(Self { client, wait_budget })
    }

    pub async fn close(self) -> Result<()> {
        self.client.close().await.context("close WebDriver session")?;
        Ok(())
    }

    fn labeled_button_xpath(label: &str) -> String {
        format!(
            "//button[contains(normalize-space(.), '{label}') or contains(@aria-label, '{label}')]"
        )
    }
}

/// Only errors that mean the browser session itself is gone. Anything else
/// (a slow page, an interception, a script hiccup) stays an ordinary error
/// so callers can contain it per trip.
fn session_gone(e: &CmdError) -> bool {
    matches!(e, CmdError::Lost(_))
        || e.is_invalid_session_id()
        || e.is_no_such_window()
        || e.is_session_not_created()
}

#[async_trait]
impl PortalPage for DriverPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("goto {}", url);
        let c = self.client.clone();
        c.goto(url).await.map_err(|e| {
            if session_gone(&e) {
                anyhow::Error::new(PortalError::SessionLost).context(format!("goto {url}: {e}"))
            } else {
                anyhow::Error::new(e).context(format!("goto {url}"))
            }
        })?;
        Ok(())
    }

    async fn wait_settled(&self) -> Result<()> {
        let attempts = (self.wait_budget.as_millis() as u64 / SETTLE_POLL_MS).max(1) as usize;
        let strategy = FixedInterval::from_millis(SETTLE_POLL_MS).take(attempts);

        Retry::start(strategy, || {
            let c = self.client.clone();
            async move {
                match c.execute("return document.readyState", vec![]).await {
                    Ok(state) if state.as_str() == Some("complete") => Ok(()),
                    Ok(state) => Err(anyhow!("readyState {}", state)),
                    Err(e) => Err(anyhow!("readyState probe: {}", e)),
                }
            }
        })
        .await
        .context("page never settled within wait budget")?;

        // The SPA keeps painting briefly after readyState flips.
        jitter(300, 800).await;
        Ok(())
    }

    async fn body_text(&self) -> Result<String> {
        let c = self.client.clone();
        let body = c.find(Locator::Css("body")).await.context("find body")?;
        Ok(body.text().await.context("read body text")?)
    }

    async fn page_html(&self) -> Result<String> {
        let c = self.client.clone();
        Ok(c.source().await.context("read page source")?)
    }

    async fn click_labeled(&self, label: &str) -> Result<bool> {
        let xpath = Self::labeled_button_xpath(label);
        let c = self.client.clone();

        let found = c
            .wait()
            .at_most(self.wait_budget)
            .for_element(Locator::XPath(&xpath))
            .await;

        let element = match found {
            Ok(el) => el,
            // Absence within the budget is an expected outcome here.
            Err(_) => return Ok(false),
        };

        if !element.is_displayed().await.unwrap_or(false) {
            return Ok(false);
        }

        element
            .click()
            .await
            .with_context(|| format!("click '{label}' button"))?;
        Ok(true)
    }

    async fn fill_week_input(&self, value: &str) -> Result<bool> {
        let c = self.client.clone();

        let input = match c
            .wait()
            .at_most(self.wait_budget)
            .for_element(Locator::Css("input"))
            .await
        {
            Ok(el) => el,
            Err(_) => return Ok(false),
        };

        input.click().await.context("focus week input")?;
        jitter(200, 400).await;
        // Some portal variants reject clear() on this control; typing over a
        // focused selection still works, so a failure here is not fatal.
        let _ = input.clear().await;
        input.send_keys(value).await.context("type week range")?;
        jitter(200, 400).await;
        input
            .send_keys(&char::from(Key::Tab).to_string())
            .await
            .context("commit week range")?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    // Callers hold a `&dyn PortalPage`; keep the impl coercible.
    #[allow(dead_code)]
    fn as_portal_page(page: &DriverPage) -> &dyn PortalPage {
        page
    }

    #[test]
    fn lost_connection_is_session_gone() {
        let e = CmdError::Lost(io::Error::new(io::ErrorKind::ConnectionReset, "gone"));
        assert!(session_gone(&e));
    }

    #[test]
    fn transient_failures_are_not_session_gone() {
        assert!(!session_gone(&CmdError::WaitTimeout));
        assert!(!session_gone(&CmdError::NotJson("partial".to_string())));
    }

    #[test]
    fn xpath_matches_text_or_aria_label() {
        let xpath = DriverPage::labeled_button_xpath("Load more");
        assert!(xpath.contains("normalize-space(.), 'Load more'"));
        assert!(xpath.contains("@aria-label, 'Load more'"));
    }
}
