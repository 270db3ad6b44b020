//! The driven-browser seam.
//!
//! Everything the core needs from the authenticated portal tab goes through
//! the narrow [`PortalPage`] trait: navigation, settle waits, text/HTML
//! snapshots, and a couple of interaction primitives. The orchestrator and
//! its tests never touch the WebDriver client directly.

pub mod challenge;
pub mod driver;
pub mod loader;
pub mod navigator;

use crate::config::PacingConfig;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Portal failures that drive control flow, as opposed to ordinary
/// `anyhow` context chains.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("expected control not found: {what}")]
    ControlMissing { what: String },

    #[error("browser session lost")]
    SessionLost,
}

/// Capability handle over one live page in the authenticated browser tab.
///
/// `click_labeled` and `fill_week_input` report absence as `Ok(false)`;
/// a missing control is an expected portal-variant outcome, not an error.
#[async_trait]
pub trait PortalPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until the page has no pending loads, within the wait budget.
    async fn wait_settled(&self) -> Result<()>;

    /// Full visible text of the page body.
    async fn body_text(&self) -> Result<String>;

    /// Serialized DOM of the current page.
    async fn page_html(&self) -> Result<String>;

    /// Click the first visible button whose text or aria-label contains
    /// `label`. `Ok(false)` when no such control shows up in the budget.
    async fn click_labeled(&self, label: &str) -> Result<bool>;

    /// Select-all + type into the week search input and commit (Tab).
    /// `Ok(false)` when the input is not present.
    async fn fill_week_input(&self, value: &str) -> Result<bool>;
}

// ── Pacing ────────────────────────────────────────────────────────────────────

/// Randomized delay between a bounded range of milliseconds. Keeps the
/// click cadence human-shaped; not load-bearing for correctness.
pub async fn jitter(min_ms: u64, max_ms: u64) {
    let ms = if max_ms > min_ms {
        rand::rng().random_range(min_ms..=max_ms)
    } else {
        min_ms
    };
    sleep(Duration::from_millis(ms)).await;
}

/// Configured inter-action delay.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    min_ms: u64,
    max_ms: u64,
}

impl Pacer {
    pub fn new(config: &PacingConfig) -> Self {
        Self {
            min_ms: config.delay_min_ms,
            max_ms: config.delay_max_ms.max(config.delay_min_ms),
        }
    }

    /// For tests: no delay at all.
    pub fn immediate() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    pub async fn pause(&self) {
        jitter(self.min_ms, self.max_ms).await;
    }

    /// Short pause for minor interactions (expander clicks, typing).
    pub async fn pause_brief(&self) {
        jitter(self.min_ms / 2, (self.max_ms / 2).max(self.min_ms / 2)).await;
    }
}
