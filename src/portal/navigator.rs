//! Week navigation strategies.
//!
//! Both strategies satisfy the same postcondition (the displayed week starts
//! at the cursor's Monday) and report a missing control as an outcome, not
//! an error, so the orchestrator decides the remedial action. The absolute
//! date-input control is unreliable on some portal variants, which is why the
//! relative Previous-button walk exists alongside it.

use super::PortalPage;
use crate::models::WeekCursor;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Moved,
    ControlMissing,
}

#[async_trait]
pub trait WeekNavigator: Send + Sync {
    /// Bring the view to the cursor's week from anywhere (initial jump,
    /// post-challenge re-anchor).
    async fn position(&self, page: &dyn PortalPage, cursor: WeekCursor) -> Result<NavOutcome>;

    /// One steady-state move to the cursor's week from the adjacent one.
    async fn step(&self, page: &dyn PortalPage, cursor: WeekCursor) -> Result<NavOutcome>;
}

// ── Absolute strategy ─────────────────────────────────────────────────────────

/// Drives the "Search by week" input with a formatted Monday-to-Monday range.
pub struct AbsoluteNavigator {
    activities_url: String,
}

impl AbsoluteNavigator {
    pub fn new(activities_url: impl Into<String>) -> Self {
        Self {
            activities_url: activities_url.into(),
        }
    }

    async fn jump(&self, page: &dyn PortalPage, cursor: WeekCursor) -> Result<NavOutcome> {
        page.navigate(&self.activities_url).await?;
        page.wait_settled().await?;

        let range = cursor.range_label();
        info!("navigating to week: {}", range);
        if !page.fill_week_input(&range).await? {
            return Ok(NavOutcome::ControlMissing);
        }
        page.wait_settled().await?;
        Ok(NavOutcome::Moved)
    }
}

#[async_trait]
impl WeekNavigator for AbsoluteNavigator {
    async fn position(&self, page: &dyn PortalPage, cursor: WeekCursor) -> Result<NavOutcome> {
        self.jump(page, cursor).await
    }

    async fn step(&self, page: &dyn PortalPage, cursor: WeekCursor) -> Result<NavOutcome> {
        self.jump(page, cursor).await
    }
}

// ── Relative strategy ─────────────────────────────────────────────────────────

/// Walks backward with the Previous-week control. Labels are tried in order;
/// the portal renders the button text inconsistently across variants.
const PREVIOUS_LABELS: [&str; 3] = ["Previous", "Prev", "previous"];

pub struct RelativeNavigator {
    activities_url: String,
}

impl RelativeNavigator {
    pub fn new(activities_url: impl Into<String>) -> Self {
        Self {
            activities_url: activities_url.into(),
        }
    }
}

#[async_trait]
impl WeekNavigator for RelativeNavigator {
    async fn position(&self, page: &dyn PortalPage, cursor: WeekCursor) -> Result<NavOutcome> {
        page.navigate(&self.activities_url).await?;
        page.wait_settled().await?;

        // The activities view opens on the current week. For any other start
        // the date input is still the only way to jump, so try it best-effort
        // before falling back on the view as-is.
        let range = cursor.range_label();
        info!("positioning at week: {}", range);
        if page.fill_week_input(&range).await? {
            page.wait_settled().await?;
        }
        Ok(NavOutcome::Moved)
    }

    async fn step(&self, page: &dyn PortalPage, cursor: WeekCursor) -> Result<NavOutcome> {
        debug!("stepping back to week: {}", cursor.range_label());
        for label in PREVIOUS_LABELS {
            if page.click_labeled(label).await? {
                page.wait_settled().await?;
                return Ok(NavOutcome::Moved);
            }
        }
        Ok(NavOutcome::ControlMissing)
    }
}
