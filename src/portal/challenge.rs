//! Interstitial verification-screen handling.
//!
//! A challenge can appear at any navigation, not just login, so the
//! orchestrator probes before every consequential step. Clearing one is a
//! suspend/resume contract: this module only detects and blocks on the
//! operator; the caller re-runs its most recent step after resume.

use super::PortalPage;
use crate::console::Operator;
use anyhow::Result;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Clear,
    Challenged,
}

/// Text-level detection. The portal's verification interstitials all carry
/// one of these two phrases.
pub fn scan(body_text: &str) -> ChallengeState {
    let lower = body_text.to_lowercase();
    if lower.contains("security check") || lower.contains("one more step") {
        ChallengeState::Challenged
    } else {
        ChallengeState::Clear
    }
}

/// Probe the page and, if challenged, block on operator acknowledgment until
/// the screen is gone. Returns `true` when a challenge was cleared, so the
/// caller knows to re-run its interrupted step.
pub async fn ensure_clear(page: &dyn PortalPage, operator: &dyn Operator) -> Result<bool> {
    let mut interrupted = false;
    loop {
        let text = page.body_text().await.unwrap_or_default();
        if scan(&text) == ChallengeState::Clear {
            return Ok(interrupted);
        }
        warn!("security challenge detected; waiting for operator");
        operator.ack_challenge()?;
        interrupted = true;
        super::jitter(2000, 4000).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_challenge_phrases() {
        assert_eq!(scan("Please complete this Security Check"), ChallengeState::Challenged);
        assert_eq!(scan("ONE MORE STEP to continue"), ChallengeState::Challenged);
        assert_eq!(scan("Your weekly earnings"), ChallengeState::Clear);
        assert_eq!(scan(""), ChallengeState::Clear);
    }
}
