//! Operator console surface: the three human-in-the-loop prompts
//! (challenge clearance, per-week retry/skip/stop, starting date).
//!
//! Behind a trait so the orchestrator's suspend/resume states can be unit
//! tested without a terminal.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use std::io::{self, Write};

use crate::models::parse_start_date;

/// What the operator chose after a week-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekDecision {
    Retry,
    Skip,
    Stop,
}

pub trait Operator: Send + Sync {
    /// Block until the human confirms the verification screen is cleared.
    /// No timeout; a real check can take arbitrarily long.
    fn ack_challenge(&self) -> Result<()>;

    /// Block for a retry/skip/stop decision after a week-level failure.
    fn week_decision(&self, week_label: &str, error: &str) -> Result<WeekDecision>;

    /// Optional starting date. `None` means "today".
    fn start_date(&self) -> Result<Option<NaiveDate>>;

    /// One-time "log in, then continue" gate at startup.
    fn confirm_ready(&self) -> Result<()>;
}

/// Map a raw console answer to a decision. Empty input retries, the common
/// case after manually nudging the browser back into shape.
pub fn parse_decision(input: &str) -> WeekDecision {
    match input.trim().to_lowercase().as_str() {
        "stop" => WeekDecision::Stop,
        "skip" => WeekDecision::Skip,
        _ => WeekDecision::Retry,
    }
}

// ── Stdin implementation ──────────────────────────────────────────────────────

pub struct StdinOperator;

impl StdinOperator {
    fn read_line(prompt: &str) -> Result<String> {
        print!("{prompt}");
        io::stdout().flush().context("flush stdout")?;
        let mut line = String::new();
        io::stdin().read_line(&mut line).context("read stdin")?;
        Ok(line.trim().to_string())
    }
}

impl Operator for StdinOperator {
    fn ack_challenge(&self) -> Result<()> {
        println!();
        println!("  SECURITY CHECK DETECTED!");
        Self::read_line("  Complete the check in the browser, then press Enter... ")?;
        Ok(())
    }

    fn week_decision(&self, week_label: &str, error: &str) -> Result<WeekDecision> {
        println!("Week {week_label} failed: {error}");
        let answer = Self::read_line("Enter to retry, 'skip', or 'stop': ")?;
        Ok(parse_decision(&answer))
    }

    fn start_date(&self) -> Result<Option<NaiveDate>> {
        let input = Self::read_line("Enter start date (e.g. Jul 1, 2024) or Enter for today: ")?;
        if input.is_empty() {
            return Ok(None);
        }
        let parsed = parse_start_date(&input, Local::now().year());
        if parsed.is_none() {
            println!("Could not parse '{input}', using today.");
        }
        Ok(parsed)
    }

    fn confirm_ready(&self) -> Result<()> {
        println!();
        println!("{}", "=".repeat(50));
        println!("Log in and complete any security checks.");
        println!("{}", "=".repeat(50));
        Self::read_line("Press Enter when ready... ")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_parsing() {
        assert_eq!(parse_decision(""), WeekDecision::Retry);
        assert_eq!(parse_decision("  "), WeekDecision::Retry);
        assert_eq!(parse_decision("skip"), WeekDecision::Skip);
        assert_eq!(parse_decision("SKIP"), WeekDecision::Skip);
        assert_eq!(parse_decision("stop"), WeekDecision::Stop);
        assert_eq!(parse_decision("anything else"), WeekDecision::Retry);
    }
}
