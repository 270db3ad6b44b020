//! Scrape orchestrator: the week-by-week state machine tying navigation,
//! loading, extraction, and persistence together.
//!
//! ## Phases
//!
//! `Positioning → LoadingWeek → Extracting → Persisting → Advancing → …`,
//! terminals `Done` / `Aborted`. One browser tab, one cooperative control
//! flow, no fan-out across trips or weeks.
//!
//! ## Policies
//!
//! * three consecutive zero-trip weeks stop the run;
//! * forward walks stop once the cursor passes today; backward walks also
//!   stop when the Previous control disappears;
//! * a failed trip is logged and left unmarked (retryable on a later run),
//!   its siblings still run;
//! * a failed week escalates to the operator: retry, skip, or stop;
//! * a challenge probe runs before positioning, loading, every trip open,
//!   and every advance; after clearance the interrupted step re-runs.

use crate::config::Direction;
use crate::console::{Operator, WeekDecision};
use crate::extract::extract_trip;
use crate::ledger::{CsvLedger, SeenTrips};
use crate::models::{TripRecord, WeekCursor, trip_id_from_url};
use crate::portal::navigator::{NavOutcome, WeekNavigator};
use crate::portal::{Pacer, PortalError, PortalPage, challenge, loader};
use anyhow::Result;
use chrono::NaiveDate;
use tracing::{info, warn};

const EMPTY_STREAK_LIMIT: u32 = 3;

#[derive(Debug)]
enum Phase {
    Positioning,
    LoadingWeek,
    Extracting(Vec<String>),
    Persisting(Vec<TripRecord>),
    Advancing,
    Done,
    Aborted,
}

/// Scrape progress, owned by the orchestrator and returned explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub weeks_visited: usize,
    pub trips_scraped: usize,
    pub trips_skipped: usize,
    pub trip_errors: usize,
    pub aborted: bool,
}

pub struct Orchestrator<'a> {
    page: &'a dyn PortalPage,
    navigator: &'a dyn WeekNavigator,
    operator: &'a dyn Operator,
    ledger: CsvLedger,
    seen: SeenTrips,
    pacer: Pacer,
    direction: Direction,
    base_url: String,
}

impl<'a> Orchestrator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        page: &'a dyn PortalPage,
        navigator: &'a dyn WeekNavigator,
        operator: &'a dyn Operator,
        ledger: CsvLedger,
        seen: SeenTrips,
        pacer: Pacer,
        direction: Direction,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            page,
            navigator,
            operator,
            ledger,
            seen,
            pacer,
            direction,
            base_url: base_url.into(),
        }
    }

    /// Walk weeks starting at `start` until a termination policy fires.
    /// `today` bounds the forward walk.
    pub async fn run(&mut self, start: WeekCursor, today: NaiveDate) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let mut cursor = start;
        let mut empty_streak = 0u32;
        let mut phase = Phase::Positioning;

        loop {
            phase = match phase {
                Phase::Positioning => match self.navigator.position(self.page, cursor).await {
                    Ok(NavOutcome::Moved) => Phase::LoadingWeek,
                    Ok(NavOutcome::ControlMissing) => {
                        match self.escalate(cursor, "week navigation controls not found")? {
                            WeekDecision::Retry => Phase::Positioning,
                            // Proceed with whatever week the portal shows.
                            WeekDecision::Skip => Phase::LoadingWeek,
                            WeekDecision::Stop => Phase::Aborted,
                        }
                    }
                    Err(e) if is_session_lost(&e) => return Err(e),
                    Err(e) => match self.escalate(cursor, &format!("{e:#}"))? {
                        WeekDecision::Retry => Phase::Positioning,
                        WeekDecision::Skip => Phase::Advancing,
                        WeekDecision::Stop => Phase::Aborted,
                    },
                },

                Phase::LoadingWeek => {
                    if self.direction == Direction::Forward && cursor.monday() > today {
                        info!("cursor passed the present; done");
                        Phase::Done
                    } else {
                        stats.weeks_visited += 1;
                        info!("--- week {}: {} ---", stats.weeks_visited, cursor.range_label());

                        match self.load_week(cursor).await {
                            Ok(urls) => {
                                info!("found {} trips", urls.len());
                                if urls.is_empty() {
                                    empty_streak += 1;
                                    if empty_streak >= EMPTY_STREAK_LIMIT {
                                        info!("{} empty weeks in a row; done", empty_streak);
                                        Phase::Done
                                    } else {
                                        Phase::Advancing
                                    }
                                } else {
                                    empty_streak = 0;
                                    Phase::Extracting(urls)
                                }
                            }
                            Err(e) if is_session_lost(&e) => return Err(e),
                            Err(e) => match self.escalate(cursor, &format!("{e:#}"))? {
                                WeekDecision::Retry => {
                                    stats.weeks_visited -= 1;
                                    Phase::LoadingWeek
                                }
                                WeekDecision::Skip => Phase::Advancing,
                                WeekDecision::Stop => Phase::Aborted,
                            },
                        }
                    }
                }

                Phase::Extracting(urls) => {
                    let mut records = Vec::new();
                    let total = urls.len();
                    for (i, url) in urls.iter().enumerate() {
                        let trip_id = trip_id_from_url(url);
                        if self.seen.contains(&trip_id) {
                            stats.trips_skipped += 1;
                            continue;
                        }

                        info!("scraping trip {}/{}", i + 1, total);
                        match self.extract_one(url, &trip_id).await {
                            Ok(record) => records.push(record),
                            Err(e) if is_session_lost(&e) => return Err(e),
                            Err(e) => {
                                // Unmarked, so a future full re-run retries it.
                                warn!("trip {}: {:#}", trip_id, e);
                                stats.trip_errors += 1;
                            }
                        }
                    }
                    Phase::Persisting(records)
                }

                Phase::Persisting(records) => {
                    for record in &records {
                        // Durably mark before the row lands: a crash between
                        // the two loses one row, never duplicates one.
                        self.seen.mark(&record.trip_id)?;
                        self.ledger.append_records(std::slice::from_ref(record))?;
                        stats.trips_scraped += 1;
                    }
                    if !records.is_empty() {
                        info!("saved {} trips (total this run: {})", records.len(), stats.trips_scraped);
                    }
                    Phase::Advancing
                }

                Phase::Advancing => {
                    let next = match self.direction {
                        Direction::Forward => cursor.next(),
                        Direction::Backward => cursor.prev(),
                    };

                    if self.direction == Direction::Forward && next.monday() > today {
                        info!("next week is in the future; done");
                        Phase::Done
                    } else {
                        match self.advance(cursor, next).await {
                            Ok(NavOutcome::Moved) => {
                                cursor = next;
                                Phase::LoadingWeek
                            }
                            Ok(NavOutcome::ControlMissing) => {
                                if self.direction == Direction::Backward {
                                    info!("no previous-week control; end of navigable history");
                                    Phase::Done
                                } else {
                                    match self.escalate(next, "week navigation controls not found")? {
                                        WeekDecision::Retry => Phase::Advancing,
                                        WeekDecision::Skip => {
                                            cursor = next;
                                            Phase::Advancing
                                        }
                                        WeekDecision::Stop => Phase::Aborted,
                                    }
                                }
                            }
                            Err(e) if is_session_lost(&e) => return Err(e),
                            Err(e) => match self.escalate(next, &format!("{e:#}"))? {
                                WeekDecision::Retry => Phase::Advancing,
                                WeekDecision::Skip => {
                                    cursor = next;
                                    Phase::Advancing
                                }
                                WeekDecision::Stop => Phase::Aborted,
                            },
                        }
                    }
                }

                Phase::Done => break,
                Phase::Aborted => {
                    stats.aborted = true;
                    break;
                }
            };
        }

        Ok(stats)
    }

    /// Load the current week's trip URL set, re-positioning first if a
    /// challenge interrupted us.
    async fn load_week(&self, cursor: WeekCursor) -> Result<Vec<String>> {
        if challenge::ensure_clear(self.page, self.operator).await? {
            self.navigator.position(self.page, cursor).await?;
        }
        loader::collect_trip_urls(self.page, self.operator, &self.pacer, &self.base_url).await
    }

    /// Open one trip detail page and extract its record.
    async fn extract_one(&self, url: &str, trip_id: &str) -> Result<TripRecord> {
        challenge::ensure_clear(self.page, self.operator).await?;

        self.page.navigate(url).await?;
        self.page.wait_settled().await?;
        self.pacer.pause_brief().await;

        // Line items are collapsed until the breakdown is expanded.
        if self.page.click_labeled("View fare breakdown").await? {
            self.pacer.pause_brief().await;
        }

        let html = self.page.page_html().await?;
        Ok(extract_trip(&html, trip_id))
    }

    /// Move the view to `next`. The trip loop leaves the tab on a detail
    /// page, so a backward step re-anchors on the cursor's week first.
    async fn advance(&self, cursor: WeekCursor, next: WeekCursor) -> Result<NavOutcome> {
        challenge::ensure_clear(self.page, self.operator).await?;
        if self.direction == Direction::Backward {
            self.navigator.position(self.page, cursor).await?;
        }
        self.navigator.step(self.page, next).await
    }

    fn escalate(&self, cursor: WeekCursor, error: &str) -> Result<WeekDecision> {
        warn!("week {} failed: {}", cursor.range_label(), error);
        Ok(self.operator.week_decision(&cursor.range_label(), error)?)
    }
}

fn is_session_lost(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        cause
            .downcast_ref::<PortalError>()
            .is_some_and(|p| matches!(p, PortalError::SessionLost))
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
