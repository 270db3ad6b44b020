use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

// ── Fare line item ────────────────────────────────────────────────────────────

/// One row of a trip's fare breakdown: label, dollar value, free-text detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FareLine {
    pub label: String,
    pub amount: String,
    pub detail: String,
}

// ── Trip record ───────────────────────────────────────────────────────────────

/// One scraped ride, shaped to match the ledger's fixed column order.
///
/// Monetary fields are decimal strings defaulting to "0", so a missing fare
/// component must never fail extraction, it just stays at its sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Detail-page URL tail, unique key. Not a ledger column.
    pub trip_id: String,
    /// Ordered fare breakdown as scraped. Not a ledger column.
    pub line_items: Vec<FareLine>,

    pub date: String,
    pub time: String,
    pub ride_type: String,
    pub distance_pay: String,
    pub time_pay: String,
    pub surge: String,
    pub promotion: String,
    pub base: String,
    pub fare: String,
    pub tip: String,
    pub min_fare: String,
    pub wait_time: String,
    pub region_fee: String,
    pub airport_fee: String,
    pub insurance_fee: String,
    pub service_fee: String,
    pub points: String,
    pub city: String,
    pub pickup: String,
    pub dropoff: String,
    pub distance_mi: String,
    pub duration_min: f64,
    pub per_mile: String,
    pub per_min: String,
    pub total_earnings: String,
    pub customer_fare: String,
}

impl Default for TripRecord {
    fn default() -> Self {
        let zero = || "0".to_string();
        Self {
            trip_id: String::new(),
            line_items: Vec::new(),
            date: String::new(),
            time: String::new(),
            ride_type: String::new(),
            distance_pay: zero(),
            time_pay: zero(),
            surge: zero(),
            promotion: zero(),
            base: zero(),
            fare: zero(),
            tip: zero(),
            min_fare: zero(),
            wait_time: zero(),
            region_fee: zero(),
            airport_fee: zero(),
            insurance_fee: zero(),
            service_fee: zero(),
            points: zero(),
            city: String::new(),
            pickup: String::new(),
            dropoff: String::new(),
            distance_mi: String::new(),
            duration_min: 0.0,
            per_mile: zero(),
            per_min: zero(),
            total_earnings: zero(),
            customer_fare: zero(),
        }
    }
}

/// Ledger column order. Fixed; the header is written exactly once per file.
pub const LEDGER_HEADERS: [&str; 26] = [
    "Date",
    "Time",
    "Ride Type",
    "Distance Pay",
    "Time Pay",
    "Surge",
    "Promotion",
    "Base",
    "Fare (subtotal)",
    "Tip",
    "Minimum Fare Supplement",
    "Wait Time Pay",
    "Region/City Fee",
    "Airport Fee",
    "Insurance & Operational Fee",
    "Uber Service Fee",
    "Points Earned",
    "City",
    "Pickup Address",
    "Dropoff Address",
    "Distance (mi)",
    "Duration (min)",
    "$/mile",
    "$/min",
    "Total Earnings",
    "Total Customer Fare",
];

impl TripRecord {
    /// Row in ledger column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.time.clone(),
            self.ride_type.clone(),
            self.distance_pay.clone(),
            self.time_pay.clone(),
            self.surge.clone(),
            self.promotion.clone(),
            self.base.clone(),
            self.fare.clone(),
            self.tip.clone(),
            self.min_fare.clone(),
            self.wait_time.clone(),
            self.region_fee.clone(),
            self.airport_fee.clone(),
            self.insurance_fee.clone(),
            self.service_fee.clone(),
            self.points.clone(),
            self.city.clone(),
            self.pickup.clone(),
            self.dropoff.clone(),
            self.distance_mi.clone(),
            format!("{:.2}", self.duration_min),
            self.per_mile.clone(),
            self.per_min.clone(),
            self.total_earnings.clone(),
            self.customer_fare.clone(),
        ]
    }
}

/// Trip identifier from a detail-page URL: last path segment, query stripped.
/// `.../earnings/trips/abc-123?source=week` → `abc-123`
pub fn trip_id_from_url(link: &str) -> String {
    if let Ok(parsed) = url::Url::parse(link) {
        if let Some(segments) = parsed.path_segments() {
            if let Some(tail) = segments.filter(|s| !s.is_empty()).last() {
                return tail.to_string();
            }
        }
    }
    // Relative hrefs don't parse as absolute URLs; fall back to string slicing.
    let no_query = link.split('?').next().unwrap_or(link);
    no_query
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(no_query)
        .to_string()
}

// ── Week cursor ───────────────────────────────────────────────────────────────

/// The currently targeted week, identified by its Monday.
///
/// Mutated only on orchestrator command, never recomputed from DOM state, so
/// the cursor can't drift silently when the portal renders something odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekCursor {
    monday: NaiveDate,
}

impl WeekCursor {
    /// Snap any date to the Monday of its week.
    pub fn containing(date: NaiveDate) -> Self {
        let back = date.weekday().num_days_from_monday() as u64;
        Self {
            monday: date - Days::new(back),
        }
    }

    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    pub fn next(&self) -> Self {
        Self {
            monday: self.monday + Days::new(7),
        }
    }

    pub fn prev(&self) -> Self {
        Self {
            monday: self.monday - Days::new(7),
        }
    }

    /// The portal's week-search format: "Jul 1, 2024 – Jul 8, 2024"
    /// (inclusive Monday, exclusive following Monday, en dash).
    pub fn range_label(&self) -> String {
        let end = self.monday + Days::new(7);
        format!(
            "{} {}, {} \u{2013} {} {}, {}",
            self.monday.format("%b"),
            self.monday.day(),
            self.monday.year(),
            end.format("%b"),
            end.day(),
            end.year()
        )
    }
}

// ── Start-date entry ──────────────────────────────────────────────────────────

/// Date formats accepted at the start-date prompt, tried in order.
/// `%m/%d/%y` must come before `%m/%d/%Y`: chrono's `%Y` accepts a two-digit
/// year, so "07/01/24" would otherwise parse as year 24.
const DATE_FORMATS: [&str; 6] = [
    "%b %d, %Y",
    "%b %d %Y",
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
];

/// Parse a user-entered start date. `None` means fall back to "today".
/// A bare "Mon D" assumes the current year.
pub fn parse_start_date(input: &str, current_year: i32) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(input, fmt) {
            return Some(d);
        }
    }
    // "Jul 1" has no year token; append the current one and re-parse.
    NaiveDate::parse_from_str(&format!("{input}, {current_year}"), "%b %d, %Y").ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cursor_snaps_to_monday() {
        // 2024-07-04 is a Thursday
        let c = WeekCursor::containing(date(2024, 7, 4));
        assert_eq!(c.monday(), date(2024, 7, 1));
        // A Monday stays put
        assert_eq!(WeekCursor::containing(date(2024, 7, 1)).monday(), date(2024, 7, 1));
        // Sunday belongs to the preceding Monday's week
        assert_eq!(WeekCursor::containing(date(2024, 7, 7)).monday(), date(2024, 7, 1));
    }

    #[test]
    fn cursor_range_label() {
        let c = WeekCursor::containing(date(2024, 7, 1));
        assert_eq!(c.range_label(), "Jul 1, 2024 \u{2013} Jul 8, 2024");
        // Month boundary
        let c = WeekCursor::containing(date(2024, 12, 30));
        assert_eq!(c.range_label(), "Dec 30, 2024 \u{2013} Jan 6, 2025");
    }

    #[test]
    fn cursor_steps() {
        let c = WeekCursor::containing(date(2024, 7, 1));
        assert_eq!(c.next().monday(), date(2024, 7, 8));
        assert_eq!(c.prev().monday(), date(2024, 6, 24));
    }

    #[test]
    fn start_date_formats() {
        assert_eq!(parse_start_date("Jul 1, 2024", 2026), Some(date(2024, 7, 1)));
        assert_eq!(parse_start_date("Jul 1 2024", 2026), Some(date(2024, 7, 1)));
        assert_eq!(parse_start_date("Jul 1", 2026), Some(date(2026, 7, 1)));
        assert_eq!(parse_start_date("2024-07-01", 2026), Some(date(2024, 7, 1)));
        assert_eq!(parse_start_date("07/01/2024", 2026), Some(date(2024, 7, 1)));
        assert_eq!(parse_start_date("07/01/24", 2026), Some(date(2024, 7, 1)));
        // Two-digit years follow chrono's %y pivot, never year 0024
        assert_eq!(parse_start_date("12/31/99", 2026), Some(date(1999, 12, 31)));
        assert_eq!(parse_start_date("07-01-2024", 2026), Some(date(2024, 7, 1)));
        assert_eq!(parse_start_date("", 2026), None);
        assert_eq!(parse_start_date("next tuesday", 2026), None);
    }

    #[test]
    fn trip_id_strips_query_and_path() {
        assert_eq!(
            trip_id_from_url("https://drivers.uber.com/earnings/trips/abc-123?source=week"),
            "abc-123"
        );
        assert_eq!(trip_id_from_url("/earnings/trips/xyz"), "xyz");
        assert_eq!(
            trip_id_from_url("https://drivers.uber.com/earnings/trips/abc/"),
            "abc"
        );
    }

    #[test]
    fn record_row_matches_header_width() {
        let r = TripRecord::default();
        assert_eq!(r.to_row().len(), LEDGER_HEADERS.len());
        assert_eq!(r.to_row()[21], "0.00");
        assert_eq!(r.points, "0");
    }
}
