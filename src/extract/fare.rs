//! Fare line-item text parsing.
//!
//! The portal renders distance/time components as free text like
//! `"1.64 mile × $0.99/mile (rounding applied)"`. This module turns one such
//! detail string into typed numbers, and accumulates them across a trip's
//! line items (wait-time-adjusted fares split distance/time over several).

use regex::Regex;
use std::sync::LazyLock;

static MILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\d.]+)\s*mile\s*×\s*\$([\d.]+)/mile").unwrap()
});

static MINUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\d.]+)\s*min(?:ute)?\s*×\s*\$([\d.]+)/min").unwrap()
});

/// Numbers recovered from one fare line item. Every field optional; an
/// unrecognized detail string yields the empty value, never an error.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FareFacts {
    pub miles: Option<f64>,
    pub rate_per_mile: Option<f64>,
    pub minutes: Option<f64>,
    pub rate_per_minute: Option<f64>,
}

impl FareFacts {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold another line item's facts into this trip-level accumulation.
    /// Quantities (miles, minutes) sum; rates take the last non-zero match.
    pub fn absorb(&mut self, other: &FareFacts) {
        if let Some(m) = other.miles {
            self.miles = Some(self.miles.unwrap_or(0.0) + m);
        }
        if let Some(m) = other.minutes {
            self.minutes = Some(self.minutes.unwrap_or(0.0) + m);
        }
        if let Some(r) = other.rate_per_mile {
            if r > 0.0 || self.rate_per_mile.is_none() {
                self.rate_per_mile = Some(r);
            }
        }
        if let Some(r) = other.rate_per_minute {
            if r > 0.0 || self.rate_per_minute.is_none() {
                self.rate_per_minute = Some(r);
            }
        }
    }
}

/// Parse one fare line item's detail text. The label is part of the contract
/// but carries no numeric content today; classification happens elsewhere.
pub fn parse_fare_line(_label: &str, detail: &str) -> FareFacts {
    let mut facts = FareFacts::default();

    if let Some(caps) = MILE_RE.captures(detail) {
        if let (Ok(miles), Ok(rate)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) {
            facts.miles = Some(miles);
            facts.rate_per_mile = Some(rate);
        }
    }

    if let Some(caps) = MINUTE_RE.captures(detail) {
        if let (Ok(minutes), Ok(rate)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) {
            facts.minutes = Some(minutes);
            facts.rate_per_minute = Some(rate);
        }
    }

    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_pattern() {
        let f = parse_fare_line("Distance", "1.64 mile × $0.99/mile (rounding applied)");
        assert_eq!(f.miles, Some(1.64));
        assert_eq!(f.rate_per_mile, Some(0.99));
        assert_eq!(f.minutes, None);
    }

    #[test]
    fn time_pattern_both_spellings() {
        let f = parse_fare_line("Time", "12.5 min × $0.20/min");
        assert_eq!(f.minutes, Some(12.5));
        assert_eq!(f.rate_per_minute, Some(0.20));

        let f = parse_fare_line("Time", "8 minute × $0.15/minute");
        assert_eq!(f.minutes, Some(8.0));
        assert_eq!(f.rate_per_minute, Some(0.15));
    }

    #[test]
    fn case_insensitive_and_order_independent() {
        let f = parse_fare_line("", "3.00 MILE × $1.10/MILE after 2 min × $0.30/min");
        assert_eq!(f.miles, Some(3.0));
        assert_eq!(f.rate_per_mile, Some(1.10));
        assert_eq!(f.minutes, Some(2.0));
        assert_eq!(f.rate_per_minute, Some(0.30));
    }

    #[test]
    fn no_unit_literal_no_miles() {
        // "mi" alone is not the line-item unit; only the literal "mile" counts.
        assert!(parse_fare_line("Distance", "1.64 mi × $0.99/mi").is_empty());
        assert!(parse_fare_line("Base", "$2.50 flat").is_empty());
        assert!(parse_fare_line("", "").is_empty());
    }

    #[test]
    fn accumulation_sums_quantities() {
        let mut total = FareFacts::default();
        total.absorb(&parse_fare_line("Distance", "1.5 mile × $0.80/mile"));
        total.absorb(&parse_fare_line("Distance", "2.0 mile × $0.95/mile"));
        assert_eq!(total.miles, Some(3.5));
        // Last-write-wins for the rate
        assert_eq!(total.rate_per_mile, Some(0.95));
    }

    #[test]
    fn accumulation_keeps_last_nonzero_rate() {
        let mut total = FareFacts::default();
        total.absorb(&parse_fare_line("Distance", "1.0 mile × $0.75/mile"));
        total.absorb(&parse_fare_line("Distance", "0.5 mile × $0.00/mile"));
        assert_eq!(total.miles, Some(1.5));
        // A zero rate doesn't clobber an earlier real one
        assert_eq!(total.rate_per_mile, Some(0.75));
    }
}
