//! Fare line-item classification.
//!
//! Each `<li>` in the fare breakdown is matched against an ordered table of
//! (predicate, field) rules. Rules are not mutually exclusive: one item may
//! satisfy several, and a later item matching the same field overwrites an
//! earlier one. Adding a new fare component means adding a table entry, not
//! threading another branch through a conditional cascade.

use crate::models::TripRecord;
use regex::Regex;
use std::sync::LazyLock;

static DOLLAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\d+\.?\d*)").unwrap());
static FARE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Fare\s*\$(\d+\.?\d*)").unwrap());

/// Ledger fields assignable from a fare line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FareField {
    Base,
    DistancePay,
    TimePay,
    Surge,
    Promotion,
    MinFare,
    WaitTime,
    FareSubtotal,
    TotalEarnings,
    Tip,
}

impl FareField {
    pub fn label(&self) -> &'static str {
        match self {
            FareField::Base => "Base",
            FareField::DistancePay => "Distance",
            FareField::TimePay => "Time",
            FareField::Surge => "Surge",
            FareField::Promotion => "Promotion",
            FareField::MinFare => "Minimum Fare Supplement",
            FareField::WaitTime => "Wait Time",
            FareField::FareSubtotal => "Fare",
            FareField::TotalEarnings => "Your earnings",
            FareField::Tip => "Tip",
        }
    }

    /// Write a captured amount into its record field (last write wins).
    pub fn assign(&self, record: &mut TripRecord, amount: &str) {
        let slot = match self {
            FareField::Base => &mut record.base,
            FareField::DistancePay => &mut record.distance_pay,
            FareField::TimePay => &mut record.time_pay,
            FareField::Surge => &mut record.surge,
            FareField::Promotion => &mut record.promotion,
            FareField::MinFare => &mut record.min_fare,
            FareField::WaitTime => &mut record.wait_time,
            FareField::FareSubtotal => &mut record.fare,
            FareField::TotalEarnings => &mut record.total_earnings,
            FareField::Tip => &mut record.tip,
        };
        *slot = amount.to_string();
    }
}

/// How the dollar amount is pulled out of a matched item's text.
#[derive(Debug, Clone, Copy)]
enum Capture {
    /// First `$<number>` anywhere in the item.
    FirstDollar,
    /// The `$<number>` directly following the "Fare" label. The subtotal
    /// line also mentions other amounts, so position matters here.
    AfterFareLabel,
}

struct LineRule {
    field: FareField,
    applies: fn(&str) -> bool,
    capture: Capture,
}

static LINE_RULES: &[LineRule] = &[
    LineRule {
        field: FareField::Base,
        applies: |t| t.contains("Base") && !t.contains("Fare"),
        capture: Capture::FirstDollar,
    },
    LineRule {
        field: FareField::DistancePay,
        applies: |t| t.contains("Distance") && t.contains("mile"),
        capture: Capture::FirstDollar,
    },
    LineRule {
        field: FareField::TimePay,
        applies: |t| t.contains("Time") && t.contains("minute"),
        capture: Capture::FirstDollar,
    },
    LineRule {
        field: FareField::Surge,
        applies: |t| t.contains("Surge"),
        capture: Capture::FirstDollar,
    },
    LineRule {
        field: FareField::Promotion,
        applies: |t| t.contains("Promotion"),
        capture: Capture::FirstDollar,
    },
    LineRule {
        field: FareField::MinFare,
        applies: |t| t.contains("Minimum Fare"),
        capture: Capture::FirstDollar,
    },
    LineRule {
        field: FareField::WaitTime,
        applies: |t| t.contains("Wait Time"),
        capture: Capture::FirstDollar,
    },
    LineRule {
        field: FareField::FareSubtotal,
        applies: |t| t.contains("Fare") && !t.contains("customer") && !t.contains("Minimum"),
        capture: Capture::AfterFareLabel,
    },
    LineRule {
        field: FareField::TotalEarnings,
        applies: |t| t.contains("Your earnings") && !t.contains("Total"),
        capture: Capture::FirstDollar,
    },
    LineRule {
        field: FareField::Tip,
        applies: |t| t.contains("Tip") && !t.contains("included"),
        capture: Capture::FirstDollar,
    },
];

/// Evaluate the rule table against one line item's text.
/// Returns every (field, amount) assignment the item produces.
pub fn classify(text: &str) -> Vec<(FareField, String)> {
    let mut hits = Vec::new();
    for rule in LINE_RULES {
        if !(rule.applies)(text) {
            continue;
        }
        let amount = match rule.capture {
            Capture::FirstDollar => DOLLAR_RE.captures(text).map(|c| c[1].to_string()),
            Capture::AfterFareLabel => FARE_LABEL_RE.captures(text).map(|c| c[1].to_string()),
        };
        if let Some(amount) = amount {
            hits.push((rule.field, amount));
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(text: &str) -> Vec<FareField> {
        classify(text).into_iter().map(|(f, _)| f).collect()
    }

    #[test]
    fn base_excludes_fare_lines() {
        assert_eq!(fields("Base $2.55"), vec![FareField::Base]);
        assert!(fields("Base Fare $2.55").contains(&FareField::FareSubtotal));
        assert!(!fields("Base Fare $2.55").contains(&FareField::Base));
    }

    #[test]
    fn distance_and_time_need_unit_words() {
        assert_eq!(
            classify("Distance 1.64 mile × $0.99/mile$1.62"),
            vec![(FareField::DistancePay, "0.99".into())]
        );
        assert_eq!(fields("Distance info"), Vec::<FareField>::new());
        assert_eq!(fields("Time 5 minute × $0.20/minute$1.00"), vec![FareField::TimePay]);
    }

    #[test]
    fn fare_subtotal_captures_after_label() {
        // The first dollar amount is not the subtotal here
        let hits = classify("Trip Fare $8.21 including $1.00 surge");
        assert!(hits.contains(&(FareField::FareSubtotal, "8.21".into())));
    }

    #[test]
    fn fare_subtotal_skips_customer_and_minimum() {
        assert!(fields("Total customer fare $14.00").is_empty());
        assert_eq!(fields("Minimum Fare Supplement $2.00"), vec![FareField::MinFare]);
    }

    #[test]
    fn tip_unless_included() {
        assert_eq!(fields("Tip $3.00"), vec![FareField::Tip]);
        assert!(fields("$3.00 tip included").is_empty());
        // "Tip included" phrasing with capital T
        assert!(fields("Tip included $3.00").is_empty());
    }

    #[test]
    fn earnings_unless_total() {
        assert_eq!(fields("Your earnings $12.34"), vec![FareField::TotalEarnings]);
        assert!(fields("Total Your earnings $12.34").is_empty());
    }

    #[test]
    fn one_item_can_hit_multiple_rules() {
        let hits = classify("Surge Promotion $1.50");
        assert!(hits.contains(&(FareField::Surge, "1.50".into())));
        assert!(hits.contains(&(FareField::Promotion, "1.50".into())));
    }

    #[test]
    fn assignment_is_last_write_wins() {
        let mut rec = crate::models::TripRecord::default();
        for (field, amount) in classify("Surge $1.00") {
            field.assign(&mut rec, &amount);
        }
        for (field, amount) in classify("Surge $2.00") {
            field.assign(&mut rec, &amount);
        }
        assert_eq!(rec.surge, "2.00");
    }
}
