//! Trip detail extraction: serialized trip-page DOM → one `TripRecord`.
//!
//! Every probe is best-effort and independent. A field the page doesn't
//! render stays at its zero/empty sentinel; extraction never fails a whole
//! record over one missing element. The portal's markup carries no stable
//! ids, so everything here is heuristic: leaf-text pattern matches, substring
//! classification of list items, and whole-page regex sweeps.

pub mod fare;
pub mod rules;

use crate::models::{FareLine, TripRecord};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

use self::fare::{FareFacts, parse_fare_line};

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+?)\s*•\s*(.+?)\s*•\s*(.+)").unwrap());
static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*min\s*(\d+)\s*sec").unwrap());
static DISTANCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\d+\s*mi$").unwrap());
static CITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([^,]+),\s*[A-Z]{2},\s*US").unwrap());
static POINTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*points?\s*earned$").unwrap());
static PER_MILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\d+\.\d+)/mile").unwrap());
static PER_MIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\d+\.\d+)/min").unwrap());
static DOLLAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\d+\.?\d*)").unwrap());
static REGION_FEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Region or City Fee[^-]*-\$(\d+\.?\d*)").unwrap());
static AIRPORT_FEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Airport Fee[^-]*-\$(\d+\.?\d*)").unwrap());
static INSURANCE_FEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)insurance and operational[^-]*-\$(\d+\.?\d*)").unwrap());
static SERVICE_FEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Uber Service Fee[^$]*\$(\d+\.?\d*)").unwrap());
static CUSTOMER_FARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total customer fare[^$]*\$(\d+\.?\d*)").unwrap());
static TIP_INCLUDED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+\.?\d*)\s*tip included").unwrap());

fn selector(css: &str) -> Selector {
    // All inputs are compile-time literals.
    Selector::parse(css).expect("static selector")
}

/// Whitespace-collapsed text of one element and its subtree.
fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A leaf is an element with no child elements. The text heuristics only
/// target leaves so a pattern match can't come from a giant container node.
fn is_leaf(el: ElementRef<'_>) -> bool {
    !el.children().any(|c| c.value().is_element())
}

fn leaf_texts(doc: &Html) -> Vec<String> {
    let all = selector("*");
    doc.select(&all)
        .filter(|el| is_leaf(*el))
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Extract one trip record from a loaded detail page's HTML.
///
/// Pure and deterministic: the page-automation layer hands over the DOM
/// serialization, everything after that is fixture-testable.
pub fn extract_trip(html: &str, trip_id: &str) -> TripRecord {
    let doc = Html::parse_document(html);
    let mut rec = TripRecord {
        trip_id: trip_id.to_string(),
        ..TripRecord::default()
    };

    let body_text = doc
        .root_element()
        .text()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let leaves = leaf_texts(&doc);

    // Heading: "<ride type> • <date> • <time>"
    let header_sel = selector(r#"[class*="trip"] span, [class*="list"] span"#);
    if let Some(el) = doc.select(&header_sel).next() {
        if let Some(caps) = HEADER_RE.captures(&element_text(el)) {
            rec.ride_type = caps[1].trim().to_string();
            rec.date = caps[2].trim().to_string();
            rec.time = caps[3].trim().to_string();
        }
    }

    // Duration: first "<min> min <sec> sec" leaf, as fractional minutes
    if let Some(caps) = leaves
        .iter()
        .filter(|t| t.contains("min") && t.contains("sec"))
        .find_map(|t| DURATION_RE.captures(t))
    {
        let mins: f64 = caps[1].parse().unwrap_or(0.0);
        let secs: f64 = caps[2].parse().unwrap_or(0.0);
        rec.duration_min = ((mins + secs / 60.0) * 100.0).round() / 100.0;
    }

    // Distance: first bare "<n>.<n> mi" leaf
    if let Some(t) = leaves.iter().find(|t| DISTANCE_RE.is_match(t)) {
        rec.distance_mi = t.trim_end_matches("mi").trim().to_string();
    }

    // Addresses: ", US" leaves, deduplicated in first-seen order
    let mut addresses: Vec<&String> = Vec::new();
    for t in leaves.iter().filter(|t| t.contains(", US")) {
        if !addresses.contains(&t) {
            addresses.push(t);
        }
    }
    if let Some(pickup) = addresses.first() {
        rec.pickup = pickup.to_string();
        if let Some(caps) = CITY_RE.captures(pickup) {
            rec.city = caps[1].trim().to_string();
        }
    }
    if let Some(dropoff) = addresses.get(1) {
        rec.dropoff = dropoff.to_string();
    }

    // Points
    if let Some(caps) = leaves.iter().find_map(|t| POINTS_RE.captures(t)) {
        rec.points = caps[1].to_string();
    }

    // Aggregate per-mile/per-minute rates rendered outside the line items
    if let Some(caps) = PER_MILE_RE.captures(&body_text) {
        rec.per_mile = caps[1].to_string();
    }
    if let Some(caps) = PER_MIN_RE.captures(&body_text) {
        rec.per_min = caps[1].to_string();
    }

    // Line-item sweep: classify every <li> through the rule table, and feed
    // the same text to the fare parser for distance/time reconciliation.
    let li_sel = selector("li");
    let mut facts = FareFacts::default();
    for item in doc.select(&li_sel) {
        let text = element_text(item);
        let hits = rules::classify(&text);
        for (field, amount) in &hits {
            field.assign(&mut rec, amount);
        }
        if let Some((field, amount)) = hits.first() {
            rec.line_items.push(FareLine {
                label: field.label().to_string(),
                amount: amount.clone(),
                detail: text.clone(),
            });
        }
        facts.absorb(&parse_fare_line("", &text));
    }

    // Fees and customer fare live outside the list markup
    for (re, slot) in [
        (&REGION_FEE_RE, &mut rec.region_fee),
        (&AIRPORT_FEE_RE, &mut rec.airport_fee),
        (&INSURANCE_FEE_RE, &mut rec.insurance_fee),
        (&SERVICE_FEE_RE, &mut rec.service_fee),
        (&CUSTOMER_FARE_RE, &mut rec.customer_fare),
    ] {
        if let Some(caps) = re.captures(&body_text) {
            *slot = caps[1].to_string();
        }
    }

    // The headline total is authoritative when present
    let heading_sel = selector(r#"h1, h2, [class*="heading"]"#);
    if let Some(el) = doc.select(&heading_sel).find(|el| element_text(*el).contains('$')) {
        if let Some(caps) = DOLLAR_RE.captures(&element_text(el)) {
            rec.total_earnings = caps[1].to_string();
        }
    }

    // Tip folded into the total rather than itemized
    if rec.tip == "0" {
        if let Some(caps) = TIP_INCLUDED_RE.captures(&body_text) {
            rec.tip = caps[1].to_string();
        }
    }

    // Reconcile against the line-item arithmetic where direct probes missed
    if rec.distance_mi.is_empty() {
        if let Some(miles) = facts.miles {
            rec.distance_mi = format!("{miles:.2}");
        }
    }
    if rec.duration_min == 0.0 {
        if let Some(minutes) = facts.minutes {
            rec.duration_min = (minutes * 100.0).round() / 100.0;
        }
    }
    if rec.per_mile == "0" {
        if let Some(rate) = facts.rate_per_mile {
            rec.per_mile = format!("{rate:.2}");
        }
    }
    if rec.per_min == "0" {
        if let Some(rate) = facts.rate_per_minute {
            rec.per_min = format!("{rate:.2}");
        }
    }

    debug!(
        trip_id,
        date = %rec.date,
        total = %rec.total_earnings,
        items = rec.line_items.len(),
        "extracted trip"
    );
    rec
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAGE: &str = r#"
    <html><body>
      <h1>$15.73</h1>
      <div class="trip-summary"><span>UberX • Jul 3, 2024 • 6:45 PM</span></div>
      <div><span>14 min 30 sec</span></div>
      <div><span>4.20 mi</span></div>
      <div><span>123 Main St, Portland, OR, US</span></div>
      <div><span>456 Oak Ave, Beaverton, OR, US</span></div>
      <div><span>123 Main St, Portland, OR, US</span></div>
      <div><span>52 points earned</span></div>
      <ul>
        <li>Base $2.55</li>
        <li>Distance 4.20 mile × $0.99/mile $4.16</li>
        <li>Time 14.5 minute × $0.20/minute $2.90</li>
        <li>Surge $1.25</li>
        <li>Fare $10.86</li>
        <li>Your earnings $14.48</li>
      </ul>
      <div>Uber Service Fee $3.10</div>
      <div>Total customer fare $18.83</div>
      <div>Region or City Fee -$0.50</div>
      <div>Insurance and Operational costs -$0.75</div>
    </body></html>"#;

    #[test]
    fn full_page_extraction() {
        let rec = extract_trip(FULL_PAGE, "trip-1");
        assert_eq!(rec.trip_id, "trip-1");
        assert_eq!(rec.ride_type, "UberX");
        assert_eq!(rec.date, "Jul 3, 2024");
        assert_eq!(rec.time, "6:45 PM");
        assert_eq!(rec.duration_min, 14.5);
        assert_eq!(rec.distance_mi, "4.20");
        assert_eq!(rec.pickup, "123 Main St, Portland, OR, US");
        assert_eq!(rec.dropoff, "456 Oak Ave, Beaverton, OR, US");
        assert_eq!(rec.city, "Portland");
        assert_eq!(rec.points, "52");
        assert_eq!(rec.base, "2.55");
        assert_eq!(rec.distance_pay, "0.99");
        assert_eq!(rec.surge, "1.25");
        assert_eq!(rec.fare, "10.86");
        assert_eq!(rec.per_mile, "0.99");
        assert_eq!(rec.per_min, "0.20");
        assert_eq!(rec.service_fee, "3.10");
        assert_eq!(rec.customer_fare, "18.83");
        assert_eq!(rec.region_fee, "0.50");
        assert_eq!(rec.insurance_fee, "0.75");
        // h1 overrides the "Your earnings" line item
        assert_eq!(rec.total_earnings, "15.73");
        assert!(!rec.line_items.is_empty());
    }

    #[test]
    fn missing_elements_leave_sentinels() {
        let rec = extract_trip("<html><body><p>nothing here</p></body></html>", "t");
        assert_eq!(rec.duration_min, 0.0);
        assert_eq!(rec.points, "0");
        assert_eq!(rec.base, "0");
        assert_eq!(rec.distance_mi, "");
        assert_eq!(rec.city, "");
        assert_eq!(rec.total_earnings, "0");
    }

    #[test]
    fn empty_page_never_panics() {
        let rec = extract_trip("", "t");
        assert_eq!(rec.trip_id, "t");
        assert_eq!(rec.duration_min, 0.0);
    }

    #[test]
    fn malformed_heading_leaves_header_fields_empty() {
        let html = r#"<div class="trip"><span>just some text, no separators</span></div>"#;
        let rec = extract_trip(html, "t");
        assert_eq!(rec.ride_type, "");
        assert_eq!(rec.date, "");
        assert_eq!(rec.time, "");
    }

    #[test]
    fn tip_included_fallback() {
        let html = r#"<html><body><div>$4.00 tip included in your earnings</div></body></html>"#;
        let rec = extract_trip(html, "t");
        assert_eq!(rec.tip, "4.00");

        // An explicit Tip line item wins over the phrase
        let html = r#"<html><body><ul><li>Tip $2.50</li></ul>
            <div>$4.00 tip included</div></body></html>"#;
        let rec = extract_trip(html, "t");
        assert_eq!(rec.tip, "2.50");
    }

    #[test]
    fn line_item_facts_backfill_distance_and_duration() {
        // No bare "<n> mi" or "min sec" leaves; only fare breakdown lines.
        let html = r#"<html><body><ul>
            <li>Distance 1.50 mile × $0.80/mile $1.20</li>
            <li>Distance 2.00 mile × $0.95/mile $1.90</li>
            <li>Time 10 minute × $0.20/minute $2.00</li>
        </ul></body></html>"#;
        let rec = extract_trip(html, "t");
        assert_eq!(rec.distance_mi, "3.50");
        assert_eq!(rec.duration_min, 10.0);
        // The whole-page sweep sees the first rendered rate
        assert_eq!(rec.per_mile, "0.80");
    }

    #[test]
    fn later_duplicate_line_item_overwrites() {
        let html = r#"<html><body><ul>
            <li>Surge $1.00</li>
            <li>Surge $2.25</li>
        </ul></body></html>"#;
        let rec = extract_trip(html, "t");
        assert_eq!(rec.surge, "2.25");
    }

    #[test]
    fn addresses_deduplicate_in_order() {
        let html = r#"<html><body>
            <span>A St, Salem, OR, US</span>
            <span>A St, Salem, OR, US</span>
            <span>B St, Keizer, OR, US</span>
        </body></html>"#;
        let rec = extract_trip(html, "t");
        assert_eq!(rec.pickup, "A St, Salem, OR, US");
        assert_eq!(rec.dropoff, "B St, Keizer, OR, US");
        assert_eq!(rec.city, "Salem");
    }
}
