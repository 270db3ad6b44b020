//! Trip set loading: exhaust the "load more" pagination on a week's view,
//! then harvest every trip-detail link from the fully expanded page.

use super::{Pacer, PortalPage, challenge};
use crate::console::Operator;
use anyhow::Result;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

/// Button label variants; the portal's casing is inconsistent.
const LOAD_MORE_LABELS: [&str; 2] = ["Load more", "Load More"];

const TRIP_LINK_CSS: &str = r#"a[href*="/earnings/trips/"]"#;

/// Expand the week fully and return its trip URLs, deduplicated in
/// first-seen order. An empty week yields an empty vec, not an error.
///
/// The challenge probe runs before every click attempt since verification
/// screens like to appear mid-pagination.
pub async fn collect_trip_urls(
    page: &dyn PortalPage,
    operator: &dyn Operator,
    pacer: &Pacer,
    base_url: &str,
) -> Result<Vec<String>> {
    let mut clicks = 0u32;
    loop {
        challenge::ensure_clear(page, operator).await?;

        let mut clicked = false;
        for label in LOAD_MORE_LABELS {
            if page.click_labeled(label).await? {
                clicks += 1;
                debug!("load more clicked {}x", clicks);
                pacer.pause().await;
                clicked = true;
                break;
            }
        }
        // Bounded by the control's own disappearance, not a fixed count.
        if !clicked {
            break;
        }
    }
    if clicks > 0 {
        info!("clicked load more {} times", clicks);
    }

    let html = page.page_html().await?;
    Ok(trip_links(&html, base_url))
}

/// Pull trip-detail hrefs out of a week page's HTML, first-seen order.
/// Relative hrefs are resolved against `base_url`; WebDriver navigation
/// only accepts absolute URLs.
pub fn trip_links(html: &str, base_url: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse(TRIP_LINK_CSS).expect("static selector");
    let base = Url::parse(base_url).ok();

    let mut urls: Vec<String> = Vec::new();
    for a in doc.select(&sel) {
        if let Some(href) = a.value().attr("href") {
            let resolved = base
                .as_ref()
                .and_then(|b| b.join(href).ok())
                .map(String::from)
                .unwrap_or_else(|| href.to_string());
            if !urls.contains(&resolved) {
                urls.push(resolved);
            }
        }
    }
    urls
}
