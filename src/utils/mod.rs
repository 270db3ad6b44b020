use std::time::Instant;
use tracing::info;

/// Logs the wall-clock duration of a scrape run when dropped, so the timing
/// line lands even on an operator-aborted walk.
pub struct RunTimer {
    label: &'static str,
    started: Instant,
}

impl RunTimer {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
        }
    }
}

impl Drop for RunTimer {
    fn drop(&mut self) {
        info!("{} finished in {:.1?}", self.label, self.started.elapsed());
    }
}

/// Thousands-separated trip count for the summary banner.
pub fn fmt_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_grouping() {
        assert_eq!(fmt_count(0), "0");
        assert_eq!(fmt_count(999), "999");
        assert_eq!(fmt_count(1_000), "1,000");
        assert_eq!(fmt_count(1_234_567), "1,234,567");
    }
}
