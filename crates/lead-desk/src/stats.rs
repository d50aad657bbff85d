use chrono::{DateTime, Local};
use lead_api::ApiError;
use lead_core::stats::{DeptTotals, NightStats};
use lead_core::LeadType;
use std::time::Duration;
use tracing::{debug, warn};

pub const STATS_POLL_INTERVAL: Duration = Duration::from_millis(120_000);
pub const EMPTY_BREAKDOWN: &str = "No night sales yet.";

/// Night totals widget. A failed poll never touches the last snapshot.
#[derive(Debug)]
pub struct StatsWidget {
    snapshot: Option<NightStats>,
    selected: LeadType,
    in_flight: bool,
    updated_at: Option<DateTime<Local>>,
    failures: u32,
}

impl StatsWidget {
    pub fn new(selected: LeadType) -> Self {
        Self {
            snapshot: None,
            selected,
            in_flight: false,
            updated_at: None,
            failures: 0,
        }
    }

    /// False while the previous poll is still running; the tick is skipped.
    pub fn begin_poll(&mut self) -> bool {
        if self.in_flight {
            debug!("stats_poll_skipped: previous poll in flight");
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn apply_poll(&mut self, result: Result<NightStats, ApiError>, now: DateTime<Local>) {
        self.in_flight = false;
        match result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.updated_at = Some(now);
                self.failures = 0;
            }
            Err(err) => {
                self.failures = self.failures.saturating_add(1);
                warn!("stats_poll_failed: {err} (consecutive={})", self.failures);
            }
        }
    }

    pub fn selected(&self) -> LeadType {
        self.selected
    }

    pub fn select(&mut self, lead_type: LeadType) {
        self.selected = lead_type;
    }

    pub fn toggle(&mut self) {
        self.selected = self.selected.toggle();
    }

    pub fn is_polling(&self) -> bool {
        self.in_flight
    }

    pub fn updated_at(&self) -> Option<DateTime<Local>> {
        self.updated_at
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn snapshot(&self) -> Option<&NightStats> {
        self.snapshot.as_ref()
    }

    pub fn current(&self) -> Option<&DeptTotals> {
        self.snapshot
            .as_ref()
            .map(|snapshot| snapshot.for_type(self.selected))
    }

    pub fn total(&self) -> f64 {
        self.current().map(|totals| totals.total).unwrap_or(0.0)
    }

    /// Agents by amount, highest first.
    pub fn rows(&self) -> Vec<(String, f64)> {
        self.current()
            .map(DeptTotals::sorted_breakdown)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot(billing_total: f64) -> NightStats {
        NightStats {
            billing: DeptTotals {
                total: billing_total,
                breakdown: BTreeMap::from([
                    ("Areeb".to_string(), 40.0),
                    ("Haziq".to_string(), 80.0),
                ]),
            },
            insurance: DeptTotals {
                total: 15.0,
                breakdown: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn failed_poll_keeps_previous_snapshot() {
        let mut widget = StatsWidget::new(LeadType::Billing);
        assert!(widget.begin_poll());
        widget.apply_poll(Ok(snapshot(120.0)), Local::now());
        let before = widget.snapshot().cloned();
        let updated = widget.updated_at();

        assert!(widget.begin_poll());
        widget.apply_poll(
            Err(ApiError::Transport("timeout".to_string())),
            Local::now(),
        );
        assert_eq!(widget.snapshot().cloned(), before);
        assert_eq!(widget.updated_at(), updated);
        assert_eq!(widget.failures(), 1);
        assert!(!widget.is_polling());
    }

    #[test]
    fn polls_never_overlap() {
        let mut widget = StatsWidget::new(LeadType::Billing);
        assert!(widget.begin_poll());
        assert!(!widget.begin_poll());
        widget.apply_poll(Err(ApiError::Status { status: 500 }), Local::now());
        assert!(widget.begin_poll());
    }

    #[test]
    fn rows_follow_selected_department() {
        let mut widget = StatsWidget::new(LeadType::Billing);
        assert!(widget.rows().is_empty());
        widget.begin_poll();
        widget.apply_poll(Ok(snapshot(120.0)), Local::now());

        let rows = widget.rows();
        assert_eq!(rows[0].0, "Haziq");
        assert_eq!(widget.total(), 120.0);

        widget.toggle();
        assert_eq!(widget.selected(), LeadType::Insurance);
        assert_eq!(widget.total(), 15.0);
        assert!(widget.rows().is_empty());
    }
}
