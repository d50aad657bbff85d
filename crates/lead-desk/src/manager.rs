//! Manager dashboard state: session, cached data and the pending queue.

use crate::analysis::{self, AnalysisFilter, AnalysisReport};
use crate::editor::Feedback;
use crate::notifications::Tone;
use crate::router::SoundCue;
use chrono::NaiveDate;
use lead_api::ApiError;
use lead_core::stats::{DeptStats, ManagerData};
use lead_core::{Decision, LeadRecord, LeadType, StatusChange};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

pub const REFETCH_DELAY: Duration = Duration::from_millis(500);
pub const MANAGER_REFRESH_INTERVAL: Duration = Duration::from_millis(120_000);
pub const STATUS_TRANSPORT_FAILURE: &str = "Update Failed! Check Console.";
pub const NO_PENDING: &str = "No pending orders.";
pub const MISSING_CARD_ID: &str = "Cannot update: this lead has no ID.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerTab {
    Stats,
    Pending,
    Analysis,
    Edit,
}

impl ManagerTab {
    pub const ALL: [ManagerTab; 4] = [
        ManagerTab::Stats,
        ManagerTab::Pending,
        ManagerTab::Analysis,
        ManagerTab::Edit,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ManagerTab::Stats => "Stats",
            ManagerTab::Pending => "Pending",
            ManagerTab::Analysis => "Analysis",
            ManagerTab::Edit => "Edit",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ManagerTab::Stats => ManagerTab::Pending,
            ManagerTab::Pending => ManagerTab::Analysis,
            ManagerTab::Analysis => ManagerTab::Edit,
            ManagerTab::Edit => ManagerTab::Stats,
        }
    }
}

/// Where a pending card lives. Business ids repeat across rows, so the
/// sheet row is the identity; the list position stands in when the backend
/// sent no row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CardSlot {
    Row(u32),
    Position(usize),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CardKey {
    pub lead_type: LeadType,
    pub slot: CardSlot,
    pub id: Option<String>,
}

impl CardKey {
    pub fn id_label(&self) -> &str {
        self.id.as_deref().unwrap_or("-")
    }
}

/// Result of pressing Approve or Decline on a card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusStart {
    Send(CardKey, StatusChange),
    /// No card there, or its buttons are already disabled.
    Ignored,
    /// The card has no business id to update by.
    MissingId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardState {
    Idle,
    /// Buttons disabled; the pressed one shows `...`.
    Busy { pressed: Decision },
    /// Accepted by the server, waiting for the refetch to drop it.
    Fading,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginField {
    UserId,
    Password,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub user_id: String,
    pub password: String,
    pub focus: Option<LoginField>,
    busy: bool,
    failed: bool,
}

impl LoginForm {
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn focused(&self) -> LoginField {
        self.focus.unwrap_or(LoginField::UserId)
    }

    pub fn toggle_focus(&mut self) {
        self.focus = Some(match self.focused() {
            LoginField::UserId => LoginField::Password,
            LoginField::Password => LoginField::UserId,
        });
    }

    pub fn type_char(&mut self, ch: char) {
        match self.focused() {
            LoginField::UserId => self.user_id.push(ch),
            LoginField::Password => self.password.push(ch),
        }
    }

    pub fn backspace(&mut self) {
        match self.focused() {
            LoginField::UserId => self.user_id.pop(),
            LoginField::Password => self.password.pop(),
        };
    }
}

/// What a finished status change asks of the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusOutcome {
    pub cue: Option<SoundCue>,
    pub feedback: Option<Feedback>,
    pub schedule_refetch: bool,
}

#[derive(Debug)]
pub struct ManagerDashboard {
    token: Option<String>,
    pub login: LoginForm,
    data: ManagerData,
    loaded: bool,
    fetch_in_flight: bool,
    refetch_queued: bool,
    tab: ManagerTab,
    pending_type: LeadType,
    stats_type: LeadType,
    selected_card: usize,
    card_states: HashMap<CardKey, CardState>,
    pub analysis: AnalysisFilter,
    pub analysis_scroll: u16,
}

impl ManagerDashboard {
    pub fn new(token: Option<String>, today: NaiveDate) -> Self {
        Self {
            token: token.filter(|token| !token.trim().is_empty()),
            login: LoginForm::default(),
            data: ManagerData::default(),
            loaded: false,
            fetch_in_flight: false,
            refetch_queued: false,
            tab: ManagerTab::Stats,
            pending_type: LeadType::Billing,
            stats_type: LeadType::Billing,
            selected_card: 0,
            card_states: HashMap::new(),
            analysis: AnalysisFilter::for_day(today),
            analysis_scroll: 0,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch_in_flight
    }

    pub fn data(&self) -> &ManagerData {
        &self.data
    }

    pub fn tab(&self) -> ManagerTab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: ManagerTab) {
        self.tab = tab;
        self.analysis_scroll = 0;
    }

    pub fn begin_login(&mut self) -> Option<(String, String)> {
        if self.login.busy {
            return None;
        }
        let user_id = self.login.user_id.trim().to_string();
        if user_id.is_empty() || self.login.password.is_empty() {
            self.login.failed = true;
            return None;
        }
        self.login.busy = true;
        self.login.failed = false;
        Some((user_id, self.login.password.clone()))
    }

    /// On success returns the token to fetch data with.
    pub fn complete_login(&mut self, result: Result<String, ApiError>) -> Option<String> {
        self.login.busy = false;
        match result {
            Ok(token) => {
                info!("manager_login_ok");
                self.login.password.clear();
                self.token = Some(token);
                self.begin_fetch()
            }
            Err(err) => {
                warn!("manager_login_failed: {err}");
                self.login.failed = true;
                None
            }
        }
    }

    pub fn logout(&mut self) {
        self.token = None;
        self.data = ManagerData::default();
        self.loaded = false;
        self.card_states.clear();
    }

    /// Token for a new fetch, or `None` when one is running (it is queued).
    pub fn begin_fetch(&mut self) -> Option<String> {
        let token = self.token.clone()?;
        if self.fetch_in_flight {
            self.refetch_queued = true;
            return None;
        }
        self.fetch_in_flight = true;
        Some(token)
    }

    /// Replaces the cache wholesale on success. Returns the token when a
    /// queued refetch should start right away.
    pub fn complete_fetch(&mut self, result: Result<ManagerData, ApiError>) -> Option<String> {
        self.fetch_in_flight = false;
        match result {
            Ok(data) => {
                self.data = data;
                self.loaded = true;
                self.card_states
                    .retain(|_, state| matches!(state, CardState::Busy { .. }));
                let pending = self.pending_cards().len();
                if self.selected_card >= pending {
                    self.selected_card = pending.saturating_sub(1);
                }
            }
            Err(ApiError::Status { status: 401 }) | Err(ApiError::Status { status: 403 }) => {
                warn!("manager_data_unauthorized: session token rejected");
                self.logout();
                self.refetch_queued = false;
                return None;
            }
            Err(err) => {
                warn!("manager_data_failed: {err}");
            }
        }
        if std::mem::take(&mut self.refetch_queued) {
            self.begin_fetch()
        } else {
            None
        }
    }

    pub fn pending_type(&self) -> LeadType {
        self.pending_type
    }

    pub fn toggle_pending_type(&mut self) {
        self.pending_type = self.pending_type.toggle();
        self.selected_card = 0;
    }

    pub fn stats_type(&self) -> LeadType {
        self.stats_type
    }

    pub fn toggle_stats_type(&mut self) {
        self.stats_type = self.stats_type.toggle();
    }

    pub fn stats(&self) -> &DeptStats {
        self.data.stats(self.stats_type)
    }

    /// Submitted leads of the active sub-tab, newest first.
    pub fn pending_cards(&self) -> Vec<&LeadRecord> {
        self.data
            .leads(self.pending_type)
            .iter()
            .filter(|record| record.is_submitted())
            .rev()
            .collect()
    }

    pub fn selected_card(&self) -> usize {
        self.selected_card
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.pending_cards().len();
        if len == 0 {
            self.selected_card = 0;
            return;
        }
        let next = (self.selected_card as isize + delta).clamp(0, len as isize - 1);
        self.selected_card = next as usize;
    }

    /// `index` is the card's position in `pending_cards`.
    pub fn card_key(&self, index: usize, record: &LeadRecord) -> CardKey {
        CardKey {
            lead_type: self.pending_type,
            slot: record
                .row_index
                .map(CardSlot::Row)
                .unwrap_or(CardSlot::Position(index)),
            id: record.business_id().map(str::to_string),
        }
    }

    pub fn card_state(&self, key: &CardKey) -> CardState {
        self.card_states
            .get(key)
            .copied()
            .unwrap_or(CardState::Idle)
    }

    pub fn buttons_enabled(&self, key: &CardKey) -> bool {
        self.card_state(key) == CardState::Idle
    }

    pub fn button_label(&self, key: &CardKey, decision: Decision) -> &'static str {
        match self.card_state(key) {
            CardState::Busy { pressed } if pressed == decision => "...",
            _ => decision.label(),
        }
    }

    /// Optimistic step: disable the card and hand back the one request to send.
    pub fn begin_status_change(
        &mut self,
        index: usize,
        decision: Decision,
    ) -> StatusStart {
        let Some(record) = self.pending_cards().get(index).copied() else {
            return StatusStart::Ignored;
        };
        let key = self.card_key(index, record);
        if !self.buttons_enabled(&key) {
            return StatusStart::Ignored;
        }
        let Some(id) = key.id.clone() else {
            warn!("status_change_skipped: card {:?} has no id", key.slot);
            return StatusStart::MissingId;
        };
        let change = StatusChange {
            lead_type: key.lead_type,
            id,
            status: decision.status().to_string(),
        };
        self.card_states
            .insert(key.clone(), CardState::Busy { pressed: decision });
        StatusStart::Send(key, change)
    }

    pub fn complete_status_change(
        &mut self,
        key: &CardKey,
        decision: Decision,
        result: Result<String, ApiError>,
    ) -> StatusOutcome {
        match result {
            Ok(_) => {
                info!(
                    "status_change_ok: type={} id={} status={}",
                    key.lead_type,
                    key.id_label(),
                    decision.status()
                );
                self.card_states.insert(key.clone(), CardState::Fading);
                StatusOutcome {
                    cue: (decision == Decision::Approve).then_some(SoundCue::Money),
                    feedback: None,
                    schedule_refetch: true,
                }
            }
            Err(err) => {
                self.card_states.remove(key);
                let text = match err.rejection() {
                    Some(message) => format!("Error: {message}"),
                    None => {
                        warn!("status_change_failed: id={} error={err}", key.id_label());
                        STATUS_TRANSPORT_FAILURE.to_string()
                    }
                };
                StatusOutcome {
                    cue: None,
                    feedback: Some(Feedback::new(text, Tone::Error)),
                    schedule_refetch: false,
                }
            }
        }
    }

    pub fn analysis_records(&self) -> &[LeadRecord] {
        self.data.leads(self.analysis.lead_type)
    }

    pub fn analysis_report(&self) -> AnalysisReport<'_> {
        analysis::analyze(self.analysis_records(), &self.analysis)
    }

    pub fn analysis_agents(&self) -> Vec<String> {
        analysis::agents(self.analysis_records())
    }

    pub fn toggle_analysis_type(&mut self) {
        self.analysis.lead_type = self.analysis.lead_type.toggle();
        self.analysis.agent = None;
        self.analysis_scroll = 0;
    }

    pub fn cycle_analysis_agent(&mut self) {
        let agents = self.analysis_agents();
        self.analysis.cycle_agent(&agents);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 2).expect("date")
    }

    fn lead(id: &str, status: &str) -> LeadRecord {
        LeadRecord::new(None)
            .with_field("Record_ID", id)
            .with_field("Status", status)
            .with_field("Agent Name", "Haziq")
    }

    fn data(ids: &[(&str, &str)]) -> ManagerData {
        ManagerData {
            billing: ids.iter().map(|(id, status)| lead(id, status)).collect(),
            ..ManagerData::default()
        }
    }

    fn loaded_dashboard() -> ManagerDashboard {
        let mut dashboard = ManagerDashboard::new(Some("tok".to_string()), today());
        assert_eq!(dashboard.begin_fetch().as_deref(), Some("tok"));
        dashboard.complete_fetch(Ok(data(&[
            ("A1", "Submitted"),
            ("A2", "Charged"),
            ("A3", " submitted "),
        ])));
        dashboard
    }

    #[test]
    fn pending_cards_are_submitted_newest_first() {
        let dashboard = loaded_dashboard();
        let ids: Vec<&str> = dashboard
            .pending_cards()
            .iter()
            .filter_map(|record| record.business_id())
            .collect();
        assert_eq!(ids, vec!["A3", "A1"]);
    }

    fn start(
        dashboard: &mut ManagerDashboard,
        index: usize,
        decision: Decision,
    ) -> (CardKey, StatusChange) {
        match dashboard.begin_status_change(index, decision) {
            StatusStart::Send(key, change) => (key, change),
            other => panic!("expected a request, got {other:?}"),
        }
    }

    #[test]
    fn approve_is_optimistic_and_card_leaves_only_after_refetch() {
        let mut dashboard = loaded_dashboard();
        let (key, change) = start(&mut dashboard, 0, Decision::Approve);
        assert_eq!(change.id, "A3");
        assert_eq!(change.status, "Charged");
        assert!(!dashboard.buttons_enabled(&key));
        assert_eq!(dashboard.button_label(&key, Decision::Approve), "...");
        assert_eq!(dashboard.button_label(&key, Decision::Decline), "Decline");
        assert_eq!(
            dashboard.begin_status_change(0, Decision::Decline),
            StatusStart::Ignored
        );

        let outcome = dashboard.complete_status_change(&key, Decision::Approve, Ok("ok".into()));
        assert_eq!(outcome.cue, Some(SoundCue::Money));
        assert!(outcome.schedule_refetch);
        assert_eq!(dashboard.card_state(&key), CardState::Fading);
        assert_eq!(dashboard.pending_cards().len(), 2);

        assert!(dashboard.begin_fetch().is_some());
        dashboard.complete_fetch(Ok(data(&[("A1", "Submitted"), ("A3", "Charged")])));
        assert_eq!(dashboard.pending_cards().len(), 1);
        assert_eq!(dashboard.card_state(&key), CardState::Idle);
    }

    #[test]
    fn failed_status_change_rolls_back() {
        let mut dashboard = loaded_dashboard();
        let (key, _) = start(&mut dashboard, 1, Decision::Decline);

        let outcome = dashboard.complete_status_change(
            &key,
            Decision::Decline,
            Err(ApiError::Rejected("Row locked".to_string())),
        );
        assert_eq!(
            outcome.feedback.map(|f| f.text),
            Some("Error: Row locked".to_string())
        );
        assert!(!outcome.schedule_refetch);
        assert!(dashboard.buttons_enabled(&key));
        assert_eq!(dashboard.button_label(&key, Decision::Decline), "Decline");

        dashboard.begin_status_change(1, Decision::Decline);
        let outcome = dashboard.complete_status_change(
            &key,
            Decision::Decline,
            Err(ApiError::Status { status: 500 }),
        );
        assert_eq!(
            outcome.feedback.map(|f| f.text),
            Some(STATUS_TRANSPORT_FAILURE.to_string())
        );
        assert_eq!(outcome.cue, None);
    }

    #[test]
    fn duplicate_ids_keep_separate_buttons() {
        let mut dashboard = ManagerDashboard::new(Some("tok".to_string()), today());
        dashboard.begin_fetch();
        dashboard.complete_fetch(Ok(ManagerData {
            billing: vec![
                LeadRecord::new(Some(4))
                    .with_field("Record_ID", "A100")
                    .with_field("Status", "Submitted"),
                LeadRecord::new(Some(9))
                    .with_field("Record_ID", "A100")
                    .with_field("Status", "Submitted"),
            ],
            ..ManagerData::default()
        }));
        let cards = dashboard.pending_cards();
        let first = dashboard.card_key(0, cards[0]);
        let second = dashboard.card_key(1, cards[1]);
        assert_ne!(first, second);
        assert_eq!(first.slot, CardSlot::Row(9));

        let (pressed, change) = start(&mut dashboard, 0, Decision::Approve);
        assert_eq!(pressed, first);
        assert_eq!(change.id, "A100");
        assert!(!dashboard.buttons_enabled(&first));
        assert!(dashboard.buttons_enabled(&second));

        let (other, _) = start(&mut dashboard, 1, Decision::Decline);
        assert_eq!(other, second);
        assert_eq!(dashboard.button_label(&first, Decision::Approve), "...");
        assert_eq!(dashboard.button_label(&second, Decision::Decline), "...");
    }

    #[test]
    fn card_without_id_is_reported_not_sent() {
        let mut dashboard = ManagerDashboard::new(Some("tok".to_string()), today());
        dashboard.begin_fetch();
        dashboard.complete_fetch(Ok(ManagerData {
            billing: vec![LeadRecord::new(Some(3)).with_field("Status", "Submitted")],
            ..ManagerData::default()
        }));
        assert_eq!(
            dashboard.begin_status_change(0, Decision::Approve),
            StatusStart::MissingId
        );
        let key = dashboard.card_key(0, dashboard.pending_cards()[0]);
        assert!(dashboard.buttons_enabled(&key));
        assert_eq!(key.id_label(), "-");
    }

    #[test]
    fn failed_refetch_keeps_cache_and_queued_fetch_runs_next() {
        let mut dashboard = loaded_dashboard();
        assert!(dashboard.begin_fetch().is_some());
        assert!(dashboard.begin_fetch().is_none());

        let next = dashboard.complete_fetch(Err(ApiError::Transport("reset".to_string())));
        assert_eq!(next.as_deref(), Some("tok"));
        assert_eq!(dashboard.pending_cards().len(), 2);
        assert!(dashboard.is_fetching());
    }

    #[test]
    fn rejected_token_logs_out() {
        let mut dashboard = loaded_dashboard();
        dashboard.begin_fetch();
        dashboard.complete_fetch(Err(ApiError::Status { status: 401 }));
        assert!(!dashboard.is_logged_in());
        assert!(dashboard.pending_cards().is_empty());
        assert!(dashboard.begin_fetch().is_none());
    }

    #[test]
    fn login_flow() {
        let mut dashboard = ManagerDashboard::new(None, today());
        assert!(dashboard.begin_fetch().is_none());
        assert!(dashboard.begin_login().is_none());
        assert!(dashboard.login.failed());

        dashboard.login.user_id = "boss".to_string();
        dashboard.login.password = "secret".to_string();
        assert_eq!(
            dashboard.begin_login(),
            Some(("boss".to_string(), "secret".to_string()))
        );
        assert!(dashboard.begin_login().is_none());

        assert!(dashboard
            .complete_login(Err(ApiError::Rejected("Invalid credentials".into())))
            .is_none());
        assert!(dashboard.login.failed());

        dashboard.begin_login();
        let token = dashboard.complete_login(Ok("tok-9".to_string()));
        assert_eq!(token.as_deref(), Some("tok-9"));
        assert!(dashboard.is_logged_in());
        assert!(dashboard.login.password.is_empty());
    }
}
