//! Application state and the event/task contract with the runtime.
//!
//! `App` never performs I/O. User actions and completed requests go in,
//! `Task`s come out, and the runtime turns each task back into an `AppEvent`.

use crate::chat::{ChatPanel, ChatSend};
use crate::config::Config;
use crate::editor::{EditorAction, EditorRequest, EditorSurface, Feedback, LeadEditor};
use crate::manager::{
    CardKey, ManagerDashboard, StatusStart, MISSING_CARD_ID, REFETCH_DELAY,
};
use crate::notifications::{NotificationFeed, ToastSlot, Tone, NOTIFICATION_TTL, TOAST_TTL};
use crate::push::PushEvent;
use crate::router::{self, SoundCue};
use crate::stats::StatsWidget;
use chrono::{Local, NaiveDate};
use lead_api::{ApiError, OutgoingChat};
use lead_core::events::{ChannelEvent, ChatMessage, RealtimeEvent};
use lead_core::stats::{ManagerData, NightStats};
use lead_core::{Decision, LeadType, Portal, SaveLead, SearchResult, StatusChange};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq)]
pub enum AppEvent {
    Push(PushEvent),
    Search(Result<SearchResult, ApiError>),
    Saved(Result<String, ApiError>),
    Deleted(Result<String, ApiError>),
    LoggedIn(Result<String, ApiError>),
    ManagerData(Result<ManagerData, ApiError>),
    RefetchDue,
    StatusChanged {
        key: CardKey,
        decision: Decision,
        result: Result<String, ApiError>,
    },
    Stats(Result<NightStats, ApiError>),
    ChatHistory(Result<Vec<ChatMessage>, ApiError>),
    ChatSent(Result<(), ApiError>),
    NotificationExpired(u64),
    ToastExpired(u64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Task {
    Search {
        lead_type: LeadType,
        id: String,
        row_index: Option<u32>,
    },
    Save(SaveLead),
    Delete {
        lead_type: LeadType,
        id: String,
    },
    Login {
        user_id: String,
        password: String,
    },
    FetchManagerData {
        token: String,
    },
    UpdateStatus {
        key: CardKey,
        decision: Decision,
        change: StatusChange,
    },
    FetchStats,
    LoadChatHistory,
    SendChat(OutgoingChat),
    /// Deliver `event` back to the app after `after`.
    Schedule {
        after: Duration,
        event: Box<AppEvent>,
    },
    Sound(SoundCue),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushStatus {
    Disabled,
    Connecting,
    Connected,
    Subscribed(String),
    Reconnecting,
}

impl PushStatus {
    pub fn label(&self) -> String {
        match self {
            PushStatus::Disabled => "off".to_string(),
            PushStatus::Connecting => "connecting".to_string(),
            PushStatus::Connected => "connected".to_string(),
            PushStatus::Subscribed(channel) => format!("live ({channel})"),
            PushStatus::Reconnecting => "reconnecting".to_string(),
        }
    }
}

/// Where typed characters go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Browse,
    Search,
    Form,
    Chat,
    Login,
    AnalysisSearch,
}

pub struct App {
    portal: Portal,
    pub editor: LeadEditor,
    pub stats: StatsWidget,
    pub notifications: NotificationFeed,
    pub toast: ToastSlot,
    pub chat: ChatPanel,
    pub manager: ManagerDashboard,
    pub push_status: PushStatus,
    pub status_note: Option<String>,
    pub help_open: bool,
    pub focus: Focus,
    pub scroll: u16,
}

impl App {
    pub fn new(config: &Config, today: NaiveDate) -> Self {
        let portal = config.portal;
        let (surface, lead_type) = match portal.department() {
            Some(department) => (EditorSurface::Portal, department),
            None => (EditorSurface::Manager, LeadType::Billing),
        };
        let push_status = if config.push.is_some() {
            PushStatus::Connecting
        } else {
            PushStatus::Disabled
        };
        let status_note = config
            .push
            .is_none()
            .then(|| "realtime disabled (no PUSHER_KEY); notifications off".to_string());
        let manager_token = match portal {
            Portal::Manager => config.manager_token.clone(),
            _ => None,
        };
        let focus = if portal == Portal::Manager && manager_token.is_none() {
            Focus::Login
        } else {
            Focus::Browse
        };
        Self {
            portal,
            editor: LeadEditor::new(surface, lead_type),
            stats: StatsWidget::new(portal.department().unwrap_or(LeadType::Billing)),
            notifications: NotificationFeed::default(),
            toast: ToastSlot::default(),
            chat: ChatPanel::new(portal.department(), config.agent.clone()),
            manager: ManagerDashboard::new(manager_token, today),
            push_status,
            status_note,
            help_open: false,
            focus,
            scroll: 0,
        }
    }

    pub fn portal(&self) -> Portal {
        self.portal
    }

    /// Billing and insurance portals carry the intake form and chat.
    pub fn is_operator_portal(&self) -> bool {
        self.portal.department().is_some()
    }

    pub fn is_manager(&self) -> bool {
        self.portal == Portal::Manager
    }

    pub fn startup_tasks(&mut self) -> Vec<Task> {
        let mut tasks = self.on_stats_tick();
        if self.chat.needs_history() {
            tasks.push(Task::LoadChatHistory);
        }
        tasks.extend(self.refresh_manager_data());
        tasks
    }

    pub fn on_stats_tick(&mut self) -> Vec<Task> {
        if self.stats.begin_poll() {
            vec![Task::FetchStats]
        } else {
            Vec::new()
        }
    }

    pub fn on_manager_tick(&mut self) -> Vec<Task> {
        self.refresh_manager_data()
    }

    pub fn apply_event(&mut self, event: AppEvent) -> Vec<Task> {
        match event {
            AppEvent::Push(event) => self.apply_push(event),
            AppEvent::Search(result) => {
                let action = self.editor.complete_search(result);
                self.editor_action(action)
            }
            AppEvent::Saved(result) => {
                let action = self.editor.complete_save(result);
                self.editor_action(action)
            }
            AppEvent::Deleted(result) => {
                let action = self.editor.complete_delete(result);
                self.editor_action(action)
            }
            AppEvent::LoggedIn(result) => match self.manager.complete_login(result) {
                Some(token) => {
                    self.focus = Focus::Browse;
                    self.status_note = Some("manager session started".to_string());
                    vec![Task::FetchManagerData { token }]
                }
                None => {
                    if self.manager.login.failed() {
                        self.status_note = Some("Invalid credentials".to_string());
                    }
                    Vec::new()
                }
            },
            AppEvent::ManagerData(result) => {
                let was_logged_in = self.manager.is_logged_in();
                let next = self.manager.complete_fetch(result);
                if was_logged_in && !self.manager.is_logged_in() {
                    self.focus = Focus::Login;
                    self.status_note = Some("session expired; log in again".to_string());
                }
                next.map(|token| vec![Task::FetchManagerData { token }])
                    .unwrap_or_default()
            }
            AppEvent::RefetchDue => self.refresh_manager_data(),
            AppEvent::StatusChanged {
                key,
                decision,
                result,
            } => {
                let outcome = self.manager.complete_status_change(&key, decision, result);
                let mut tasks = Vec::new();
                if let Some(cue) = outcome.cue {
                    tasks.push(Task::Sound(cue));
                }
                if let Some(feedback) = outcome.feedback {
                    tasks.extend(self.show_feedback(feedback));
                }
                if outcome.schedule_refetch {
                    tasks.push(Task::Schedule {
                        after: REFETCH_DELAY,
                        event: Box::new(AppEvent::RefetchDue),
                    });
                }
                tasks
            }
            AppEvent::Stats(result) => {
                self.stats.apply_poll(result, Local::now());
                Vec::new()
            }
            AppEvent::ChatHistory(result) => {
                self.chat.load_history(result);
                Vec::new()
            }
            AppEvent::ChatSent(result) => {
                if let Some(note) = self.chat.complete_send(result) {
                    self.status_note = Some(note);
                }
                Vec::new()
            }
            AppEvent::NotificationExpired(id) => {
                self.notifications.expire(id);
                Vec::new()
            }
            AppEvent::ToastExpired(id) => {
                self.toast.expire(id);
                Vec::new()
            }
        }
    }

    fn apply_push(&mut self, event: PushEvent) -> Vec<Task> {
        match event {
            PushEvent::Connected { socket_id } => {
                debug!("push_socket: {socket_id}");
                self.push_status = PushStatus::Connected;
                Vec::new()
            }
            PushEvent::Subscribed { channel } => {
                info!("push_subscribed: {channel}");
                self.push_status = PushStatus::Subscribed(channel);
                Vec::new()
            }
            PushEvent::Disconnected => {
                self.push_status = PushStatus::Reconnecting;
                Vec::new()
            }
            PushEvent::Channel(ChannelEvent::Lead(event)) => self.route(&event),
            PushEvent::Channel(ChannelEvent::Chat(message)) => {
                if !router::admits_chat(self.portal, &message) {
                    return Vec::new();
                }
                self.chat
                    .receive(message)
                    .map(|cue| vec![Task::Sound(cue)])
                    .unwrap_or_default()
            }
        }
    }

    fn route(&mut self, event: &RealtimeEvent) -> Vec<Task> {
        let Some(reaction) = router::dispatch(self.portal, event) else {
            debug!("push_event_filtered: {} for {}", event.name(), self.portal);
            return Vec::new();
        };
        let mut tasks = vec![
            Task::Sound(reaction.cue),
            self.notify(reaction.text, reaction.tone),
        ];
        if reaction.refresh_manager_data {
            tasks.extend(self.refresh_manager_data());
        }
        tasks
    }

    /// Appends a notification and schedules its own expiry.
    pub fn notify(&mut self, text: impl Into<String>, tone: Tone) -> Task {
        let id = self.notifications.push(text, tone);
        Task::Schedule {
            after: NOTIFICATION_TTL,
            event: Box::new(AppEvent::NotificationExpired(id)),
        }
    }

    fn show_feedback(&mut self, feedback: Feedback) -> Vec<Task> {
        let id = self.toast.show(feedback.text, feedback.tone);
        let mut tasks = vec![Task::Schedule {
            after: TOAST_TTL,
            event: Box::new(AppEvent::ToastExpired(id)),
        }];
        if feedback.refresh_manager_data {
            tasks.extend(self.refresh_manager_data());
        }
        tasks
    }

    fn editor_action(&mut self, action: EditorAction) -> Vec<Task> {
        match action {
            EditorAction::None => Vec::new(),
            EditorAction::Notify(feedback) => self.show_feedback(feedback),
            EditorAction::Send(EditorRequest::Search {
                lead_type,
                id,
                row_index,
            }) => vec![Task::Search {
                lead_type,
                id,
                row_index,
            }],
            EditorAction::Send(EditorRequest::Save(save)) => vec![Task::Save(save)],
            EditorAction::Send(EditorRequest::Delete { lead_type, id }) => {
                vec![Task::Delete { lead_type, id }]
            }
        }
    }

    fn refresh_manager_data(&mut self) -> Vec<Task> {
        if !self.is_manager() {
            return Vec::new();
        }
        self.manager
            .begin_fetch()
            .map(|token| vec![Task::FetchManagerData { token }])
            .unwrap_or_default()
    }

    pub fn search(&mut self) -> Vec<Task> {
        if !self.has_editor() {
            return Vec::new();
        }
        let action = self.editor.begin_search();
        self.editor_action(action)
    }

    pub fn choose_candidate(&mut self) -> Vec<Task> {
        let action = self
            .editor
            .choose_candidate(self.editor.selected_candidate());
        self.editor_action(action)
    }

    pub fn submit(&mut self) -> Vec<Task> {
        if !self.has_editor() {
            return Vec::new();
        }
        let action = self.editor.request_submit();
        self.editor_action(action)
    }

    pub fn request_delete(&mut self) -> Vec<Task> {
        let action = self.editor.request_delete();
        self.editor_action(action)
    }

    pub fn confirm(&mut self) -> Vec<Task> {
        let action = self.editor.confirm();
        self.editor_action(action)
    }

    pub fn reset_editor(&mut self) {
        if self.editor.is_busy() {
            return;
        }
        self.editor.reset();
        self.editor.search_input.clear();
        self.focus = Focus::Browse;
    }

    fn has_editor(&self) -> bool {
        self.portal != Portal::Other
    }

    /// Approve or decline the selected pending card.
    pub fn decide(&mut self, decision: Decision) -> Vec<Task> {
        if !self.is_manager() {
            return Vec::new();
        }
        let index = self.manager.selected_card();
        match self.manager.begin_status_change(index, decision) {
            StatusStart::Send(key, change) => vec![Task::UpdateStatus {
                key,
                decision,
                change,
            }],
            StatusStart::MissingId => {
                self.show_feedback(Feedback::new(MISSING_CARD_ID, Tone::Error))
            }
            StatusStart::Ignored => Vec::new(),
        }
    }

    pub fn login(&mut self) -> Vec<Task> {
        match self.manager.begin_login() {
            Some((user_id, password)) => vec![Task::Login { user_id, password }],
            None => {
                if self.manager.login.failed() {
                    self.status_note = Some("Invalid credentials".to_string());
                }
                Vec::new()
            }
        }
    }

    pub fn logout(&mut self) {
        self.manager.logout();
        self.focus = Focus::Login;
        self.status_note = Some("logged out".to_string());
    }

    /// Manual refresh: manager data on the manager portal, stats elsewhere.
    pub fn refresh(&mut self) -> Vec<Task> {
        let tasks = if self.is_manager() {
            self.refresh_manager_data()
        } else {
            self.on_stats_tick()
        };
        if tasks.is_empty() {
            self.status_note = Some("refresh already in flight".to_string());
        } else {
            self.status_note = Some("refresh queued".to_string());
        }
        tasks
    }

    pub fn send_chat(&mut self) -> Vec<Task> {
        match self.chat.begin_send() {
            ChatSend::Ignored => Vec::new(),
            ChatSend::Refused(message) => self.show_feedback(Feedback::new(message, Tone::Warning)),
            ChatSend::Send(outgoing) => vec![Task::SendChat(outgoing)],
        }
    }

    pub fn toggle_chat(&mut self) {
        if !self.chat.is_enabled() {
            return;
        }
        self.chat.toggle_open();
        if !self.chat.is_open() && self.focus == Focus::Chat {
            self.focus = Focus::Browse;
        }
    }
}
