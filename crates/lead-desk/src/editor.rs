//! Search, disambiguation and submit flow of the lead form.
//!
//! Every request has exactly one completion method, and each completion
//! method restores its control before looking at the outcome.

use crate::form::{FormField, LeadForm};
use crate::notifications::Tone;
use lead_api::ApiError;
use lead_core::{Candidate, LeadType, SaveLead, SearchResult, TimestampMode};
use tracing::{info, warn};

pub const SEARCH_IDLE_LABEL: &str = "Find";
pub const SEARCH_BUSY_LABEL: &str = "...";
pub const MULTIPLE_IN_MANAGER: &str =
    "Multiple records found. Please use the Billing/Insurance portal to edit specific duplicates.";
pub const TRANSPORT_FAILURE: &str = "Server Error. Check console.";

/// Which surface the editor serves; the manager edits existing leads only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorSurface {
    Portal,
    Manager,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit {
        row_index: Option<u32>,
        original_timestamp: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirm {
    Update,
    Delete,
}

impl Confirm {
    pub fn prompt(&self) -> &'static str {
        match self {
            Confirm::Update => "Are you sure you want to update this record?",
            Confirm::Delete => "Delete this record?",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorRequest {
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
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feedback {
    pub text: String,
    pub tone: Tone,
    pub refresh_manager_data: bool,
}

impl Feedback {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
            refresh_manager_data: false,
        }
    }

    fn with_refresh(mut self) -> Self {
        self.refresh_manager_data = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorAction {
    /// Busy control or nothing to do.
    None,
    Send(EditorRequest),
    Notify(Feedback),
}

#[derive(Debug)]
pub struct LeadEditor {
    surface: EditorSurface,
    lead_type: LeadType,
    pub search_input: String,
    searched_id: String,
    searching: bool,
    candidates: Vec<Candidate>,
    selected_candidate: usize,
    form: LeadForm,
    mode: EditorMode,
    form_visible: bool,
    focused_field: usize,
    timestamp_mode: TimestampMode,
    confirm: Option<Confirm>,
    submitting: bool,
    deleting: bool,
}

impl LeadEditor {
    pub fn new(surface: EditorSurface, lead_type: LeadType) -> Self {
        Self {
            surface,
            lead_type,
            search_input: String::new(),
            searched_id: String::new(),
            searching: false,
            candidates: Vec::new(),
            selected_candidate: 0,
            form: LeadForm::default(),
            mode: EditorMode::Create,
            form_visible: surface == EditorSurface::Portal,
            focused_field: 0,
            timestamp_mode: TimestampMode::Keep,
            confirm: None,
            submitting: false,
            deleting: false,
        }
    }

    pub fn surface(&self) -> EditorSurface {
        self.surface
    }

    pub fn lead_type(&self) -> LeadType {
        self.lead_type
    }

    pub fn form(&self) -> &LeadForm {
        &self.form
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, EditorMode::Edit { .. })
    }

    pub fn form_visible(&self) -> bool {
        self.form_visible
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn selected_candidate(&self) -> usize {
        self.selected_candidate
    }

    pub fn pending_confirm(&self) -> Option<Confirm> {
        self.confirm
    }

    pub fn timestamp_mode(&self) -> TimestampMode {
        self.timestamp_mode
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn is_busy(&self) -> bool {
        self.searching || self.submitting || self.deleting
    }

    pub fn search_label(&self) -> &'static str {
        if self.searching {
            SEARCH_BUSY_LABEL
        } else {
            SEARCH_IDLE_LABEL
        }
    }

    pub fn submit_label(&self) -> &'static str {
        let editing = self.is_editing();
        if self.submitting {
            return if editing { "Updating..." } else { "Submitting..." };
        }
        match (editing, self.lead_type) {
            (false, LeadType::Billing) => "Submit Lead",
            (false, LeadType::Insurance) => "Submit Insurance",
            (true, LeadType::Billing) => "Update Lead",
            (true, LeadType::Insurance) => "Update Record",
        }
    }

    pub fn delete_label(&self) -> &'static str {
        if self.deleting {
            "Deleting..."
        } else {
            "Delete"
        }
    }

    /// The billing order id cannot change once a record is loaded.
    pub fn id_locked(&self) -> bool {
        self.is_editing() && self.lead_type == LeadType::Billing
    }

    pub fn fields(&self) -> Vec<FormField> {
        FormField::for_form(self.lead_type, self.surface == EditorSurface::Manager)
    }

    pub fn focused_field(&self) -> FormField {
        let fields = self.fields();
        fields[self.focused_field.min(fields.len() - 1)]
    }

    pub fn move_focus(&mut self, delta: isize) {
        let len = self.fields().len() as isize;
        let next = (self.focused_field as isize + delta).rem_euclid(len);
        self.focused_field = next as usize;
    }

    pub fn type_char(&mut self, ch: char) {
        let field = self.focused_field();
        if field == FormField::BusinessId && self.id_locked() {
            return;
        }
        self.form.push_char(field, ch);
    }

    pub fn backspace(&mut self) {
        let field = self.focused_field();
        if field == FormField::BusinessId && self.id_locked() {
            return;
        }
        self.form.pop_char(field);
    }

    pub fn set_field(&mut self, field: FormField, value: &str) {
        if field == FormField::BusinessId && self.id_locked() {
            return;
        }
        self.form.set(field, value);
    }

    pub fn toggle_timestamp_mode(&mut self) {
        if !self.is_editing() {
            return;
        }
        self.timestamp_mode = match self.timestamp_mode {
            TimestampMode::Keep => TimestampMode::Now,
            TimestampMode::Now => TimestampMode::Keep,
        };
    }

    /// Manager only; switching the sheet discards the loaded record.
    pub fn set_lead_type(&mut self, lead_type: LeadType) {
        if self.is_busy() || self.surface != EditorSurface::Manager || lead_type == self.lead_type {
            return;
        }
        self.lead_type = lead_type;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.form = LeadForm::default();
        self.mode = EditorMode::Create;
        self.form_visible = self.surface == EditorSurface::Portal;
        self.focused_field = 0;
        self.timestamp_mode = TimestampMode::Keep;
        self.candidates.clear();
        self.selected_candidate = 0;
        self.confirm = None;
    }

    fn empty_id_message(&self) -> &'static str {
        match (self.surface, self.lead_type) {
            (EditorSurface::Manager, _) => "Enter ID",
            (EditorSurface::Portal, LeadType::Billing) => "Please enter an Order ID",
            (EditorSurface::Portal, LeadType::Insurance) => "Please enter a Record ID",
        }
    }

    pub fn begin_search(&mut self) -> EditorAction {
        if self.is_busy() {
            return EditorAction::None;
        }
        let id = self.search_input.trim().to_string();
        if id.is_empty() {
            return EditorAction::Notify(Feedback::new(self.empty_id_message(), Tone::Warning));
        }
        self.searching = true;
        self.candidates.clear();
        self.selected_candidate = 0;
        self.searched_id = id.clone();
        EditorAction::Send(EditorRequest::Search {
            lead_type: self.lead_type,
            id,
            row_index: None,
        })
    }

    pub fn move_candidate(&mut self, delta: isize) {
        if self.candidates.is_empty() {
            return;
        }
        let len = self.candidates.len() as isize;
        self.selected_candidate =
            (self.selected_candidate as isize + delta).rem_euclid(len) as usize;
    }

    /// Second step: re-query the searched id pinned to one candidate's row.
    pub fn choose_candidate(&mut self, index: usize) -> EditorAction {
        if self.is_busy() {
            return EditorAction::None;
        }
        let Some(candidate) = self.candidates.get(index) else {
            return EditorAction::None;
        };
        let row_index = candidate.row_index;
        self.selected_candidate = index;
        self.searching = true;
        info!(
            "lead_candidate_chosen: id={} row_index={row_index}",
            self.searched_id
        );
        EditorAction::Send(EditorRequest::Search {
            lead_type: self.lead_type,
            id: self.searched_id.clone(),
            row_index: Some(row_index),
        })
    }

    pub fn dismiss_candidates(&mut self) {
        if !self.searching {
            self.candidates.clear();
            self.selected_candidate = 0;
        }
    }

    pub fn complete_search(&mut self, result: Result<SearchResult, ApiError>) -> EditorAction {
        self.searching = false;
        match result {
            Ok(SearchResult::Single(record)) => {
                self.candidates.clear();
                self.selected_candidate = 0;
                self.form = LeadForm::populate(&record);
                if self.form.business_id.is_empty() {
                    self.form.business_id = self.searched_id.clone();
                }
                self.mode = EditorMode::Edit {
                    row_index: record.row_index,
                    original_timestamp: record.timestamp().map(str::to_string),
                };
                self.timestamp_mode = TimestampMode::Keep;
                self.form_visible = true;
                self.focused_field = 0;
                EditorAction::None
            }
            Ok(SearchResult::Multiple(candidates)) if candidates.is_empty() => {
                EditorAction::Notify(Feedback::new("Lead not found", Tone::Error))
            }
            Ok(SearchResult::Multiple(candidates)) => match self.surface {
                EditorSurface::Portal => {
                    self.candidates = candidates;
                    self.selected_candidate = 0;
                    EditorAction::None
                }
                EditorSurface::Manager => {
                    EditorAction::Notify(Feedback::new(MULTIPLE_IN_MANAGER, Tone::Warning))
                }
            },
            Ok(SearchResult::NotFound { message }) => {
                if self.surface == EditorSurface::Manager {
                    self.reset();
                }
                EditorAction::Notify(Feedback::new(message, Tone::Error))
            }
            Err(err) => {
                warn!("lead_search_failed: id={} error={err}", self.searched_id);
                EditorAction::Notify(Feedback::new("Error searching for lead", Tone::Error))
            }
        }
    }

    /// Create goes straight out; updates wait for confirmation.
    pub fn request_submit(&mut self) -> EditorAction {
        if self.is_busy() || self.confirm.is_some() {
            return EditorAction::None;
        }
        if self.is_editing() {
            self.confirm = Some(Confirm::Update);
            return EditorAction::None;
        }
        if self.surface == EditorSurface::Manager {
            return EditorAction::None;
        }
        let save = self.build_save(chrono::Utc::now().timestamp_millis());
        self.submitting = true;
        EditorAction::Send(EditorRequest::Save(save))
    }

    pub fn request_delete(&mut self) -> EditorAction {
        if self.surface != EditorSurface::Manager
            || !self.is_editing()
            || self.is_busy()
            || self.confirm.is_some()
        {
            return EditorAction::None;
        }
        self.confirm = Some(Confirm::Delete);
        EditorAction::None
    }

    pub fn cancel_confirm(&mut self) {
        self.confirm = None;
    }

    pub fn confirm(&mut self) -> EditorAction {
        let Some(confirm) = self.confirm.take() else {
            return EditorAction::None;
        };
        if self.is_busy() {
            return EditorAction::None;
        }
        match confirm {
            Confirm::Update => {
                let save = self.build_save(chrono::Utc::now().timestamp_millis());
                self.submitting = true;
                EditorAction::Send(EditorRequest::Save(save))
            }
            Confirm::Delete => {
                let id = self.form.business_id.trim().to_string();
                if id.is_empty() {
                    return EditorAction::Notify(Feedback::new(
                        self.empty_id_message(),
                        Tone::Warning,
                    ));
                }
                self.deleting = true;
                EditorAction::Send(EditorRequest::Delete {
                    lead_type: self.lead_type,
                    id,
                })
            }
        }
    }

    pub fn build_save(&self, now_millis: i64) -> SaveLead {
        let mut save = self.form.to_save(self.lead_type);
        match &self.mode {
            EditorMode::Create => {
                if self.lead_type == LeadType::Insurance && save.business_id.is_empty() {
                    save.business_id = format!("INS-{now_millis}");
                }
            }
            EditorMode::Edit {
                row_index,
                original_timestamp,
            } => {
                save.is_edit = true;
                save.row_index = *row_index;
                save.original_timestamp = original_timestamp.clone();
                save.timestamp_mode = self.timestamp_mode;
            }
        }
        if self.surface == EditorSurface::Manager && !self.form.status.trim().is_empty() {
            save.status = Some(self.form.status.trim().to_string());
        }
        save
    }

    pub fn complete_save(&mut self, result: Result<String, ApiError>) -> EditorAction {
        let was_edit = self.is_editing();
        self.submitting = false;
        match result {
            Ok(_) => {
                self.reset();
                self.search_input.clear();
                let text = if was_edit {
                    "Lead Updated Successfully!"
                } else {
                    "Lead Submitted Successfully!"
                };
                let feedback = Feedback::new(text, Tone::Success);
                EditorAction::Notify(match self.surface {
                    EditorSurface::Manager => feedback.with_refresh(),
                    EditorSurface::Portal => feedback,
                })
            }
            Err(err) => EditorAction::Notify(failure_feedback("lead_save_failed", &err)),
        }
    }

    pub fn complete_delete(&mut self, result: Result<String, ApiError>) -> EditorAction {
        self.deleting = false;
        match result {
            Ok(_) => {
                self.reset();
                self.search_input.clear();
                EditorAction::Notify(Feedback::new("Deleted", Tone::Success).with_refresh())
            }
            Err(err) => EditorAction::Notify(failure_feedback("lead_delete_failed", &err)),
        }
    }
}

fn failure_feedback(event: &str, err: &ApiError) -> Feedback {
    match err.rejection() {
        Some(message) => Feedback::new(format!("Error: {message}"), Tone::Error),
        None => {
            warn!("{event}: {err}");
            Feedback::new(TRANSPORT_FAILURE, Tone::Error)
        }
    }
}
