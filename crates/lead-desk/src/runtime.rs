//! Executes `Task`s off the UI loop and reports back through the event channel.

use crate::app::{AppEvent, Task};
use crate::router::SoundCue;
use crossterm::{execute, style::Print};
use lead_api::LeadApi;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Runtime {
    api: Arc<dyn LeadApi>,
    tx: mpsc::Sender<AppEvent>,
    sound: bool,
}

impl Runtime {
    pub fn new(api: Arc<dyn LeadApi>, tx: mpsc::Sender<AppEvent>, sound: bool) -> Self {
        Self { api, tx, sound }
    }

    pub fn spawn_all(&self, tasks: Vec<Task>) {
        for task in tasks {
            self.spawn(task);
        }
    }

    /// Fire and forget; nothing is cancelled once started.
    pub fn spawn(&self, task: Task) {
        match task {
            Task::Sound(cue) => {
                if self.sound {
                    ring(cue);
                }
            }
            Task::Schedule { after, event } => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(*event).await;
                });
            }
            request => {
                let api = Arc::clone(&self.api);
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    if let Some(event) = run(api.as_ref(), request).await {
                        if tx.send(event).await.is_err() {
                            debug!("task_result_dropped: app loop gone");
                        }
                    }
                });
            }
        }
    }
}

/// Performs one request task and wraps its outcome as the matching event.
/// Timers and sounds are not requests and yield `None`.
pub async fn run(api: &dyn LeadApi, task: Task) -> Option<AppEvent> {
    let event = match task {
        Task::Search {
            lead_type,
            id,
            row_index,
        } => AppEvent::Search(api.get_lead(lead_type, &id, row_index).await),
        Task::Save(lead) => AppEvent::Saved(api.save_lead(&lead).await),
        Task::Delete { lead_type, id } => AppEvent::Deleted(api.delete_lead(lead_type, &id).await),
        Task::Login { user_id, password } => {
            AppEvent::LoggedIn(api.manager_login(&user_id, &password).await)
        }
        Task::FetchManagerData { token } => AppEvent::ManagerData(api.manager_data(&token).await),
        Task::UpdateStatus {
            key,
            decision,
            change,
        } => AppEvent::StatusChanged {
            key,
            decision,
            result: api.update_status(&change).await,
        },
        Task::FetchStats => AppEvent::Stats(api.night_stats().await),
        Task::LoadChatHistory => AppEvent::ChatHistory(api.chat_history().await),
        Task::SendChat(message) => AppEvent::ChatSent(api.send_chat(&message).await),
        Task::Schedule { .. } | Task::Sound(_) => return None,
    };
    Some(event)
}

fn ring(cue: SoundCue) {
    let bells = match cue {
        SoundCue::Money => "\x07\x07",
        SoundCue::Edit | SoundCue::Message => "\x07",
    };
    if let Err(err) = execute!(io::stdout(), Print(bells)) {
        warn!("sound_cue_failed: {err}");
    }
}
