//! Portal x event filter for realtime lead events.

use crate::notifications::Tone;
use lead_core::events::{ChatMessage, RealtimeEvent};
use lead_core::{LeadType, Portal, STATUS_CHARGED};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundCue {
    Money,
    Edit,
    Message,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reaction {
    pub cue: SoundCue,
    pub text: String,
    pub tone: Tone,
    pub refresh_manager_data: bool,
}

/// Whether `portal` reacts to `event` at all.
pub fn admits(portal: Portal, event: &RealtimeEvent) -> bool {
    let lead_type = event.lead_type();
    match (portal, event) {
        (Portal::Manager, _) => true,
        (Portal::Other, _) => false,
        (_, RealtimeEvent::NewLead(_)) => false,
        (Portal::Billing, RealtimeEvent::StatusUpdate(_)) => lead_type == LeadType::Billing,
        (Portal::Insurance, RealtimeEvent::StatusUpdate(_)) => lead_type == LeadType::Insurance,
        (Portal::Billing, RealtimeEvent::LeadEdited(_)) => lead_type == LeadType::Billing,
        (Portal::Insurance, RealtimeEvent::LeadEdited(_)) => false,
    }
}

pub fn dispatch(portal: Portal, event: &RealtimeEvent) -> Option<Reaction> {
    if !admits(portal, event) {
        return None;
    }
    let manager = portal == Portal::Manager;
    let reaction = match event {
        RealtimeEvent::NewLead(payload) => Reaction {
            cue: SoundCue::Money,
            text: format!(
                "New {} Lead:\n{} — {}",
                payload.lead_type, payload.agent, payload.amount
            ),
            tone: Tone::Success,
            refresh_manager_data: manager,
        },
        RealtimeEvent::StatusUpdate(payload) => {
            let charged = payload.status.trim() == STATUS_CHARGED;
            Reaction {
                cue: if charged {
                    SoundCue::Money
                } else {
                    SoundCue::Message
                },
                text: format!(
                    "Lead Updated: {} is now {}",
                    payload.client,
                    payload.status.to_uppercase()
                ),
                tone: if charged { Tone::Success } else { Tone::Error },
                refresh_manager_data: manager,
            }
        }
        RealtimeEvent::LeadEdited(payload) => Reaction {
            cue: SoundCue::Edit,
            text: format!("Lead Edited (ID: {})", payload.id),
            tone: Tone::Warning,
            refresh_manager_data: false,
        },
    };
    Some(reaction)
}

/// Live chat is strict: the message must name the portal's department.
pub fn admits_chat(portal: Portal, message: &ChatMessage) -> bool {
    match (portal.department(), message.dept.as_deref()) {
        (Some(department), Some(dept)) => dept.trim().eq_ignore_ascii_case(department.as_str()),
        _ => false,
    }
}
