// libs/appointment-cell/src/services/chat.rs
use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, ChatMessage, ChatThread, ClockTime, Sender};
use crate::services::proximity::{can_open_channel, minutes_to_appointment};

pub const OPENING_MESSAGE: &str =
    "Hello, your appointment will begin shortly. Write whenever you are ready.";

/// Chat threads keyed by appointment id, created lazily on first access.
#[derive(Debug, Default)]
pub struct ChatRegistry {
    threads: HashMap<Uuid, ChatThread>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the thread, or the not-yet-started thread it would be.
    pub fn snapshot(&self, appointment_id: Uuid) -> ChatThread {
        self.threads
            .get(&appointment_id)
            .cloned()
            .unwrap_or_else(|| ChatThread::new(appointment_id))
    }

    pub fn thread_mut(&mut self, appointment_id: Uuid) -> &mut ChatThread {
        self.threads
            .entry(appointment_id)
            .or_insert_with(|| ChatThread::new(appointment_id))
    }

    /// Starts the thread while the proximity gate is open. Starting a thread
    /// that already started leaves it as is.
    pub fn start(&mut self, appointment: &Appointment, now: NaiveDateTime) -> Result<&ChatThread, AppointmentError> {
        let time = ClockTime::from(now.time());

        if self.threads.get(&appointment.id).is_some_and(|t| t.started) {
            debug!("Chat for appointment {} already started", appointment.id);
            return Ok(&*self.thread_mut(appointment.id));
        }

        if !can_open_channel(appointment, now) {
            let minutes_until = minutes_to_appointment(appointment, now);
            warn!(
                "Chat start refused for appointment {}: {} minutes away",
                appointment.id, minutes_until
            );
            return Err(AppointmentError::ChannelNotYetOpen { minutes_until });
        }

        let thread = self.thread_mut(appointment.id);
        thread.started = true;
        thread.messages.push(ChatMessage {
            id: Uuid::new_v4(),
            at: time,
            from: Sender::Doctor,
            text: OPENING_MESSAGE.to_string(),
        });

        info!("Chat started for appointment {}", appointment.id);
        Ok(&*thread)
    }

    /// Appends to a started thread; the gate is not consulted again.
    pub fn append(
        &mut self,
        appointment_id: Uuid,
        from: Sender,
        text: &str,
        at: ClockTime,
    ) -> Result<ChatMessage, AppointmentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppointmentError::InvalidInput("message text is empty".to_string()));
        }

        let thread = self
            .threads
            .get_mut(&appointment_id)
            .filter(|t| t.started)
            .ok_or(AppointmentError::ThreadNotStarted)?;

        let message = ChatMessage {
            id: Uuid::new_v4(),
            at,
            from,
            text: text.to_string(),
        };
        thread.messages.push(message.clone());

        debug!("Message appended to chat {} ({} total)", appointment_id, thread.messages.len());
        Ok(message)
    }

    pub fn remove(&mut self, appointment_id: Uuid) -> Option<ChatThread> {
        self.threads.remove(&appointment_id)
    }
}
