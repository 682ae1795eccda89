//! Progress events emitted while debates run.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::debate::Speech;
use crate::debate_format::SpeechType;
use crate::participant::{ModelAssignment, Side};

/// Events emitted during a debate. Every event names its debate and seating.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    DebateStarted {
        debate_id: Uuid,
        model_assignment: ModelAssignment,
        resolution: String,
        pro_model: String,
        con_model: String,
    },
    SpeechStarted {
        debate_id: Uuid,
        model_assignment: ModelAssignment,
        speech_type: SpeechType,
        side: Side,
        model: String,
    },
    SpeechComplete {
        debate_id: Uuid,
        model_assignment: ModelAssignment,
        speech: Speech,
    },
    DebateComplete {
        debate_id: Uuid,
        model_assignment: ModelAssignment,
    },
    DebateError {
        debate_id: Uuid,
        model_assignment: ModelAssignment,
        error: String,
        speeches_completed: usize,
    },
}

impl DebateEvent {
    pub fn debate_id(&self) -> Uuid {
        match self {
            DebateEvent::DebateStarted { debate_id, .. }
            | DebateEvent::SpeechStarted { debate_id, .. }
            | DebateEvent::SpeechComplete { debate_id, .. }
            | DebateEvent::DebateComplete { debate_id, .. }
            | DebateEvent::DebateError { debate_id, .. } => *debate_id,
        }
    }

    pub fn model_assignment(&self) -> ModelAssignment {
        match self {
            DebateEvent::DebateStarted { model_assignment, .. }
            | DebateEvent::SpeechStarted { model_assignment, .. }
            | DebateEvent::SpeechComplete { model_assignment, .. }
            | DebateEvent::DebateComplete { model_assignment, .. }
            | DebateEvent::DebateError { model_assignment, .. } => *model_assignment,
        }
    }
}

/// Sink for debate events. Shared by both halves of a pair, so it must be
/// callable from several tasks at once.
pub type DebateCallback = Arc<dyn Fn(DebateEvent) + Send + Sync>;
