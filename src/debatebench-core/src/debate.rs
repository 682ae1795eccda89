//! Debate instances and their speeches.
//!
//! A [`DebateInstance`] is a plain serializable value. All state changes go
//! through the methods here so the lifecycle and turn order cannot be broken
//! by callers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::debate_format::{PromptStyle, PublicForumFormat, SpeechType, TURN_ORDER};
use crate::error::DebateError;
use crate::participant::{ModelAssignment, Side};
use crate::text::count_words;

/// Lifecycle state of a debate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DebateStatus {
    Pending,
    Running,
    Complete,
    Error,
}

impl fmt::Display for DebateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DebateStatus::Pending => "pending",
            DebateStatus::Running => "running",
            DebateStatus::Complete => "complete",
            DebateStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single delivered speech.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Speech {
    pub side: Side,
    pub speech_type: SpeechType,
    /// Model that produced the speech.
    pub model: String,
    pub content: String,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Speech {
    pub fn new(
        speech_type: SpeechType,
        model: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            side: speech_type.side(),
            speech_type,
            model: model.into(),
            word_count: count_words(&content),
            content,
            created_at: Utc::now(),
        }
    }
}

/// One debate under the fixed protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebateInstance {
    pub id: Uuid,
    pub resolution: String,
    pub pro_model: String,
    pub con_model: String,
    pub temperature: f32,
    pub prompt_style: PromptStyle,
    pub status: DebateStatus,
    pub speeches: Vec<Speech>,
    pub pair_id: Uuid,
    pub model_assignment: ModelAssignment,
    pub created_at: DateTime<Utc>,
    /// Reason attached when `status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DebateInstance {
    /// Create a `pending` debate.
    pub fn new(
        resolution: impl Into<String>,
        pro_model: impl Into<String>,
        con_model: impl Into<String>,
        temperature: f32,
        prompt_style: PromptStyle,
        pair_id: Uuid,
        model_assignment: ModelAssignment,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            resolution: resolution.into(),
            pro_model: pro_model.into(),
            con_model: con_model.into(),
            temperature,
            prompt_style,
            status: DebateStatus::Pending,
            speeches: Vec::new(),
            pair_id,
            model_assignment,
            created_at: Utc::now(),
            error: None,
        }
    }

    pub fn model_for(&self, side: Side) -> &str {
        match side {
            Side::Pro => &self.pro_model,
            Side::Con => &self.con_model,
        }
    }

    /// The speech type due next, or `None` once all six are delivered.
    pub fn next_speech_type(&self) -> Option<SpeechType> {
        SpeechType::at(self.speeches.len())
    }

    pub fn is_complete(&self) -> bool {
        self.status == DebateStatus::Complete
    }

    /// `pending` -> `running`. Returns true on the actual transition.
    pub fn start(&mut self) -> Result<bool, DebateError> {
        match self.status {
            DebateStatus::Pending => {
                self.status = DebateStatus::Running;
                Ok(true)
            }
            DebateStatus::Running => Ok(false),
            other => Err(DebateError::Sequencing(format!(
                "debate {} cannot start from status {}",
                self.id, other
            ))),
        }
    }

    /// Append the next speech. The type must be the one due in the fixed order
    /// and the debate must be running; the sixth speech completes it.
    pub fn push_speech(&mut self, speech: Speech) -> Result<(), DebateError> {
        if self.status != DebateStatus::Running {
            return Err(DebateError::Sequencing(format!(
                "debate {} is {}, not running",
                self.id, self.status
            )));
        }
        let expected = self.next_speech_type().ok_or_else(|| {
            DebateError::Sequencing(format!("debate {} already has all speeches", self.id))
        })?;
        if speech.speech_type != expected {
            return Err(DebateError::Sequencing(format!(
                "expected {}, got {}",
                expected, speech.speech_type
            )));
        }
        self.speeches.push(speech);
        if self.speeches.len() == TURN_ORDER.len() {
            self.status = DebateStatus::Complete;
        }
        Ok(())
    }

    /// Irrevocably mark the debate as failed. Delivered speeches are kept.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.status != DebateStatus::Complete {
            self.status = DebateStatus::Error;
            self.error = Some(reason.into());
        }
    }

    /// Plain-text transcript shown to judges.
    ///
    /// Model identities are left out so judges see sides, not vendors.
    pub fn transcript(&self, format: &PublicForumFormat) -> String {
        let mut lines = vec![
            format!("Resolution: {}", self.resolution),
            "=".repeat(80),
        ];
        for speech in &self.speeches {
            lines.push(String::new());
            lines.push(format!("[{}]", speech.speech_type.as_str().to_uppercase()));
            lines.push(format!(
                "Word count: {}/{}",
                speech.word_count,
                format.word_limit(speech.speech_type)
            ));
            lines.push(speech.content.clone());
            lines.push("-".repeat(80));
        }
        lines.join("\n")
    }
}
