//! The fixed Public Forum debate format.
//!
//! Six speeches in a fixed order, each with an advisory word limit, and three
//! prompt styles used for sensitivity studies. The order never changes with
//! the prompt style or the models involved.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DebateError;
use crate::participant::Side;

/// One of the six fixed slots in the debate protocol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SpeechType {
    ProConstructive,
    ConConstructive,
    ProRebuttal,
    ConRebuttal,
    ProSummary,
    ConSummary,
}

/// Canonical speaking order.
pub const TURN_ORDER: [SpeechType; 6] = [
    SpeechType::ProConstructive,
    SpeechType::ConConstructive,
    SpeechType::ProRebuttal,
    SpeechType::ConRebuttal,
    SpeechType::ProSummary,
    SpeechType::ConSummary,
];

/// Stage of the debate a speech belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechPhase {
    Constructive,
    Rebuttal,
    Summary,
}

impl SpeechType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechType::ProConstructive => "pro_constructive",
            SpeechType::ConConstructive => "con_constructive",
            SpeechType::ProRebuttal => "pro_rebuttal",
            SpeechType::ConRebuttal => "con_rebuttal",
            SpeechType::ProSummary => "pro_summary",
            SpeechType::ConSummary => "con_summary",
        }
    }

    /// The side is encoded in the type's prefix.
    pub fn side(&self) -> Side {
        match self {
            SpeechType::ProConstructive | SpeechType::ProRebuttal | SpeechType::ProSummary => {
                Side::Pro
            }
            _ => Side::Con,
        }
    }

    pub fn phase(&self) -> SpeechPhase {
        match self {
            SpeechType::ProConstructive | SpeechType::ConConstructive => SpeechPhase::Constructive,
            SpeechType::ProRebuttal | SpeechType::ConRebuttal => SpeechPhase::Rebuttal,
            SpeechType::ProSummary | SpeechType::ConSummary => SpeechPhase::Summary,
        }
    }

    /// Speech type expected at position `index`, if the debate is not over.
    pub fn at(index: usize) -> Option<SpeechType> {
        TURN_ORDER.get(index).copied()
    }
}

impl fmt::Display for SpeechType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instruction template family used for debater prompts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    #[default]
    Standard,
    /// Standard plus explicit clash instructions in rebuttals.
    Structured,
    /// Minimal structure.
    Freeform,
}

impl PromptStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStyle::Standard => "standard",
            PromptStyle::Structured => "structured",
            PromptStyle::Freeform => "freeform",
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptStyle {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(PromptStyle::Standard),
            "structured" => Ok(PromptStyle::Structured),
            "freeform" => Ok(PromptStyle::Freeform),
            other => Err(DebateError::Configuration(format!(
                "Unknown prompt style '{}'. Available styles: standard, structured, freeform",
                other
            ))),
        }
    }
}

/// Advisory word limit per speech type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WordLimits {
    pub pro_constructive: u32,
    pub con_constructive: u32,
    pub pro_rebuttal: u32,
    pub con_rebuttal: u32,
    pub pro_summary: u32,
    pub con_summary: u32,
}

impl Default for WordLimits {
    fn default() -> Self {
        Self {
            pro_constructive: 300,
            con_constructive: 300,
            pro_rebuttal: 250,
            con_rebuttal: 250,
            pro_summary: 200,
            con_summary: 200,
        }
    }
}

impl WordLimits {
    pub fn get(&self, speech_type: SpeechType) -> u32 {
        match speech_type {
            SpeechType::ProConstructive => self.pro_constructive,
            SpeechType::ConConstructive => self.con_constructive,
            SpeechType::ProRebuttal => self.pro_rebuttal,
            SpeechType::ConRebuttal => self.con_rebuttal,
            SpeechType::ProSummary => self.pro_summary,
            SpeechType::ConSummary => self.con_summary,
        }
    }
}

/// System prompt sent with every speech request.
pub const DEBATER_SYSTEM_PROMPT: &str =
    "You are a skilled debater participating in a structured debate.";

/// Public Forum format with configurable word limits.
#[derive(Debug, Clone, Default)]
pub struct PublicForumFormat {
    word_limits: WordLimits,
}

impl PublicForumFormat {
    pub fn new(word_limits: WordLimits) -> Self {
        Self { word_limits }
    }

    pub fn name(&self) -> &str {
        "public_forum"
    }

    pub fn display_name(&self) -> &str {
        "Public Forum Debate"
    }

    pub fn word_limit(&self, speech_type: SpeechType) -> u32 {
        self.word_limits.get(speech_type)
    }

    /// Token budget for a speech: twice the word limit so the model can
    /// finish its last sentence.
    pub fn max_tokens(&self, speech_type: SpeechType) -> u32 {
        self.word_limit(speech_type).saturating_mul(2)
    }

    /// Build the user prompt for the next speech.
    ///
    /// `previous` is the content of every speech already delivered, in
    /// order. The result depends only on its inputs.
    pub fn speech_prompt(
        &self,
        style: PromptStyle,
        resolution: &str,
        speech_type: SpeechType,
        previous: &[&str],
    ) -> String {
        match style {
            PromptStyle::Standard => self.standard_prompt(resolution, speech_type, previous, false),
            PromptStyle::Structured => {
                self.standard_prompt(resolution, speech_type, previous, true)
            }
            PromptStyle::Freeform => self.freeform_prompt(resolution, speech_type, previous),
        }
    }

    fn standard_prompt(
        &self,
        resolution: &str,
        speech_type: SpeechType,
        previous: &[&str],
        emphasize_clash: bool,
    ) -> String {
        let side = speech_type.side();
        let limit = self.word_limit(speech_type);

        let mut prompt = format!(
            r#"You are participating in a Public Forum debate.

Resolution: {resolution}
Your side: {side_name} ({side})
Speech type: {speech_type}

WORD LIMIT: aim for approximately {limit} words.

Guidelines:
- Make clear, well-structured arguments
- Use evidence and reasoning
- Respond to previous arguments when applicable
- Write in plain text only (no markdown, LaTeX, or special formatting)
"#,
            side_name = side.display_name(),
        );

        prompt.push('\n');
        prompt.push_str(match speech_type.phase() {
            SpeechPhase::Constructive => {
                "This is your constructive speech. Present the core arguments for your side.\n\
                 - State your main claims clearly\n\
                 - Support them with reasoning and evidence\n\
                 - Establish a framework for evaluating the debate\n"
            }
            SpeechPhase::Rebuttal => {
                "This is your rebuttal speech. Respond to your opponent's arguments.\n\
                 - Address their main points directly\n\
                 - Refute their claims with counter-evidence and reasoning\n\
                 - Rebuild your own arguments that were attacked\n"
            }
            SpeechPhase::Summary => {
                "This is your summary speech. Synthesize the debate and make your final case.\n\
                 - Summarize the key points of clash\n\
                 - Weigh impacts and explain why your side wins\n\
                 - Make your final persuasive appeal\n"
            }
        });

        if !previous.is_empty() {
            prompt.push_str("\nPrevious speeches in the debate:\n");
            for (i, speech) in previous.iter().enumerate() {
                prompt.push_str(&format!("\n--- Speech {} ---\n{}\n", i + 1, speech));
            }
        }

        if emphasize_clash && speech_type.phase() == SpeechPhase::Rebuttal {
            prompt.push_str(
                "\nIMPORTANT: You must directly clash with your opponent's arguments. \
                 For each major point they made, either:\n\
                 - Show why their evidence is flawed\n\
                 - Show why their reasoning is incorrect\n\
                 - Show why their impacts are outweighed by yours\n",
            );
        }

        prompt.push_str(&format!(
            "\nNow write your {} speech ({} side). Stay close to {} words.",
            speech_type, side, limit
        ));
        prompt
    }

    fn freeform_prompt(
        &self,
        resolution: &str,
        speech_type: SpeechType,
        previous: &[&str],
    ) -> String {
        let limit = self.word_limit(speech_type);
        let mut prompt = format!(
            r#"You are arguing the {side_name} side of this resolution: {resolution}

Write a {speech_type} speech explaining why your side is correct, in roughly {limit} words.
Write in plain text only (no markdown, LaTeX, or special formatting).
"#,
            side_name = speech_type.side().display_name(),
        );

        if !previous.is_empty() {
            prompt.push_str("\nThe debate so far:\n");
            for speech in previous {
                prompt.push_str(speech);
                prompt.push_str("\n\n");
            }
            prompt.push_str("Respond as you see fit.\n");
        }
        prompt
    }

    /// Human-readable summary of turn order and limits.
    pub fn protocol_summary(&self) -> String {
        let mut lines = vec![
            format!("DebateBench Protocol - {}", self.display_name()),
            "=".repeat(50),
            String::new(),
            "Fixed Turn Order:".to_string(),
        ];
        for (i, speech_type) in TURN_ORDER.iter().enumerate() {
            lines.push(format!(
                "  {}. {}: {} words",
                i + 1,
                speech_type,
                self.word_limit(*speech_type)
            ));
        }
        lines.join("\n")
    }
}
