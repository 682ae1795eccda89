//! Judge prompt variants.
//!
//! Each variant frames the evaluation differently but ends with the same
//! rubric and JSON output contract, so verdicts from every variant parse
//! the same way.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DebateError;
use crate::judgment::{Category, ScoreScale};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JudgePromptVariant {
    /// `p0`: full analysis across all dimensions.
    #[serde(rename = "p0")]
    Comprehensive,
    /// `p1`: who won the key clashes.
    #[serde(rename = "p1")]
    WinnerFocused,
    /// `p2`: logical soundness and evidence.
    #[serde(rename = "p2")]
    ArgumentQuality,
}

impl JudgePromptVariant {
    pub const ALL: [JudgePromptVariant; 3] = [
        JudgePromptVariant::Comprehensive,
        JudgePromptVariant::WinnerFocused,
        JudgePromptVariant::ArgumentQuality,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            JudgePromptVariant::Comprehensive => "p0",
            JudgePromptVariant::WinnerFocused => "p1",
            JudgePromptVariant::ArgumentQuality => "p2",
        }
    }

    fn preamble(&self) -> &'static str {
        match self {
            JudgePromptVariant::Comprehensive => {
                "You are an experienced debate judge evaluating a Public Forum debate. \
                 Analyze the debate thoroughly and determine a winner.\n\n\
                 Consider argument quality, clash and rebuttal, impact weighing, \
                 organization, and strategic choices. Be objective and balanced."
            }
            JudgePromptVariant::WinnerFocused => {
                "You are a debate judge. Evaluate this Public Forum debate and determine the winner.\n\n\
                 Focus on:\n\
                 - Which side won the most important arguments?\n\
                 - Which side did better impact comparison and weighing?\n\
                 - Which side addressed the clash more effectively?"
            }
            JudgePromptVariant::ArgumentQuality => {
                "You are a debate judge focusing on argument quality and logical reasoning.\n\n\
                 Evaluate each speech for:\n\
                 - Logical soundness: are the arguments internally consistent and well-reasoned?\n\
                 - Evidence quality: how strong is the factual support?\n\
                 - Relevance: do arguments directly address the resolution?\n\
                 - Depth: how thoroughly are arguments developed?"
            }
        }
    }

    /// Build the full judge prompt. Deterministic in its inputs.
    pub fn render(&self, transcript: &str, scale: &ScoreScale) -> String {
        let rubric: Vec<String> = Category::ALL
            .iter()
            .map(|c| format!("- {}", c.as_str()))
            .collect();
        let score_fields: Vec<String> = Category::ALL
            .iter()
            .map(|c| format!("\"{}\": {{\"PRO\": n, \"CON\": n}}", c.as_str()))
            .collect();

        format!(
            r#"{preamble}

{transcript}

Score each side in every rubric category on a scale from {min} to {max}:
{rubric}

Respond with a single JSON object and nothing else, in exactly this shape:
{{"winner": "PRO" or "CON", "scores": {{{fields}}}, "confidence": number between 0.0 and 1.0, "short_reason": "at most 100 words"}}"#,
            preamble = self.preamble(),
            min = scale.min,
            max = scale.max,
            rubric = rubric.join("\n"),
            fields = score_fields.join(", "),
        )
    }
}

impl fmt::Display for JudgePromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for JudgePromptVariant {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JudgePromptVariant::ALL
            .into_iter()
            .find(|v| v.id() == s)
            .ok_or_else(|| {
                DebateError::Configuration(format!(
                    "Unknown judge prompt '{}'. Available prompts: {}",
                    s,
                    available_prompts().join(", ")
                ))
            })
    }
}

/// List all judge prompt ids.
pub fn available_prompts() -> Vec<&'static str> {
    JudgePromptVariant::ALL.iter().map(|v| v.id()).collect()
}
