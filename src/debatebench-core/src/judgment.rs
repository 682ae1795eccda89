//! Judgment records and the judge-output parsing pipeline.
//!
//! Judge output goes through three stages, each usable on its own:
//! 1. [`extract_candidates`] finds JSON objects anywhere in free text,
//! 2. [`parse_verdict`] takes the first one matching the judgment schema,
//! 3. [`RawVerdict::validate`] checks winner, confidence and score ranges.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ParseFailure, ValidationError};
use crate::participant::Side;
use crate::text::strip_reasoning;

/// The four fixed rubric categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ArgumentQuality,
    Evidence,
    Clash,
    Weighing,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::ArgumentQuality,
        Category::Evidence,
        Category::Clash,
        Category::Weighing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ArgumentQuality => "argument_quality",
            Category::Evidence => "evidence",
            Category::Clash => "clash",
            Category::Weighing => "weighing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{"PRO": n, "CON": n}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SideScores {
    #[serde(rename = "PRO")]
    pub pro: f64,
    #[serde(rename = "CON")]
    pub con: f64,
}

impl SideScores {
    pub fn get(&self, side: Side) -> f64 {
        match side {
            Side::Pro => self.pro,
            Side::Con => self.con,
        }
    }
}

/// Per-category scores in wire order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Scores {
    pub argument_quality: SideScores,
    pub evidence: SideScores,
    pub clash: SideScores,
    pub weighing: SideScores,
}

impl Scores {
    pub fn get(&self, category: Category) -> &SideScores {
        match category {
            Category::ArgumentQuality => &self.argument_quality,
            Category::Evidence => &self.evidence,
            Category::Clash => &self.clash,
            Category::Weighing => &self.weighing,
        }
    }

    pub fn score(&self, category: Category, side: Side) -> f64 {
        self.get(category).get(side)
    }
}

/// Inclusive score range judges are asked to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreScale {
    pub min: f64,
    pub max: f64,
}

impl Default for ScoreScale {
    fn default() -> Self {
        Self { min: 1.0, max: 10.0 }
    }
}

impl ScoreScale {
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Judge output as it appears on the wire, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVerdict {
    pub winner: String,
    pub scores: Scores,
    pub confidence: f64,
    #[serde(default)]
    pub short_reason: String,
}

/// A validated judgment in the wire schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub winner: Side,
    pub scores: Scores,
    pub confidence: f64,
    pub short_reason: String,
}

impl RawVerdict {
    pub fn validate(self, scale: &ScoreScale) -> Result<Verdict, ValidationError> {
        let winner: Side = self
            .winner
            .parse()
            .map_err(ValidationError::InvalidWinner)?;

        if !(self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)) {
            return Err(ValidationError::ConfidenceOutOfRange(self.confidence));
        }

        for category in Category::ALL {
            for side in Side::BOTH {
                let value = self.scores.score(category, side);
                if !scale.contains(value) {
                    return Err(ValidationError::ScoreOutOfRange {
                        category: category.to_string(),
                        side: side.to_string(),
                        value,
                        min: scale.min,
                        max: scale.max,
                    });
                }
            }
        }

        Ok(Verdict {
            winner,
            scores: self.scores,
            confidence: self.confidence,
            short_reason: self.short_reason.trim().to_string(),
        })
    }
}

/// Every top-level JSON object embedded in `text`, in order of appearance.
///
/// Reasoning blocks are stripped first so draft JSON inside `<think>` does
/// not count.
pub fn extract_candidates(text: &str) -> Vec<serde_json::Map<String, Value>> {
    let cleaned = strip_reasoning(text);
    let mut found = Vec::new();
    let mut offset = 0;

    while let Some(pos) = cleaned[offset..].find('{') {
        let start = offset + pos;
        let mut stream = serde_json::Deserializer::from_str(&cleaned[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => {
                found.push(map);
                offset = start + stream.byte_offset();
            }
            _ => offset = start + 1,
        }
    }
    found
}

/// Parse free-form judge output into a validated verdict.
///
/// The first object that deserializes into the judgment schema is taken and
/// then validated; a validation failure on it is final.
pub fn parse_verdict(text: &str, scale: &ScoreScale) -> Result<Verdict, ParseFailure> {
    let candidates = extract_candidates(text);
    if candidates.is_empty() {
        return Err(ParseFailure::NoJsonObject);
    }

    let mut first_error = None;
    for candidate in candidates {
        match serde_json::from_value::<RawVerdict>(Value::Object(candidate)) {
            Ok(raw) => return raw.validate(scale).map_err(ParseFailure::from),
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }
    Err(ParseFailure::Malformed(first_error.unwrap_or_default()))
}

/// A judge configuration whose stability is measured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgeConfig {
    pub judge_model: String,
    /// Prompt variant id, e.g. `p0`.
    pub judge_prompt: String,
    pub temperature: f32,
}

impl JudgeConfig {
    pub fn new(
        judge_model: impl Into<String>,
        judge_prompt: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            judge_model: judge_model.into(),
            judge_prompt: judge_prompt.into(),
            temperature,
        }
    }

    /// Stable identifier used for grouping and display.
    pub fn key(&self) -> String {
        format!("{}_{}_t{}", self.judge_model, self.judge_prompt, self.temperature)
    }
}

impl fmt::Display for JudgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} @ {}", self.judge_model, self.judge_prompt, self.temperature)
    }
}

/// One accepted judgment. Never edited after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgmentRecord {
    pub debate_id: Uuid,
    pub judge_config: JudgeConfig,
    pub run_number: u32,
    pub winner: Side,
    pub scores: Scores,
    pub confidence: f64,
    pub short_reason: String,
    pub timestamp: DateTime<Utc>,
}

impl JudgmentRecord {
    pub fn from_verdict(
        debate_id: Uuid,
        judge_config: JudgeConfig,
        run_number: u32,
        verdict: Verdict,
    ) -> Self {
        Self {
            debate_id,
            judge_config,
            run_number,
            winner: verdict.winner,
            scores: verdict.scores,
            confidence: verdict.confidence,
            short_reason: verdict.short_reason,
            timestamp: Utc::now(),
        }
    }

    /// The judgment in the wire schema.
    pub fn verdict(&self) -> Verdict {
        Verdict {
            winner: self.winner,
            scores: self.scores,
            confidence: self.confidence,
            short_reason: self.short_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::judgment_json;

    fn scale() -> ScoreScale {
        ScoreScale::default()
    }

    #[test]
    fn test_parse_plain_json() {
        let verdict = parse_verdict(&judgment_json("PRO", 7.0, 0.8), &scale()).unwrap();
        assert_eq!(verdict.winner, Side::Pro);
        assert_eq!(verdict.scores.clash.con, 7.0);
        assert_eq!(verdict.confidence, 0.8);
        assert_eq!(verdict.short_reason, "Stronger weighing.");
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let text = format!(
            "Here is my decision.\n```json\n{}\n```\nThanks!",
            judgment_json("CON", 6.5, 0.55)
        );
        let verdict = parse_verdict(&text, &scale()).unwrap();
        assert_eq!(verdict.winner, Side::Con);
        assert_eq!(verdict.scores.argument_quality.pro, 6.5);
    }

    #[test]
    fn test_first_schema_match_wins() {
        let text = format!(
            "Notes: {{\"draft\": true}} then {} and later {}",
            judgment_json("CON", 5.0, 0.6),
            judgment_json("PRO", 9.0, 0.9)
        );
        let verdict = parse_verdict(&text, &scale()).unwrap();
        assert_eq!(verdict.winner, Side::Con);
    }

    #[test]
    fn test_reasoning_block_json_is_ignored() {
        let text = format!(
            "<think>{}</think>{}",
            judgment_json("PRO", 5.0, 0.5),
            judgment_json("CON", 5.0, 0.5)
        );
        assert_eq!(parse_verdict(&text, &scale()).unwrap().winner, Side::Con);
    }

    #[test]
    fn test_no_json_is_failure() {
        assert_eq!(
            parse_verdict("The winner is PRO.", &scale()),
            Err(ParseFailure::NoJsonObject)
        );
    }

    #[test]
    fn test_missing_scores_is_malformed() {
        let result = parse_verdict(r#"{"winner": "PRO", "confidence": 0.5}"#, &scale());
        assert!(matches!(result, Err(ParseFailure::Malformed(_))));
    }

    #[test]
    fn test_invalid_winner() {
        let result = parse_verdict(&judgment_json("TIE", 5.0, 0.5), &scale());
        assert_eq!(
            result,
            Err(ParseFailure::Invalid(ValidationError::InvalidWinner("TIE".into())))
        );
        let lowercase = parse_verdict(&judgment_json("pro", 5.0, 0.5), &scale());
        assert!(matches!(
            lowercase,
            Err(ParseFailure::Invalid(ValidationError::InvalidWinner(_)))
        ));
    }

    #[test]
    fn test_confidence_out_of_range() {
        let result = parse_verdict(&judgment_json("PRO", 5.0, 1.5), &scale());
        assert_eq!(
            result,
            Err(ParseFailure::Invalid(ValidationError::ConfidenceOutOfRange(1.5)))
        );
    }

    #[test]
    fn test_score_out_of_scale() {
        let result = parse_verdict(&judgment_json("PRO", 11.0, 0.5), &scale());
        assert!(matches!(
            result,
            Err(ParseFailure::Invalid(ValidationError::ScoreOutOfRange { .. }))
        ));
        let wide = ScoreScale { min: 0.0, max: 100.0 };
        assert!(parse_verdict(&judgment_json("PRO", 11.0, 0.5), &wide).is_ok());
    }

    #[test]
    fn test_record_reserializes_to_same_verdict() {
        let verdict = parse_verdict(&judgment_json("CON", 8.0, 0.75), &scale()).unwrap();
        let record = JudgmentRecord::from_verdict(
            Uuid::new_v4(),
            JudgeConfig::new("judge", "p0", 0.0),
            1,
            verdict.clone(),
        );

        let wire = serde_json::to_string(&record.verdict()).unwrap();
        let reparsed = parse_verdict(&wire, &scale()).unwrap();
        assert_eq!(reparsed.winner, verdict.winner);
        assert_eq!(reparsed.scores, verdict.scores);
        assert_eq!(reparsed.confidence, verdict.confidence);

        let stored: JudgmentRecord =
            serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(stored, record);
    }

    #[test]
    fn test_wire_field_names() {
        let verdict = parse_verdict(&judgment_json("PRO", 4.0, 0.25), &scale()).unwrap();
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["winner"], "PRO");
        assert_eq!(json["scores"]["argument_quality"]["PRO"], 4.0);
        assert_eq!(json["scores"]["weighing"]["CON"], 4.0);
        assert_eq!(json["confidence"], 0.25);
        assert!(json["short_reason"].is_string());
    }

    #[test]
    fn test_judge_config_key() {
        let config = JudgeConfig::new("openai/gpt-4o", "p1", 0.0);
        assert_eq!(config.key(), "openai/gpt-4o_p1_t0");
    }
}
