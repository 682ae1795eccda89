//! DebateBench Core Library
//!
//! Generates mirrored Public Forum debates between language models, collects
//! repeated structured judgments of them, and ranks judge configurations by
//! how stable their verdicts are.

pub mod collector;
pub mod config;
pub mod debate;
pub mod debate_format;
pub mod error;
pub mod events;
pub mod gateway;
pub mod judge_prompts;
pub mod judgment;
pub mod pair;
pub mod participant;
pub mod sequencer;
pub mod stability;
pub mod text;

#[cfg(test)]
mod test_support;

pub use collector::{CollectionReport, CollectorSettings, Exclusion, JudgmentCollector, RunLedger};
pub use config::Config;
pub use debate::{DebateInstance, DebateStatus, Speech};
pub use debate_format::{PromptStyle, PublicForumFormat, SpeechType, WordLimits};
pub use error::{DebateError, GatewayError, ParseFailure, ValidationError};
pub use events::{DebateCallback, DebateEvent};
pub use gateway::{GenerationRequest, ModelGateway, OpenAiGateway, SharedGateway};
pub use judge_prompts::JudgePromptVariant;
pub use judgment::{JudgeConfig, JudgmentRecord, ScoreScale, Verdict};
pub use pair::{DebatePair, DebatePairGenerator, PairRequest};
pub use participant::{ModelAssignment, ModelPair, Side};
pub use sequencer::SpeechSequencer;
pub use stability::{InstabilityWeights, StabilityAnalyzer, StabilityReport};
