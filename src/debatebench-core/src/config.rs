//! Configuration module for loading TOML config files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::debate_format::{PromptStyle, TURN_ORDER, WordLimits};
use crate::error::DebateError;
use crate::judge_prompts::JudgePromptVariant;
use crate::judgment::{JudgeConfig, ScoreScale};
use crate::stability::InstabilityWeights;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub debate: DebateSettings,
    #[serde(default)]
    pub judging: JudgingConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// OpenAI-compatible endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub accept_invalid_certs: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            accept_invalid_certs: false,
        }
    }
}

/// Settings for debate generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateSettings {
    pub temperature: f32,
    pub prompt_style: PromptStyle,
    /// Deadline for one speech, retries included.
    pub call_timeout_secs: u64,
    pub word_limits: WordLimits,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            prompt_style: PromptStyle::Standard,
            call_timeout_secs: 300,
            word_limits: WordLimits::default(),
        }
    }
}

impl DebateSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Settings for judgment collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgingConfig {
    /// Judge models that may be used. Anything else is rejected.
    pub judge_models: Vec<String>,
    /// Prompt variant ids to evaluate.
    pub judge_prompts: Vec<String>,
    pub temperature: f32,
    pub runs_per_debate: u32,
    /// Re-issues allowed for one (debate, config, run) after a failed attempt.
    pub max_parse_retries: u32,
    /// Upper bound on in-flight judge calls.
    pub concurrency: usize,
    pub call_timeout_secs: u64,
    pub score_min: f64,
    pub score_max: f64,
}

impl Default for JudgingConfig {
    fn default() -> Self {
        Self {
            judge_models: vec![
                "anthropic/claude-sonnet-4.5".to_string(),
                "openai/gpt-4o".to_string(),
                "google/gemini-2.5-pro".to_string(),
            ],
            judge_prompts: vec!["p0".to_string(), "p1".to_string(), "p2".to_string()],
            temperature: 0.7,
            runs_per_debate: 3,
            max_parse_retries: 2,
            concurrency: 4,
            call_timeout_secs: 300,
            score_min: 1.0,
            score_max: 10.0,
        }
    }
}

impl JudgingConfig {
    pub fn score_scale(&self) -> ScoreScale {
        ScoreScale {
            min: self.score_min,
            max: self.score_max,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Cross product of configured judge models and prompt variants, in
    /// listed order. Repeated entries yield one config.
    pub fn judge_configs(&self) -> Vec<JudgeConfig> {
        let mut seen = HashSet::new();
        self.judge_models
            .iter()
            .flat_map(|model| {
                self.judge_prompts.iter().map(move |prompt| {
                    JudgeConfig::new(model.clone(), prompt.clone(), self.temperature)
                })
            })
            .filter(|config| seen.insert(config.key()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub weights: InstabilityWeights,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::Configuration(format!("Failed to read config: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Load configuration from string content.
    pub fn from_toml(content: &str) -> Result<Self, DebateError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| DebateError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DebateError> {
        let fail = |msg: String| Err(DebateError::Configuration(msg));

        if self.judging.runs_per_debate == 0 {
            return fail("judging.runs_per_debate must be at least 1".into());
        }
        if self.judging.concurrency == 0 {
            return fail("judging.concurrency must be at least 1".into());
        }
        if !(self.judging.score_min.is_finite()
            && self.judging.score_max.is_finite()
            && self.judging.score_min < self.judging.score_max)
        {
            return fail(format!(
                "judging score scale [{}, {}] is empty",
                self.judging.score_min, self.judging.score_max
            ));
        }
        if self.judging.judge_models.is_empty() {
            return fail("judging.judge_models must list at least one model".into());
        }
        for prompt in &self.judging.judge_prompts {
            prompt.parse::<JudgePromptVariant>()?;
        }
        if let Some(speech_type) = TURN_ORDER
            .into_iter()
            .find(|&t| self.debate.word_limits.get(t) == 0)
        {
            return fail(format!("debate.word_limits.{} must be at least 1", speech_type.as_str()));
        }
        if self.debate.call_timeout_secs == 0 || self.judging.call_timeout_secs == 0 {
            return fail("call timeouts must be positive".into());
        }
        self.analysis.weights.validate()
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config::default()
}
