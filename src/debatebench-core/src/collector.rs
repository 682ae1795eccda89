//! Repeated judging of completed debates.
//!
//! Every (debate, judge config, run) triple is an independent unit of work.
//! A unit either yields one [`JudgmentRecord`] or, once its attempt budget is
//! spent, one [`Exclusion`]. Every failed attempt along the way is kept as an
//! [`AttemptFailure`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::JudgingConfig;
use crate::debate::DebateInstance;
use crate::debate_format::PublicForumFormat;
use crate::error::DebateError;
use crate::gateway::{GenerationRequest, SharedGateway, generate_with_timeout};
use crate::judge_prompts::JudgePromptVariant;
use crate::judgment::{JudgeConfig, JudgmentRecord, ScoreScale, parse_verdict};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Gateway,
    Parse,
}

/// One failed attempt at a judgment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptFailure {
    pub debate_id: Uuid,
    pub judge_config: JudgeConfig,
    pub run_number: u32,
    pub attempt: u32,
    pub kind: FailureKind,
    pub reason: String,
    /// Judge output that failed to parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A run that exhausted its attempt budget and is permanently out of analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exclusion {
    pub debate_id: Uuid,
    pub judge_config: JudgeConfig,
    pub run_number: u32,
    pub attempts: u32,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything one collection pass produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionReport {
    pub records: Vec<JudgmentRecord>,
    pub failures: Vec<AttemptFailure>,
    pub exclusions: Vec<Exclusion>,
    /// Debates passed in that were not complete.
    pub skipped_debates: Vec<Uuid>,
}

impl CollectionReport {
    pub fn excluded_count(&self) -> usize {
        self.exclusions.len()
    }

    pub fn parse_failure_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::Parse)
            .count()
    }
}

/// Highest run number already used per (debate, judge config).
///
/// Accepted and excluded runs both consume their number, so new runs never
/// collide with history.
#[derive(Debug, Clone, Default)]
pub struct RunLedger {
    last_run: HashMap<(Uuid, String), u32>,
}

impl RunLedger {
    pub fn from_history(records: &[JudgmentRecord], exclusions: &[Exclusion]) -> Self {
        let mut ledger = Self::default();
        for record in records {
            ledger.observe(record.debate_id, &record.judge_config, record.run_number);
        }
        for exclusion in exclusions {
            ledger.observe(exclusion.debate_id, &exclusion.judge_config, exclusion.run_number);
        }
        ledger
    }

    fn observe(&mut self, debate_id: Uuid, config: &JudgeConfig, run_number: u32) {
        let entry = self.last_run.entry((debate_id, config.key())).or_insert(0);
        *entry = (*entry).max(run_number);
    }

    pub fn last_run(&self, debate_id: Uuid, config: &JudgeConfig) -> u32 {
        self.last_run
            .get(&(debate_id, config.key()))
            .copied()
            .unwrap_or(0)
    }
}

/// Knobs for one collector.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub runs_per_debate: u32,
    pub max_parse_retries: u32,
    pub concurrency: usize,
    pub call_timeout: Duration,
    pub score_scale: ScoreScale,
    /// Allowed judge models.
    pub judge_models: Vec<String>,
}

impl From<&JudgingConfig> for CollectorSettings {
    fn from(config: &JudgingConfig) -> Self {
        Self {
            runs_per_debate: config.runs_per_debate,
            max_parse_retries: config.max_parse_retries,
            concurrency: config.concurrency,
            call_timeout: config.call_timeout(),
            score_scale: config.score_scale(),
            judge_models: config.judge_models.clone(),
        }
    }
}

/// Issues judge calls against completed debates.
pub struct JudgmentCollector {
    gateway: SharedGateway,
    format: Arc<PublicForumFormat>,
    settings: CollectorSettings,
}

struct RunTask {
    debate_id: Uuid,
    config: JudgeConfig,
    run_number: u32,
    prompt: Arc<str>,
}

#[derive(Default)]
struct RunOutcome {
    record: Option<JudgmentRecord>,
    failures: Vec<AttemptFailure>,
    exclusion: Option<Exclusion>,
}

impl JudgmentCollector {
    pub fn new(
        gateway: SharedGateway,
        format: PublicForumFormat,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            gateway,
            format: Arc::new(format),
            settings,
        }
    }

    /// Resolve every config's prompt variant and check its model against the
    /// allowlist. Runs before any gateway call.
    ///
    /// Configs sharing a key would share run numbers, so duplicates are
    /// rejected.
    pub fn validate_configs(
        &self,
        configs: &[JudgeConfig],
    ) -> Result<Vec<JudgePromptVariant>, DebateError> {
        let mut seen = HashSet::new();
        configs
            .iter()
            .map(|config| {
                if !self.settings.judge_models.iter().any(|m| m == &config.judge_model) {
                    return Err(DebateError::Configuration(format!(
                        "Unknown judge model '{}'. Configured judge models: {}",
                        config.judge_model,
                        self.settings.judge_models.join(", ")
                    )));
                }
                if !seen.insert(config.key()) {
                    return Err(DebateError::Configuration(format!(
                        "Judge config '{}' is listed more than once",
                        config
                    )));
                }
                config.judge_prompt.parse::<JudgePromptVariant>()
            })
            .collect()
    }

    /// Judge every complete debate under every config, `runs_per_debate`
    /// times each. Run numbers continue after those in `ledger`.
    pub async fn collect(
        &self,
        debates: &[DebateInstance],
        configs: &[JudgeConfig],
        ledger: &RunLedger,
    ) -> Result<CollectionReport, DebateError> {
        let variants = self.validate_configs(configs)?;
        if self.settings.concurrency == 0 {
            return Err(DebateError::Configuration(
                "judging concurrency must be at least 1".into(),
            ));
        }

        let mut report = CollectionReport::default();
        let mut tasks = Vec::new();

        for debate in debates {
            if !debate.is_complete() {
                debug!(
                    debate_id = %debate.id,
                    status = %debate.status,
                    "Skipping incomplete debate"
                );
                report.skipped_debates.push(debate.id);
                continue;
            }
            let transcript = debate.transcript(&self.format);
            for (config, variant) in configs.iter().zip(&variants) {
                let prompt: Arc<str> =
                    variant.render(&transcript, &self.settings.score_scale).into();
                let first = ledger.last_run(debate.id, config) + 1;
                for run_number in first..first + self.settings.runs_per_debate {
                    tasks.push(RunTask {
                        debate_id: debate.id,
                        config: config.clone(),
                        run_number,
                        prompt: Arc::clone(&prompt),
                    });
                }
            }
        }

        info!(
            runs = tasks.len(),
            configs = configs.len(),
            concurrency = self.settings.concurrency,
            "Collecting judgments"
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut join_set = JoinSet::new();
        for task in tasks {
            let gateway = Arc::clone(&self.gateway);
            let semaphore = Arc::clone(&semaphore);
            let settings = self.settings.clone();
            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return RunOutcome::default();
                };
                judge_run(gateway, task, &settings).await
            });
        }

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(outcome) => {
                    report.records.extend(outcome.record);
                    report.failures.extend(outcome.failures);
                    report.exclusions.extend(outcome.exclusion);
                }
                Err(e) => warn!("Judge task join error: {}", e),
            }
        }

        let order =
            |debate_id: &Uuid, config: &JudgeConfig, run: u32| (*debate_id, config.key(), run);
        report
            .records
            .sort_by_key(|r| order(&r.debate_id, &r.judge_config, r.run_number));
        report
            .exclusions
            .sort_by_key(|e| order(&e.debate_id, &e.judge_config, e.run_number));
        report
            .failures
            .sort_by_key(|f| (order(&f.debate_id, &f.judge_config, f.run_number), f.attempt));

        info!(
            accepted = report.records.len(),
            failed_attempts = report.failures.len(),
            excluded = report.excluded_count(),
            "Judgment collection finished"
        );
        Ok(report)
    }
}

/// Attempt one run up to `1 + max_parse_retries` times.
async fn judge_run(
    gateway: SharedGateway,
    task: RunTask,
    settings: &CollectorSettings,
) -> RunOutcome {
    let max_attempts = settings.max_parse_retries + 1;
    let mut outcome = RunOutcome::default();

    for attempt in 1..=max_attempts {
        let request = GenerationRequest::new(
            &task.config.judge_model,
            task.prompt.as_ref(),
            task.config.temperature,
        );
        let response =
            generate_with_timeout(gateway.as_ref(), request, settings.call_timeout).await;
        let failure = match response {
            Ok(text) => match parse_verdict(&text, &settings.score_scale) {
                Ok(verdict) => {
                    debug!(
                        debate_id = %task.debate_id,
                        judge = %task.config,
                        run = task.run_number,
                        attempt,
                        winner = %verdict.winner,
                        "Judgment accepted"
                    );
                    outcome.record = Some(JudgmentRecord::from_verdict(
                        task.debate_id,
                        task.config.clone(),
                        task.run_number,
                        verdict,
                    ));
                    return outcome;
                }
                Err(e) => (FailureKind::Parse, e.to_string(), Some(text)),
            },
            Err(e) => (FailureKind::Gateway, e.to_string(), None),
        };

        let (kind, reason, raw_output) = failure;
        warn!(
            debate_id = %task.debate_id,
            judge = %task.config,
            run = task.run_number,
            attempt,
            max_attempts,
            ?kind,
            %reason,
            "Judgment attempt failed"
        );
        outcome.failures.push(AttemptFailure {
            debate_id: task.debate_id,
            judge_config: task.config.clone(),
            run_number: task.run_number,
            attempt,
            kind,
            reason,
            raw_output,
            timestamp: Utc::now(),
        });
    }

    let reason = outcome
        .failures
        .last()
        .map(|f| f.reason.clone())
        .unwrap_or_default();
    outcome.exclusion = Some(Exclusion {
        debate_id: task.debate_id,
        judge_config: task.config,
        run_number: task.run_number,
        attempts: max_attempts,
        reason,
        timestamp: Utc::now(),
    });
    outcome
}
