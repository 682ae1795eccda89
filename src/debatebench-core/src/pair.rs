//! Mirrored debate pairs.
//!
//! Every session runs the same resolution twice with the two models swapped
//! between PRO and CON. The halves share a `pair_id` and run concurrently;
//! neither waits on or is affected by the other.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::debate::{DebateInstance, DebateStatus};
use crate::debate_format::PromptStyle;
use crate::participant::{ModelAssignment, ModelPair};
use crate::sequencer::SpeechSequencer;

/// Everything needed to start one mirrored session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRequest {
    pub resolution: String,
    pub models: ModelPair,
    pub temperature: f32,
    pub prompt_style: PromptStyle,
}

impl PairRequest {
    pub fn new(
        resolution: impl Into<String>,
        model_a: impl Into<String>,
        model_b: impl Into<String>,
    ) -> Self {
        Self {
            resolution: resolution.into(),
            models: ModelPair::new(model_a, model_b),
            temperature: 0.7,
            prompt_style: PromptStyle::Standard,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_prompt_style(mut self, prompt_style: PromptStyle) -> Self {
        self.prompt_style = prompt_style;
        self
    }
}

/// The two halves of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebatePair {
    pub pair_id: Uuid,
    pub original: DebateInstance,
    pub flipped: DebateInstance,
}

impl DebatePair {
    /// Seat both halves. Assignment happens here, once.
    pub fn new(request: &PairRequest) -> Self {
        let pair_id = Uuid::new_v4();
        let seat = |assignment| {
            let (pro, con) = request.models.seat(assignment);
            DebateInstance::new(
                request.resolution.clone(),
                pro,
                con,
                request.temperature,
                request.prompt_style,
                pair_id,
                assignment,
            )
        };
        Self {
            pair_id,
            original: seat(ModelAssignment::Original),
            flipped: seat(ModelAssignment::Flipped),
        }
    }

    pub fn instances(&self) -> [&DebateInstance; 2] {
        [&self.original, &self.flipped]
    }

    pub fn into_instances(self) -> [DebateInstance; 2] {
        [self.original, self.flipped]
    }

    /// Halves that finished all six speeches.
    pub fn complete_instances(&self) -> Vec<&DebateInstance> {
        self.instances()
            .into_iter()
            .filter(|d| d.status == DebateStatus::Complete)
            .collect()
    }
}

/// Creates mirrored pairs and runs their sequencers.
#[derive(Clone)]
pub struct DebatePairGenerator {
    sequencer: SpeechSequencer,
}

impl DebatePairGenerator {
    pub fn new(sequencer: SpeechSequencer) -> Self {
        Self { sequencer }
    }

    pub fn create_pair(&self, request: &PairRequest) -> DebatePair {
        DebatePair::new(request)
    }

    /// Run both halves concurrently and return them once both have stopped.
    pub async fn run_pair(&self, pair: DebatePair, cancel: &CancellationToken) -> DebatePair {
        let DebatePair {
            pair_id,
            mut original,
            mut flipped,
        } = pair;

        info!(%pair_id, resolution = %original.resolution, "Running debate pair");
        let (original_result, flipped_result) = tokio::join!(
            self.sequencer.run(&mut original, cancel),
            self.sequencer.run(&mut flipped, cancel),
        );
        for (assignment, result) in [
            (ModelAssignment::Original, original_result),
            (ModelAssignment::Flipped, flipped_result),
        ] {
            if let Err(e) = result {
                warn!(%pair_id, model_assignment = %assignment, error = %e, "Pair half failed");
            }
        }

        DebatePair {
            pair_id,
            original,
            flipped,
        }
    }

    /// Spawn both halves and hand each one back as soon as it stops, so a
    /// finished half can be judged while its sibling is still running.
    pub fn spawn_pair(
        &self,
        pair: DebatePair,
        cancel: &CancellationToken,
    ) -> mpsc::Receiver<DebateInstance> {
        let (tx, rx) = mpsc::channel(2);
        for debate in pair.into_instances() {
            let sequencer = self.sequencer.clone();
            let token = cancel.child_token();
            let tx = tx.clone();
            tokio::spawn(async move {
                let finished = sequencer.run_owned(debate, token).await;
                let _ = tx.send(finished).await;
            });
        }
        rx
    }

    /// Run several sessions at once. Results come back in request order.
    pub async fn run_sessions(
        &self,
        requests: &[PairRequest],
        cancel: &CancellationToken,
    ) -> Vec<DebatePair> {
        let mut join_set = JoinSet::new();
        for (index, request) in requests.iter().enumerate() {
            let generator = self.clone();
            let pair = self.create_pair(request);
            let token = cancel.child_token();
            join_set.spawn(async move { (index, generator.run_pair(pair, &token).await) });
        }

        let mut finished = Vec::with_capacity(requests.len());
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(entry) => finished.push(entry),
                Err(e) => warn!("Session task join error: {}", e),
            }
        }
        finished.sort_by_key(|(index, _)| *index);
        finished.into_iter().map(|(_, pair)| pair).collect()
    }
}
