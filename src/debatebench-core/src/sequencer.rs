//! Speech sequencing for a single debate.
//!
//! Speeches are generated strictly one after another: each prompt carries
//! every speech delivered so far, so nothing inside one debate runs in
//! parallel.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::debate::{DebateInstance, Speech};
use crate::debate_format::{DEBATER_SYSTEM_PROMPT, PublicForumFormat};
use crate::error::{DebateError, GatewayError};
use crate::events::{DebateCallback, DebateEvent};
use crate::gateway::{GenerationRequest, SharedGateway, generate_with_timeout};
use crate::text::strip_reasoning;

/// Drives one debate through the six fixed speeches.
#[derive(Clone)]
pub struct SpeechSequencer {
    gateway: SharedGateway,
    format: Arc<PublicForumFormat>,
    call_timeout: Duration,
    callback: Option<DebateCallback>,
}

impl SpeechSequencer {
    pub fn new(gateway: SharedGateway, format: PublicForumFormat, call_timeout: Duration) -> Self {
        Self {
            gateway,
            format: Arc::new(format),
            call_timeout,
            callback: None,
        }
    }

    /// Set a callback for debate events.
    pub fn with_callback(mut self, callback: DebateCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Run the debate to completion, failure or cancellation.
    ///
    /// Any failure moves the debate to `error` with the reason attached;
    /// speeches delivered before the failure are kept.
    pub async fn run(
        &self,
        debate: &mut DebateInstance,
        cancel: &CancellationToken,
    ) -> Result<(), DebateError> {
        if debate.start()? {
            info!(
                debate_id = %debate.id,
                model_assignment = %debate.model_assignment,
                pro_model = %debate.pro_model,
                con_model = %debate.con_model,
                prompt_style = %debate.prompt_style,
                "Debate started"
            );
            self.emit_event(DebateEvent::DebateStarted {
                debate_id: debate.id,
                model_assignment: debate.model_assignment,
                resolution: debate.resolution.clone(),
                pro_model: debate.pro_model.clone(),
                con_model: debate.con_model.clone(),
            });
        }

        while let Some(speech_type) = debate.next_speech_type() {
            if cancel.is_cancelled() {
                return self.abort(debate, DebateError::Cancelled);
            }

            let side = speech_type.side();
            let model = debate.model_for(side).to_string();
            self.emit_event(DebateEvent::SpeechStarted {
                debate_id: debate.id,
                model_assignment: debate.model_assignment,
                speech_type,
                side,
                model: model.clone(),
            });

            let previous: Vec<&str> = debate.speeches.iter().map(|s| s.content.as_str()).collect();
            let prompt = self.format.speech_prompt(
                debate.prompt_style,
                &debate.resolution,
                speech_type,
                &previous,
            );
            let request = GenerationRequest::new(&model, prompt, debate.temperature)
                .with_system_prompt(DEBATER_SYSTEM_PROMPT)
                .with_max_tokens(self.format.max_tokens(speech_type));

            debug!(debate_id = %debate.id, %speech_type, %model, "Requesting speech");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(DebateError::Cancelled),
                r = generate_with_timeout(self.gateway.as_ref(), request, self.call_timeout) => {
                    r.map_err(DebateError::from)
                }
            };

            let content = match result {
                Ok(raw) => strip_reasoning(&raw),
                Err(e) => return self.abort(debate, e),
            };
            if content.is_empty() {
                return self.abort(
                    debate,
                    GatewayError::EmptyResponse { model: model.clone() }.into(),
                );
            }

            let speech = Speech::new(speech_type, model, content);
            let limit = self.format.word_limit(speech_type) as usize;
            if speech.word_count > limit {
                debug!(
                    debate_id = %debate.id,
                    %speech_type,
                    word_count = speech.word_count,
                    limit,
                    "Speech exceeded advisory word limit"
                );
            }

            if let Err(e) = debate.push_speech(speech.clone()) {
                return self.abort(debate, e);
            }
            self.emit_event(DebateEvent::SpeechComplete {
                debate_id: debate.id,
                model_assignment: debate.model_assignment,
                speech,
            });
        }

        info!(
            debate_id = %debate.id,
            model_assignment = %debate.model_assignment,
            "Debate complete"
        );
        self.emit_event(DebateEvent::DebateComplete {
            debate_id: debate.id,
            model_assignment: debate.model_assignment,
        });
        Ok(())
    }

    /// Owned variant of [`run`](Self::run) for spawned tasks. The outcome is
    /// carried by the returned instance's status.
    pub async fn run_owned(
        self,
        mut debate: DebateInstance,
        cancel: CancellationToken,
    ) -> DebateInstance {
        let _ = self.run(&mut debate, &cancel).await;
        debate
    }

    fn abort(&self, debate: &mut DebateInstance, error: DebateError) -> Result<(), DebateError> {
        debate.fail(error.to_string());
        warn!(
            debate_id = %debate.id,
            model_assignment = %debate.model_assignment,
            speeches_completed = debate.speeches.len(),
            error = %error,
            "Debate failed"
        );
        self.emit_event(DebateEvent::DebateError {
            debate_id: debate.id,
            model_assignment: debate.model_assignment,
            error: error.to_string(),
            speeches_completed: debate.speeches.len(),
        });
        Err(error)
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: DebateEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use uuid::Uuid;

    use super::*;
    use crate::debate::DebateStatus;
    use crate::debate_format::{PromptStyle, TURN_ORDER};
    use crate::participant::ModelAssignment;
    use crate::test_support::ScriptedGateway;

    fn debate(style: PromptStyle) -> DebateInstance {
        DebateInstance::new(
            "Resolved: remote work beats office work",
            "model-a",
            "model-b",
            0.7,
            style,
            Uuid::new_v4(),
            ModelAssignment::Original,
        )
    }

    fn sequencer(gateway: Arc<ScriptedGateway>) -> SpeechSequencer {
        SpeechSequencer::new(gateway, PublicForumFormat::default(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_speeches_follow_canonical_order_for_every_style() {
        for style in [PromptStyle::Standard, PromptStyle::Structured, PromptStyle::Freeform] {
            let gateway =
                Arc::new(ScriptedGateway::new(|req| Ok(format!("speech by {}", req.model))));
            let mut d = debate(style);
            sequencer(gateway.clone())
                .run(&mut d, &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(d.status, DebateStatus::Complete);
            let order: Vec<_> = d.speeches.iter().map(|s| s.speech_type).collect();
            assert_eq!(order, TURN_ORDER.to_vec());
            for speech in &d.speeches {
                assert_eq!(speech.side, speech.speech_type.side());
                assert_eq!(speech.model, d.model_for(speech.side));
            }
            assert_eq!(gateway.call_count(), 6);
        }
    }

    #[tokio::test]
    async fn test_each_prompt_carries_all_previous_speeches() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let gateway = Arc::new(ScriptedGateway::new(move |_| {
            Ok(format!("SPEECH-{}", c.fetch_add(1, Ordering::SeqCst)))
        }));
        let mut d = debate(PromptStyle::Standard);
        sequencer(gateway.clone())
            .run(&mut d, &CancellationToken::new())
            .await
            .unwrap();

        let requests = gateway.requests();
        for (i, request) in requests.iter().enumerate() {
            for earlier in 0..i {
                assert!(request.prompt.contains(&format!("SPEECH-{}", earlier)));
            }
            assert!(!request.prompt.contains(&format!("SPEECH-{}", i)));
            assert_eq!(request.temperature, 0.7);
            assert_eq!(request.system_prompt.as_deref(), Some(DEBATER_SYSTEM_PROMPT));
        }
        assert_eq!(requests[0].max_tokens, Some(600));
    }

    #[tokio::test]
    async fn test_gateway_failure_is_fatal_and_keeps_partial_transcript() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let gateway = Arc::new(ScriptedGateway::new(move |_| {
            if c.fetch_add(1, Ordering::SeqCst) == 2 {
                Err(GatewayError::Network("connection reset".into()))
            } else {
                Ok("fine speech".to_string())
            }
        }));
        let mut d = debate(PromptStyle::Standard);
        let err = sequencer(gateway.clone())
            .run(&mut d, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DebateError::Gateway(GatewayError::Network(_))));
        assert_eq!(d.status, DebateStatus::Error);
        assert_eq!(d.speeches.len(), 2);
        assert!(d.error.as_deref().unwrap().contains("connection reset"));
        // no retry from the sequencer itself
        assert_eq!(gateway.call_count(), 3);
    }

    #[tokio::test]
    async fn test_timeout_fails_the_debate() {
        let gateway = Arc::new(
            ScriptedGateway::new(|_| Ok("slow".to_string())).with_delay(Duration::from_secs(5)),
        );
        let seq =
            SpeechSequencer::new(gateway, PublicForumFormat::default(), Duration::from_millis(20));
        let mut d = debate(PromptStyle::Standard);
        let err = seq.run(&mut d, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DebateError::Gateway(GatewayError::Timeout(_))));
        assert_eq!(d.status, DebateStatus::Error);
        assert!(d.speeches.is_empty());
    }

    #[tokio::test]
    async fn test_empty_response_after_stripping_fails() {
        let gateway = Arc::new(ScriptedGateway::new(|_| {
            Ok("<think>only thoughts</think>".to_string())
        }));
        let mut d = debate(PromptStyle::Standard);
        let err = sequencer(gateway).run(&mut d, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DebateError::Gateway(GatewayError::EmptyResponse { .. })));
        assert_eq!(d.status, DebateStatus::Error);
    }

    #[tokio::test]
    async fn test_cancel_mid_sequence_preserves_speeches() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let gateway = Arc::new(ScriptedGateway::new(move |_| {
            if c.fetch_add(1, Ordering::SeqCst) == 1 {
                trigger.cancel();
            }
            Ok("a speech".to_string())
        }));
        let mut d = debate(PromptStyle::Standard);
        let err = sequencer(gateway.clone()).run(&mut d, &cancel).await.unwrap_err();

        assert!(matches!(err, DebateError::Cancelled));
        assert_eq!(d.status, DebateStatus::Error);
        assert_eq!(d.speeches.len(), 2);
        assert_eq!(gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn test_word_limit_is_advisory() {
        let long = "word ".repeat(1000);
        let gateway = Arc::new(ScriptedGateway::new(move |_| Ok(long.clone())));
        let mut d = debate(PromptStyle::Standard);
        sequencer(gateway).run(&mut d, &CancellationToken::new()).await.unwrap();
        assert_eq!(d.status, DebateStatus::Complete);
        assert!(d.speeches.iter().all(|s| s.word_count == 1000));
    }

    #[tokio::test]
    async fn test_events_are_emitted_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let gateway = Arc::new(ScriptedGateway::new(|_| Ok("speech".to_string())));
        let seq = sequencer(gateway).with_callback(Arc::new(move |event: DebateEvent| {
            let name = serde_json::to_value(&event).unwrap()["type"]
                .as_str()
                .unwrap()
                .to_string();
            sink.lock().unwrap().push(name);
        }));
        let mut d = debate(PromptStyle::Standard);
        seq.run(&mut d, &CancellationToken::new()).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.first().map(String::as_str), Some("debate_started"));
        assert_eq!(events.last().map(String::as_str), Some("debate_complete"));
        assert_eq!(events.iter().filter(|e| *e == "speech_started").count(), 6);
        assert_eq!(events.iter().filter(|e| *e == "speech_complete").count(), 6);
        assert_eq!(events.len(), 14);
    }

    #[tokio::test]
    async fn test_finished_debate_cannot_be_rerun() {
        let gateway = Arc::new(ScriptedGateway::new(|_| Ok("speech".to_string())));
        let seq = sequencer(gateway.clone());
        let mut d = debate(PromptStyle::Standard);
        seq.run(&mut d, &CancellationToken::new()).await.unwrap();
        let err = seq.run(&mut d, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DebateError::Sequencing(_)));
        assert_eq!(d.status, DebateStatus::Complete);
        assert_eq!(gateway.call_count(), 6);
    }
}
