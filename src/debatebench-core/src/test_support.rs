use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::gateway::{GenerationRequest, ModelGateway};

type Handler = Box<dyn Fn(&GenerationRequest) -> Result<String, GatewayError> + Send + Sync>;

/// Gateway whose answers come from a closure. Records every request.
pub struct ScriptedGateway {
    handler: Handler,
    delay: Duration,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGateway {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<String, GatewayError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.handler)(&request)
    }
}

/// A well-formed judgment in the wire schema.
pub fn judgment_json(winner: &str, score: f64, confidence: f64) -> String {
    format!(
        r#"{{"winner": "{winner}", "scores": {{"argument_quality": {{"PRO": {score}, "CON": {score}}}, "evidence": {{"PRO": {score}, "CON": {score}}}, "clash": {{"PRO": {score}, "CON": {score}}}, "weighing": {{"PRO": {score}, "CON": {score}}}}}, "confidence": {confidence}, "short_reason": "Stronger weighing."}}"#
    )
}
