// src/services/orchestrator.rs
use crate::config::{CACHE_TTL, CredentialCheck};
use crate::errors::StyleLensError;
use crate::models::{AnalysisRequest, AnalysisResponse};
use crate::services::image_processor::{ImageProcessor, PreparedImage};
use crate::services::llm_service::VisionClient;
use crate::services::prompt_builder::PromptBuilder;
use crate::services::response_cache::{ResponseCache, fingerprint};
use crate::services::response_normalizer::ResponseNormalizer;
use crate::services::retry::{RetryExecutor, RetryPolicy};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Single entry point for analysis requests: cache lookup, image preparation, prompt,
/// retried model call, normalization and cache store.
pub struct VisionOrchestrator {
    credentials: Arc<dyn CredentialCheck>,
    client: Arc<dyn VisionClient>,
    cache: Arc<ResponseCache>,
    images: ImageProcessor,
    prompts: PromptBuilder,
    normalizer: ResponseNormalizer,
    retry: RetryExecutor,
    policy: RetryPolicy<StyleLensError>,
    attempt_timeout: Duration,
    in_flight: Mutex<HashMap<String, Gate>>,
}

impl VisionOrchestrator {
    pub fn new(
        credentials: Arc<dyn CredentialCheck>,
        client: Arc<dyn VisionClient>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            credentials,
            client,
            cache,
            images: ImageProcessor::new(),
            prompts: PromptBuilder::new(),
            normalizer: ResponseNormalizer::new(),
            retry: RetryExecutor::new(),
            policy: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(60),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_image_processor(mut self, images: ImageProcessor) -> Self {
        self.images = images;
        self
    }

    pub fn with_retry_executor(mut self, retry: RetryExecutor) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, StyleLensError> {
        if !self.credentials.has_api_credential() {
            return Err(StyleLensError::ConfigurationMissing);
        }

        if !request.is_cacheable() {
            return self.run(request).await;
        }

        if let Some(hit) = self.cache.get(request) {
            info!("Serving {} from cache", request.kind().as_str());
            return Ok(hit);
        }

        // Identical requests arriving together wait for the first one and read its result
        // from the cache instead of paying for a second call.
        let gate = self.enter_gate(fingerprint(request));
        let _turn = gate.lock().await;
        if let Some(hit) = self.cache.get(request) {
            info!("Serving {} from cache after waiting", request.kind().as_str());
            return Ok(hit);
        }

        let result = self.run(request).await;
        if let Ok(response) = &result {
            self.cache.set(request, response.clone(), CACHE_TTL);
        }
        result
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, StyleLensError> {
        let inputs = request.images();
        let images = self.images.prepare_all(inputs).await;
        if images.is_empty() && (!inputs.is_empty() || request.requires_images()) {
            return Err(StyleLensError::NoUsableImage);
        }

        let prompt = self.prompts.build_for_images(request, images.len());
        debug!(
            "Calling vision model for {} with {} image(s), prompt {} chars",
            request.kind().as_str(),
            images.len(),
            prompt.len()
        );

        let images = images.as_slice();
        let prompt = prompt.as_str();
        let raw = self
            .retry
            .execute(&self.policy, move || self.call_once(images, prompt))
            .await?;

        self.normalizer.normalize(&raw, request)
    }

    async fn call_once(&self, images: &[PreparedImage], prompt: &str) -> Result<String, StyleLensError> {
        match tokio::time::timeout(self.attempt_timeout, self.client.complete(images, prompt)).await {
            Ok(result) => result,
            Err(_) => Err(StyleLensError::Timeout(self.attempt_timeout)),
        }
    }

    fn enter_gate(&self, key: String) -> GateEntry<'_> {
        let gate = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();
        GateEntry {
            in_flight: &self.in_flight,
            key,
            gate: Some(gate),
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Holds a caller's place on a fingerprint gate. The map entry is removed when the last
/// holder drops, including when the request future is cancelled mid-flight.
struct GateEntry<'a> {
    in_flight: &'a Mutex<HashMap<String, Gate>>,
    key: String,
    gate: Option<Gate>,
}

impl GateEntry<'_> {
    async fn lock(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        }
    }
}

impl Drop for GateEntry<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        self.gate.take();
        if in_flight.get(&self.key).is_some_and(|g| Arc::strong_count(g) == 1) {
            in_flight.remove(&self.key);
        }
    }
}
