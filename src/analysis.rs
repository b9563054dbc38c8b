// src/analysis.rs
//! Summarization-service boundary: provider abstraction plus a timeout wrapper.
//!
//! Callers only ever see `Option<String>`: every failure (disabled, HTTP error, empty
//! answer, timeout) collapses to `None` and the report prints its fallback notice.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AiConfig, AnalysisLimits};
use crate::digest::segment::collapse_whitespace;
use crate::digest::types::Group;

pub const SYSTEM_PROMPT: &str = "Вы senior финансовый аналитик. Выдели 3 главных финансовых факта на русском. Только цифры, показатели, рыночные изменения.";

/// Analysis text used by `AI_TEST_MODE=mock`.
pub const MOCK_ANALYSIS: &str = "1. Тестовый анализ (mock).";

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Trait object used by the pipeline and the HTTP layer.
pub trait AnalysisClient: Send + Sync {
    /// Analytical text for `prompt`, or `None` on any failure.
    fn analyze<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;

    fn provider_name(&self) -> &'static str;
}

pub type DynAnalysisClient = Arc<dyn AnalysisClient>;

/// Builds a client for a given set of limits; used again on every config reload.
pub type AnalysisFactory = Arc<dyn Fn(&AnalysisLimits) -> DynAnalysisClient + Send + Sync>;

/// Low-level provider doing the actual remote call. Kept separate so the same
/// timeout wrapper serves production and tests.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;

    fn name(&self) -> &'static str;
}

/// Factory: build a client according to config and environment.
///
/// * `AI_TEST_MODE=mock` gives a deterministic fixed-answer client.
/// * `enabled == false` gives [`DisabledClient`].
/// * Otherwise a [`MistralProvider`] behind [`TimeoutClient`].
pub fn build_client_from_config(cfg: &AiConfig, limits: &AnalysisLimits) -> DynAnalysisClient {
    if std::env::var("AI_TEST_MODE").is_ok_and(|v| v == "mock") {
        return Arc::new(TimeoutClient::new(FixedProvider::new(MOCK_ANALYSIS), limits));
    }

    if !cfg.enabled {
        return Arc::new(DisabledClient);
    }

    match MistralProvider::new(cfg, limits.timeout()) {
        Ok(provider) => Arc::new(TimeoutClient::new(provider, limits)),
        Err(e) => {
            warn!(error = %e, "analysis provider could not be built, analysis disabled");
            Arc::new(DisabledClient)
        }
    }
}

/// [`build_client_from_config`] bound to one provider config.
pub fn client_factory(cfg: AiConfig) -> AnalysisFactory {
    Arc::new(move |limits: &AnalysisLimits| build_client_from_config(&cfg, limits))
}

/// Prompt for the summarization service.
///
/// Each group becomes `"{label} {n}: item. item"` with items whitespace-collapsed and
/// cut to `item_cap` chars; groups are separated by blank lines and the whole prompt
/// is cut to `total_cap` chars.
pub fn format_prompt(groups: &[Group], label: &str, item_cap: usize, total_cap: usize) -> String {
    let prompt = groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let items = group
                .items
                .iter()
                .map(|it| truncate_chars(&collapse_whitespace(&it.summary), item_cap))
                .collect::<Vec<_>>()
                .join(". ");
            format!("{label} {}: {items}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&prompt, total_cap)
}

/// Normalise line endings and trim the ends; the body is kept verbatim.
/// Empty result means "no analysis".
pub fn sanitize_analysis(input: &str) -> String {
    input.replace("\r\n", "\n").trim().to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

// ------------------------------------------------------------
// Provider errors (internal)
// ------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("missing API key")]
    MissingKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned status {0}")]
    Status(u16),
    #[error("response contained no choices")]
    Empty,
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// Mistral chat-completions provider.
pub struct MistralProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
    temperature: f32,
    max_tokens: u32,
}

impl MistralProvider {
    pub fn new(cfg: &AiConfig, timeout: Duration) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("channel-digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            url: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }

    async fn request(&self, prompt: &str) -> Result<String, AnalysisError> {
        if self.api_key.is_empty() {
            return Err(AnalysisError::MissingKey);
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let user = format!("Материал:\n{prompt}\n\nВыдели только финансовые аспекты:");
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AnalysisError::Status(status.as_u16()));
        }
        let body: Resp = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(AnalysisError::Empty)
    }
}

impl Provider for MistralProvider {
    fn fetch<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            match self.request(prompt).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(error = %e, provider = "mistral", "analysis request failed");
                    None
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "mistral"
    }
}

/// Returns `None` always; used when analysis is disabled.
pub struct DisabledClient;

impl AnalysisClient for DisabledClient {
    fn analyze<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests and local runs.
#[derive(Clone)]
pub struct FixedProvider {
    pub fixed: String,
    /// Artificial latency, to exercise the timeout path.
    pub delay: Option<Duration>,
}

impl FixedProvider {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Provider for FixedProvider {
    fn fetch<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let out = self.fixed.clone();
        let delay = self.delay;
        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            Some(out)
        })
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

// ------------------------------------------------------------
// Timeout wrapper
// ------------------------------------------------------------

/// Caps the prompt, bounds the call with `tokio::time::timeout` and sanitizes output.
pub struct TimeoutClient<P: Provider> {
    inner: P,
    timeout: Duration,
    prompt_char_cap: usize,
}

impl<P: Provider> TimeoutClient<P> {
    pub fn new(inner: P, limits: &AnalysisLimits) -> Self {
        Self::with_timeout(inner, limits.timeout(), limits.prompt_char_cap)
    }

    pub fn with_timeout(inner: P, timeout: Duration, prompt_char_cap: usize) -> Self {
        Self {
            inner,
            timeout,
            prompt_char_cap,
        }
    }

    async fn analyze_impl(&self, prompt: &str) -> Option<String> {
        let prompt = truncate_chars(prompt, self.prompt_char_cap);
        match tokio::time::timeout(self.timeout, self.inner.fetch(&prompt)).await {
            Ok(Some(raw)) => {
                let cleaned = sanitize_analysis(&raw);
                if cleaned.is_empty() {
                    debug!(provider = self.inner.name(), "empty analysis discarded");
                    None
                } else {
                    Some(cleaned)
                }
            }
            Ok(None) => None,
            Err(_) => {
                warn!(
                    provider = self.inner.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "analysis timed out"
                );
                None
            }
        }
    }
}

impl<P: Provider> AnalysisClient for TimeoutClient<P> {
    fn analyze<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(self.analyze_impl(prompt))
    }

    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}
