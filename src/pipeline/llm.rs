//! Generative model access: the extraction call and the provider plumbing.
//!
//! Everything that talks to a model goes through [`TextGenerator`], one
//! request in, one reply text out. [`LlmGenerator`] is the production
//! implementation on top of `edgequake-llm`; tests script their own.
//!
//! There is no retry here. A failed call is surfaced to the operator, who can
//! press extract again.

use crate::config::AppConfig;
use crate::error::InvoiceError;
use crate::pipeline::encode;
use crate::pipeline::render::RasterPage;
use crate::prompts::EXTRACTION_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A single model call: optional system instruction, user text, attachments.
#[derive(Clone, Default)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub images: Vec<ImageData>,
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("system", &self.system.as_ref().map(|s| s.len()))
            .field("prompt", &self.prompt)
            .field("images", &self.images.len())
            .finish()
    }
}

/// Anything that can answer a [`GenerationRequest`] with plain text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, InvoiceError>;
}

/// [`TextGenerator`] backed by an `edgequake-llm` provider.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AppConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    /// Resolve the provider from the configuration and wrap it.
    pub fn from_config(config: &AppConfig) -> Result<Self, InvoiceError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, InvoiceError> {
        let start = Instant::now();
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage::system(system));
        }
        if request.images.is_empty() {
            messages.push(ChatMessage::user(request.prompt.as_str()));
        } else {
            messages.push(ChatMessage::user_with_images(
                request.prompt.as_str(),
                request.images,
            ));
        }

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| InvoiceError::LlmApiError {
                message: e.to_string(),
            })?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Send every staged page plus the instructions in one request.
///
/// Returns the model's reply verbatim; normalisation is a separate step so
/// the raw text can be reviewed and edited first.
pub async fn extract_invoice_text(
    generator: &dyn TextGenerator,
    pages: &[RasterPage],
    user_instruction: &str,
    config: &AppConfig,
) -> Result<String, InvoiceError> {
    if pages.is_empty() {
        return Err(InvoiceError::NothingStaged);
    }

    let images = encode::encode_pages(pages)?;
    let system = config
        .extraction_prompt
        .clone()
        .unwrap_or_else(|| EXTRACTION_SYSTEM_PROMPT.to_string());

    info!("Extracting invoice from {} pages", images.len());
    let reply = generator
        .generate(GenerationRequest {
            system: Some(system),
            prompt: user_instruction.trim().to_string(),
            images,
        })
        .await?;
    debug!("Extraction reply: {} chars", reply.len());
    Ok(reply)
}

/// Build `CompletionOptions` from the application config.
fn build_options(config: &AppConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, InvoiceError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        InvoiceError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. Pre-built provider (`config.provider`).
/// 2. Named provider (`config.provider_name`) with `config.model`.
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, both set.
/// 4. Gemini when `GEMINI_API_KEY` is present, since the default model is a
///    Gemini model.
/// 5. `ProviderFactory::from_env` auto-detection.
pub fn resolve_provider(config: &AppConfig) -> Result<Arc<dyn LLMProvider>, InvoiceError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, &config.model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            return create_provider("gemini", &config.model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| InvoiceError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
