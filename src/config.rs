//! Configuration for the invoice workspace.
//!
//! Everything the application needs at runtime (database location, render
//! resolution, model choice, capability flags) lives in [`AppConfig`], built
//! via [`AppConfigBuilder`]. The CLI maps flags and environment variables onto
//! the builder; library users and tests set only what they care about.

use crate::error::InvoiceError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default model. Gemini Flash reads multi-page invoices well and is cheap.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Application configuration.
///
/// # Example
/// ```rust
/// use edgequake_invoice2sql::AppConfig;
///
/// let config = AppConfig::builder()
///     .database_path("invoices.db")
///     .render_dpi(300)
///     .enable_nl_query(true)
///     .build()
///     .unwrap();
/// assert!(config.nl_query_enabled);
/// ```
#[derive(Clone)]
pub struct AppConfig {
    /// SQLite database file. Default: `invoices.db`.
    pub database_path: PathBuf,

    /// Rendering DPI for PDF pages. Range: 72–600. Default: 300.
    ///
    /// PDF user space is 72 units per inch, so pages are scaled by
    /// `render_dpi / 72`.
    pub render_dpi: u32,

    /// LLM model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// LLM provider name (e.g. "gemini", "openai"). If None, auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 8192.
    ///
    /// A consolidated multi-page invoice with many line items easily exceeds
    /// 4 000 output tokens.
    pub max_tokens: usize,

    /// Custom extraction instruction. If None, uses
    /// [`crate::prompts::EXTRACTION_SYSTEM_PROMPT`].
    pub extraction_prompt: Option<String>,

    /// Number of audit entries returned by the audit view. Default: 50.
    pub audit_log_limit: usize,

    /// Allow natural-language queries. Default: false.
    ///
    /// Generated SQL always runs on a read-only connection; this flag only
    /// decides whether the feature is reachable at all.
    pub nl_query_enabled: bool,

    /// Account created when the user table is empty. Default: `admin`.
    pub seed_admin_username: String,

    /// Password for the seed account. Default: `admin123`.
    pub seed_admin_password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("invoices.db"),
            render_dpi: 300,
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 8192,
            extraction_prompt: None,
            audit_log_limit: 50,
            nl_query_enabled: false,
            seed_admin_username: "admin".to_string(),
            seed_admin_password: "admin123".to_string(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_path", &self.database_path)
            .field("render_dpi", &self.render_dpi)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("audit_log_limit", &self.audit_log_limit)
            .field("nl_query_enabled", &self.nl_query_enabled)
            .field("seed_admin_username", &self.seed_admin_username)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Create a new builder for `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder {
            config: Self::default(),
        }
    }

    /// Page scale factor handed to pdfium.
    pub fn render_scale(&self) -> f32 {
        self.render_dpi as f32 / 72.0
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn render_dpi(mut self, dpi: u32) -> Self {
        self.config.render_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extraction_prompt = Some(prompt.into());
        self
    }

    pub fn audit_log_limit(mut self, n: usize) -> Self {
        self.config.audit_log_limit = n;
        self
    }

    pub fn enable_nl_query(mut self, v: bool) -> Self {
        self.config.nl_query_enabled = v;
        self
    }

    pub fn seed_admin(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.seed_admin_username = username.into();
        self.config.seed_admin_password = password.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AppConfig, InvoiceError> {
        let c = &self.config;
        if c.render_dpi < 72 || c.render_dpi > 600 {
            return Err(InvoiceError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.render_dpi
            )));
        }
        if c.model.trim().is_empty() {
            return Err(InvoiceError::InvalidConfig("Model must not be empty".into()));
        }
        if c.audit_log_limit == 0 {
            return Err(InvoiceError::InvalidConfig(
                "Audit log limit must be ≥ 1".into(),
            ));
        }
        if c.seed_admin_username.trim().is_empty() || c.seed_admin_password.is_empty() {
            return Err(InvoiceError::InvalidConfig(
                "Seed admin username and password must not be empty".into(),
            ));
        }
        if c.database_path.as_os_str().is_empty() {
            return Err(InvoiceError::InvalidConfig(
                "Database path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.render_dpi, 300);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.audit_log_limit, 50);
        assert!(!config.nl_query_enabled);
        assert_eq!(config.seed_admin_username, "admin");
    }

    #[test]
    fn render_scale_is_dpi_over_72() {
        let config = AppConfig::default();
        assert!((config.render_scale() - 300.0 / 72.0).abs() < f32::EPSILON);
    }

    #[test]
    fn builder_clamps_dpi() {
        let config = AppConfig::builder().render_dpi(10_000).build().unwrap();
        assert_eq!(config.render_dpi, 600);
        let config = AppConfig::builder().render_dpi(1).build().unwrap();
        assert_eq!(config.render_dpi, 72);
    }

    #[test]
    fn build_rejects_zero_audit_limit() {
        let err = AppConfig::builder().audit_log_limit(0).build().unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_empty_model() {
        let err = AppConfig::builder().model("  ").build().unwrap_err();
        assert!(err.to_string().contains("Model"));
    }

    #[test]
    fn debug_hides_seed_password() {
        let config = AppConfig::builder()
            .seed_admin("root", "s3cret")
            .build()
            .unwrap();
        let dbg = format!("{:?}", config);
        assert!(dbg.contains("root"));
        assert!(!dbg.contains("s3cret"));
    }
}
