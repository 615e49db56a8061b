//! Configuration types for the bot and its extraction pipeline.
//!
//! Two structs split the knobs by who needs them:
//!
//! * [`PipelineConfig`]: everything extraction, delivery and assembly read.
//!   The offline `pdfbot convert` command only needs this one.
//! * [`BotConfig`]: credentials and the webhook listener, plus the pipeline
//!   config. Built via [`BotConfigBuilder`], whose `build()` is the single
//!   place where missing start-up values turn into
//!   [`PdfBotError::Configuration`].

use crate::error::PdfBotError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Telegram rejects text messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Default listen port when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 5000;

/// Which library reads page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEngine {
    /// Native pdfium via `pdfium-render`. Best text quality.
    #[default]
    Pdfium,
    /// Pure-Rust `lopdf` text extraction. No native library required.
    Lopdf,
}

impl fmt::Display for TextEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEngine::Pdfium => f.write_str("pdfium"),
            TextEngine::Lopdf => f.write_str("lopdf"),
        }
    }
}

/// Knobs for extraction, delivery and document assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Text reader. Default: [`TextEngine::Pdfium`].
    pub text_engine: TextEngine,

    /// Path to the pdfium shared library. `None` binds the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Maximum characters per chat message. Range: 1–4096. Default: 4096.
    pub chunk_size: usize,

    /// Display width of embedded images in the Word document, in inches.
    /// Default: 5.0.
    pub image_width_inches: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_engine: TextEngine::default(),
            pdfium_lib_path: None,
            chunk_size: MAX_MESSAGE_CHARS,
            image_width_inches: 5.0,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: PipelineConfig::default(),
        }
    }

    fn validate(&self) -> Result<(), PdfBotError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_MESSAGE_CHARS {
            return Err(PdfBotError::Configuration(format!(
                "chunk size must be 1–{MAX_MESSAGE_CHARS}, got {}",
                self.chunk_size
            )));
        }
        if !(self.image_width_inches.is_finite() && self.image_width_inches > 0.0) {
            return Err(PdfBotError::Configuration(format!(
                "image width must be a positive number of inches, got {}",
                self.image_width_inches
            )));
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn text_engine(mut self, engine: TextEngine) -> Self {
        self.config.text_engine = engine;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn chunk_size(mut self, chars: usize) -> Self {
        self.config.chunk_size = chars;
        self
    }

    pub fn image_width_inches(mut self, inches: f32) -> Self {
        self.config.image_width_inches = inches;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<PipelineConfig, PdfBotError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Start-up configuration of the webhook bot.
#[derive(Clone)]
pub struct BotConfig {
    /// Telegram bot token (`TELEGRAM_BOT_TOKEN`).
    pub bot_token: String,

    /// Public HTTPS base URL the webhook is reachable at
    /// (`RENDER_EXTERNAL_URL`). No trailing slash.
    pub public_url: reqwest::Url,

    /// Local address the webhook server binds to. Default: `0.0.0.0`.
    pub listen_ip: IpAddr,

    /// Local port (`PORT`). Default: 5000.
    pub port: u16,

    /// Extraction / delivery / assembly knobs.
    pub pipeline: PipelineConfig,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &"<redacted>")
            .field("public_url", &self.public_url.as_str())
            .field("listen_ip", &self.listen_ip)
            .field("port", &self.port)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl BotConfig {
    /// Create a new builder.
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// The URL Telegram posts updates to: `<public_url>/<token>`.
    pub fn webhook_url(&self) -> Result<reqwest::Url, PdfBotError> {
        let base = self.public_url.as_str().trim_end_matches('/');
        format!("{base}/{}", self.bot_token)
            .parse()
            .map_err(|e| PdfBotError::Configuration(format!("invalid webhook URL: {e}")))
    }

    /// Socket address the webhook server listens on.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_ip, self.port)
    }
}

/// Builder for [`BotConfig`]. Every field may be left unset; `build()`
/// reports what is missing.
#[derive(Debug, Clone)]
pub struct BotConfigBuilder {
    bot_token: Option<String>,
    public_url: Option<String>,
    listen_ip: IpAddr,
    port: u16,
    pipeline: PipelineConfig,
}

impl Default for BotConfigBuilder {
    fn default() -> Self {
        Self {
            bot_token: None,
            public_url: None,
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl BotConfigBuilder {
    pub fn bot_token(mut self, token: impl Into<String>) -> Self {
        self.bot_token = Some(token.into());
        self
    }

    pub fn public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    pub fn listen_ip(mut self, ip: IpAddr) -> Self {
        self.listen_ip = ip;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Validate and build. Empty strings count as missing.
    pub fn build(self) -> Result<BotConfig, PdfBotError> {
        let bot_token = self
            .bot_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PdfBotError::Configuration("TELEGRAM_BOT_TOKEN is not set".into()))?;

        let raw_url = self
            .public_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| PdfBotError::Configuration("RENDER_EXTERNAL_URL is not set".into()))?;

        let public_url: reqwest::Url = raw_url.trim().parse().map_err(|e| {
            PdfBotError::Configuration(format!("RENDER_EXTERNAL_URL '{raw_url}' is invalid: {e}"))
        })?;
        if !matches!(public_url.scheme(), "http" | "https") {
            return Err(PdfBotError::Configuration(format!(
                "RENDER_EXTERNAL_URL must be an http(s) URL, got '{raw_url}'"
            )));
        }

        if self.port == 0 {
            return Err(PdfBotError::Configuration("PORT must be non-zero".into()));
        }

        self.pipeline.validate()?;

        Ok(BotConfig {
            bot_token,
            public_url,
            listen_ip: self.listen_ip,
            port: self.port,
            pipeline: self.pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.text_engine, TextEngine::Pdfium);
        assert_eq!(c.chunk_size, 4096);
        assert_eq!(c.image_width_inches, 5.0);
        assert!(c.pdfium_lib_path.is_none());
    }

    #[test]
    fn pipeline_rejects_oversized_chunks() {
        let err = PipelineConfig::builder().chunk_size(5000).build().unwrap_err();
        assert!(matches!(err, PdfBotError::Configuration(_)));
        assert!(PipelineConfig::builder().chunk_size(0).build().is_err());
        assert!(PipelineConfig::builder().chunk_size(100).build().is_ok());
    }

    #[test]
    fn pipeline_rejects_bad_width() {
        assert!(PipelineConfig::builder().image_width_inches(0.0).build().is_err());
        assert!(PipelineConfig::builder()
            .image_width_inches(f32::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn missing_token_is_configuration_error() {
        let err = BotConfig::builder()
            .public_url("https://bot.example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"), "got: {err}");
    }

    #[test]
    fn blank_url_is_configuration_error() {
        let err = BotConfig::builder()
            .bot_token("123:abc")
            .public_url("   ")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("RENDER_EXTERNAL_URL"), "got: {err}");
    }

    #[test]
    fn non_http_url_rejected() {
        let err = BotConfig::builder()
            .bot_token("123:abc")
            .public_url("ftp://bot.example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, PdfBotError::Configuration(_)));
    }

    #[test]
    fn webhook_url_appends_token() {
        let cfg = BotConfig::builder()
            .bot_token("123:abc")
            .public_url("https://bot.example.com/")
            .port(8443)
            .build()
            .unwrap();
        assert_eq!(
            cfg.webhook_url().unwrap().as_str(),
            "https://bot.example.com/123:abc"
        );
        assert_eq!(cfg.listen_addr().port(), 8443);
        assert!(cfg.listen_addr().ip().is_unspecified());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = BotConfig::builder()
            .bot_token("123:secret")
            .public_url("https://bot.example.com")
            .build()
            .unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
