//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml / config.local.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;
use crate::domain::{BreakingStandard, VoiceCatalog};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "NARRO";

/// 加载应用配置
///
/// # 环境变量示例
/// - `NARRO_SERVER__PORT=8080`
/// - `NARRO_TTS__PROVIDER=fake`
/// - `NARRO_TTS__URL=http://tts-server:8000`
/// - `NARRO_WORKER__SYNTHESIS_CONCURRENCY=8`
/// - `NARRO_DATABASE__PATH=/data/narro.db`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时搜索工作目录下的默认配置文件
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5060)?
        .set_default("tts.provider", "http")?
        .set_default("tts.url", "http://localhost:8000")?
        .set_default("tts.timeout_secs", 60)?
        .set_default("segmenter.max_text_chars", 10_000)?
        .set_default("segmenter.default_standard", 1)?
        .set_default("segmenter.default_char_count", 50)?
        .set_default("worker.synthesis_concurrency", 4)?
        .set_default("worker.merge_concurrency", 2)?
        .set_default("worker.queue_capacity", 1000)?
        .set_default("database.path", "data/narro.db")?
        .set_default("database.max_connections", 5)?
        .set_default("storage.audio_dir", "data/audio")?
        .set_default("storage.max_size_bytes", 0)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 层级分隔符: __ (双下划线)，例如 NARRO_TTS__URL
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    fn invalid(msg: impl Into<String>) -> Result<(), ConfigError> {
        Err(ConfigError::ValidationError(msg.into()))
    }

    if config.server.port == 0 {
        return invalid("Server port cannot be 0");
    }

    if config.tts.url.trim().is_empty() {
        return invalid("TTS URL cannot be empty");
    }

    if config.tts.timeout_secs == 0 {
        return invalid("TTS timeout must be at least 1 second");
    }

    if config.segmenter.max_text_chars == 0 {
        return invalid("segmenter.max_text_chars must be positive");
    }

    if let Err(e) = BreakingStandard::from_id(config.segmenter.default_standard) {
        return invalid(format!("segmenter.default_standard: {}", e));
    }

    if config.segmenter.default_char_count == 0 {
        return invalid("segmenter.default_char_count must be positive");
    }

    if config.worker.synthesis_concurrency == 0 || config.worker.merge_concurrency == 0 {
        return invalid("Worker concurrency must be positive");
    }

    if config.worker.queue_capacity == 0 {
        return invalid("worker.queue_capacity must be positive");
    }

    if config.database.path.is_empty() {
        return invalid("Database path cannot be empty");
    }

    if config.database.max_connections == 0 {
        return invalid("database.max_connections must be positive");
    }

    if let Err(id) = VoiceCatalog::new(config.voices.catalog.clone()) {
        return invalid(format!("voices.catalog: blank or duplicate voice_id '{}'", id));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("TTS Provider: {}", config.tts.provider.as_str());
    tracing::info!("TTS URL: {}", config.tts.url);
    tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
    tracing::info!(
        "Segmenter: max_text_chars={}, default_standard={}, default_char_count={}",
        config.segmenter.max_text_chars,
        config.segmenter.default_standard,
        config.segmenter.default_char_count
    );
    tracing::info!(
        "Workers: synthesis={}, merge={}, queue_capacity={}",
        config.worker.synthesis_concurrency,
        config.worker.merge_concurrency,
        config.worker.queue_capacity
    );
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Audio Directory: {:?}", config.storage.audio_dir);
    tracing::info!("Voices: {}", config.voices.catalog.len());
    tracing::info!("Log Level: {} (json: {})", config.log.level, config.log.json);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TtsProvider;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_tts_url() {
        let mut config = AppConfig::default();
        config.tts.url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_unknown_standard() {
        let mut config = AppConfig::default();
        config.segmenter.default_standard = 99;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_workers() {
        let mut config = AppConfig::default();
        config.worker.synthesis_concurrency = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.worker.queue_capacity = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_duplicate_voice() {
        let mut config = AppConfig::default();
        let first = config.voices.catalog[0].clone();
        config.voices.catalog.push(first);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_voices_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narro.toml");
        std::fs::write(
            &path,
            "[[voices.catalog]]\nvoice_id = \"aria\"\nname = \"Aria\"\n\
             voice_type = \"female\"\nlanguage = \"en-US\"\nrecommended = true\n",
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.voices.catalog.len(), 1);
        assert_eq!(config.voices.catalog[0].voice_id, "aria");
        assert_eq!(config.voices.catalog[0].sort_order, 0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narro.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[tts]\nprovider = \"fake\"\n\n\
             [segmenter]\nmax_text_chars = 200\n\n\
             [worker]\nmerge_concurrency = 1"
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.tts.provider, TtsProvider::Fake);
        assert_eq!(config.segmenter.max_text_chars, 200);
        assert_eq!(config.worker.merge_concurrency, 1);
        // 未出现的字段取默认值
        assert_eq!(config.segmenter.default_char_count, 50);
        assert_eq!(config.worker.synthesis_concurrency, 4);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narro.toml");
        std::fs::write(&path, "[segmenter]\ndefault_standard = 42\n").unwrap();

        let err = load_config_from_path(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
