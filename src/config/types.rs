//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::VoiceProfile;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 合成服务配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 断句配置
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// 后台 Worker 配置
    #[serde(default)]
    pub worker: WorkerConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,

    /// 音色目录
    #[serde(default)]
    pub voices: VoiceConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5060
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 合成服务类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    /// 远程 HTTP 合成服务
    #[default]
    Http,
    /// 本地生成测试音，不依赖外部服务
    Fake,
}

impl TtsProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            TtsProvider::Http => "http",
            TtsProvider::Fake => "fake",
        }
    }
}

/// 合成服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub provider: TtsProvider,

    /// 合成服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 单次合成超时时间（秒），超时后任务失败
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tts_timeout() -> u64 {
    60
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
        }
    }
}

/// 断句配置
#[derive(Debug, Clone, Deserialize)]
pub struct SegmenterConfig {
    /// 单段文本最大字数
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    /// 创建任务时未指定断句标准所用的标准 id
    #[serde(default = "default_standard")]
    pub default_standard: u8,

    /// 按字数断句时未指定字数所用的值
    #[serde(default = "default_char_count")]
    pub default_char_count: usize,
}

fn default_max_text_chars() -> usize {
    10_000
}

fn default_standard() -> u8 {
    1
}

fn default_char_count() -> usize {
    50
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            default_standard: default_standard(),
            default_char_count: default_char_count(),
        }
    }
}

/// 后台 Worker 配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// 同时进行的合成调用数
    #[serde(default = "default_synthesis_concurrency")]
    pub synthesis_concurrency: usize,

    /// 同时进行的合并数
    #[serde(default = "default_merge_concurrency")]
    pub merge_concurrency: usize,

    /// 合成/合并队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_synthesis_concurrency() -> usize {
    4
}

fn default_merge_concurrency() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    1000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            synthesis_concurrency: default_synthesis_concurrency(),
            merge_concurrency: default_merge_concurrency(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/narro.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 音频存储目录（sled 数据库位于其下）
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    /// 最大存储空间（字节），0 表示不限制
    #[serde(default)]
    pub max_size_bytes: u64,
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("data/audio")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            max_size_bytes: 0,
        }
    }
}

impl StorageConfig {
    /// sled 数据库路径
    pub fn store_path(&self) -> PathBuf {
        self.audio_dir.join("store.sled")
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// 音色目录配置
///
/// ```toml
/// [[voices.catalog]]
/// voice_id = "narrator-female"
/// name = "知性女声"
/// voice_type = "female"
/// language = "zh-CN"
/// recommended = true
/// sort_order = 1
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_voices")]
    pub catalog: Vec<VoiceProfile>,
}

fn voice(id: &str, name: &str, voice_type: &str, language: &str, sort_order: i32) -> VoiceProfile {
    VoiceProfile {
        voice_id: id.to_string(),
        name: name.to_string(),
        voice_type: voice_type.to_string(),
        language: language.to_string(),
        recommended: sort_order <= 2,
        sort_order,
        avatar_url: None,
    }
}

fn default_voices() -> Vec<VoiceProfile> {
    vec![
        voice("narrator-female", "知性女声", "female", "zh-CN", 1),
        voice("narrator-male", "沉稳男声", "male", "zh-CN", 2),
        voice("storyteller-child", "童声", "child", "zh-CN", 3),
        voice("narrator-en", "English Narrator", "female", "en-US", 4),
    ]
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            catalog: default_voices(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5060);
        assert_eq!(config.tts.provider, TtsProvider::Http);
        assert_eq!(config.tts.url, "http://localhost:8000");
        assert_eq!(config.segmenter.max_text_chars, 10_000);
        assert_eq!(config.segmenter.default_standard, 1);
        assert_eq!(config.segmenter.default_char_count, 50);
        assert_eq!(config.worker.synthesis_concurrency, 4);
        assert_eq!(config.worker.merge_concurrency, 2);
        assert_eq!(config.worker.queue_capacity, 1000);
        assert_eq!(config.database.path, "data/narro.db");
        assert_eq!(config.voices.catalog.len(), 4);
        assert_eq!(config.voices.catalog.iter().filter(|v| v.recommended).count(), 2);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5060");
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/narro.db?mode=rwc");
    }

    #[test]
    fn test_provider_deserialize() {
        let provider: TtsProvider = serde_json::from_str("\"fake\"").unwrap();
        assert_eq!(provider, TtsProvider::Fake);
        assert!(serde_json::from_str::<TtsProvider>("\"grpc\"").is_err());
    }

    #[test]
    fn test_store_path() {
        let config = StorageConfig::default();
        assert_eq!(config.store_path(), PathBuf::from("data/audio/store.sled"));
    }
}
