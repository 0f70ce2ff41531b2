//! Narro - 长文本分句合成后端
//!
//! 启动顺序：配置 → 日志 → 数据库与音频存储 → 合成服务 → Worker 与编排器 → HTTP

use std::sync::Arc;

use narro::application::ports::TtsEnginePort;
use narro::config::{load_config, print_config, AppConfig, TtsProvider};
use narro::infrastructure::adapters::{
    FakeTtsClient, FakeTtsClientConfig, HttpTtsClient, HttpTtsClientConfig, WavMerger,
};
use narro::infrastructure::http::{HttpServer, ServerConfig};
use narro::infrastructure::persistence::sled::{SledAudioStore, SledStoreConfig};
use narro::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};
use narro::infrastructure::{Runtime, RuntimeOptions};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},narro={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_tts_engine(config: &AppConfig) -> anyhow::Result<Arc<dyn TtsEnginePort>> {
    let engine: Arc<dyn TtsEnginePort> = match config.tts.provider {
        TtsProvider::Http => {
            let tts_config = HttpTtsClientConfig::new(&config.tts.url)
                .with_timeout(config.tts.timeout_secs);
            Arc::new(HttpTtsClient::new(tts_config)?)
        }
        TtsProvider::Fake => Arc::new(FakeTtsClient::new(FakeTtsClientConfig::default())),
    };
    Ok(engine)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Narro - 长文本分句合成后端");
    print_config(&config);

    // 确保数据目录存在
    tokio::fs::create_dir_all(&config.storage.audio_dir).await?;
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 音频存储
    let store_config = SledStoreConfig {
        db_path: config.storage.store_path().to_string_lossy().to_string(),
        max_size_bytes: config.storage.max_size_bytes,
    };
    let audio_store = SledAudioStore::new(&store_config)?.arc();

    let tts_engine = build_tts_engine(&config)?;
    if !tts_engine.health_check().await {
        tracing::warn!(
            url = %config.tts.url,
            "TTS provider is not reachable, synthesis jobs will fail until it is"
        );
    }

    let runtime = Runtime::start(
        pool,
        audio_store,
        tts_engine,
        Arc::new(WavMerger::new()),
        RuntimeOptions::from_config(&config)?,
    )
    .await?;

    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let server = HttpServer::new(server_config, runtime.app_state());

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
