//! AuthGate API 서버 진입점.
//!
//! # 환경변수
//!
//! - `AUTHGATE_CONFIG`: 설정 파일 경로 (기본: `config/default.toml`)
//! - `AUTHGATE__SECTION__KEY`: 개별 설정 오버라이드 (예: `AUTHGATE__AUTH__SIGNING_SECRET`)
//! - `CORS_ORIGINS`: 쉼표로 구분된 허용 origin 목록
//! - `RUST_LOG`: 로그 필터 (설정 파일의 `logging.level`보다 우선)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::mysql::MySqlPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use authgate_api::auth::AccessPolicy;
use authgate_api::repository::{MySqlIdentityStore, MySqlTokenRegistry};
use authgate_api::{create_router, setup_metrics_recorder, AppState, RouterOptions};
use authgate_core::{
    init_logging, AppConfig, IdentityStore, MemoryIdentityStore, MemoryTokenRegistry,
    TokenRegistry,
};

/// OpenAPI 스펙 내보내기 처리.
///
/// `--export-openapi` 플래그가 있으면 OpenAPI JSON을 stdout으로 출력하고 `true`.
fn handle_export_openapi() -> anyhow::Result<bool> {
    use authgate_api::openapi::ApiDoc;
    use utoipa::OpenApi as _;

    if std::env::args().any(|arg| arg == "--export-openapi") {
        let json = ApiDoc::openapi().to_pretty_json()?;
        println!("{}", json);
        return Ok(true);
    }

    Ok(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    if handle_export_openapi()? {
        return Ok(());
    }

    let config_path =
        std::env::var("AUTHGATE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;

    init_logging(&config.logging).context("failed to initialize logging")?;

    info!(config = %config_path, "Starting AuthGate API server...");

    let metrics_handle = setup_metrics_recorder().context("failed to install metrics recorder")?;
    info!("Prometheus metrics recorder initialized");

    let policy = AccessPolicy::from_config(&config.access).context("invalid access rules")?;
    info!(rules = policy.rules().len(), "Access policy loaded");

    // 데이터 접근 협력자: DB URL이 있으면 MySQL, 없으면 인메모리
    let (store, registry, pool): (Arc<dyn IdentityStore>, Arc<dyn TokenRegistry>, _) =
        match &config.database.url {
            Some(url) => {
                if !config.seed_identities.is_empty() {
                    warn!(
                        count = config.seed_identities.len(),
                        "seed_identities are ignored when database.url is set"
                    );
                }
                let pool = MySqlPoolOptions::new()
                    .max_connections(config.database.max_connections)
                    .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
                    .connect(url)
                    .await
                    .context("failed to connect to database")?;
                info!("Connected to MySQL successfully");
                (
                    Arc::new(MySqlIdentityStore::new(pool.clone())),
                    Arc::new(MySqlTokenRegistry::new(pool.clone())),
                    Some(pool),
                )
            }
            None => {
                warn!("database.url not set, using in-memory identity store (development mode)");
                if config.seed_identities.is_empty() {
                    warn!("No seed_identities configured, every login will be rejected");
                } else {
                    info!(count = config.seed_identities.len(), "Seeding in-memory identities");
                }
                (
                    Arc::new(MemoryIdentityStore::from_seeds(&config.seed_identities)),
                    Arc::new(MemoryTokenRegistry::new()),
                    None,
                )
            }
        };

    let mut state = AppState::new(store, &config.auth, policy).with_metrics(metrics_handle);
    if let Some(pool) = pool {
        state = state.with_db_pool(pool);
    }
    if config.auth.revocation_enabled {
        state = state.with_token_registry(registry);
    } else {
        info!("Token revocation disabled");
    }
    info!(version = %state.version, "Application state initialized");

    // 전역 종료 토큰 (graceful shutdown용)
    let shutdown_token = CancellationToken::new();

    let (app, login_limit) = create_router(Arc::new(state), RouterOptions::from_config(&config));
    let cleanup_handle = login_limit
        .as_ref()
        .map(|limit| limit.limiter().spawn_cleanup(shutdown_token.clone()));

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_address()))?;

    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
    .await?;

    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();

    if let Some(handle) = cleanup_handle {
        if tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .is_err()
        {
            warn!("Cleanup timeout, forcing shutdown");
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
}
