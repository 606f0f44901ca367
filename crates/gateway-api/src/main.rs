//! 트레이딩 게이트웨이 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다. 세션/자격증명 계층,
//! 거래소 어댑터 팩토리, 시장 데이터 캐시 새로고침 루프를 구성합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use gateway_api::repository::PgCredentialStore;
use gateway_api::routes::create_api_router;
use gateway_api::state::AppState;
use gateway_core::credential::MemoryCredentialStore;
use gateway_core::{init_logging_from_env, CredentialCipher, CredentialStore, ExchangeId, GatewayConfig};
use gateway_exchange::cache::spawn_refresh_tasks;
use gateway_exchange::ExchangeAdapter;

/// 세션 정리 주기. 만료는 조회 시점에 이미 걸러지므로 메모리 위생용입니다.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// 자격증명 저장소 구성.
///
/// `DATABASE_URL`이 있으면 PostgreSQL, 없으면 인메모리 저장소를
/// 사용합니다 (단일 프로세스 개발/테스트용).
async fn build_credential_store(
    config: &GatewayConfig,
    cipher: Arc<CredentialCipher>,
) -> Result<Arc<dyn CredentialStore>, Box<dyn std::error::Error>> {
    match &config.database {
        Some(db) => {
            let pool = PgPoolOptions::new()
                .max_connections(db.max_connections)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&db.url)
                .await?;

            sqlx::query("SELECT 1").fetch_one(&pool).await?;
            info!("PostgreSQL 자격증명 저장소 연결 완료");
            Ok(Arc::new(PgCredentialStore::new(pool, cipher)))
        }
        None => {
            warn!("DATABASE_URL 미설정, 인메모리 자격증명 저장소 사용 (재시작 시 소실)");
            Ok(Arc::new(MemoryCredentialStore::new(cipher)))
        }
    }
}

/// 캐시 새로고침용 공개 어댑터 구성.
fn public_adapters(state: &AppState) -> Vec<(ExchangeId, Arc<dyn ExchangeAdapter>)> {
    ExchangeId::ALL
        .iter()
        .filter_map(|&exchange| match state.factory.create_public_adapter(exchange) {
            Ok(adapter) => Some((exchange, adapter)),
            Err(e) => {
                warn!(exchange = %exchange, error = %e, "공개 어댑터 생성 실패, 캐시 새로고침 제외");
                None
            }
        })
        .collect()
}

/// CORS 미들웨어 구성.
///
/// `CORS_ORIGINS` 환경변수가 있으면 해당 origin만 허용하고, 없으면
/// 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS에 유효한 origin이 없어 전체 허용");
                AllowOrigin::any()
            } else {
                info!(count = origins.len(), "CORS origin 제한 적용");
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS 미설정, 모든 origin 허용 (개발 모드)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
}

/// 세션 정리 백그라운드 태스크.
fn spawn_session_purge(state: Arc<AppState>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let purged = state.sessions.purge_expired().await;
                    if purged > 0 {
                        info!(purged, "만료 세션 정리");
                    }
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_logging_from_env()?;

    // 마스터 시크릿 없이는 자격증명을 복호화할 수 없으므로 여기서
    // 즉시 종료합니다. 유일한 프로세스 수준 치명 에러입니다.
    let config = GatewayConfig::from_env().map_err(|e| {
        error!(error = %e, "설정 로드 실패");
        e
    })?;

    let cipher = Arc::new(CredentialCipher::new(&config.master_secret)?);
    let store = build_credential_store(&config, cipher).await?;

    let state = Arc::new(AppState::new(
        store,
        chrono::Duration::hours(config.session_ttl_hours as i64),
    ));

    let shutdown_token = CancellationToken::new();

    // 시세/심볼 메타데이터 새로고침 루프 (요청 처리와 독립)
    spawn_refresh_tasks(
        state.ticker_cache.clone(),
        state.asset_cache.clone(),
        public_adapters(&state),
        shutdown_token.clone(),
    );
    spawn_session_purge(state.clone(), shutdown_token.clone());

    let app: Router = create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors_layer());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "게이트웨이 API 서버 시작");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    shutdown_token.cancel();
    info!("서버 정상 종료");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM을 수신하면 백그라운드 태스크에 종료를 전파합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Ctrl+C 수신, graceful shutdown 시작");
        }
        _ = terminate => {
            warn!("SIGTERM 수신, graceful shutdown 시작");
        }
    }

    shutdown_token.cancel();
}
