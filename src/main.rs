use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;

use phoenix_iam::config::IamConfig;
use phoenix_iam::error::AppError;
use phoenix_iam::middleware::create_ip_rate_limiter;
use phoenix_iam::oauth::code::AuthorizationCodeCodec;
use phoenix_iam::oauth::session::SessionStateCodec;
use phoenix_iam::observability::init_tracing;
use phoenix_iam::roles::RoleRegistry;
use phoenix_iam::services::{
    ActivationService, AuthorizationFlow, ConsentManager, EmailSender, MockEmailService, MongoDb,
    SmtpEmailService,
};
use phoenix_iam::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let config = IamConfig::load()?;
    init_tracing("info");
    tracing::info!(port = config.port, "starting identity service");

    let db = Arc::new(MongoDb::connect(&config.mongodb.uri, &config.mongodb.database).await?);
    db.initialize_indexes().await?;
    tracing::info!(database = %config.mongodb.database, "database initialized");

    let email: Arc<dyn EmailSender> = if config.smtp.enabled {
        Arc::new(SmtpEmailService::new(&config.smtp)?)
    } else {
        tracing::warn!("SMTP is disabled, activation codes will only be logged");
        Arc::new(MockEmailService)
    };

    let roles = Arc::new(RoleRegistry::from_names(&config.role_names));
    let flow = AuthorizationFlow::new(
        db.clone(),
        db.clone(),
        ConsentManager::new(db.clone()),
        SessionStateCodec::new(config.keys.session_key.clone()),
        AuthorizationCodeCodec::new(config.keys.code_key.clone()),
        roles.clone(),
    );
    let activation = ActivationService::new(db.clone(), email);

    let login_rate_limiter =
        create_ip_rate_limiter(config.rate_limit.per_second, config.rate_limit.burst);
    let register_rate_limiter =
        create_ip_rate_limiter(config.rate_limit.per_second, config.rate_limit.burst);

    let port = config.port;
    let state = AppState {
        config: Arc::new(config),
        flow,
        activation,
        roles,
        login_rate_limiter,
        register_rate_limiter,
    };

    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(address = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        },
    }
}
