use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turnstile_web::config::ServerConfig;
use turnstile_web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "turnstile_web=debug,turnstile_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;
    let tls_config = config.tls.clone();
    let purge_interval = Duration::from_secs(config.rate_limit.purge_interval_secs.max(1));

    // Missing token settings or bad rules stop the server here.
    let state = AppState::from_config(config)
        .map_err(|e| anyhow::anyhow!("refusing to start: {e}"))?;

    // Expired rate limit counter cleanup
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_interval);
        loop {
            interval.tick().await;
            pipeline.limiter().purge_expired();
        }
    });

    let app = turnstile_web::build_router(state);

    if let (Some(cert), Some(key)) = (&tls_config.cert_path, &tls_config.key_path) {
        use axum_server::tls_rustls::RustlsConfig;
        let rustls_config = RustlsConfig::from_pem_file(cert, key).await?;
        tracing::info!("turnstile-web listening on https://{}", bind_addr);
        axum_server::bind_rustls(bind_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!("turnstile-web listening on http://{}", bind_addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
