use hearthchat::{auth, config::Config, db, into_app, relay::Relay, router, AppState};
use tracing_subscriber::EnvFilter;

const MAX_DB_CONNECTIONS: u32 = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let db_pool = match db::connect(&config.database_url, MAX_DB_CONNECTIONS).await {
        Ok(db_pool) => {
            tracing::info!("store connected");
            db_pool
        }
        Err(err) => {
            // keep serving; requests report the store failure
            tracing::error!(error = ?err, "store connection failed");
            db::connect_lazy(&config.database_url, MAX_DB_CONNECTIONS)?
        }
    };

    let app_state = AppState {
        db_pool,
        clients: auth::Clients::from_config(&config)?,
        relay: Relay::default(),
    };

    let app = into_app(router(), app_state, &config);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
