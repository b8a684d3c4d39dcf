use anyhow::{anyhow, Context};
use tower_sessions::cookie::Key;

pub const DEFAULT_PORT: u16 = 3000;

/// Process configuration, read from `.env` and the environment.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub session_key: Key,
    pub port: u16,
    pub production: bool,
    pub public_url: String,
    pub google: Option<GoogleCredentials>,
}

#[derive(Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();

        let database_url = dotenv::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let secret = dotenv::var("SESSION_SECRET").context("SESSION_SECRET must be set")?;
        let port = match dotenv::var("PORT") {
            Ok(port) => port.parse().with_context(|| format!("PORT is not a port number: {port}"))?,
            Err(_) => DEFAULT_PORT,
        };
        let production = dotenv::var("APP_ENV").is_ok_and(|env| env == "production");
        let public_url = dotenv::var("PUBLIC_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let google = match (dotenv::var("GOOGLE_CLIENT_ID"), dotenv::var("GOOGLE_CLIENT_SECRET")) {
            (Ok(client_id), Ok(client_secret)) if !client_id.is_empty() => Some(GoogleCredentials { client_id, client_secret }),
            _ => None,
        };

        Ok(Config {
            database_url,
            session_key: session_key(&secret)?,
            port,
            production,
            public_url: public_url.trim_end_matches('/').to_owned(),
            google,
        })
    }
}

/// Signing key for session cookies; the secret must carry at least 64 bytes.
pub fn session_key(secret: &str) -> anyhow::Result<Key> {
    Key::try_from(secret.as_bytes())
        .map_err(|_| anyhow!("SESSION_SECRET must be at least 64 bytes long"))
}
