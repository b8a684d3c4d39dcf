use oauth2::{basic::BasicClient, AuthUrl, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RedirectUrl, TokenUrl};

use crate::{config::Config, AppResult};

pub(crate) type GoogleClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const CALLBACK_PATH: &str = "/auth/google/callback";

#[derive(Clone, Default)]
pub struct Clients {
    google_client: Option<GoogleClient>,
}

impl Clients {
    pub fn from_config(config: &Config) -> AppResult<Clients> {
        let Some(google) = &config.google else {
            tracing::warn!("GOOGLE_CLIENT_ID not set; sign-in is disabled");
            return Ok(Clients::default());
        };

        let client = BasicClient::new(ClientId::new(google.client_id.clone()))
            .set_client_secret(ClientSecret::new(google.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(GOOGLE_AUTH_URL.to_owned())?)
            .set_token_uri(TokenUrl::new(GOOGLE_TOKEN_URL.to_owned())?)
            .set_redirect_uri(RedirectUrl::new(format!("{}{CALLBACK_PATH}", config.public_url))?);

        Ok(Clients { google_client: Some(client) })
    }

    pub(crate) fn google(&self) -> AppResult<&GoogleClient> {
        self.google_client
            .as_ref()
            .ok_or("OAuth provider google keys not supplied".into())
    }
}
