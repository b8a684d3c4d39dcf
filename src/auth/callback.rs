use axum::{debug_handler, extract::{Query, State}, response::Redirect};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{models::Identity, session::{CSRF_STATE, PKCE_VERIFIER, USER_ID}, users, AppError, AppResult, GetField};

use super::{clients::GOOGLE_USERINFO_URL, random_alias, Clients};

#[derive(Deserialize)]
pub(crate) struct CallbackQuery {
    state: Option<String>,
    code: Option<String>,
    error: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn callback(
    Query(query): Query<CallbackQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> Redirect {
    match sign_in(query, &db_pool, &clients, &session).await {
        Ok(identity) => {
            tracing::info!(user = %identity.id, name = %identity.display_name, "signed in");
            Redirect::to("/chat")
        }
        Err(err) => {
            tracing::warn!(error = %err, "sign-in failed");
            Redirect::to("/")
        }
    }
}

async fn sign_in(
    CallbackQuery { state, code, error }: CallbackQuery,
    db_pool: &SqlitePool,
    clients: &Clients,
    session: &Session,
) -> AppResult<Identity> {
    if let Some(error) = error {
        return Err(AppError::from(format!("OAuth: provider said {error}")));
    }
    let state = CsrfToken::new(state.ok_or("OAuth: without state")?);
    let code = AuthorizationCode::new(code.ok_or("OAuth: without code")?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err("no csrf_state".into());
    };
    if state.secret().as_str() != stored_state.as_str() {
        return Err("csrf tokens don't match".into());
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err("no pkce_verifier".into());
    };

    let client = clients.google()?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let profile: serde_json::Value = http_client.get(GOOGLE_USERINFO_URL)
        .bearer_auth(token_result.access_token().secret())
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let google_id = profile.get_str_field("id")?;
    let email = profile.get_str_field("email")?;
    let display_name = profile.get_str_field("name")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(random_alias);

    let identity = users::store::find_or_create(db_pool, &google_id, &display_name, &email).await?;

    session.cycle_id().await?;
    session.insert(USER_ID, identity.id).await?;
    Ok(identity)
}
