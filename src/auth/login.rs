use axum::{debug_handler, extract::State, response::Redirect};
use oauth2::{CsrfToken, PkceCodeChallenge, Scope};
use tower_sessions::Session;

use crate::{session::{CSRF_STATE, PKCE_VERIFIER}, AppResult};

use super::Clients;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Redirect> {
    let client = clients.google()?;

    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = client.authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new("profile".to_string()))
        .add_scope(Scope::new("email".to_string()))
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;

    Ok(Redirect::to(authorize_url.as_str()))
}
