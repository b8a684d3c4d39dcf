//! Keys under which request state lives in the session.

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";

/// Sessions idle for longer than this are dropped.
pub const LIFETIME: time::Duration = time::Duration::days(14);
