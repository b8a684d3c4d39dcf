mod global;
pub mod store;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(global::global_history).post(global::post_global))
}
