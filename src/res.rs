use axum::{debug_handler, response::{Html, IntoResponse}};

use crate::auth::PageUser;

#[macro_export]
macro_rules! include_res {
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

#[debug_handler]
pub async fn landing() -> impl IntoResponse {
    Html(include_res!(str, "/pages/index.html"))
}

#[debug_handler(state = crate::AppState)]
pub async fn chat(PageUser(_): PageUser) -> impl IntoResponse {
    Html(include_res!(str, "/pages/chat.html"))
}
