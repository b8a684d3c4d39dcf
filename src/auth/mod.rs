use axum::{routing::get, Router};
use rand::seq::IndexedRandom;

use crate::AppState;

mod callback;
mod clients;
mod gate;
mod login;
mod logout;

pub use clients::Clients;
pub use gate::{current_identity, ApiUser, PageUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(login::login))
        .route("/auth/google/callback", get(callback::callback))
        .route("/logout", get(logout::logout))
}

/// Stand-in display name for accounts whose provider sent none.
pub(crate) fn random_alias() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    format!(
        "{} {}",
        adjectives.choose(&mut rng).unwrap_or(&"Nameless"),
        nouns.choose(&mut rng).unwrap_or(&"User"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_have_two_words() {
        let alias = random_alias();
        assert_eq!(alias.split(' ').count(), 2);
    }
}
