use axum::{routing::get, Router};

use agora_community::CommunityStore;

use crate::GlobalState;

pub fn misc_routes<S: CommunityStore>() -> Router<GlobalState<S>> {
    Router::new()
        .route("/health",
            get(|| async { "OK" })
        )
}
