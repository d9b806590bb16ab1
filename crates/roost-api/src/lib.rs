pub mod admin;
pub mod auth;
pub mod channels;
pub mod dms;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod misc;
pub mod standup;
pub mod users;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};

use roost_store::Store;

pub struct AppStateInner {
    pub store: Store,
}

pub type AppState = Arc<AppStateInner>;

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Build the full application router. Shared between the server binary and
/// the integration tests.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/password-reset/request", post(auth::reset_request))
        .route("/auth/password-reset/reset", post(auth::reset))
        .route("/clear", delete(misc::clear))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/users", get(users::list_all))
        .route("/users/me/name", put(users::set_name))
        .route("/users/me/email", put(users::set_email))
        .route("/users/me/handle", put(users::set_handle))
        .route("/users/me/stats", get(users::user_stats))
        .route("/users/{user_id}", get(users::profile))
        .route("/workspace/stats", get(users::workspace_stats))
        .route("/channels", post(channels::create).get(channels::list_mine))
        .route("/channels/all", get(channels::list_all))
        .route("/channels/{channel_id}", get(channels::details))
        .route("/channels/{channel_id}/join", post(channels::join))
        .route("/channels/{channel_id}/invite", post(channels::invite))
        .route("/channels/{channel_id}/leave", post(channels::leave))
        .route("/channels/{channel_id}/owners", post(channels::add_owner))
        .route("/channels/{channel_id}/owners/{user_id}", delete(channels::remove_owner))
        .route(
            "/channels/{channel_id}/messages",
            get(channels::messages).post(messages::send_channel),
        )
        .route("/channels/{channel_id}/messages/later", post(messages::send_channel_later))
        .route("/channels/{channel_id}/standup", post(standup::start).get(standup::active))
        .route("/channels/{channel_id}/standup/send", post(standup::send))
        .route("/dms", post(dms::create).get(dms::list))
        .route("/dms/{dm_id}", get(dms::details).delete(dms::remove))
        .route("/dms/{dm_id}/leave", post(dms::leave))
        .route("/dms/{dm_id}/messages", get(dms::messages).post(messages::send_dm))
        .route("/dms/{dm_id}/messages/later", post(messages::send_dm_later))
        .route("/messages/{message_id}", put(messages::edit).delete(messages::remove))
        .route("/messages/{message_id}/react", post(messages::react))
        .route("/messages/{message_id}/unreact", post(messages::unreact))
        .route("/messages/{message_id}/pin", post(messages::pin))
        .route("/messages/{message_id}/unpin", post(messages::unpin))
        .route("/messages/{message_id}/share", post(messages::share))
        .route("/search", get(misc::search))
        .route("/notifications", get(misc::notifications))
        .route("/admin/permissions", post(admin::change_permission))
        .route("/admin/users/{user_id}", delete(admin::remove_user))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new().merge(public).merge(protected)
}
