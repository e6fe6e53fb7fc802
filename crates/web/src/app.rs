//! The pixel application: its shared state and its route table.

use std::sync::Arc;

use crate::auth::token::TokenSigner;
use crate::auth::AuthGate;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::handler::handler_fn;
use crate::mail::Mailer;
use crate::media::MediaStore;
use crate::router::{Endpoint, RouteError, Router};
use crate::store::{AccountLocks, Store};
use crate::user::handlers as user;

/// Everything a handler may touch. Only the store and the per-account locks
/// are mutable.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub signer: Arc<TokenSigner>,
    pub media: MediaStore,
    pub locks: AccountLocks,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            signer: Arc::new(TokenSigner::new(&config.auth)),
            media: MediaStore::new(config.media.avatars_dir.clone()),
            locks: AccountLocks::new(),
            config,
            store,
            mailer,
        }
    }
}

pub fn routes() -> Result<Router<AppState>, RouteError> {
    Router::builder()
        .route("/user/create", Endpoint::new("create_account", handler_fn(user::create_account)))
        .route("/user/send_otp", Endpoint::new("send_otp", handler_fn(user::send_otp)))
        .route("/user/activate", Endpoint::new("activate_account", handler_fn(user::activate_account)))
        .route("/user/auth", Endpoint::new("authenticate", handler_fn(user::authenticate)))
        .route("/user/refresh", Endpoint::new("refresh_tokens", handler_fn(user::refresh_tokens)))
        .route("/user/get/{int:ID}", Endpoint::new("get_account", handler_fn(user::get_account)))
        .route("/user/me", Endpoint::new("get_me", handler_fn(user::get_me)).with_identity())
        .route("/user/update", Endpoint::new("update_account", handler_fn(user::update_account)).with_identity())
        .route("/user/delete", Endpoint::new("delete_account", handler_fn(user::delete_account)).with_identity())
        .route("/user/send_reset_password_mail", Endpoint::new("send_reset_mail", handler_fn(user::send_reset_mail)))
        .route("/user/reset_password", Endpoint::new("reset_password", handler_fn(user::reset_password)))
        .route("/images/{name}", Endpoint::new("avatar_image", handler_fn(user::avatar_image)))
        .build()
}

/// The full request pipeline over `state`.
pub fn dispatcher(state: Arc<AppState>) -> Result<Dispatcher<AppState>, RouteError> {
    let gate = AuthGate::new(Arc::clone(&state.store), Arc::clone(&state.signer));
    Ok(Dispatcher::new(routes()?, state, Arc::new(gate)))
}
