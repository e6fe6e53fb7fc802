//! The account and avatar endpoints.
//!
//! Every handler checks its own method, reads JSON (or, for updates,
//! multipart form data) and answers JSON. Flows that verify a credential hold
//! the account's lock from loading the account until the verdict is saved.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use http::{Method, StatusCode};
use pixel_http::protocol::{Request, Response};
use serde::Deserialize;
use tracing::{info, warn};

use crate::app::AppState;
use crate::auth::token::TokenKind;
use crate::error::ApiError;
use crate::extract::{form_data, identity, json_body, require_method};
use crate::handler::HandlerResult;
use crate::lockout::Verdict;
use crate::request::RequestExt;
use crate::responder::{Json, Message, Responder};
use crate::store::{Account, AccountGuard, AccountView, NewAccount, PublicAccountView, StoreError, TokenRecord};
use crate::user::password::{hash_password, verify_password};
use crate::user::secret;
use crate::user::validate::{validate_email, validate_password, validate_username, FieldError, ValidationErrors};

const USER_NOT_FOUND: &str = "User not found";
const EMAIL_TAKEN: &str = "User with this email already exists";
const ALREADY_ACTIVE: &str = "User is already activated";
const NOT_ACTIVE: &str = "User is not activated";
const BAD_CREDENTIALS: &str = "Invalid email or password";
const IMAGE_JPEG: &str = "image/jpeg";

#[derive(Debug, Deserialize)]
struct CreateAccountInput {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct EmailInput {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct ActivateInput {
    #[serde(default)]
    email: String,
    otp: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LoginInput {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct RefreshInput {
    #[serde(default, alias = "RefreshToken")]
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordInput {
    #[serde(default)]
    email: String,
    #[serde(default)]
    reset_token: String,
    #[serde(default)]
    password: String,
}

/// `POST /user/create`
pub async fn create_account(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::POST)?;
    let input: CreateAccountInput = json_body(&req)?;

    let mut errors = ValidationErrors::new();
    errors.check(validate_email(&input.email));
    errors.check(validate_username(&input.username));
    errors.check(validate_password(&input.password));
    errors.into_result()?;

    let password_hash = hash_password(input.password).await?;
    let new_account = NewAccount { username: input.username, email: input.email, password_hash };
    let account = state.store.create_account(new_account).await.map_err(conflict_on_email)?;

    info!(account_id = account.id, "account created");
    Json::created(AccountView::from(&account)).respond()
}

/// `POST /user/send_otp`
pub async fn send_otp(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::POST)?;
    let input: EmailInput = json_body(&req)?;
    ensure_present(&input.email)?;

    let (_guard, mut account) = lock_account_by_email(&state, &input.email).await?;
    if account.is_active {
        return Err(ApiError::conflict(ALREADY_ACTIVE));
    }

    let now = Utc::now();
    if let Some(remaining_secs) = account.otp.lockout.remaining_secs(now) {
        return Err(ApiError::too_many_requests(remaining_secs));
    }

    let code = secret::activation_code();
    account.otp.issue(code, expires_in(now, state.config.otp.code_ttl));
    let account = save_account(&state, account).await?;

    state.mailer.send_activation(&account.email, code).await?;
    Message::ok("Activation code sent").respond()
}

/// `POST /user/activate`
pub async fn activate_account(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::POST)?;
    let input: ActivateInput = json_body(&req)?;
    ensure_present(&input.email)?;
    let otp = input.otp.ok_or(ApiError::status(StatusCode::BAD_REQUEST))?;

    let (_guard, mut account) = lock_account_by_email(&state, &input.email).await?;
    if account.is_active {
        return Err(ApiError::conflict(ALREADY_ACTIVE));
    }

    match account.otp.verify(&otp, &state.config.lockout.otp, Utc::now()) {
        Verdict::Verified => {
            account.is_active = true;
            let account = save_account(&state, account).await?;
            info!(account_id = account.id, "account activated");
            Message::ok("User successfully activated").respond()
        }
        Verdict::Expired => Err(ApiError::conflict("Activation code expired")),
        Verdict::InvalidCredential => {
            save_account(&state, account).await?;
            Err(ApiError::conflict("Invalid activation code"))
        }
        Verdict::TooManyRequests { remaining_secs } => Err(ApiError::too_many_requests(remaining_secs)),
    }
}

/// `POST /user/auth`
pub async fn authenticate(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::POST)?;
    let input: LoginInput = json_body(&req)?;
    ensure_present(&input.email)?;
    ensure_present(&input.password)?;

    let (_guard, mut account) = lock_account_by_email(&state, &input.email).await?;
    if !account.is_active {
        return Err(ApiError::unauthorized(NOT_ACTIVE));
    }

    // refuse before paying for a hash comparison
    let now = Utc::now();
    if let Some(remaining_secs) = account.auth.remaining_secs(now) {
        return Err(ApiError::too_many_requests(remaining_secs));
    }

    let matches = verify_password(account.password_hash.clone(), input.password).await?;
    match account.auth.check(&state.config.lockout.login, now, matches) {
        Verdict::Verified => {
            let account = save_account(&state, account).await?;
            let pair = state.signer.issue_pair(&account, now)?;
            let record = TokenRecord {
                account_id: account.id,
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
                ..TokenRecord::default()
            };
            let record = state.store.save_token(record).await?;

            info!(account_id = account.id, "account authenticated");
            Json::ok(record).respond()
        }
        Verdict::InvalidCredential | Verdict::Expired => {
            let account = save_account(&state, account).await?;
            warn!(account_id = account.id, tries = account.auth.tries, "wrong password");
            Err(ApiError::unauthorized(BAD_CREDENTIALS))
        }
        Verdict::TooManyRequests { remaining_secs } => Err(ApiError::too_many_requests(remaining_secs)),
    }
}

/// `POST /user/refresh`
///
/// Rotates the token record in place: the presented refresh token and its
/// access token stop working.
pub async fn refresh_tokens(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::POST)?;
    let input: RefreshInput = json_body(&req)?;
    ensure_present(&input.refresh_token)?;

    let mut record = state
        .store
        .find_token_by_refresh(&input.refresh_token)
        .await?
        .ok_or(ApiError::status(StatusCode::NOT_FOUND))?;

    let now = Utc::now();
    let claims = state.signer.verify(TokenKind::Refresh, &input.refresh_token, now).map_err(|e| {
        warn!(cause = %e, token_id = record.id, "refresh token rejected");
        ApiError::status(StatusCode::UNAUTHORIZED)
    })?;

    let account = state
        .store
        .find_account(record.account_id)
        .await?
        .filter(|account| account.is_active && account.id == claims.sub)
        .ok_or(ApiError::status(StatusCode::UNAUTHORIZED))?;

    let pair = state.signer.issue_pair(&account, now)?;
    record.access_token = pair.access_token;
    record.refresh_token = pair.refresh_token;
    let record = state.store.save_token(record).await?;

    Json::ok(record).respond()
}

/// `GET /user/get/{int:ID}`
pub async fn get_account(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::GET)?;
    let id: u64 = req.path_params().get_as("ID").ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;

    let account = state.store.find_account(id).await?.ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    Json::ok(PublicAccountView::from(&account)).respond()
}

/// `GET /user/me`
pub async fn get_me(_state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::GET)?;
    let identity = identity(&req)?;

    Json::ok(AccountView::from(&identity.account)).respond()
}

/// `PATCH /user/update`
///
/// Multipart fields `username`, `email`, `new_password` with `old_password`,
/// and an `avatar` file. At least one of them must be given.
pub async fn update_account(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::PATCH)?;
    let account_id = identity(&req)?.account.id;
    let form = form_data(&req)?;

    let username = form.non_empty_field("username");
    let email = form.non_empty_field("email");
    let new_password = form.non_empty_field("new_password");
    let old_password = form.non_empty_field("old_password");
    let avatar = form.first_file("avatar").filter(|file| !file.is_empty());

    if username.is_none() && email.is_none() && new_password.is_none() && avatar.is_none() {
        return Err(ApiError::status(StatusCode::BAD_REQUEST));
    }

    let mut errors = ValidationErrors::new();
    if let Some(username) = username {
        errors.check(validate_username(username));
    }
    if let Some(email) = email {
        errors.check(validate_email(email));
    }
    if let Some(new_password) = new_password {
        errors.check(validate_password(new_password).map_err(|e| FieldError::new("new_password", e.message)));
        if old_password.is_none() {
            errors.push(FieldError::new("old_password", "old_password is required to change the password"));
        }
    }
    errors.into_result()?;

    let _guard = state.locks.lock(account_id).await;
    let mut account = state.store.find_account(account_id).await?.ok_or(ApiError::status(StatusCode::UNAUTHORIZED))?;

    if let (Some(new_password), Some(old_password)) = (new_password, old_password) {
        if !verify_password(account.password_hash.clone(), old_password.to_string()).await? {
            return Err(ApiError::status(StatusCode::UNAUTHORIZED));
        }
        account.password_hash = hash_password(new_password.to_string()).await?;
    }
    if let Some(username) = username {
        account.username = username.to_string();
    }
    if let Some(email) = email {
        account.email = email.to_string();
    }

    let previous_avatar = account.avatar.clone();
    let new_avatar = match avatar {
        Some(avatar) => Some(state.media.save_avatar(account.id, avatar.data()).await?),
        None => None,
    };
    if new_avatar.is_some() {
        account.avatar = new_avatar.clone();
    }

    let account = match save_account(&state, account).await {
        Ok(account) => account,
        Err(e) => {
            discard_avatar(&state, new_avatar.as_deref()).await;
            return Err(e);
        }
    };
    if new_avatar.is_some() {
        discard_avatar(&state, previous_avatar.as_deref()).await;
    }

    info!(account_id = account.id, "account updated");
    Json::ok(AccountView::from(&account)).respond()
}

/// `DELETE /user/delete`
pub async fn delete_account(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::DELETE)?;
    let account = &identity(&req)?.account;

    let _guard = state.locks.lock(account.id).await;
    if !state.store.delete_account(account.id).await? {
        return Err(ApiError::status(StatusCode::UNAUTHORIZED));
    }
    discard_avatar(&state, account.avatar.as_deref()).await;

    info!(account_id = account.id, "account deleted");
    StatusCode::NO_CONTENT.respond()
}

/// `POST /user/send_reset_password_mail`
pub async fn send_reset_mail(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::POST)?;
    let input: EmailInput = json_body(&req)?;
    ensure_present(&input.email)?;

    let (_guard, mut account) = lock_account_by_email(&state, &input.email).await?;

    let now = Utc::now();
    if let Some(remaining_secs) = account.reset.lockout.remaining_secs(now) {
        return Err(ApiError::too_many_requests(remaining_secs));
    }

    let token = secret::reset_token();
    account.reset.issue(token.clone(), expires_in(now, state.config.otp.code_ttl));
    let account = save_account(&state, account).await?;

    state.mailer.send_password_reset(&account.email, &token).await?;
    Message::ok("Reset code sent").respond()
}

/// `POST /user/reset_password`
pub async fn reset_password(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::POST)?;
    let input: ResetPasswordInput = json_body(&req)?;
    ensure_present(&input.email)?;
    ensure_present(&input.reset_token)?;
    validate_password(&input.password).map_err(ValidationErrors::from)?;

    let (_guard, mut account) = lock_account_by_email(&state, &input.email).await?;

    match account.reset.verify(&input.reset_token, &state.config.lockout.reset, Utc::now()) {
        Verdict::Verified => {
            account.password_hash = hash_password(input.password).await?;
            account.auth.clear();
            let account = save_account(&state, account).await?;
            info!(account_id = account.id, "password reset");
            Message::ok("Password successfully reset").respond()
        }
        Verdict::Expired => Err(ApiError::conflict("Reset code expired")),
        Verdict::InvalidCredential => {
            save_account(&state, account).await?;
            Err(ApiError::conflict("Invalid reset code"))
        }
        Verdict::TooManyRequests { remaining_secs } => Err(ApiError::too_many_requests(remaining_secs)),
    }
}

/// `GET /images/{name}`
pub async fn avatar_image(state: Arc<AppState>, req: Request) -> HandlerResult {
    require_method(&req, Method::GET)?;
    let name = req.path_params().get("name").ok_or(ApiError::status(StatusCode::NOT_FOUND))?;

    match state.media.read_avatar(name).await? {
        Some(data) => Ok(Response::canned(StatusCode::OK).with_body(IMAGE_JPEG, data)),
        None => Err(ApiError::status(StatusCode::NOT_FOUND)),
    }
}

fn ensure_present(value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::status(StatusCode::BAD_REQUEST));
    }
    Ok(())
}

fn expires_in(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl).ok().and_then(|ttl| now.checked_add_signed(ttl)).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn conflict_on_email(e: StoreError) -> ApiError {
    match e {
        StoreError::EmailTaken { .. } => ApiError::conflict(EMAIL_TAKEN),
        other => other.into(),
    }
}

async fn save_account(state: &AppState, account: Account) -> Result<Account, ApiError> {
    state.store.save_account(account).await.map_err(conflict_on_email)
}

/// Finds the live account with `email` and takes its lock. The account is
/// read again under the lock so the caller sees the latest counters.
async fn lock_account_by_email(state: &AppState, email: &str) -> Result<(AccountGuard, Account), ApiError> {
    let found = state.store.find_account_by_email(email).await?.ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;

    let guard = state.locks.lock(found.id).await;
    let account = state.store.find_account(found.id).await?.ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    Ok((guard, account))
}

async fn discard_avatar(state: &AppState, url: Option<&str>) {
    let Some(url) = url else {
        return;
    };
    if let Err(e) = state.media.delete_avatar(url).await {
        warn!(cause = %e, %url, "can't delete avatar");
    }
}
