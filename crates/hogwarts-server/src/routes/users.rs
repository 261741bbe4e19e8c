//! User management and login routes.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::prelude::*;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{NewUser, UserDto};
use crate::response::ApiResult;
use crate::state::AppState;
use crate::store::StoreError;
use crate::validation::Validator;

const USER: &str = "user";

/// Creates the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/", get(find_all_users).post(add_user))
        .route("/{user_id}", get(find_user).put(update_user).delete(delete_user))
}

/// Request body for creating a user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    pub roles: Option<String>,
}

/// Request body for updating a user. Passwords cannot be changed here.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    pub roles: Option<String>,
}

/// Response for a successful login.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_info: UserDto,
    pub token: String,
}

const ROLES_REQUIRED: &str = "roles are required.";

/// Turns a username clash into a field error.
fn username_conflict(err: StoreError) -> AppError {
    match err {
        StoreError::Conflict(msg) => {
            AppError::Validation(BTreeMap::from([("username".to_string(), msg)]))
        }
        other => AppError::Store(other),
    }
}

/// Decodes `Authorization: Basic base64(username:password)`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = BASE64_STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// POST /users/login - Exchange HTTP Basic credentials for a token.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ApiResult<LoginResponse>, AppError> {
    let (username, password) = basic_credentials(&headers).ok_or(AppError::MissingCredentials)?;

    let mut tx = state.store.begin().await?;
    let user = tx.find_user_by_username(&username).await?;
    drop(tx);

    let Some(user) = user else {
        tracing::info!(%username, "Login failed: unknown user");
        return Err(AppError::InvalidCredentials);
    };
    if !user.enabled {
        tracing::info!(%username, "Login failed: account disabled");
        return Err(AppError::AccountDisabled);
    }
    if !state.verify_password(password, user.password.clone()).await? {
        tracing::info!(%username, "Login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(&user.username, &user.role_list(), Utc::now(), state.token_ttl)?;

    tracing::info!(%username, "User logged in");
    Ok(ApiResult::success(
        "User Info and JSON Web Token",
        LoginResponse {
            user_info: UserDto::from(&user),
            token,
        },
    ))
}

/// GET /users
async fn find_all_users(State(state): State<AppState>) -> Result<ApiResult<Vec<UserDto>>, AppError> {
    let mut tx = state.store.begin().await?;
    let users = tx.find_all_users().await?;
    Ok(ApiResult::success(
        "Find All Success",
        users.iter().map(UserDto::from).collect(),
    ))
}

/// GET /users/{user_id}
async fn find_user(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<ApiResult<UserDto>, AppError> {
    let Path(user_id) = path?;
    let mut tx = state.store.begin().await?;
    let user = tx
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(USER, user_id))?;
    Ok(ApiResult::success("Find One Success", UserDto::from(&user)))
}

/// POST /users - Create a user. The password is stored as a bcrypt hash.
async fn add_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<ApiResult<UserDto>, AppError> {
    let Json(req) = body?;
    let mut v = Validator::new();
    let username = v.required("username", req.username);
    let password = v.required("password", req.password);
    let roles = v.required_with("roles", req.roles, ROLES_REQUIRED);
    v.finish()?;

    let password = state.hash_password(password).await?;

    let mut tx = state.store.begin().await?;
    let user = tx
        .insert_user(&NewUser {
            username,
            password,
            enabled: req.enabled,
            roles,
        })
        .await
        .map_err(username_conflict)?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, username = %user.username, "User created");
    Ok(ApiResult::success("Add Success", UserDto::from(&user)))
}

/// PUT /users/{user_id} - Update username, enabled flag and roles.
async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<ApiResult<UserDto>, AppError> {
    let Path(user_id) = path?;
    let Json(req) = body?;
    let mut v = Validator::new();
    let username = v.required("username", req.username);
    let roles = v.required_with("roles", req.roles, ROLES_REQUIRED);
    v.finish()?;

    let mut tx = state.store.begin().await?;
    let mut user = tx
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(USER, user_id))?;
    user.username = username;
    user.enabled = req.enabled;
    user.roles = roles;
    tx.save_user(&user).await.map_err(username_conflict)?;
    tx.commit().await?;

    tracing::info!(user_id, "User updated");
    Ok(ApiResult::success("Update Success", UserDto::from(&user)))
}

/// DELETE /users/{user_id}
async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<ApiResult<()>, AppError> {
    let Path(user_id) = path?;
    let mut tx = state.store.begin().await?;
    tx.find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(USER, user_id))?;
    tx.delete_user(user_id).await?;
    tx.commit().await?;

    tracing::info!(user_id, "User deleted");
    Ok(ApiResult::message_only("Delete Success"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_basic_credentials_decodes_username_and_password() {
        let encoded = BASE64_STANDARD.encode("john:123:456");
        let creds = basic_credentials(&headers(&format!("Basic {}", encoded)));
        assert_eq!(creds, Some(("john".to_string(), "123:456".to_string())));
    }

    #[test]
    fn test_basic_credentials_rejects_malformed_headers() {
        assert_eq!(basic_credentials(&HeaderMap::new()), None);
        assert_eq!(basic_credentials(&headers("Bearer abc")), None);
        assert_eq!(basic_credentials(&headers("Basic !!!")), None);
        let no_colon = BASE64_STANDARD.encode("john");
        assert_eq!(basic_credentials(&headers(&format!("Basic {}", no_colon))), None);
    }

    #[test]
    fn test_conflict_becomes_username_field_error() {
        let err = username_conflict(StoreError::Conflict("username 'john' is already taken".into()));
        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields["username"].contains("john"));
    }
}
