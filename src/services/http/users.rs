use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::{json_body, success, AppState};
use crate::models::users::{NewUser, UserDetails};
use crate::services::{call, users::UserRequest, ServiceError};

pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let new_user = json_body(payload)?;

    let (user, _) = call(&state.channels.users, "HTTP", "User", |response| {
        UserRequest::CreateUser {
            uid: new_user.uid.unwrap_or_default(),
            email: new_user.email.unwrap_or_default(),
            display_name: new_user.display_name.unwrap_or_default(),
            response,
        }
    })
    .await?;

    Ok(success(json!({ "user": UserDetails::from(user) })))
}

pub async fn get_user_details(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = call(&state.channels.users, "HTTP", "User", |response| {
        UserRequest::GetUser { uid, response }
    })
    .await?;

    Ok(success(json!({ "user": UserDetails::from(user) })))
}
