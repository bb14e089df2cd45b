// src/handlers/preferences.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{error::AppError, models::user::ThemePreference, store::Stores, utils::jwt::Claims};

pub async fn get_theme(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let theme = stores.theme(&claims.sub).await?;
    Ok(Json(ThemePreference { theme }))
}

pub async fn set_theme(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ThemePreference>,
) -> Result<impl IntoResponse, AppError> {
    stores.set_theme(&claims.sub, payload.theme).await?;
    Ok(Json(payload))
}
