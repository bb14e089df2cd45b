// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    export::leaderboard_html,
    models::result::ResultListParams,
    report::{Leaderboard, build_leaderboard},
    store::Stores,
    utils::jwt::Claims,
};

async fn load_leaderboard(
    stores: &Stores,
    claims: &Claims,
    params: &ResultListParams,
) -> Result<Leaderboard, AppError> {
    let quizzes = stores.quizzes().await?;
    let results = stores.results().await?;

    Ok(build_leaderboard(
        &claims.viewer(),
        &quizzes,
        &results,
        params.quiz_filter(),
    ))
}

/// Leaderboard with aggregate stats, filtered by `?quiz=<id|all>`.
pub async fn leaderboard(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ResultListParams>,
) -> Result<impl IntoResponse, AppError> {
    let board = load_leaderboard(&stores, &claims, &params).await?;
    Ok(Json(board))
}

/// Printable leaderboard. Nothing to print is a not-found.
pub async fn export_leaderboard(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ResultListParams>,
) -> Result<impl IntoResponse, AppError> {
    let board = load_leaderboard(&stores, &claims, &params).await?;

    if board.entries.is_empty() {
        return Err(AppError::NotFound("No results to export".to_string()));
    }

    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        leaderboard_html(&board),
    ))
}
