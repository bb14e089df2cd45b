// src/handlers/attempt.rs

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    export::answer_key_html,
    player::{Event, Participant, Phase, PlayerRegistry},
    state::AppState,
    utils::jwt::claims_from_headers,
};

/// DTO for starting an attempt.
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub quiz_id: String,
}

/// DTO for the participant form shown to visitors without an account.
#[derive(Debug, Deserialize)]
pub struct ParticipantRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub option: usize,
}

/// Starts an attempt on a quiz.
///
/// With a valid bearer token the attempt starts immediately for that account.
/// Without one it waits for the participant form.
pub async fn start_attempt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state
        .stores
        .find_quiz(&req.quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let participant = match claims_from_headers(&headers, &state).await? {
        Some(claims) => {
            let user = state
                .stores
                .find_user(&claims.sub)
                .await?
                .ok_or(AppError::NotFound("User not found".to_string()))?;
            Some(Participant {
                user_id: user.id,
                name: user.name,
                email: user.email,
            })
        }
        None => None,
    };

    let view = state
        .players
        .start(quiz, participant, state.stores.clone())
        .await;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_attempt(
    State(players): State<PlayerRegistry>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = players.get(&id).await?.view().await?;
    Ok(Json(view))
}

pub async fn submit_participant(
    State(players): State<PlayerRegistry>,
    Path(id): Path<String>,
    Json(req): Json<ParticipantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = players
        .get(&id)
        .await?
        .apply(Event::SubmitParticipant {
            name: req.name,
            email: req.email,
        })
        .await?;
    Ok(Json(view))
}

/// Records the selected option for the question on screen.
pub async fn select_option(
    State(players): State<PlayerRegistry>,
    Path(id): Path<String>,
    Json(req): Json<SelectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = players.get(&id).await?.apply(Event::Select(req.option)).await?;
    Ok(Json(view))
}

/// Moves to the next question, or finishes on the last one.
pub async fn next_question(
    State(players): State<PlayerRegistry>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = players.get(&id).await?.apply(Event::Advance).await?;
    Ok(Json(view))
}

pub async fn retake(
    State(players): State<PlayerRegistry>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = players.get(&id).await?.apply(Event::Retake).await?;
    Ok(Json(view))
}

/// Leaves the attempt and stops its countdowns.
pub async fn leave(
    State(players): State<PlayerRegistry>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    players.leave(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Printable answer key, available once the attempt is completed.
pub async fn answer_key(
    State(players): State<PlayerRegistry>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = players.get(&id).await?.snapshot().await?;

    if attempt.phase() != Phase::Completed {
        return Err(AppError::BadRequest(
            "The answer key is available after finishing the quiz".to_string(),
        ));
    }

    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        answer_key_html(attempt.quiz()),
    ))
}
