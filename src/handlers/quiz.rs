// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use url::Url;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::quiz::{
        CreateQuizRequest, DeepLinkParams, PublicQuiz, Quiz, QuizCard, QuizListParams, QuizScope,
    },
    report::quiz_stats,
    store::{Stores, keys},
    utils::jwt::Claims,
};

/// Creates a quiz from the authoring form.
///
/// * Validates title, questions and options; nothing is saved on failure.
/// * Assigns question ids `q1..qN` and stamps the creator.
pub async fn create_quiz(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let creator = stores
        .find_user(&claims.sub)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let quiz = payload.into_quiz(
        uuid::Uuid::new_v4().to_string(),
        creator.id,
        creator.name,
        chrono::Utc::now(),
    );

    let quiz = stores
        .update(keys::QUIZZES, |quizzes: &mut Vec<Quiz>| {
            quizzes.push(quiz.clone());
            Ok::<_, AppError>(quiz)
        })
        .await?;

    tracing::info!("Quiz {} created by {}", quiz.id, quiz.creator_id);
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Lists quizzes as dashboard cards.
///
/// `scope=mine` returns the caller's quizzes. `scope=all` returns every public
/// quiz plus the caller's own; admins also see private quizzes of others.
pub async fn list_quizzes(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = stores.quizzes().await?;
    let results = stores.results().await?;

    let cards: Vec<QuizCard> = quizzes
        .into_iter()
        .filter(|q| match params.scope {
            QuizScope::Mine => q.creator_id == claims.sub,
            QuizScope::All => q.is_public || claims.is_admin() || q.creator_id == claims.sub,
        })
        .map(|quiz| {
            let (participants, avg_score) = quiz_stats(&quiz.id, &results);
            QuizCard {
                quiz,
                participants,
                avg_score,
            }
        })
        .collect();

    Ok(Json(cards))
}

/// Fetches a quiz. Creators and admins get the full quiz, others the public view.
pub async fn get_quiz(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let quiz = stores
        .find_quiz(&id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if claims.viewer().can_manage(&quiz) {
        Ok(Json(quiz).into_response())
    } else {
        Ok(Json(PublicQuiz::from(&quiz)).into_response())
    }
}

/// Deletes a quiz. Its results stay behind and report a deleted-quiz title.
pub async fn delete_quiz(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = claims.viewer();

    stores
        .update(keys::QUIZZES, |quizzes: &mut Vec<Quiz>| {
            let quiz = quizzes
                .iter()
                .find(|q| q.id == id)
                .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

            if !viewer.can_manage(quiz) {
                return Err(AppError::Forbidden(
                    "Only the creator can delete this quiz".to_string(),
                ));
            }

            quizzes.retain(|q| q.id != id);
            Ok(())
        })
        .await?;

    tracing::info!("Quiz {} deleted by {}", id, claims.sub);
    Ok(StatusCode::NO_CONTENT)
}

/// Builds the share link for a quiz (`<base>/?quiz=<id>`).
pub async fn share_quiz(
    State(stores): State<Stores>,
    State(config): State<Config>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = stores
        .find_quiz(&id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let url = share_url(&config.public_base_url, &quiz.id)?;

    Ok(Json(serde_json::json!({
        "quiz_id": quiz.id,
        "url": url,
    })))
}

fn share_url(base: &str, quiz_id: &str) -> Result<String, AppError> {
    let mut url = Url::parse(base)
        .map_err(|e| AppError::InternalServerError(format!("Invalid PUBLIC_BASE_URL: {}", e)))?;
    url.query_pairs_mut().clear().append_pair("quiz", quiz_id);
    Ok(url.to_string())
}

/// Resolves a share link. Public; returns the quiz without answers.
pub async fn play_lookup(
    State(stores): State<Stores>,
    Query(params): Query<DeepLinkParams>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = stores
        .find_quiz(&params.quiz)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(PublicQuiz::from(&quiz)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_url() {
        assert_eq!(
            share_url("http://localhost:3000", "abc").unwrap(),
            "http://localhost:3000/?quiz=abc"
        );
        assert_eq!(
            share_url("https://quiz.example.com/app/", "a b").unwrap(),
            "https://quiz.example.com/app/?quiz=a+b"
        );
    }

    #[test]
    fn test_share_url_rejects_bad_base() {
        assert!(share_url("not a url", "abc").is_err());
    }
}
