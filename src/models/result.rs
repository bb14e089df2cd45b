// src/models/result.rs

use serde::{Deserialize, Serialize};

/// Outcome of one question within a completed attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerRecord {
    pub question_id: String,
    /// `None` when the question was left unanswered.
    pub selected_answer: Option<usize>,
    pub is_correct: bool,
    /// Seconds spent on the question. Not tracked yet, always 0.
    pub time_spent: u32,
}

/// Represents one entry of the `results` collection.
/// Participant name and email are denormalized so the record outlives the account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizResult {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub score: usize,
    pub total_questions: usize,
    pub answers: Vec<AnswerRecord>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    /// Total elapsed seconds.
    pub time_spent: u32,
}

/// Query parameters for the leaderboard (`?quiz=all` or `?quiz=<id>`).
#[derive(Debug, Deserialize, Default)]
pub struct ResultListParams {
    pub quiz: Option<String>,
}

impl ResultListParams {
    /// The selected quiz id, or `None` for all quizzes.
    pub fn quiz_filter(&self) -> Option<&str> {
        match self.quiz.as_deref() {
            None | Some("") | Some("all") => None,
            Some(id) => Some(id),
        }
    }
}
