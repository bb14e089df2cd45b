// src/player/view.rs

use serde::Serialize;

use super::machine::{Attempt, Phase};
use crate::{
    models::result::QuizResult,
    report::{self, Tier},
};

/// What a participant sees of an attempt at any point.
#[derive(Debug, Serialize)]
pub struct AttemptView {
    pub id: String,
    pub quiz_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub phase: Phase,
    pub total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<CurrentQuestion>,
    /// Seconds left overall, when the quiz has a time limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_time_left: Option<u32>,
    /// Seconds spent in the current run.
    pub elapsed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ResultSummary>,
    /// Per-question breakdown, only when the quiz discloses correct answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Vec<ReviewItem>>,
    pub can_retake: bool,
}

#[derive(Debug, Serialize)]
pub struct CurrentQuestion {
    /// 1-based position in presentation order.
    pub number: usize,
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub selected: Option<usize>,
    pub is_last: bool,
}

#[derive(Debug, Serialize)]
pub struct ResultSummary {
    pub result_id: String,
    pub score: usize,
    pub total_questions: usize,
    pub percentage: u32,
    pub tier: Tier,
    pub time_spent: u32,
    pub time_spent_display: String,
}

impl From<&QuizResult> for ResultSummary {
    fn from(result: &QuizResult) -> Self {
        let percentage = report::percentage(result.score, result.total_questions);
        Self {
            result_id: result.id.clone(),
            score: result.score,
            total_questions: result.total_questions,
            percentage,
            tier: Tier::for_percentage(percentage),
            time_spent: result.time_spent,
            time_spent_display: report::format_countdown(result.time_spent),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewItem {
    pub number: usize,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub selected_answer: Option<usize>,
    pub is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<&Attempt> for AttemptView {
    fn from(attempt: &Attempt) -> Self {
        let quiz = attempt.quiz();
        let total_questions = quiz.questions.len();

        let question = match attempt.phase() {
            Phase::InProgress => attempt.current_question_index().map(|index| {
                let q = &quiz.questions[index];
                CurrentQuestion {
                    number: attempt.position() + 1,
                    id: q.id.clone(),
                    text: q.text.clone(),
                    options: q.options.clone(),
                    selected: attempt.selected(index),
                    is_last: attempt.position() + 1 == total_questions,
                }
            }),
            _ => None,
        };

        let result = attempt.result();

        let review = result
            .filter(|_| quiz.settings.show_correct_answers)
            .map(|result| {
                quiz.questions
                    .iter()
                    .zip(&result.answers)
                    .enumerate()
                    .map(|(index, (q, answer))| ReviewItem {
                        number: index + 1,
                        text: q.text.clone(),
                        options: q.options.clone(),
                        correct_answer: q.correct_answer,
                        selected_answer: answer.selected_answer,
                        is_correct: answer.is_correct,
                        comment: q.comment.clone().filter(|_| quiz.settings.show_comments),
                    })
                    .collect()
            });

        let in_progress = attempt.phase() == Phase::InProgress;

        Self {
            id: attempt.id().to_string(),
            quiz_id: quiz.id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            phase: attempt.phase(),
            total_questions,
            question,
            time_left: attempt.overall_left().filter(|_| in_progress),
            question_time_left: attempt.question_left().filter(|_| in_progress),
            elapsed: attempt.elapsed(),
            summary: result.map(ResultSummary::from),
            review,
            can_retake: attempt.phase() == Phase::Completed && quiz.settings.allow_retake,
        }
    }
}
