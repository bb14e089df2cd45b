// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::not_blank;
use crate::config::OPTIONS_PER_QUESTION;

/// A single multiple-choice question inside a quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    /// Unique within its quiz (`q1`, `q2`, ...).
    pub id: String,

    pub text: String,

    /// Answer options in display order.
    pub options: Vec<String>,

    /// Index into `options`.
    pub correct_answer: usize,

    /// Explanation shown after answering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Per-question countdown, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
}

/// Post-completion disclosure and retake flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuizSettings {
    pub show_correct_answers: bool,
    pub show_comments: bool,
    pub allow_retake: bool,
    pub randomize_questions: bool,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            show_correct_answers: true,
            show_comments: true,
            allow_retake: true,
            randomize_questions: false,
        }
    }
}

/// Represents one entry of the `quizzes` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<Question>,
    pub creator_id: String,
    /// Denormalized so cards render without a user lookup.
    pub creator_name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Overall countdown, in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    pub is_public: bool,
    #[serde(default)]
    pub settings: QuizSettings,
}

/// DTO for sending a question to a participant (excludes answer and comment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
            time_limit: q.time_limit,
        }
    }
}

/// DTO for a quiz reached through a share link.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicQuiz {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub creator_name: String,
    pub question_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            creator_name: quiz.creator_name.clone(),
            question_count: quiz.questions.len(),
            time_limit: quiz.time_limit,
            questions: quiz.questions.iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// Dashboard card: the quiz plus its participation figures.
#[derive(Debug, Serialize)]
pub struct QuizCard {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub participants: usize,
    pub avg_score: f64,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum QuizScope {
    #[default]
    Mine,
    All,
}

/// Query parameters for listing quizzes.
#[derive(Debug, Deserialize)]
pub struct QuizListParams {
    #[serde(default)]
    pub scope: QuizScope,
}

/// Query parameter of a share link (`?quiz=<id>`).
#[derive(Debug, Deserialize)]
pub struct DeepLinkParams {
    pub quiz: String,
}

/// DTO for authoring one question.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_correct_answer))]
pub struct CreateQuestionRequest {
    #[validate(
        custom(function = not_blank, message = "Please fill in all questions and options"),
        length(max = 1000)
    )]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    /// Seconds; 0 means no limit.
    pub time_limit: Option<u32>,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(
        custom(function = not_blank, message = "Please enter a quiz title"),
        length(max = 200)
    )]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Minutes; 0 means no limit.
    pub time_limit: Option<u32>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub settings: QuizSettings,
    #[validate(length(min = 1, message = "A quiz needs at least one question"), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

fn default_public() -> bool {
    true
}

impl CreateQuizRequest {
    /// Builds the stored quiz. Empty optionals and zero limits become `None`.
    pub fn into_quiz(
        self,
        id: String,
        creator_id: String,
        creator_name: String,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Quiz {
        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, q)| Question {
                id: format!("q{}", index + 1),
                text: q.text,
                options: q.options,
                correct_answer: q.correct_answer,
                comment: non_empty(q.comment),
                time_limit: q.time_limit.filter(|&secs| secs > 0),
            })
            .collect();

        Quiz {
            id,
            title: self.title.trim().to_string(),
            description: non_empty(self.description),
            questions,
            creator_id,
            creator_name,
            created_at,
            time_limit: self.time_limit.filter(|&mins| mins > 0),
            is_public: self.is_public,
            settings: self.settings,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTIONS_PER_QUESTION {
        return Err(validator::ValidationError::new("options_count")
            .with_message("Every question needs exactly four options".into()));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty")
                .with_message("Please fill in all questions and options".into()));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_correct_answer(
    question: &CreateQuestionRequest,
) -> Result<(), validator::ValidationError> {
    if question.correct_answer >= question.options.len() {
        return Err(validator::ValidationError::new("correct_answer_out_of_range"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, options: &[&str], correct: usize) -> CreateQuestionRequest {
        CreateQuestionRequest {
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct,
            comment: None,
            time_limit: None,
        }
    }

    fn request(title: &str, questions: Vec<CreateQuestionRequest>) -> CreateQuizRequest {
        CreateQuizRequest {
            title: title.to_string(),
            description: None,
            time_limit: None,
            is_public: true,
            settings: QuizSettings::default(),
            questions,
        }
    }

    #[test]
    fn test_valid_quiz_passes() {
        let req = request("Capitals", vec![question("France?", &["Paris", "Rome", "Oslo", "Bern"], 0)]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_blank_title_rejected() {
        let req = request("   ", vec![question("France?", &["Paris", "Rome", "Oslo", "Bern"], 0)]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_no_questions_rejected() {
        let req = request("Capitals", vec![]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_option_rejected() {
        let req = request("Capitals", vec![question("France?", &["Paris", "", "Oslo", "Bern"], 0)]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_three_options_rejected() {
        let req = request("Capitals", vec![question("France?", &["Paris", "Rome", "Oslo"], 0)]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_correct_answer_out_of_range_rejected() {
        let req = request("Capitals", vec![question("France?", &["Paris", "Rome", "Oslo", "Bern"], 4)]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_into_quiz_assigns_ids_and_drops_zero_limits() {
        let mut req = request(
            "  Capitals ",
            vec![
                question("France?", &["Paris", "Rome", "Oslo", "Bern"], 0),
                question("Italy?", &["Paris", "Rome", "Oslo", "Bern"], 1),
            ],
        );
        req.time_limit = Some(0);
        req.description = Some("  ".to_string());
        req.questions[1].time_limit = Some(30);

        let quiz = req.into_quiz(
            "quiz-1".to_string(),
            "user-1".to_string(),
            "Alice".to_string(),
            chrono::Utc::now(),
        );

        assert_eq!(quiz.title, "Capitals");
        assert_eq!(quiz.description, None);
        assert_eq!(quiz.time_limit, None);
        assert_eq!(quiz.questions[0].id, "q1");
        assert_eq!(quiz.questions[1].id, "q2");
        assert_eq!(quiz.questions[0].time_limit, None);
        assert_eq!(quiz.questions[1].time_limit, Some(30));
    }
}
