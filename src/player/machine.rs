// src/player/machine.rs

//! The quiz-taking state machine.
//!
//! Every change to an attempt, whether it comes from the participant or from
//! one of the two countdowns, goes through [`Attempt::apply`].

use rand::seq::SliceRandom;
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::GUEST_USER_ID,
    models::{
        quiz::Quiz,
        result::{AnswerRecord, QuizResult},
    },
};

/// Who is taking the quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

impl Participant {
    /// An ad-hoc participant collected from the pre-quiz form.
    pub fn guest(name: &str, email: &str) -> Self {
        Self {
            user_id: GUEST_USER_ID.to_string(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingParticipant,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SubmitParticipant { name: String, email: String },
    Select(usize),
    Advance,
    Retake,
    /// One second of the overall countdown.
    OverallTick,
    /// One second of the current question's countdown.
    QuestionTick,
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("Please fill in all fields")]
    MissingParticipantField,

    #[error("The quiz is not in progress")]
    NotInProgress,

    #[error("Participant details were already provided")]
    ParticipantAlreadySet,

    #[error("Option {0} does not exist for this question")]
    InvalidOption(usize),

    #[error("Select an answer to continue")]
    Unanswered,

    #[error("The quiz has not been completed")]
    NotCompleted,

    #[error("This quiz does not allow retakes")]
    RetakeNotAllowed,
}

/// One participant's run through a quiz.
#[derive(Debug, Clone)]
pub struct Attempt {
    id: String,
    quiz: Quiz,
    participant: Option<Participant>,
    phase: Phase,
    /// Presentation position -> index into `quiz.questions`.
    order: Vec<usize>,
    /// Position within `order`.
    current: usize,
    /// Selected option per quiz question, in quiz order.
    slots: Vec<Option<usize>>,
    overall_left: Option<u32>,
    question_left: Option<u32>,
    elapsed: u32,
    result: Option<QuizResult>,
}

impl Attempt {
    /// Creates an attempt. Without a participant it waits for the participant form.
    pub fn start(id: String, quiz: Quiz, participant: Option<Participant>) -> Self {
        let question_count = quiz.questions.len();
        let mut attempt = Self {
            id,
            quiz,
            participant,
            phase: Phase::AwaitingParticipant,
            order: (0..question_count).collect(),
            current: 0,
            slots: vec![None; question_count],
            overall_left: None,
            question_left: None,
            elapsed: 0,
            result: None,
        };
        if attempt.participant.is_some() {
            attempt.enter_in_progress();
        }
        attempt
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn participant(&self) -> Option<&Participant> {
        self.participant.as_ref()
    }

    /// Position of the current question in presentation order.
    pub fn position(&self) -> usize {
        self.current
    }

    /// Index into `quiz.questions` of the question on screen.
    pub fn current_question_index(&self) -> Option<usize> {
        self.order.get(self.current).copied()
    }

    pub fn selected(&self, question_index: usize) -> Option<usize> {
        self.slots.get(question_index).copied().flatten()
    }

    pub fn overall_left(&self) -> Option<u32> {
        self.overall_left
    }

    pub fn question_left(&self) -> Option<u32> {
        self.question_left
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    /// Applies one event.
    ///
    /// Returns the freshly built result when the event completed the attempt.
    /// Ticks outside `InProgress` are ignored; other invalid events are
    /// rejected and leave the attempt untouched.
    pub fn apply(&mut self, event: Event) -> Result<Option<QuizResult>, TransitionError> {
        match event {
            Event::SubmitParticipant { name, email } => {
                if self.phase != Phase::AwaitingParticipant {
                    return Err(TransitionError::ParticipantAlreadySet);
                }
                if name.trim().is_empty() || email.trim().is_empty() {
                    return Err(TransitionError::MissingParticipantField);
                }
                self.participant = Some(Participant::guest(&name, &email));
                self.enter_in_progress();
                Ok(None)
            }
            Event::Select(option) => {
                let question_index = self.ensure_in_progress()?;
                if option >= self.quiz.questions[question_index].options.len() {
                    return Err(TransitionError::InvalidOption(option));
                }
                self.slots[question_index] = Some(option);
                Ok(None)
            }
            Event::Advance => {
                let question_index = self.ensure_in_progress()?;
                if self.slots[question_index].is_none() {
                    return Err(TransitionError::Unanswered);
                }
                Ok(self.advance())
            }
            Event::Retake => {
                if self.phase != Phase::Completed {
                    return Err(TransitionError::NotCompleted);
                }
                if !self.quiz.settings.allow_retake {
                    return Err(TransitionError::RetakeNotAllowed);
                }
                self.enter_in_progress();
                Ok(None)
            }
            Event::OverallTick => {
                if self.phase != Phase::InProgress {
                    return Ok(None);
                }
                self.elapsed += 1;
                match self.overall_left {
                    Some(left) if left <= 1 => {
                        self.overall_left = Some(0);
                        Ok(Some(self.complete()))
                    }
                    Some(left) => {
                        self.overall_left = Some(left - 1);
                        Ok(None)
                    }
                    None => Ok(None),
                }
            }
            Event::QuestionTick => {
                if self.phase != Phase::InProgress {
                    return Ok(None);
                }
                match self.question_left {
                    // Time is up: move on whether or not an answer was chosen
                    Some(left) if left <= 1 => Ok(self.advance()),
                    Some(left) => {
                        self.question_left = Some(left - 1);
                        Ok(None)
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// Returns the index of the question on screen.
    fn ensure_in_progress(&self) -> Result<usize, TransitionError> {
        if self.phase != Phase::InProgress {
            return Err(TransitionError::NotInProgress);
        }
        self.current_question_index()
            .ok_or(TransitionError::NotInProgress)
    }

    fn enter_in_progress(&mut self) {
        let question_count = self.quiz.questions.len();
        self.order = (0..question_count).collect();
        if self.quiz.settings.randomize_questions {
            self.order.shuffle(&mut rand::thread_rng());
        }
        self.current = 0;
        self.slots = vec![None; question_count];
        self.overall_left = self.quiz.time_limit.map(|mins| mins.saturating_mul(60));
        self.elapsed = 0;
        self.result = None;
        self.phase = Phase::InProgress;
        self.reset_question_timer();
    }

    fn reset_question_timer(&mut self) {
        self.question_left = self
            .current_question_index()
            .and_then(|index| self.quiz.questions[index].time_limit);
    }

    fn advance(&mut self) -> Option<QuizResult> {
        if self.current + 1 < self.order.len() {
            self.current += 1;
            self.reset_question_timer();
            None
        } else {
            Some(self.complete())
        }
    }

    fn complete(&mut self) -> QuizResult {
        let (score, answers) = score_answers(&self.quiz, &self.slots);

        let participant = self
            .participant
            .clone()
            .unwrap_or_else(|| Participant::guest("", ""));

        let result = QuizResult {
            id: uuid::Uuid::new_v4().to_string(),
            quiz_id: self.quiz.id.clone(),
            user_id: participant.user_id,
            user_name: participant.name,
            user_email: participant.email,
            score,
            total_questions: self.quiz.questions.len(),
            answers,
            completed_at: chrono::Utc::now(),
            time_spent: self.elapsed,
        };

        self.phase = Phase::Completed;
        self.question_left = None;
        self.result = Some(result.clone());
        result
    }
}

/// Scores selections against a quiz.
/// Returns the correct count and one record per question, in quiz order.
pub fn score_answers(quiz: &Quiz, slots: &[Option<usize>]) -> (usize, Vec<AnswerRecord>) {
    let answers: Vec<AnswerRecord> = quiz
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let selected_answer = slots.get(index).copied().flatten();
            AnswerRecord {
                question_id: question.id.clone(),
                selected_answer,
                is_correct: selected_answer == Some(question.correct_answer),
                time_spent: 0,
            }
        })
        .collect();

    let score = answers.iter().filter(|a| a.is_correct).count();
    (score, answers)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::quiz::{Question, QuizSettings};

    pub(crate) fn quiz_with(correct: &[usize]) -> Quiz {
        Quiz {
            id: "quiz-1".to_string(),
            title: "Capitals".to_string(),
            description: None,
            questions: correct
                .iter()
                .enumerate()
                .map(|(i, &c)| Question {
                    id: format!("q{}", i + 1),
                    text: format!("Question {}", i + 1),
                    options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    correct_answer: c,
                    comment: None,
                    time_limit: None,
                })
                .collect(),
            creator_id: "creator".to_string(),
            creator_name: "Creator".to_string(),
            created_at: chrono::Utc::now(),
            time_limit: None,
            is_public: true,
            settings: QuizSettings::default(),
        }
    }

    fn alice() -> Participant {
        Participant {
            user_id: "u1".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn test_scores_selected_answers() {
        let mut attempt = Attempt::start("a1".into(), quiz_with(&[0, 2]), Some(alice()));
        assert_eq!(attempt.phase(), Phase::InProgress);

        attempt.apply(Event::Select(0)).unwrap();
        assert_eq!(attempt.apply(Event::Advance).unwrap(), None);
        attempt.apply(Event::Select(1)).unwrap();
        let result = attempt.apply(Event::Advance).unwrap().expect("completed");

        assert_eq!(attempt.phase(), Phase::Completed);
        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 2);
        assert_eq!(result.answers.len(), 2);
        assert_eq!(result.answers[1].selected_answer, Some(1));
        assert!(!result.answers[1].is_correct);
        assert_eq!(result.user_id, "u1");
        assert_eq!(crate::report::percentage(result.score, result.total_questions), 50);
    }

    #[test]
    fn test_selection_can_change_before_advancing() {
        let mut attempt = Attempt::start("a1".into(), quiz_with(&[3]), Some(alice()));
        attempt.apply(Event::Select(0)).unwrap();
        attempt.apply(Event::Select(3)).unwrap();
        let result = attempt.apply(Event::Advance).unwrap().unwrap();
        assert_eq!(result.score, 1);
    }

    #[test]
    fn test_advance_requires_answer() {
        let mut attempt = Attempt::start("a1".into(), quiz_with(&[0, 1]), Some(alice()));
        assert_eq!(attempt.apply(Event::Advance), Err(TransitionError::Unanswered));
        assert_eq!(attempt.position(), 0);
    }

    #[test]
    fn test_select_rejects_unknown_option() {
        let mut attempt = Attempt::start("a1".into(), quiz_with(&[0]), Some(alice()));
        assert_eq!(attempt.apply(Event::Select(4)), Err(TransitionError::InvalidOption(4)));
        assert_eq!(attempt.selected(0), None);
    }

    #[test]
    fn test_overall_timeout_forces_completion() {
        let mut quiz = quiz_with(&[0, 1, 2]);
        quiz.time_limit = Some(1);
        let mut attempt = Attempt::start("a1".into(), quiz, Some(alice()));
        assert_eq!(attempt.overall_left(), Some(60));

        for _ in 0..59 {
            assert_eq!(attempt.apply(Event::OverallTick).unwrap(), None);
        }
        let result = attempt.apply(Event::OverallTick).unwrap().expect("forced completion");

        assert_eq!(attempt.phase(), Phase::Completed);
        assert_eq!(result.score, 0);
        assert_eq!(result.answers.len(), 3);
        assert!(result.answers.iter().all(|a| a.selected_answer.is_none()));
        assert_eq!(result.time_spent, 60);
    }

    #[test]
    fn test_question_timeout_advances_without_answer() {
        let mut quiz = quiz_with(&[0, 1]);
        quiz.questions[0].time_limit = Some(2);
        let mut attempt = Attempt::start("a1".into(), quiz, Some(alice()));
        assert_eq!(attempt.question_left(), Some(2));

        attempt.apply(Event::QuestionTick).unwrap();
        assert_eq!(attempt.position(), 0);
        attempt.apply(Event::QuestionTick).unwrap();
        assert_eq!(attempt.position(), 1);
        // Second question has no countdown
        assert_eq!(attempt.question_left(), None);
        attempt.apply(Event::QuestionTick).unwrap();
        assert_eq!(attempt.position(), 1);
    }

    #[test]
    fn test_question_timeout_on_last_question_completes() {
        let mut quiz = quiz_with(&[0]);
        quiz.questions[0].time_limit = Some(1);
        let mut attempt = Attempt::start("a1".into(), quiz, Some(alice()));
        attempt.apply(Event::Select(0)).unwrap();
        let result = attempt.apply(Event::QuestionTick).unwrap().unwrap();
        assert_eq!(result.score, 1);
    }

    #[test]
    fn test_ticks_ignored_after_completion() {
        let mut quiz = quiz_with(&[0]);
        quiz.time_limit = Some(1);
        let mut attempt = Attempt::start("a1".into(), quiz, Some(alice()));
        attempt.apply(Event::Select(0)).unwrap();
        attempt.apply(Event::Advance).unwrap().unwrap();
        assert_eq!(attempt.apply(Event::OverallTick), Ok(None));
        assert_eq!(attempt.apply(Event::QuestionTick), Ok(None));
        assert_eq!(attempt.phase(), Phase::Completed);
    }

    #[test]
    fn test_guest_flow() {
        let mut attempt = Attempt::start("a1".into(), quiz_with(&[1]), None);
        assert_eq!(attempt.phase(), Phase::AwaitingParticipant);
        assert_eq!(attempt.apply(Event::Select(0)), Err(TransitionError::NotInProgress));
        assert_eq!(attempt.apply(Event::OverallTick), Ok(None));

        let blank = Event::SubmitParticipant {
            name: " ".into(),
            email: "bob@example.com".into(),
        };
        assert_eq!(attempt.apply(blank), Err(TransitionError::MissingParticipantField));

        attempt
            .apply(Event::SubmitParticipant {
                name: "Bob".into(),
                email: "bob@example.com".into(),
            })
            .unwrap();
        assert_eq!(attempt.phase(), Phase::InProgress);

        attempt.apply(Event::Select(1)).unwrap();
        let result = attempt.apply(Event::Advance).unwrap().unwrap();
        assert_eq!(result.user_id, GUEST_USER_ID);
        assert_eq!(result.user_name, "Bob");
        assert_eq!(result.score, 1);
    }

    #[test]
    fn test_retake_resets_slots() {
        let mut attempt = Attempt::start("a1".into(), quiz_with(&[0]), Some(alice()));
        attempt.apply(Event::Select(0)).unwrap();
        attempt.apply(Event::Advance).unwrap();

        attempt.apply(Event::Retake).unwrap();
        assert_eq!(attempt.phase(), Phase::InProgress);
        assert_eq!(attempt.selected(0), None);
        assert!(attempt.result().is_none());
    }

    #[test]
    fn test_retake_respects_settings() {
        let mut quiz = quiz_with(&[0]);
        quiz.settings.allow_retake = false;
        let mut attempt = Attempt::start("a1".into(), quiz, Some(alice()));
        assert_eq!(attempt.apply(Event::Retake), Err(TransitionError::NotCompleted));
        attempt.apply(Event::Select(0)).unwrap();
        attempt.apply(Event::Advance).unwrap();
        assert_eq!(attempt.apply(Event::Retake), Err(TransitionError::RetakeNotAllowed));
    }

    #[test]
    fn test_randomized_order_still_scores_in_quiz_order() {
        let mut quiz = quiz_with(&[0, 1, 2, 3]);
        quiz.settings.randomize_questions = true;
        let mut attempt = Attempt::start("a1".into(), quiz, Some(alice()));

        // Answer every question correctly whatever order it was shown in
        let result = loop {
            let index = attempt.current_question_index().unwrap();
            let correct = attempt.quiz().questions[index].correct_answer;
            attempt.apply(Event::Select(correct)).unwrap();
            if let Some(result) = attempt.apply(Event::Advance).unwrap() {
                break result;
            }
        };

        assert_eq!(result.score, 4);
        let ids: Vec<&str> = result.answers.iter().map(|a| a.question_id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2", "q3", "q4"]);
    }

    #[test]
    fn test_score_answers_counts_matches() {
        let quiz = quiz_with(&[0, 2, 1]);
        let (score, answers) = score_answers(&quiz, &[Some(0), None, Some(1)]);
        assert_eq!(score, 2);
        assert_eq!(answers.len(), 3);
        assert!(!answers[1].is_correct);
    }
}
