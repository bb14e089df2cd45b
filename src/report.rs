// src/report.rs

//! Scoring display rules, leaderboard ordering and aggregate statistics.
//! Everything here is recomputed from the full collections on each request.

use std::cmp::Ordering;

use serde::Serialize;

use crate::{
    config::{DELETED_QUIZ_TITLE, SECOND_PLACE_PERCENTAGE, TROPHY_PERCENTAGE},
    models::{quiz::Quiz, result::QuizResult},
};

/// `round(score / total * 100)`, or 0 for an empty quiz.
pub fn percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((score as f64 / total as f64) * 100.0).round() as u32
}

/// Display tier of a percentage. Cosmetic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Trophy,
    SecondPlace,
    Study,
}

impl Tier {
    pub fn for_percentage(percentage: u32) -> Self {
        if percentage >= TROPHY_PERCENTAGE {
            Tier::Trophy
        } else if percentage >= SECOND_PLACE_PERCENTAGE {
            Tier::SecondPlace
        } else {
            Tier::Study
        }
    }
}

/// `mm:ss`, as shown on the running countdowns.
pub fn format_countdown(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// `m:ss`, as shown in leaderboard rows.
pub fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Leaderboard order: higher percentage first, then less time spent.
pub fn leaderboard_order(a: &QuizResult, b: &QuizResult) -> Ordering {
    let a_pct = percentage(a.score, a.total_questions);
    let b_pct = percentage(b.score, b.total_questions);
    b_pct.cmp(&a_pct).then(a.time_spent.cmp(&b.time_spent))
}

/// Who is looking at the reports.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user_id: String,
    pub is_admin: bool,
}

impl Viewer {
    /// Quizzes this viewer manages: all of them for admins, their own otherwise.
    pub fn quizzes<'a>(&self, quizzes: &'a [Quiz]) -> Vec<&'a Quiz> {
        quizzes
            .iter()
            .filter(|q| self.is_admin || q.creator_id == self.user_id)
            .collect()
    }

    /// Admins may touch any quiz; everyone else only their own.
    pub fn can_manage(&self, quiz: &Quiz) -> bool {
        self.is_admin || quiz.creator_id == self.user_id
    }
}

/// Title of a quiz, or the deleted-quiz placeholder for orphaned results.
pub fn quiz_title<'a>(quizzes: &'a [Quiz], quiz_id: &str) -> &'a str {
    quizzes
        .iter()
        .find(|q| q.id == quiz_id)
        .map(|q| q.title.as_str())
        .unwrap_or(DELETED_QUIZ_TITLE)
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub result_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub user_name: String,
    pub user_email: String,
    pub score: usize,
    pub total_questions: usize,
    pub percentage: u32,
    pub tier: Tier,
    pub time_spent: u32,
    pub time_spent_display: String,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LeaderboardStats {
    pub total_participants: usize,
    /// Mean of score/total over the listed results, as a rounded percentage.
    pub avg_score: u32,
    pub total_quizzes: usize,
}

#[derive(Debug, Serialize)]
pub struct Leaderboard {
    pub title: String,
    pub entries: Vec<LeaderboardEntry>,
    pub stats: LeaderboardStats,
}

/// Builds the leaderboard a viewer is allowed to see.
///
/// Admins see every result. Other viewers see results for quizzes they
/// created plus results they produced themselves. `quiz_filter` narrows the
/// list to one quiz.
pub fn build_leaderboard(
    viewer: &Viewer,
    quizzes: &[Quiz],
    results: &[QuizResult],
    quiz_filter: Option<&str>,
) -> Leaderboard {
    let managed = viewer.quizzes(quizzes);

    let mut visible: Vec<&QuizResult> = results
        .iter()
        .filter(|r| quiz_filter.is_none_or(|id| r.quiz_id == id))
        .filter(|r| {
            viewer.is_admin
                || r.user_id == viewer.user_id
                || managed.iter().any(|q| q.id == r.quiz_id)
        })
        .collect();

    visible.sort_by(|a, b| leaderboard_order(a, b));

    let total_participants = visible.len();
    let avg_score = if total_participants > 0 {
        let sum: f64 = visible
            .iter()
            .map(|r| {
                if r.total_questions == 0 {
                    0.0
                } else {
                    r.score as f64 / r.total_questions as f64
                }
            })
            .sum();
        ((sum / total_participants as f64) * 100.0).round() as u32
    } else {
        0
    };

    let stats = LeaderboardStats {
        total_participants,
        avg_score,
        total_quizzes: if quiz_filter.is_some() { 1 } else { managed.len() },
    };

    let entries = visible
        .into_iter()
        .enumerate()
        .map(|(index, r)| {
            let pct = percentage(r.score, r.total_questions);
            LeaderboardEntry {
                rank: index + 1,
                result_id: r.id.clone(),
                quiz_id: r.quiz_id.clone(),
                quiz_title: quiz_title(quizzes, &r.quiz_id).to_string(),
                user_name: r.user_name.clone(),
                user_email: r.user_email.clone(),
                score: r.score,
                total_questions: r.total_questions,
                percentage: pct,
                tier: Tier::for_percentage(pct),
                time_spent: r.time_spent,
                time_spent_display: format_duration(r.time_spent),
                completed_at: r.completed_at,
            }
        })
        .collect();

    let title = match quiz_filter {
        Some(id) => quiz_title(quizzes, id).to_string(),
        None => "All quizzes".to_string(),
    };

    Leaderboard {
        title,
        entries,
        stats,
    }
}

/// Participant count and mean raw score (two decimals) of one quiz.
pub fn quiz_stats(quiz_id: &str, results: &[QuizResult]) -> (usize, f64) {
    let scores: Vec<usize> = results
        .iter()
        .filter(|r| r.quiz_id == quiz_id)
        .map(|r| r.score)
        .collect();

    if scores.is_empty() {
        return (0, 0.0);
    }

    let mean = scores.iter().sum::<usize>() as f64 / scores.len() as f64;
    (scores.len(), (mean * 100.0).round() / 100.0)
}
