// src/export.rs

//! Printable HTML documents (answer key, leaderboard) meant for print-to-PDF.
//! Static markup only; every piece of user text goes through `ammonia::clean_text`.

use ammonia::clean_text;

use crate::{models::quiz::Quiz, report::Leaderboard};

const BRAND: &str = "CLINKER Quiz";

const BASE_STYLE: &str = r#"
      body { font-family: Arial, sans-serif; line-height: 1.6; margin: 0; padding: 20px; }
      .header, .footer { text-align: center; margin: 20px 0; font-weight: bold; color: #3B82F6; }
      h1 { text-align: center; color: #3B82F6; }
      .subtitle { text-align: center; color: #666; }
      @media print { body { -webkit-print-color-adjust: exact; } }
"#;

const ANSWER_KEY_STYLE: &str = r#"
      .question { margin: 20px 0; border: 1px solid #ddd; padding: 15px; border-radius: 8px; }
      .question-title { font-weight: bold; margin-bottom: 10px; }
      .option { margin: 5px 0; padding: 5px; }
      .correct { background-color: #d4edda; border-radius: 4px; }
      .comment { margin-top: 10px; font-style: italic; color: #666; }
"#;

const LEADERBOARD_STYLE: &str = r#"
      .leaderboard { width: 100%; border-collapse: collapse; margin: 20px 0; }
      .leaderboard th, .leaderboard td { border: 1px solid #ddd; padding: 12px; text-align: center; }
      .leaderboard th { background-color: #3B82F6; color: white; }
      .rank-1 { background-color: #ffd700; }
      .rank-2 { background-color: #c0c0c0; }
      .rank-3 { background-color: #cd7f32; }
      .stats { text-align: center; color: #333; }
"#;

fn document(title: &str, extra_style: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"UTF-8\">\n  <title>{title} - {BRAND}</title>\n  <style>{BASE_STYLE}{extra_style}  </style>\n</head>\n<body>\n  <div class=\"header\">{BRAND}</div>\n{body}  <div class=\"footer\">{BRAND}</div>\n</body>\n</html>\n",
        title = clean_text(title),
    )
}

/// Option label: A, B, C, ...
fn option_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// The quiz with every correct option marked, plus comments.
pub fn answer_key_html(quiz: &Quiz) -> String {
    let mut body = format!("  <h1>{}</h1>\n", clean_text(&quiz.title));
    if let Some(description) = &quiz.description {
        body.push_str(&format!(
            "  <p class=\"subtitle\">{}</p>\n",
            clean_text(description)
        ));
    }
    body.push_str("  <hr>\n");

    for (index, question) in quiz.questions.iter().enumerate() {
        body.push_str("  <div class=\"question\">\n");
        body.push_str(&format!(
            "    <div class=\"question-title\">Question {}: {}</div>\n",
            index + 1,
            clean_text(&question.text)
        ));
        for (opt_index, option) in question.options.iter().enumerate() {
            let correct = opt_index == question.correct_answer;
            body.push_str(&format!(
                "    <div class=\"option{}\">{}) {}{}</div>\n",
                if correct { " correct" } else { "" },
                option_letter(opt_index),
                clean_text(option),
                if correct { " &#10003;" } else { "" }
            ));
        }
        if let Some(comment) = &question.comment {
            body.push_str(&format!(
                "    <div class=\"comment\">Comment: {}</div>\n",
                clean_text(comment)
            ));
        }
        body.push_str("  </div>\n");
    }

    document(&quiz.title, ANSWER_KEY_STYLE, &body)
}

/// The leaderboard as a printable table with the top three ranks highlighted.
pub fn leaderboard_html(board: &Leaderboard) -> String {
    let mut body = format!(
        "  <h1>Leaderboard</h1>\n  <p class=\"subtitle\">{}</p>\n",
        clean_text(&board.title)
    );
    body.push_str(&format!(
        "  <p class=\"stats\">Participants: {} | Average score: {}% | Quizzes: {}</p>\n",
        board.stats.total_participants, board.stats.avg_score, board.stats.total_quizzes
    ));

    body.push_str(
        "  <table class=\"leaderboard\">\n    <thead>\n      <tr><th>Rank</th><th>Name</th><th>Email</th><th>Quiz</th><th>Score</th><th>Percentage</th><th>Time</th><th>Date</th></tr>\n    </thead>\n    <tbody>\n",
    );
    for entry in &board.entries {
        let class = match entry.rank {
            1..=3 => format!(" class=\"rank-{}\"", entry.rank),
            _ => String::new(),
        };
        body.push_str(&format!(
            "      <tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}/{}</td><td>{}%</td><td>{}</td><td>{}</td></tr>\n",
            class,
            entry.rank,
            clean_text(&entry.user_name),
            clean_text(&entry.user_email),
            clean_text(&entry.quiz_title),
            entry.score,
            entry.total_questions,
            entry.percentage,
            entry.time_spent_display,
            entry.completed_at.format("%Y-%m-%d"),
        ));
    }
    body.push_str("    </tbody>\n  </table>\n");

    document("Leaderboard", LEADERBOARD_STYLE, &body)
}
