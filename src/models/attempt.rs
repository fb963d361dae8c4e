// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents one row of the 'user_quiz_attempts' table: the durable summary
/// of a completed quiz session.
///
/// `score_percentage` is `correct_answers / total_questions * 100` and
/// deliberately ignores the wrong-answer penalty applied to the displayed raw
/// score; the two numbers diverge by design.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    /// `None` means the attempt spanned all categories.
    pub category: Option<String>,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub score_percentage: f64,
    pub time_taken_seconds: i64,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Insert payload for 'user_quiz_attempts'. Written once per completed
/// session, never updated or deleted by the engine.
#[derive(Debug, Clone)]
pub struct NewQuizAttempt {
    pub category: Option<String>,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub score_percentage: f64,
    pub time_taken_seconds: i64,
}

/// Insert payload for 'user_question_progress': one row per answered question
/// at session completion, written best-effort.
#[derive(Debug, Clone)]
pub struct NewQuestionProgress {
    pub question_id: i64,
    pub is_correct: bool,
    pub answer_text: String,
}
