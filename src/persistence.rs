// src/persistence.rs
//
// Write side of a completed session: one attempt summary row plus one
// progress row per answered question. Everything here is best-effort and
// fire-and-forget from the session's point of view; the results screen is
// rendered from the already-computed in-memory result, never from what was
// saved. Each insert returns its own Result so failures are reported, not
// swallowed, but they are only ever logged.

use sqlx::PgPool;

use crate::models::attempt::{NewQuestionProgress, NewQuizAttempt, QuizAttempt};
use crate::quiz::session::SessionResult;

pub async fn record_attempt(
    pool: &PgPool,
    user_id: i64,
    attempt: &NewQuizAttempt,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_quiz_attempts \
         (user_id, category, total_questions, correct_answers, score_percentage, time_taken_seconds) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(user_id)
    .bind(&attempt.category)
    .bind(attempt.total_questions)
    .bind(attempt.correct_answers)
    .bind(attempt.score_percentage)
    .bind(attempt.time_taken_seconds)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn record_question_progress(
    pool: &PgPool,
    user_id: i64,
    progress: &NewQuestionProgress,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_question_progress (user_id, question_id, is_correct, answer_text) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(progress.question_id)
    .bind(progress.is_correct)
    .bind(progress.answer_text.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

/// Decides what a completed session leaves behind. Anonymous sessions yield
/// nothing; a session with an owner yields the attempt summary plus one
/// progress row per answered question (unanswered questions leave no row).
pub fn rows_for_completion(
    user_id: Option<i64>,
    category: Option<String>,
    result: &SessionResult,
) -> Option<(i64, NewQuizAttempt, Vec<NewQuestionProgress>)> {
    let user_id = user_id?;

    let attempt = NewQuizAttempt {
        category,
        total_questions: result.total_questions as i32,
        correct_answers: result.correct_count as i32,
        score_percentage: result.score_percentage,
        time_taken_seconds: result.time_taken_seconds,
    };

    let progress = result
        .outcomes
        .iter()
        .filter_map(|outcome| {
            let answer = outcome.answer.as_ref()?;
            let is_correct = outcome.correct?;
            Some(NewQuestionProgress {
                question_id: outcome.question_id,
                is_correct,
                answer_text: answer.clone(),
            })
        })
        .collect();

    Some((user_id, attempt, progress))
}

/// Writes everything a completed session leaves behind. One failed insert
/// never stops the remaining ones, and no failure propagates to the caller.
pub async fn persist_completed(
    pool: PgPool,
    user_id: i64,
    attempt: NewQuizAttempt,
    progress: Vec<NewQuestionProgress>,
) {
    if let Err(e) = record_attempt(&pool, user_id, &attempt).await {
        tracing::warn!("Failed to record quiz attempt for user {}: {}", user_id, e);
    }

    for row in &progress {
        if let Err(e) = record_question_progress(&pool, user_id, row).await {
            tracing::warn!(
                "Failed to record progress for question {} (user {}): {}",
                row.question_id,
                user_id,
                e
            );
        }
    }
}

/// Attempt history for the signed-in user, newest first.
pub async fn attempts_for_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(
        "SELECT id, user_id, category, total_questions, correct_answers, \
                score_percentage, time_taken_seconds, completed_at \
         FROM user_quiz_attempts WHERE user_id = $1 ORDER BY completed_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, McqOption, Question, QuestionBody};
    use crate::quiz::session::QuizSession;
    use chrono::{DateTime, Utc};

    fn question(id: i64) -> Question {
        Question {
            id,
            text: format!("question {id}"),
            category: "Timers".to_string(),
            difficulty: Difficulty::Medium,
            explanation: None,
            is_active: true,
            order_index: id as i32,
            body: QuestionBody::MultipleChoice(vec![
                McqOption {
                    id: id * 10,
                    question_id: id,
                    text: "right".to_string(),
                    is_correct: true,
                    display_order: 0,
                },
                McqOption {
                    id: id * 10 + 1,
                    question_id: id,
                    text: "wrong".to_string(),
                    is_correct: false,
                    display_order: 1,
                },
            ]),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    /// 10 questions: 6 correct, 2 wrong, 2 unanswered.
    fn completed_session(user_id: Option<i64>) -> QuizSession {
        let questions = (1..=10).map(question).collect();
        let mut session =
            QuizSession::start(questions, Some("Timers".to_string()), user_id, 30, now())
                .unwrap();
        for id in 1..=6 {
            session.record_answer(id, "right".to_string()).unwrap();
        }
        for id in 7..=8 {
            session.record_answer(id, "wrong".to_string()).unwrap();
        }
        session.submit(now(), true).unwrap();
        session
    }

    #[test]
    fn anonymous_completion_leaves_no_rows() {
        let session = completed_session(None);
        let result = session.result().unwrap();

        assert!(
            rows_for_completion(
                session.user_id(),
                session.category().map(str::to_string),
                result
            )
            .is_none()
        );
    }

    #[test]
    fn owned_completion_yields_attempt_and_per_answer_progress() {
        let session = completed_session(Some(42));
        let result = session.result().unwrap();

        let (user_id, attempt, progress) = rows_for_completion(
            session.user_id(),
            session.category().map(str::to_string),
            result,
        )
        .unwrap();

        assert_eq!(user_id, 42);
        assert_eq!(attempt.category.as_deref(), Some("Timers"));
        assert_eq!(attempt.total_questions, 10);
        assert_eq!(attempt.correct_answers, 6);
        assert!((attempt.score_percentage - 60.0).abs() < f64::EPSILON);

        // answered questions only; the two blanks leave no row
        assert_eq!(progress.len(), 8);
        assert!(progress.iter().all(|p| p.question_id <= 8));
        assert_eq!(progress.iter().filter(|p| p.is_correct).count(), 6);
        assert_eq!(progress.iter().filter(|p| !p.is_correct).count(), 2);
    }
}
