// src/quiz/session.rs

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::question::Question;
use crate::quiz::{evaluate, score};

/// Seconds a question stays on screen before the session auto-advances.
pub const DEFAULT_SECONDS_PER_QUESTION: u32 = 30;

/// Errors raised by session operations. Mapped onto HTTP status codes at the
/// handler boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A session cannot start over an empty question pool.
    EmptyQuestionSet,
    /// The answered question id is not part of this session's snapshot.
    UnknownQuestion(i64),
    /// Jump target outside `[0, len)`.
    IndexOutOfRange(usize),
    /// Submit was requested with gaps and without explicit confirmation.
    /// Carries the number of unanswered questions.
    UnansweredQuestions(usize),
    /// The session already completed; it is immutable from then on.
    AlreadyCompleted,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::EmptyQuestionSet => write!(f, "no questions available"),
            SessionError::UnknownQuestion(id) => {
                write!(f, "question {} is not part of this session", id)
            }
            SessionError::IndexOutOfRange(index) => {
                write!(f, "question index {} is out of range", index)
            }
            SessionError::UnansweredQuestions(count) => {
                write!(f, "{} question(s) still unanswered", count)
            }
            SessionError::AlreadyCompleted => write!(f, "session already completed"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Outcome of `go_next`: either the cursor moved, or the last question was on
/// screen and the session completed instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved,
    Submitted,
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Countdown still running; carries the remaining seconds.
    Running(u32),
    /// Countdown hit zero and the session advanced to the next question.
    Advanced,
    /// Countdown hit zero on the final question; the session completed.
    Submitted,
    /// The session is no longer in progress; the ticker should stop.
    Suspended,
}

/// Per-question outcome recorded at submission, input for the progress rows
/// and the results screen.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionOutcome {
    pub question_id: i64,
    /// `None` when the question was left unanswered.
    pub answer: Option<String>,
    /// `None` when unanswered; unanswered is neither correct nor wrong.
    pub correct: Option<bool>,
}

/// Immutable report of a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub raw_score: f64,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub unanswered_count: u32,
    pub total_questions: u32,
    /// `correct_count / total_questions * 100`; intentionally not derived
    /// from the penalty-weighted `raw_score`.
    pub score_percentage: f64,
    pub time_taken_seconds: i64,
    pub completed_at: DateTime<Utc>,
    pub outcomes: Vec<QuestionOutcome>,
}

#[derive(Debug)]
enum Phase {
    InProgress,
    Completed(SessionResult),
}

/// The in-memory runtime of one quiz attempt.
///
/// The question list is snapshotted at start; later edits to the question
/// bank never affect a running session. All clock input is passed in by the
/// caller, so the machine is deterministic and the ticker stays a thin
/// driver around `tick`.
#[derive(Debug)]
pub struct QuizSession {
    questions: Vec<Question>,
    category: Option<String>,
    user_id: Option<i64>,
    position: usize,
    answers: HashMap<i64, String>,
    seconds_per_question: u32,
    remaining_seconds: u32,
    started_at: DateTime<Utc>,
    phase: Phase,
}

impl QuizSession {
    pub fn start(
        questions: Vec<Question>,
        category: Option<String>,
        user_id: Option<i64>,
        seconds_per_question: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet);
        }

        Ok(QuizSession {
            questions,
            category,
            user_id,
            position: 0,
            answers: HashMap::new(),
            seconds_per_question: seconds_per_question.max(1),
            remaining_seconds: seconds_per_question.max(1),
            started_at: now,
            phase: Phase::InProgress,
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn current_question(&self) -> &Question {
        // position is kept within bounds by every transition
        &self.questions[self.position]
    }

    /// Ids of the questions that currently hold a non-blank answer.
    pub fn answered_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .answers
            .iter()
            .filter(|(_, answer)| !answer.trim().is_empty())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn answer_for(&self, question_id: i64) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.phase, Phase::Completed(_))
    }

    pub fn result(&self) -> Option<&SessionResult> {
        match &self.phase {
            Phase::Completed(result) => Some(result),
            Phase::InProgress => None,
        }
    }

    /// Upserts the answer for a question; last write wins. A blank answer
    /// clears the entry, so the answer map only ever holds questions the
    /// user actually answered.
    pub fn record_answer(
        &mut self,
        question_id: i64,
        answer: String,
    ) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(SessionError::UnknownQuestion(question_id));
        }

        if answer.trim().is_empty() {
            self.answers.remove(&question_id);
        } else {
            self.answers.insert(question_id, answer);
        }
        Ok(())
    }

    /// Moves to the next question and restarts its countdown. On the last
    /// question there is nowhere further to go, so the session submits with
    /// whatever has been answered.
    pub fn go_next(&mut self, now: DateTime<Utc>) -> Result<Advance, SessionError> {
        self.ensure_in_progress()?;

        if self.position + 1 < self.questions.len() {
            self.position += 1;
            self.remaining_seconds = self.seconds_per_question;
            Ok(Advance::Moved)
        } else {
            self.finalize(now);
            Ok(Advance::Submitted)
        }
    }

    /// Steps back one question; a no-op at position 0. The countdown is not
    /// restarted: time spent on a question is not refunded for re-reading it.
    pub fn go_previous(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        if self.position > 0 {
            self.position -= 1;
        }
        Ok(())
    }

    /// Jumps straight to a question (quick-navigation grid). Like
    /// `go_previous`, the countdown keeps running untouched.
    pub fn jump_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        if index >= self.questions.len() {
            return Err(SessionError::IndexOutOfRange(index));
        }
        self.position = index;
        Ok(())
    }

    /// Advances the countdown by one second. Reaching zero behaves exactly
    /// like the user pressing "next": advance, or complete on the final
    /// question.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.is_completed() {
            return Tick::Suspended;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return Tick::Running(self.remaining_seconds);
        }

        match self.go_next(now) {
            Ok(Advance::Moved) => Tick::Advanced,
            Ok(Advance::Submitted) => Tick::Submitted,
            // unreachable: completion is checked above
            Err(_) => Tick::Suspended,
        }
    }

    /// Completes the session. With unanswered questions left, the caller must
    /// pass `confirmed = true` (the UI asks the user first); timer-driven
    /// completion bypasses this via `go_next`.
    pub fn submit(
        &mut self,
        now: DateTime<Utc>,
        confirmed: bool,
    ) -> Result<&SessionResult, SessionError> {
        self.ensure_in_progress()?;

        let unanswered = self.questions.len() - self.answered_ids().len();
        if unanswered > 0 && !confirmed {
            return Err(SessionError::UnansweredQuestions(unanswered));
        }

        self.finalize(now);
        match &self.phase {
            Phase::Completed(result) => Ok(result),
            Phase::InProgress => unreachable!("finalize always completes the session"),
        }
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.is_completed() {
            return Err(SessionError::AlreadyCompleted);
        }
        Ok(())
    }

    fn finalize(&mut self, now: DateTime<Utc>) {
        let summary = score::score(&self.questions, &self.answers);
        let total = self.questions.len() as u32;
        let score_percentage = f64::from(summary.correct_count) / f64::from(total) * 100.0;

        let outcomes = self
            .questions
            .iter()
            .map(|question| {
                let answer = self
                    .answers
                    .get(&question.id)
                    .filter(|a| !a.trim().is_empty())
                    .cloned();
                let correct = answer
                    .as_deref()
                    .map(|a| evaluate::is_correct(question, a));
                QuestionOutcome {
                    question_id: question.id,
                    answer,
                    correct,
                }
            })
            .collect();

        self.phase = Phase::Completed(SessionResult {
            raw_score: summary.raw_score,
            correct_count: summary.correct_count,
            wrong_count: summary.wrong_count,
            unanswered_count: total - summary.correct_count - summary.wrong_count,
            total_questions: total,
            score_percentage,
            time_taken_seconds: (now - self.started_at).num_seconds().max(0),
            completed_at: now,
            outcomes,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, McqOption, Question, QuestionBody};
    use chrono::TimeDelta;

    fn question(id: i64) -> Question {
        Question {
            id,
            text: format!("question {id}"),
            category: "GPIO".to_string(),
            difficulty: Difficulty::Easy,
            explanation: Some(format!("explanation {id}")),
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

    fn session(count: i64) -> QuizSession {
        let questions = (1..=count).map(question).collect();
        QuizSession::start(questions, None, None, 30, now()).unwrap()
    }

    #[test]
    fn start_rejects_empty_question_set() {
        let err = QuizSession::start(Vec::new(), None, None, 30, now()).unwrap_err();
        assert_eq!(err, SessionError::EmptyQuestionSet);
    }

    #[test]
    fn starts_at_position_zero_with_full_countdown() {
        let s = session(5);
        assert_eq!(s.position(), 0);
        assert_eq!(s.remaining_seconds(), 30);
        assert!(s.answered_ids().is_empty());
        assert!(!s.is_completed());
    }

    #[test]
    fn position_stays_in_bounds_through_navigation() {
        let mut s = session(3);

        s.go_previous().unwrap();
        assert_eq!(s.position(), 0);

        assert_eq!(s.go_next(now()).unwrap(), Advance::Moved);
        assert_eq!(s.go_next(now()).unwrap(), Advance::Moved);
        assert_eq!(s.position(), 2);

        assert_eq!(s.jump_to(5).unwrap_err(), SessionError::IndexOutOfRange(5));
        assert_eq!(s.position(), 2);

        s.jump_to(0).unwrap();
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn go_next_resets_countdown_but_previous_and_jump_do_not() {
        let mut s = session(3);
        for _ in 0..10 {
            s.tick(now());
        }
        assert_eq!(s.remaining_seconds(), 20);

        s.go_next(now()).unwrap();
        assert_eq!(s.remaining_seconds(), 30);

        s.tick(now());
        s.go_previous().unwrap();
        assert_eq!(s.remaining_seconds(), 29);

        s.jump_to(2).unwrap();
        assert_eq!(s.remaining_seconds(), 29);
    }

    #[test]
    fn record_answer_upserts_last_write_wins() {
        let mut s = session(2);
        s.record_answer(1, "wrong".to_string()).unwrap();
        s.record_answer(1, "right".to_string()).unwrap();
        assert_eq!(s.answer_for(1), Some("right"));
        assert_eq!(s.answered_ids(), vec![1]);
    }

    #[test]
    fn blank_answer_clears_the_entry() {
        let mut s = session(2);
        s.record_answer(1, "right".to_string()).unwrap();
        s.record_answer(1, "   ".to_string()).unwrap();
        assert!(s.answered_ids().is_empty());
    }

    #[test]
    fn record_answer_rejects_unknown_question() {
        let mut s = session(2);
        assert_eq!(
            s.record_answer(99, "x".to_string()).unwrap_err(),
            SessionError::UnknownQuestion(99)
        );
    }

    #[test]
    fn countdown_exhaustion_advances_without_recording_an_answer() {
        let mut s = session(5);
        s.jump_to(2).unwrap();

        let mut last = Tick::Running(0);
        for _ in 0..30 {
            last = s.tick(now());
        }

        assert_eq!(last, Tick::Advanced);
        assert_eq!(s.position(), 3);
        assert_eq!(s.remaining_seconds(), 30);
        assert!(!s.answered_ids().contains(&3));
    }

    #[test]
    fn countdown_exhaustion_on_final_question_completes_the_session() {
        let mut s = session(2);
        s.record_answer(1, "right".to_string()).unwrap();
        s.jump_to(1).unwrap();

        let mut last = Tick::Running(0);
        for _ in 0..30 {
            last = s.tick(now());
        }

        assert_eq!(last, Tick::Submitted);
        assert!(s.is_completed());
        let result = s.result().unwrap();
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.unanswered_count, 1);
    }

    #[test]
    fn tick_on_completed_session_is_suspended() {
        let mut s = session(1);
        s.submit(now(), true).unwrap();
        assert_eq!(s.tick(now()), Tick::Suspended);
    }

    #[test]
    fn go_next_on_last_question_submits() {
        let mut s = session(1);
        s.record_answer(1, "right".to_string()).unwrap();
        assert_eq!(s.go_next(now()).unwrap(), Advance::Submitted);
        assert!(s.is_completed());
    }

    #[test]
    fn submit_with_gaps_requires_confirmation() {
        let mut s = session(3);
        s.record_answer(1, "right".to_string()).unwrap();

        assert_eq!(
            s.submit(now(), false).unwrap_err(),
            SessionError::UnansweredQuestions(2)
        );
        assert!(!s.is_completed());

        s.submit(now(), true).unwrap();
        assert!(s.is_completed());
    }

    #[test]
    fn submit_without_gaps_needs_no_confirmation() {
        let mut s = session(2);
        s.record_answer(1, "right".to_string()).unwrap();
        s.record_answer(2, "wrong".to_string()).unwrap();
        assert!(s.submit(now(), false).is_ok());
    }

    #[test]
    fn completed_session_is_immutable() {
        let mut s = session(2);
        s.submit(now(), true).unwrap();

        assert_eq!(
            s.record_answer(1, "right".to_string()).unwrap_err(),
            SessionError::AlreadyCompleted
        );
        assert_eq!(s.go_next(now()).unwrap_err(), SessionError::AlreadyCompleted);
        assert_eq!(s.go_previous().unwrap_err(), SessionError::AlreadyCompleted);
        assert_eq!(s.jump_to(0).unwrap_err(), SessionError::AlreadyCompleted);
        assert_eq!(
            s.submit(now(), true).unwrap_err(),
            SessionError::AlreadyCompleted
        );
    }

    #[test]
    fn result_reports_divergent_raw_score_and_percentage() {
        let mut s = session(10);
        for id in 1..=6 {
            s.record_answer(id, "right".to_string()).unwrap();
        }
        for id in 7..=8 {
            s.record_answer(id, "wrong".to_string()).unwrap();
        }

        let completed_at = now() + TimeDelta::seconds(95);
        let result = s.submit(completed_at, true).unwrap();

        assert!((result.raw_score - 5.5).abs() < f64::EPSILON);
        assert_eq!(result.correct_count, 6);
        assert_eq!(result.wrong_count, 2);
        assert_eq!(result.unanswered_count, 2);
        assert!((result.score_percentage - 60.0).abs() < f64::EPSILON);
        assert_eq!(result.time_taken_seconds, 95);
    }

    #[test]
    fn outcomes_mark_unanswered_questions_as_neither() {
        let mut s = session(3);
        s.record_answer(1, "right".to_string()).unwrap();
        s.record_answer(3, "wrong".to_string()).unwrap();
        let result = s.submit(now(), true).unwrap();

        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.outcomes[0].correct, Some(true));
        assert_eq!(result.outcomes[1].correct, None);
        assert_eq!(result.outcomes[1].answer, None);
        assert_eq!(result.outcomes[2].correct, Some(false));
    }

    #[test]
    fn fresh_session_carries_nothing_over() {
        let mut first = session(3);
        first.record_answer(1, "right".to_string()).unwrap();
        first.jump_to(2).unwrap();
        first.submit(now(), true).unwrap();

        // retake: a new session over the same pool starts clean
        let second = session(3);
        assert_eq!(second.position(), 0);
        assert!(second.answered_ids().is_empty());
        assert_eq!(second.remaining_seconds(), 30);
        assert!(second.result().is_none());
    }
}
