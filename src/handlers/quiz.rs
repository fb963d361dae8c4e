// src/handlers/quiz.rs

use std::time::Duration;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::PublicQuestion,
    persistence,
    quiz::session::{Advance, QuizSession, Tick},
    repository::{self, QuestionFilter},
    state::{AppState, SessionEntry},
    utils::jwt::{Claims, OptionalClaims},
};

/// Query parameters for starting a session. The portal links into the quiz
/// page with `?category=...`, which is equivalent to picking the category on
/// the selection screen.
#[derive(Debug, Deserialize)]
pub struct StartParams {
    pub category: Option<String>,
}

/// DTO for starting a session from the category-selection screen.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct StartSessionRequest {
    /// Omitted or null means "all categories".
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
}

/// DTO for recording an answer to one question of the running session.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    pub question_id: i64,
    #[validate(length(max = 2000))]
    pub answer: String,
}

/// DTO for the quick-navigation grid.
#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub index: usize,
}

/// DTO for submitting. `confirmed` acknowledges unanswered questions.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub confirmed: bool,
}

/// What the client sees of a running session: the current question without
/// any correctness data, plus cursor and countdown state.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub category: Option<String>,
    pub position: usize,
    pub total_questions: usize,
    pub remaining_seconds: u32,
    pub answered_question_ids: Vec<i64>,
    pub completed: bool,
    pub question: PublicQuestion,
}

impl SessionView {
    fn from_session(session_id: Uuid, session: &QuizSession) -> Self {
        SessionView {
            session_id,
            category: session.category().map(str::to_string),
            position: session.position(),
            total_questions: session.len(),
            remaining_seconds: session.remaining_seconds(),
            answered_question_ids: session.answered_ids(),
            completed: session.is_completed(),
            question: PublicQuestion::from_question(session.current_question()),
        }
    }
}

/// Full results-screen payload, including per-question breakdown with
/// explanations. Only available once the session completed.
#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub raw_score: f64,
    pub total_questions: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub unanswered_count: u32,
    pub score_percentage: f64,
    pub time_taken_seconds: i64,
    pub completed_at: DateTime<Utc>,
    pub category: Option<String>,
    pub questions: Vec<ResultQuestion>,
}

#[derive(Debug, Serialize)]
pub struct ResultQuestion {
    pub question_id: i64,
    pub text: String,
    pub your_answer: Option<String>,
    /// `None` for unanswered questions: neither correct nor wrong.
    pub correct: Option<bool>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

fn build_result(session: &QuizSession) -> Option<ResultResponse> {
    let result = session.result()?;

    let questions = session
        .questions()
        .iter()
        .zip(&result.outcomes)
        .map(|(question, outcome)| ResultQuestion {
            question_id: question.id,
            text: question.text.clone(),
            your_answer: outcome.answer.clone(),
            correct: outcome.correct,
            correct_answer: question.correct_answer_text().map(str::to_string),
            explanation: question.explanation.clone(),
        })
        .collect();

    Some(ResultResponse {
        raw_score: result.raw_score,
        total_questions: result.total_questions,
        correct_count: result.correct_count,
        wrong_count: result.wrong_count,
        unanswered_count: result.unanswered_count,
        score_percentage: result.score_percentage,
        time_taken_seconds: result.time_taken_seconds,
        completed_at: result.completed_at,
        category: session.category().map(str::to_string),
        questions,
    })
}

fn session_not_found() -> AppError {
    AppError::NotFound("Session not found".to_string())
}

/// Lists the distinct categories of active questions for the selection screen.
pub async fn list_categories(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let categories = repository::load_categories(&pool).await.map_err(|e| {
        tracing::error!("Failed to load categories: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(categories))
}

/// Starts a new quiz session, optionally scoped to one category.
///
/// The question pool is snapshotted here; a session in flight never sees
/// later question-bank edits. Works for anonymous users too; identity is
/// only needed again at completion, for persistence.
pub async fn start_session(
    State(state): State<AppState>,
    claims: OptionalClaims,
    Query(params): Query<StartParams>,
    payload: Option<Json<StartSessionRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let request = StartSessionRequest {
        category: payload
            .category
            .or(params.category)
            .filter(|c| !c.trim().is_empty()),
    };
    if let Err(validation_errors) = request.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    start_fresh(state, request.category, claims.user_id()).await
}

/// Loads the question pool and registers a new session over it. Shared by
/// `start_session` and `retake_session`.
async fn start_fresh(
    state: AppState,
    category: Option<String>,
    user_id: Option<i64>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let filter = QuestionFilter {
        category: category.clone(),
        include_inactive: false,
    };
    let questions = repository::load_questions(&state.pool, &filter)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load questions: {:?}", e);
            AppError::InternalServerError("Could not load questions".to_string())
        })?;

    if questions.is_empty() {
        return Err(AppError::BadRequest(
            "No questions available for this selection".to_string(),
        ));
    }

    let question_count = questions.len();
    let session = QuizSession::start(
        questions,
        category,
        user_id,
        state.config.seconds_per_question,
        Utc::now(),
    )?;

    let session_id = Uuid::new_v4();
    state
        .sessions
        .insert(
            session_id,
            SessionEntry {
                session,
                ticker: None,
            },
        )
        .await;

    let ticker = spawn_ticker(state.clone(), session_id);
    state
        .sessions
        .with_entry(&session_id, |entry| entry.ticker = Some(ticker))
        .await;

    tracing::info!(
        "Started quiz session {} ({} questions)",
        session_id,
        question_count
    );

    let view = state
        .sessions
        .with_entry(&session_id, |entry| {
            SessionView::from_session(session_id, &entry.session)
        })
        .await
        .ok_or_else(session_not_found)?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// Discards the given session entirely and starts a fresh one over the same
/// category for the same (possibly anonymous) owner. Nothing carries over:
/// answers, cursor and timing all reset.
pub async fn retake_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let old = state
        .sessions
        .remove(&session_id)
        .await
        .ok_or_else(session_not_found)?;
    if let Some(ticker) = old.ticker {
        ticker.abort();
    }

    let category = old.session.category().map(str::to_string);
    let user_id = old.session.user_id();
    start_fresh(state, category, user_id).await
}

/// Current state of a session: cursor, countdown, current question.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    session_view(&state, &session_id).await
}

/// Records (or overwrites) the answer for one question. The cursor does not
/// move; the same question may be re-answered while it is on screen.
pub async fn record_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    state
        .sessions
        .with_entry(&session_id, |entry| {
            entry.session.record_answer(payload.question_id, payload.answer)
        })
        .await
        .ok_or_else(session_not_found)??;

    session_view(&state, &session_id).await
}

/// Advances to the next question, or submits when the last question is on
/// screen.
pub async fn go_next(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let advance = state
        .sessions
        .with_entry(&session_id, |entry| entry.session.go_next(Utc::now()))
        .await
        .ok_or_else(session_not_found)??;

    if advance == Advance::Submitted {
        finish_session(&state, &session_id).await;
    }

    session_view(&state, &session_id).await
}

/// Steps back one question without restarting the countdown.
pub async fn go_previous(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .sessions
        .with_entry(&session_id, |entry| entry.session.go_previous())
        .await
        .ok_or_else(session_not_found)??;

    session_view(&state, &session_id).await
}

/// Jumps to a question by index (quick-navigation grid).
pub async fn jump_to(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<JumpRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .sessions
        .with_entry(&session_id, |entry| entry.session.jump_to(payload.index))
        .await
        .ok_or_else(session_not_found)??;

    session_view(&state, &session_id).await
}

/// Submits the session. With unanswered questions left this returns 409
/// until the client confirms; the results are computed entirely in memory
/// before any persistence is attempted.
pub async fn submit_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    payload: Option<Json<SubmitRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let confirmed = payload.map(|Json(p)| p.confirmed).unwrap_or(false);

    state
        .sessions
        .with_entry(&session_id, |entry| {
            entry.session.submit(Utc::now(), confirmed).map(|_| ())
        })
        .await
        .ok_or_else(session_not_found)??;

    finish_session(&state, &session_id).await;
    read_result(&state, &session_id).await
}

/// Full score breakdown of a completed session.
pub async fn get_result(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    read_result(&state, &session_id).await
}

/// Discards a session (leaving the results screen, or abandoning mid-quiz).
/// An abandoned in-progress session leaves no trace in the database.
pub async fn discard_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state
        .sessions
        .remove(&session_id)
        .await
        .ok_or_else(session_not_found)?;

    if let Some(ticker) = entry.ticker {
        ticker.abort();
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Attempt history for the signed-in user (requires authentication).
pub async fn list_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::AuthError("Invalid user id in token".to_string()))?;

    let attempts = persistence::attempts_for_user(&pool, user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load attempts for user {}: {:?}", user_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(attempts))
}

async fn session_view(
    state: &AppState,
    session_id: &Uuid,
) -> Result<Json<SessionView>, AppError> {
    state
        .sessions
        .with_entry(session_id, |entry| {
            SessionView::from_session(*session_id, &entry.session)
        })
        .await
        .map(Json)
        .ok_or_else(session_not_found)
}

async fn read_result(
    state: &AppState,
    session_id: &Uuid,
) -> Result<Json<ResultResponse>, AppError> {
    state
        .sessions
        .with_entry(session_id, |entry| build_result(&entry.session))
        .await
        .ok_or_else(session_not_found)?
        .map(Json)
        .ok_or_else(|| AppError::Conflict("Session still in progress".to_string()))
}

/// Stops the countdown task and kicks off persistence. Called on the request
/// path after a transition to completed.
async fn finish_session(state: &AppState, session_id: &Uuid) {
    let ticker = state
        .sessions
        .with_entry(session_id, |entry| entry.ticker.take())
        .await
        .flatten();
    if let Some(handle) = ticker {
        handle.abort();
    }

    persist_if_signed_in(state, session_id).await;
}

/// Spawns writes for a completed session when it belongs to a signed-in
/// user. Anonymous sessions display results and leave nothing behind.
/// Persistence runs detached: its failure can only ever show up in the logs.
async fn persist_if_signed_in(state: &AppState, session_id: &Uuid) {
    let snapshot = state
        .sessions
        .with_entry(session_id, |entry| {
            entry.session.result().map(|result| {
                (
                    entry.session.user_id(),
                    entry.session.category().map(str::to_string),
                    result.clone(),
                )
            })
        })
        .await
        .flatten();

    let Some((user_id, category, result)) = snapshot else {
        return;
    };
    let Some((user_id, attempt, progress)) =
        persistence::rows_for_completion(user_id, category, &result)
    else {
        tracing::debug!("Session {} completed anonymously; not persisted", session_id);
        return;
    };

    tokio::spawn(persistence::persist_completed(
        state.pool.clone(),
        user_id,
        attempt,
        progress,
    ));
}

/// One countdown task per in-progress session: fires once per second against
/// the current question and stops when the session completes or disappears.
/// Network round-trips elsewhere never pause it.
fn spawn_ticker(state: AppState, session_id: Uuid) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick of a tokio interval completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            let tick = state
                .sessions
                .with_entry(&session_id, |entry| entry.session.tick(Utc::now()))
                .await;

            match tick {
                Some(Tick::Running(_)) | Some(Tick::Advanced) => {}
                Some(Tick::Submitted) => {
                    // This task ends here; dropping our own handle detaches it.
                    state
                        .sessions
                        .with_entry(&session_id, |entry| entry.ticker.take())
                        .await;
                    persist_if_signed_in(&state, &session_id).await;
                    break;
                }
                // Completed by a manual submit, or discarded.
                Some(Tick::Suspended) | None => break,
            }
        }
    })
}
