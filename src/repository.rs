// src/repository.rs
//
// Read side of the question bank: loads question rows with their option /
// answer-key sub-records attached and normalized into `models::question`
// shapes. The quiz engine only ever reads here; authoring happens in the
// admin tooling.

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder, prelude::FromRow};

use crate::models::question::{
    Difficulty, McqOption, Question, QuestionBody, ShortAnswerKey,
};

const QUESTION_TYPE_MCQ: &str = "multiple_choice";
const QUESTION_TYPE_SHORT: &str = "short_answer";

/// Filter for `load_questions`. Defaults to all categories, active only.
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Deactivated questions stay out of session pools unless asked for.
    pub include_inactive: bool,
}

#[derive(Debug, FromRow)]
struct QuestionRow {
    id: i64,
    text: String,
    #[sqlx(rename = "type")]
    question_type: String,
    category: String,
    difficulty: String,
    explanation: Option<String>,
    is_active: bool,
    order_index: i32,
}

#[derive(Debug, FromRow)]
struct OptionRow {
    id: i64,
    question_id: i64,
    text: String,
    is_correct: bool,
    display_order: i32,
}

#[derive(Debug, FromRow)]
struct ShortAnswerRow {
    question_id: i64,
    answer: String,
    alternatives: sqlx::types::Json<Vec<String>>,
}

/// Loads questions ordered by their stored ordering index, each with its
/// sub-records attached. Rows with an unrecognized `type` are dropped with a
/// warning rather than poisoning the whole load.
pub async fn load_questions(
    pool: &PgPool,
    filter: &QuestionFilter,
) -> Result<Vec<Question>, sqlx::Error> {
    let mut query_builder = QueryBuilder::<Postgres>::new(
        "SELECT id, text, type, category, difficulty, explanation, is_active, order_index \
         FROM questions WHERE 1 = 1",
    );

    if !filter.include_inactive {
        query_builder.push(" AND is_active = TRUE");
    }
    if let Some(category) = &filter.category {
        query_builder.push(" AND category = ");
        query_builder.push_bind(category);
    }
    query_builder.push(" ORDER BY order_index ASC, id ASC");

    let rows: Vec<QuestionRow> = query_builder.build_query_as().fetch_all(pool).await?;

    let mcq_ids: Vec<i64> = rows
        .iter()
        .filter(|r| r.question_type == QUESTION_TYPE_MCQ)
        .map(|r| r.id)
        .collect();
    let short_ids: Vec<i64> = rows
        .iter()
        .filter(|r| r.question_type == QUESTION_TYPE_SHORT)
        .map(|r| r.id)
        .collect();

    let mut options_by_question = load_options(pool, &mcq_ids).await?;
    let mut keys_by_question = load_answer_keys(pool, &short_ids).await?;

    let mut questions = Vec::with_capacity(rows.len());
    for row in rows {
        let body = match row.question_type.as_str() {
            QUESTION_TYPE_MCQ => QuestionBody::MultipleChoice(
                options_by_question.remove(&row.id).unwrap_or_default(),
            ),
            QUESTION_TYPE_SHORT => {
                QuestionBody::ShortAnswer(keys_by_question.remove(&row.id))
            }
            other => {
                tracing::warn!(
                    "Skipping question {} with unknown type '{}'",
                    row.id,
                    other
                );
                continue;
            }
        };

        questions.push(Question {
            id: row.id,
            text: row.text,
            category: row.category,
            difficulty: Difficulty::from_db(&row.difficulty),
            explanation: row.explanation,
            is_active: row.is_active,
            order_index: row.order_index,
            body,
        });
    }

    Ok(questions)
}

/// Distinct categories over active questions, for the selection screen.
pub async fn load_categories(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM questions WHERE is_active = TRUE ORDER BY category ASC",
    )
    .fetch_all(pool)
    .await
}

async fn load_options(
    pool: &PgPool,
    question_ids: &[i64],
) -> Result<HashMap<i64, Vec<McqOption>>, sqlx::Error> {
    let mut grouped: HashMap<i64, Vec<McqOption>> = HashMap::new();
    if question_ids.is_empty() {
        return Ok(grouped);
    }

    let mut query_builder = QueryBuilder::<Postgres>::new(
        "SELECT id, question_id, text, is_correct, display_order \
         FROM mcq_options WHERE question_id IN (",
    );
    let mut separated = query_builder.separated(",");
    for id in question_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");
    query_builder.push(" ORDER BY display_order ASC, id ASC");

    let rows: Vec<OptionRow> = query_builder.build_query_as().fetch_all(pool).await?;
    for row in rows {
        grouped.entry(row.question_id).or_default().push(McqOption {
            id: row.id,
            question_id: row.question_id,
            text: row.text,
            is_correct: row.is_correct,
            display_order: row.display_order,
        });
    }

    Ok(grouped)
}

async fn load_answer_keys(
    pool: &PgPool,
    question_ids: &[i64],
) -> Result<HashMap<i64, ShortAnswerKey>, sqlx::Error> {
    let mut grouped = HashMap::new();
    if question_ids.is_empty() {
        return Ok(grouped);
    }

    let mut query_builder = QueryBuilder::<Postgres>::new(
        "SELECT question_id, answer, alternatives \
         FROM short_answers WHERE question_id IN (",
    );
    let mut separated = query_builder.separated(",");
    for id in question_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let rows: Vec<ShortAnswerRow> = query_builder.build_query_as().fetch_all(pool).await?;
    for row in rows {
        grouped.insert(
            row.question_id,
            ShortAnswerKey {
                question_id: row.question_id,
                answer: row.answer,
                alternatives: row.alternatives.0,
            },
        );
    }

    Ok(grouped)
}
