// src/models/question.rs

use serde::{Deserialize, Serialize};

/// Question difficulty, stored as lowercase text in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Maps a raw database value. Unknown values fall back to `Medium`
    /// (the column is CHECK-constrained, so this only covers drift).
    pub fn from_db(value: &str) -> Self {
        match value {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

/// Question type discriminant, matching the `type` column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    ShortAnswer,
}

/// A single selectable choice attached to a multiple-choice question.
#[derive(Debug, Clone, PartialEq)]
pub struct McqOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
    pub display_order: i32,
}

/// Canonical answer key for a short-answer question, plus any accepted
/// alternative phrasings.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortAnswerKey {
    pub question_id: i64,
    pub answer: String,
    pub alternatives: Vec<String>,
}

/// Type-specific payload of a question. A question carries exactly one of
/// these; the enum makes it impossible to attach both.
///
/// An empty option list or a missing answer key is a data-integrity problem
/// upstream (the admin tooling), not something the engine resolves: such a
/// question simply never evaluates as correct.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionBody {
    MultipleChoice(Vec<McqOption>),
    ShortAnswer(Option<ShortAnswerKey>),
}

/// One assessable item from the question bank, with its sub-records attached.
/// Read-only to the quiz engine; authored by the admin flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub explanation: Option<String>,
    pub is_active: bool,
    pub order_index: i32,
    pub body: QuestionBody,
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        match self.body {
            QuestionBody::MultipleChoice(_) => QuestionKind::MultipleChoice,
            QuestionBody::ShortAnswer(_) => QuestionKind::ShortAnswer,
        }
    }

    /// The display text of the correct answer, used on the results screen.
    pub fn correct_answer_text(&self) -> Option<&str> {
        match &self.body {
            QuestionBody::MultipleChoice(options) => options
                .iter()
                .find(|o| o.is_correct)
                .map(|o| o.text.as_str()),
            QuestionBody::ShortAnswer(key) => key.as_ref().map(|k| k.answer.as_str()),
        }
    }
}

/// DTO for sending a question to the client mid-session.
/// Excludes correctness flags, the answer key and the explanation.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub text: String,
    pub category: String,
    pub difficulty: Difficulty,
    /// Empty for short-answer questions.
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

impl PublicQuestion {
    pub fn from_question(question: &Question) -> Self {
        let options = match &question.body {
            QuestionBody::MultipleChoice(options) => options
                .iter()
                .map(|o| PublicOption {
                    id: o.id,
                    text: o.text.clone(),
                })
                .collect(),
            QuestionBody::ShortAnswer(_) => Vec::new(),
        };

        PublicQuestion {
            id: question.id,
            kind: question.kind(),
            text: question.text.clone(),
            category: question.category.clone(),
            difficulty: question.difficulty,
            options,
        }
    }
}
