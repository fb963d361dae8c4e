// src/quiz/score.rs

use std::collections::HashMap;

use crate::models::question::Question;
use crate::quiz::evaluate;

/// Points awarded for a correct answer.
pub const CORRECT_REWARD: f64 = 1.0;
/// Points deducted for a wrong answer (negative marking).
pub const WRONG_PENALTY: f64 = 0.25;

/// Aggregate of one session's marking.
///
/// `raw_score` is the "X out of N" figure on the results screen: +1 per
/// correct answer, -0.25 per wrong answer, clamped at zero. Unanswered
/// questions contribute to neither tally; a blank is not a wrong answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub raw_score: f64,
    pub correct_count: u32,
    pub wrong_count: u32,
}

pub fn score(questions: &[Question], answers: &HashMap<i64, String>) -> ScoreSummary {
    let mut raw_score = 0.0;
    let mut correct_count = 0;
    let mut wrong_count = 0;

    for question in questions {
        let Some(answer) = answers.get(&question.id) else {
            continue;
        };
        // Whitespace-only entries count as unanswered, same as no entry.
        if answer.trim().is_empty() {
            continue;
        }

        if evaluate::is_correct(question, answer) {
            raw_score += CORRECT_REWARD;
            correct_count += 1;
        } else {
            raw_score -= WRONG_PENALTY;
            wrong_count += 1;
        }
    }

    ScoreSummary {
        // The running total may dip below zero mid-way; the final score never does.
        raw_score: raw_score.max(0.0),
        correct_count,
        wrong_count,
    }
}
