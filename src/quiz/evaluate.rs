// src/quiz/evaluate.rs

use crate::models::question::{Question, QuestionBody};

/// Decides whether a submitted answer is correct for the given question.
///
/// Multiple-choice answers must match the correct option's display text
/// exactly: option text is presented verbatim as selectable choices, so no
/// trimming or fuzzy matching is applied. Short answers are compared
/// case-insensitively with surrounding whitespace ignored, against the
/// canonical answer and every accepted alternative.
///
/// An empty submission is never correct. Callers skip unanswered questions
/// entirely, so this is a guard, not a hot path.
pub fn is_correct(question: &Question, submitted: &str) -> bool {
    if submitted.is_empty() {
        return false;
    }

    match &question.body {
        QuestionBody::MultipleChoice(options) => options
            .iter()
            .find(|o| o.is_correct)
            .is_some_and(|o| o.text == submitted),
        QuestionBody::ShortAnswer(key) => {
            let Some(key) = key else {
                // No answer key on record: nothing can match.
                return false;
            };
            let submitted = normalize(submitted);
            if submitted.is_empty() {
                return false;
            }
            normalize(&key.answer) == submitted
                || key.alternatives.iter().any(|alt| normalize(alt) == submitted)
        }
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, McqOption, Question, QuestionBody, ShortAnswerKey};

    fn mcq(options: &[(&str, bool)]) -> Question {
        Question {
            id: 1,
            text: "Which register enables the peripheral clock?".to_string(),
            category: "Microcontrollers".to_string(),
            difficulty: Difficulty::Medium,
            explanation: None,
            is_active: true,
            order_index: 0,
            body: QuestionBody::MultipleChoice(
                options
                    .iter()
                    .enumerate()
                    .map(|(i, (text, is_correct))| McqOption {
                        id: i as i64 + 1,
                        question_id: 1,
                        text: text.to_string(),
                        is_correct: *is_correct,
                        display_order: i as i32,
                    })
                    .collect(),
            ),
        }
    }

    fn short_answer(answer: &str, alternatives: &[&str]) -> Question {
        Question {
            id: 2,
            text: "What does PWM stand for?".to_string(),
            category: "Signals".to_string(),
            difficulty: Difficulty::Easy,
            explanation: None,
            is_active: true,
            order_index: 1,
            body: QuestionBody::ShortAnswer(Some(ShortAnswerKey {
                question_id: 2,
                answer: answer.to_string(),
                alternatives: alternatives.iter().map(|a| a.to_string()).collect(),
            })),
        }
    }

    #[test]
    fn mcq_matches_exactly_one_option() {
        let q = mcq(&[
            ("RCC_AHB1ENR", true),
            ("GPIOA_MODER", false),
            ("NVIC_ISER0", false),
            ("SysTick_CTRL", false),
        ]);

        assert!(is_correct(&q, "RCC_AHB1ENR"));
        assert!(!is_correct(&q, "GPIOA_MODER"));
        assert!(!is_correct(&q, "NVIC_ISER0"));
        assert!(!is_correct(&q, "SysTick_CTRL"));
    }

    #[test]
    fn mcq_match_is_exact_not_trimmed() {
        let q = mcq(&[("RCC_AHB1ENR", true), ("GPIOA_MODER", false)]);
        assert!(!is_correct(&q, " RCC_AHB1ENR "));
        assert!(!is_correct(&q, "rcc_ahb1enr"));
    }

    #[test]
    fn mcq_without_correct_option_never_matches() {
        let q = mcq(&[("A", false), ("B", false)]);
        assert!(!is_correct(&q, "A"));
        assert!(!is_correct(&q, "B"));
    }

    #[test]
    fn short_answer_ignores_case_and_whitespace() {
        let q = short_answer("Pulse Width Modulation", &[]);
        assert!(is_correct(&q, " Pulse Width Modulation "));
        assert!(is_correct(&q, "pulse width modulation"));
        assert!(is_correct(&q, "PULSE WIDTH MODULATION"));
        assert!(!is_correct(&q, "pulse modulation"));
    }

    #[test]
    fn short_answer_accepts_alternatives() {
        let q = short_answer("Pulse Width Modulation", &["PWM", " pwm "]);
        assert!(is_correct(&q, "pwm"));
        assert!(is_correct(&q, "PWM "));
        assert!(!is_correct(&q, "ppm"));
    }

    #[test]
    fn short_answer_without_key_never_matches() {
        let mut q = short_answer("x", &[]);
        q.body = QuestionBody::ShortAnswer(None);
        assert!(!is_correct(&q, "x"));
    }

    #[test]
    fn empty_submission_is_never_correct() {
        let q = short_answer("Pulse Width Modulation", &[]);
        assert!(!is_correct(&q, ""));
        assert!(!is_correct(&q, "   "));
    }
}
