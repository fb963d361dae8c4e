// src/quiz/mod.rs

pub mod evaluate;
pub mod score;
pub mod session;
