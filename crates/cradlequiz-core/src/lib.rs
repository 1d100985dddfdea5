//! cradlequiz-core — Quiz selection and session engine.
//!
//! Loads a validated trivia corpus, draws non-repeating quizzes filtered by
//! category and balanced by difficulty, tracks answers per session, and
//! scores sessions overall, per category and per difficulty.

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod model;
pub mod parser;
pub mod report;
pub mod repository;
pub mod sampler;
pub mod score;
pub mod session;

pub use engine::{AnswerFeedback, QuizEngine, QuizQuestion, QuizStarted};
pub use error::{QuizError, QuizResult, ValidationIssue};
pub use model::{Corpus, Difficulty, DifficultyMix, MatchMode, QuizRequest};
pub use repository::QuestionRepository;
pub use score::{Accuracy, SessionResults};
