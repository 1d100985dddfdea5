//! Session scoring: aggregate, per-category and per-difficulty accuracy.
//!
//! Scoring only reads a session; it can run any number of times on an
//! in-progress or completed session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{QuizError, QuizResult};
use crate::model::Difficulty;
use crate::repository::QuestionRepository;
use crate::session::{Progress, SessionState, SessionTracker};

/// Correct-over-answered for one slice of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Accuracy {
    pub correct: usize,
    pub answered: usize,
    /// `None` when nothing in this slice has been answered yet.
    pub accuracy: Option<f64>,
}

impl Accuracy {
    fn record(&mut self, correct: bool) {
        self.answered += 1;
        if correct {
            self.correct += 1;
        }
        self.accuracy = Some(self.correct as f64 / self.answered as f64);
    }

    /// No answers yet, so no meaningful ratio.
    pub fn no_data(&self) -> bool {
        self.answered == 0
    }

    /// Accuracy as a percentage, `0.0` when there is no data.
    pub fn percent(&self) -> f64 {
        self.accuracy.unwrap_or(0.0) * 100.0
    }
}

/// Scores for a session at the moment they were computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResults {
    pub session_id: Uuid,
    pub state: SessionState,
    pub progress: Progress,
    pub aggregate: Accuracy,
    /// Keyed by category key; covers every tag among the served questions.
    pub by_category: BTreeMap<String, Accuracy>,
    /// Covers every difficulty among the served questions.
    pub by_difficulty: BTreeMap<Difficulty, Accuracy>,
}

/// Score a started session.
pub fn score_session(
    session: &SessionTracker,
    repo: &QuestionRepository,
) -> QuizResult<SessionResults> {
    if session.state() == SessionState::NotStarted {
        return Err(QuizError::InvalidState(format!(
            "session {} has not started, nothing to score",
            session.id()
        )));
    }

    let mut aggregate = Accuracy::default();
    let mut by_category: BTreeMap<String, Accuracy> = BTreeMap::new();
    let mut by_difficulty: BTreeMap<Difficulty, Accuracy> = BTreeMap::new();

    for id in session.served() {
        let question = repo.get(id.as_str())?;
        let answer = session.answers().get(id);

        let difficulty = by_difficulty.entry(question.difficulty).or_default();
        if let Some(a) = answer {
            difficulty.record(a.correct);
            aggregate.record(a.correct);
        }
        for tag in &question.tags {
            let slice = by_category.entry(tag.to_string()).or_default();
            if let Some(a) = answer {
                slice.record(a.correct);
            }
        }
    }

    Ok(SessionResults {
        session_id: session.id(),
        state: session.state(),
        progress: session.progress(),
        aggregate,
        by_category,
        by_difficulty,
    })
}
