//! Per-session state machine.
//!
//! A tracker moves `NotStarted -> InProgress -> Completed` and never back.
//! The served sequence is drawn once, at start; answers are recorded at most
//! once per served question.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{QuizError, QuizResult};
use crate::filter;
use crate::model::{QuestionId, QuizRequest};
use crate::repository::QuestionRepository;
use crate::sampler;

/// Lifecycle of a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Completed,
}

/// A recorded answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub choice: usize,
    pub correct: bool,
}

/// How far through its served questions a session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

impl Progress {
    pub fn remaining(&self) -> usize {
        self.total - self.answered
    }
}

/// Mutable state for one quiz attempt.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    id: Uuid,
    state: SessionState,
    request: Option<QuizRequest>,
    served: Vec<QuestionId>,
    answers: BTreeMap<QuestionId, Answer>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionTracker {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: SessionState::NotStarted,
            request: None,
            served: Vec::new(),
            answers: BTreeMap::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Filter and sample the whole quiz up front and move to `InProgress`.
    ///
    /// On failure the tracker is left untouched in `NotStarted`.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        request: QuizRequest,
        repo: &QuestionRepository,
        rng: &mut R,
    ) -> QuizResult<&[QuestionId]> {
        if self.state != SessionState::NotStarted {
            return Err(QuizError::InvalidState(format!(
                "session {} has already been started",
                self.id
            )));
        }

        let candidates = filter::candidates(repo, &request.categories, request.match_mode)?;
        let served = sampler::sample(
            repo,
            &candidates,
            request.count,
            request.difficulty_mix.as_ref(),
            &BTreeSet::new(),
            rng,
        )?;

        self.served = served;
        self.request = Some(request);
        self.state = SessionState::InProgress;
        self.touch();
        Ok(&self.served)
    }

    /// Record the user's choice for a served question.
    pub fn submit_answer(
        &mut self,
        repo: &QuestionRepository,
        question_id: &str,
        choice: usize,
    ) -> QuizResult<Answer> {
        self.require_in_progress("submit an answer")?;

        if !self.served.iter().any(|id| id.as_str() == question_id) {
            return Err(QuizError::NotFound(format!(
                "question '{question_id}' was not served in session {}",
                self.id
            )));
        }
        if self.answers.contains_key(question_id) {
            return Err(QuizError::InvalidState(format!(
                "question '{question_id}' has already been answered"
            )));
        }

        let question = repo.get(question_id)?;
        if choice >= question.options.len() {
            return Err(QuizError::Configuration(format!(
                "choice {choice} is out of range for {} options",
                question.options.len()
            )));
        }

        let answer = Answer {
            choice,
            correct: question.is_correct(choice),
        };
        self.answers.insert(question.id.clone(), answer);
        self.touch();
        Ok(answer)
    }

    /// Close the session. Unanswered questions are simply left out of scoring.
    pub fn finish(&mut self) -> QuizResult<()> {
        self.require_in_progress("finish")?;
        self.state = SessionState::Completed;
        self.touch();
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn request(&self) -> Option<&QuizRequest> {
        self.request.as_ref()
    }

    pub fn served(&self) -> &[QuestionId] {
        &self.served
    }

    pub fn answers(&self) -> &BTreeMap<QuestionId, Answer> {
        &self.answers
    }

    /// Bumped on every successful mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn progress(&self) -> Progress {
        Progress {
            answered: self.answers.len(),
            total: self.served.len(),
        }
    }

    /// First served question still waiting for an answer.
    pub fn next_unanswered(&self) -> Option<&QuestionId> {
        self.served
            .iter()
            .find(|id| !self.answers.contains_key(id.as_str()))
    }

    fn require_in_progress(&self, action: &str) -> QuizResult<()> {
        match self.state {
            SessionState::InProgress => Ok(()),
            SessionState::NotStarted => Err(QuizError::InvalidState(format!(
                "cannot {action}: session {} has not started",
                self.id
            ))),
            SessionState::Completed => Err(QuizError::InvalidState(format!(
                "cannot {action}: session {} is completed",
                self.id
            ))),
        }
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}
