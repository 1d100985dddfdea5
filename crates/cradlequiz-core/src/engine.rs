//! Quiz engine: the operations a UI or API layer calls.
//!
//! One engine owns one shared, immutable [`QuestionRepository`] and a keyed
//! [`SessionStore`]. Nothing lives in process globals, so several engines
//! can coexist. Mutations of one session never wait on each other: a second
//! concurrent mutation fails fast with [`QuizError::Conflict`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{QuizError, QuizResult};
use crate::model::{Corpus, Difficulty, Question, QuestionId, QuizRequest};
use crate::report::ResultsReport;
use crate::repository::QuestionRepository;
use crate::score::{score_session, SessionResults};
use crate::session::{Progress, SessionState, SessionTracker};

/// A question as shown to a player: everything except the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
}

impl From<&Question> for QuizQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
            difficulty: q.difficulty,
            tags: q.tags.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Returned by [`QuizEngine::request_quiz`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizStarted {
    pub session_id: Uuid,
    /// Session version after the draw, for optimistic updates.
    pub version: u64,
    /// The full served sequence, in order.
    pub questions: Vec<QuizQuestion>,
}

/// Returned by [`QuizEngine::submit_answer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub correct: bool,
    pub correct_index: usize,
    pub explanation: String,
    pub progress: Progress,
    pub version: u64,
}

type SharedSession = Arc<Mutex<SessionTracker>>;

/// Sessions keyed by id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, tracker: SessionTracker) {
        let id = tracker.id();
        write(&self.sessions).insert(id, Arc::new(Mutex::new(tracker)));
    }

    fn get(&self, id: Uuid) -> QuizResult<SharedSession> {
        read(&self.sessions)
            .get(&id)
            .cloned()
            .ok_or_else(|| QuizError::NotFound(format!("session {id}")))
    }

    fn remove(&self, id: Uuid) -> Option<SharedSession> {
        write(&self.sessions).remove(&id)
    }

    pub fn len(&self) -> usize {
        read(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retain(&self, mut keep: impl FnMut(&SessionTracker) -> bool) -> usize {
        let mut sessions = write(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, s| match s.try_lock() {
            Ok(tracker) => keep(&tracker),
            Err(TryLockError::Poisoned(p)) => keep(&p.into_inner()),
            // Busy sessions are in use, hence not idle.
            Err(TryLockError::WouldBlock) => true,
        });
        before - sessions.len()
    }
}

/// The quiz selection and session engine.
pub struct QuizEngine {
    repo: Arc<QuestionRepository>,
    sessions: SessionStore,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl std::fmt::Debug for QuizEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizEngine")
            .field("corpus", &self.repo.corpus_id())
            .field("questions", &self.repo.len())
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl QuizEngine {
    /// Engine with an OS-seeded random source.
    pub fn new(repo: Arc<QuestionRepository>) -> Self {
        Self::with_rng(repo, Box::new(StdRng::from_os_rng()))
    }

    /// Engine whose draws are reproducible for a given seed.
    pub fn seeded(repo: Arc<QuestionRepository>, seed: u64) -> Self {
        Self::with_rng(repo, Box::new(StdRng::seed_from_u64(seed)))
    }

    /// Engine drawing from a caller-supplied random source.
    pub fn with_rng(repo: Arc<QuestionRepository>, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            repo,
            sessions: SessionStore::new(),
            rng: Mutex::new(rng),
        }
    }

    /// Validate a corpus and build an engine over it.
    pub fn from_corpus(corpus: Corpus, seed: Option<u64>) -> QuizResult<Self> {
        let repo = Arc::new(QuestionRepository::build(corpus)?);
        Ok(match seed {
            Some(seed) => Self::seeded(repo, seed),
            None => Self::new(repo),
        })
    }

    pub fn repository(&self) -> &Arc<QuestionRepository> {
        &self.repo
    }

    /// Number of sessions currently held.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Create a session, draw its questions and start it.
    ///
    /// Nothing is stored when filtering or sampling fails.
    pub fn request_quiz(&self, request: QuizRequest) -> QuizResult<QuizStarted> {
        let session_id = Uuid::new_v4();
        let mut tracker = SessionTracker::new(session_id);
        // Only the seed draw holds the shared lock.
        let seed = lock(&self.rng).next_u64();
        tracker.start(request, &self.repo, &mut StdRng::seed_from_u64(seed))?;

        let questions = tracker
            .served()
            .iter()
            .map(|id| self.repo.get(id.as_str()).map(QuizQuestion::from))
            .collect::<QuizResult<Vec<_>>>()?;
        let version = tracker.version();

        tracing::info!(%session_id, questions = questions.len(), "quiz session started");
        self.sessions.insert(tracker);

        Ok(QuizStarted {
            session_id,
            version,
            questions,
        })
    }

    /// Record an answer and report whether it was right.
    pub fn submit_answer(
        &self,
        session_id: Uuid,
        question_id: &str,
        choice: usize,
    ) -> QuizResult<AnswerFeedback> {
        self.answer(session_id, None, question_id, choice)
    }

    /// Like [`submit_answer`](Self::submit_answer), but fails with
    /// [`QuizError::Conflict`] unless the session is still at `expected_version`.
    pub fn submit_answer_at_version(
        &self,
        session_id: Uuid,
        expected_version: u64,
        question_id: &str,
        choice: usize,
    ) -> QuizResult<AnswerFeedback> {
        self.answer(session_id, Some(expected_version), question_id, choice)
    }

    fn answer(
        &self,
        session_id: Uuid,
        expected_version: Option<u64>,
        question_id: &str,
        choice: usize,
    ) -> QuizResult<AnswerFeedback> {
        let session = self.sessions.get(session_id)?;
        let mut tracker = try_lock(&session, session_id)?;
        check_version(&tracker, expected_version)?;

        let answer = tracker.submit_answer(&self.repo, question_id, choice)?;
        let question = self.repo.get(question_id)?;

        tracing::debug!(%session_id, question = %question_id, correct = answer.correct, "answer recorded");
        Ok(AnswerFeedback {
            question_id: question.id.clone(),
            correct: answer.correct,
            correct_index: question.correct_index,
            explanation: question.explanation.clone(),
            progress: tracker.progress(),
            version: tracker.version(),
        })
    }

    /// Complete a session; it becomes read-only.
    pub fn finish_session(&self, session_id: Uuid) -> QuizResult<()> {
        let session = self.sessions.get(session_id)?;
        let mut tracker = try_lock(&session, session_id)?;
        tracker.finish()?;
        let progress = tracker.progress();
        tracing::info!(
            %session_id,
            answered = progress.answered,
            total = progress.total,
            "quiz session finished"
        );
        Ok(())
    }

    /// Score a session.
    ///
    /// Results of a completed session are final: the session is dropped from
    /// the store once they are handed out. An in-progress session is scored
    /// as a snapshot and stays available.
    pub fn get_results(&self, session_id: Uuid) -> QuizResult<SessionResults> {
        let session = self.sessions.get(session_id)?;
        let results = {
            let tracker = lock(&session);
            score_session(&tracker, &self.repo)?
        };
        if results.state == SessionState::Completed {
            self.sessions.remove(session_id);
            tracing::debug!(%session_id, "completed session released");
        }
        Ok(results)
    }

    /// Full per-question report for a session, without releasing it.
    pub fn report(&self, session_id: Uuid) -> QuizResult<ResultsReport> {
        let session = self.sessions.get(session_id)?;
        let tracker = lock(&session);
        ResultsReport::build(&tracker, &self.repo)
    }

    pub fn progress(&self, session_id: Uuid) -> QuizResult<Progress> {
        let session = self.sessions.get(session_id)?;
        let tracker = lock(&session);
        Ok(tracker.progress())
    }

    /// The next served question without an answer, if any remain.
    pub fn next_question(&self, session_id: Uuid) -> QuizResult<Option<QuizQuestion>> {
        let session = self.sessions.get(session_id)?;
        let tracker = lock(&session);
        if tracker.state() != SessionState::InProgress {
            return Ok(None);
        }
        tracker
            .next_unanswered()
            .map(|id| self.repo.get(id.as_str()).map(QuizQuestion::from))
            .transpose()
    }

    /// Drop sessions untouched for longer than `max_idle`. Returns how many
    /// were dropped.
    pub fn evict_idle(&self, max_idle: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let evicted = self.sessions.retain(|t| t.updated_at() >= cutoff);
        if evicted > 0 {
            tracing::info!(evicted, "idle sessions evicted");
        }
        evicted
    }
}

fn check_version(tracker: &SessionTracker, expected: Option<u64>) -> QuizResult<()> {
    match expected {
        Some(v) if v != tracker.version() => Err(QuizError::Conflict(format!(
            "session {} is at version {}, caller expected {v}",
            tracker.id(),
            tracker.version()
        ))),
        _ => Ok(()),
    }
}

fn try_lock(session: &SharedSession, id: Uuid) -> QuizResult<MutexGuard<'_, SessionTracker>> {
    match session.try_lock() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::Poisoned(p)) => Ok(p.into_inner()),
        Err(TryLockError::WouldBlock) => Err(QuizError::Conflict(format!(
            "session {id} is being updated by another request"
        ))),
    }
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}
