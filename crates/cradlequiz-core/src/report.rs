//! Per-session results report with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QuizResult;
use crate::model::{Difficulty, QuestionId, QuizRequest};
use crate::repository::QuestionRepository;
use crate::score::{score_session, SessionResults};
use crate::session::SessionTracker;

/// A saved record of one quiz session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsReport {
    /// Unique report identifier.
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub corpus: CorpusSummary,
    pub request: Option<QuizRequest>,
    /// One entry per served question, in served order.
    pub items: Vec<ItemResult>,
    pub results: SessionResults,
    /// Wall-clock time from session start to the report, in seconds.
    pub duration_secs: i64,
}

/// Which corpus a session was drawn from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub id: String,
    pub version: String,
    pub question_count: usize,
}

/// How one served question went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    pub question_id: QuestionId,
    pub text: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub correct_index: usize,
    /// `None` if the question was left unanswered.
    pub choice: Option<usize>,
    pub correct: Option<bool>,
}

impl ResultsReport {
    /// Build a report from a started session.
    pub fn build(session: &SessionTracker, repo: &QuestionRepository) -> QuizResult<Self> {
        let results = score_session(session, repo)?;

        let items = session
            .served()
            .iter()
            .map(|id| {
                let q = repo.get(id.as_str())?;
                let answer = session.answers().get(id);
                Ok(ItemResult {
                    question_id: q.id.clone(),
                    text: q.text.clone(),
                    difficulty: q.difficulty,
                    tags: q.tags.iter().map(ToString::to_string).collect(),
                    correct_index: q.correct_index,
                    choice: answer.map(|a| a.choice),
                    correct: answer.map(|a| a.correct),
                })
            })
            .collect::<QuizResult<Vec<_>>>()?;

        let created_at = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            created_at,
            corpus: CorpusSummary {
                id: repo.corpus_id().to_string(),
                version: repo.corpus_version().to_string(),
                question_count: repo.len(),
            },
            request: session.request().cloned(),
            items,
            results,
            duration_secs: (created_at - session.created_at()).num_seconds(),
        })
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ResultsReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Questions answered wrongly, with their correct option index.
    pub fn missed(&self) -> impl Iterator<Item = &ItemResult> {
        self.items.iter().filter(|i| i.correct == Some(false))
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let agg = &self.results.aggregate;

        md.push_str(&format!(
            "## Quiz results: {} (v{})\n\n",
            self.corpus.id, self.corpus.version
        ));
        md.push_str(&format!(
            "**Score:** {}/{} answered correctly ({}), {} of {} questions answered\n\n",
            agg.correct,
            agg.answered,
            format_accuracy(agg.accuracy),
            self.results.progress.answered,
            self.results.progress.total,
        ));

        md.push_str("| Category | Correct | Answered | Accuracy |\n");
        md.push_str("|----------|---------|----------|----------|\n");
        for (key, acc) in &self.results.by_category {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                key,
                acc.correct,
                acc.answered,
                format_accuracy(acc.accuracy)
            ));
        }
        md.push('\n');

        md.push_str("| Difficulty | Correct | Answered | Accuracy |\n");
        md.push_str("|------------|---------|----------|----------|\n");
        for (level, acc) in &self.results.by_difficulty {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                level,
                acc.correct,
                acc.answered,
                format_accuracy(acc.accuracy)
            ));
        }

        let missed: Vec<_> = self.missed().collect();
        if !missed.is_empty() {
            md.push_str("\n### Missed\n\n");
            for item in missed {
                md.push_str(&format!("- `{}` {}\n", item.question_id, item.text));
            }
        }

        md
    }
}

/// `"75.0%"`, or `"n/a"` when nothing was answered.
pub fn format_accuracy(accuracy: Option<f64>) -> String {
    match accuracy {
        Some(a) => format!("{:.1}%", a * 100.0),
        None => "n/a".to_string(),
    }
}
