//! Subcommand implementations and the selection flags they share.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use cradlequiz_core::config::{load_config_from, QuizConfig};
use cradlequiz_core::{parser, DifficultyMix, MatchMode, QuestionRepository, QuizEngine, QuizRequest};

pub mod categories;
pub mod init;
pub mod play;
pub mod sample;
pub mod validate;

/// Flags that pick a corpus and describe which questions to draw.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectionArgs {
    /// Path to corpus file or directory (default: from config)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Categories to draw from, comma-separated (default: all)
    #[arg(long)]
    pub categories: Option<String>,

    /// How categories match question tags: any or all
    #[arg(long)]
    pub mode: Option<MatchMode>,

    /// Number of questions
    #[arg(long)]
    pub count: Option<usize>,

    /// Difficulty mix, e.g. "easy=0.5,medium=0.3,hard=0.2"
    #[arg(long)]
    pub mix: Option<String>,

    /// Seed for a reproducible draw
    #[arg(long)]
    pub seed: Option<u64>,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl SelectionArgs {
    /// Merge flags over config defaults into a quiz request.
    pub fn request(&self, config: &QuizConfig) -> Result<QuizRequest> {
        let categories: Vec<String> = self
            .categories
            .as_deref()
            .map(split_list)
            .unwrap_or_default();

        let mut request = QuizRequest::new(self.count.unwrap_or(config.default_count))
            .with_categories(categories)
            .with_match_mode(self.mode.unwrap_or(config.default_match_mode));

        let mix = match &self.mix {
            Some(raw) => Some(
                raw.parse::<DifficultyMix>()
                    .with_context(|| format!("invalid --mix '{raw}'"))?,
            ),
            None => config.default_mix,
        };
        if let Some(mix) = mix {
            request = request.with_mix(mix);
        }
        Ok(request)
    }
}

/// Load config, corpus and engine for a selection.
pub fn open_engine(selection: &SelectionArgs) -> Result<(QuizConfig, QuizEngine)> {
    let config = load_config_from(selection.config.as_deref())?;
    let corpus_path = selection.corpus.clone().unwrap_or_else(|| config.corpus.clone());
    tracing::debug!(corpus = %corpus_path.display(), "opening corpus");
    let repo = open_repository(&corpus_path)?;
    let engine = match selection.seed.or(config.seed) {
        Some(seed) => QuizEngine::seeded(repo.into(), seed),
        None => QuizEngine::new(repo.into()),
    };
    Ok((config, engine))
}

/// Load and validate a corpus file or directory.
pub fn open_repository(path: &Path) -> Result<QuestionRepository> {
    let corpus = parser::load_corpus(path)?;
    QuestionRepository::build(corpus)
        .with_context(|| format!("failed to load corpus: {}", path.display()))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
