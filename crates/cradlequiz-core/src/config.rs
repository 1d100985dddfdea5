//! Engine configuration (`cradlequiz.toml`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{DifficultyMix, MatchMode};

/// Top-level cradlequiz configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Corpus file or directory.
    #[serde(default = "default_corpus")]
    pub corpus: PathBuf,
    /// Questions per quiz when the caller does not say.
    #[serde(default = "default_count")]
    pub default_count: usize,
    #[serde(default)]
    pub default_match_mode: MatchMode,
    #[serde(default)]
    pub default_mix: Option<DifficultyMix>,
    /// Fixed seed for reproducible draws.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Sessions idle longer than this are evicted.
    #[serde(default = "default_idle_minutes")]
    pub session_idle_minutes: u64,
}

fn default_corpus() -> PathBuf {
    PathBuf::from("./corpus")
}
fn default_count() -> usize {
    10
}
fn default_idle_minutes() -> u64 {
    30
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            corpus: default_corpus(),
            default_count: default_count(),
            default_match_mode: MatchMode::Any,
            default_mix: None,
            seed: None,
            session_idle_minutes: default_idle_minutes(),
        }
    }
}

impl QuizConfig {
    pub fn idle_timeout(&self) -> chrono::Duration {
        i64::try_from(self.session_idle_minutes)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not expanded again.
pub fn resolve_env_vars(s: &str) -> String {
    expand_vars(s, |name| std::env::var(name).ok())
}

fn expand_vars(s: &str, env: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&env(&rest[start + 2..start + end]).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `cradlequiz.toml` in the current directory
/// 2. `~/.config/cradlequiz/config.toml`
///
/// Environment variable overrides: `CRADLEQUIZ_CORPUS`, `CRADLEQUIZ_SEED`.
pub fn load_config() -> Result<QuizConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("cradlequiz.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<QuizConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => QuizConfig::default(),
    };

    apply_env_overrides(config, |name| std::env::var(name).ok())
}

/// Apply `CRADLEQUIZ_*` overrides and expand `${VAR}` in the corpus path.
fn apply_env_overrides(
    mut config: QuizConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<QuizConfig> {
    if let Some(corpus) = env("CRADLEQUIZ_CORPUS") {
        config.corpus = PathBuf::from(corpus);
    }
    if let Some(seed) = env("CRADLEQUIZ_SEED") {
        let seed = seed
            .trim()
            .parse::<u64>()
            .with_context(|| format!("CRADLEQUIZ_SEED is not an unsigned integer: '{seed}'"))?;
        config.seed = Some(seed);
    }

    config.corpus = PathBuf::from(resolve_env_vars(&config.corpus.to_string_lossy()));
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("cradlequiz"))
}
