//! Core data model types for cradlequiz.
//!
//! [`Corpus`] is the untyped payload handed to the engine at startup. Once a
//! [`QuestionRepository`](crate::repository::QuestionRepository) has validated
//! it, questions are exposed as typed [`Question`] values whose tags are
//! [`CategoryKey`]s that can only come from the loaded category catalog.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{QuizError, QuizResult};

// ---------------------------------------------------------------------------
// Corpus payload
// ---------------------------------------------------------------------------

/// The complete, versioned corpus as handed over by a content loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    /// Corpus identifier (e.g. "newborn-care").
    #[serde(default)]
    pub id: String,
    /// Human-readable corpus name.
    #[serde(default)]
    pub name: String,
    /// Content version string.
    #[serde(default)]
    pub version: String,
    /// The closed category enumeration.
    #[serde(default)]
    pub categories: Vec<CategoryDef>,
    /// All question records.
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
}

/// A category declaration: key plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    pub key: String,
    pub name: String,
}

/// A question as authored, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable unique question identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for QuestionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A category key known to the loaded corpus.
///
/// There is no public constructor: keys are handed out by the repository's
/// category catalog, so holding one proves the category exists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryKey(Arc<str>);

impl CategoryKey {
    pub(crate) fn new(key: &str) -> Self {
        Self(Arc::from(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CategoryKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for CategoryKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A resolved category with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub key: CategoryKey,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// Question difficulty levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "med" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A validated, immutable question.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub tags: BTreeSet<CategoryKey>,
}

impl Question {
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_index
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains(key)
    }
}

// ---------------------------------------------------------------------------
// Quiz requests
// ---------------------------------------------------------------------------

/// How requested categories are matched against a question's tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// At least one tag is among the requested categories.
    #[default]
    Any,
    /// Every requested category is among the question's tags.
    All,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Any => write!(f, "any"),
            MatchMode::All => write!(f, "all"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(MatchMode::Any),
            "all" => Ok(MatchMode::All),
            other => Err(format!("unknown match mode: {other} (expected any|all)")),
        }
    }
}

/// Target proportions of easy/medium/hard questions in a draw.
///
/// Always normalized so the three proportions sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMix", into = "RawMix")]
pub struct DifficultyMix {
    easy: f64,
    medium: f64,
    hard: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawMix {
    #[serde(default)]
    easy: f64,
    #[serde(default)]
    medium: f64,
    #[serde(default)]
    hard: f64,
}

impl TryFrom<RawMix> for DifficultyMix {
    type Error = QuizError;

    fn try_from(raw: RawMix) -> QuizResult<Self> {
        DifficultyMix::new(raw.easy, raw.medium, raw.hard)
    }
}

impl From<DifficultyMix> for RawMix {
    fn from(mix: DifficultyMix) -> Self {
        RawMix {
            easy: mix.easy,
            medium: mix.medium,
            hard: mix.hard,
        }
    }
}

impl DifficultyMix {
    /// Build a mix from raw weights. Weights must be finite and
    /// non-negative, and at least one must be positive.
    pub fn new(easy: f64, medium: f64, hard: f64) -> QuizResult<Self> {
        for (name, w) in [("easy", easy), ("medium", medium), ("hard", hard)] {
            if !w.is_finite() || w < 0.0 {
                return Err(QuizError::Configuration(format!(
                    "difficulty weight for {name} must be a finite non-negative number, got {w}"
                )));
            }
        }
        let total = easy + medium + hard;
        if !total.is_finite() {
            return Err(QuizError::Configuration(format!(
                "difficulty weights are too large to combine: {easy}, {medium}, {hard}"
            )));
        }
        if total <= 0.0 {
            return Err(QuizError::Configuration(
                "difficulty mix must give a positive weight to at least one level".into(),
            ));
        }
        Ok(Self {
            easy: easy / total,
            medium: medium / total,
            hard: hard / total,
        })
    }

    pub fn proportion(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

impl FromStr for DifficultyMix {
    type Err = QuizError;

    /// Parses `easy=0.5,medium=0.3,hard=0.2`. Missing levels weigh zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut weights = [0.0f64; 3];
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (level, weight) = part.split_once('=').ok_or_else(|| {
                QuizError::Configuration(format!("expected level=weight, got '{part}'"))
            })?;
            let level: Difficulty = level.parse().map_err(QuizError::Configuration)?;
            let weight: f64 = weight.trim().parse().map_err(|_| {
                QuizError::Configuration(format!("invalid weight for {level}: '{}'", weight.trim()))
            })?;
            weights[level as usize] = weight;
        }
        DifficultyMix::new(weights[0], weights[1], weights[2])
    }
}

/// What a caller asks for when starting a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizRequest {
    /// Requested category keys; empty means every category.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Number of questions to serve.
    pub count: usize,
    #[serde(default)]
    pub difficulty_mix: Option<DifficultyMix>,
}

impl QuizRequest {
    pub fn new(count: usize) -> Self {
        Self {
            categories: Vec::new(),
            match_mode: MatchMode::Any,
            count,
            difficulty_mix: None,
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_mix(mut self, mix: DifficultyMix) -> Self {
        self.difficulty_mix = Some(mix);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(Difficulty::Medium.to_string(), "medium");
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!("med".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn match_mode_defaults_to_any() {
        assert_eq!(MatchMode::default(), MatchMode::Any);
        assert_eq!("ALL".parse::<MatchMode>().unwrap(), MatchMode::All);
        assert!("some".parse::<MatchMode>().is_err());
    }

    #[test]
    fn mix_is_normalized() {
        let mix = DifficultyMix::new(5.0, 3.0, 2.0).unwrap();
        assert!((mix.proportion(Difficulty::Easy) - 0.5).abs() < 1e-9);
        assert!((mix.proportion(Difficulty::Medium) - 0.3).abs() < 1e-9);
        assert!((mix.proportion(Difficulty::Hard) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn mix_rejects_bad_weights() {
        assert!(DifficultyMix::new(0.0, 0.0, 0.0).is_err());
        assert!(DifficultyMix::new(-1.0, 1.0, 0.0).is_err());
        assert!(DifficultyMix::new(f64::NAN, 1.0, 0.0).is_err());
    }

    #[test]
    fn mix_rejects_weights_that_overflow_when_summed() {
        assert!(DifficultyMix::new(1e308, 1e308, 0.0).is_err());
        assert!("easy=1e308,medium=1e308".parse::<DifficultyMix>().is_err());

        let large = DifficultyMix::new(1e300, 1e300, 0.0).unwrap();
        assert!((large.proportion(Difficulty::Easy) - 0.5).abs() < 1e-9);
        assert_eq!(large.proportion(Difficulty::Hard), 0.0);
    }

    #[test]
    fn mix_parses_from_cli_form() {
        let mix: DifficultyMix = "easy=.5, medium=.3,hard=.2".parse().unwrap();
        assert!((mix.proportion(Difficulty::Easy) - 0.5).abs() < 1e-9);

        let only_hard: DifficultyMix = "hard=1".parse().unwrap();
        assert_eq!(only_hard.proportion(Difficulty::Easy), 0.0);
        assert_eq!(only_hard.proportion(Difficulty::Hard), 1.0);

        assert!("easy:0.5".parse::<DifficultyMix>().is_err());
        assert!("tricky=0.5".parse::<DifficultyMix>().is_err());
        assert!("easy=lots".parse::<DifficultyMix>().is_err());
    }

    #[test]
    fn mix_deserializes_from_toml_table() {
        #[derive(Deserialize)]
        struct Wrapper {
            mix: DifficultyMix,
        }
        let w: Wrapper = toml::from_str("[mix]\neasy = 2\nhard = 2\n").unwrap();
        assert!((w.mix.proportion(Difficulty::Easy) - 0.5).abs() < 1e-9);
        assert_eq!(w.mix.proportion(Difficulty::Medium), 0.0);

        let bad: Result<Wrapper, _> = toml::from_str("[mix]\neasy = 0\n");
        assert!(bad.is_err());
    }

    #[test]
    fn category_key_serializes_as_plain_string() {
        let category = Category {
            key: CategoryKey::new("sleep"),
            name: "Sleep & Soothing".into(),
        };
        let json = serde_json::to_value(&category).unwrap();
        assert_eq!(json, serde_json::json!({"key": "sleep", "name": "Sleep & Soothing"}));
    }

    #[test]
    fn question_id_borrows_as_str() {
        let mut set = BTreeSet::new();
        set.insert(QuestionId::new("nb-001"));
        assert!(set.contains("nb-001"));
    }
}
