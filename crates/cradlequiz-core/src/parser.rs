//! TOML corpus loader.
//!
//! Loads corpora from TOML files and directories, and lints them for
//! authoring mistakes that do not block loading.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{CategoryDef, Corpus, QuestionRecord};

/// Intermediate TOML structure for corpus files.
#[derive(Debug, Deserialize)]
struct TomlCorpusFile {
    #[serde(default)]
    corpus: TomlCorpusHeader,
    #[serde(default)]
    categories: Vec<CategoryDef>,
    #[serde(default)]
    questions: Vec<QuestionRecord>,
}

#[derive(Debug, Deserialize)]
struct TomlCorpusHeader {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default = "default_version")]
    version: String,
}

fn default_version() -> String {
    "1".to_string()
}

impl Default for TomlCorpusHeader {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            version: default_version(),
        }
    }
}

/// Parse a single TOML file into a `Corpus`.
pub fn parse_corpus(path: &Path) -> Result<Corpus> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file: {}", path.display()))?;

    parse_corpus_str(&content, path)
}

/// Parse a TOML string into a `Corpus`.
pub fn parse_corpus_str(content: &str, source_path: &Path) -> Result<Corpus> {
    let parsed: TomlCorpusFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    // A file without a header is named after itself.
    let id = if parsed.corpus.id.is_empty() {
        source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        parsed.corpus.id
    };

    Ok(Corpus {
        name: if parsed.corpus.name.is_empty() {
            id.clone()
        } else {
            parsed.corpus.name
        },
        id,
        version: parsed.corpus.version,
        categories: parsed.categories,
        questions: parsed.questions,
    })
}

/// Recursively load all `.toml` corpus files from a directory.
///
/// Any unreadable or malformed file fails the whole load; every broken
/// file is named in the error. Files are visited in path order so merged
/// corpora are stable across runs.
pub fn load_corpus_directory(dir: &Path) -> Result<Vec<Corpus>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut corpora = Vec::new();
    let mut failures = Vec::new();
    collect_corpus_files(dir, &mut corpora, &mut failures)?;

    if !failures.is_empty() {
        for failure in &failures {
            tracing::error!("{failure}");
        }
        anyhow::bail!(
            "{} corpus file(s) in {} failed to load:\n  {}",
            failures.len(),
            dir.display(),
            failures.join("\n  ")
        );
    }

    Ok(corpora)
}

fn collect_corpus_files(
    dir: &Path,
    corpora: &mut Vec<Corpus>,
    failures: &mut Vec<String>,
) -> Result<()> {
    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            collect_corpus_files(&path, corpora, failures)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_corpus(&path) {
                Ok(corpus) => corpora.push(corpus),
                Err(e) => failures.push(format!("{e:#}")),
            }
        }
    }
    Ok(())
}

/// Load a corpus from a file, or merge every corpus file under a directory.
pub fn load_corpus(path: &Path) -> Result<Corpus> {
    if !path.is_dir() {
        return parse_corpus(path);
    }

    let corpora = load_corpus_directory(path)?;
    if corpora.is_empty() {
        anyhow::bail!("no corpus files found in {}", path.display());
    }
    Ok(merge_corpora(corpora))
}

/// Combine several corpus files into one.
///
/// Categories are merged by key (first declaration wins); questions are
/// concatenated, so duplicate ids across files still fail validation.
pub fn merge_corpora(corpora: Vec<Corpus>) -> Corpus {
    let mut iter = corpora.into_iter();
    let Some(mut merged) = iter.next() else {
        return Corpus::default();
    };

    let mut known: HashSet<String> = merged.categories.iter().map(|c| c.key.clone()).collect();
    for corpus in iter {
        for category in corpus.categories {
            if known.insert(category.key.clone()) {
                merged.categories.push(category);
            }
        }
        merged.questions.extend(corpus.questions);
    }
    merged
}

/// A non-fatal finding from corpus linting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    pub message: String,
}

/// Lint a corpus for issues that do not prevent loading.
pub fn lint_corpus(corpus: &Corpus) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for q in &corpus.questions {
        if q.explanation.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "explanation is empty".into(),
            });
        }

        let mut seen = HashSet::new();
        if q.options.iter().any(|o| !seen.insert(o.trim())) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "options contain duplicate text".into(),
            });
        }
    }

    // Categories nobody tags
    let mut usage: BTreeMap<&str, usize> = corpus
        .categories
        .iter()
        .map(|c| (c.key.as_str(), 0))
        .collect();
    for tag in corpus.questions.iter().flat_map(|q| &q.tags) {
        if let Some(n) = usage.get_mut(tag.as_str()) {
            *n += 1;
        }
    }
    for (key, _) in usage.iter().filter(|(_, n)| **n == 0) {
        warnings.push(ValidationWarning {
            question_id: None,
            message: format!("category '{key}' has no questions"),
        });
    }

    // Same question text under different ids
    let mut by_text: HashMap<String, &str> = HashMap::new();
    for q in &corpus.questions {
        let normalized = q.text.trim().to_lowercase();
        match by_text.get(&normalized) {
            Some(first) if *first != q.id => warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("question text duplicates '{first}'"),
            }),
            Some(_) => {}
            None => {
                by_text.insert(normalized, &q.id);
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[corpus]
id = "newborn-care"
name = "Newborn Care Trivia"
version = "3"

[[categories]]
key = "newborn"
name = "Newborn Essentials"

[[categories]]
key = "sleep"
name = "Sleep & Soothing"

[[questions]]
id = "nb-001"
text = "How many wet diapers a day suggest a newborn is feeding well after day five?"
options = ["1-2", "6 or more", "Exactly 3", "None"]
correct_index = 1
explanation = "Six or more wet diapers a day is a common sign of adequate intake."
difficulty = "easy"
tags = ["newborn"]

[[questions]]
id = "sl-001"
text = "What sleep position is recommended for infants?"
options = ["On the back", "On the side", "On the stomach"]
correct_index = 0
explanation = "Back to sleep, for every sleep."
difficulty = "medium"
tags = ["sleep", "newborn"]
"#;

    #[test]
    fn parse_valid_toml() {
        let corpus = parse_corpus_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(corpus.id, "newborn-care");
        assert_eq!(corpus.version, "3");
        assert_eq!(corpus.categories.len(), 2);
        assert_eq!(corpus.questions.len(), 2);
        assert_eq!(corpus.questions[1].difficulty, Difficulty::Medium);
        assert_eq!(corpus.questions[1].tags, vec!["sleep", "newborn"]);
    }

    #[test]
    fn parse_missing_header_uses_file_stem() {
        let toml = r#"
[[categories]]
key = "feeding"
name = "Feeding"
"#;
        let corpus = parse_corpus_str(toml, &PathBuf::from("corpus/feeding.toml")).unwrap();
        assert_eq!(corpus.id, "feeding");
        assert_eq!(corpus.name, "feeding");
        assert_eq!(corpus.version, "1");
        assert!(corpus.questions.is_empty());
    }

    #[test]
    fn parse_unknown_difficulty_fails() {
        let toml = r#"
[[questions]]
id = "q"
text = "?"
options = ["a", "b"]
correct_index = 0
difficulty = "extreme"
"#;
        assert!(parse_corpus_str(toml, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_corpus_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn lint_clean_corpus_has_no_warnings() {
        let corpus = parse_corpus_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert!(lint_corpus(&corpus).is_empty());
    }

    #[test]
    fn lint_flags_authoring_mistakes() {
        let toml = r#"
[[categories]]
key = "newborn"
name = "Newborn"

[[categories]]
key = "bathing"
name = "Bathing"

[[questions]]
id = "a"
text = "Same question?"
options = ["yes", "yes", "no"]
correct_index = 2
difficulty = "easy"
tags = ["newborn"]

[[questions]]
id = "b"
text = "same question? "
options = ["x", "y"]
correct_index = 0
explanation = "Because."
difficulty = "hard"
tags = ["newborn"]
"#;
        let corpus = parse_corpus_str(toml, &PathBuf::from("lint.toml")).unwrap();
        let warnings = lint_corpus(&corpus);
        let messages: Vec<_> = warnings.iter().map(|w| w.message.as_str()).collect();

        assert!(messages.contains(&"explanation is empty"));
        assert!(messages.contains(&"options contain duplicate text"));
        assert!(messages.contains(&"category 'bathing' has no questions"));
        assert!(warnings
            .iter()
            .any(|w| w.question_id.as_deref() == Some("b") && w.message.contains("duplicates 'a'")));
        assert_eq!(warnings.len(), 4);
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let corpora = load_corpus_directory(dir.path()).unwrap();
        assert_eq!(corpora.len(), 1);
        assert_eq!(corpora[0].id, "newborn-care");
    }

    #[test]
    fn load_directory_with_one_bad_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), VALID_TOML).unwrap();
        std::fs::write(
            dir.path().join("b.toml"),
            r#"
[[categories]]
key = "bathing"
name = "Bathing"

[[questions]]
id = "bt-001"
text = "How warm should bath water be?"
options = ["About 37-38 C", "Hot to the touch"]
correct_index = 0
difficulty = "extreme"
tags = ["bathing"]
"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.toml"), "[[questions]\n").unwrap();

        let err = load_corpus(dir.path()).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("2 corpus file(s)"), "{message}");
        assert!(message.contains("b.toml"), "{message}");
        assert!(message.contains("c.toml"), "{message}");
        assert!(load_corpus_directory(dir.path()).is_err());
    }

    #[test]
    fn load_directory_merges_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), VALID_TOML).unwrap();
        std::fs::create_dir(dir.path().join("extra")).unwrap();
        std::fs::write(
            dir.path().join("extra").join("feeding.toml"),
            r#"
[[categories]]
key = "newborn"
name = "Duplicate declaration"

[[categories]]
key = "feeding"
name = "Feeding"

[[questions]]
id = "fd-001"
text = "How often do newborns typically feed?"
options = ["Every 2-3 hours", "Twice a day"]
correct_index = 0
explanation = "Roughly 8 to 12 feeds a day."
difficulty = "easy"
tags = ["feeding"]
"#,
        )
        .unwrap();

        let corpus = load_corpus(dir.path()).unwrap();
        assert_eq!(corpus.id, "newborn-care");
        let keys: Vec<_> = corpus.categories.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["newborn", "sleep", "feeding"]);
        assert_eq!(corpus.categories[0].name, "Newborn Essentials");
        assert_eq!(corpus.questions.len(), 3);
    }

    #[test]
    fn load_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_corpus(dir.path()).is_err());
    }
}
