//! The `cradlequiz validate` command.

use std::path::PathBuf;

use anyhow::Result;

use cradlequiz_core::parser::{lint_corpus, load_corpus};
use cradlequiz_core::{QuestionRepository, QuizError};

pub fn execute(corpus_path: PathBuf) -> Result<()> {
    let corpus = load_corpus(&corpus_path)?;

    println!(
        "Corpus: {} (v{}, {} categories, {} questions)",
        corpus.name,
        corpus.version,
        corpus.categories.len(),
        corpus.questions.len()
    );

    let warnings = lint_corpus(&corpus);
    for w in &warnings {
        let prefix = w
            .question_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    let repo = match QuestionRepository::build(corpus) {
        Ok(repo) => repo,
        Err(QuizError::Validation(issues)) => {
            for issue in &issues {
                println!("  ERROR: {issue}");
            }
            anyhow::bail!("corpus is invalid: {} error(s)", issues.len());
        }
        Err(e) => return Err(e.into()),
    };

    let stats = repo.stats();
    let per_difficulty: Vec<String> = stats
        .per_difficulty
        .iter()
        .map(|(level, n)| format!("{level}: {n}"))
        .collect();
    println!("Difficulty: {}", per_difficulty.join(", "));

    if warnings.is_empty() {
        println!("Corpus valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
