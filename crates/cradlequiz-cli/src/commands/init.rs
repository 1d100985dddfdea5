//! The `cradlequiz init` command.

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    if std::path::Path::new("cradlequiz.toml").exists() {
        println!("cradlequiz.toml already exists, skipping.");
    } else {
        std::fs::write("cradlequiz.toml", SAMPLE_CONFIG)
            .context("failed to write cradlequiz.toml")?;
        println!("Created cradlequiz.toml");
    }

    std::fs::create_dir_all("corpus").context("failed to create corpus directory")?;
    let example_path = std::path::Path::new("corpus/example.toml");
    if example_path.exists() {
        println!("corpus/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_CORPUS)
            .context("failed to write corpus/example.toml")?;
        println!("Created corpus/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Add questions to corpus/example.toml");
    println!("  2. Run: cradlequiz validate --corpus corpus");
    println!("  3. Run: cradlequiz play --count 3");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# cradlequiz configuration

# Corpus file, or a directory of corpus files
corpus = "./corpus"

default_count = 3
default_match_mode = "any"
session_idle_minutes = 30

# Fixed seed for reproducible quizzes
# seed = 42

# [default_mix]
# easy = 0.5
# medium = 0.3
# hard = 0.2
"#;

const EXAMPLE_CORPUS: &str = r#"[corpus]
id = "example"
name = "Example Corpus"
version = "1"

[[categories]]
key = "newborn"
name = "Newborn Essentials"

[[categories]]
key = "sleep"
name = "Sleep & Soothing"

[[questions]]
id = "ex-001"
text = "How many hours a day does a newborn typically sleep?"
options = ["4 to 6", "8 to 10", "14 to 17", "20 to 23"]
correct_index = 2
explanation = "Newborns sleep roughly 14 to 17 hours a day, in short stretches."
difficulty = "easy"
tags = ["newborn", "sleep"]

[[questions]]
id = "ex-002"
text = "Where should the umbilical cord stump be kept until it falls off?"
options = ["Clean and dry", "Covered in ointment", "Under a tight bandage"]
correct_index = 0
explanation = "Keeping the stump clean and dry helps it heal and fall off naturally."
difficulty = "medium"
tags = ["newborn"]

[[questions]]
id = "ex-003"
text = "Which sleep surface is safest for an infant?"
options = ["An adult bed with pillows", "A firm, flat crib mattress", "A sofa", "A car seat inside the house"]
correct_index = 1
explanation = "A firm, flat surface with nothing else in the crib lowers the risk of suffocation."
difficulty = "easy"
tags = ["sleep"]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use cradlequiz_core::parser::{lint_corpus, parse_corpus_str};
    use cradlequiz_core::QuestionRepository;

    #[test]
    fn sample_config_parses() {
        let config: cradlequiz_core::config::QuizConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.default_count, 3);
    }

    #[test]
    fn example_corpus_is_valid_and_clean() {
        let corpus = parse_corpus_str(EXAMPLE_CORPUS, "example.toml".as_ref()).unwrap();
        assert!(lint_corpus(&corpus).is_empty());
        let repo = QuestionRepository::build(corpus).unwrap();
        assert_eq!(repo.len(), 3);
    }
}
