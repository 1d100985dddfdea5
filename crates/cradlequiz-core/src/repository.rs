//! Immutable question repository.
//!
//! Built once from a [`Corpus`]; validation is all-or-nothing, so a
//! repository that exists always satisfies every corpus invariant.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::error::{QuizError, QuizResult, ValidationIssue};
use crate::model::{Category, CategoryKey, Corpus, Difficulty, Question, QuestionId};

/// Read-only index over a validated corpus.
#[derive(Debug)]
pub struct QuestionRepository {
    corpus_id: String,
    corpus_version: String,
    categories: BTreeMap<CategoryKey, Category>,
    questions: HashMap<QuestionId, Question>,
    all_ids: BTreeSet<QuestionId>,
    by_category: HashMap<CategoryKey, BTreeSet<QuestionId>>,
}

/// Question counts for a loaded corpus.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub total: usize,
    pub per_category: BTreeMap<String, usize>,
    pub per_difficulty: BTreeMap<Difficulty, usize>,
}

impl QuestionRepository {
    /// Validate the corpus and build the category index.
    ///
    /// Collects every issue before failing so authors see the full list.
    pub fn build(corpus: Corpus) -> QuizResult<Self> {
        let mut issues = Vec::new();

        let mut categories = BTreeMap::new();
        if corpus.categories.is_empty() {
            issues.push(ValidationIssue::corpus("no categories declared"));
        }
        for def in &corpus.categories {
            let key = def.key.trim();
            if key.is_empty() {
                issues.push(ValidationIssue::corpus("category with empty key"));
                continue;
            }
            if def.name.trim().is_empty() {
                issues.push(ValidationIssue::corpus(format!(
                    "category '{key}' has an empty display name"
                )));
            }
            let key = CategoryKey::new(key);
            if categories.contains_key(&key) {
                issues.push(ValidationIssue::corpus(format!(
                    "duplicate category key: {key}"
                )));
                continue;
            }
            categories.insert(
                key.clone(),
                Category {
                    key,
                    name: def.name.clone(),
                },
            );
        }

        let mut questions = HashMap::with_capacity(corpus.questions.len());
        let mut by_category: HashMap<CategoryKey, BTreeSet<QuestionId>> = HashMap::new();
        let mut seen_ids = HashSet::new();

        for record in corpus.questions {
            let id = record.id.trim().to_string();
            if id.is_empty() {
                issues.push(ValidationIssue::corpus("question with empty id"));
                continue;
            }
            let before = issues.len();

            if record.text.trim().is_empty() {
                issues.push(ValidationIssue::question(&id, "question text is empty"));
            }
            if record.options.len() < 2 {
                issues.push(ValidationIssue::question(
                    &id,
                    format!("needs at least 2 options, has {}", record.options.len()),
                ));
            }
            if record.correct_index >= record.options.len() {
                issues.push(ValidationIssue::question(
                    &id,
                    format!(
                        "correct_index {} is out of range for {} options",
                        record.correct_index,
                        record.options.len()
                    ),
                ));
            }
            if record.tags.is_empty() {
                issues.push(ValidationIssue::question(&id, "has no category tags"));
            }

            let mut tags = BTreeSet::new();
            for tag in &record.tags {
                match categories.get_key_value(tag.trim()) {
                    Some((key, _)) => {
                        tags.insert(key.clone());
                    }
                    None => issues.push(ValidationIssue::question(
                        &id,
                        format!("unknown category tag: {tag}"),
                    )),
                }
            }

            let qid = QuestionId::new(id.as_str());
            if !seen_ids.insert(qid.clone()) {
                issues.push(ValidationIssue::question(&id, "duplicate question id"));
                continue;
            }
            if issues.len() > before {
                continue;
            }

            for key in &tags {
                by_category.entry(key.clone()).or_default().insert(qid.clone());
            }
            questions.insert(
                qid.clone(),
                Question {
                    id: qid,
                    text: record.text,
                    options: record.options,
                    correct_index: record.correct_index,
                    explanation: record.explanation,
                    difficulty: record.difficulty,
                    tags,
                },
            );
        }

        if !issues.is_empty() {
            tracing::error!(
                corpus = %corpus.id,
                issues = issues.len(),
                "corpus rejected at load"
            );
            return Err(QuizError::Validation(issues));
        }

        let all_ids = questions.keys().cloned().collect();
        tracing::info!(
            corpus = %corpus.id,
            version = %corpus.version,
            questions = questions.len(),
            categories = categories.len(),
            "question repository ready"
        );

        Ok(Self {
            corpus_id: corpus.id,
            corpus_version: corpus.version,
            categories,
            questions,
            all_ids,
            by_category,
        })
    }

    pub fn corpus_id(&self) -> &str {
        &self.corpus_id
    }

    pub fn corpus_version(&self) -> &str {
        &self.corpus_version
    }

    /// Look up a question by id.
    pub fn get(&self, id: &str) -> QuizResult<&Question> {
        self.questions
            .get(id)
            .ok_or_else(|| QuizError::NotFound(format!("question '{id}'")))
    }

    /// Ids tagged with the given category (empty if none are).
    pub fn ids_for_category(&self, key: &CategoryKey) -> &BTreeSet<QuestionId> {
        static EMPTY: BTreeSet<QuestionId> = BTreeSet::new();
        self.by_category.get(key).unwrap_or(&EMPTY)
    }

    /// Every question id in the corpus.
    pub fn all_ids(&self) -> &BTreeSet<QuestionId> {
        &self.all_ids
    }

    /// Resolve a raw key against the category catalog.
    pub fn resolve_category(&self, key: &str) -> QuizResult<&CategoryKey> {
        self.categories
            .get_key_value(key.trim())
            .map(|(k, _)| k)
            .ok_or_else(|| QuizError::Configuration(format!("unknown category: {key}")))
    }

    pub fn category(&self, key: &CategoryKey) -> Option<&Category> {
        self.categories.get(key)
    }

    /// Categories in key order.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn stats(&self) -> CorpusStats {
        let per_category = self
            .categories
            .keys()
            .map(|k| (k.to_string(), self.ids_for_category(k).len()))
            .collect();
        let mut per_difficulty = BTreeMap::new();
        for q in self.questions.values() {
            *per_difficulty.entry(q.difficulty).or_insert(0) += 1;
        }
        CorpusStats {
            total: self.questions.len(),
            per_category,
            per_difficulty,
        }
    }
}
