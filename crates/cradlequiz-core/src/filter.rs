//! Category filtering: requested categories to candidate question ids.

use std::collections::BTreeSet;

use crate::error::QuizResult;
use crate::model::{CategoryKey, MatchMode, QuestionId};
use crate::repository::QuestionRepository;

/// Resolve requested category keys into a candidate id set.
///
/// An empty request selects the whole corpus. Unknown keys fail with
/// [`QuizError::Configuration`](crate::error::QuizError::Configuration)
/// before any ids are collected.
pub fn candidates(
    repo: &QuestionRepository,
    requested: &[String],
    mode: MatchMode,
) -> QuizResult<BTreeSet<QuestionId>> {
    let keys = requested
        .iter()
        .map(|k| repo.resolve_category(k).cloned())
        .collect::<QuizResult<BTreeSet<CategoryKey>>>()?;

    if keys.is_empty() {
        return Ok(repo.all_ids().clone());
    }

    let result: BTreeSet<QuestionId> = match mode {
        MatchMode::Any => keys
            .iter()
            .flat_map(|k| repo.ids_for_category(k).iter().cloned())
            .collect(),
        MatchMode::All => {
            // Start from the smallest bucket and keep ids carrying every key.
            let Some(smallest) = keys.iter().min_by_key(|k| repo.ids_for_category(k).len())
            else {
                return Ok(BTreeSet::new());
            };
            repo.ids_for_category(smallest)
                .iter()
                .filter(|id| {
                    repo.get(id.as_str())
                        .map(|q| keys.iter().all(|k| q.tags.contains(k)))
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        }
    };

    tracing::debug!(
        categories = ?keys.iter().map(CategoryKey::as_str).collect::<Vec<_>>(),
        %mode,
        candidates = result.len(),
        "category filter resolved"
    );
    Ok(result)
}
