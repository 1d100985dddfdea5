//! Non-repeating, optionally difficulty-stratified question sampling.
//!
//! Sampling is a pure function of its inputs and the random source: with a
//! seeded RNG the same candidates always produce the same draw. Failure
//! leaves nothing behind.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{QuizError, QuizResult};
use crate::model::{Difficulty, DifficultyMix, QuestionId};
use crate::repository::QuestionRepository;

/// Draw exactly `count` unique ids from `candidates`, skipping `exclude`.
///
/// Without a mix this is a partial Fisher–Yates shuffle over the pool. With
/// a mix the pool is split into difficulty strata, each stratum receives a
/// share of `count` (see [`allocate`]) and is sampled independently; the
/// combined draw is shuffled so difficulties interleave.
pub fn sample<R: Rng + ?Sized>(
    repo: &QuestionRepository,
    candidates: &BTreeSet<QuestionId>,
    count: usize,
    mix: Option<&DifficultyMix>,
    exclude: &BTreeSet<QuestionId>,
    rng: &mut R,
) -> QuizResult<Vec<QuestionId>> {
    if count == 0 {
        return Err(QuizError::Configuration(
            "question count must be at least 1".into(),
        ));
    }

    let mut pool: Vec<QuestionId> = candidates
        .iter()
        .filter(|id| !exclude.contains(*id))
        .cloned()
        .collect();

    if pool.len() < count {
        return Err(QuizError::InsufficientQuestions {
            requested: count,
            available: pool.len(),
        });
    }

    let Some(mix) = mix else {
        let (picked, _) = pool.partial_shuffle(rng, count);
        let drawn = picked.to_vec();
        tracing::debug!(count, pool = pool.len(), "uniform draw");
        return Ok(drawn);
    };

    let mut strata: [Vec<QuestionId>; 3] = Default::default();
    for id in pool {
        let difficulty = repo.get(id.as_str())?.difficulty;
        strata[difficulty as usize].push(id);
    }
    let available = [strata[0].len(), strata[1].len(), strata[2].len()];
    let plan = allocate(count, mix, available);

    let mut drawn = Vec::with_capacity(count);
    for (stratum, &take) in strata.iter_mut().zip(plan.iter()) {
        let (picked, _) = stratum.partial_shuffle(rng, take);
        drawn.extend_from_slice(picked);
    }
    drawn.shuffle(rng);

    tracing::debug!(
        count,
        easy = plan[0],
        medium = plan[1],
        hard = plan[2],
        "stratified draw"
    );
    Ok(drawn)
}

/// Decide how many questions each difficulty stratum contributes.
///
/// Targets come from `count × proportion` with largest-remainder rounding,
/// so they sum to `count` and each is within one of plain rounding. Targets
/// are then capped at what each stratum holds; any shortfall is handed to
/// the strata with spare questions in proportion to their surplus, repeating
/// until `count` is met or every stratum is exhausted.
///
/// Indices follow [`Difficulty::ALL`].
pub fn allocate(count: usize, mix: &DifficultyMix, available: [usize; 3]) -> [usize; 3] {
    let exact = Difficulty::ALL.map(|d| mix.proportion(d) * count as f64);
    let mut targets = exact.map(|e| e.floor() as usize);

    let assigned: usize = targets.iter().sum();
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    for &i in order.iter().take(count.saturating_sub(assigned)) {
        targets[i] += 1;
    }

    let mut plan = [0usize; 3];
    for i in 0..3 {
        plan[i] = targets[i].min(available[i]);
    }

    loop {
        let deficit = count.saturating_sub(plan.iter().sum());
        if deficit == 0 {
            break;
        }
        let surplus = [0, 1, 2].map(|i| available[i] - plan[i]);
        let total_surplus: usize = surplus.iter().sum();
        if total_surplus == 0 {
            break;
        }

        let mut given = 0;
        for i in 0..3 {
            let share = (deficit * surplus[i] / total_surplus).min(surplus[i]);
            plan[i] += share;
            given += share;
        }
        // Integer division leaves a remainder; hand it out one at a time to
        // whichever stratum has the most left.
        for _ in given..deficit {
            let Some(i) = (0..3)
                .filter(|&i| available[i] > plan[i])
                .max_by(|&a, &b| (available[a] - plan[a]).cmp(&(available[b] - plan[b])).then(b.cmp(&a)))
            else {
                break;
            };
            plan[i] += 1;
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Corpus, QuestionRecord};
    use crate::repository::tests::{categories, record};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// A pool with `per_level` questions at each difficulty, all tagged "newborn".
    fn balanced_repo(per_level: usize) -> QuestionRepository {
        let mut questions: Vec<QuestionRecord> = Vec::new();
        for d in Difficulty::ALL {
            for i in 0..per_level {
                questions.push(record(&format!("{d}-{i:02}"), d, &["newborn"]));
            }
        }
        QuestionRepository::build(Corpus {
            id: "balanced".into(),
            categories: categories(),
            questions,
            ..Default::default()
        })
        .unwrap()
    }

    fn count_by_difficulty(repo: &QuestionRepository, ids: &[QuestionId]) -> [usize; 3] {
        let mut counts = [0; 3];
        for id in ids {
            counts[repo.get(id.as_str()).unwrap().difficulty as usize] += 1;
        }
        counts
    }

    fn mix(e: f64, m: f64, h: f64) -> DifficultyMix {
        DifficultyMix::new(e, m, h).unwrap()
    }

    #[test]
    fn uniform_draw_is_unique_and_sized() {
        let repo = balanced_repo(10);
        let mut rng = StdRng::seed_from_u64(1);
        let drawn = sample(&repo, repo.all_ids(), 12, None, &BTreeSet::new(), &mut rng).unwrap();
        assert_eq!(drawn.len(), 12);
        let unique: BTreeSet<_> = drawn.iter().collect();
        assert_eq!(unique.len(), 12);
        assert!(drawn.iter().all(|id| repo.all_ids().contains(id)));
    }

    #[test]
    fn whole_pool_can_be_drawn() {
        let repo = balanced_repo(2);
        let mut rng = StdRng::seed_from_u64(2);
        let drawn = sample(&repo, repo.all_ids(), 6, None, &BTreeSet::new(), &mut rng).unwrap();
        let unique: BTreeSet<_> = drawn.into_iter().collect();
        assert_eq!(&unique, repo.all_ids());
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let repo = balanced_repo(10);
        let m = mix(0.5, 0.3, 0.2);
        let a = sample(
            &repo,
            repo.all_ids(),
            10,
            Some(&m),
            &BTreeSet::new(),
            &mut StdRng::seed_from_u64(42),
        )
        .unwrap();
        let b = sample(
            &repo,
            repo.all_ids(),
            10,
            Some(&m),
            &BTreeSet::new(),
            &mut StdRng::seed_from_u64(42),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn excluded_ids_are_never_drawn() {
        let repo = balanced_repo(3);
        let exclude: BTreeSet<QuestionId> =
            ["easy-00", "easy-01", "hard-02"].into_iter().map(QuestionId::from).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let drawn = sample(&repo, repo.all_ids(), 6, None, &exclude, &mut rng).unwrap();
        assert!(drawn.iter().all(|id| !exclude.contains(id)));
    }

    #[test]
    fn insufficient_pool_fails_with_counts() {
        let repo = balanced_repo(3);
        let exclude: BTreeSet<QuestionId> = ["easy-00"].into_iter().map(QuestionId::from).collect();
        let mut rng = StdRng::seed_from_u64(4);
        let err = sample(&repo, repo.all_ids(), 9, None, &exclude, &mut rng).unwrap_err();
        assert_eq!(
            err,
            QuizError::InsufficientQuestions {
                requested: 9,
                available: 8
            }
        );
    }

    #[test]
    fn zero_count_is_rejected() {
        let repo = balanced_repo(1);
        let mut rng = StdRng::seed_from_u64(5);
        let err = sample(&repo, repo.all_ids(), 0, None, &BTreeSet::new(), &mut rng).unwrap_err();
        assert!(matches!(err, QuizError::Configuration(_)));
    }

    #[test]
    fn mix_hits_stratum_targets() {
        let repo = balanced_repo(20);
        let m = mix(0.5, 0.3, 0.2);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let drawn =
                sample(&repo, repo.all_ids(), 10, Some(&m), &BTreeSet::new(), &mut rng).unwrap();
            let counts = count_by_difficulty(&repo, &drawn);
            for (got, want) in counts.iter().zip([5usize, 3, 2]) {
                assert!(got.abs_diff(want) <= 1, "seed {seed}: {counts:?}");
            }
            assert_eq!(counts.iter().sum::<usize>(), 10);
        }
    }

    #[test]
    fn allocate_rounds_to_exact_count() {
        let m = mix(1.0, 1.0, 1.0);
        let plan = allocate(10, &m, [10, 10, 10]);
        assert_eq!(plan.iter().sum::<usize>(), 10);
        assert!(plan.iter().all(|&p| p == 3 || p == 4));
    }

    #[test]
    fn allocate_redistributes_short_stratum() {
        // Wants 4 easy, only 2 exist; the deficit goes to the strata with spare.
        let m = mix(1.0, 0.0, 0.0);
        assert_eq!(allocate(4, &m, [2, 5, 1]), [2, 2, 0]);
    }

    #[test]
    fn allocate_redistributes_proportionally_to_surplus() {
        let m = mix(0.5, 0.5, 0.0);
        // Targets [5, 5, 0]; medium has only 1, leaving a deficit of 4 split
        // between easy (surplus 3) and hard (surplus 9).
        let plan = allocate(10, &m, [8, 1, 9]);
        assert_eq!(plan.iter().sum::<usize>(), 10);
        assert_eq!(plan[1], 1);
        assert_eq!(plan, [6, 1, 3]);
    }

    #[test]
    fn allocate_stops_when_exhausted() {
        let m = mix(0.2, 0.3, 0.5);
        assert_eq!(allocate(10, &m, [1, 1, 1]), [1, 1, 1]);
    }

    #[test]
    fn stratified_draw_fills_from_other_levels() {
        let mut corpus_questions = Vec::new();
        for i in 0..2 {
            corpus_questions.push(record(&format!("e{i}"), Difficulty::Easy, &["sleep"]));
        }
        for i in 0..6 {
            corpus_questions.push(record(&format!("m{i}"), Difficulty::Medium, &["sleep"]));
        }
        let repo = QuestionRepository::build(Corpus {
            categories: categories(),
            questions: corpus_questions,
            ..Default::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let drawn = sample(
            &repo,
            repo.all_ids(),
            5,
            Some(&mix(1.0, 0.0, 0.0)),
            &BTreeSet::new(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(count_by_difficulty(&repo, &drawn), [2, 3, 0]);
    }
}
