//! Sampling of (query, passage) pairs per split.
//!
//! Every split draws from its own generator, seeded from the scenario seed and
//! the split id, so a split's output depends only on the seed, the requested
//! query count and the input files.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    marker::PhantomData,
};

use rand::{rngs::StdRng, seq::SliceRandom, RngCore, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{
    config::ScenarioConfig,
    loader::TextById,
    provision::SplitData,
    track::TrackKind,
    types::{Candidate, PassageId, QueryId, Rank, Relevance, Split},
};

/// Counters describing what a selection pass skipped or dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SelectionStats {
    pub queries_selected: usize,
    pub queries_missing_text: usize,
    pub rankings_missing: usize,
    pub ranks_missing: usize,
    pub passages_missing: usize,
    /// Judged gold passages outside the ranked band that the cap left out.
    pub gold_dropped_by_cap: usize,
}

impl SelectionStats {
    fn has_skips(&self) -> bool {
        self.queries_missing_text
            + self.rankings_missing
            + self.ranks_missing
            + self.passages_missing
            > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub candidates: Vec<Candidate>,
    pub stats: SelectionStats,
}

/// Decides which passages become yes/no candidates for each sampled query.
///
/// `R` is the generator type `select` re-seeds for every split. Callers that
/// own their generator pass it to `select_with` instead.
pub struct CandidateSelector<R = StdRng> {
    config: ScenarioConfig,
    rng: PhantomData<fn() -> R>,
}

impl CandidateSelector<StdRng> {
    pub fn new(config: ScenarioConfig) -> Self {
        CandidateSelector::with_generator(config)
    }
}

impl<R: RngCore + SeedableRng> CandidateSelector<R> {
    pub fn with_generator(config: ScenarioConfig) -> Self {
        Self {
            config,
            rng: PhantomData,
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    fn split_rng(&self, split: Split) -> R {
        R::seed_from_u64(mix_seed(split.id(), self.config.seed()))
    }

    /// Produces the candidate list for `split` from the split's seeded
    /// generator. Missing data is logged and skipped; it never aborts the
    /// traversal.
    pub fn select(&self, split: Split, data: &SplitData, collection: &TextById) -> Selection {
        let mut rng = self.split_rng(split);
        self.select_with(split, data, collection, &mut rng)
    }

    /// Same as `select`, drawing every shuffle and choice from `rng`.
    pub fn select_with<G: RngCore>(
        &self,
        split: Split,
        data: &SplitData,
        collection: &TextById,
        rng: &mut G,
    ) -> Selection {
        let mut stats = SelectionStats::default();
        let mut candidates = Vec::new();

        // Shuffle before truncating so that asking for more queries only ever
        // adds queries to the previous selection.
        let mut query_ids: Vec<QueryId> = data.qrels.keys().copied().collect();
        query_ids.shuffle(rng);
        query_ids.truncate(self.config.num_queries(split));
        stats.queries_selected = query_ids.len();

        let no_ranking = BTreeMap::new();
        for query_id in query_ids {
            let Some(judgments) = data.qrels.get(&query_id) else {
                continue;
            };
            if !data.queries.contains_key(&query_id) {
                warn!(%split, query_id, "Skipping query without query text");
                stats.queries_missing_text += 1;
                continue;
            }

            let ranking = data.topk.get(&query_id).unwrap_or_else(|| {
                warn!(%split, query_id, "No top-k ranking for query; using judged passages only");
                stats.rankings_missing += 1;
                &no_ranking
            });

            let gold = sorted_gold_ids(judgments, self.config.track(), rng);
            let walk = self.walk_ranking(split, query_id, ranking, &gold, &mut stats);

            let mut chosen: BTreeSet<PassageId> = BTreeSet::new();
            match split {
                Split::Train => {
                    // One positive and one negative keeps the train split balanced.
                    if let Some(&best) = gold.first() {
                        chosen.insert(best);
                    }
                    if let Some(&negative) = walk.no.choose(rng) {
                        chosen.insert(negative);
                    }
                }
                Split::Valid => {
                    // The cap only limits judged gold pulled in from outside
                    // the ranking; ranked gold is always evaluated.
                    let cap = self.config.track().max_extra_gold_instances();
                    stats.gold_dropped_by_cap += gold
                        .iter()
                        .skip(cap)
                        .filter(|pid| !walk.yes.contains(pid))
                        .count();
                    chosen.extend(gold.iter().copied().take(cap));
                    chosen.extend(walk.yes.iter().copied());
                    chosen.extend(walk.no.iter().copied());
                }
            }

            // Presentation order must not leak the ranking.
            let mut passage_ids: Vec<PassageId> = chosen.into_iter().collect();
            passage_ids.shuffle(rng);

            let ranks = invert_ranking(ranking);
            for passage_id in passage_ids {
                if !collection.contains_key(&passage_id) {
                    warn!(%split, query_id, passage_id, "Skipping passage missing from collection");
                    stats.passages_missing += 1;
                    continue;
                }
                candidates.push(Candidate {
                    query_id,
                    passage_id,
                    relevance: judgments.get(&passage_id).copied(),
                    rank: ranks.get(&passage_id).copied(),
                });
            }
        }

        if stats.has_skips() {
            warn!(
                %split,
                queries_missing_text = stats.queries_missing_text,
                rankings_missing = stats.rankings_missing,
                ranks_missing = stats.ranks_missing,
                passages_missing = stats.passages_missing,
                "Skipped some entries during candidate selection"
            );
        }
        info!(
            %split,
            queries = stats.queries_selected,
            candidates = candidates.len(),
            gold_dropped_by_cap = stats.gold_dropped_by_cap,
            "Selected candidates"
        );

        Selection { candidates, stats }
    }

    fn walk_ranking(
        &self,
        split: Split,
        query_id: QueryId,
        ranking: &BTreeMap<Rank, PassageId>,
        gold: &[PassageId],
        stats: &mut SelectionStats,
    ) -> RankWalk {
        let mut walk = RankWalk::default();
        if ranking.is_empty() {
            return walk;
        }
        for rank in self.config.candidate_ranks(split) {
            match ranking.get(&rank) {
                None => {
                    debug!(%split, query_id, rank, "Passage with this rank is not known");
                    stats.ranks_missing += 1;
                }
                Some(pid) if gold.contains(pid) => walk.yes.push(*pid),
                Some(pid) => walk.no.push(*pid),
            }
        }
        walk
    }
}

/// Passages found while walking a query's ranking, split by gold membership.
#[derive(Debug, Default)]
struct RankWalk {
    yes: Vec<PassageId>,
    no: Vec<PassageId>,
}

/// Gold passage ids ordered by relevance, highest first. Ties are broken by a
/// shuffle before the stable sort.
fn sorted_gold_ids<R: RngCore>(
    judgments: &BTreeMap<PassageId, Relevance>,
    track: TrackKind,
    rng: &mut R,
) -> Vec<PassageId> {
    let mut pairs: Vec<(PassageId, Relevance)> = judgments
        .iter()
        .filter(|(_, relevance)| track.is_gold(**relevance))
        .map(|(pid, relevance)| (*pid, *relevance))
        .collect();
    pairs.shuffle(rng);
    pairs.sort_by(|a, b| b.1.cmp(&a.1));
    pairs.into_iter().map(|(pid, _)| pid).collect()
}

/// `passage id -> rank`, keeping the best rank if a passage repeats.
fn invert_ranking(ranking: &BTreeMap<Rank, PassageId>) -> HashMap<PassageId, Rank> {
    let mut ranks = HashMap::with_capacity(ranking.len());
    for (rank, pid) in ranking {
        ranks.entry(*pid).or_insert(*rank);
    }
    ranks
}

fn mix_seed(split_id: &str, seed: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(split_id.as_bytes());
    hasher.update(seed.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
