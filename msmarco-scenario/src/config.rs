use std::ops::Range;

use common::error::AppError;
use serde::Serialize;

use crate::{
    track::{TaskKind, TrackKind},
    types::{Rank, Split},
};

pub const DEFAULT_SEED: u64 = 1885;
pub const DEFAULT_NUM_EVAL_QUERIES: usize = 100;
pub const DEFAULT_NUM_TRAIN_QUERIES: usize = 1000;
pub const DEFAULT_TOPK: Rank = 30;

/// Size of the MS MARCO train query set.
pub const MAX_NUM_TRAIN_QUERIES: usize = 808_731;

/// The dev top-k file only holds 1000 passages per query.
pub const MAX_TOPK: Rank = 1000;
/// MRR@10 needs at least nine negatives next to up to two golds.
pub const MIN_TOPK: Rank = 11;

/// Train negatives are drawn from ranks `[11, 20)` so they are not near
/// duplicates of the gold passage.
pub const TRAIN_MIN_NO_INSTANCE_RANK: Rank = 11;
pub const TRAIN_MAX_NO_INSTANCE_RANK: Rank = 20;

/// Validated scenario parameters. Construction fails before any download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioConfig {
    task: TaskKind,
    track: TrackKind,
    num_eval_queries: usize,
    num_train_queries: usize,
    topk: Rank,
    seed: u64,
}

impl ScenarioConfig {
    pub fn new(
        task: TaskKind,
        track: TrackKind,
        num_eval_queries: usize,
        num_train_queries: usize,
        topk: Rank,
    ) -> Result<Self, AppError> {
        let max_eval = track.max_eval_queries();
        if num_eval_queries > max_eval {
            return Err(AppError::Validation(format!(
                "number of evaluation queries for the {track} track should not be bigger than {max_eval} (got {num_eval_queries})"
            )));
        }

        if !(MIN_TOPK..=MAX_TOPK).contains(&topk) {
            return Err(AppError::Validation(format!(
                "number of passages ranked should be between {MIN_TOPK} and {MAX_TOPK} (both inclusive), got {topk}"
            )));
        }

        if num_train_queries > MAX_NUM_TRAIN_QUERIES {
            return Err(AppError::Validation(format!(
                "number of train queries should not be bigger than {MAX_NUM_TRAIN_QUERIES} (got {num_train_queries})"
            )));
        }

        Ok(Self {
            task,
            track,
            num_eval_queries,
            num_train_queries,
            topk,
            seed: DEFAULT_SEED,
        })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    pub fn track(&self) -> TrackKind {
        self.track
    }

    pub fn num_eval_queries(&self) -> usize {
        self.num_eval_queries
    }

    pub fn num_train_queries(&self) -> usize {
        self.num_train_queries
    }

    pub fn topk(&self) -> Rank {
        self.topk
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn num_queries(&self, split: Split) -> usize {
        match split {
            Split::Valid => self.num_eval_queries,
            Split::Train => self.num_train_queries,
        }
    }

    /// Ranks walked over each query's top-k list when collecting candidates.
    pub fn candidate_ranks(&self, split: Split) -> Range<Rank> {
        let end = self.topk.saturating_add(1);
        match split {
            Split::Valid => 1..end,
            Split::Train => TRAIN_MIN_NO_INSTANCE_RANK..end.min(TRAIN_MAX_NO_INSTANCE_RANK),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            task: TaskKind::Passage,
            track: TrackKind::Regular,
            num_eval_queries: DEFAULT_NUM_EVAL_QUERIES,
            num_train_queries: DEFAULT_NUM_TRAIN_QUERIES,
            topk: DEFAULT_TOPK,
            seed: DEFAULT_SEED,
        }
    }
}
