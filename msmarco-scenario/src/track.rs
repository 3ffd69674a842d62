use std::{fmt, str::FromStr};

use clap::ValueEnum;
use common::error::AppError;
use serde::Serialize;

use crate::types::Relevance;

pub const MSMARCO_URL: &str = "https://msmarco.blob.core.windows.net/msmarcoranking";
pub const TREC_QRELS_URL: &str = "https://trec.nist.gov/data/deep/2019qrels-pass.txt";
const CODALAB_URL: &str = "https://worksheets.codalab.org/rest/bundles";
const CODALAB_DEV_BUNDLE: &str = "0x004852a9a16d4a99851b6151a1972d36";
const CODALAB_TRAIN_BUNDLE: &str = "0x499c07699f3f4881a787b6a5249f4466";

pub const TOPK_DEV_FILE_NAME: &str = "top1000_bm25.dev.tsv";
pub const TOPK_TRAIN_FILE_NAME: &str = "top20_bm25.train.tsv";

pub fn codalab_dev_url() -> String {
    format!("{CODALAB_URL}/{CODALAB_DEV_BUNDLE}/contents/blob/")
}

pub fn codalab_train_url() -> String {
    format!("{CODALAB_URL}/{CODALAB_TRAIN_BUNDLE}/contents/blob/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[value(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Passage,
}

impl TaskKind {
    pub const ALL: [TaskKind; 1] = [TaskKind::Passage];

    pub fn id(self) -> &'static str {
        match self {
            Self::Passage => "passage",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TaskKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "passage" => Ok(Self::Passage),
            other => Err(AppError::Validation(format!(
                "unsupported task '{other}'. Expected one of: passage."
            ))),
        }
    }
}

/// Evaluation track. The track decides which validation queries and qrels are
/// used and how relevance scores are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[value(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    #[default]
    Regular,
    Trec,
}

impl TrackKind {
    pub const ALL: [TrackKind; 2] = [TrackKind::Regular, TrackKind::Trec];

    pub fn id(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Trec => "trec",
        }
    }

    /// Relevance values that count as a gold match. Regular qrels only ever
    /// carry `1`; TREC grades 0-3 and treats 1 as a weak match.
    pub fn gold_relations(self) -> &'static [Relevance] {
        match self {
            Self::Regular => &[1],
            Self::Trec => &[2, 3],
        }
    }

    pub fn is_gold(self, relevance: Relevance) -> bool {
        self.gold_relations().contains(&relevance)
    }

    /// Size of the validation query pool for the track.
    pub fn max_eval_queries(self) -> usize {
        match self {
            Self::Regular => 6980,
            Self::Trec => 200,
        }
    }

    /// Upper bound on gold passages included per validation query.
    pub fn max_extra_gold_instances(self) -> usize {
        match self {
            Self::Regular => 2,
            Self::Trec => 5,
        }
    }

    pub fn qrels_delimiter(self) -> char {
        match self {
            Self::Regular => '\t',
            Self::Trec => ' ',
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TrackKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regular" => Ok(Self::Regular),
            "trec" => Ok(Self::Trec),
            other => Err(AppError::Validation(format!(
                "unsupported track '{other}'. Expected one of: regular, trec."
            ))),
        }
    }
}
