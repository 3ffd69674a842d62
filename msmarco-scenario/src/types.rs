use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer id shared by queries and passages in the source files.
pub type RecordId = i64;
pub type QueryId = RecordId;
pub type PassageId = RecordId;
pub type Relevance = i32;
pub type Rank = u32;

pub const CORRECT_TAG: &str = "correct";
pub const YES_ANSWER: &str = "Yes";
pub const NO_ANSWER: &str = "No";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Valid,
}

impl Split {
    /// Order in which splits are materialized.
    pub const ALL: [Split; 2] = [Split::Valid, Split::Train];

    pub fn id(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Valid => "valid",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub output: String,
    pub tags: Vec<String>,
}

impl Reference {
    pub fn new(output: &str, correct: bool) -> Self {
        let tags = if correct {
            vec![CORRECT_TAG.to_string()]
        } else {
            Vec::new()
        };
        Self {
            output: output.to_string(),
            tags,
        }
    }

    pub fn is_correct(&self) -> bool {
        self.tags.iter().any(|tag| tag == CORRECT_TAG)
    }
}

/// A (query, passage) pair the selector decided to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub query_id: QueryId,
    pub passage_id: PassageId,
    pub relevance: Option<Relevance>,
    pub rank: Option<Rank>,
}

/// One yes/no classification instance handed to the evaluation harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub input: String,
    /// Always `[Yes, No]`, exactly one of them tagged correct.
    pub references: [Reference; 2],
    pub split: Split,
    pub query_id: QueryId,
    pub passage_id: PassageId,
    pub relevance: Option<Relevance>,
    pub rank: Option<Rank>,
}

impl Instance {
    pub fn correct_reference(&self) -> Option<&Reference> {
        self.references.iter().find(|reference| reference.is_correct())
    }

    /// Whether the correct answer for this instance is "Yes".
    pub fn is_positive(&self) -> bool {
        self.correct_reference()
            .is_some_and(|reference| reference.output == YES_ANSWER)
    }
}
