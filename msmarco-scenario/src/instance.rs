use common::error::AppError;

use crate::{
    provision::PassageDataset,
    track::TrackKind,
    types::{Candidate, Instance, Reference, Split, NO_ANSWER, YES_ANSWER},
};

/// Builds the passage/question context shown to the model.
pub fn make_context(passage: &str, query: &str) -> String {
    let query = query.strip_suffix('?').unwrap_or(query);
    format!("{passage}\nQuestion: Does the passage above answer the question {query}?")
}

/// Turns selected candidates into labeled yes/no instances.
pub struct InstanceAssembler<'a> {
    dataset: &'a PassageDataset,
    track: TrackKind,
}

impl<'a> InstanceAssembler<'a> {
    pub fn new(dataset: &'a PassageDataset, track: TrackKind) -> Self {
        Self { dataset, track }
    }

    /// Unknown ids mean provisioning and selection disagree, so they surface
    /// as an error instead of being skipped.
    pub fn assemble(&self, split: Split, candidate: &Candidate) -> Result<Instance, AppError> {
        let query = self
            .dataset
            .split(split)
            .queries
            .get(&candidate.query_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "{split} query {} has no text",
                    candidate.query_id
                ))
            })?;
        let passage = self
            .dataset
            .collection
            .get(&candidate.passage_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "passage {} is not in the collection",
                    candidate.passage_id
                ))
            })?;

        let is_relevant = candidate
            .relevance
            .is_some_and(|relevance| self.track.is_gold(relevance));

        Ok(Instance {
            input: make_context(passage, query),
            references: [
                Reference::new(YES_ANSWER, is_relevant),
                Reference::new(NO_ANSWER, !is_relevant),
            ],
            split,
            query_id: candidate.query_id,
            passage_id: candidate.passage_id,
            relevance: candidate.relevance,
            rank: candidate.rank,
        })
    }

    pub fn assemble_all(
        &self,
        split: Split,
        candidates: &[Candidate],
    ) -> Result<Vec<Instance>, AppError> {
        candidates
            .iter()
            .map(|candidate| self.assemble(split, candidate))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PassageId, Relevance};

    fn dataset() -> PassageDataset {
        let mut dataset = PassageDataset::default();
        dataset.collection.insert(100, "p".to_string());
        dataset.collection.insert(200, "q".to_string());
        dataset.valid.queries.insert(10, "what is x?".to_string());
        dataset
    }

    fn candidate(passage_id: PassageId, relevance: Option<Relevance>) -> Candidate {
        Candidate {
            query_id: 10,
            passage_id,
            relevance,
            rank: Some(1),
        }
    }

    #[test]
    fn strips_a_single_trailing_question_mark() {
        assert_eq!(
            make_context("p", "what is x?"),
            "p\nQuestion: Does the passage above answer the question what is x?"
        );
        assert_eq!(
            make_context("p", "why??"),
            "p\nQuestion: Does the passage above answer the question why??"
        );
        assert_eq!(
            make_context("p", ""),
            "p\nQuestion: Does the passage above answer the question ?"
        );
    }

    #[test]
    fn gold_relevance_marks_yes_correct() -> Result<(), AppError> {
        let dataset = dataset();
        let assembler = InstanceAssembler::new(&dataset, TrackKind::Regular);

        let instance = assembler.assemble(Split::Valid, &candidate(100, Some(1)))?;

        assert!(instance.references[0].is_correct());
        assert!(!instance.references[1].is_correct());
        assert!(instance.is_positive());
        assert_eq!(instance.rank, Some(1));
        Ok(())
    }

    #[test]
    fn unknown_or_non_gold_relevance_marks_no_correct() -> Result<(), AppError> {
        let dataset = dataset();
        let regular = InstanceAssembler::new(&dataset, TrackKind::Regular);
        let trec = InstanceAssembler::new(&dataset, TrackKind::Trec);

        for instance in [
            regular.assemble(Split::Valid, &candidate(200, None))?,
            trec.assemble(Split::Valid, &candidate(100, Some(1)))?,
        ] {
            let correct: Vec<_> = instance
                .references
                .iter()
                .filter(|reference| reference.is_correct())
                .collect();
            assert_eq!(correct.len(), 1);
            assert_eq!(correct[0].output, NO_ANSWER);
        }
        Ok(())
    }

    #[test]
    fn unknown_ids_are_lookup_errors() {
        let dataset = dataset();
        let assembler = InstanceAssembler::new(&dataset, TrackKind::Regular);

        assert!(matches!(
            assembler.assemble(Split::Valid, &candidate(999, Some(1))),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            assembler.assemble(Split::Train, &candidate(100, Some(1))),
            Err(AppError::NotFound(_))
        ));
    }
}
