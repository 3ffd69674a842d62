//! Fetches the MS MARCO source files and loads them into per-split records.

use std::path::{Path, PathBuf};

use common::{
    error::AppError,
    utils::fetch::{gunzip_once, FileSource, UnpackFormat},
};
use tracing::info;

use crate::{
    loader::{load_id_text, load_qrels, load_topk, QrelsByQuery, RankingByQuery, TextById},
    track::{
        codalab_dev_url, codalab_train_url, TrackKind, MSMARCO_URL, TOPK_DEV_FILE_NAME,
        TOPK_TRAIN_FILE_NAME, TREC_QRELS_URL,
    },
    types::Split,
};

const COLLECTION_AND_QUERIES: &str = "collectionandqueries";
const TREC_QUERIES_FILE_NAME: &str = "msmarco-test2019-queries.tsv";
const TREC_QRELS_FILE_NAME: &str = "2019qrels-pass.txt";

/// Queries, relevance judgments and top-k rankings for a single split.
#[derive(Debug, Clone, Default)]
pub struct SplitData {
    pub queries: TextById,
    pub qrels: QrelsByQuery,
    pub topk: RankingByQuery,
}

/// Everything the selector and the assembler read from.
#[derive(Debug, Clone, Default)]
pub struct PassageDataset {
    pub collection: TextById,
    pub valid: SplitData,
    pub train: SplitData,
}

impl PassageDataset {
    pub fn split(&self, split: Split) -> &SplitData {
        match split {
            Split::Valid => &self.valid,
            Split::Train => &self.train,
        }
    }
}

/// Resolves the files a track needs and loads them.
pub struct Provisioner<'a, F: FileSource> {
    files: &'a F,
    track: TrackKind,
    include_train: bool,
}

impl<'a, F: FileSource> Provisioner<'a, F> {
    pub fn new(files: &'a F, track: TrackKind) -> Self {
        Self {
            files,
            track,
            include_train: true,
        }
    }

    /// Skip downloading and loading the train split entirely.
    #[must_use]
    pub fn without_train(mut self) -> Self {
        self.include_train = false;
        self
    }

    pub fn prepare(&self) -> Result<PassageDataset, AppError> {
        info!(track = %self.track, "Downloading MSMARCO collection and queries");
        let cq_dir = self.files.ensure_file(
            &format!("{MSMARCO_URL}/{COLLECTION_AND_QUERIES}.tar.gz"),
            COLLECTION_AND_QUERIES,
            Some(UnpackFormat::Untar),
        )?;

        let collection = load_id_text(&cq_dir.join("collection.tsv"))?;
        info!(passages = collection.len(), "Loaded passage collection");

        let (valid_queries, valid_qrels) = self.validation_queries_and_qrels(&cq_dir)?;

        info!("Downloading topk files");
        let valid_topk = load_topk(&self.files.ensure_file(
            &codalab_dev_url(),
            TOPK_DEV_FILE_NAME,
            None,
        )?)?;

        let valid = SplitData {
            queries: valid_queries,
            qrels: valid_qrels,
            topk: valid_topk,
        };

        let train = if self.include_train {
            SplitData {
                queries: load_id_text(&cq_dir.join("queries.train.tsv"))?,
                qrels: load_qrels(&cq_dir.join("qrels.train.tsv"), '\t')?,
                topk: load_topk(&self.files.ensure_file(
                    &codalab_train_url(),
                    TOPK_TRAIN_FILE_NAME,
                    None,
                )?)?,
            }
        } else {
            info!("Skipping train split");
            SplitData::default()
        };

        info!(
            valid_queries = valid.queries.len(),
            valid_qrels = valid.qrels.len(),
            train_queries = train.queries.len(),
            train_qrels = train.qrels.len(),
            "Dataset dictionaries ready"
        );

        Ok(PassageDataset {
            collection,
            valid,
            train,
        })
    }

    fn validation_queries_and_qrels(
        &self,
        cq_dir: &Path,
    ) -> Result<(TextById, QrelsByQuery), AppError> {
        match self.track {
            TrackKind::Regular => Ok((
                load_id_text(&cq_dir.join("queries.dev.small.tsv"))?,
                load_qrels(&cq_dir.join("qrels.dev.small.tsv"), self.track.qrels_delimiter())?,
            )),
            TrackKind::Trec => {
                let queries_path = self.trec_queries_path()?;
                let qrels_path = self
                    .files
                    .ensure_file(TREC_QRELS_URL, TREC_QRELS_FILE_NAME, None)?;
                Ok((
                    load_id_text(&queries_path)?,
                    load_qrels(&qrels_path, self.track.qrels_delimiter())?,
                ))
            }
        }
    }

    /// The TREC queries ship gzipped; a decompressed copy short-circuits the
    /// download on reruns.
    fn trec_queries_path(&self) -> Result<PathBuf, AppError> {
        let decompressed = self.files.root().join(TREC_QUERIES_FILE_NAME);
        if decompressed.exists() {
            return Ok(decompressed);
        }
        let gz_name = format!("{TREC_QUERIES_FILE_NAME}.gz");
        let gz_path = self
            .files
            .ensure_file(&format!("{MSMARCO_URL}/{gz_name}"), &gz_name, None)?;
        gunzip_once(&gz_path)
    }
}
