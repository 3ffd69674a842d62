use std::{
    collections::BTreeSet,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use common::{
    error::AppError,
    utils::fetch::{FileSource, UnpackFormat},
};
use msmarco_scenario::{
    config::ScenarioConfig,
    track::{TOPK_DEV_FILE_NAME, TOPK_TRAIN_FILE_NAME},
    Instance, PassageScenario, Split, TaskKind, TrackKind,
};
use tempfile::{tempdir, TempDir};

/// A pre-populated data directory standing in for the remote sources.
struct FixtureFiles {
    dir: TempDir,
}

impl FileSource for FixtureFiles {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn ensure_file(
        &self,
        _url: &str,
        name: &str,
        _unpack: Option<UnpackFormat>,
    ) -> Result<PathBuf, AppError> {
        let path = self.dir.path().join(name);
        if path.exists() {
            Ok(path)
        } else {
            Err(AppError::NotFound(format!("fixture has no {name}")))
        }
    }
}

#[derive(Default)]
struct Fixture {
    collection: String,
    dev_queries: String,
    dev_qrels: String,
    dev_topk: String,
    train_queries: String,
    train_qrels: String,
    train_topk: String,
}

impl Fixture {
    fn write(self) -> Result<FixtureFiles> {
        let dir = tempdir()?;
        let cq = dir.path().join("collectionandqueries");
        fs::create_dir_all(&cq)?;
        fs::write(cq.join("collection.tsv"), self.collection)?;
        fs::write(cq.join("queries.dev.small.tsv"), self.dev_queries)?;
        fs::write(cq.join("qrels.dev.small.tsv"), self.dev_qrels)?;
        fs::write(cq.join("queries.train.tsv"), self.train_queries)?;
        fs::write(cq.join("qrels.train.tsv"), self.train_qrels)?;
        fs::write(dir.path().join(TOPK_DEV_FILE_NAME), self.dev_topk)?;
        fs::write(dir.path().join(TOPK_TRAIN_FILE_NAME), self.train_topk)?;
        Ok(FixtureFiles { dir })
    }
}

/// 40 judged queries per split, each with 30 ranked passages. Every dev
/// query has three ranked gold passages, one more than the regular cap.
fn larger_fixture() -> Result<FixtureFiles> {
    let mut fixture = Fixture::default();
    for pid in 1..=2000 {
        writeln!(fixture.collection, "{pid}\tpassage number {pid}")?;
    }
    for qid in 1..=40 {
        let dev_qid = 1000 + qid;
        let train_qid = 5000 + qid;
        writeln!(fixture.dev_queries, "{dev_qid}\tdev question {qid}?")?;
        writeln!(fixture.train_queries, "{train_qid}\ttrain question {qid}")?;
        let base = qid * 40;
        writeln!(fixture.dev_qrels, "{dev_qid}\t0\t{}\t1", base + 1)?;
        writeln!(fixture.dev_qrels, "{dev_qid}\t0\t{}\t1", base + 5)?;
        writeln!(fixture.dev_qrels, "{dev_qid}\t0\t{}\t1", base + 9)?;
        writeln!(fixture.train_qrels, "{train_qid}\t0\t{}\t1", base + 2)?;
        for rank in 1..=30 {
            writeln!(fixture.dev_topk, "{dev_qid}\t{}\t{rank}", base + rank)?;
            writeln!(fixture.train_topk, "{train_qid}\t{}\t{rank}", base + rank)?;
        }
    }
    fixture.write()
}

fn config(num_eval: usize, num_train: usize) -> Result<ScenarioConfig> {
    Ok(ScenarioConfig::new(
        TaskKind::Passage,
        TrackKind::Regular,
        num_eval,
        num_train,
        30,
    )?)
}

fn keys(instances: &[Instance], split: Split) -> BTreeSet<(i64, i64)> {
    instances
        .iter()
        .filter(|instance| instance.split == split)
        .map(|instance| (instance.query_id, instance.passage_id))
        .collect()
}

#[test]
fn single_query_produces_one_yes_and_one_no_instance() -> Result<()> {
    let files = Fixture {
        collection: "100\tp\n200\tq\n".to_string(),
        dev_queries: "10\twhat is x?\n".to_string(),
        dev_qrels: "10\t0\t100\t1\n".to_string(),
        dev_topk: "10\t100\t1\n10\t200\t2\n".to_string(),
        ..Fixture::default()
    }
    .write()?;

    let run = PassageScenario::new(config(10, 0)?)
        .without_train()
        .run(&files)?;

    assert_eq!(run.instances.len(), 2);
    for instance in &run.instances {
        assert_eq!(instance.split, Split::Valid);
        assert!(instance
            .input
            .ends_with("Question: Does the passage above answer the question what is x?"));
        let expected = if instance.passage_id == 100 { "Yes" } else { "No" };
        assert_eq!(
            instance.correct_reference().map(|r| r.output.as_str()),
            Some(expected)
        );
    }
    let by_passage: BTreeSet<i64> = run.instances.iter().map(|i| i.passage_id).collect();
    assert_eq!(by_passage, BTreeSet::from([100, 200]));

    let stats = run.summary.splits[&Split::Valid].selection;
    assert_eq!(stats.ranks_missing, 28);
    Ok(())
}

#[test]
fn every_instance_has_exactly_one_correct_reference() -> Result<()> {
    let files = larger_fixture()?;
    let run = PassageScenario::new(config(20, 20)?).run(&files)?;

    assert!(!run.instances.is_empty());
    for instance in &run.instances {
        assert_eq!(instance.references[0].output, "Yes");
        assert_eq!(instance.references[1].output, "No");
        let correct = instance
            .references
            .iter()
            .filter(|reference| reference.is_correct())
            .count();
        assert_eq!(correct, 1);
    }
    Ok(())
}

#[test]
fn splits_keep_train_balance_and_all_ranked_gold() -> Result<()> {
    let files = larger_fixture()?;
    let run = PassageScenario::new(config(40, 40)?).run(&files)?;

    let train = &run.summary.splits[&Split::Train];
    assert_eq!(train.positives, 40);
    assert_eq!(train.negatives, 40);
    for negative in run
        .instances
        .iter()
        .filter(|i| i.split == Split::Train && !i.is_positive())
    {
        assert!(negative.rank.is_some_and(|rank| (11..20).contains(&rank)));
    }

    let valid = &run.summary.splits[&Split::Valid];
    assert_eq!(valid.instances, 40 * 30);
    assert_eq!(valid.positives, 40 * 3);
    assert_eq!(valid.selection.gold_dropped_by_cap, 0);
    Ok(())
}

#[test]
fn same_seed_gives_identical_instances() -> Result<()> {
    let files = larger_fixture()?;
    let first = PassageScenario::new(config(15, 15)?).run(&files)?;
    let second = PassageScenario::new(config(15, 15)?).run(&files)?;

    assert_eq!(first.instances, second.instances);

    let reseeded = PassageScenario::new(config(15, 15)?.with_seed(42)).run(&files)?;
    assert_ne!(first.instances, reseeded.instances);
    Ok(())
}

#[test]
fn more_queries_extend_the_previous_selection() -> Result<()> {
    let files = larger_fixture()?;
    let small = PassageScenario::new(config(5, 5)?).run(&files)?;
    let large = PassageScenario::new(config(25, 25)?).run(&files)?;

    for split in Split::ALL {
        let small_keys = keys(&small.instances, split);
        let large_keys = keys(&large.instances, split);
        assert!(!small_keys.is_empty());
        assert!(small_keys.is_subset(&large_keys), "{split} is not a superset");
        assert!(large_keys.len() > small_keys.len());
    }
    Ok(())
}

#[test]
fn skipping_train_touches_no_train_sources() -> Result<()> {
    let files = larger_fixture()?;
    fs::remove_file(files.dir.path().join(TOPK_TRAIN_FILE_NAME))?;

    let run = PassageScenario::new(config(5, 5)?).without_train().run(&files)?;
    assert!(run.instances.iter().all(|i| i.split == Split::Valid));

    assert!(PassageScenario::new(config(5, 5)?).run(&files).is_err());
    Ok(())
}
