use std::collections::BTreeMap;

use common::{error::AppError, utils::fetch::FileSource};
use serde::Serialize;
use tracing::info;

use crate::{
    config::ScenarioConfig,
    instance::InstanceAssembler,
    provision::{PassageDataset, Provisioner},
    selector::{CandidateSelector, SelectionStats},
    track::TaskKind,
    types::{Instance, Split},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub instances: usize,
    pub positives: usize,
    pub negatives: usize,
    pub selection: SelectionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub splits: BTreeMap<Split, SplitSummary>,
}

impl RunSummary {
    pub fn total_instances(&self) -> usize {
        self.splits.values().map(|split| split.instances).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioRun {
    /// Validation instances first, then train instances.
    pub instances: Vec<Instance>,
    pub summary: RunSummary,
}

/// The MS MARCO passage ranking scenario: provision, select, assemble.
pub struct PassageScenario {
    config: ScenarioConfig,
    include_train: bool,
}

impl PassageScenario {
    pub fn new(config: ScenarioConfig) -> Self {
        Self {
            config,
            include_train: true,
        }
    }

    #[must_use]
    pub fn without_train(mut self) -> Self {
        self.include_train = false;
        self
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Fetches the source files and builds every instance.
    pub fn run<F: FileSource>(&self, files: &F) -> Result<ScenarioRun, AppError> {
        match self.config.task() {
            TaskKind::Passage => {
                let mut provisioner = Provisioner::new(files, self.config.track());
                if !self.include_train {
                    provisioner = provisioner.without_train();
                }
                let dataset = provisioner.prepare()?;
                self.instances_for(&dataset)
            }
        }
    }

    /// Builds instances from already loaded dictionaries.
    pub fn instances_for(&self, dataset: &PassageDataset) -> Result<ScenarioRun, AppError> {
        let selector = CandidateSelector::new(self.config.clone());
        let assembler = InstanceAssembler::new(dataset, self.config.track());
        let mut run = ScenarioRun::default();

        for split in Split::ALL {
            if split == Split::Train && !self.include_train {
                continue;
            }
            let selection = selector.select(split, dataset.split(split), &dataset.collection);
            let instances = assembler.assemble_all(split, &selection.candidates)?;

            let positives = instances.iter().filter(|i| i.is_positive()).count();
            let summary = SplitSummary {
                instances: instances.len(),
                positives,
                negatives: instances.len() - positives,
                selection: selection.stats,
            };
            info!(
                %split,
                instances = summary.instances,
                positives = summary.positives,
                negatives = summary.negatives,
                "Assembled split instances"
            );

            run.summary.splits.insert(split, summary);
            run.instances.extend(instances);
        }

        Ok(run)
    }
}
