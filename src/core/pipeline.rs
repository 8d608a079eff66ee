/*!
 * Build orchestration
 *
 * One [`BagBuilder`] runs one build through its stages in a fixed order:
 *
 * ```text
 * Idle -> Resolving -> Creating -> Amending -> [Merging] -> [Cleaning] -> Validating -> [Committing] -> Done
 *                                                                                                    \-> Failed
 * ```
 *
 * Every stage transition and outcome goes to the build's own report. A
 * failed build keeps whatever it wrote to the target; nothing is retried or
 * rolled back.
 *
 * In-place builds write to a `.staging-<uuid>` sibling of the target and
 * only enter `Committing`, which swaps the staging bag in for the target,
 * after the bag validated.
 */

use std::fmt;
use std::path::{Path, PathBuf};

use bagsmith_core_audit::{FinalizedReport, Outcome};
use bagsmith_core_manifest::{Bag, Verdict, DATA_DIR};
use tracing::debug;
use uuid::Uuid;

use super::amend::amend;
use super::cleanup::clean;
use super::create::create_base;
use super::fs_ops;
use super::journal::Journal;
use super::merge::merge_metadata;
use super::plan::AlgorithmPlan;
use super::validation::validate_bag;
use crate::error::{BuildError, BuildFailure, Result};
use crate::request::BuildRequest;

/// Stage a build is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Resolving,
    Creating,
    Amending,
    Merging,
    Cleaning,
    Validating,
    Committing,
    Done,
    Failed,
}

impl BuildState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Idle => "idle",
            BuildState::Resolving => "resolving",
            BuildState::Creating => "creating",
            BuildState::Amending => "amending",
            BuildState::Merging => "merging",
            BuildState::Cleaning => "cleaning",
            BuildState::Validating => "validating",
            BuildState::Committing => "committing",
            BuildState::Done => "done",
            BuildState::Failed => "failed",
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a build that reached `Done`
#[derive(Debug)]
pub struct BuiltBag {
    pub bag: Bag,
    pub plan: AlgorithmPlan,
    pub verdict: Verdict,
    pub report: FinalizedReport,
}

/// Runs one build
pub struct BagBuilder<'a> {
    request: &'a BuildRequest,
    state: BuildState,
    journal: Journal,
    work_target: PathBuf,
}

impl<'a> BagBuilder<'a> {
    pub fn new(request: &'a BuildRequest) -> Self {
        Self {
            request,
            state: BuildState::Idle,
            journal: Journal::new(Uuid::new_v4().to_string()),
            work_target: request.target_directory().to_path_buf(),
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn build_id(&self) -> &str {
        self.journal.build_id()
    }

    /// Directory the bag is being written to; a staging sibling while an
    /// in-place build has not committed
    pub fn work_target(&self) -> &Path {
        &self.work_target
    }

    /// Run every stage to a terminal state
    pub fn run(mut self) -> std::result::Result<BuiltBag, BuildFailure> {
        match self.execute() {
            Ok((bag, plan, verdict)) => {
                self.enter(BuildState::Done);
                Ok(BuiltBag {
                    bag,
                    plan,
                    verdict,
                    report: self.journal.finalize(Outcome::Done),
                })
            }
            Err(error) => {
                let last = self.state;
                self.journal.error(last.as_str(), error.to_string());
                if error.leaves_partial_state() {
                    self.journal.warning(
                        last.as_str(),
                        format!(
                            "partial output left in {}",
                            self.work_target.display()
                        ),
                    );
                }
                self.state = BuildState::Failed;
                Err(BuildFailure {
                    error,
                    report: self.journal.finalize(Outcome::Failed),
                    state: last,
                    target: self.work_target.clone(),
                })
            }
        }
    }

    fn enter(&mut self, next: BuildState) {
        debug!("build {}: {} -> {}", self.journal.build_id(), self.state, next);
        self.state = next;
        self.journal.info(next.as_str(), format!("entered {}", next));
    }

    fn execute(&mut self) -> Result<(Bag, AlgorithmPlan, Verdict)> {
        let request = self.request;
        let workers = request.workers();

        self.enter(BuildState::Resolving);
        let plan = AlgorithmPlan::resolve(
            request.payload_algorithms(),
            request.tagmanifest_algorithms(),
        )?;
        preflight(request)?;
        if request.in_place() {
            self.work_target = fs_ops::staging_path(request.target_directory())?;
            self.journal.info(
                BuildState::Resolving.as_str(),
                format!("staging in-place build in {}", self.work_target.display()),
            );
        }
        self.journal.info(
            BuildState::Resolving.as_str(),
            format!(
                "superset {:?}, payload-only {:?}, tag-only {:?}",
                plan.superset, plan.payload_only, plan.tag_only
            ),
        );

        self.enter(BuildState::Creating);
        let base = create_base(request, &self.work_target, &plan, &mut self.journal)?;
        let mut bag = base.bag;

        self.enter(BuildState::Amending);
        amend(&mut bag, &base.captured_at, &mut self.journal)?;

        if let Some(meta) = request.metadata_directory() {
            self.enter(BuildState::Merging);
            merge_metadata(&mut bag, meta, workers, &mut self.journal)?;
        }

        if plan.needs_cleanup() {
            self.enter(BuildState::Cleaning);
            clean(&mut bag, &plan, workers, &mut self.journal)?;
        }

        if bag.tag_manifests_stale() {
            bag.regenerate_tag_manifests(&plan.tag_list(), workers)?;
            self.journal.info(self.state.as_str(), "tag-manifests regenerated");
        }

        self.enter(BuildState::Validating);
        let verdict = validate_bag(&bag, workers, &mut self.journal)?;

        if request.in_place() {
            self.enter(BuildState::Committing);
            let target = request.target_directory();
            fs_ops::replace_dir(&self.work_target, target)?;
            self.work_target = target.to_path_buf();
            self.journal.info(
                BuildState::Committing.as_str(),
                format!("replaced {} with the validated bag", target.display()),
            );
            bag = Bag::open(target)?;
        }

        Ok((bag, plan, verdict))
    }
}

/// Build a bag; convenience for `BagBuilder::new(request).run()`
pub fn build(request: &BuildRequest) -> std::result::Result<BuiltBag, BuildFailure> {
    BagBuilder::new(request).run()
}

/// Input checks that must pass before anything is written
fn preflight(request: &BuildRequest) -> Result<()> {
    let source = request.source_directory();
    let target = request.target_directory();

    if request.workers() == 0 {
        return Err(BuildError::configuration("workers must be at least 1"));
    }
    if request.in_place() {
        return preflight_in_place(request);
    }
    if target.exists() && !request.exist_ok() {
        return Err(BuildError::configuration(format!(
            "Target {} already exists (set exist_ok to overwrite)",
            target.display()
        )));
    }
    if target.exists() && !target.is_dir() {
        return Err(BuildError::configuration(format!(
            "Target {} is not a directory",
            target.display()
        )));
    }
    if fs_ops::is_within(target, source) {
        return Err(BuildError::configuration(format!(
            "Target {} lies inside source {}",
            target.display(),
            source.display()
        )));
    }
    if fs_ops::is_within(source, target) {
        return Err(BuildError::configuration(format!(
            "Source {} lies inside target {}",
            source.display(),
            target.display()
        )));
    }

    if let Some(meta) = request.metadata_directory() {
        if !meta.is_dir() {
            return Err(BuildError::configuration(format!(
                "Metadata directory {} does not exist",
                meta.display()
            )));
        }
        fs_ops::ensure_regular_tree(meta, "Metadata directory")?;
        for (other, role) in [(source, "source"), (target, "target")] {
            if fs_ops::is_within(meta, other) || fs_ops::is_within(other, meta) {
                return Err(BuildError::configuration(format!(
                    "Metadata directory {} overlaps the {} {}",
                    meta.display(),
                    role,
                    other.display()
                )));
            }
        }
    }

    Ok(())
}

/// Checks for a build that replaces its own information package
///
/// The payload must be the target's `data/`; the metadata directory may live
/// inside the target since the merge moves it out before the swap.
fn preflight_in_place(request: &BuildRequest) -> Result<()> {
    let source = request.source_directory();
    let target = request.target_directory();

    if !target.is_dir() {
        return Err(BuildError::configuration(format!(
            "Information package {} is not a directory",
            target.display()
        )));
    }
    if fs_ops::resolve_path(source) != fs_ops::resolve_path(&target.join(DATA_DIR)) {
        return Err(BuildError::configuration(format!(
            "In-place source {} is not the data directory of {}",
            source.display(),
            target.display()
        )));
    }

    if let Some(meta) = request.metadata_directory() {
        if !meta.is_dir() {
            return Err(BuildError::configuration(format!(
                "Metadata directory {} does not exist",
                meta.display()
            )));
        }
        fs_ops::ensure_regular_tree(meta, "Metadata directory")?;
        if fs_ops::is_within(meta, source) || fs_ops::is_within(source, meta) {
            return Err(BuildError::configuration(format!(
                "Metadata directory {} overlaps the source {}",
                meta.display(),
                source.display()
            )));
        }
    }

    Ok(())
}
