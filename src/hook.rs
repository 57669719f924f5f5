//! Wiring of the per-variant fix-up step into a host build's task graph.
//!
//! The host build tool is reached through [`TaskScheduler`]. For each variant the fix-up
//! step `reBundleAar<Variant>` is registered so that it runs after
//! `generate<Variant>Resources` and before `package<Variant>Resources`.

use crate::policy::ExclusionPolicy;
use crate::resolver::{resolve_variant, ResolveOptions, ResolveReport};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Action run when the host executes a registered step
pub type StepAction = Box<dyn Fn() -> ResolveReport>;

/// The slice of a build tool's task graph this crate needs
pub trait TaskScheduler {
    /// Register a named step and the action it runs
    fn register_step(&mut self, name: &str, action: StepAction);

    /// `task` must not start before `depends_on` has run
    fn register_dependency(&mut self, task: &str, depends_on: &str);

    /// Whenever `task` runs, `finalized_by` runs right after it
    fn register_finalizer(&mut self, task: &str, finalized_by: &str);
}

/// Upper-case the first character, leaving the rest untouched
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Where the host extracts dependency archives, relative to its build directory
pub fn exploded_aar_dir(build_dir: &Path) -> PathBuf {
    build_dir.join("intermediates").join("exploded-aar")
}

/// Task names involved for one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTasks {
    pub variant: String,
    /// Host task that generates the variant's resources
    pub generate: String,
    /// Host task that packages the variant's resources
    pub package: String,
    /// The fix-up step registered by this crate
    pub rebundle: String,
}

impl VariantTasks {
    pub fn for_variant(variant: &str) -> Self {
        let cap = capitalize(variant);
        Self {
            variant: variant.to_string(),
            generate: format!("generate{}Resources", cap),
            package: format!("package{}Resources", cap),
            rebundle: format!("reBundleAar{}", cap),
        }
    }
}

/// Register the fix-up step for every variant.
///
/// Each step locates the variant's roots under `exploded_dir` when it runs, not when it
/// is registered, since the archives are extracted later in the build.
pub fn hook_resource_process<S, V>(
    scheduler: &mut S,
    exploded_dir: &Path,
    variants: V,
    policy: &ExclusionPolicy,
    options: ResolveOptions,
) -> Vec<VariantTasks>
where
    S: TaskScheduler + ?Sized,
    V: IntoIterator,
    V::Item: AsRef<str>,
{
    let mut registered = Vec::new();

    for variant in variants {
        let tasks = VariantTasks::for_variant(variant.as_ref());

        let exploded = exploded_dir.to_path_buf();
        let variant_name = tasks.variant.clone();
        let policy = policy.clone();
        scheduler.register_step(
            &tasks.rebundle,
            Box::new(move || resolve_variant(&exploded, &variant_name, &policy, options)),
        );
        scheduler.register_dependency(&tasks.package, &tasks.rebundle);
        scheduler.register_finalizer(&tasks.generate, &tasks.rebundle);

        debug!(step = %tasks.rebundle, after = %tasks.generate, before = %tasks.package, "registered fix-up step");
        registered.push(tasks);
    }

    registered
}

/// In-memory [`TaskScheduler`] that records steps and edges and can run them.
///
/// Used by the command-line driver, where there is no host build tool.
#[derive(Default)]
pub struct StepGraph {
    steps: BTreeMap<String, StepAction>,
    dependencies: Vec<(String, String)>,
    finalizers: Vec<(String, String)>,
}

impl StepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    /// Tasks that must run before `task`
    pub fn dependencies_of(&self, task: &str) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter(|(t, _)| t == task)
            .map(|(_, dep)| dep.as_str())
            .collect()
    }

    /// Tasks that run right after `task`
    pub fn finalizers_of(&self, task: &str) -> Vec<&str> {
        self.finalizers
            .iter()
            .filter(|(t, _)| t == task)
            .map(|(_, fin)| fin.as_str())
            .collect()
    }

    /// Run a registered step by name
    pub fn run_step(&self, name: &str) -> Option<ResolveReport> {
        self.steps.get(name).map(|action| action())
    }

    /// Signal that host task `task` has finished, running its registered finalizer steps
    pub fn finish_task(&self, task: &str) -> Vec<(String, ResolveReport)> {
        self.finalizers_of(task)
            .into_iter()
            .filter_map(|step| self.run_step(step).map(|report| (step.to_string(), report)))
            .collect()
    }
}

impl TaskScheduler for StepGraph {
    fn register_step(&mut self, name: &str, action: StepAction) {
        self.steps.insert(name.to_string(), action);
    }

    fn register_dependency(&mut self, task: &str, depends_on: &str) {
        self.dependencies
            .push((task.to_string(), depends_on.to_string()));
    }

    fn register_finalizer(&mut self, task: &str, finalized_by: &str) {
        self.finalizers
            .push((task.to_string(), finalized_by.to_string()));
    }
}
