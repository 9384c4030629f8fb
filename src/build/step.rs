//! Build step definitions.
//!
//! A production build is a fixed, ordered list of named steps: the clean
//! step followed by one step per asset category. There is no dependency
//! graph; the only real constraint is that cleaning precedes every write.

use crate::category::AssetCategory;

/// What a build step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Remove the build output tree
    Clean,
    /// Run one category's pipeline
    Asset(AssetCategory),
}

impl StepKind {
    /// Step identifier, also the task name on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            StepKind::Clean => "clean",
            StepKind::Asset(category) => category.task_name(),
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// An ordered list of build steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    steps: Vec<StepKind>,
}

impl BuildPlan {
    /// Create a new empty build plan.
    pub fn new() -> Self {
        Self { steps: vec![] }
    }

    /// The production plan: clean, then every category in build order.
    pub fn production() -> Self {
        let mut plan = Self::new();
        plan.add_step(StepKind::Clean);
        for category in AssetCategory::ALL {
            plan.add_step(StepKind::Asset(category));
        }
        plan
    }

    /// A plan running a single step.
    pub fn single(step: StepKind) -> Self {
        Self { steps: vec![step] }
    }

    /// Append a step.
    pub fn add_step(&mut self, step: StepKind) {
        self.steps.push(step);
    }

    /// Get the steps in execution order.
    pub fn steps(&self) -> &[StepKind] {
        &self.steps
    }

    /// Get the step identifiers in execution order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.steps.iter().map(StepKind::id).collect()
    }

    /// Get the number of steps in the plan.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Keep only the steps whose id is listed, preserving plan order.
    pub fn filter(mut self, ids: &[String]) -> Self {
        if ids.is_empty() {
            return self;
        }
        self.steps.retain(|step| ids.iter().any(|id| id == step.id()));
        self
    }
}
