//! Step registry and dependency resolver
//!
//! The registry is built once per workflow and is immutable afterwards.
//! Construction rejects every structural defect up front (duplicate ids,
//! dangling or self dependencies, cycles) so the resolver can assume a DAG.

use crate::error::RegistryError;
use crate::guard::NavigationGuard;
use crate::store::StepStateStore;
use crate::types::StepId;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use wizard_validation::StepValidator;

/// Static definition of one workflow step
#[derive(Clone)]
pub struct StepDefinition {
    /// Unique id within the registry
    pub id: StepId,
    /// Display title (opaque to the kernel)
    pub title: String,
    /// Display description (opaque to the kernel)
    pub description: String,
    /// Validator for the step's data
    pub validator: Arc<dyn StepValidator>,
    /// Optional entry/exit policy
    pub guard: Option<Arc<dyn NavigationGuard>>,
    /// Steps that must be complete before this one may be entered
    pub dependencies: Vec<StepId>,
    /// Incomplete optional steps do not block forward traversal (host policy)
    pub optional: bool,
}

impl StepDefinition {
    /// Definition with no guard, no dependencies, not optional
    #[must_use]
    pub fn new<V>(id: impl Into<StepId>, title: impl Into<String>, validator: V) -> Self
    where
        V: StepValidator + 'static,
    {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            validator: Arc::new(validator),
            guard: None,
            dependencies: Vec::new(),
            optional: false,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With navigation guard
    #[inline]
    #[must_use]
    pub fn with_guard<G>(mut self, guard: G) -> Self
    where
        G: NavigationGuard + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Add a prerequisite step
    #[inline]
    #[must_use]
    pub fn depends_on(mut self, dependency: impl Into<StepId>) -> Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    /// Mark optional
    #[inline]
    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("has_guard", &self.guard.is_some())
            .field("dependencies", &self.dependencies)
            .field("optional", &self.optional)
            .finish_non_exhaustive()
    }
}

/// Builder for [`StepRegistry`]
///
/// Usage:
/// ```rust,ignore
/// let registry = StepRegistry::builder()
///     .step(StepDefinition::new("select", "Select", SelectionStepValidator::new()))
///     .step(StepDefinition::new("run", "Run", ExecutionStepValidator::new()).depends_on("select"))
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct StepRegistryBuilder {
    steps: Vec<StepDefinition>,
}

impl StepRegistryBuilder {
    /// Append a step; declaration order is navigation order
    #[inline]
    #[must_use]
    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    /// Validate structure and build the registry
    ///
    /// # Errors
    /// - `RegistryError::Empty` if no steps were added
    /// - `RegistryError::DuplicateStep` if two steps share an id
    /// - `RegistryError::SelfDependency` / `UnknownDependency` for bad references
    /// - `RegistryError::DependencyCycle` if the dependency relation has a cycle
    pub fn build(self) -> Result<StepRegistry, RegistryError> {
        if self.steps.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut index = HashMap::with_capacity(self.steps.len());
        for (position, step) in self.steps.iter().enumerate() {
            if index.insert(step.id.clone(), position).is_some() {
                return Err(RegistryError::DuplicateStep(step.id.clone()));
            }
        }

        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for (position, step) in self.steps.iter().enumerate() {
            graph.add_node(position);
            for dependency in &step.dependencies {
                if *dependency == step.id {
                    return Err(RegistryError::SelfDependency(step.id.clone()));
                }
                let from = *index.get(dependency).ok_or_else(|| {
                    RegistryError::UnknownDependency {
                        step: step.id.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                graph.add_edge(from, position, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            let step = self.steps[cycle.node_id()].id.clone();
            return Err(RegistryError::DependencyCycle(step));
        }

        tracing::debug!(steps = self.steps.len(), edges = graph.edge_count(), "step registry built");

        Ok(StepRegistry {
            steps: self.steps,
            index,
        })
    }
}

/// Ordered, validated set of step definitions
#[derive(Debug)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
    index: HashMap<StepId, usize>,
}

impl StepRegistry {
    /// Start building a registry
    #[inline]
    #[must_use]
    pub fn builder() -> StepRegistryBuilder {
        StepRegistryBuilder::default()
    }

    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a built registry
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps in declaration order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Look up a step by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StepDefinition> {
        self.position(id).map(|i| &self.steps[i])
    }

    /// 0-based declaration position of a step
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Step at 0-based position
    #[inline]
    #[must_use]
    pub fn at(&self, position: usize) -> Option<&StepDefinition> {
        self.steps.get(position)
    }

    /// Whether every prerequisite of `id` is marked complete
    ///
    /// Unknown ids are never satisfied.
    #[must_use]
    pub fn check_step_dependencies(&self, id: &str, store: &StepStateStore) -> bool {
        self.get(id).is_some_and(|step| {
            step.dependencies
                .iter()
                .all(|dependency| store.is_complete(dependency.as_str()))
        })
    }

    /// Prerequisites of `id` that are not complete yet, in declaration order
    #[must_use]
    pub fn unsatisfied_dependencies(&self, id: &str, store: &StepStateStore) -> Vec<StepId> {
        self.get(id).map_or_else(Vec::new, |step| {
            step.dependencies
                .iter()
                .filter(|dependency| !store.is_complete(dependency.as_str()))
                .cloned()
                .collect()
        })
    }

    /// First step strictly after `from` whose dependencies are satisfied
    #[must_use]
    pub fn next_available_step(&self, from: &str, store: &StepStateStore) -> Option<&StepDefinition> {
        let start = self.position(from)?;
        self.steps[start + 1..]
            .iter()
            .find(|step| self.check_step_dependencies(step.id.as_str(), store))
    }

    /// Step immediately before `from`
    ///
    /// Going back is never dependency-gated.
    #[must_use]
    pub fn previous_available_step(&self, from: &str) -> Option<&StepDefinition> {
        let position = self.position(from)?;
        position.checked_sub(1).map(|i| &self.steps[i])
    }
}
