//! Network structure: variables plus directed acyclic arcs.
//!
//! Follows a build-then-freeze pattern: a mutable [`NetworkBuilder`] accepts
//! variables and arcs (rejecting cycles and unknown endpoints immediately),
//! and [`NetworkBuilder::build`] produces an immutable [`NetworkStructure`]
//! consumed read-only by every later stage.
//!
//! ## Parent ordering convention
//!
//! The parents of a variable are ordered by the order their arcs were added.
//! This ordering is frozen at build time and defines the mixed-radix layout
//! of the variable's CPT, with the first parent most significant. Every
//! component indexes parent configurations through
//! [`NetworkStructure::parents`], so the convention lives in exactly one
//! place.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::engine::domain::{CategoricalDomain, Variable};
use crate::engine::errors::EcoNetError;

/// A unique identifier for a variable within one network.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct VarId(pub u32);

impl VarId {
    /// Index into per-variable vectors.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Mutable builder for a [`NetworkStructure`].
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    variables: Vec<Variable>,
    name_index: FxHashMap<String, VarId>,
    parents: Vec<SmallVec<[VarId; 4]>>,
    children: Vec<SmallVec<[VarId; 4]>>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable with the given domain.
    ///
    /// Fails if the name is already taken.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        domain: CategoricalDomain,
    ) -> Result<VarId, EcoNetError> {
        let name = name.into();
        if self.name_index.contains_key(&name) {
            return Err(EcoNetError::Structure(format!(
                "variable '{name}' already exists in the network"
            )));
        }
        let id = VarId(self.variables.len() as u32);
        self.name_index.insert(name.clone(), id);
        self.variables.push(Variable { name, domain });
        self.parents.push(SmallVec::new());
        self.children.push(SmallVec::new());
        Ok(id)
    }

    /// Adds a directed arc `parent -> child`.
    ///
    /// Fails if either endpoint is unknown, the arc already exists, or the
    /// arc would introduce a cycle.
    pub fn add_arc(&mut self, parent: &str, child: &str) -> Result<(), EcoNetError> {
        let parent_id = self.resolve(parent)?;
        let child_id = self.resolve(child)?;
        if parent_id == child_id {
            return Err(EcoNetError::Structure(format!(
                "self-arc on variable '{parent}'"
            )));
        }
        if self.parents[child_id.index()].contains(&parent_id) {
            return Err(EcoNetError::Structure(format!(
                "duplicate arc {parent} -> {child}"
            )));
        }
        if self.reaches(child_id, parent_id) {
            return Err(EcoNetError::Structure(format!(
                "arc {parent} -> {child} would create a cycle"
            )));
        }
        self.parents[child_id.index()].push(parent_id);
        self.children[parent_id.index()].push(child_id);
        Ok(())
    }

    /// Freezes the builder into an immutable structure.
    pub fn build(self) -> NetworkStructure {
        let topological_order = topological_order(&self.parents, &self.children);
        NetworkStructure {
            variables: self.variables,
            name_index: self.name_index,
            parents: self.parents,
            children: self.children,
            topological_order,
        }
    }

    fn resolve(&self, name: &str) -> Result<VarId, EcoNetError> {
        self.name_index.get(name).copied().ok_or_else(|| {
            EcoNetError::Structure(format!("unknown variable '{name}' in arc"))
        })
    }

    /// Iterative DFS reachability along child arcs.
    fn reaches(&self, from: VarId, to: VarId) -> bool {
        let mut stack = vec![from];
        let mut visited = vec![false; self.variables.len()];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if std::mem::replace(&mut visited[current.index()], true) {
                continue;
            }
            stack.extend(self.children[current.index()].iter().copied());
        }
        false
    }
}

/// Kahn's algorithm. The builder rejects cycles on insertion, so every
/// variable is emitted.
fn topological_order(
    parents: &[SmallVec<[VarId; 4]>],
    children: &[SmallVec<[VarId; 4]>],
) -> Vec<VarId> {
    let n = parents.len();
    let mut in_degree: Vec<usize> = parents.iter().map(SmallVec::len).collect();
    let mut queue: Vec<VarId> = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .map(|i| VarId(i as u32))
        .collect();
    let mut order = Vec::with_capacity(n);
    while let Some(id) = queue.pop() {
        order.push(id);
        for &child in &children[id.index()] {
            in_degree[child.index()] -= 1;
            if in_degree[child.index()] == 0 {
                queue.push(child);
            }
        }
    }
    order
}

/// Immutable DAG over named categorical variables.
///
/// Produced once by [`NetworkBuilder::build`]; consumed read-only by the
/// estimator, the EM refiner, and the posterior predictor.
#[derive(Debug, Clone)]
pub struct NetworkStructure {
    variables: Vec<Variable>,
    name_index: FxHashMap<String, VarId>,
    parents: Vec<SmallVec<[VarId; 4]>>,
    children: Vec<SmallVec<[VarId; 4]>>,
    topological_order: Vec<VarId>,
}

impl NetworkStructure {
    /// Number of variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// All variable ids in insertion order.
    pub fn var_ids(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.variables.len()).map(|i| VarId(i as u32))
    }

    /// Variable metadata for `id`.
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    /// Looks a variable up by name.
    pub fn var_by_name(&self, name: &str) -> Option<VarId> {
        self.name_index.get(name).copied()
    }

    /// Parents of `id` in the frozen CPT ordering.
    pub fn parents(&self, id: VarId) -> &[VarId] {
        &self.parents[id.index()]
    }

    /// Children of `id`.
    pub fn children(&self, id: VarId) -> &[VarId] {
        &self.children[id.index()]
    }

    /// Variables in a topological order (parents before children).
    pub fn topological_order(&self) -> &[VarId] {
        &self.topological_order
    }

    /// Cardinality of the variable's domain.
    pub fn cardinality(&self, id: VarId) -> usize {
        self.variables[id.index()].domain.cardinality()
    }
}
