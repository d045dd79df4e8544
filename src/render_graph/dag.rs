//! Dependency graph over passes and the resources they touch.
//!
//! Passes never name each other. A pass declares which resources it reads
//! and writes, and [`DirectedAcyclicGraph::build`] derives the edges: A → B
//! exists iff A writes a resource that B reads.
//!
//! Nodes live in a single arena. Adjacency lists store arena indices, so each
//! node has exactly one mutable copy.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

/// Key identifying a pass inside a [`DirectedAcyclicGraph`].
pub trait PassKey: Clone + Eq + Hash + Debug {
    /// Whether this key is the "unknown pass" placeholder. Such nodes are
    /// rejected by [`DirectedAcyclicGraph::build`].
    fn is_unknown(&self) -> bool {
        false
    }

    /// Name used in build errors and logs.
    fn label(&self) -> String {
        format!("{:?}", self)
    }
}

impl PassKey for String {
    fn is_unknown(&self) -> bool {
        self.is_empty() || self == "Unknown"
    }

    fn label(&self) -> String {
        self.clone()
    }
}

impl PassKey for &'static str {
    fn is_unknown(&self) -> bool {
        self.is_empty() || *self == "Unknown"
    }

    fn label(&self) -> String {
        self.to_string()
    }
}

impl PassKey for u32 {}

impl PassKey for usize {}

/// Errors raised while building the graph.
///
/// All of them point at malformed pass declarations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("pass `{0}` declares no output resource")]
    MissingOutput(String),
    #[error("a node is registered for an unknown pass")]
    UnknownPass,
    #[error("cyclic dependency between passes {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// One pass's dependency footprint.
#[derive(Debug, Clone)]
pub struct Node<P, R> {
    pass: P,
    dependency_level: u32,
    input_resources: BTreeSet<R>,
    output_resources: BTreeSet<R>,
}

impl<P, R: Ord> Node<P, R> {
    fn new(pass: P) -> Self {
        Self {
            pass,
            dependency_level: 0,
            input_resources: BTreeSet::new(),
            output_resources: BTreeSet::new(),
        }
    }

    /// Key of the pass this node belongs to.
    pub fn pass(&self) -> &P {
        &self.pass
    }

    /// Distance from a root; only meaningful after a build.
    pub fn dependency_level(&self) -> u32 {
        self.dependency_level
    }

    /// Resources the pass reads.
    pub fn input_resources(&self) -> &BTreeSet<R> {
        &self.input_resources
    }

    /// Resources the pass writes.
    pub fn output_resources(&self) -> &BTreeSet<R> {
        &self.output_resources
    }
}

#[derive(Debug, Clone, Default)]
struct AdjacencyLink {
    visited: bool,
    input_nodes: Vec<usize>,
    output_nodes: Vec<usize>,
}

/// Generic pass/resource dependency graph.
#[derive(Debug, Clone)]
pub struct DirectedAcyclicGraph<P, R> {
    nodes: Vec<Node<P, R>>,
    lookup: HashMap<P, usize>,
    links: Vec<AdjacencyLink>,
    order: Vec<usize>,
    built: bool,
}

impl<P: PassKey, R: Clone + Eq + Hash + Ord + Debug> Default for DirectedAcyclicGraph<P, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PassKey, R: Clone + Eq + Hash + Ord + Debug> DirectedAcyclicGraph<P, R> {
    /// An empty, unbuilt graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            lookup: HashMap::new(),
            links: Vec::new(),
            order: Vec::new(),
            built: false,
        }
    }

    /// Record that `pass` reads `resource`.
    ///
    /// Creates the pass's node on first use; repeated declarations are no-ops.
    pub fn add_read_dependency(&mut self, pass: &P, resource: R) {
        let index = self.node_index_or_insert(pass);
        if self.nodes[index].input_resources.insert(resource) {
            self.built = false;
        }
    }

    /// Record that `pass` writes `resource`.
    pub fn add_write_dependency(&mut self, pass: &P, resource: R) {
        let index = self.node_index_or_insert(pass);
        if self.nodes[index].output_resources.insert(resource) {
            self.built = false;
        }
    }

    fn node_index_or_insert(&mut self, pass: &P) -> usize {
        if let Some(&index) = self.lookup.get(pass) {
            return index;
        }
        let index = self.nodes.len();
        self.nodes.push(Node::new(pass.clone()));
        self.lookup.insert(pass.clone(), index);
        self.built = false;
        index
    }

    /// Drop the node of `pass`, if any.
    ///
    /// The graph must be rebuilt before its order or adjacency is used again.
    pub fn remove_pass(&mut self, pass: &P) -> bool {
        let Some(index) = self.lookup.remove(pass) else {
            return false;
        };
        self.nodes.remove(index);
        for slot in self.lookup.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        self.links.clear();
        self.order.clear();
        self.built = false;
        true
    }

    /// Validate, derive edges, sort and compute dependency levels.
    ///
    /// On error the previous build result is discarded and the graph stays
    /// unbuilt.
    pub fn build(&mut self) -> GraphResult<()> {
        self.built = false;
        self.order.clear();

        self.validate()?;
        self.build_adjacency();
        self.build_topological_order()?;
        self.build_dependency_levels();

        self.built = true;
        log::debug!(
            "Built render graph DAG: {} nodes, {} levels",
            self.nodes.len(),
            self.level_count()
        );
        Ok(())
    }

    fn validate(&self) -> GraphResult<()> {
        for node in &self.nodes {
            if node.pass.is_unknown() {
                return Err(GraphError::UnknownPass);
            }
            if node.output_resources.is_empty() {
                return Err(GraphError::MissingOutput(node.pass.label()));
            }
        }
        Ok(())
    }

    /// A → B for every pass A writing a resource that B reads. Input links
    /// are sorted by producer index, output links by consumer index.
    fn build_adjacency(&mut self) {
        let mut writers: HashMap<&R, Vec<usize>> = HashMap::new();
        for (producer, node) in self.nodes.iter().enumerate() {
            for resource in &node.output_resources {
                writers.entry(resource).or_default().push(producer);
            }
        }

        let mut links = vec![AdjacencyLink::default(); self.nodes.len()];
        for (consumer, node) in self.nodes.iter().enumerate() {
            let mut producers: Vec<usize> = node
                .input_resources
                .iter()
                .filter_map(|resource| writers.get(resource))
                .flatten()
                .copied()
                .filter(|&producer| producer != consumer)
                .collect();
            producers.sort_unstable();
            producers.dedup();

            for &producer in &producers {
                links[producer].output_nodes.push(consumer);
            }
            links[consumer].input_nodes = producers;
        }
        self.links = links;
    }

    /// Depth-first post-order over output links, reversed.
    ///
    /// Uses an explicit stack so arbitrarily long pass chains cannot exhaust
    /// the call stack. `on_stack` marks the current DFS path; reaching a node
    /// on it is a back edge.
    fn build_topological_order(&mut self) -> GraphResult<()> {
        let mut on_stack = vec![false; self.nodes.len()];
        let mut post_order = Vec::with_capacity(self.nodes.len());
        // (node, position of the next output link to follow)
        let mut path: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.nodes.len() {
            if self.links[root].visited {
                continue;
            }
            self.links[root].visited = true;
            on_stack[root] = true;
            path.push((root, 0));

            while let Some(top) = path.last_mut() {
                let index = top.0;
                let Some(&next) = self.links[index].output_nodes.get(top.1) else {
                    path.pop();
                    on_stack[index] = false;
                    post_order.push(index);
                    continue;
                };
                top.1 += 1;

                if on_stack[next] {
                    return Err(GraphError::CyclicDependency(self.cycle_names(&path, next)));
                }
                if !self.links[next].visited {
                    self.links[next].visited = true;
                    on_stack[next] = true;
                    path.push((next, 0));
                }
            }
        }

        post_order.reverse();
        self.order = post_order;
        Ok(())
    }

    /// Passes along the DFS path from `start` to its end, which links back to
    /// `start`.
    fn cycle_names(&self, path: &[(usize, usize)], start: usize) -> Vec<String> {
        path.iter()
            .skip_while(|&&(index, _)| index != start)
            .map(|&(index, _)| self.nodes[index].pass.label())
            .collect()
    }

    fn build_dependency_levels(&mut self) {
        for position in 0..self.order.len() {
            let index = self.order[position];
            let level = self.links[index]
                .input_nodes
                .iter()
                .map(|&input| self.nodes[input].dependency_level + 1)
                .max()
                .unwrap_or(0);
            self.nodes[index].dependency_level = level;
        }
    }

    /// Every pass that consumes, directly or transitively, an output of `pass`.
    ///
    /// Empty when the pass is unknown or the graph is not built.
    pub fn depending_passes_on(&self, pass: &P) -> Vec<P> {
        let Some(&start) = self.lookup.get(pass) else {
            return Vec::new();
        };
        if !self.built {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut pending = vec![start];
        while let Some(index) = pending.pop() {
            for &output in &self.links[index].output_nodes {
                if seen.insert(output) {
                    result.push(self.nodes[output].pass.clone());
                    pending.push(output);
                }
            }
        }
        result
    }

    /// Whether `pass` has declared any dependency.
    pub fn contains_pass(&self, pass: &P) -> bool {
        self.lookup.contains_key(pass)
    }

    /// Whether any pass reads or writes `resource`.
    pub fn contains_resource(&self, resource: &R) -> bool {
        self.nodes.iter().any(|node| {
            node.input_resources.contains(resource) || node.output_resources.contains(resource)
        })
    }

    /// The first pass, in declaration order, that writes `resource`.
    pub fn find_output_pass(&self, resource: &R) -> Option<&P> {
        self.nodes
            .iter()
            .find(|node| node.output_resources.contains(resource))
            .map(|node| &node.pass)
    }

    /// Node of `pass`, if declared.
    pub fn node(&self, pass: &P) -> Option<&Node<P, R>> {
        self.lookup.get(pass).map(|&index| &self.nodes[index])
    }

    /// Dependency level of `pass`; 0 for every pass until built.
    pub fn dependency_level(&self, pass: &P) -> Option<u32> {
        self.node(pass).map(Node::dependency_level)
    }

    /// Nodes in topological order once built, declaration order otherwise.
    pub fn nodes(&self) -> Vec<&Node<P, R>> {
        if self.built {
            self.order.iter().map(|&index| &self.nodes[index]).collect()
        } else {
            self.nodes.iter().collect()
        }
    }

    /// Passes whose outputs feed `pass`.
    pub fn input_passes(&self, pass: &P) -> Vec<&P> {
        self.linked_passes(pass, |link| &link.input_nodes)
    }

    /// Passes fed by the outputs of `pass`.
    pub fn output_passes(&self, pass: &P) -> Vec<&P> {
        self.linked_passes(pass, |link| &link.output_nodes)
    }

    fn linked_passes(&self, pass: &P, select: impl Fn(&AdjacencyLink) -> &Vec<usize>) -> Vec<&P> {
        match self.lookup.get(pass) {
            Some(&index) if self.built => select(&self.links[index])
                .iter()
                .map(|&other| &self.nodes[other].pass)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Passes grouped by dependency level. Passes inside one group have no
    /// edges between them and may be recorded in any order.
    pub fn dependency_levels(&self) -> Vec<Vec<&P>> {
        if !self.built {
            return Vec::new();
        }
        let mut levels: Vec<Vec<&P>> = vec![Vec::new(); self.level_count()];
        for &index in &self.order {
            let node = &self.nodes[index];
            levels[node.dependency_level as usize].push(&node.pass);
        }
        levels
    }

    fn level_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| node.dependency_level as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Whether the last build succeeded and nothing changed since.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Number of declared passes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no pass has been declared.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node and build result.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lookup.clear();
        self.links.clear();
        self.order.clear();
        self.built = false;
    }
}
