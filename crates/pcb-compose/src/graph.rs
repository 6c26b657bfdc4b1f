//! Service dependency graph using `petgraph`.
//!
//! Edges point from a dependency to its dependent, so a topological sort
//! yields the order services have to be started in.

use std::collections::{HashMap, HashSet};

use pcb_common::error::{PcbError, Result};
use pcb_common::types::ServiceName;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};

/// A dependency graph of services.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: Graph<ServiceName, ()>,
    nodes: HashMap<ServiceName, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service node, returning the existing node if already present.
    pub fn add_service(&mut self, name: &ServiceName) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        let _ = self.nodes.insert(name.clone(), idx);
        idx
    }

    /// Records that `dependent` depends on `dependency`.
    pub fn add_dependency(&mut self, dependent: &ServiceName, dependency: &ServiceName) {
        let dependent = self.add_service(dependent);
        let dependency = self.add_service(dependency);
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    /// Returns every service, dependencies before their dependents.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::CyclicDependency`] if the graph contains cycles.
    pub fn resolve_order(&self) -> Result<Vec<ServiceName>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(_cycle) => Err(PcbError::CyclicDependency {
                services: self.cycle_members(),
            }),
        }
    }

    /// Returns everything `service` needs running first, in start order.
    ///
    /// Only the services reachable from `service` are ordered, so cycles
    /// elsewhere in the project do not matter.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NotFound`] for an unknown service and
    /// [`PcbError::CyclicDependency`] if `service` or one of its
    /// dependencies is part of a cycle.
    pub fn dependencies_of(&self, service: &ServiceName) -> Result<Vec<ServiceName>> {
        let Some(&start) = self.nodes.get(service) else {
            return Err(PcbError::NotFound {
                kind: "service",
                id: service.to_string(),
            });
        };

        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut reachable = HashSet::new();
        while let Some(idx) = dfs.next(reversed) {
            let _ = reachable.insert(idx);
        }

        let mut subgraph = Self::new();
        for &idx in &reachable {
            let _ = subgraph.add_service(&self.graph[idx]);
        }
        for edge in self.graph.edge_references() {
            if reachable.contains(&edge.source()) && reachable.contains(&edge.target()) {
                subgraph.add_dependency(&self.graph[edge.target()], &self.graph[edge.source()]);
            }
        }

        Ok(subgraph
            .resolve_order()?
            .into_iter()
            .filter(|name| name != service)
            .collect())
    }

    fn cycle_members(&self) -> Vec<String> {
        let mut members: Vec<String> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || scc.iter().any(|&idx| self.graph.contains_edge(idx, idx))
            })
            .flatten()
            .filter_map(|idx| self.graph.node_weight(idx).map(ToString::to_string))
            .collect();
        members.sort();
        members
    }
}
