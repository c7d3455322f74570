// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Transitive dependency closures over the catalog.
//!
//! The catalog's `depends` lists form a directed graph that may contain
//! cycles and may point at IDs the catalog does not define. A closure is the
//! set of every ID reachable from a schema, excluding the schema itself,
//! reported in lexicographic order. Dangling IDs are part of the closure but
//! contribute no further edges.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::schema::Catalog;

/// Dependency graph built from one catalog.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl DependencyResolver {
    /// Build the dependency graph for `catalog`.
    pub fn new(catalog: &Catalog) -> Self {
        let mut resolver = Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        };

        for entry in catalog.entries() {
            let from = resolver.node(&entry.id);
            for dependency in &entry.dependencies {
                let to = resolver.node(dependency);
                resolver.graph.update_edge(from, to, ());
            }
        }

        resolver
    }

    fn node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Every ID reachable from `id` through `depends`, sorted, without `id`.
    ///
    /// Unknown IDs have an empty closure. Cycles terminate because each node
    /// is visited once.
    pub fn resolve(&self, id: &str) -> Vec<String> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };

        let mut closure = BTreeSet::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                closure.insert(self.graph[node].clone());
            }
        }

        closure.into_iter().collect()
    }

    /// Closures keyed by every ID in the graph, dangling ones included.
    pub fn resolve_all(&self) -> BTreeMap<String, Vec<String>> {
        self.index
            .keys()
            .map(|id| (id.clone(), self.resolve(id)))
            .collect()
    }
}
