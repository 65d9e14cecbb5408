/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Static network topology and its core/edge classification.
//!
//! [`Topology`] is a plain directed graph over switch and host ids.
//! [`TopologyModel::classify`] splits its links into **core** links
//! (switch → switch) and **edge** links (anything touching a host) and derives
//! the host → attachment-switch map.  The model is built once, before the
//! link state is configured, and never changes afterwards.
//!
//! Adjacency is a petgraph `StableGraph`; everything the scheduler iterates
//! (node ids, links, classified link sets) is a `BTreeMap` / `BTreeSet` so
//! that iteration order is deterministic across runs.

pub mod trim;

use std::collections::{BTreeMap, BTreeSet};

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Direction;
use thiserror::Error;
use tracing::{debug, info};

use crate::flow::{Link, NodeId};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Malformed topology input.  Any of these aborts construction before
/// scheduling begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// A host has no outgoing link to any switch.
    #[error("host '{host}' has no attachment switch")]
    HostWithoutSwitch { host: NodeId },

    /// A host is attached to more than one switch.
    #[error("host '{host}' is attached to more than one switch: {switches:?}")]
    MultipleAttachments { host: NodeId, switches: Vec<NodeId> },

    /// A node named in the switch or host list does not appear in the graph.
    #[error("node '{node}' is listed but not present in the topology graph")]
    UnknownNode { node: NodeId },

    /// A node of the graph was neither listed as a switch nor as a host.
    #[error("node '{node}' is neither a switch nor a host")]
    UnknownRole { node: NodeId },

    /// A node was listed both as a switch and as a host.
    #[error("node '{node}' is listed as both a switch and a host")]
    OverlappingRoles { node: NodeId },
}

// ── Topology ──────────────────────────────────────────────────────────────────

/// Directed graph over switch and host identifiers.
///
/// Adjacency lives in a petgraph [`StableGraph`] so removals keep every other
/// index valid; `index` maps ids to graph nodes and fixes the iteration order.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    graph: StableGraph<NodeId, ()>,
    index: BTreeMap<NodeId, NodeIndex>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a directed link, adding both endpoints as nodes.  Inserting an
    /// existing link is a no-op.
    pub fn add_link(&mut self, link: Link) {
        let from = self.node_index(link.from);
        let to = self.node_index(link.to);
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Insert both directions of a link.
    pub fn add_bidirectional(&mut self, a: impl Into<NodeId>, b: impl Into<NodeId>) {
        let (a, b) = (a.into(), b.into());
        self.add_link(Link::new(a.clone(), b.clone()));
        self.add_link(Link::new(b, a));
    }

    fn node_index(&mut self, id: NodeId) -> NodeIndex {
        let graph = &mut self.graph;
        *self
            .index
            .entry(id)
            .or_insert_with_key(|id| graph.add_node(id.clone()))
    }

    /// Node ids in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.index.keys()
    }

    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Every link, ordered by `(from, to)`.
    pub fn links(&self) -> BTreeSet<Link> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| Link::new(self.graph[a].clone(), self.graph[b].clone()))
            .collect()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.index.contains_key(node)
    }

    pub fn contains_link(&self, link: &Link) -> bool {
        match (self.index.get(&link.from), self.index.get(&link.to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Links leaving `node`; empty for an unknown node.
    pub fn out_links(&self, node: &str) -> impl Iterator<Item = Link> + '_ {
        self.adjacent(node, Direction::Outgoing)
            .map(|(n, other)| Link::new(n.clone(), other.clone()))
    }

    /// Links entering `node`; empty for an unknown node.
    pub fn in_links(&self, node: &str) -> impl Iterator<Item = Link> + '_ {
        self.adjacent(node, Direction::Incoming)
            .map(|(n, other)| Link::new(other.clone(), n.clone()))
    }

    fn adjacent(
        &self,
        node: &str,
        direction: Direction,
    ) -> impl Iterator<Item = (&NodeId, &NodeId)> + '_ {
        self.index.get(node).copied().into_iter().flat_map(move |i| {
            self.graph
                .neighbors_directed(i, direction)
                .map(move |j| (&self.graph[i], &self.graph[j]))
        })
    }

    /// Distinct nodes linked to `node` in either direction, excluding itself.
    pub fn neighbours(&self, node: &str) -> BTreeSet<&NodeId> {
        let Some(&i) = self.index.get(node) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_undirected(i)
            .filter(|&j| j != i)
            .map(|j| &self.graph[j])
            .collect()
    }

    /// Remove a node together with every link incident to it.
    pub fn remove_node(&mut self, node: &str) {
        if let Some(i) = self.index.remove(node) {
            self.graph.remove_node(i);
        }
    }

    pub fn remove_link(&mut self, link: &Link) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&link.from), self.index.get(&link.to)) else {
            return false;
        };
        match self.graph.find_edge(a, b) {
            Some(e) => self.graph.remove_edge(e).is_some(),
            None => false,
        }
    }

    /// Split the node set into `(switches, hosts)` by id prefix: every node
    /// whose id starts with `host_prefix` is a host.
    pub fn split_by_host_prefix(&self, host_prefix: &str) -> (BTreeSet<NodeId>, BTreeSet<NodeId>) {
        self.index
            .keys()
            .cloned()
            .partition(|n| !n.starts_with(host_prefix))
    }
}

/// Same node ids and same links; graph indices are not compared.
impl PartialEq for Topology {
    fn eq(&self, other: &Self) -> bool {
        self.index.keys().eq(other.index.keys()) && self.links() == other.links()
    }
}

impl Eq for Topology {}

// ── TopologyModel ─────────────────────────────────────────────────────────────

/// The classified, immutable view of a [`Topology`] used by the scheduler.
#[derive(Debug, Clone)]
pub struct TopologyModel {
    topology: Topology,
    core_links: BTreeSet<Link>,
    edge_links: BTreeSet<Link>,
    host_to_switch: BTreeMap<NodeId, NodeId>,
}

impl TopologyModel {
    /// Classify `topology` given its switch and host sets.
    ///
    /// * core links: both endpoints are switches;
    /// * edge links: every other link;
    /// * host → switch: from edge links whose tail is a host.
    ///
    /// # Errors
    /// Rejects unknown or doubly-classified nodes, hosts with no attachment
    /// switch and hosts with more than one.
    pub fn classify(
        topology: Topology,
        switches: BTreeSet<NodeId>,
        hosts: BTreeSet<NodeId>,
    ) -> Result<Self, TopologyError> {
        for node in switches.iter().chain(hosts.iter()) {
            if !topology.contains_node(node) {
                return Err(TopologyError::UnknownNode { node: node.clone() });
            }
        }
        if let Some(node) = switches.intersection(&hosts).next() {
            return Err(TopologyError::OverlappingRoles { node: node.clone() });
        }
        if let Some(node) = topology
            .nodes()
            .find(|n| !switches.contains(*n) && !hosts.contains(*n))
        {
            return Err(TopologyError::UnknownRole { node: node.clone() });
        }

        let (core_links, edge_links): (BTreeSet<Link>, BTreeSet<Link>) = topology
            .links()
            .into_iter()
            .partition(|l| switches.contains(&l.from) && switches.contains(&l.to));

        let mut attachments: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for link in &edge_links {
            if hosts.contains(&link.from) && switches.contains(&link.to) {
                attachments
                    .entry(link.from.clone())
                    .or_default()
                    .push(link.to.clone());
            }
        }

        let mut host_to_switch = BTreeMap::new();
        for host in &hosts {
            match attachments.remove(host) {
                None => return Err(TopologyError::HostWithoutSwitch { host: host.clone() }),
                Some(sw) if sw.len() > 1 => {
                    return Err(TopologyError::MultipleAttachments {
                        host: host.clone(),
                        switches: sw,
                    })
                }
                Some(mut sw) => {
                    // len == 1 here
                    if let Some(s) = sw.pop() {
                        debug!(host = %host, switch = %s, "host attachment");
                        host_to_switch.insert(host.clone(), s);
                    }
                }
            }
        }

        info!(
            switches = switches.len(),
            hosts = hosts.len(),
            core_links = core_links.len(),
            edge_links = edge_links.len(),
            "topology classified"
        );

        Ok(Self {
            topology,
            core_links,
            edge_links,
            host_to_switch,
        })
    }

    /// Classify using the dataset naming convention: ids starting with `h`
    /// are hosts, everything else is a switch.
    pub fn classify_by_prefix(topology: Topology) -> Result<Self, TopologyError> {
        let (switches, hosts) = topology.split_by_host_prefix("h");
        Self::classify(topology, switches, hosts)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn core_links(&self) -> &BTreeSet<Link> {
        &self.core_links
    }

    pub fn edge_links(&self) -> &BTreeSet<Link> {
        &self.edge_links
    }

    pub fn is_core_link(&self, link: &Link) -> bool {
        self.core_links.contains(link)
    }

    /// Attachment switch of `host`, or `None` for an unknown host.
    pub fn switch_of(&self, host: &str) -> Option<&NodeId> {
        self.host_to_switch.get(host)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
