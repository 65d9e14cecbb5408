/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pre-optimisation topology reduction.
//!
//! Two passes shrink the graph handed to the route optimizer without changing
//! the set of feasible multicast trees:
//!
//! 1. **Dead ends** – nodes whose links all go to at most one distinct
//!    neighbour and that are neither the source nor a destination.  A route
//!    entering such a node could only leave back to where it came from, so
//!    no tree passes through it.  A transit node of a one-way ring has two
//!    distinct neighbours and stays.  Nodes are visited once in id order;
//!    each node's neighbours are read from the graph as already trimmed, so a
//!    chain of dead ends collapses from its lower-id end.
//! 2. **Useless directions** – links leaving a destination or entering the
//!    source.  Destinations have zero outflow and the source zero inflow in
//!    every feasible solution, so these links can never carry load.

use std::collections::BTreeSet;

use tracing::debug;

use super::Topology;
use crate::flow::{Link, NodeId};

/// Return a trimmed copy of `topology` for a flow from `source` to
/// `destinations`.  The source and destinations are never removed.
pub fn trim_for_flow(topology: &Topology, source: &str, destinations: &BTreeSet<NodeId>) -> Topology {
    let mut trimmed = topology.clone();

    let candidates: Vec<NodeId> = trimmed.nodes().cloned().collect();
    let mut removed_nodes = 0usize;
    for node in candidates {
        if node == source || destinations.contains(&node) {
            continue;
        }
        if trimmed.neighbours(&node).len() <= 1 {
            trimmed.remove_node(&node);
            removed_nodes += 1;
        }
    }

    let useless: Vec<Link> = trimmed
        .links()
        .into_iter()
        .filter(|l| destinations.contains(&l.from) || l.to == source)
        .collect();
    for link in &useless {
        trimmed.remove_link(link);
    }

    debug!(
        source,
        removed_nodes,
        removed_links = useless.len(),
        remaining_nodes = trimmed.node_count(),
        remaining_links = trimmed.link_count(),
        "topology trimmed"
    );

    trimmed
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn dsts(items: &[&str]) -> BTreeSet<NodeId> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// ```text
    ///   h0 ─ s0 ═ s1 ─ h1
    ///         ║    ║
    ///         s2 ═ s3 ─ h3
    ///              ║
    ///              s4          (dead-end switch)
    /// ```
    fn square_with_spur() -> Topology {
        let mut t = Topology::new();
        t.add_bidirectional("h0", "s0");
        t.add_bidirectional("h1", "s1");
        t.add_bidirectional("h3", "s3");
        t.add_bidirectional("s0", "s1");
        t.add_bidirectional("s0", "s2");
        t.add_bidirectional("s1", "s3");
        t.add_bidirectional("s2", "s3");
        t.add_bidirectional("s3", "s4");
        t
    }

    #[test]
    fn removes_unused_hosts_and_dead_end_switches() {
        let t = trim_for_flow(&square_with_spur(), "h0", &dsts(&["h1"]));
        assert!(!t.contains_node("h3"), "idle host must be trimmed");
        assert!(!t.contains_node("s4"), "dead-end switch must be trimmed");
        assert!(t.contains_node("s2"), "switches on a cycle stay");
    }

    #[test]
    fn never_removes_source_or_destinations() {
        let t = trim_for_flow(&square_with_spur(), "h0", &dsts(&["h1", "h3"]));
        for n in ["h0", "h1", "h3"] {
            assert!(t.contains_node(n), "{n} must survive trimming");
        }
    }

    #[test]
    fn removes_links_out_of_destinations_and_into_source() {
        let t = trim_for_flow(&square_with_spur(), "h0", &dsts(&["h1"]));
        assert!(!t.contains_link(&Link::new("s0", "h0")));
        assert!(!t.contains_link(&Link::new("h1", "s1")));
        assert!(t.contains_link(&Link::new("h0", "s0")));
        assert!(t.contains_link(&Link::new("s1", "h1")));
    }

    /// One-way ring `s0 → s1 → s2 → s0`, hosts attached both ways to `s0`
    /// and `s2`.
    fn one_way_ring() -> Topology {
        let mut t = Topology::new();
        t.add_link(Link::new("s0", "s1"));
        t.add_link(Link::new("s1", "s2"));
        t.add_link(Link::new("s2", "s0"));
        t.add_bidirectional("h0", "s0");
        t.add_bidirectional("h2", "s2");
        t
    }

    #[test]
    fn one_way_transit_switch_is_kept() {
        let t = trim_for_flow(&one_way_ring(), "h0", &dsts(&["h2"]));
        assert!(t.contains_node("s1"), "s1 is the only way from s0 to s2");
        assert!(t.contains_link(&Link::new("s0", "s1")));
        assert!(t.contains_link(&Link::new("s1", "s2")));
    }

    #[test]
    fn one_way_stub_is_still_a_dead_end() {
        let mut ring = one_way_ring();
        ring.add_link(Link::new("s1", "s3"));
        let t = trim_for_flow(&ring, "h0", &dsts(&["h2"]));
        assert!(!t.contains_node("s3"));
    }

    #[test]
    fn input_topology_is_untouched() {
        let topo = square_with_spur();
        let before = topo.clone();
        let _ = trim_for_flow(&topo, "h0", &dsts(&["h1"]));
        assert_eq!(topo, before);
    }
}
