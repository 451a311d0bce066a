//! # Fill Order and Cycle Resolution
//!
//! The fill order is a topological sort of the dependency graph. When the
//! graph has a cycle, the tables on any cycle (the members of every strongly
//! connected component larger than one node) are handed to an
//! `OrderingSource`, which returns them as a ranked list. Edges between two
//! ranked tables that point backwards relative to that ranking are dropped,
//! and the pruned graph is sorted again. If that second sort fails the
//! resolver itself is broken and the pass stops with `CycleInternal`.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::{tarjan_scc, toposort};

use crate::error::{DataForgeError, Result};
use crate::graph::dag::{DependencyGraph, Relations};

/// Supplies a total order over the tables caught in a cycle.
///
/// The response must be a permutation of `candidates`: same names, no
/// additions or omissions.
pub trait OrderingSource {
    fn resolve_order(&mut self, candidates: &BTreeSet<String>) -> Result<Vec<String>>;
}

impl<F> OrderingSource for F
where
    F: FnMut(&BTreeSet<String>) -> Result<Vec<String>>,
{
    fn resolve_order(&mut self, candidates: &BTreeSet<String>) -> Result<Vec<String>> {
        self(candidates)
    }
}

/// A preference list decided ahead of time (`[graph] cycle_order`).
///
/// Only the candidates are taken from the list, in list order; the list may
/// name other tables too. A candidate missing from the list is an error.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredOrder {
    order: Vec<String>,
}

impl ConfiguredOrder {
    pub fn new(order: Vec<String>) -> Self {
        Self { order }
    }
}

impl OrderingSource for ConfiguredOrder {
    fn resolve_order(&mut self, candidates: &BTreeSet<String>) -> Result<Vec<String>> {
        let missing: Vec<&str> = candidates
            .iter()
            .filter(|c| !self.order.contains(*c))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(DataForgeError::config(format!(
                "the dependency graph has a cycle through [{}], but cycle_order does not rank: {}",
                join(candidates),
                missing.join(", ")
            )));
        }

        let mut seen = BTreeSet::new();
        Ok(self
            .order
            .iter()
            .filter(|t| candidates.contains(*t) && seen.insert(t.as_str()))
            .cloned()
            .collect())
    }
}

/// An edge dropped to break a cycle: `referencing` no longer waits for `referenced`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenEdge {
    pub referenced: String,
    pub referencing: String,
    pub columns: Vec<String>,
}

/// The resolved linear order of a fill pass.
#[derive(Debug, Clone, Default)]
pub struct FillOrder {
    pub tables: Vec<String>,
    /// Tables that formed cycles, empty when the graph was acyclic.
    pub cycle_tables: BTreeSet<String>,
    pub broken_edges: Vec<BrokenEdge>,
}

impl FillOrder {
    pub fn position(&self, table: &str) -> Option<usize> {
        self.tables.iter().position(|t| t == table)
    }
}

/// Sort the tables of `relations`, resolving cycles through `ordering`.
///
/// `on_cycle` sees the candidate set before the ordering source is asked.
pub fn resolve_fill_order(
    relations: &Relations,
    ordering: &mut dyn OrderingSource,
    on_cycle: Option<&dyn Fn(&BTreeSet<String>)>,
) -> Result<FillOrder> {
    let graph = DependencyGraph::build(relations, |_, _| false);
    if let Some(tables) = sorted(&graph) {
        tracing::debug!("Fill order: {}", tables.join(" -> "));
        return Ok(FillOrder {
            tables,
            ..FillOrder::default()
        });
    }

    let candidates = cycle_members(&graph);
    tracing::info!("Dependency cycle among: {}", join(&candidates));
    if let Some(cb) = on_cycle {
        cb(&candidates);
    }

    let response = ordering.resolve_order(&candidates)?;
    let rank = check_permutation(&candidates, &response)?;

    let is_backward = |from: &str, to: &str| match (rank.get(from), rank.get(to)) {
        (Some(f), Some(t)) => f > t,
        _ => false,
    };

    let broken_edges: Vec<BrokenEdge> = relations
        .depends_on
        .iter()
        .flat_map(|(referencing, deps)| {
            deps.iter()
                .filter(|(referenced, _)| is_backward(referenced.as_str(), referencing.as_str()))
                .map(|(referenced, columns)| BrokenEdge {
                    referenced: referenced.clone(),
                    referencing: referencing.clone(),
                    columns: columns.clone(),
                })
        })
        .collect();

    let pruned = DependencyGraph::build(relations, is_backward);
    let Some(tables) = sorted(&pruned) else {
        return Err(DataForgeError::CycleInternal {
            tables: join(&cycle_members(&pruned)),
        });
    };

    for edge in &broken_edges {
        tracing::debug!(
            "Broke edge {} -> {} ({})",
            edge.referenced,
            edge.referencing,
            edge.columns.join(", ")
        );
    }
    tracing::debug!("Fill order: {}", tables.join(" -> "));

    Ok(FillOrder {
        tables,
        cycle_tables: candidates,
        broken_edges,
    })
}

fn sorted(graph: &DependencyGraph) -> Option<Vec<String>> {
    toposort(&graph.graph, None).ok().map(|indices| {
        indices
            .into_iter()
            .map(|idx| graph.table_name(idx).to_string())
            .collect()
    })
}

/// Union of all tables that sit on at least one cycle.
fn cycle_members(graph: &DependencyGraph) -> BTreeSet<String> {
    tarjan_scc(&graph.graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .flatten()
        .map(|idx| graph.table_name(idx).to_string())
        .collect()
}

/// Validate an ordering response and turn it into ranks.
fn check_permutation(
    candidates: &BTreeSet<String>,
    response: &[String],
) -> Result<BTreeMap<String, usize>> {
    let mut rank = BTreeMap::new();
    for (i, table) in response.iter().enumerate() {
        if !candidates.contains(table) {
            return Err(DataForgeError::config(format!(
                "cycle ordering named '{}', which is not one of: {}",
                table,
                join(candidates)
            )));
        }
        if rank.insert(table.clone(), i).is_some() {
            return Err(DataForgeError::config(format!(
                "cycle ordering named '{}' more than once",
                table
            )));
        }
    }
    if rank.len() != candidates.len() {
        let missing: Vec<&str> = candidates
            .iter()
            .filter(|c| !rank.contains_key(*c))
            .map(String::as_str)
            .collect();
        return Err(DataForgeError::config(format!(
            "cycle ordering left out: {}",
            missing.join(", ")
        )));
    }
    Ok(rank)
}

fn join(tables: &BTreeSet<String>) -> String {
    tables.iter().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relations(edges: &[(&str, &str)], isolated: &[&str]) -> Relations {
        let mut relations = Relations::default();
        for table in isolated {
            relations.depends_on.entry(table.to_string()).or_default();
        }
        for (referencing, referenced) in edges {
            relations
                .depends_on
                .entry(referenced.to_string())
                .or_default();
            relations
                .depends_on
                .entry(referencing.to_string())
                .or_default()
                .entry(referenced.to_string())
                .or_default()
                .push(format!("{}_id", referenced));
        }
        relations
    }

    fn never_called(_: &BTreeSet<String>) -> Result<Vec<String>> {
        panic!("ordering source must not be consulted for an acyclic graph")
    }

    #[test]
    fn test_acyclic_order_keeps_isolated_tables() {
        let rel = relations(&[("b", "a"), ("c", "b")], &["lonely"]);
        let order = resolve_fill_order(&rel, &mut never_called, None).unwrap();

        assert_eq!(order.tables.len(), 4);
        assert!(order.position("a") < order.position("b"));
        assert!(order.position("b") < order.position("c"));
        assert!(order.position("lonely").is_some());
        assert!(order.broken_edges.is_empty());
        assert!(order.cycle_tables.is_empty());
    }

    #[test]
    fn test_cycle_candidates_are_every_cycle_member() {
        // a <-> b and c -> d -> e -> c, plus f hanging off the first cycle
        let rel = relations(
            &[("a", "b"), ("b", "a"), ("c", "e"), ("d", "c"), ("e", "d"), ("f", "a")],
            &[],
        );
        let mut asked = BTreeSet::new();
        let mut source = |c: &BTreeSet<String>| -> Result<Vec<String>> {
            asked = c.clone();
            Ok(c.iter().cloned().collect())
        };
        let order = resolve_fill_order(&rel, &mut source, None).unwrap();

        let expected: BTreeSet<String> =
            ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        assert_eq!(asked, expected);
        assert_eq!(order.tables.len(), 6);
        assert!(order.position("a") < order.position("f"));
    }

    #[test]
    fn test_configured_order_picks_candidates_in_list_order() {
        let rel = relations(&[("a", "b"), ("b", "a")], &[]);
        let mut source = ConfiguredOrder::new(vec![
            "unrelated".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);
        let order = resolve_fill_order(&rel, &mut source, None).unwrap();

        assert_eq!(order.tables, vec!["b", "a"]);
        assert_eq!(order.broken_edges.len(), 1);
        assert_eq!(order.broken_edges[0].referenced, "a");
        assert_eq!(order.broken_edges[0].referencing, "b");
    }

    #[test]
    fn test_configured_order_must_rank_every_candidate() {
        let rel = relations(&[("a", "b"), ("b", "a")], &[]);
        let mut source = ConfiguredOrder::new(vec!["a".to_string()]);
        let err = resolve_fill_order(&rel, &mut source, None).unwrap_err();
        assert!(matches!(err, DataForgeError::Configuration { .. }));
    }

    #[test]
    fn test_response_must_be_a_permutation() {
        let rel = relations(&[("a", "b"), ("b", "a")], &[]);

        let mut extra = |_: &BTreeSet<String>| -> Result<Vec<String>> {
            Ok(vec!["a".to_string(), "b".to_string(), "z".to_string()])
        };
        assert!(resolve_fill_order(&rel, &mut extra, None).is_err());

        let mut dup = |_: &BTreeSet<String>| -> Result<Vec<String>> {
            Ok(vec!["a".to_string(), "a".to_string()])
        };
        assert!(resolve_fill_order(&rel, &mut dup, None).is_err());

        let mut short = |_: &BTreeSet<String>| -> Result<Vec<String>> {
            Ok(vec!["b".to_string()])
        };
        assert!(resolve_fill_order(&rel, &mut short, None).is_err());
    }

    #[test]
    fn test_on_cycle_hook_sees_candidates() {
        let rel = relations(&[("a", "b"), ("b", "a")], &[]);
        let seen = std::cell::RefCell::new(Vec::new());
        let hook = |c: &BTreeSet<String>| seen.borrow_mut().extend(c.iter().cloned());
        let mut source =
            |c: &BTreeSet<String>| -> Result<Vec<String>> { Ok(c.iter().cloned().collect()) };

        resolve_fill_order(&rel, &mut source, Some(&hook)).unwrap();
        assert_eq!(*seen.borrow(), vec!["a", "b"]);
    }
}
