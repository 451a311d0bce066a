use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{DataForgeError, Result};
use crate::schema::catalog::SchemaCatalog;

/// Which tables a fill pass touches.
///
/// A non-empty `include` list wins; `exclude` is then ignored.
#[derive(Debug, Clone, Default)]
pub struct TableSelection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl TableSelection {
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve the selection against the catalog's tables, in sorted order.
    pub fn resolve(&self, catalog: &impl SchemaCatalog) -> Result<BTreeSet<String>> {
        let known: BTreeSet<String> = catalog.list_tables().into_iter().collect();

        let selected: BTreeSet<String> = if !self.include.is_empty() {
            if !self.exclude.is_empty() {
                tracing::warn!("Both include and exclude lists given; the exclude list is ignored");
            }
            let unknown: Vec<&str> = self
                .include
                .iter()
                .filter(|t| !known.contains(*t))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                return Err(DataForgeError::config(format!(
                    "included table(s) not found in the schema: {}",
                    unknown.join(", ")
                )));
            }
            self.include.iter().cloned().collect()
        } else {
            for table in &self.exclude {
                if !known.contains(table) {
                    tracing::warn!("Excluded table '{}' does not exist; ignoring", table);
                }
            }
            known
                .into_iter()
                .filter(|t| !self.exclude.contains(t))
                .collect()
        };

        if selected.is_empty() {
            return Err(DataForgeError::config(
                "the table selection leaves no tables to fill",
            ));
        }
        Ok(selected)
    }
}

/// Dependency relations among the selected tables.
#[derive(Debug, Clone, Default)]
pub struct Relations {
    /// Table -> referenced table -> the table's columns pointing there.
    /// Every selected table has an entry, even with no dependencies.
    pub depends_on: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Table -> nullable columns referencing a table outside the selection.
    /// They are written as NULL and add no edge.
    pub detached: BTreeMap<String, Vec<String>>,
}

impl Relations {
    /// Read foreign keys of the selected tables into a dependency map.
    ///
    /// Self-references add no edge. A NOT NULL reference to an unselected
    /// table is a configuration error; a nullable one is detached.
    pub fn build(catalog: &impl SchemaCatalog, selection: &TableSelection) -> Result<Self> {
        let selected = selection.resolve(catalog)?;
        let mut relations = Relations::default();

        for table in &selected {
            let columns = catalog.columns_of(table)?;
            let deps = relations.depends_on.entry(table.clone()).or_default();

            for fk in catalog.foreign_keys_of(table)? {
                if fk.is_self_reference(table) {
                    continue;
                }
                if selected.contains(&fk.referenced_table) {
                    deps.entry(fk.referenced_table.clone())
                        .or_default()
                        .push(fk.column.clone());
                    continue;
                }

                let nullable = columns
                    .iter()
                    .find(|c| c.name == fk.column)
                    .is_some_and(|c| c.nullable);
                if !nullable {
                    return Err(DataForgeError::config(format!(
                        "{}.{} is NOT NULL and references '{}', which is not selected for filling; \
                         select '{}' too or stop excluding it",
                        table, fk.column, fk.referenced_table, fk.referenced_table
                    )));
                }
                tracing::warn!(
                    "{}.{} references unselected table '{}'; writing NULL",
                    table,
                    fk.column,
                    fk.referenced_table
                );
                relations
                    .detached
                    .entry(table.clone())
                    .or_default()
                    .push(fk.column.clone());
            }
        }

        Ok(relations)
    }

    pub fn tables(&self) -> impl Iterator<Item = &String> {
        self.depends_on.keys()
    }

    pub fn detached_columns(&self, table: &str) -> &[String] {
        self.detached.get(table).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Directed graph with edges from referenced table to referencing table
/// ("must be filled before").
pub struct DependencyGraph {
    pub graph: DiGraph<String, EdgeInfo>,
    pub node_indices: IndexMap<String, NodeIndex>,
}

/// The columns behind one dependency edge.
#[derive(Debug, Clone)]
pub struct EdgeInfo {
    pub columns: Vec<String>,
}

impl DependencyGraph {
    /// Build from relations, leaving out edges for which `skip(referenced, referencing)` holds.
    ///
    /// Nodes are added in sorted table order so sorting is reproducible.
    pub fn build(relations: &Relations, skip: impl Fn(&str, &str) -> bool) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = IndexMap::new();

        for table in relations.tables() {
            let idx = graph.add_node(table.clone());
            node_indices.insert(table.clone(), idx);
        }

        for (referencing, deps) in &relations.depends_on {
            for (referenced, columns) in deps {
                if skip(referenced, referencing) {
                    continue;
                }
                if let (Some(&from), Some(&to)) =
                    (node_indices.get(referenced), node_indices.get(referencing))
                {
                    graph.add_edge(
                        from,
                        to,
                        EdgeInfo {
                            columns: columns.clone(),
                        },
                    );
                }
            }
        }

        Self {
            graph,
            node_indices,
        }
    }

    pub fn table_name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn node_index(&self, table_name: &str) -> Option<NodeIndex> {
        self.node_indices.get(table_name).copied()
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
