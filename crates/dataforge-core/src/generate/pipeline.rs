//! # Value Generation Pipeline
//!
//! Resolves one value for one column. Stages run in order and the first one
//! that produces a value wins:
//!
//! 1. **Rules.** The rule list for the column's kind (field or foreign) is
//!    scanned in order. A rule applies when it matches and its generator
//!    yields a value that is neither NULL nor an empty string. Text longer
//!    than the column's declared length is truncated. For unique columns a
//!    colliding value is regenerated, up to `max_unique_retries` attempts in
//!    total.
//! 2. **Referential selection.** Foreign keys pick from the referenced
//!    column's current values, minus used ones when the column is unique.
//! 3. **Nullable fallback.** Nullable columns get NULL.
//! 4. Otherwise the column is unsupported and the pass stops.
//!
//! Database-assigned columns never reach the pipeline; the row builder
//! leaves them out.

use indexmap::{IndexMap, IndexSet};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{DataForgeError, ExhaustionReason, Result};
use crate::generate::pool::ReferentialValuePool;
use crate::generate::providers::weighted_pick;
use crate::generate::rules::RuleSet;
use crate::generate::value::Value;
use crate::schema::catalog::TableSnapshot;
use crate::schema::types::Column;

/// Attempts a rule gets to produce an unused value for a unique column.
pub const DEFAULT_MAX_UNIQUE_RETRIES: usize = 30;

/// What the fill order adds to a table's schema for row building.
#[derive(Debug, Clone, Default)]
pub struct RowPlan {
    /// Nullable references to unselected tables; always NULL.
    pub detached: Vec<String>,
    /// References whose target is not filled before this table (self
    /// references and edges broken to resolve a cycle). When nullable they
    /// fall back to NULL while the target is still empty.
    pub late_references: Vec<String>,
}

pub struct ValueGenerationPipeline<'a> {
    rules: &'a RuleSet,
    rng: StdRng,
    max_unique_retries: usize,
}

impl<'a> ValueGenerationPipeline<'a> {
    pub fn new(rules: &'a RuleSet, seed: u64) -> Self {
        Self {
            rules,
            rng: StdRng::seed_from_u64(seed),
            max_unique_retries: DEFAULT_MAX_UNIQUE_RETRIES,
        }
    }

    pub fn with_max_unique_retries(mut self, attempts: usize) -> Self {
        self.max_unique_retries = attempts.max(1);
        self
    }

    /// Build one full row for `table`.
    ///
    /// Values assigned to unique columns are recorded in the pool before the
    /// next column runs.
    pub fn build_row(
        &mut self,
        table: &TableSnapshot,
        pool: &mut ReferentialValuePool,
        plan: &RowPlan,
    ) -> Result<IndexMap<String, Value>> {
        let mut row = IndexMap::with_capacity(table.columns.len());

        for column in &table.columns {
            if column.is_database_assigned() {
                continue;
            }
            let value = if plan.detached.contains(&column.name) {
                Value::Null
            } else {
                match self.resolve(table, column, pool) {
                    Err(DataForgeError::ConstraintExhausted {
                        reason: ExhaustionReason::ReferencedEmpty { .. },
                        ..
                    }) if column.nullable && plan.late_references.contains(&column.name) => {
                        Value::Null
                    }
                    other => other?,
                }
            };
            if table.is_unique(&column.name) {
                pool.record_assigned(&table.name, &column.name, &value);
            }
            row.insert(column.name.clone(), value);
        }

        Ok(row)
    }

    /// Resolve a single column's value.
    pub fn resolve(
        &mut self,
        table: &TableSnapshot,
        column: &Column,
        pool: &ReferentialValuePool,
    ) -> Result<Value> {
        let is_unique = table.is_unique(&column.name);
        let mut tried: IndexSet<String> = IndexSet::new();

        if let Some(value) = self.from_rules(table, column, pool, is_unique, &mut tried)? {
            return Ok(value);
        }

        if let Some(fk) = table.foreign_key(&column.name) {
            let mut referenced = pool
                .referenced_values(&fk.referenced_table, &fk.referenced_column)
                .peekable();

            if referenced.peek().is_none() {
                return Err(DataForgeError::ConstraintExhausted {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    reason: ExhaustionReason::ReferencedEmpty {
                        referenced_table: fk.referenced_table.clone(),
                        referenced_column: fk.referenced_column.clone(),
                    },
                });
            }

            let candidates: Vec<&Value> = referenced
                .filter(|v| {
                    !is_unique
                        || (!pool.is_used(&table.name, &column.name, v)
                            && !tried.contains(&v.column_key(column)))
                })
                .collect();

            return match weighted_pick(&candidates, None, &mut self.rng) {
                Some(v) => Ok((*v).clone()),
                None => Err(DataForgeError::ConstraintExhausted {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    reason: ExhaustionReason::ReferencesUsedUp {
                        referenced_table: fk.referenced_table.clone(),
                        referenced_column: fk.referenced_column.clone(),
                    },
                }),
            };
        }

        if column.nullable {
            return Ok(Value::Null);
        }

        Err(DataForgeError::GenerationUnsupported {
            table: table.name.clone(),
            column: column.name.clone(),
            data_type: column.data_type.to_string(),
        })
    }

    /// Stage 1. `Ok(None)` means no rule applied.
    fn from_rules(
        &mut self,
        table: &TableSnapshot,
        column: &Column,
        pool: &ReferentialValuePool,
        is_unique: bool,
        tried: &mut IndexSet<String>,
    ) -> Result<Option<Value>> {
        let Some(first) = self.apply_rules(table, column) else {
            return Ok(None);
        };
        if !is_unique {
            return Ok(Some(first));
        }

        let mut value = first;
        for attempt in 1..=self.max_unique_retries {
            let unique_key = value.column_key(column);
            if !pool.is_used(&table.name, &column.name, &value) && !tried.contains(&unique_key) {
                return Ok(Some(value));
            }
            tried.insert(unique_key);
            if attempt == self.max_unique_retries {
                break;
            }
            match self.apply_rules(table, column) {
                Some(next) => value = next,
                None => return Ok(None),
            }
        }

        tracing::debug!(
            "{}.{}: gave up after {} colliding values",
            table.name,
            column.name,
            self.max_unique_retries
        );
        Err(DataForgeError::ConstraintExhausted {
            table: table.name.clone(),
            column: column.name.clone(),
            reason: ExhaustionReason::UniqueRetries {
                attempts: self.max_unique_retries,
            },
        })
    }

    /// First matching rule with a non-empty result, truncated to the column length.
    fn apply_rules(&mut self, table: &TableSnapshot, column: &Column) -> Option<Value> {
        let is_foreign_key = table.foreign_key(&column.name).is_some();
        for rule in self.rules.for_column(is_foreign_key) {
            if !rule.matches(&table.name, column) {
                continue;
            }
            match rule.generator.generate(column, &mut self.rng) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) if s.is_empty() => continue,
                Some(value) => {
                    return Some(match column.max_length {
                        Some(max) => value.truncated(max as usize),
                        None => value,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::rules::{Generator, SpecialFieldRule};
    use crate::schema::catalog::ForeignKeyRef;
    use crate::schema::types::DataType;

    fn snapshot(name: &str, columns: Vec<Column>) -> TableSnapshot {
        TableSnapshot {
            name: name.to_string(),
            columns,
            foreign_keys: IndexMap::new(),
            unique_columns: Vec::new(),
        }
    }

    fn text_col(name: &str) -> Column {
        Column::new(name.to_string(), DataType::VarChar, "varchar".to_string())
    }

    fn literal(pattern: &str, value: &str) -> SpecialFieldRule {
        SpecialFieldRule::for_name(pattern, Generator::Literal(Value::text(value)))
    }

    #[test]
    fn test_first_applicable_rule_wins() {
        let rules = RuleSet {
            field: vec![
                SpecialFieldRule::for_name("code", Generator::custom(|_, _| None)),
                literal("code", "second"),
                literal("code", "third"),
            ],
            foreign: vec![],
        };
        let table = snapshot("coupons", vec![text_col("code")]);
        let pool = ReferentialValuePool::new();
        let mut pipeline = ValueGenerationPipeline::new(&rules, 1);

        let value = pipeline.resolve(&table, &table.columns[0], &pool).unwrap();
        assert_eq!(value.as_string(), Some("second"));
    }

    #[test]
    fn test_rule_text_truncated_to_column_length() {
        let rules = RuleSet {
            field: vec![literal("sku", "ABCDEFGHIJ")],
            foreign: vec![],
        };
        let table = snapshot("items", vec![text_col("sku").with_max_length(4)]);
        let pool = ReferentialValuePool::new();
        let mut pipeline = ValueGenerationPipeline::new(&rules, 1);

        let value = pipeline.resolve(&table, &table.columns[0], &pool).unwrap();
        assert_eq!(value.as_string(), Some("ABCD"));
    }

    #[test]
    fn test_empty_string_falls_through_to_next_rule() {
        let rules = RuleSet {
            field: vec![literal("note", ""), literal("note", "second")],
            foreign: vec![],
        };
        let table = snapshot("t", vec![text_col("note").not_null()]);
        let pool = ReferentialValuePool::new();
        let mut pipeline = ValueGenerationPipeline::new(&rules, 1);

        let value = pipeline.resolve(&table, &table.columns[0], &pool).unwrap();
        assert_eq!(value.as_string(), Some("second"));

        // With nothing after it, an empty result leaves the column unsupported
        let only_empty = RuleSet {
            field: vec![literal("note", "")],
            foreign: vec![],
        };
        let mut pipeline = ValueGenerationPipeline::new(&only_empty, 1);
        let err = pipeline
            .resolve(&table, &table.columns[0], &pool)
            .unwrap_err();
        assert!(matches!(err, DataForgeError::GenerationUnsupported { .. }));
    }

    #[test]
    fn test_nullable_fallback_and_unsupported() {
        let rules = RuleSet::new();
        let geometry = Column::new(
            "shape".to_string(),
            DataType::Unknown("geometry".to_string()),
            "geometry".to_string(),
        );
        let table = snapshot("maps", vec![geometry.clone(), geometry.not_null()]);
        let pool = ReferentialValuePool::new();
        let mut pipeline = ValueGenerationPipeline::new(&rules, 1);

        let nullable = pipeline.resolve(&table, &table.columns[0], &pool).unwrap();
        assert!(nullable.is_null());

        let err = pipeline
            .resolve(&table, &table.columns[1], &pool)
            .unwrap_err();
        match err {
            DataForgeError::GenerationUnsupported {
                table,
                column,
                data_type,
            } => {
                assert_eq!(table, "maps");
                assert_eq!(column, "shape");
                assert_eq!(data_type, "geometry");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_foreign_rule_overrides_reference() {
        let rules = RuleSet {
            field: vec![],
            foreign: vec![literal("role_id", "fixed-role")],
        };
        let mut table = snapshot("users", vec![text_col("role_id").not_null()]);
        table.foreign_keys.insert(
            "role_id".to_string(),
            ForeignKeyRef {
                column: "role_id".to_string(),
                referenced_table: "roles".to_string(),
                referenced_column: "id".to_string(),
            },
        );
        let pool = ReferentialValuePool::new();
        let mut pipeline = ValueGenerationPipeline::new(&rules, 1);

        let value = pipeline.resolve(&table, &table.columns[0], &pool).unwrap();
        assert_eq!(value.as_string(), Some("fixed-role"));
    }

    #[test]
    fn test_empty_referent_is_null_only_for_late_references() {
        let rules = RuleSet::new();
        let mut table = snapshot("employees", vec![text_col("manager_id")]);
        table.foreign_keys.insert(
            "manager_id".to_string(),
            ForeignKeyRef {
                column: "manager_id".to_string(),
                referenced_table: "employees".to_string(),
                referenced_column: "id".to_string(),
            },
        );
        let mut pool = ReferentialValuePool::new();
        let mut pipeline = ValueGenerationPipeline::new(&rules, 1);

        let err = pipeline
            .build_row(&table, &mut pool, &RowPlan::default())
            .unwrap_err();
        assert!(matches!(
            err,
            DataForgeError::ConstraintExhausted {
                reason: ExhaustionReason::ReferencedEmpty { .. },
                ..
            }
        ));

        let plan = RowPlan {
            detached: vec![],
            late_references: vec!["manager_id".to_string()],
        };
        let row = pipeline.build_row(&table, &mut pool, &plan).unwrap();
        assert!(row["manager_id"].is_null());
    }

    #[test]
    fn test_build_row_skips_database_assigned_and_detached() {
        let rules = RuleSet {
            field: vec![literal("title", "hello")],
            foreign: vec![],
        };
        let table = snapshot(
            "posts",
            vec![
                Column::new("id".to_string(), DataType::Serial, "serial".to_string()),
                text_col("title"),
                text_col("editor_id"),
            ],
        );
        let mut pool = ReferentialValuePool::new();
        let mut pipeline = ValueGenerationPipeline::new(&rules, 1);

        let plan = RowPlan {
            detached: vec!["editor_id".to_string()],
            late_references: vec![],
        };
        let row = pipeline.build_row(&table, &mut pool, &plan).unwrap();
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["title", "editor_id"]);
        assert!(row["editor_id"].is_null());
    }
}
