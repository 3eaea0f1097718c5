//! Eager-load join planning.
//!
//! [`JoinPlanner::plan`] turns an include tree into an ordered list of joins:
//!
//! - every join gets an alias derived from its path (`Project`,
//!   `Project->User`), so the same entity reached through two paths never
//!   collides;
//! - a join is INNER when its include, or any include below it, must match a
//!   row, and LEFT otherwise;
//! - sibling includes that resolve to the same association with the same
//!   filter are merged into one join, and their children are merged in turn;
//! - each filter is resolved against its own alias and entity.
//!
//! Entries are in depth-first pre-order, so a join always follows the join
//! it references.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::condition::{ColumnRef, Condition};
use crate::error::{CompileError, Result};
use crate::include::Include;
use crate::schema::{Association, Entity, Schema};

/// Join types produced by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// Rows without a match are dropped.
    Inner,
    /// Rows without a match are kept with NULLs.
    Left,
}

impl JoinType {
    /// Returns the SQL keyword for this join type.
    #[must_use]
    pub const fn sql_keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT OUTER JOIN",
        }
    }
}

/// One join of a [`JoinPlan`].
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlanEntry {
    /// Alias of the joined table.
    pub alias: String,
    /// Alias of the table this join hangs off.
    pub source_alias: String,
    /// Joined entity.
    pub entity: String,
    /// Join type.
    pub join_type: JoinType,
    /// Join condition, qualified and mapped to physical columns.
    pub on: Condition,
    /// Filter of the include, qualified by `alias`.
    pub attached_where: Option<Condition>,
    /// True for the join-table step of a many-to-many include. Such joins
    /// are not projected.
    pub through: bool,
}

impl JoinPlanEntry {
    /// Returns the alias used for projected columns: the path with `->`
    /// replaced by `.`.
    #[must_use]
    pub fn projection_prefix(&self) -> String {
        self.alias.replace("->", ".")
    }
}

/// Ordered, deduplicated joins for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    /// Alias of the root table.
    pub root_alias: String,
    /// Joins in emission order.
    pub entries: Vec<JoinPlanEntry>,
}

impl JoinPlan {
    /// Returns true when there is nothing to join.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the entry for an alias.
    #[must_use]
    pub fn entry(&self, alias: &str) -> Option<&JoinPlanEntry> {
        self.entries.iter().find(|e| e.alias == alias)
    }

    /// Returns the attached filters keyed by alias.
    #[must_use]
    pub fn filters(&self) -> BTreeMap<&str, &Condition> {
        self.entries
            .iter()
            .filter_map(|e| e.attached_where.as_ref().map(|w| (e.alias.as_str(), w)))
            .collect()
    }
}

/// Plans joins against a frozen [`Schema`].
#[derive(Debug, Clone, Copy)]
pub struct JoinPlanner<'a> {
    schema: &'a Schema,
}

impl<'a> JoinPlanner<'a> {
    /// Creates a planner.
    #[must_use]
    pub const fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Plans the joins for `includes` hanging off `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root entity is unknown, an include is
    /// malformed, or an include cannot be resolved to exactly one
    /// association.
    pub fn plan(&self, root: &str, includes: &[Include]) -> Result<JoinPlan> {
        self.schema.entity(root)?;
        includes.iter().try_for_each(Include::validate)?;

        let mut walk = Walk {
            schema: self.schema,
            root_alias: root,
            used: BTreeSet::from([String::from(root)]),
            entries: Vec::new(),
        };
        for node in walk.group(root, includes.iter())? {
            walk.emit(&node, None)?;
        }
        Ok(JoinPlan {
            root_alias: String::from(root),
            entries: walk.entries,
        })
    }
}

/// Includes merged at one path position.
struct Node<'s, 'i> {
    edge: &'s Association,
    filter: Option<&'i Condition>,
    requires_match: bool,
    children: Vec<&'i Include>,
}

impl Node<'_, '_> {
    fn is_required(&self) -> bool {
        self.requires_match || self.children.iter().any(|c| c.is_required())
    }
}

struct Walk<'s, 'r> {
    schema: &'s Schema,
    root_alias: &'r str,
    used: BTreeSet<String>,
    entries: Vec<JoinPlanEntry>,
}

impl<'s> Walk<'s, '_> {
    fn group<'i>(
        &self,
        source: &str,
        includes: impl Iterator<Item = &'i Include>,
    ) -> Result<Vec<Node<'s, 'i>>> {
        let mut nodes: Vec<Node<'s, 'i>> = Vec::new();
        for include in includes {
            let edge =
                self.schema
                    .resolve_edge(source, include.entity_name(), include.alias_name())?;
            let filter = include.filter_condition();
            match nodes
                .iter_mut()
                .find(|n| std::ptr::eq(n.edge, edge) && n.filter == filter)
            {
                Some(node) => {
                    trace!(source, association = %edge.alias, "Merged duplicate include");
                    node.requires_match |= include.requires_match();
                    node.children.extend(include.children());
                }
                None => nodes.push(Node {
                    edge,
                    filter,
                    requires_match: include.requires_match(),
                    children: include.children().iter().collect(),
                }),
            }
        }
        Ok(nodes)
    }

    fn allocate(&mut self, base: String) -> String {
        let mut candidate = base.clone();
        let mut n = 2;
        while !self.used.insert(candidate.clone()) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        candidate
    }

    fn emit(&mut self, node: &Node<'s, '_>, parent: Option<&str>) -> Result<()> {
        let edge = node.edge;
        let source = self.schema.entity(&edge.source)?;
        let target = self.schema.entity(&edge.target)?;
        let source_alias = parent.unwrap_or(self.root_alias).to_owned();
        let alias = self.allocate(match parent {
            Some(p) => format!("{p}->{}", edge.alias),
            None => edge.alias.clone(),
        });
        let join_type = if node.is_required() {
            JoinType::Inner
        } else {
            JoinType::Left
        };

        let (on, joined_from) = match &edge.through {
            Some(through) => {
                let join = self.schema.entity(&through.entity)?;
                let through_alias = self.allocate(format!("{alias}->{}", through.entity));
                let target_key = edge.target_key.as_deref().ok_or_else(|| {
                    CompileError::InvalidAssociation(format!(
                        "'{}' from '{}' has no target key",
                        edge.alias, edge.source
                    ))
                })?;
                self.push(JoinPlanEntry {
                    alias: through_alias.clone(),
                    source_alias: source_alias.clone(),
                    entity: through.entity.clone(),
                    join_type,
                    on: column(&through_alias, join, &through.foreign_key)
                        .eq_column(column(&source_alias, source, &edge.key)),
                    attached_where: None,
                    through: true,
                });
                let on = column(&alias, target, target_key)
                    .eq_column(column(&through_alias, join, &through.other_key));
                (on, through_alias)
            }
            None if edge.kind.source_owns_key() => (
                column(&alias, target, &edge.key)
                    .eq_column(column(&source_alias, source, &edge.foreign_key)),
                source_alias,
            ),
            None => (
                column(&alias, target, &edge.foreign_key)
                    .eq_column(column(&source_alias, source, &edge.key)),
                source_alias,
            ),
        };

        self.push(JoinPlanEntry {
            alias: alias.clone(),
            source_alias: joined_from,
            entity: target.name().to_owned(),
            join_type,
            on,
            attached_where: node.filter.map(|f| f.resolve(Some(&alias), Some(target))),
            through: false,
        });

        for child in self.group(&edge.target, node.children.iter().copied())? {
            self.emit(&child, Some(&alias))?;
        }
        Ok(())
    }

    fn push(&mut self, entry: JoinPlanEntry) {
        trace!(
            alias = %entry.alias,
            source = %entry.source_alias,
            join_type = ?entry.join_type,
            "Planned join"
        );
        self.entries.push(entry);
    }
}

fn column(alias: &str, entity: &Entity, attribute: &str) -> ColumnRef {
    ColumnRef::qualified(alias, entity.column_name(attribute))
}
