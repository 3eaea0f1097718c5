//! Schema registration and association lookup.

use std::collections::BTreeMap;

use tracing::debug;

use super::association::{Association, AssociationKind, AssociationOptions, Through};
use super::{Attribute, DataType, Entity};
use crate::error::{CompileError, Result};

const IMPLICIT_PRIMARY_KEY: &str = "id";

#[derive(Debug, Clone)]
struct Declaration {
    source: String,
    kind: AssociationKind,
    target: String,
    options: AssociationOptions,
}

/// Collects entities and association declarations before freezing them into
/// a [`Schema`].
///
/// Associations are validated in [`SchemaBuilder::build`], so they may be
/// declared before the entities they connect.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    entities: Vec<Entity>,
    declarations: Vec<Declaration>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity.
    #[must_use]
    pub fn entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Declares a many-to-one association: `source` holds a foreign key to
    /// `target`.
    #[must_use]
    pub fn belongs_to(self, source: &str, target: &str, options: AssociationOptions) -> Self {
        self.associate(source, AssociationKind::BelongsTo, target, options)
    }

    /// Declares a one-to-one association: `target` holds a foreign key to
    /// `source`.
    #[must_use]
    pub fn has_one(self, source: &str, target: &str, options: AssociationOptions) -> Self {
        self.associate(source, AssociationKind::HasOne, target, options)
    }

    /// Declares a one-to-many association: `target` holds a foreign key to
    /// `source`.
    #[must_use]
    pub fn has_many(self, source: &str, target: &str, options: AssociationOptions) -> Self {
        self.associate(source, AssociationKind::HasMany, target, options)
    }

    /// Declares a many-to-many association through a join entity.
    ///
    /// Both directed edges are registered. Declaring the reverse side over
    /// the same join entity afterwards is accepted and changes nothing.
    #[must_use]
    pub fn belongs_to_many(self, source: &str, target: &str, options: AssociationOptions) -> Self {
        self.associate(source, AssociationKind::BelongsToMany, target, options)
    }

    /// Declares an association of any kind.
    #[must_use]
    pub fn associate(
        mut self,
        source: &str,
        kind: AssociationKind,
        target: &str,
        options: AssociationOptions,
    ) -> Self {
        self.declarations.push(Declaration {
            source: String::from(source),
            kind,
            target: String::from(target),
            options,
        });
        self
    }

    /// Validates every declaration and freezes the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity is registered twice, an association
    /// names an unknown entity or attribute, or two different associations
    /// share an alias on the same source.
    pub fn build(self) -> Result<Schema> {
        let mut schema = Schema {
            entities: BTreeMap::new(),
            associations: Vec::new(),
        };

        for mut entity in self.entities {
            if schema.entities.contains_key(entity.name()) {
                return Err(CompileError::DuplicateEntity(entity.name.clone()));
            }
            ensure_primary_key(&mut entity);
            schema.entities.insert(entity.name.clone(), entity);
        }

        for declaration in self.declarations {
            if declaration.kind == AssociationKind::BelongsToMany {
                schema.add_many_to_many(declaration)?;
            } else {
                schema.add_direct(declaration)?;
            }
        }

        debug!(
            entities = schema.entities.len(),
            associations = schema.associations.len(),
            "Schema built"
        );
        Ok(schema)
    }
}

/// An immutable set of entities and the association graph between them.
#[derive(Debug, Clone)]
pub struct Schema {
    entities: BTreeMap<String, Entity>,
    associations: Vec<Association>,
}

impl Schema {
    /// Creates a new schema builder.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Looks up an entity.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnknownEntity`] if no entity has this name.
    pub fn entity(&self, name: &str) -> Result<&Entity> {
        self.entities
            .get(name)
            .ok_or_else(|| CompileError::UnknownEntity(String::from(name)))
    }

    /// Returns all entities ordered by name.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Returns every association edge in declaration order.
    #[must_use]
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// Looks up the edge named `alias` on `source`.
    #[must_use]
    pub fn association(&self, source: &str, alias: &str) -> Option<&Association> {
        self.associations
            .iter()
            .find(|a| a.source == source && a.alias == alias)
    }

    /// Infers the single edge from `source` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingAssociation`] when no edge connects the
    /// two entities and [`CompileError::AmbiguousAssociation`] when several
    /// do.
    pub fn edge_between(&self, source: &str, target: &str) -> Result<&Association> {
        let candidates: Vec<&Association> = self
            .associations
            .iter()
            .filter(|a| a.source == source && a.target == target)
            .collect();
        match candidates.as_slice() {
            [] => Err(CompileError::MissingAssociation {
                source_entity: String::from(source),
                target: String::from(target),
            }),
            [edge] => Ok(*edge),
            many => Err(CompileError::AmbiguousAssociation {
                source_entity: String::from(source),
                target: String::from(target),
                candidates: many.iter().map(|a| a.alias.clone()).collect(),
            }),
        }
    }

    /// Resolves an include step: by alias when one is given, otherwise by
    /// target entity.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingAssociation`] if the alias is unknown
    /// or points at a different entity than `target`, and the errors of
    /// [`Schema::edge_between`] otherwise.
    pub fn resolve_edge(
        &self,
        source: &str,
        target: Option<&str>,
        alias: Option<&str>,
    ) -> Result<&Association> {
        match (alias, target) {
            (Some(alias), target) => self
                .association(source, alias)
                .filter(|edge| target.map_or(true, |t| edge.target == t))
                .ok_or_else(|| CompileError::MissingAssociation {
                    source_entity: String::from(source),
                    target: String::from(alias),
                }),
            (None, Some(target)) => self.edge_between(source, target),
            (None, None) => Err(CompileError::InvalidInclude(format!(
                "include under '{source}' names neither an entity nor an alias"
            ))),
        }
    }

    fn add_direct(&mut self, declaration: Declaration) -> Result<()> {
        let Declaration {
            source,
            kind,
            target,
            options,
        } = declaration;
        self.entity(&source)?;
        self.entity(&target)?;

        let (owner, referenced) = if kind.source_owns_key() {
            (source.clone(), target.clone())
        } else {
            (target.clone(), source.clone())
        };

        let alias = options.alias.unwrap_or_else(|| target.clone());
        let (key, key_type) = self.referenced_key(&referenced, options.key)?;
        let foreign_key = options.foreign_key.unwrap_or_else(|| {
            let prefix = if kind.source_owns_key() { &alias } else { &source };
            format!("{prefix}{}", upper_first(&key))
        });

        self.ensure_attribute(&owner, &foreign_key, key_type)?;
        self.insert_association(Association {
            alias,
            source,
            target,
            kind,
            foreign_key,
            key,
            target_key: None,
            through: None,
        })
    }

    fn add_many_to_many(&mut self, declaration: Declaration) -> Result<()> {
        let Declaration {
            source,
            target,
            options,
            ..
        } = declaration;
        let through = options.through.ok_or_else(|| {
            CompileError::InvalidAssociation(format!(
                "belongsToMany from '{source}' to '{target}' needs a through entity"
            ))
        })?;

        let (source_key, source_type) = self.referenced_key(&source, options.key)?;
        let (target_key, target_type) = self.referenced_key(&target, None)?;
        let foreign_key = options
            .foreign_key
            .unwrap_or_else(|| format!("{source}{}", upper_first(&source_key)));
        let other_key = options
            .other_key
            .unwrap_or_else(|| format!("{target}{}", upper_first(&target_key)));
        if foreign_key == other_key {
            return Err(CompileError::InvalidAssociation(format!(
                "'{through}' cannot use '{foreign_key}' for both sides"
            )));
        }

        if self.entities.contains_key(&through) {
            self.require_attribute(&through, &foreign_key)?;
            self.require_attribute(&through, &other_key)?;
        } else {
            let join = Entity::new(&through)
                .attribute(Attribute::new(&foreign_key, source_type).primary_key())
                .attribute(Attribute::new(&other_key, target_type).primary_key());
            debug!(entity = %through, "Created implicit join entity");
            self.entities.insert(through.clone(), join);
        }

        let forward = Association {
            alias: options.alias.unwrap_or_else(|| target.clone()),
            source: source.clone(),
            target: target.clone(),
            kind: AssociationKind::BelongsToMany,
            foreign_key: foreign_key.clone(),
            key: source_key.clone(),
            target_key: Some(target_key.clone()),
            through: Some(Through {
                entity: through.clone(),
                foreign_key: foreign_key.clone(),
                other_key: other_key.clone(),
            }),
        };
        let reverse = Association {
            alias: source.clone(),
            source: target,
            target: source,
            kind: AssociationKind::BelongsToMany,
            foreign_key: other_key.clone(),
            key: target_key,
            target_key: Some(source_key),
            through: Some(Through {
                entity: through,
                foreign_key: other_key,
                other_key: foreign_key,
            }),
        };
        self.insert_association(forward)?;
        // The reverse edge is implied; an explicit reverse declaration with
        // a different alias still wins for that alias.
        if self.association(&reverse.source, &reverse.alias).is_none() {
            self.associations.push(reverse);
        }
        Ok(())
    }

    /// Returns the referenced key name and type: the explicit key when given
    /// (which must exist), the first primary key otherwise.
    fn referenced_key(&self, entity: &str, key: Option<String>) -> Result<(String, DataType)> {
        let entity = self.entity(entity)?;
        let attribute = match key {
            Some(key) => entity.get_attribute(&key).ok_or_else(|| {
                CompileError::UnknownAttribute {
                    entity: entity.name.clone(),
                    attribute: key.clone(),
                }
            })?,
            None => entity.primary_key().next().ok_or_else(|| {
                CompileError::UnknownAttribute {
                    entity: entity.name.clone(),
                    attribute: String::from(IMPLICIT_PRIMARY_KEY),
                }
            })?,
        };
        Ok((attribute.name.clone(), attribute.data_type))
    }

    fn require_attribute(&self, entity: &str, attribute: &str) -> Result<()> {
        match self.entity(entity)?.get_attribute(attribute) {
            Some(_) => Ok(()),
            None => Err(CompileError::UnknownAttribute {
                entity: String::from(entity),
                attribute: String::from(attribute),
            }),
        }
    }

    fn ensure_attribute(
        &mut self,
        entity: &str,
        attribute: &str,
        data_type: DataType,
    ) -> Result<()> {
        let entity = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| CompileError::UnknownEntity(String::from(entity)))?;
        if entity.get_attribute(attribute).is_none() {
            debug!(entity = %entity.name, attribute, "Added foreign key attribute");
            entity.put_attribute(Attribute::new(attribute, data_type));
        }
        Ok(())
    }

    fn insert_association(&mut self, association: Association) -> Result<()> {
        match self.association(&association.source, &association.alias) {
            Some(existing) if *existing == association => Ok(()),
            Some(_) => Err(CompileError::DuplicateAssociation {
                source_entity: association.source,
                alias: association.alias,
            }),
            None => {
                self.associations.push(association);
                Ok(())
            }
        }
    }
}

fn ensure_primary_key(entity: &mut Entity) {
    if entity.primary_key().next().is_some() {
        return;
    }
    match entity
        .attributes
        .iter_mut()
        .find(|a| a.name == IMPLICIT_PRIMARY_KEY)
    {
        Some(id) => {
            id.primary_key = true;
            id.nullable = false;
        }
        None => entity.attributes.insert(
            0,
            Attribute::new(IMPLICIT_PRIMARY_KEY, DataType::Integer).primary_key(),
        ),
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog() -> SchemaBuilder {
        Schema::builder()
            .entity(Entity::new("User").attribute(Attribute::new("username", DataType::Text)))
            .entity(Entity::new("Project").attribute(Attribute::new("title", DataType::Text)))
            .entity(Entity::new("Task").attribute(Attribute::new("title", DataType::Text)))
    }

    #[test]
    fn test_implicit_primary_key() {
        let schema = blog().build().unwrap();
        let user = schema.entity("User").unwrap();
        assert_eq!(user.attributes()[0].name, "id");
        assert!(user.attributes()[0].primary_key);
    }

    #[test]
    fn test_foreign_keys_added() {
        let schema = blog()
            .has_many("User", "Project", AssociationOptions::new())
            .belongs_to("Project", "User", AssociationOptions::new())
            .build()
            .unwrap();

        let project = schema.entity("Project").unwrap();
        assert!(project.get_attribute("UserId").is_some());

        let has_many = schema.edge_between("User", "Project").unwrap();
        assert_eq!(has_many.foreign_key, "UserId");
        assert_eq!(has_many.key, "id");
        let belongs_to = schema.edge_between("Project", "User").unwrap();
        assert_eq!(belongs_to.foreign_key, "UserId");
        assert_eq!(belongs_to.kind, AssociationKind::BelongsTo);
    }

    #[test]
    fn test_missing_and_ambiguous_edges() {
        let schema = blog()
            .belongs_to("Task", "User", AssociationOptions::new().alias("Owner"))
            .belongs_to("Task", "User", AssociationOptions::new().alias("Assignee"))
            .build()
            .unwrap();

        assert_eq!(
            schema.edge_between("Task", "Project").unwrap_err(),
            CompileError::MissingAssociation {
                source_entity: String::from("Task"),
                target: String::from("Project"),
            }
        );
        match schema.edge_between("Task", "User").unwrap_err() {
            CompileError::AmbiguousAssociation { candidates, .. } => {
                assert_eq!(candidates, vec!["Owner", "Assignee"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let owner = schema.resolve_edge("Task", Some("User"), Some("Owner")).unwrap();
        assert_eq!(owner.foreign_key, "OwnerId");
        assert!(schema.resolve_edge("Task", Some("Project"), Some("Owner")).is_err());
    }

    #[test]
    fn test_edges_outlive_lookup_names() {
        let schema = blog()
            .belongs_to("Task", "User", AssociationOptions::new().alias("Owner"))
            .build()
            .unwrap();

        let (by_target, by_alias) = {
            let source = String::from("Task");
            let alias = String::from("Owner");
            (
                schema.edge_between(&source, "User").unwrap(),
                schema.association(&source, &alias).unwrap(),
            )
        };
        assert_eq!(by_target.alias, "Owner");
        assert!(core::ptr::eq(by_target, by_alias));
    }

    #[test]
    fn test_belongs_to_many_creates_join_entity() {
        let schema = blog()
            .belongs_to_many("User", "Project", AssociationOptions::new().through("user_project"))
            .build()
            .unwrap();

        let join = schema.entity("user_project").unwrap();
        let keys: Vec<&str> = join.primary_key().map(|a| a.name.as_str()).collect();
        assert_eq!(keys, vec!["UserId", "ProjectId"]);
        assert!(join.attributes().iter().all(|a| !a.nullable));

        let forward = schema.edge_between("User", "Project").unwrap();
        let through = forward.through.as_ref().unwrap();
        assert_eq!(through.foreign_key, "UserId");
        assert_eq!(through.other_key, "ProjectId");

        let reverse = schema.edge_between("Project", "User").unwrap();
        assert_eq!(reverse.through.as_ref().unwrap().foreign_key, "ProjectId");
    }

    #[test]
    fn test_reverse_belongs_to_many_is_idempotent() {
        let schema = blog()
            .belongs_to_many("User", "Project", AssociationOptions::new().through("user_project"))
            .belongs_to_many("Project", "User", AssociationOptions::new().through("user_project"))
            .build()
            .unwrap();
        assert_eq!(schema.associations().len(), 2);
    }

    #[test]
    fn test_explicit_join_entity_must_carry_keys() {
        let err = blog()
            .entity(Entity::new("membership").attribute(Attribute::new("UserId", DataType::Integer)))
            .belongs_to_many("User", "Project", AssociationOptions::new().through("membership"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownAttribute {
                entity: String::from("membership"),
                attribute: String::from("ProjectId"),
            }
        );
    }

    #[test]
    fn test_registration_errors() {
        let err = blog().entity(Entity::new("User")).build().unwrap_err();
        assert_eq!(err, CompileError::DuplicateEntity(String::from("User")));

        let err = blog()
            .has_many("User", "Ghost", AssociationOptions::new())
            .build()
            .unwrap_err();
        assert_eq!(err, CompileError::UnknownEntity(String::from("Ghost")));

        let err = blog()
            .has_many("User", "Task", AssociationOptions::new().key("uuid"))
            .build()
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownAttribute { .. }));

        let err = blog()
            .belongs_to("Task", "User", AssociationOptions::new().alias("Owner"))
            .belongs_to("Task", "Project", AssociationOptions::new().alias("Owner"))
            .build()
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateAssociation { .. }));

        let err = blog()
            .belongs_to_many("User", "Project", AssociationOptions::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidAssociation(_)));
    }

    #[test]
    fn test_upper_first() {
        assert_eq!(upper_first("id"), "Id");
        assert_eq!(upper_first(""), "");
    }
}
