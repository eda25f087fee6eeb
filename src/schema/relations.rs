//! Relation resolution
//!
//! Every declared relation entry becomes a [`Relation`] with both join fields
//! resolved. An entry either declares its join columns itself, or it is the
//! inverse of exactly one entry on the referenced model that does. In the
//! second case the inverse's columns are used with local and foreign swapped:
//!
//! ```text
//! posts.author -> users   fields [author_id]  references [id]
//! users.posts  -> posts   (inferred)          local id, foreign author_id
//! ```
//!
//! Resolution is a flat pass over the declarations with direct lookups into
//! the already extracted models, so self-referencing and mutually referencing
//! tables resolve without walking relation edges.

use std::collections::BTreeMap;

use tracing::debug;

use super::declaration::{RelationDeclarationSet, RelationEntry};
use super::error::SchemaError;
use super::model::{Model, Relation};
use super::types::RelationKind;

/// Resolve every declared relation and attach it to its owning model.
///
/// Nothing is attached unless every relation resolves.
pub fn resolve_relations(
    models: &mut [Model],
    declarations: &BTreeMap<String, RelationDeclarationSet>,
) -> Result<(), SchemaError> {
    let resolved = RelationResolver::new(models, declarations)?.resolve_all()?;

    for relation in resolved {
        models[relation.owner.index()].relations.push(relation);
    }

    Ok(())
}

/// Relation entries of one model, merged from every declaration key naming it.
type EntrySet<'a> = BTreeMap<&'a str, &'a RelationEntry>;

struct RelationResolver<'a> {
    models: &'a [Model],
    /// Indexed by model id.
    sets: Vec<EntrySet<'a>>,
}

/// Join columns of one side: (column on the declaring table, column on the referenced table).
type JoinColumns<'a> = (&'a str, &'a str);

impl<'a> RelationResolver<'a> {
    /// Group the declaration sets by the model their key resolves to.
    ///
    /// A set may be keyed by model name or storage table name. Two keys naming
    /// the same model merge, and a relation field declared under both is a
    /// duplicate.
    fn new(
        models: &'a [Model],
        declarations: &'a BTreeMap<String, RelationDeclarationSet>,
    ) -> Result<Self, SchemaError> {
        let mut resolver = Self {
            models,
            sets: vec![EntrySet::new(); models.len()],
        };

        for (owner_name, entries) in declarations {
            let owner = resolver.find_model(owner_name).ok_or_else(|| SchemaError::UnknownModel {
                name: owner_name.clone(),
                referenced_by: "relation declarations".to_owned(),
            })?;

            let set = &mut resolver.sets[owner.id.index()];
            for (field_name, entry) in entries {
                if owner.has_field(field_name) || set.insert(field_name.as_str(), entry).is_some() {
                    return Err(SchemaError::DuplicateField {
                        model: owner.name.clone(),
                        field: field_name.clone(),
                    });
                }
            }
        }

        Ok(resolver)
    }

    fn resolve_all(&self) -> Result<Vec<Relation>, SchemaError> {
        let mut resolved = Vec::new();

        for (owner, entries) in self.models.iter().zip(&self.sets) {
            for (field_name, entry) in entries {
                let relation = self.resolve_entry(owner, field_name, entry)?;
                debug!(
                    model = %owner.name,
                    relation = %relation.field_name,
                    kind = %relation.kind,
                    foreign = %self.models[relation.foreign_model.index()].name,
                    local_field = %relation.local_field,
                    foreign_field = %relation.foreign_field,
                    "Resolved relation"
                );
                resolved.push(relation);
            }
        }

        Ok(resolved)
    }

    /// Look a model up by logical name first, then by storage table name.
    fn find_model(&self, name: &str) -> Option<&'a Model> {
        let models = self.models;
        models
            .iter()
            .find(|m| m.name == name)
            .or_else(|| models.iter().find(|m| m.table_name == name))
    }

    fn resolve_entry(
        &self,
        owner: &Model,
        field_name: &str,
        entry: &RelationEntry,
    ) -> Result<Relation, SchemaError> {
        let foreign = self.find_model(&entry.table).ok_or_else(|| SchemaError::UnknownModel {
            name: entry.table.clone(),
            referenced_by: format!("{}.{}", owner.name, field_name),
        })?;

        let (local_column, foreign_column) = match join_columns(entry, &owner.name, field_name)? {
            Some(columns) => columns,
            None => {
                let (inverse_name, inverse) = self.find_inverse(owner, foreign, field_name, entry)?;
                let (fields, references) = join_columns(inverse, &foreign.name, inverse_name)?
                    .ok_or_else(|| SchemaError::UnresolvableRelation {
                        model: owner.name.clone(),
                        relation: field_name.to_owned(),
                        reason: format!(
                            "neither it nor its inverse {}.{} declares join columns",
                            foreign.name, inverse_name
                        ),
                    })?;
                (references, fields)
            }
        };

        let local_field = lookup_column(owner, owner, field_name, local_column)?;
        let foreign_field = lookup_column(owner, foreign, field_name, foreign_column)?;

        Ok(Relation {
            owner: owner.id,
            field_name: field_name.to_owned(),
            foreign_model: foreign.id,
            kind: entry.kind,
            nullable: entry.kind == RelationKind::One && entry.optional,
            local_field,
            foreign_field,
        })
    }

    /// Find the single entry on `foreign` that declares the other end of this relation.
    ///
    /// Candidates are the entries on `foreign` referencing back to `owner`. When
    /// several remain, only those sharing this entry's correlation name survive.
    fn find_inverse(
        &self,
        owner: &Model,
        foreign: &Model,
        field_name: &str,
        entry: &RelationEntry,
    ) -> Result<(&'a str, &'a RelationEntry), SchemaError> {
        let unresolvable = |reason: String| SchemaError::UnresolvableRelation {
            model: owner.name.clone(),
            relation: field_name.to_owned(),
            reason,
        };

        let foreign_entries = &self.sets[foreign.id.index()];
        if foreign_entries.is_empty() {
            return Err(unresolvable(format!(
                "it declares no join columns and {} declares no relations",
                foreign.name
            )));
        }

        let self_referencing = foreign.id == owner.id;
        let mut candidates: Vec<(&'a str, &'a RelationEntry)> = foreign_entries
            .iter()
            .filter(|(name, _)| !(self_referencing && **name == field_name))
            .filter(|(_, candidate)| {
                self.find_model(&candidate.table)
                    .is_some_and(|target| target.id == owner.id)
            })
            .map(|(name, candidate)| (*name, *candidate))
            .collect();

        let referencing = candidates.len();
        if referencing > 1 {
            candidates.retain(|(_, candidate)| {
                matches!(
                    (&entry.relation_name, &candidate.relation_name),
                    (Some(ours), Some(theirs)) if ours == theirs
                )
            });
        }

        match candidates.as_slice() {
            [inverse] => Ok(*inverse),
            [] if referencing == 0 => Err(unresolvable(format!(
                "it declares no join columns and no relation on {} references {}",
                foreign.name, owner.name
            ))),
            [] => Err(unresolvable(format!(
                "{referencing} relations on {} reference {} and none shares the relation name {}",
                foreign.name,
                owner.name,
                entry
                    .relation_name
                    .as_deref()
                    .map(|name| format!("{name:?}"))
                    .unwrap_or_else(|| "(none declared)".to_owned())
            ))),
            many => Err(unresolvable(format!(
                "relations {} on {} all match",
                many.iter()
                    .map(|(name, _)| format!("'{name}'"))
                    .collect::<Vec<_>>()
                    .join(", "),
                foreign.name
            ))),
        }
    }
}

/// Explicit join columns of an entry, if it declares any.
fn join_columns<'e>(
    entry: &'e RelationEntry,
    model: &str,
    relation: &str,
) -> Result<Option<JoinColumns<'e>>, SchemaError> {
    match (entry.fields.as_slice(), entry.references.as_slice()) {
        ([], []) => Ok(None),
        ([field], [reference]) => Ok(Some((field.as_str(), reference.as_str()))),
        (fields, references) if fields.len() == references.len() => {
            Err(SchemaError::CompositeJoin {
                model: model.to_owned(),
                relation: relation.to_owned(),
            })
        }
        (fields, references) => Err(SchemaError::UnresolvableRelation {
            model: model.to_owned(),
            relation: relation.to_owned(),
            reason: format!(
                "it declares {} join field(s) but {} reference(s)",
                fields.len(),
                references.len()
            ),
        }),
    }
}

fn lookup_column(
    owner: &Model,
    table: &Model,
    relation: &str,
    column: &str,
) -> Result<String, SchemaError> {
    table
        .field_by_column(column)
        .map(|field| field.name.clone())
        .ok_or_else(|| SchemaError::UnknownJoinColumn {
            model: owner.name.clone(),
            relation: relation.to_owned(),
            table: table.table_name.clone(),
            column: column.to_owned(),
        })
}
