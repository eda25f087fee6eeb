//! SQL rendering for query plans
//!
//! Renders a [`QueryPlan`] into parameterized SQLite statements: one for the
//! root rows, one for their total count, and one batched statement per
//! eager-loaded relation (`WHERE fk IN (...)`) so a selection costs one
//! statement per level rather than one per parent row.

use serde_json::Value;

use super::traits::{SqlStatement, SqlValue};
use crate::graphql::{FilterError, Operator, PlanError, Predicate, QueryPlan};
use crate::schema::{Model, ModelRegistry, Relation};

const ROW_NUMBER: &str = "__row";

/// Builds statements for plans over one registry.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder<'r> {
    registry: &'r ModelRegistry,
}

impl<'r> StatementBuilder<'r> {
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self { registry }
    }

    /// Root rows of `model` matching the plan's predicate, ordered by primary key.
    pub fn select(&self, model: &Model, plan: &QueryPlan) -> Result<SqlStatement, PlanError> {
        let mut query = SqlQuery::default();
        if let Some(predicate) = &plan.predicate {
            let condition = query.condition(model, predicate)?;
            query.where_clauses.push(condition);
        }

        let mut sql = format!("SELECT {} FROM {}", columns(model), quote(&model.table_name));
        query.push_where(&mut sql);
        sql.push_str(&format!(" ORDER BY {}", quote(&model.primary_key().column_name)));
        push_window(&mut sql, plan.limit, plan.offset);

        Ok(query.finish(sql))
    }

    /// Number of rows the root predicate matches, ignoring limit and offset.
    pub fn count(&self, model: &Model, plan: &QueryPlan) -> Result<SqlStatement, PlanError> {
        let mut query = SqlQuery::default();
        if let Some(predicate) = &plan.predicate {
            let condition = query.condition(model, predicate)?;
            query.where_clauses.push(condition);
        }

        let mut sql = format!("SELECT COUNT(*) FROM {}", quote(&model.table_name));
        query.push_where(&mut sql);

        Ok(query.finish(sql))
    }

    /// Rows of the relation's foreign model for every parent in `parent_keys`.
    ///
    /// `parent_keys` are the values of the relation's local join field on the
    /// parent rows. Limit and offset apply per parent.
    pub fn select_related(
        &self,
        relation: &Relation,
        plan: &QueryPlan,
        parent_keys: &[SqlValue],
    ) -> Result<SqlStatement, PlanError> {
        let foreign = self.registry.foreign_model(relation);
        let (_, foreign_field) =
            self.registry
                .join_fields(relation)
                .ok_or_else(|| PlanError::UnknownRelation {
                    model: self.registry.model(relation.owner).name.clone(),
                    field: relation.field_name.clone(),
                })?;
        let join_column = quote(&foreign_field.column_name);
        let pk_column = quote(&foreign.primary_key().column_name);

        let mut query = SqlQuery::default();
        let keys = query.in_list(&join_column, parent_keys.iter().cloned());
        query.where_clauses.push(keys);
        if let Some(predicate) = &plan.predicate {
            let condition = query.condition(foreign, predicate)?;
            query.where_clauses.push(condition);
        }

        let table = quote(&foreign.table_name);
        let sql = if plan.limit.is_none() && plan.offset.is_none() {
            let mut sql = format!("SELECT {} FROM {}", columns(foreign), table);
            query.push_where(&mut sql);
            sql.push_str(&format!(" ORDER BY {join_column}, {pk_column}"));
            sql
        } else {
            let mut inner = format!(
                "SELECT {}, ROW_NUMBER() OVER (PARTITION BY {join_column} ORDER BY {pk_column}) AS {} FROM {}",
                columns(foreign),
                quote(ROW_NUMBER),
                table
            );
            query.push_where(&mut inner);

            let row = quote(ROW_NUMBER);
            let offset = plan.offset.unwrap_or(0);
            let mut window = format!("{row} > {offset}");
            if let Some(limit) = plan.limit {
                window.push_str(&format!(" AND {row} <= {}", offset.saturating_add(limit)));
            }
            format!(
                "SELECT {} FROM ({inner}) WHERE {window} ORDER BY {}, {}",
                output_columns(foreign),
                quote(&foreign_field.name),
                quote(&foreign.primary_key().name)
            )
        };

        Ok(query.finish(sql))
    }
}

/// WHERE fragments and their bound values, numbered as they are added.
#[derive(Default)]
struct SqlQuery {
    where_clauses: Vec<String>,
    values: Vec<SqlValue>,
}

impl SqlQuery {
    fn bind(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("?{}", self.values.len())
    }

    fn in_list(&mut self, column: &str, values: impl IntoIterator<Item = SqlValue>) -> String {
        let placeholders: Vec<String> = values.into_iter().map(|v| self.bind(v)).collect();
        if placeholders.is_empty() {
            // nothing can match an empty list
            "1 = 0".to_owned()
        } else {
            format!("{column} IN ({})", placeholders.join(", "))
        }
    }

    fn condition(&mut self, model: &Model, predicate: &Predicate) -> Result<String, PlanError> {
        Ok(match predicate {
            Predicate::Compare {
                field,
                operator,
                value,
            } => {
                let column = model
                    .field(field)
                    .map(|f| quote(&f.column_name))
                    .ok_or_else(|| FilterError::UnknownField {
                        model: model.name.clone(),
                        field: field.clone(),
                    })?;
                self.compare(&column, *operator, value)
            }
            Predicate::And { children } => self.join(model, children, " AND ", "1 = 1")?,
            Predicate::Or { children } => self.join(model, children, " OR ", "1 = 0")?,
            Predicate::Not { child } => format!("NOT ({})", self.condition(model, child)?),
        })
    }

    fn join(
        &mut self,
        model: &Model,
        children: &[Predicate],
        separator: &str,
        empty: &str,
    ) -> Result<String, PlanError> {
        if children.is_empty() {
            return Ok(empty.to_owned());
        }
        let parts = children
            .iter()
            .map(|child| self.condition(model, child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("({})", parts.join(separator)))
    }

    fn compare(&mut self, column: &str, operator: Operator, value: &Value) -> String {
        let symbol = match operator {
            Operator::Equals => "=",
            Operator::Not => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => {
                let items = match value {
                    Value::Array(items) => items.iter().map(SqlValue::from).collect(),
                    single => vec![SqlValue::from(single)],
                };
                return self.in_list(column, items);
            }
            Operator::IsNull => {
                return match value.as_bool() {
                    Some(false) => format!("{column} IS NOT NULL"),
                    _ => format!("{column} IS NULL"),
                };
            }
            Operator::Includes => {
                let needle = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let placeholder = self.bind(SqlValue::String(format!("%{}%", escape_like(&needle))));
                return format!("{column} LIKE {placeholder} ESCAPE '\\'");
            }
        };
        let placeholder = self.bind(SqlValue::from(value));
        format!("{column} {symbol} {placeholder}")
    }

    fn push_where(&self, sql: &mut String) {
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }
    }

    fn finish(self, sql: String) -> SqlStatement {
        tracing::debug!(sql = %sql, values = self.values.len(), "Rendered statement");
        SqlStatement {
            sql,
            values: self.values,
        }
    }
}

/// Escape LIKE wildcards so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Storage columns aliased to field names when they differ.
fn columns(model: &Model) -> String {
    model
        .fields
        .iter()
        .map(|f| {
            if f.column_name == f.name {
                quote(&f.name)
            } else {
                format!("{} AS {}", quote(&f.column_name), quote(&f.name))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn output_columns(model: &Model) -> String {
    model
        .fields
        .iter()
        .map(|f| quote(&f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_window(sql: &mut String, limit: Option<u64>, offset: Option<u64>) {
    match (limit, offset.filter(|o| *o > 0)) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::graphql::{QueryPlanner, SelectionNode};
    use crate::schema::{
        ColumnDescription, DataType, RelationEntry, SchemaDeclaration, TableDescription,
    };

    fn registry() -> ModelRegistry {
        let schema = SchemaDeclaration::new()
            .table(
                "users",
                TableDescription::new("users")
                    .column(ColumnDescription::new("id", DataType::Serial).primary_key())
                    .column(ColumnDescription::new("name", DataType::Text)),
            )
            .table(
                "posts",
                TableDescription::new("posts")
                    .column(ColumnDescription::new("id", DataType::Serial).primary_key())
                    .column(ColumnDescription::new("authorId", DataType::Integer).column_name("author_id"))
                    .column(ColumnDescription::new("title", DataType::Text).nullable()),
            )
            .relation("posts", "author", RelationEntry::one("users").join("author_id", "id"))
            .relation("users", "posts", RelationEntry::many("posts"));
        ModelRegistry::build(&schema).unwrap()
    }

    fn plan(registry: &ModelRegistry, model: &str, selection: SelectionNode) -> QueryPlan {
        QueryPlanner::new(registry).plan_for(&selection, model).unwrap()
    }

    #[test]
    fn test_select_root_with_filter_and_window() {
        let registry = registry();
        let users = registry.get("users").unwrap();
        let plan = plan(
            &registry,
            "users",
            SelectionNode::new()
                .limit(10)
                .offset(20)
                .filter(json!({ "name": { "includes": "an" }, "id": { "gt": 3 } })),
        );

        let statement = StatementBuilder::new(&registry).select(users, &plan).unwrap();

        assert_eq!(
            statement.sql,
            r#"SELECT "id", "name" FROM "users" WHERE ("id" > ?1 AND "name" LIKE ?2 ESCAPE '\') ORDER BY "id" LIMIT 10 OFFSET 20"#
        );
        assert_eq!(statement.values, vec![SqlValue::Int(3), SqlValue::String("%an%".into())]);
    }

    #[test]
    fn test_select_aliases_renamed_columns() {
        let registry = registry();
        let posts = registry.get("posts").unwrap();

        let statement = StatementBuilder::new(&registry)
            .select(posts, &QueryPlan { offset: Some(5), ..Default::default() })
            .unwrap();

        assert_eq!(
            statement.sql,
            r#"SELECT "id", "author_id" AS "authorId", "title" FROM "posts" ORDER BY "id" LIMIT -1 OFFSET 5"#
        );
        assert!(statement.values.is_empty());
    }

    #[test]
    fn test_operators() {
        let registry = registry();
        let posts = registry.get("posts").unwrap();
        let plan = plan(
            &registry,
            "posts",
            SelectionNode::new().filter(json!({
                "or": [
                    { "authorId": { "in": [1, 2] } },
                    { "title": { "isNull": true } },
                    { "not": { "title": { "isNull": false, "not": "draft" } } },
                    { "id": { "in": [] } }
                ]
            })),
        );

        let statement = StatementBuilder::new(&registry).count(posts, &plan).unwrap();

        assert_eq!(
            statement.sql,
            concat!(
                r#"SELECT COUNT(*) FROM "posts" WHERE ("author_id" IN (?1, ?2) OR "title" IS NULL"#,
                r#" OR NOT (("title" IS NOT NULL AND "title" <> ?3)) OR 1 = 0)"#
            )
        );
        assert_eq!(
            statement.values,
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::String("draft".into())]
        );
    }

    #[test]
    fn test_select_related_batches_parents() {
        let registry = registry();
        let users = registry.get("users").unwrap();
        let relation = users.relation("posts").unwrap();
        let plan = plan(&registry, "users", SelectionNode::new().field("posts"));

        let statement = StatementBuilder::new(&registry)
            .select_related(relation, &plan.eager_load["posts"], &[SqlValue::Int(1), SqlValue::Int(2)])
            .unwrap();

        assert_eq!(
            statement.sql,
            r#"SELECT "id", "author_id" AS "authorId", "title" FROM "posts" WHERE "author_id" IN (?1, ?2) ORDER BY "author_id", "id""#
        );
        assert_eq!(statement.values, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn test_select_related_limits_per_parent() {
        let registry = registry();
        let users = registry.get("users").unwrap();
        let relation = users.relation("posts").unwrap();
        let plan = plan(
            &registry,
            "users",
            SelectionNode::new().child(
                "posts",
                SelectionNode::new()
                    .limit(2)
                    .offset(1)
                    .filter(json!({ "title": { "equals": "x" } })),
            ),
        );

        let statement = StatementBuilder::new(&registry)
            .select_related(relation, &plan.eager_load["posts"], &[SqlValue::Int(7)])
            .unwrap();

        assert_eq!(
            statement.sql,
            concat!(
                r#"SELECT "id", "authorId", "title" FROM (SELECT "id", "author_id" AS "authorId", "title", "#,
                r#"ROW_NUMBER() OVER (PARTITION BY "author_id" ORDER BY "id") AS "__row" FROM "posts" "#,
                r#"WHERE "author_id" IN (?1) AND "title" = ?2) WHERE "__row" > 1 AND "__row" <= 3 "#,
                r#"ORDER BY "authorId", "id""#
            )
        );
        assert_eq!(statement.values, vec![SqlValue::Int(7), SqlValue::String("x".into())]);
    }

    #[test]
    fn test_select_related_without_parents_matches_nothing() {
        let registry = registry();
        let posts = registry.get("posts").unwrap();
        let relation = posts.relation("author").unwrap();

        let statement = StatementBuilder::new(&registry)
            .select_related(relation, &QueryPlan::default(), &[])
            .unwrap();

        assert_eq!(
            statement.sql,
            r#"SELECT "id", "name" FROM "users" WHERE 1 = 0 ORDER BY "id", "id""#
        );
    }

    #[test]
    fn test_foreign_plan_is_rejected() {
        let registry = registry();
        let users = registry.get("users").unwrap();
        let plan = QueryPlan {
            predicate: Some(Predicate::compare("title", Operator::Equals, "x")),
            ..Default::default()
        };

        assert_matches!(
            StatementBuilder::new(&registry).select(users, &plan),
            Err(PlanError::Filter(FilterError::UnknownField { .. }))
        );
    }

    #[test]
    fn test_includes_matches_wildcards_literally() {
        let registry = registry();
        let users = registry.get("users").unwrap();
        let plan = plan(
            &registry,
            "users",
            SelectionNode::new().filter(json!({ "name": { "includes": "50%_off\\" } })),
        );

        let statement = StatementBuilder::new(&registry).count(users, &plan).unwrap();

        assert_eq!(
            statement.sql,
            r#"SELECT COUNT(*) FROM "users" WHERE "name" LIKE ?1 ESCAPE '\'"#
        );
        assert_eq!(statement.values, vec![SqlValue::String(r"%50\%\_off\\%".into())]);
    }

    #[test]
    fn test_identifiers_are_quoted() {
        assert_eq!(quote("weird\"name"), r#""weird""name""#);
    }
}
