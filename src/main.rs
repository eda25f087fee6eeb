//! autocrud - inspect the CRUD operations derived from a schema declaration
//!
//! Loads the schema, builds the model graph and prints either a description
//! of it, the query plan for a request, or the SQL that plan renders to.

mod cli;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use autocrud::config::{Config, load_schema};
use autocrud::graphql::{OperationKind, QueryPlan, SelectionNode};
use autocrud::orm::{SqlStatement, SqlValue, StatementBuilder};
use autocrud::schema::{Model, ModelRegistry};
use autocrud::services::{CrudService, PreparedOperation, init_tracing};

use crate::cli::{CliOptions, Command, USAGE};

/// A request file: a `key` selects `getOne`, otherwise `getMany` with the
/// root `args` applying to the listed rows.
#[derive(Debug, Deserialize)]
struct PlanRequest {
    #[serde(default)]
    key: Option<Value>,
    #[serde(flatten)]
    selection: SelectionNode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderedStatements {
    operation: String,
    select: SqlStatement,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<SqlStatement>,
    related: Vec<RelatedStatement>,
}

#[derive(Debug, Serialize)]
struct RelatedStatement {
    path: String,
    #[serde(flatten)]
    statement: SqlStatement,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let options = CliOptions::from_args()?;
    if options.command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut config = Config::from_env()?;
    if let Some(path) = options.schema_path_override {
        config.schema_path = path;
    }
    init_tracing(config.log_format)?;

    let declaration = load_schema(&config.schema_path)?;
    let registry = ModelRegistry::build(&declaration)
        .with_context(|| format!("Invalid schema in {}", config.schema_path.display()))?;
    let service = CrudService::new(Arc::new(registry)).with_default_limit(config.default_limit);

    let output = match options.command {
        Command::Describe | Command::Help => describe(service.registry()),
        Command::Plan { model, request } => {
            serde_json::to_value(prepare(&service, &model, &request)?)?
        }
        Command::Sql { model, request } => {
            let prepared = prepare(&service, &model, &request)?;
            serde_json::to_value(render(service.registry(), &prepared)?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn prepare(service: &CrudService, model: &str, path: &Path) -> Result<PreparedOperation> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    let request: PlanRequest = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid request in {}", path.display()))?;

    let prepared = match request.key {
        Some(key) => service.get_one(model, key, request.selection)?,
        None => {
            let args = request.selection.args.clone();
            service.get_many(model, args, request.selection)?
        }
    };
    Ok(prepared)
}

fn render(registry: &ModelRegistry, prepared: &PreparedOperation) -> Result<RenderedStatements> {
    let model = registry
        .get(&prepared.model)
        .with_context(|| format!("model {} disappeared from the registry", prepared.model))?;
    let builder = StatementBuilder::new(registry);

    let count = match prepared.kind {
        OperationKind::GetMany => Some(builder.count(model, &prepared.plan)?),
        _ => None,
    };
    let mut related = Vec::new();
    render_related(&builder, registry, model, &prepared.plan, &model.name, &mut related)?;

    Ok(RenderedStatements {
        operation: prepared.name.clone(),
        select: builder.select(model, &prepared.plan)?,
        count,
        related,
    })
}

/// Eager-load statements, each shown for a single parent key bound as null.
fn render_related(
    builder: &StatementBuilder<'_>,
    registry: &ModelRegistry,
    model: &Model,
    plan: &QueryPlan,
    path: &str,
    out: &mut Vec<RelatedStatement>,
) -> Result<()> {
    for (name, child) in &plan.eager_load {
        let relation = model
            .relation(name)
            .with_context(|| format!("{} has no relation {name}", model.name))?;
        let path = format!("{path}.{name}");
        out.push(RelatedStatement {
            path: path.clone(),
            statement: builder.select_related(relation, child, &[SqlValue::Null])?,
        });
        render_related(builder, registry, registry.foreign_model(relation), child, &path, out)?;
    }
    Ok(())
}

fn describe(registry: &ModelRegistry) -> Value {
    let models: Vec<Value> = registry
        .models()
        .map(|model| {
            let fields: Vec<Value> = model
                .fields
                .iter()
                .map(|f| {
                    json!({
                        "name": f.name,
                        "column": f.column_name,
                        "type": f.data_type.as_str(),
                        "graphql": f.data_type.graphql_scalar().as_str(),
                        "filter": f.data_type.filter_input(),
                        "primaryKey": f.is_primary_key,
                        "nullable": f.nullable,
                    })
                })
                .collect();
            let relations: Vec<Value> = model
                .relations
                .iter()
                .map(|r| {
                    json!({
                        "name": r.field_name,
                        "kind": r.kind.as_str(),
                        "model": registry.foreign_model(r).name,
                        "localField": r.local_field,
                        "foreignField": r.foreign_field,
                        "nullable": r.nullable,
                    })
                })
                .collect();
            let operations: Vec<String> = OperationKind::ALL
                .iter()
                .map(|kind| kind.operation_name(&model.name))
                .collect();

            json!({
                "name": model.name,
                "table": model.table_name,
                "fields": fields,
                "relations": relations,
                "operations": operations,
                "outputType": OperationKind::GetMany.type_name(&model.name, "OutputType"),
            })
        })
        .collect();

    json!({ "models": models })
}
