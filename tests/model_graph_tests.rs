use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;

use autocrud::config::load_schema;
use autocrud::graphql::{Operator, PlanError, Predicate, QueryArgs, QueryPlan, QueryPlanner, SelectionNode};
use autocrud::orm::StatementBuilder;
use autocrud::schema::{ModelRegistry, RelationKind, SchemaDeclaration, SchemaError};
use autocrud::services::CrudService;

const BLOG: &str = r#"
tables:
  users:
    tableName: users
    columns:
      - { name: id, type: serial, primaryKey: true }
      - { name: name, type: text }
  posts:
    tableName: posts
    columns:
      - { name: id, type: serial, primaryKey: true }
      - { name: authorId, type: integer }
      - { name: title, type: text, nullable: true }
relations:
  posts:
    author: { kind: one, table: users, fields: [authorId], references: [id] }
  users:
    posts: { kind: many, table: posts }
"#;

fn blog() -> ModelRegistry {
    let declaration: SchemaDeclaration = serde_yaml::from_str(BLOG).unwrap();
    ModelRegistry::build(&declaration).unwrap()
}

#[test]
fn test_users_posts_end_to_end() {
    let registry = blog();
    let users = registry.get("users").unwrap();

    let posts = users.relation("posts").unwrap();
    assert_eq!(posts.kind, RelationKind::Many);
    assert_eq!((posts.local_field.as_str(), posts.foreign_field.as_str()), ("id", "authorId"));

    let selection = SelectionNode::new()
        .filter(json!({ "id": { "equals": 5 } }))
        .field("posts");
    let plan = QueryPlanner::new(&registry).plan(&selection, users).unwrap();

    assert_eq!(
        plan,
        QueryPlan {
            limit: None,
            offset: None,
            predicate: Some(Predicate::compare("id", Operator::Equals, 5)),
            eager_load: BTreeMap::from([("posts".to_owned(), QueryPlan::default())]),
        }
    );
    assert_eq!(
        serde_json::to_value(&plan).unwrap(),
        json!({
            "predicate": { "kind": "compare", "field": "id", "operator": "equals", "value": 5 },
            "eagerLoad": { "posts": { "eagerLoad": {} } }
        })
    );
}

#[test]
fn test_service_renders_paged_list() {
    let service = CrudService::new(Arc::new(blog())).with_default_limit(Some(20));
    let prepared = service
        .get_many(
            "posts",
            QueryArgs { offset: Some(40), ..Default::default() },
            SelectionNode::new().field("title").field("author"),
        )
        .unwrap();

    let registry = service.registry();
    let posts = registry.get("posts").unwrap();
    let builder = StatementBuilder::new(registry);

    assert_eq!(
        builder.select(posts, &prepared.plan).unwrap().sql,
        r#"SELECT "id", "authorId", "title" FROM "posts" ORDER BY "id" LIMIT 20 OFFSET 40"#
    );
    assert_eq!(builder.count(posts, &prepared.plan).unwrap().sql, r#"SELECT COUNT(*) FROM "posts""#);
    assert!(prepared.plan.eager_load.contains_key("author"));
}

#[test]
fn test_mutually_referencing_tables() {
    let declaration: SchemaDeclaration = serde_yaml::from_str(
        r#"
tables:
  employees:
    tableName: employees
    columns:
      - { name: id, type: serial, primaryKey: true }
      - { name: managerId, type: integer, nullable: true }
      - { name: teamId, type: integer }
  teams:
    tableName: teams
    columns:
      - { name: id, type: serial, primaryKey: true }
      - { name: leadId, type: integer }
relations:
  employees:
    manager: { kind: one, table: employees, fields: [managerId], references: [id], relationName: reports, optional: true }
    reports: { kind: many, table: employees, relationName: reports }
    team: { kind: one, table: teams, fields: [teamId], references: [id], relationName: membership }
  teams:
    members: { kind: many, table: employees, relationName: membership }
    lead: { kind: one, table: employees, fields: [leadId], references: [id], relationName: leadership }
"#,
    )
    .unwrap();

    let registry = ModelRegistry::build(&declaration).unwrap();
    let employees = registry.get("employees").unwrap();
    let teams = registry.get("teams").unwrap();

    let reports = employees.relation("reports").unwrap();
    assert_eq!((reports.local_field.as_str(), reports.foreign_field.as_str()), ("id", "managerId"));
    assert!(employees.relation("manager").unwrap().nullable);

    let members = teams.relation("members").unwrap();
    assert_eq!((members.local_field.as_str(), members.foreign_field.as_str()), ("id", "teamId"));

    let selection = SelectionNode::new().child(
        "manager",
        SelectionNode::new().child("team", SelectionNode::new().child("members", SelectionNode::new().field("id"))),
    );
    let plan = QueryPlanner::new(&registry).plan(&selection, employees).unwrap();
    assert!(plan.eager_load["manager"].eager_load["team"].eager_load.contains_key("members"));
}

#[test]
fn test_invalid_schema_fails_whole_build() {
    let declaration: SchemaDeclaration = serde_yaml::from_str(
        r#"
tables:
  tags:
    tableName: tags
    columns:
      - { name: label, type: text }
"#,
    )
    .unwrap();

    assert_matches!(
        ModelRegistry::build(&declaration),
        Err(SchemaError::MissingPrimaryKey { found: 0, .. })
    );
}

#[test]
fn test_concurrent_planning_shares_the_graph() {
    let registry = Arc::new(blog());
    let selection = SelectionNode::new()
        .filter(json!({ "or": [ { "name": { "includes": "a" } }, { "id": { "in": [1, 2, 3] } } ] }))
        .child("posts", SelectionNode::new().limit(3).field("author"));
    let expected = QueryPlanner::new(&registry).plan_for(&selection, "users").unwrap();

    let plans: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let selection = &selection;
                scope.spawn(move || {
                    let planner = QueryPlanner::new(&registry);
                    if i % 2 == 0 {
                        // a failing request next to the good ones
                        let bad = SelectionNode::new().filter(json!({ "nope": { "equals": 1 } }));
                        assert_matches!(planner.plan_for(&bad, "users"), Err(PlanError::Filter(_)));
                    }
                    planner.plan_for(selection, "users").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(plans.iter().all(|plan| plan == &expected));
}

#[test]
fn test_schema_file_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blog.yml");
    std::fs::write(&path, BLOG).unwrap();

    let registry = ModelRegistry::build(&load_schema(&path).unwrap()).unwrap();
    assert_eq!(
        registry.models().map(|m| m.name.as_str()).collect::<Vec<_>>(),
        vec!["posts", "users"]
    );
}
