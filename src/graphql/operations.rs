//! Naming of generated CRUD operations and their types

use std::fmt;

use convert_case::{Case, Casing};
use serde::Serialize;

/// One generated operation per model and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    GetOne,
    GetMany,
    CreateOne,
    UpdateOne,
    DeleteOne,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::GetOne,
        OperationKind::GetMany,
        OperationKind::CreateOne,
        OperationKind::UpdateOne,
        OperationKind::DeleteOne,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::GetOne => "getOne",
            OperationKind::GetMany => "getMany",
            OperationKind::CreateOne => "createOne",
            OperationKind::UpdateOne => "updateOne",
            OperationKind::DeleteOne => "deleteOne",
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, OperationKind::GetOne | OperationKind::GetMany)
    }

    /// Field name of the operation for `model`, e.g. `usersGetMany`.
    pub fn operation_name(&self, model: &str) -> String {
        camel(&[model, self.as_str()])
    }

    /// Name of a type derived from the operation, e.g. `usersGetManyOutputType`.
    pub fn type_name(&self, model: &str, suffix: &str) -> String {
        camel(&[model, self.as_str(), suffix])
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn camel(parts: &[&str]) -> String {
    parts.join(" ").to_case(Case::Camel)
}
