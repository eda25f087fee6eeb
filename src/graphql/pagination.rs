//! Offset pagination metadata returned alongside list results

use async_graphql::SimpleObject;
use serde::Serialize;

use super::planner::QueryArgs;

/// Information about the page a list operation returned
#[derive(SimpleObject, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Rows skipped before this page
    pub offset: u64,
    /// Page size requested, if any
    pub limit: Option<u64>,
    /// Rows matching the filter across all pages
    pub total: u64,
}

impl PageInfo {
    pub fn new(args: &QueryArgs, total: u64) -> Self {
        Self {
            offset: args.offset.unwrap_or(0),
            limit: args.limit,
            total,
        }
    }

    /// Whether rows remain past this page.
    pub fn has_more(&self) -> bool {
        match self.limit {
            Some(limit) => self.offset.saturating_add(limit) < self.total,
            None => false,
        }
    }
}
