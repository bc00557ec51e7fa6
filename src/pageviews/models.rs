//! Stored and served page-view payloads.

use serde::{Deserialize, Serialize};

/// One recorded visit, stored under `view:<postId>:<sid>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub sid: String,
    pub user_agent: String,
    pub date: String,
    #[serde(default)]
    pub hostname: String,
}

/// Pagination state of a listing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Body of `GET /posts/:postId/views`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewInfo {
    pub id: String,
    pub page_count: usize,
    pub page: PageState,
    pub last_update: String,
}

/// A session reference inside [`SessionInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRef {
    pub sid: String,
}

/// Body of `GET /posts/:postId/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(flatten)]
    pub info: PageViewInfo,
    pub data: Vec<SessionRef>,
}
