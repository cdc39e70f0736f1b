//! Wire types of the ToDo service.

use serde::{Deserialize, Serialize};

/// A ToDo item as returned by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToDoItem {
    /// Server-assigned identifier
    #[serde(alias = "Id")]
    pub id: i64,
    /// Title
    #[serde(alias = "Title")]
    pub title: String,
    /// Free-text description
    #[serde(default, alias = "Description")]
    pub description: String,
    /// Completion flag
    #[serde(default, alias = "IsCompleted")]
    pub is_completed: bool,
}

/// Body of create and update requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToDoPayload {
    /// Title
    #[serde(alias = "Title")]
    pub title: String,
    /// Free-text description
    #[serde(default, alias = "Description")]
    pub description: String,
    /// Completion flag
    #[serde(default, alias = "IsCompleted")]
    pub is_completed: bool,
}

impl ToDoPayload {
    /// Create a payload
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>, is_completed: bool) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            is_completed,
        }
    }

    /// Whether `item` carries exactly this payload's fields
    #[must_use]
    pub fn matches(&self, item: &ToDoItem) -> bool {
        item.title == self.title
            && item.description == self.description
            && item.is_completed == self.is_completed
    }
}

/// Body of `POST /api/Auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Account email
    pub email: &'a str,
    /// Account password
    pub password: &'a str,
}

/// Body of a successful login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token, absent when the service refuses to issue one
    #[serde(default, alias = "Token")]
    pub token: Option<String>,
}
