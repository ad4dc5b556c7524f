use crate::error::WatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

/// A dashboard color theme. Plain stored data; the server only enforces
/// ownership on mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Theme {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub colors: Value,
    #[serde(rename = "isPublic")]
    pub is_public: bool,
    #[serde(rename = "authorId", skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateThemeInput {
    pub name: String,
    pub description: Option<String>,
    pub colors: Value,
    #[serde(rename = "isPublic", default)]
    pub is_public: bool,
    #[serde(rename = "authorId")]
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateThemeInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub colors: Option<Value>,
    #[serde(rename = "isPublic")]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct ThemeFilter {
    pub query: Option<String>,
    pub is_public: Option<bool>,
}

/// Standalone export document, importable on another server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThemeExport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub colors: Value,
    pub exported_at: DateTime<Utc>,
}

pub trait ThemeRepository {
    fn create(&self, theme: Theme) -> Result<Theme, WatchError>;
    fn get(&self, id: &str) -> Result<Option<Theme>, WatchError>;
    fn search(&self, filter: &ThemeFilter) -> Result<Vec<Theme>, WatchError>;
    fn update(&self, theme: &Theme) -> Result<Theme, WatchError>;
    fn delete(&self, id: &str) -> Result<(), WatchError>;
}
