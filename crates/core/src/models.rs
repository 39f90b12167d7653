//! Shared data models for the PDFMonkey sync engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{ApiError, MapperError};
use crate::mapper;

// ---------------------------------------------------------------------------
// Resource type
// ---------------------------------------------------------------------------

/// The kinds of remote resources that can be synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Template,
    Snippet,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Snippet => "snippet",
        }
    }

    /// Key wrapping the resource in API responses.
    pub(crate) fn response_key(&self) -> &'static str {
        match self {
            Self::Template => "document_template",
            Self::Snippet => "snippet",
        }
    }

    /// Path segment of the resource collection in the API.
    pub(crate) fn collection(&self) -> &'static str {
        match self {
            Self::Template => "document_templates",
            Self::Snippet => "snippets",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "template" => Ok(Self::Template),
            "snippet" => Ok(Self::Snippet),
            other => Err(MapperError::UnknownResourceType(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tracked files
// ---------------------------------------------------------------------------

/// One logical attribute of a resource bound to a local file and a remote field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedFile {
    /// Human-readable attribute name ("HTML", "CSS", ...).
    pub attribute: &'static str,
    /// File name inside the working directory.
    pub filename: &'static str,
    /// Field name in the remote resource.
    pub remote_field: &'static str,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The remote state of a resource as of one fetch or update.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot {
    pub resource_type: ResourceType,
    pub id: String,
    pub updated_at: DateTime<Utc>,
    /// Content per remote field; `None` when the API returned null.
    pub fields: BTreeMap<&'static str, Option<String>>,
    pub preview_url: Option<String>,
    pub display_name: Option<String>,
}

impl ResourceSnapshot {
    /// Build a snapshot from the resource object of an API response.
    pub fn from_json(resource_type: ResourceType, value: &Value) -> Result<Self, ApiError> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse(format!("{} without an id", resource_type)))?
            .to_string();

        let raw_updated_at = value
            .get("updated_at")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse(format!("{} '{}' without updated_at", resource_type, id)))?;
        let updated_at = DateTime::parse_from_rfc3339(raw_updated_at)
            .map_err(|e| ApiError::Parse(format!("invalid updated_at '{}': {}", raw_updated_at, e)))?
            .with_timezone(&Utc);

        let fields = mapper::files_for_resource_type(resource_type)
            .iter()
            .map(|file| {
                let content = value
                    .get(file.remote_field)
                    .and_then(Value::as_str)
                    .map(str::to_string);
                (file.remote_field, content)
            })
            .collect();

        let display_name = ["display_name", "identifier", "name"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::to_string);

        Ok(Self {
            resource_type,
            id,
            updated_at,
            fields,
            preview_url: value
                .get("preview_url")
                .and_then(Value::as_str)
                .map(str::to_string),
            display_name,
        })
    }

    /// Remote content for a tracked file, if the API returned any.
    pub fn content(&self, file: &TrackedFile) -> Option<&str> {
        self.fields.get(file.remote_field).and_then(|c| c.as_deref())
    }

    /// Name to show the user: the display name, falling back to the id.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

// ---------------------------------------------------------------------------
// Update payload and outcome
// ---------------------------------------------------------------------------

/// Local content of every tracked file, keyed by remote field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UpdatePayload(pub BTreeMap<&'static str, String>);

/// Result of a remote update call that reached the API.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(ResourceSnapshot),
    Rejected(RemoteErrors),
}

/// Validation errors returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RemoteErrors {
    /// JSON:API style list of `{status, title, detail}` entries.
    List(Vec<RemoteErrorEntry>),
    /// Field name to list of messages.
    Fields(BTreeMap<String, Vec<String>>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteErrorEntry {
    #[serde(default, deserialize_with = "status_as_string")]
    pub status: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

fn status_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl RemoteErrors {
    /// Render the errors as one human-readable line per message.
    pub fn format(&self) -> String {
        match self {
            Self::List(entries) => entries
                .iter()
                .map(|e| format!("{} {} — {}", e.status, e.title, e.detail))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Fields(fields) => fields
                .iter()
                .flat_map(|(field, messages)| {
                    let name = mapper::attribute_for_remote_field(field).unwrap_or(field.as_str());
                    messages.iter().map(move |m| format!("{}: {}", name, m))
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl fmt::Display for RemoteErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

// ---------------------------------------------------------------------------
// Sync attempt result
// ---------------------------------------------------------------------------

/// Outcome of one sync attempt triggered by a file-system event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    Synced,
    Failed { errors: String },
}

impl SyncResult {
    pub fn failed(errors: impl Into<String>) -> Self {
        Self::Failed {
            errors: errors.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Synced)
    }
}

/// The user's answer to one conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    KeepRemote,
    KeepLocal,
    Cancel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_type_parse() {
        assert_eq!("template".parse::<ResourceType>(), Ok(ResourceType::Template));
        assert_eq!("snippet".parse::<ResourceType>(), Ok(ResourceType::Snippet));
        assert!(matches!(
            "workspace".parse::<ResourceType>(),
            Err(MapperError::UnknownResourceType(_))
        ));
    }

    #[test]
    fn test_snapshot_from_json() {
        let value = json!({
            "id": "tpl-1",
            "updated_at": "2024-05-01T10:00:00.000+02:00",
            "body_draft": "<p>Hi</p>",
            "scss_style_draft": null,
            "sample_data_draft": "{}",
            "preview_url": "https://preview.example/tpl-1",
            "display_name": "Invoice"
        });

        let snapshot = ResourceSnapshot::from_json(ResourceType::Template, &value).unwrap();
        assert_eq!(snapshot.id, "tpl-1");
        assert_eq!(snapshot.updated_at.to_rfc3339(), "2024-05-01T08:00:00+00:00");
        assert_eq!(snapshot.fields.len(), 3);
        assert_eq!(snapshot.fields["body_draft"].as_deref(), Some("<p>Hi</p>"));
        assert_eq!(snapshot.fields["scss_style_draft"], None);
        assert_eq!(snapshot.label(), "Invoice");
        assert_eq!(snapshot.preview_url.as_deref(), Some("https://preview.example/tpl-1"));
    }

    #[test]
    fn test_snapshot_rejects_bad_timestamp() {
        let value = json!({ "id": "s", "updated_at": "yesterday", "code": "x" });
        let err = ResourceSnapshot::from_json(ResourceType::Snippet, &value).unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[test]
    fn test_format_field_errors() {
        let errors: RemoteErrors = serde_json::from_value(json!({
            "body_draft": ["is invalid", "has an unclosed tag"],
            "settings_draft": ["is not JSON"],
            "mystery": ["oops"]
        }))
        .unwrap();

        assert_eq!(
            errors.format(),
            "HTML: is invalid\nHTML: has an unclosed tag\nmystery: oops\nSettings: is not JSON"
        );
    }

    #[test]
    fn test_format_list_errors() {
        let errors: RemoteErrors = serde_json::from_value(json!([
            { "status": 404, "title": "Not Found", "detail": "No template" },
            { "status": "401", "title": "Unauthorized", "detail": "Bad key" }
        ]))
        .unwrap();

        assert_eq!(
            errors.format(),
            "404 Not Found — No template\n401 Unauthorized — Bad key"
        );
    }
}
