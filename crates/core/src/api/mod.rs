//! Remote PDFMonkey API access.
//!
//! The sync engine only depends on the [`RemoteApi`] trait; [`PdfMonkeyClient`]
//! is the reqwest-backed implementation used by the binary.

pub mod client;

use async_trait::async_trait;

use crate::errors::ApiError;
use crate::models::{ResourceSnapshot, ResourceType, UpdateOutcome, UpdatePayload};

pub use client::{PdfMonkeyClient, DEFAULT_API_URL};

/// Fetch and update operations on remote resources.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Fetch the current state of a resource. `None` means the API refused
    /// to return it (unknown id, bad credential, ...); the reason is logged.
    async fn fetch(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> Result<Option<ResourceSnapshot>, ApiError>;

    /// Push local content to a resource.
    async fn update(
        &self,
        resource_type: ResourceType,
        id: &str,
        payload: &UpdatePayload,
    ) -> Result<UpdateOutcome, ApiError>;

    /// URL of the HTML debug rendering of a template.
    async fn debug_preview_url(&self, template_id: &str) -> Result<String, ApiError>;
}

/// Preview URL for a snapshot: the debug rendering when `debug` is set,
/// otherwise the snapshot's own preview URL.
pub async fn preview_url(
    api: &dyn RemoteApi,
    snapshot: &ResourceSnapshot,
    debug: bool,
) -> Result<Option<String>, ApiError> {
    if debug {
        return api.debug_preview_url(&snapshot.id).await.map(Some);
    }
    Ok(snapshot.preview_url.clone())
}
