// src/resolver.rs
//! Discovery of the organization and project an export runs against.
//!
//! The platform keeps the active organization in a cookie and, depending on
//! the client version, in a handful of places inside browser storage. The
//! probing lives here, behind `IdentifierResolver`, so the pipeline only ever
//! sees two validated ids.

use crate::error::AppError;
use crate::types::{looks_like_uuid, OrganizationId, ProjectId, SessionCookie};
use serde_json::Value;

/// How deep the storage snapshot is searched for an organization id.
const MAX_SEARCH_DEPTH: usize = 5;

/// Cookie that carries the organization selected in the web client.
const ACTIVE_ORG_COOKIE: &str = "lastActiveOrg";

/// The ids every remote call is scoped by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentifiers {
    pub organization: OrganizationId,
    pub project: ProjectId,
}

/// Supplies the ids before the pipeline starts. Failure is fatal.
pub trait IdentifierResolver: Send + Sync {
    fn resolve(&self) -> Result<ProjectIdentifiers, AppError>;
}

/// Resolves ids from command-line input and the session.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    project_input: String,
    explicit_organization: Option<String>,
    cookie: SessionCookie,
    storage_snapshot: Option<Value>,
}

impl SessionResolver {
    pub fn new(project_input: impl Into<String>, cookie: SessionCookie) -> Self {
        Self {
            project_input: project_input.into(),
            explicit_organization: None,
            cookie,
            storage_snapshot: None,
        }
    }

    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.explicit_organization = organization;
        self
    }

    pub fn with_storage_snapshot(mut self, snapshot: Option<Value>) -> Self {
        self.storage_snapshot = snapshot;
        self
    }

    fn resolve_project(&self) -> Result<ProjectId, AppError> {
        ProjectId::from_input(&self.project_input).map_err(|e| {
            AppError::FatalPrecondition(format!(
                "Could not determine the project ID from '{}': {}",
                self.project_input, e
            ))
        })
    }

    fn resolve_organization(&self) -> Result<OrganizationId, AppError> {
        if let Some(explicit) = &self.explicit_organization {
            return OrganizationId::parse(explicit).map_err(|e| {
                AppError::FatalPrecondition(format!("Invalid organization ID: {}", e))
            });
        }

        if let Some(id) = self
            .cookie
            .value_of(ACTIVE_ORG_COOKIE)
            .and_then(|value| OrganizationId::parse(value).ok())
        {
            log::debug!("Organization taken from the {} cookie", ACTIVE_ORG_COOKIE);
            return Ok(id);
        }

        if let Some(id) = self
            .storage_snapshot
            .as_ref()
            .and_then(find_organization_in_json)
        {
            log::debug!("Organization found in the storage snapshot");
            return Ok(id);
        }

        if let Some(id) = self
            .cookie
            .pairs()
            .find_map(|(_, value)| OrganizationId::parse(value).ok())
        {
            log::debug!("Organization guessed from a UUID-shaped cookie value");
            return Ok(id);
        }

        Err(AppError::FatalPrecondition(
            "Could not determine the organization ID. Pass --org-id or include the \
             lastActiveOrg cookie in the session."
                .to_string(),
        ))
    }
}

impl IdentifierResolver for SessionResolver {
    fn resolve(&self) -> Result<ProjectIdentifiers, AppError> {
        let project = self.resolve_project()?;
        let organization = self.resolve_organization()?;
        log::info!("Resolved organization {} / project {}", organization, project);
        Ok(ProjectIdentifiers {
            organization,
            project,
        })
    }
}

/// Deterministic resolver for tests and for callers that already know the ids.
#[derive(Debug, Clone)]
pub struct FixedResolver(pub ProjectIdentifiers);

impl IdentifierResolver for FixedResolver {
    fn resolve(&self) -> Result<ProjectIdentifiers, AppError> {
        Ok(self.0.clone())
    }
}

/// Searches a storage dump for an organization id.
///
/// Values stored by the web client are often JSON encoded strings, so string
/// values that parse as JSON are searched as well.
pub fn find_organization_in_json(value: &Value) -> Option<OrganizationId> {
    search(value, 0)
}

fn search(value: &Value, depth: usize) -> Option<OrganizationId> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }

    match value {
        Value::Object(map) => {
            if let Some(id) = direct_candidate(map) {
                return Some(id);
            }
            map.values().find_map(|child| search(child, depth + 1))
        }
        Value::Array(items) => items.iter().find_map(|child| search(child, depth + 1)),
        Value::String(raw) => {
            let trimmed = raw.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                serde_json::from_str::<Value>(raw)
                    .ok()
                    .and_then(|nested| search(&nested, depth + 1))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// The three shapes the web client is known to store the id in.
fn direct_candidate(map: &serde_json::Map<String, Value>) -> Option<OrganizationId> {
    let candidates = [
        map.get("organizationID"),
        map.get("customIDs").and_then(|c| c.get("organizationID")),
        map.get("organization").and_then(|o| o.get("uuid")),
        map.get("organization").and_then(|o| o.get("id")),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|s| looks_like_uuid(s))
        .and_then(|s| OrganizationId::parse(s).ok())
}
