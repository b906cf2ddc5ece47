// src/api/client.rs
//! Pure HTTP client wrapper for the platform's private API.
//!
//! This module provides a thin wrapper around reqwest. It attaches the
//! session cookie to every request and maps HTTP outcomes onto the error
//! taxonomy, without any retry or scheduling logic.

use super::parser::{parse_conversation_list, parse_item_document};
use super::ConversationRepository;
use crate::constants::CONVERSATION_LIST_LIMIT;
use crate::error::{AppError, AttemptError};
use crate::model::ConversationSummary;
use crate::resolver::ProjectIdentifiers;
use crate::types::{ConversationId, OrganizationId, SessionCookie, ValidationError};
use reqwest::{header, Client, Response, StatusCode};
use url::Url;

const USER_AGENT: &str = concat!("project-chat-export/", env!("CARGO_PKG_VERSION"));

/// A thin wrapper around reqwest Client for the conversation endpoints.
#[derive(Clone)]
pub struct ChatHttpClient {
    client: Client,
    base_url: Url,
    list_limit: u32,
}

impl ChatHttpClient {
    /// Creates a new HTTP client that authenticates with `cookie`.
    pub fn new(base_url: &str, cookie: &SessionCookie) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url).map_err(|e| ValidationError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .default_headers(Self::create_headers(cookie)?)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            list_limit: CONVERSATION_LIST_LIMIT,
        })
    }

    /// Overrides how many summaries the list request asks for.
    pub fn with_list_limit(mut self, limit: u32) -> Self {
        self.list_limit = limit;
        self
    }

    /// Creates the default headers for every request.
    fn create_headers(cookie: &SessionCookie) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let mut cookie_value = header::HeaderValue::from_str(cookie.as_str()).map_err(|e| {
            AppError::MissingConfiguration(format!("Invalid session cookie format: {}", e))
        })?;
        cookie_value.set_sensitive(true);
        headers.insert(header::COOKIE, cookie_value);

        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    fn list_url(&self, ids: &ProjectIdentifiers) -> Result<Url, AppError> {
        let mut url = self.endpoint(&[
            "api",
            "organizations",
            ids.organization.as_str(),
            "projects",
            ids.project.as_str(),
            "conversations_v2",
        ])?;
        url.query_pairs_mut()
            .append_pair("limit", &self.list_limit.to_string())
            .append_pair("offset", "0");
        Ok(url)
    }

    fn item_url(
        &self,
        organization: &OrganizationId,
        conversation: &ConversationId,
    ) -> Result<Url, AppError> {
        let mut url = self.endpoint(&[
            "api",
            "organizations",
            organization.as_str(),
            "chat_conversations",
            conversation.as_str(),
        ])?;
        url.query_pairs_mut()
            .append_pair("tree", "True")
            .append_pair("rendering_mode", "messages")
            .append_pair("render_all_tools", "true");
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ValidationError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Makes a GET request to `url`.
    pub async fn get(&self, url: Url) -> Result<Response, reqwest::Error> {
        log::debug!("GET {}", url);
        self.client.get(url).send().await
    }
}

#[async_trait::async_trait]
impl ConversationRepository for ChatHttpClient {
    async fn list_conversations(
        &self,
        ids: &ProjectIdentifiers,
    ) -> Result<Vec<ConversationSummary>, AppError> {
        let url = self.list_url(ids)?;
        log::info!("📋 Fetching conversation list for project {}", ids.project);
        let response = self.get(url).await?;
        let result = extract_response_text(response).await?;

        if !result.status.is_success() {
            log::error!("List request to {} failed with {}", result.url, result.status);
            return Err(AppError::from_list_status(result.status.as_u16()));
        }

        parse_conversation_list(&result)
    }

    async fn fetch_conversation(
        &self,
        organization: &OrganizationId,
        conversation: &ConversationId,
    ) -> Result<serde_json::Value, AttemptError> {
        let url = self
            .item_url(organization, conversation)
            .map_err(|e| AttemptError::Transport(e.to_string()))?;
        let response = self.get(url).await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(AttemptError::RateLimited),
            status if !status.is_success() => Err(AttemptError::Status(status.as_u16())),
            _ => {
                let result = extract_response_text(response).await?;
                parse_item_document(&result)
            }
        }
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: StatusCode,
    pub url: String,
}

/// Extracts the response body as text with metadata.
pub async fn extract_response_text(
    response: Response,
) -> Result<ApiResponse<String>, reqwest::Error> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}
