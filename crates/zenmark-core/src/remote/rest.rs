//! PostgREST-style HTTP remote store.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use super::{RemoteDocument, RemoteError, RemoteResult, RemoteStore};
use crate::config::RemoteConfig;
use crate::models::DocumentId;
use crate::util::compact_text;

const DOCUMENTS_PATH: &str = "/rest/v1/documents";

/// Remote store backed by a hosted Postgres `documents` table.
#[derive(Clone)]
pub struct RestRemoteStore {
    documents_url: String,
    api_key: String,
    bearer: String,
    client: Client,
}

impl std::fmt::Debug for RestRemoteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RestRemoteStore")
            .field("documents_url", &self.documents_url)
            .field("api_key", &"[REDACTED]")
            .field("bearer", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RestRemoteStore {
    pub fn new(config: &RemoteConfig) -> RemoteResult<Self> {
        let base = normalize_base_url(&config.url)?;
        let api_key = config.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "API key must not be empty".to_string(),
            ));
        }
        // Without a user token the anon key doubles as bearer, as PostgREST expects.
        let bearer = config
            .access_token
            .clone()
            .unwrap_or_else(|| api_key.clone());

        Ok(Self {
            documents_url: format!("{base}{DOCUMENTS_PATH}"),
            api_key,
            bearer,
            client: Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()?,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
            .header("Accept", "application/json")
    }

    async fn fetch(&self, filter: (&str, String)) -> RemoteResult<Vec<RemoteDocument>> {
        let request = self.authorized(
            self.client
                .get(&self.documents_url)
                .query(&[("select", "*".to_string()), (filter.0, filter.1)]),
        );
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| {
            RemoteError::InvalidPayload(format!("{error}: {}", compact_text(&body)))
        })
    }
}

impl RemoteStore for RestRemoteStore {
    async fn is_reachable(&self) -> bool {
        let request = self.authorized(
            self.client
                .get(&self.documents_url)
                .query(&[("select", "id"), ("limit", "1")]),
        );
        match request.send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(error) => {
                tracing::debug!("Remote store probe failed: {}", error);
                false
            }
        }
    }

    async fn get_one(&self, id: &DocumentId) -> RemoteResult<Option<RemoteDocument>> {
        let mut rows = self.fetch(("id", format!("eq.{id}"))).await?;
        if rows.len() > 1 {
            return Err(RemoteError::InvalidPayload(format!(
                "{} rows returned for document {id}",
                rows.len()
            )));
        }
        Ok(rows.pop())
    }

    async fn upsert(&self, document: &RemoteDocument) -> RemoteResult<()> {
        let request = self.authorized(
            self.client
                .post(&self.documents_url)
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(document),
        );
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }
        Ok(())
    }

    async fn query_by_owner(&self, owner_id: &str) -> RemoteResult<Vec<RemoteDocument>> {
        self.fetch(("user_id", format!("eq.{owner_id}"))).await
    }
}

fn normalize_base_url(raw: &str) -> RemoteResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "remote URL must not be empty".to_string(),
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(RemoteError::InvalidConfiguration(
            "remote URL must include http:// or https://".to_string(),
        ));
    }
    Ok(trimmed
        .strip_suffix("/rest/v1")
        .unwrap_or(trimmed)
        .to_string())
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    message: Option<String>,
    error: Option<String>,
    hint: Option<String>,
}

fn api_error(status: StatusCode, body: &str) -> RemoteError {
    let message = match serde_json::from_str::<PostgrestErrorBody>(body) {
        Ok(payload) => match (payload.message.or(payload.error), payload.hint) {
            (Some(message), Some(hint)) => format!("{} (hint: {})", message.trim(), hint.trim()),
            (Some(message), None) => message.trim().to_string(),
            (None, _) => compact_text(body),
        },
        Err(_) => compact_text(body),
    };

    RemoteError::Api {
        status: status.as_u16(),
        message: if message.is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            message
        },
    }
}
