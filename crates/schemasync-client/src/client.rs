//! REST backend.
//!
//! [`HttpBackend`] implements the [`Backend`] trait over the collections API
//! of a PocketBase-style server. Collection updates are read-modify-write:
//! the current collection document is fetched, the operation is replayed on
//! it locally and the whole document is sent back.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use schemasync_core::document::{
    collection_from_raw, collection_to_raw, from_backend_collections, overlay_collection,
};
use schemasync_core::migration::replay_on_collection;
use schemasync_core::{
    Backend, BackendError, MigrationOperation, OperationKind, OperationPayload, RawCollection,
    SchemaDefinition,
};

use crate::config::ClientConfig;
use crate::error::Error;

const COLLECTIONS_PATH: &str = "/api/collections";
const AUTH_PATH: &str = "/api/admins/auth-with-password";

/// A backend reached over HTTP.
///
/// # Example
///
/// ```ignore
/// use schemasync_client::{ClientConfig, HttpBackend};
///
/// let config = ClientConfig::localhost().with_credentials("admin@example.com", "secret");
/// let backend = HttpBackend::connect(config).await?;
/// let schema = backend.fetch_current_schema().await?;
/// ```
pub struct HttpBackend {
    config: ClientConfig,
    http: reqwest::Client,
    token: RwLock<Option<String>>,
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    identity: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionPage {
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    items: Vec<RawCollection>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

impl HttpBackend {
    /// Create a backend from its configuration. No request is made.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        if config.base_url().is_empty() {
            return Err(Error::Config("base URL must not be empty".to_string()));
        }
        if config.page_size == 0 {
            return Err(Error::Config("page size must be positive".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("schemasync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            token: RwLock::new(config.token.clone()),
            config,
            http,
        })
    }

    /// Create a backend and authenticate it.
    pub async fn connect(config: ClientConfig) -> Result<Self, Error> {
        let backend = Self::new(config)?;
        backend.authenticate().await?;
        Ok(backend)
    }

    /// Backend configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check if a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.read().as_deref() {
            Some(token) => builder.header(AUTHORIZATION, token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    async fn fetch_collection(&self, name: &str) -> Result<Value, BackendError> {
        let url = self.url(&format!("{}/{}", COLLECTIONS_PATH, name));
        self.send_json(self.http.get(url)).await
    }

    async fn update_collection(&self, operation: &MigrationOperation) -> Result<(), BackendError> {
        let name = operation.collection().ok_or_else(|| {
            BackendError::rejected(format!("{} has no target collection", operation.kind()))
        })?;

        let original = self.fetch_collection(name).await?;
        let raw: RawCollection = serde_json::from_value(original.clone())
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        let mut collection =
            collection_from_raw(raw).map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        replay_on_collection(&mut collection, operation)
            .map_err(|e| BackendError::rejected(e.to_string()))?;

        // the original document carries settings the model does not cover
        let body = overlay_collection(&original, &collection)
            .map_err(|e| BackendError::rejected(e.to_string()))?;
        let target = collection.id.as_deref().unwrap_or(name);
        let url = self.url(&format!("{}/{}", COLLECTIONS_PATH, target));

        self.send(self.http.patch(url).json(&body)).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn authenticate(&self) -> Result<(), BackendError> {
        if self.config.token.is_some() {
            tracing::debug!("using configured admin token");
            return Ok(());
        }

        let (Some(identity), Some(password)) = (&self.config.identity, &self.config.password)
        else {
            return Err(BackendError::Unauthorized(
                "no admin token or credentials configured".to_string(),
            ));
        };

        let request = self
            .http
            .post(self.url(AUTH_PATH))
            .json(&AuthRequest { identity, password });

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status_error(status, &body) {
                BackendError::Rejected { message, .. } => BackendError::Unauthorized(message),
                other => other,
            });
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        *self.token.write() = Some(auth.token);

        tracing::info!(identity = %identity, "authenticated against backend");
        Ok(())
    }

    async fn fetch_current_schema(&self) -> Result<SchemaDefinition, BackendError> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.url(COLLECTIONS_PATH);
            let request = self.http.get(url).query(&[
                ("page", page.to_string()),
                ("perPage", self.config.page_size.to_string()),
            ]);
            let response: CollectionPage = self.send_json(request).await?;

            let received = response.items.len();
            items.extend(response.items);

            if received == 0 || page >= response.total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!(collections = items.len(), pages = page, "fetched current schema");

        Ok(from_backend_collections(items))
    }

    async fn apply_operation(&self, operation: &MigrationOperation) -> Result<(), BackendError> {
        tracing::debug!(kind = %operation.kind(), summary = %operation.summary(), "applying operation");

        match (operation.kind(), operation.payload()) {
            (OperationKind::CreateCollection, OperationPayload::Collection(collection)) => {
                let body = collection_to_raw(collection)
                    .map_err(|e| BackendError::rejected(e.to_string()))?;
                self.send(self.http.post(self.url(COLLECTIONS_PATH)).json(&body))
                    .await?;
                Ok(())
            }
            (OperationKind::DeleteCollection, OperationPayload::Collection(collection)) => {
                let target = collection.id.as_deref().unwrap_or(&collection.name);
                let url = self.url(&format!("{}/{}", COLLECTIONS_PATH, target));
                self.send(self.http.delete(url)).await?;
                Ok(())
            }
            _ => self.update_collection(operation).await,
        }
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_decode() {
        BackendError::InvalidResponse(err.to_string())
    } else {
        BackendError::Unreachable(err.to_string())
    }
}

/// Map a non-success response to a backend error.
///
/// The backend's `message` is kept verbatim; per-field validation messages
/// from `data` are appended.
pub fn status_error(status: StatusCode, body: &str) -> BackendError {
    let message = error_message(status, body);

    match status {
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        _ => BackendError::Rejected {
            status: Some(status.as_u16()),
            message,
        },
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        let text = body.trim();
        return if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            text.to_string()
        };
    };

    let mut message = parsed.message;
    let details: Vec<String> = parsed
        .data
        .as_object()
        .into_iter()
        .flatten()
        .filter_map(|(field, detail)| {
            detail
                .get("message")
                .and_then(Value::as_str)
                .map(|m| format!("{}: {}", field, m))
        })
        .collect();

    if !details.is_empty() {
        if message.is_empty() {
            message = details.join("; ");
        } else {
            message = format!("{} ({})", message, details.join("; "));
        }
    }

    message
}
