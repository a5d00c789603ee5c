//! REST client for the Salesforce data API.
//!
//! Every call goes through [`SalesforceClient::api_call_envelope`], which
//! attaches the bearer token, refreshes it once on a 401 and decodes the
//! response body into JSON or a typed [`SalesforceError`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use sfsync_core::remote::{
    DeletedResult, ObjectMetadata, ObjectSummary, PushParams, QueryResult, RemoteRecord,
    SalesforceApiTrait, UpsertResult,
};
use sfsync_core::secrets::SecretStore;
use sfsync_core::soql::SoqlStatement;
use sfsync_core::utils::time_utils::format_soql_datetime;
use sfsync_core::Sfid;

use crate::auth::{AuthState, TokenManager};
use crate::cache::TtlCache;
use crate::config::SalesforceConfig;
use crate::error::{Result, SalesforceError};

const MAX_LOG_BODY_CHARS: usize = 512;
const CATALOG_CACHE_KEY: &str = "sobjects";

/// Decoded response with its HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: u16,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    sobjects: Vec<ObjectSummary>,
}

pub struct SalesforceClient {
    http: reqwest::Client,
    config: SalesforceConfig,
    tokens: TokenManager,
    describe_cache: TtlCache<Arc<ObjectMetadata>>,
    catalog_cache: TtlCache<Arc<Vec<ObjectSummary>>>,
}

impl SalesforceClient {
    pub fn new(config: SalesforceConfig, secrets: Arc<dyn SecretStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let ttl = Duration::from_secs(config.describe_ttl_secs);

        Ok(Self {
            tokens: TokenManager::new(http.clone(), config.clone(), secrets),
            http,
            config,
            describe_cache: TtlCache::new(ttl),
            catalog_cache: TtlCache::new(ttl),
        })
    }

    pub fn config(&self) -> &SalesforceConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn auth_state(&self) -> AuthState {
        self.tokens.state()
    }

    /// Revoke credentials and drop cached metadata.
    pub async fn revoke(&self) -> Result<()> {
        self.tokens.revoke().await?;
        self.describe_cache.clear();
        self.catalog_cache.clear();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────────────────

    /// Absolute URLs pass through, `/path` is relative to the instance and
    /// anything else is relative to the versioned data path.
    fn resolve_url(&self, path: &str) -> Result<String> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }
        let instance = self.tokens.instance_url()?;
        if path.starts_with('/') {
            Ok(format!("{}{}", instance, path))
        } else {
            Ok(format!("{}{}/{}", instance, self.config.data_path(), path))
        }
    }

    fn headers(token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| SalesforceError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .request(method.clone(), url)
            .headers(Self::headers(token)?);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    fn log_response(status: StatusCode, body: &str) {
        if status.is_success() {
            debug!("[Salesforce] Response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[Salesforce] Response error ({}): {}", status, preview);
    }

    /// Pull `(code, message)` out of a REST or OAuth error envelope.
    fn error_envelope(data: &Value) -> Option<(String, String)> {
        let object = match data {
            Value::Array(items) => items.first()?.as_object()?,
            Value::Object(object) => object,
            _ => return None,
        };
        let text = |key: &str| object.get(key).and_then(Value::as_str);

        if let Some(code) = text("errorCode") {
            let message = text("message").unwrap_or(code);
            return Some((code.to_string(), message.to_string()));
        }
        if let Some(code) = text("error") {
            let message = text("error_description")
                .or_else(|| text("message"))
                .unwrap_or(code);
            return Some((code.to_string(), message.to_string()));
        }
        None
    }

    async fn parse_response(response: reqwest::Response) -> Result<RestResponse> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        let data = if body.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&body) {
                Ok(data) => data,
                Err(err) if status.is_success() => return Err(err.into()),
                Err(_) => {
                    return Err(SalesforceError::api(
                        status.as_u16(),
                        format!("HTTP_{}", status.as_u16()),
                        body,
                    ))
                }
            }
        };

        if let Some((code, message)) = Self::error_envelope(&data) {
            return Err(SalesforceError::api(status.as_u16(), code, message));
        }
        if !status.is_success() {
            let message = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Request failed with HTTP {}", status.as_u16()));
            return Err(SalesforceError::api(
                status.as_u16(),
                format!("HTTP_{}", status.as_u16()),
                message,
            ));
        }

        let data = match data {
            Value::Array(mut items) if items.len() == 1 => items.remove(0),
            other => other,
        };
        Ok(RestResponse {
            status: status.as_u16(),
            data,
        })
    }

    /// Issue a request and return the decoded body with its status.
    ///
    /// A 401 triggers one token refresh and one retry. A second 401 fails
    /// with [`SalesforceError::Auth`].
    pub async fn api_call_envelope(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<RestResponse> {
        let url = self.resolve_url(path)?;
        let token = self.tokens.access_token()?;
        debug!("[Salesforce] {} {}", method, url);

        let response = self.send(&method, &url, body, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::parse_response(response).await;
        }

        debug!("[Salesforce] Access token rejected, refreshing");
        let fresh = self.tokens.refresh(&token).await?;
        let retry = self.send(&method, &url, body, &fresh).await?;
        if retry.status() != StatusCode::UNAUTHORIZED {
            return Self::parse_response(retry).await;
        }

        self.tokens.mark_expired();
        let message = match Self::parse_response(retry).await {
            Err(SalesforceError::Api { message, .. }) => message,
            _ => "Session expired or invalid".to_string(),
        };
        warn!("[Salesforce] Request rejected after token refresh: {}", message);
        Err(SalesforceError::auth(message))
    }

    pub async fn api_call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        Ok(self.api_call_envelope(method, path, body).await?.data)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metadata
    // ─────────────────────────────────────────────────────────────────────────

    /// Global object catalog, filtered on boolean attributes such as
    /// `("updateable", true)`.
    pub async fn objects(
        &self,
        filter: &[(&str, bool)],
        force_refresh: bool,
    ) -> Result<Vec<ObjectSummary>> {
        let catalog = match self.catalog_cache.get(CATALOG_CACHE_KEY) {
            Some(catalog) if !force_refresh => catalog,
            _ => {
                let data = self.api_call(Method::GET, "sobjects", None).await?;
                let response: CatalogResponse = serde_json::from_value(data)?;
                let catalog = Arc::new(response.sobjects);
                self.catalog_cache.insert(CATALOG_CACHE_KEY, catalog.clone());
                catalog
            }
        };
        Ok(catalog
            .iter()
            .filter(|entry| entry.matches(filter))
            .cloned()
            .collect())
    }

    async fn read_record(&self, path: &str) -> Result<Option<RemoteRecord>> {
        match self.api_call(Method::GET, path, None).await {
            Ok(data) => Ok(Some(serde_json::from_value(data)?)),
            Err(err) if err.status_code() == Some(404) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn sobject_path(object: &str, rest: &str) -> String {
    if rest.is_empty() {
        format!("sobjects/{}", object)
    } else {
        format!("sobjects/{}/{}", object, rest)
    }
}

fn response_id(data: &Value) -> Option<Sfid> {
    data.get("id")
        .or_else(|| data.get("Id"))
        .and_then(Value::as_str)
        .and_then(|id| Sfid::new(id).ok())
}

#[async_trait]
impl SalesforceApiTrait for SalesforceClient {
    async fn create(&self, object: &str, params: &PushParams) -> sfsync_core::Result<Sfid> {
        let body = Value::Object(params.clone());
        let data = self
            .api_call(Method::POST, &sobject_path(object, ""), Some(&body))
            .await?;
        let id = response_id(&data).ok_or_else(|| {
            sfsync_core::Error::remote_api("INVALID_RESPONSE", "Create response did not include an id")
        })?;
        info!("[Salesforce] Created {} {}", object, id);
        Ok(id)
    }

    async fn update(&self, object: &str, id: &Sfid, params: &PushParams) -> sfsync_core::Result<()> {
        let body = Value::Object(params.clone());
        self.api_call(Method::PATCH, &sobject_path(object, id.as_str()), Some(&body))
            .await?;
        debug!("[Salesforce] Updated {} {}", object, id);
        Ok(())
    }

    async fn upsert(
        &self,
        object: &str,
        key_field: &str,
        key_value: &str,
        params: &PushParams,
    ) -> sfsync_core::Result<UpsertResult> {
        let mut body = params.clone();
        body.retain(|name, _| !name.eq_ignore_ascii_case(key_field));
        let path = sobject_path(
            object,
            &format!("{}/{}", key_field, urlencoding::encode(key_value)),
        );

        let response = self
            .api_call_envelope(Method::PATCH, &path, Some(&Value::Object(body)))
            .await?;

        match response.status {
            204 => {
                let record = self
                    .object_read_by_external_id(object, key_field, key_value)
                    .await?;
                Ok(UpsertResult {
                    id: record.and_then(|r| r.id()),
                    created: false,
                })
            }
            status => Ok(UpsertResult {
                id: response_id(&response.data),
                created: status == 201,
            }),
        }
    }

    async fn delete(&self, object: &str, id: &Sfid, throw_on_404: bool) -> sfsync_core::Result<()> {
        match self
            .api_call(Method::DELETE, &sobject_path(object, id.as_str()), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.status_code() == Some(404) && !throw_on_404 => {
                debug!("[Salesforce] {} {} already gone", object, id);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn object_read(&self, object: &str, id: &Sfid) -> sfsync_core::Result<Option<RemoteRecord>> {
        Ok(self.read_record(&sobject_path(object, id.as_str())).await?)
    }

    async fn object_read_by_external_id(
        &self,
        object: &str,
        field: &str,
        value: &str,
    ) -> sfsync_core::Result<Option<RemoteRecord>> {
        let path = sobject_path(object, &format!("{}/{}", field, urlencoding::encode(value)));
        Ok(self.read_record(&path).await?)
    }

    async fn describe(
        &self,
        object: &str,
        force_refresh: bool,
    ) -> sfsync_core::Result<Arc<ObjectMetadata>> {
        if !force_refresh {
            if let Some(cached) = self.describe_cache.get(object) {
                return Ok(cached);
            }
        }
        let data = self
            .api_call(Method::GET, &sobject_path(object, "describe"), None)
            .await?;
        let metadata = Arc::new(serde_json::from_value::<ObjectMetadata>(data)?);
        self.describe_cache.insert(object, metadata.clone());
        Ok(metadata)
    }

    async fn query(&self, query: &dyn SoqlStatement) -> sfsync_core::Result<QueryResult> {
        let path = format!("query?q={}", query.url_encoded());
        let data = self.api_call(Method::GET, &path, None).await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn query_more(&self, next_records_url: &str) -> sfsync_core::Result<QueryResult> {
        let data = self.api_call(Method::GET, next_records_url, None).await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn get_deleted(
        &self,
        object: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> sfsync_core::Result<DeletedResult> {
        let path = format!(
            "{}/?start={}&end={}",
            sobject_path(object, "deleted"),
            urlencoding::encode(&format_soql_datetime(&start)),
            urlencoding::encode(&format_soql_datetime(&end)),
        );
        let data = self.api_call(Method::GET, &path, None).await?;
        Ok(serde_json::from_value(data)?)
    }
}
