//! HTTP client for the `/api/v1` surface.

use std::collections::HashMap;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tally_core::attachment::StagingKey;
use tally_core::types::DbId;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::gate::{AuthGate, SessionUser};
use crate::models::{
    AttachmentInfo, ClientSummary, EntitySummary, Envelope, ErrorBody, JournalEntrySummary,
    LoginRequest, LoginResponse, NewClient, PromoteRequest, UserInfo,
};

/// Cached GET bodies, valid for a single gate generation.
#[derive(Debug, Default)]
struct ResponseCache {
    generation: u64,
    bodies: HashMap<String, serde_json::Value>,
}

impl ResponseCache {
    /// Advance to `generation`, dropping older bodies. Returns false when the
    /// caller's generation is already stale.
    fn sync(&mut self, generation: u64) -> bool {
        if generation > self.generation {
            self.bodies.clear();
            self.generation = generation;
        }
        generation == self.generation
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    gate: AuthGate,
    token: RwLock<Option<String>>,
    cache: Mutex<ResponseCache>,
}

impl ApiClient {
    /// * `base_url` - API root including the version prefix, e.g.
    ///   `http://host:3000/api/v1`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] and its connection pool.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            gate: AuthGate::new(),
            token: RwLock::new(None),
            cache: Mutex::new(ResponseCache::default()),
        }
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// The current access token, for persisting across restarts.
    pub async fn access_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    // ---- session ----

    /// Authenticate and start a new gate generation.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<SessionUser> {
        let response = self
            .request(Method::POST, "/auth/login")
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let login: LoginResponse = Self::parse_data(response).await?;

        *self.token.write().await = Some(login.access_token);
        let user = session_user(login.user);
        self.gate.signed_in(user.clone());
        tracing::debug!(user_id = user.user_id, "Signed in");
        Ok(user)
    }

    /// Settle the gate from a previously issued access token, or mark the
    /// client signed out when there is none or the API rejects it.
    pub async fn resume(&self, access_token: Option<String>) -> ClientResult<Option<SessionUser>> {
        let Some(token) = access_token else {
            self.gate.signed_out();
            return Ok(None);
        };

        let response = self
            .request(Method::GET, "/auth/me")
            .bearer_auth(&token)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.gate.signed_out();
            return Ok(None);
        }
        let me: UserInfo = Self::parse_data(response).await?;

        *self.token.write().await = Some(token);
        let user = session_user(me);
        self.gate.resume(user.clone());
        Ok(Some(user))
    }

    /// Revoke the session server-side and start a new gate generation.
    ///
    /// The local session is cleared even when the API call fails.
    pub async fn logout(&self) -> ClientResult<()> {
        let token = self.token.write().await.take();
        self.gate.signed_out();

        let Some(token) = token else {
            return Ok(());
        };
        let response = self
            .request(Method::POST, "/auth/logout")
            .bearer_auth(token)
            .send()
            .await?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Ok(()),
            _ => Self::check_status(response).await.map(|_| ()),
        }
    }

    // ---- gated reads ----

    pub async fn me(&self) -> ClientResult<UserInfo> {
        self.get_cached("/auth/me").await
    }

    pub async fn list_clients(&self, include_deleted: bool) -> ClientResult<Vec<ClientSummary>> {
        self.get_cached(&format!("/clients?include_deleted={include_deleted}"))
            .await
    }

    pub async fn get_client(&self, client_id: DbId) -> ClientResult<ClientSummary> {
        self.get_cached(&format!("/clients/{client_id}")).await
    }

    /// Entities offered for selection, keeping `selected_id` when it is
    /// inactive.
    pub async fn selectable_entities(
        &self,
        client_id: DbId,
        selected_id: Option<DbId>,
    ) -> ClientResult<Vec<EntitySummary>> {
        let path = match selected_id {
            Some(id) => format!("/clients/{client_id}/entities/selectable?selected_id={id}"),
            None => format!("/clients/{client_id}/entities/selectable"),
        };
        self.get_cached(&path).await
    }

    pub async fn list_journal_entries(
        &self,
        client_id: DbId,
        entity_id: DbId,
    ) -> ClientResult<Vec<JournalEntrySummary>> {
        self.get_cached(&format!(
            "/clients/{client_id}/entities/{entity_id}/journal-entries"
        ))
        .await
    }

    // ---- gated writes ----

    /// Create a client (admin only). Clears the response cache.
    pub async fn create_client(&self, input: &NewClient) -> ClientResult<ClientSummary> {
        let created = self.send_json(Method::POST, "/clients", input).await?;
        self.invalidate().await;
        Ok(created)
    }

    /// Stage a file for an entry that has not been saved yet.
    ///
    /// Use [`new_staging_key`] once per unsaved entry and pass the same key
    /// to [`Self::promote_staged`] after the entry exists.
    pub async fn upload_staged_file(
        &self,
        client_id: DbId,
        staging_key: StagingKey,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ClientResult<AttachmentInfo> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let path = format!("/clients/{client_id}/staged-files/{staging_key}");
        let (builder, _) = self.authorized(Method::POST, &path).await?;
        let response = builder.multipart(Form::new().part("file", part)).send().await?;
        self.parse_gated(response).await
    }

    pub async fn staged_files(
        &self,
        client_id: DbId,
        staging_key: StagingKey,
    ) -> ClientResult<Vec<AttachmentInfo>> {
        let path = format!("/clients/{client_id}/staged-files/{staging_key}");
        let (builder, _) = self.authorized(Method::GET, &path).await?;
        let response = builder.send().await?;
        self.parse_gated(response).await
    }

    /// Attach everything staged under `staging_key` to a saved entry.
    /// Returns the entry's full attachment list.
    pub async fn promote_staged(
        &self,
        client_id: DbId,
        entity_id: DbId,
        entry_id: DbId,
        staging_key: StagingKey,
    ) -> ClientResult<Vec<AttachmentInfo>> {
        let path = format!(
            "/clients/{client_id}/entities/{entity_id}/journal-entries/{entry_id}/files/promote"
        );
        let attachments = self
            .send_json(Method::POST, &path, &PromoteRequest { staging_key })
            .await?;
        self.invalidate().await;
        Ok(attachments)
    }

    /// Forget every cached response.
    pub async fn invalidate(&self) {
        self.cache.lock().await.bodies.clear();
    }

    // ---- private helpers ----

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    /// Bearer-authenticated request, issued only once the gate has resolved.
    async fn authorized(&self, method: Method, path: &str) -> ClientResult<(RequestBuilder, u64)> {
        let (_, generation) = self.gate.resolved().await?;
        let token = self.token.read().await.clone().ok_or(ClientError::SignedOut)?;
        Ok((self.request(method, path).bearer_auth(token), generation))
    }

    /// GET through the cache. A body fetched under one generation is only
    /// stored if the generation is still current when it arrives.
    async fn get_cached<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let (builder, generation) = self.authorized(Method::GET, path).await?;

        {
            let mut cache = self.cache.lock().await;
            if cache.sync(generation) {
                if let Some(body) = cache.bodies.get(path) {
                    return Ok(serde_json::from_value(body.clone())?);
                }
            }
        }

        let response = builder.send().await?;
        let body: serde_json::Value = self.parse_gated(response).await?;

        let mut cache = self.cache.lock().await;
        if generation == self.gate.generation() && cache.sync(generation) {
            cache.bodies.insert(path.to_string(), body.clone());
        }
        Ok(serde_json::from_value(body)?)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (builder, _) = self.authorized(method, path).await?;
        let response = builder.json(body).send().await?;
        self.parse_gated(response).await
    }

    /// Like [`Self::parse_data`], but a 401 also signs the gate out.
    async fn parse_gated<T: DeserializeOwned>(&self, response: Response) -> ClientResult<T> {
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("Session rejected, signing out");
            self.token.write().await.take();
            self.gate.signed_out();
        }
        Self::parse_data(response).await
    }

    async fn check_status(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.code, body.error),
            Err(_) => ("UNKNOWN".to_string(), text),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// Check the status and unwrap the `{"data": ...}` envelope.
    async fn parse_data<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.data)
    }
}

/// A fresh key for grouping uploads made before an entry is saved.
pub fn new_staging_key() -> StagingKey {
    StagingKey(Uuid::new_v4())
}

fn session_user(user: UserInfo) -> SessionUser {
    SessionUser {
        user_id: user.id,
        username: user.username,
        role: user.role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_drops_bodies_from_older_generations() {
        let mut cache = ResponseCache::default();
        assert!(cache.sync(0));
        cache.bodies.insert("/auth/me".into(), serde_json::json!({"id": 1}));

        assert!(cache.sync(1));
        assert!(cache.bodies.is_empty());

        // A response started before the latest login must not repopulate.
        assert!(!cache.sync(0));
        assert_eq!(cache.generation, 1);
    }
}
