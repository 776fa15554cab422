//! Firestore REST (v1) adapter. Implements GroupStore against the document database
//! the mobile app writes to.
//!
//! - Code uniqueness: each group owns a reservation document `{collection}_codes/{code}`;
//!   both are created in one `:commit` with `exists=false` preconditions.
//! - Documents written by the mobile app carry only a `code` field and no reservation,
//!   so code lookups fall back to a `:runQuery` equality filter on `code`.
//! - Joins: `:commit` with a server-side `increment` field transform, never read-modify-write.
//! - Live updates: the collection is polled and a snapshot is emitted whenever it changes.

use crate::adapters::firestore::mapper;
use crate::adapters::persistence::new_document_id;
use crate::domain::{DomainError, Group, GroupId, JoinCode, NewGroup};
use crate::ports::{GroupStore, GroupStream};
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

const LIST_PAGE_SIZE: u32 = 300;
const SUBSCRIPTION_BUFFER: usize = 16;

/// Connection settings for [`FirestoreGroupStore`].
#[derive(Debug, Clone)]
pub struct FirestoreSettings {
    /// API root, e.g. `https://firestore.googleapis.com/v1`.
    pub base_url: String,
    pub project_id: String,
    /// Collection holding group documents (the app uses `clubs_1` / `groups_1`).
    pub collection: String,
    /// Web API key, sent as `?key=`.
    pub api_key: Option<String>,
    /// Bearer token (user ID token or OAuth access token).
    pub auth_token: Option<String>,
    pub poll_interval: Duration,
}

/// Failure classes the store cares about; everything else is a store error.
#[derive(Debug)]
enum RestFailure {
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    Other(DomainError),
}

impl From<reqwest::Error> for RestFailure {
    fn from(e: reqwest::Error) -> Self {
        RestFailure::Other(DomainError::Store(format!("Firestore request failed: {}", e)))
    }
}

impl RestFailure {
    fn into_store_error(self, context: &str) -> DomainError {
        match self {
            RestFailure::Other(e) => e,
            other => DomainError::Store(format!("{}: {:?}", context, other)),
        }
    }
}

#[derive(Clone)]
pub struct FirestoreGroupStore {
    client: Client,
    settings: FirestoreSettings,
}

impl FirestoreGroupStore {
    pub fn new(settings: FirestoreSettings) -> Self {
        info!(
            project = %settings.project_id,
            collection = %settings.collection,
            "Firestore directory store configured"
        );
        Self {
            client: Client::new(),
            settings,
        }
    }

    /// `projects/{p}/databases/(default)/documents`
    fn database_path(&self) -> String {
        format!(
            "projects/{}/databases/(default)/documents",
            self.settings.project_id
        )
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.database_path()
        )
    }

    fn codes_collection(&self) -> String {
        format!("{}_codes", self.settings.collection)
    }

    fn group_name(&self, id: &GroupId) -> String {
        format!(
            "{}/{}/{}",
            self.database_path(),
            self.settings.collection,
            id
        )
    }

    fn reservation_name(&self, code: &JoinCode) -> String {
        format!("{}/{}/{}", self.database_path(), self.codes_collection(), code)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let req = match &self.settings.api_key {
            Some(key) => req.query(&[("key", key.as_str())]),
            None => req,
        };
        match &self.settings.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, RestFailure> {
        let res = self.authorize(req).send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res.json::<Value>().await?);
        }
        let body = res.text().await.unwrap_or_else(|_| "unknown".to_string());
        Err(match status {
            StatusCode::NOT_FOUND => RestFailure::NotFound,
            StatusCode::CONFLICT => RestFailure::AlreadyExists,
            _ if body.contains("FAILED_PRECONDITION") => RestFailure::FailedPrecondition,
            _ if body.contains("ALREADY_EXISTS") => RestFailure::AlreadyExists,
            _ => RestFailure::Other(DomainError::Store(format!(
                "Firestore API error {}: {}",
                status, body
            ))),
        })
    }

    async fn commit(&self, writes: Value) -> Result<Value, RestFailure> {
        let url = format!("{}:commit", self.documents_url());
        self.send(self.client.post(&url).json(&json!({ "writes": writes })))
            .await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, DomainError> {
        let url = format!("{}/{}/{}", self.documents_url(), collection, id);
        match self.send(self.client.get(&url)).await {
            Ok(doc) => Ok(Some(doc)),
            Err(RestFailure::NotFound) => Ok(None),
            Err(e) => Err(e.into_store_error("get document")),
        }
    }

    /// Group documents whose `code` field equals `code`, via a structured query.
    async fn query_by_code(&self, code: &JoinCode) -> Result<Option<Group>, DomainError> {
        let url = format!("{}:runQuery", self.documents_url());
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.settings.collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": mapper::FIELD_CODE },
                        "op": "EQUAL",
                        "value": { "stringValue": code.as_str() },
                    }
                },
                "limit": 1,
            }
        });
        let results = self
            .send(self.client.post(&url).json(&body))
            .await
            .map_err(|e| e.into_store_error("query by code"))?;
        for doc in mapper::query_result_documents(&results) {
            match mapper::document_to_group(doc) {
                Ok(g) => return Ok(Some(g)),
                Err(e) => warn!(code = %code, error = %e, "skipping undecodable group document"),
            }
        }
        Ok(None)
    }

    /// One poll of the collection, all pages. Undecodable documents are skipped.
    async fn fetch_all(&self) -> Result<Vec<Group>, DomainError> {
        let url = format!("{}/{}", self.documents_url(), self.settings.collection);
        let mut groups = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self
                .client
                .get(&url)
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }
            let page = self
                .send(req)
                .await
                .map_err(|e| e.into_store_error("list documents"))?;
            if let Some(docs) = page.get("documents").and_then(Value::as_array) {
                for doc in docs {
                    match mapper::document_to_group(doc) {
                        Ok(g) => groups.push(g),
                        Err(e) => warn!(error = %e, "skipping undecodable group document"),
                    }
                }
            }
            page_token = page
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(groups)
    }

    /// Poll until the receiver is dropped, forwarding snapshots that differ from the last one.
    async fn poll_loop(self, tx: mpsc::Sender<Vec<Group>>, mut last: Vec<Group>) {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
            match self.fetch_all().await {
                Ok(snapshot) if snapshot != last => {
                    debug!(count = snapshot.len(), "directory changed");
                    if tx.send(snapshot.clone()).await.is_err() {
                        break;
                    }
                    last = snapshot;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "directory poll failed; retrying next cycle"),
            }
        }
        debug!("directory subscription closed");
    }
}

#[async_trait::async_trait]
impl GroupStore for FirestoreGroupStore {
    async fn create(&self, draft: NewGroup) -> Result<Group, DomainError> {
        // Groups created by the app have no reservation for the commit precondition to hit.
        if let Some(existing) = self.query_by_code(&draft.code).await? {
            debug!(code = %draft.code, group_id = %existing.id, "code taken by unreserved group");
            return Err(DomainError::Conflict(format!(
                "join code {} already in use",
                draft.code
            )));
        }
        let group = Group::from_new(new_document_id(), draft, Utc::now());
        let writes = json!([
            {
                "update": {
                    "name": self.group_name(&group.id),
                    "fields": mapper::group_to_fields(&group),
                },
                "currentDocument": { "exists": false },
            },
            {
                "update": {
                    "name": self.reservation_name(&group.code),
                    "fields": mapper::reservation_fields(&group.id),
                },
                "currentDocument": { "exists": false },
            },
        ]);
        match self.commit(writes).await {
            Ok(_) => {
                debug!(group_id = %group.id, code = %group.code, "group committed");
                Ok(group)
            }
            Err(RestFailure::AlreadyExists | RestFailure::FailedPrecondition) => Err(
                DomainError::Conflict(format!("join code {} already in use", group.code)),
            ),
            Err(e) => Err(e.into_store_error("create group")),
        }
    }

    async fn find_by_code(&self, code: &JoinCode) -> Result<Option<Group>, DomainError> {
        let Some(reservation) = self
            .get_document(&self.codes_collection(), code.as_str())
            .await?
        else {
            return self.query_by_code(code).await;
        };
        let Some(group_id) = mapper::reservation_group_id(&reservation) else {
            warn!(code = %code, "code reservation without groupId");
            return Ok(None);
        };
        self.get(&group_id).await
    }

    async fn get(&self, id: &GroupId) -> Result<Option<Group>, DomainError> {
        match self
            .get_document(&self.settings.collection, id.as_str())
            .await?
        {
            Some(doc) => mapper::document_to_group(&doc).map(Some),
            None => Ok(None),
        }
    }

    async fn increment_member_count(&self, id: &GroupId) -> Result<Group, DomainError> {
        let writes = json!([{
            "transform": {
                "document": self.group_name(id),
                "fieldTransforms": [{
                    "fieldPath": mapper::FIELD_MEMBER_COUNT,
                    "increment": { "integerValue": "1" },
                }],
            },
            "currentDocument": { "exists": true },
        }]);
        let response = match self.commit(writes).await {
            Ok(r) => r,
            Err(RestFailure::NotFound | RestFailure::FailedPrecondition) => {
                return Err(DomainError::NotFound(format!("no group with id {}", id)));
            }
            Err(e) => return Err(e.into_store_error("increment member count")),
        };
        let mut group = self
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("no group with id {}", id)))?;
        // The committed value is exact for this join; a later read may include other joins.
        if let Some(count) = mapper::committed_member_count(&response) {
            group.member_count = count;
        }
        Ok(group)
    }

    async fn rename(&self, id: &GroupId, name: &str) -> Result<Group, DomainError> {
        let url = format!(
            "{}/{}/{}",
            self.documents_url(),
            self.settings.collection,
            id
        );
        let field = mapper::FIELD_NAME;
        let req = self
            .client
            .patch(&url)
            .query(&[
                ("updateMask.fieldPaths", field),
                ("currentDocument.exists", "true"),
            ])
            .json(&json!({ "fields": { field: { "stringValue": name } } }));
        match self.send(req).await {
            Ok(_) => {}
            Err(RestFailure::NotFound | RestFailure::FailedPrecondition) => {
                return Err(DomainError::NotFound(format!("no group with id {}", id)));
            }
            Err(e) => return Err(e.into_store_error("rename group")),
        }
        self.get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("no group with id {}", id)))
    }

    async fn list(&self) -> Result<Vec<Group>, DomainError> {
        self.fetch_all().await
    }

    async fn subscribe(&self) -> Result<GroupStream, DomainError> {
        let initial = self.fetch_all().await?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tx.send(initial.clone())
            .await
            .map_err(|e| DomainError::Subscription(e.to_string()))?;
        tokio::spawn(self.clone().poll_loop(tx, initial));
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
