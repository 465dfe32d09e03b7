use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::FoodId,
    error::{ApiError, ErrorCode},
    protocol::{CreateFoodRequest, FoodDraft, FoodPatch, FoodRecord},
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

mod store;
pub use store::FoodStore;

#[derive(Debug, Error)]
pub enum FoodsApiError {
    #[error("invalid server base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        source: reqwest::Error,
    },
    #[error("server rejected {endpoint} ({code:?}): {message}")]
    Api {
        endpoint: &'static str,
        code: ErrorCode,
        message: String,
    },
    #[error("unexpected status {status} from {endpoint}: {body}")]
    UnexpectedStatus {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },
}

/// The REST collaborator behind the dashboard. One implementation speaks HTTP
/// (`HttpFoodsApi`); tests script their own.
#[async_trait]
pub trait FoodsApi: Send + Sync {
    async fn list_foods(&self) -> Result<Vec<FoodRecord>, FoodsApiError>;
    async fn create_food(&self, request: &CreateFoodRequest) -> Result<FoodRecord, FoodsApiError>;
    async fn update_food(&self, record: &FoodRecord) -> Result<FoodRecord, FoodsApiError>;
    async fn delete_food(&self, id: FoodId) -> Result<(), FoodsApiError>;
}

#[derive(Debug)]
pub struct HttpFoodsApi {
    http: Client,
    base_url: Url,
}

impl HttpFoodsApi {
    pub fn new(base_url: &str) -> Result<Self, FoodsApiError> {
        let base_url = Url::parse(base_url).map_err(|source| FoodsApiError::InvalidBaseUrl {
            url: base_url.to_owned(),
            source,
        })?;
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    fn foods_url(&self) -> String {
        format!("{}/foods", self.base_url.as_str().trim_end_matches('/'))
    }

    fn food_url(&self, id: FoodId) -> String {
        format!("{}/{}", self.foods_url(), id.0)
    }
}

/// Folds a non-2xx response into an error, preferring the server's structured
/// `ApiError` envelope when the body carries one.
async fn decode_error_response(endpoint: &'static str, response: reqwest::Response) -> FoodsApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api) => FoodsApiError::Api {
            endpoint,
            code: api.code,
            message: api.message,
        },
        Err(_) => FoodsApiError::UnexpectedStatus {
            endpoint,
            status,
            body: body.trim().to_owned(),
        },
    }
}

#[async_trait]
impl FoodsApi for HttpFoodsApi {
    async fn list_foods(&self) -> Result<Vec<FoodRecord>, FoodsApiError> {
        let endpoint = "list_foods";
        let response = self
            .http
            .get(self.foods_url())
            .send()
            .await
            .map_err(|source| FoodsApiError::Transport { endpoint, source })?;
        if !response.status().is_success() {
            return Err(decode_error_response(endpoint, response).await);
        }
        response
            .json()
            .await
            .map_err(|source| FoodsApiError::Transport { endpoint, source })
    }

    async fn create_food(&self, request: &CreateFoodRequest) -> Result<FoodRecord, FoodsApiError> {
        let endpoint = "create_food";
        let response = self
            .http
            .post(self.foods_url())
            .json(request)
            .send()
            .await
            .map_err(|source| FoodsApiError::Transport { endpoint, source })?;
        if !response.status().is_success() {
            return Err(decode_error_response(endpoint, response).await);
        }
        response
            .json()
            .await
            .map_err(|source| FoodsApiError::Transport { endpoint, source })
    }

    async fn update_food(&self, record: &FoodRecord) -> Result<FoodRecord, FoodsApiError> {
        let endpoint = "update_food";
        let response = self
            .http
            .put(self.food_url(record.id))
            .json(record)
            .send()
            .await
            .map_err(|source| FoodsApiError::Transport { endpoint, source })?;
        if !response.status().is_success() {
            return Err(decode_error_response(endpoint, response).await);
        }
        response
            .json()
            .await
            .map_err(|source| FoodsApiError::Transport { endpoint, source })
    }

    async fn delete_food(&self, id: FoodId) -> Result<(), FoodsApiError> {
        let endpoint = "delete_food";
        let response = self
            .http
            .delete(self.food_url(id))
            .send()
            .await
            .map_err(|source| FoodsApiError::Transport { endpoint, source })?;
        if !response.status().is_success() {
            return Err(decode_error_response(endpoint, response).await);
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("no food with id {0} in the local list")]
    UnknownFood(FoodId),
    #[error(transparent)]
    Api(#[from] FoodsApiError),
}

/// Mutation handlers plus the reconciliation policy that keeps the local
/// [`FoodStore`] consistent with server mutations without re-fetching the
/// whole collection.
///
/// All operations take `&mut self`, so callers serialize mutations; the GUI
/// funnels them through a single worker.
pub struct MenuController {
    api: Arc<dyn FoodsApi>,
    store: FoodStore,
}

impl MenuController {
    pub fn new(api: Arc<dyn FoodsApi>) -> Self {
        Self {
            api,
            store: FoodStore::new(),
        }
    }

    pub fn store(&self) -> &FoodStore {
        &self.store
    }

    pub fn records(&self) -> &[FoodRecord] {
        self.store.records()
    }

    /// One-shot initial fetch replacing the whole store. No retry; on failure
    /// the store is left as it was (empty on mount).
    pub async fn load(&mut self) -> Result<usize, MenuError> {
        let records = self.api.list_foods().await?;
        let count = records.len();
        self.store.replace_all(records);
        info!(count, "food list loaded");
        Ok(count)
    }

    /// Submits the draft with `available` forced true and appends the
    /// server-assigned record. On failure the store is unchanged.
    pub async fn create(&mut self, draft: FoodDraft) -> Result<FoodRecord, MenuError> {
        let created = self.api.create_food(&draft.into_create_request()).await?;
        info!(food_id = created.id.0, name = %created.name, "food created");
        self.store.upsert(created.clone());
        Ok(created)
    }

    /// Merges `patch` over the *current* store entry for `id`, submits the
    /// merged record, and replaces the entry matching the response id. The
    /// merge base is re-derived at submit time, never a stale edit snapshot.
    pub async fn update(&mut self, id: FoodId, patch: FoodPatch) -> Result<FoodRecord, MenuError> {
        let base = self.store.get(id).ok_or(MenuError::UnknownFood(id))?;
        let merged = base.merged_with(&patch);
        let updated = self.api.update_food(&merged).await?;
        info!(food_id = updated.id.0, "food updated");
        self.store.replace(updated.clone());
        Ok(updated)
    }

    /// Issues the delete, then removes the entry locally regardless of the
    /// server outcome; the transport result is still surfaced to the caller.
    /// Deleting an id already absent from the store is a local no-op.
    pub async fn delete(&mut self, id: FoodId) -> Result<(), MenuError> {
        let result = self.api.delete_food(id).await;
        let removed = self.store.remove(id);
        match &result {
            Ok(()) => info!(food_id = id.0, removed = removed.is_some(), "food deleted"),
            Err(err) => warn!(
                food_id = id.0,
                removed = removed.is_some(),
                "delete request failed, entry removed locally anyway: {err}"
            ),
        }
        result.map_err(MenuError::from)
    }

    /// The per-card availability switch, expressed as a one-field patch.
    pub async fn set_available(
        &mut self,
        id: FoodId,
        available: bool,
    ) -> Result<FoodRecord, MenuError> {
        self.update(id, FoodPatch::availability(available)).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
