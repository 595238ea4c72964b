//! Client and per-resource CRUD facade
//!
//! [`Client`] owns the transport, the session state and the auth
//! coordinator; [`Resource`] binds that machinery to one entry of the
//! resource registry and exposes the uniform operation set. Mutations are
//! two-phase: the mutation response is never trusted as the canonical
//! record — the record is re-fetched by id.

use std::fmt;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::AuthCoordinator;
use crate::classify::{classify_mutation_failure, MutationKind};
use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::errors::{ClientError, Result};
use crate::outcome::Outcome;
use crate::pagination;
use crate::resources::{self, ResourceDescriptor};
use crate::session::{Credentials, SessionStore};

/// Message returned by the local pre-flight body check.
pub const EMPTY_BODY_MESSAGE: &str = "Body must be non-empty object";

/// Session-authenticated client for the AdLane API.
///
/// Cheap to clone; clones share the session, the cookie store and any
/// in-flight authentication attempt.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    session: SessionStore,
    auth: AuthCoordinator,
    dispatcher: Dispatcher,
}

impl Client {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns `ClientError::Config` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        let session = SessionStore::new();
        let credentials = Credentials {
            email: config.email.clone(),
            password: config.password.clone(),
        };
        let auth =
            AuthCoordinator::new(http.clone(), &config.base_url, credentials, session.clone());
        let dispatcher =
            Dispatcher::new(http, config.base_url.clone(), session.clone(), auth.clone());

        Ok(Self { config, session, auth, dispatcher })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared session state.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Authenticate eagerly instead of waiting for the first 401.
    ///
    /// Concurrent calls coalesce into a single login request.
    ///
    /// # Errors
    /// `Authentication` when the upstream rejects the credentials,
    /// `Transport` on connection failure.
    pub async fn login(&self) -> Result<()> {
        self.auth.authenticate().await
    }

    /// Handle for a registered resource type, by collection path.
    ///
    /// # Errors
    /// Returns `ClientError::Config` for a name not present in the registry.
    pub fn resource(&self, name: &str) -> Result<Resource> {
        let descriptor = resources::descriptor(name)
            .ok_or_else(|| ClientError::Config(format!("unknown resource type {name:?}")))?;
        Ok(self.bind(descriptor))
    }

    /// Advertiser accounts.
    #[must_use]
    pub fn advertisers(&self) -> Resource {
        self.bind(&resources::ADVERTISERS)
    }

    /// Campaigns.
    #[must_use]
    pub fn campaigns(&self) -> Resource {
        self.bind(&resources::CAMPAIGNS)
    }

    /// Line items.
    #[must_use]
    pub fn line_items(&self) -> Resource {
        self.bind(&resources::LINE_ITEMS)
    }

    /// Creatives.
    #[must_use]
    pub fn creatives(&self) -> Resource {
        self.bind(&resources::CREATIVES)
    }

    /// Audience segments.
    #[must_use]
    pub fn audiences(&self) -> Resource {
        self.bind(&resources::AUDIENCES)
    }

    /// Programmatic deals.
    #[must_use]
    pub fn deals(&self) -> Resource {
        self.bind(&resources::DEALS)
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn bind(&self, descriptor: &'static ResourceDescriptor) -> Resource {
        Resource { dispatcher: self.dispatcher.clone(), descriptor }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish_non_exhaustive()
    }
}

/// CRUD operations bound to one resource type.
#[derive(Clone)]
pub struct Resource {
    dispatcher: Dispatcher,
    descriptor: &'static ResourceDescriptor,
}

impl Resource {
    /// The registry entry this handle is bound to.
    #[must_use]
    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    /// Fetch one record by id.
    pub async fn find(&self, id: impl fmt::Display) -> Result<Outcome<Value>> {
        let body =
            self.dispatcher.dispatch(Method::GET, &self.item_path(&id), None).await?;
        Ok(Outcome::Success(body))
    }

    /// Fetch records matching `filters` (sent as query parameters). Returns
    /// at most one upstream page; use [`query_all`](Self::query_all) for the
    /// complete set.
    pub async fn query(&self, filters: &Value) -> Result<Outcome<Value>> {
        let body =
            self.dispatcher.dispatch(Method::GET, self.descriptor.path, Some(filters)).await?;
        Ok(Outcome::Success(body))
    }

    /// Fetch every record matching `filters`, paginating to completion with
    /// the resource's identifier field as sort key.
    pub async fn query_all(&self, filters: &Value) -> Result<Outcome<Vec<Value>>> {
        let records = pagination::query_all(
            &self.dispatcher,
            self.descriptor.path,
            filters,
            self.descriptor.id_field,
        )
        .await?;
        Ok(Outcome::Success(records))
    }

    /// Create a record, then re-fetch it by the id the upstream assigned.
    ///
    /// An empty or non-object body is rejected locally before any network
    /// call — the upstream answers such requests with a misleading 401.
    pub async fn create(&self, body: &Value) -> Result<Outcome<Value>> {
        if !non_empty_object(body) {
            warn!(resource = self.descriptor.path, "rejecting create with empty body");
            return Ok(Outcome::failure(400, EMPTY_BODY_MESSAGE));
        }

        let created =
            self.dispatcher.dispatch(Method::POST, self.descriptor.path, Some(body)).await?;
        let id = self.record_id(&created)?;
        debug!(resource = self.descriptor.path, id = %id, "created, fetching canonical record");
        self.find(&id).await
    }

    /// Partially update a record (PATCH), then re-fetch it by id.
    ///
    /// Known failure shapes are downgraded to soft failures; a detected
    /// "object not found" condition is re-raised instead when
    /// `fail_on_not_found` is set.
    pub async fn edit(
        &self,
        id: impl fmt::Display,
        body: &Value,
        fail_on_not_found: bool,
    ) -> Result<Outcome<Value>> {
        self.mutate(Method::PATCH, id, body, fail_on_not_found).await
    }

    /// Replace a record (PUT), then re-fetch it by id. Same failure handling
    /// as [`edit`](Self::edit).
    pub async fn put_edit(
        &self,
        id: impl fmt::Display,
        body: &Value,
        fail_on_not_found: bool,
    ) -> Result<Outcome<Value>> {
        self.mutate(Method::PUT, id, body, fail_on_not_found).await
    }

    /// Delete a record by id.
    ///
    /// Recognizes the "associated campaigns block deletion" condition in
    /// addition to the shapes [`edit`](Self::edit) handles.
    pub async fn delete(
        &self,
        id: impl fmt::Display,
        fail_on_not_found: bool,
    ) -> Result<Outcome<Value>> {
        match self.dispatcher.dispatch(Method::DELETE, &self.item_path(&id), None).await {
            Ok(body) => Ok(Outcome::Success(body)),
            Err(err) => classify_mutation_failure(MutationKind::Delete, fail_on_not_found, err),
        }
    }

    async fn mutate(
        &self,
        method: Method,
        id: impl fmt::Display,
        body: &Value,
        fail_on_not_found: bool,
    ) -> Result<Outcome<Value>> {
        if !non_empty_object(body) {
            warn!(resource = self.descriptor.path, "rejecting edit with empty body");
            return Ok(Outcome::failure(400, EMPTY_BODY_MESSAGE));
        }

        match self.dispatcher.dispatch(method, &self.item_path(&id), Some(body)).await {
            Ok(_) => self.find(&id).await,
            Err(err) => classify_mutation_failure(MutationKind::Edit, fail_on_not_found, err),
        }
    }

    fn item_path(&self, id: &impl fmt::Display) -> String {
        format!("{}/{id}", self.descriptor.path)
    }

    /// Extract the assigned id from a mutation response.
    fn record_id(&self, record: &Value) -> Result<String> {
        match record.get(self.descriptor.id_field) {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(ClientError::Internal(format!(
                "mutation response missing identifier field `{}`",
                self.descriptor.id_field
            ))),
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("descriptor", &self.descriptor).finish_non_exhaustive()
    }
}

fn non_empty_object(body: &Value) -> bool {
    body.as_object().is_some_and(|map| !map.is_empty())
}
