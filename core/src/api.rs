//! Typed async API: one method per REST operation.
//!
//! # Design
//! `TodoApi` pairs the stateless `TodoClient` with a `Transport`. Every
//! method builds one request, executes it exactly once, and parses the
//! response. Nothing is cached, retried, or de-duplicated, and errors are
//! returned to the caller unchanged.

use tracing::{debug, warn};

use crate::client::TodoClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{CreateTodo, ListParams, Todo, TodoId, TodoPage, UpdateTodo};

#[derive(Debug, Clone)]
pub struct TodoApi<T> {
    client: TodoClient,
    transport: T,
}

impl TodoApi<ReqwestTransport> {
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::new(TodoClient::new(&config.base_url), transport))
    }

    /// Build a client for the server named by `TODO_API_BASE_URL`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_config(&ClientConfig::from_env())
    }
}

impl<T: Transport> TodoApi<T> {
    pub fn new(client: TodoClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub async fn list_todos(&self, params: &ListParams) -> Result<TodoPage, ApiError> {
        let request = self.client.build_list_todos(params);
        let response = self.send(request).await?;
        self.client.parse_list_todos(response)
    }

    pub async fn get_todo(&self, id: TodoId) -> Result<Todo, ApiError> {
        let request = self.client.build_get_todo(id);
        let response = self.send(request).await?;
        self.client.parse_get_todo(response)
    }

    pub async fn create_todo(&self, input: &CreateTodo) -> Result<Todo, ApiError> {
        let request = self.client.build_create_todo(input)?;
        let response = self.send(request).await?;
        self.client.parse_create_todo(response)
    }

    pub async fn update_todo(&self, id: TodoId, input: &UpdateTodo) -> Result<Todo, ApiError> {
        let request = self.client.build_update_todo(id, input)?;
        let response = self.send(request).await?;
        self.client.parse_update_todo(response)
    }

    pub async fn delete_todo(&self, id: TodoId) -> Result<serde_json::Value, ApiError> {
        let request = self.client.build_delete_todo(id);
        let response = self.send(request).await?;
        self.client.parse_delete_todo(response)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method;
        let path = request.path.clone();
        debug!(%method, %path, "sending request");

        match self.transport.execute(request).await {
            Ok(response) => {
                debug!(%method, %path, status = response.status, "received response");
                Ok(response)
            }
            Err(err) => {
                warn!(%method, %path, error = %err, "request failed");
                Err(err)
            }
        }
    }
}
