//! Client of the external repositories service.
//!
//! The service performs the actual git work. The platform hands it an
//! [`Operation`] describing a push and later polls it by UUID.

use async_trait::async_trait;
use conveyor_core::operation::{Operation, RepositoryStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::error::GitServiceError;
use crate::export::ExportPayload;

/// What to push where.
#[derive(Debug, Clone, PartialEq)]
pub struct PushRequest {
    pub vcs_server: String,
    pub repo_fullname: String,
    pub branch: String,
    pub message: String,
    pub strategy: RepositoryStrategy,
    pub payload: ExportPayload,
}

impl PushRequest {
    /// A pending operation carrying this request, with a fresh UUID.
    pub fn into_operation(self) -> Operation {
        Operation::new_push(
            self.vcs_server,
            self.repo_fullname,
            self.branch,
            self.message,
            self.strategy,
            self.payload.0,
        )
    }
}

/// Body of `POST /operations`: the operation plus the credentials the
/// service needs to reach the repository.
#[derive(Serialize)]
struct OperationSubmission<'a> {
    #[serde(flatten)]
    operation: &'a Operation,
    strategy: &'a RepositoryStrategy,
}

impl<'a> From<&'a Operation> for OperationSubmission<'a> {
    fn from(operation: &'a Operation) -> Self {
        Self {
            operation,
            strategy: &operation.strategy,
        }
    }
}

#[async_trait]
pub trait GitOperationService: Send + Sync {
    /// Submit a push. Returns the operation as accepted by the service.
    async fn push(&self, request: PushRequest) -> Result<Operation, GitServiceError>;

    /// Current state of an operation.
    async fn fetch_operation(&self, uuid: Uuid) -> Result<Operation, GitServiceError>;
}

/// HTTP client for the repositories service.
pub struct HttpGitOperationService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGitOperationService {
    /// * `base_url` - e.g. `http://repositories:8084`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn operations_url(&self) -> String {
        format!("{}/operations", self.base_url)
    }

    fn operation_url(&self, uuid: Uuid) -> String {
        format!("{}/operations/{}", self.base_url, uuid)
    }

    async fn parse_response(response: reqwest::Response) -> Result<Operation, GitServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GitServiceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Operation>().await?)
    }
}

#[async_trait]
impl GitOperationService for HttpGitOperationService {
    async fn push(&self, request: PushRequest) -> Result<Operation, GitServiceError> {
        let operation = request.into_operation();
        tracing::debug!(
            operation_uuid = %operation.uuid,
            repo = %operation.repo_fullname,
            branch = %operation.branch,
            "Submitting push operation"
        );

        let response = self
            .client
            .post(self.operations_url())
            .json(&OperationSubmission::from(&operation))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn fetch_operation(&self, uuid: Uuid) -> Result<Operation, GitServiceError> {
        let response = self.client.get(self.operation_url(uuid)).send().await?;
        Self::parse_response(response).await
    }
}
