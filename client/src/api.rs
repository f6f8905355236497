//! HTTP client for the REST API. One method per operation; every call
//! carries the session's bearer token and a fixed per-call timeout. Calls
//! that fail are reported once — there is no automatic retry.

use crate::error::ClientError;
use crate::session::Session;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tarefa_core::{
    AuthResponse, ChangePasswordRequest, CreateTaskRequest, DashboardStats, LoginRequest,
    MessageResponse, RegisterRequest, TaskEnvelope, TaskFilters, TaskListResponse, TaskResponse,
    UpdateProfileRequest, UpdateTaskRequest, UserEnvelope, UserRef, UserStats,
};
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient {
    /// `base_url` without a trailing slash, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiClient {
            http: Client::new(),
            base_url: base_url.into(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Forget the in-memory session. The on-disk copy is owned by
    /// [`crate::SessionStore`] and cleared separately.
    pub fn logout(&mut self) {
        self.session = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self
            .session
            .as_ref()
            .map(|s| s.token.as_str())
            .ok_or(ClientError::NoSession)?;
        Ok(self
            .http
            .request(method, self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(token))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::SessionExpired);
        }
        if !status.is_success() {
            let message = response
                .json::<MessageResponse>()
                .await
                .map(|m| m.message)
                .unwrap_or_else(|_| format!("Request failed with status {status}"));
            return Err(ClientError::Server(message));
        }
        response.json::<T>().await.map_err(ClientError::from_transport)
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await.map_err(ClientError::from_transport)?;
        Self::parse(response).await
    }

    // ── Accounts ───────────────────────────────────────────────

    pub async fn register(&mut self, request: &RegisterRequest) -> Result<Session, ClientError> {
        let builder = self
            .http
            .post(self.url("/users/register"))
            .timeout(REQUEST_TIMEOUT)
            .json(request);
        let auth: AuthResponse = Self::send(builder).await?;
        let session = Session { token: auth.token, user: auth.user };
        self.session = Some(session.clone());
        Ok(session)
    }

    pub async fn login(&mut self, request: &LoginRequest) -> Result<Session, ClientError> {
        let builder = self
            .http
            .post(self.url("/users/login"))
            .timeout(REQUEST_TIMEOUT)
            .json(request);
        let auth: AuthResponse = Self::send(builder).await?;
        let session = Session { token: auth.token, user: auth.user };
        self.session = Some(session.clone());
        Ok(session)
    }

    pub async fn update_profile(
        &mut self,
        request: &UpdateProfileRequest,
    ) -> Result<UserRef, ClientError> {
        let builder = self.request(Method::PUT, "/users/profile")?.json(request);
        let envelope: UserEnvelope = Self::send(builder).await?;
        if let Some(session) = &mut self.session {
            session.user = envelope.user.clone();
        }
        Ok(envelope.user)
    }

    pub async fn change_password(
        &self,
        request: &ChangePasswordRequest,
    ) -> Result<String, ClientError> {
        let builder = self.request(Method::PUT, "/users/change-password")?.json(request);
        let reply: MessageResponse = Self::send(builder).await?;
        Ok(reply.message)
    }

    pub async fn user_stats(&self) -> Result<UserStats, ClientError> {
        Self::send(self.request(Method::GET, "/users/stats")?).await
    }

    // ── Tasks ──────────────────────────────────────────────────

    pub async fn list_tasks(&self, filters: &TaskFilters) -> Result<TaskListResponse, ClientError> {
        let builder = self.request(Method::GET, "/tasks")?.query(filters);
        Self::send(builder).await
    }

    pub async fn get_task(&self, id: Uuid) -> Result<TaskResponse, ClientError> {
        Self::send(self.request(Method::GET, &format!("/tasks/{id}"))?).await
    }

    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<TaskResponse, ClientError> {
        let builder = self.request(Method::POST, "/tasks")?.json(request);
        let envelope: TaskEnvelope = Self::send(builder).await?;
        Ok(envelope.task)
    }

    pub async fn update_task(
        &self,
        id: Uuid,
        changes: &UpdateTaskRequest,
    ) -> Result<TaskResponse, ClientError> {
        let builder = self.request(Method::PUT, &format!("/tasks/{id}"))?.json(changes);
        let envelope: TaskEnvelope = Self::send(builder).await?;
        Ok(envelope.task)
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<String, ClientError> {
        let reply: MessageResponse =
            Self::send(self.request(Method::DELETE, &format!("/tasks/{id}"))?).await?;
        Ok(reply.message)
    }

    pub async fn complete_task(&self, id: Uuid) -> Result<TaskResponse, ClientError> {
        let envelope: TaskEnvelope =
            Self::send(self.request(Method::POST, &format!("/tasks/{id}/complete"))?).await?;
        Ok(envelope.task)
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, ClientError> {
        Self::send(self.request(Method::GET, "/tasks/stats/dashboard")?).await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_calls_need_a_session() {
        let client = ApiClient::new("http://localhost:3000");
        assert!(matches!(
            client.request(Method::GET, "/tasks"),
            Err(ClientError::NoSession)
        ));
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let client = ApiClient::new("http://localhost:3000");
        assert_eq!(client.url("/tasks"), "http://localhost:3000/tasks");

        let id = Uuid::nil();
        assert_eq!(
            client.url(&format!("/tasks/{id}/complete")),
            format!("http://localhost:3000/tasks/{id}/complete")
        );
    }

    fn fake_response(status: u16, body: &'static str) -> Response {
        Response::from(
            http::Response::builder()
                .status(status)
                .body(body)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn http_401_reads_as_expired_session() {
        let err = ApiClient::parse::<MessageResponse>(fake_response(401, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::SessionExpired));
    }

    #[tokio::test]
    async fn server_message_is_preserved() {
        let err = ApiClient::parse::<MessageResponse>(fake_response(
            400,
            r#"{"message":"Invalid credentials"}"#,
        ))
        .await
        .unwrap_err();
        match err {
            ClientError::Server(message) => assert_eq!(message, "Invalid credentials"),
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_error_body_gets_a_generic_message() {
        let err = ApiClient::parse::<MessageResponse>(fake_response(500, "<html>boom</html>"))
            .await
            .unwrap_err();
        match err {
            ClientError::Server(message) => assert!(message.contains("500")),
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn logout_drops_the_session() {
        let user = UserRef {
            id: Uuid::new_v4(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
        };
        let mut client = ApiClient::new("http://localhost:3000")
            .with_session(Session { token: "tok".to_string(), user });
        assert!(client.session().is_some());

        client.logout();
        assert!(client.session().is_none());
    }
}
