pub mod transport;

use crate::trip::{Activity, NewActivity, NewTrip, Trip, User};
use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use transport::HttpTransport;

pub const REFRESH_PATH: &str = "/auth/refresh";

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authenticated (HTTP 401) for {method} {path}")]
    Unauthorized { method: Method, path: String },
    #[error("API error {status} for {method} {path}: {body}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("request {method} {path} failed: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to encode request body for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Set once the request has been replayed after a session refresh.
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|source| ApiError::Encode {
            path: self.path.clone(),
            source,
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn is_refresh(&self) -> bool {
        self.path == REFRESH_PATH
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Maps non-2xx statuses to the matching [`ApiError`].
    fn into_result(self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        if self.status.is_success() {
            return Ok(self);
        }

        if self.status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized {
                method: request.method.clone(),
                path: request.path.clone(),
            });
        }

        Err(ApiError::Status {
            method: request.method.clone(),
            path: request.path.clone(),
            status: self.status,
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }

    fn json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

/// Sends one request and reports the raw response, whatever its status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterCredentials {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Debug, Deserialize)]
struct TripsEnvelope {
    trips: Vec<Trip>,
}

pub struct ApiClient<T = HttpTransport> {
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `request`, recovering once from an expired session.
    ///
    /// A 401 on a request that is neither the refresh call nor already
    /// retried triggers one `POST /auth/refresh`; on success the request is
    /// replayed once. If the refresh fails the original 401 is returned.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.transport.send(&request).await?;

        if response.status != StatusCode::UNAUTHORIZED || request.retried || request.is_refresh()
        {
            return response.into_result(&request);
        }

        let original = response.into_result(&request);
        request.retried = true;
        debug!(method = %request.method, path = %request.path, "session expired, refreshing");

        match self.refresh().await {
            Ok(()) => {
                info!(path = %request.path, "session refreshed, replaying request");
                self.transport.send(&request).await?.into_result(&request)
            }
            Err(error) => {
                warn!(error = %error, path = %request.path, "session refresh failed");
                original
            }
        }
    }

    pub async fn refresh(&self) -> Result<(), ApiError> {
        let request = ApiRequest::post(REFRESH_PATH);
        self.transport
            .send(&request)
            .await?
            .into_result(&request)
            .map(|_| ())
    }

    async fn fetch<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let path = request.path.clone();
        self.execute(request).await?.json(&path)
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self
            .fetch(ApiRequest::post("/auth/login").json(credentials)?)
            .await?;
        Ok(envelope.user)
    }

    pub async fn register(&self, credentials: &RegisterCredentials) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self
            .fetch(ApiRequest::post("/auth/register").json(credentials)?)
            .await?;
        Ok(envelope.user)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.execute(ApiRequest::post("/auth/logout"))
            .await
            .map(|_| ())
    }

    pub async fn trips(&self) -> Result<Vec<Trip>, ApiError> {
        let envelope: TripsEnvelope = self.fetch(ApiRequest::get("/trips")).await?;
        Ok(envelope.trips)
    }

    pub async fn trip(&self, id: i64) -> Result<Trip, ApiError> {
        self.fetch(ApiRequest::get(format!("/trips/{id}"))).await
    }

    pub async fn create_trip(&self, trip: &NewTrip) -> Result<Trip, ApiError> {
        self.fetch(ApiRequest::post("/trips").json(trip)?).await
    }

    pub async fn create_activity(&self, activity: &NewActivity) -> Result<Activity, ApiError> {
        self.fetch(ApiRequest::post("/activities").json(activity)?)
            .await
    }

    pub async fn delete_activity(&self, id: i64, trip_id: i64) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(format!("/activities/{id}")).query("tripId", trip_id))
            .await
            .map(|_| ())
    }
}
