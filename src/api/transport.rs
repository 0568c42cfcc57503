use super::{ApiError, ApiRequest, ApiResponse, REFRESH_PATH, Transport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::{CookieStore, Jar};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// `reqwest` transport; credentials travel as cookies held in `jar`.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    jar: Arc<Jar>,
}

/// Cookies saved between runs, grouped by the path they are sent to.
#[derive(Debug, Serialize, Deserialize)]
struct CookieScope {
    path: String,
    cookies: Vec<String>,
}

impl HttpTransport {
    /// `cookies` is the output of [`HttpTransport::saved_cookies`] from an
    /// earlier run. A plain `Cookie` header (`a=1; b=2`) is also accepted.
    pub fn new(base_url: &str, timeout: Duration, cookies: Option<&str>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim().trim_end_matches('/'))
            .with_context(|| format!("Invalid API base URL: {base_url}"))?;

        let jar = Arc::new(Jar::default());
        if let Some(saved) = cookies {
            restore_cookies(&jar, &base_url, saved);
        }

        let client = Client::builder()
            .timeout(timeout)
            .cookie_provider(Arc::clone(&jar))
            .build()
            .context("Failed to create API HTTP client")?;

        Ok(Self {
            client,
            base_url,
            jar,
        })
    }

    /// Serializes the jar for the API and refresh paths, or `None` when empty.
    ///
    /// Cookies visible to every API request are restored at `/`; cookies
    /// scoped to the refresh endpoint alone keep that path.
    pub fn saved_cookies(&self) -> Option<String> {
        let general = self.cookie_pairs(&self.base_url);
        let refresh_only = self
            .endpoint(&ApiRequest::post(REFRESH_PATH))
            .ok()
            .map(|url| {
                let pairs = self
                    .cookie_pairs(&url)
                    .into_iter()
                    .filter(|pair| !general.contains(pair))
                    .collect::<Vec<_>>();
                (url, pairs)
            });

        let mut scopes = Vec::new();
        if !general.is_empty() {
            scopes.push(CookieScope {
                path: "/".to_string(),
                cookies: general,
            });
        }
        if let Some((url, pairs)) = refresh_only.filter(|(_, pairs)| !pairs.is_empty()) {
            scopes.push(CookieScope {
                path: url.path().to_string(),
                cookies: pairs,
            });
        }

        if scopes.is_empty() {
            return None;
        }
        serde_json::to_string(&scopes).ok()
    }

    fn cookie_pairs(&self, url: &Url) -> Vec<String> {
        self.jar
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(split_cookie_header))
            .unwrap_or_default()
    }

    fn endpoint(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let raw = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            request.path.trim_start_matches('/')
        );
        let mut url = Url::parse(&raw).map_err(|source| ApiError::Transport {
            method: request.method.clone(),
            path: request.path.clone(),
            source: Box::new(source),
        })?;

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        Ok(url)
    }
}

fn split_cookie_header(header: &str) -> Vec<String> {
    header
        .split(';')
        .map(str::trim)
        .filter(|cookie| !cookie.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn restore_cookies(jar: &Jar, base_url: &Url, saved: &str) {
    match serde_json::from_str::<Vec<CookieScope>>(saved) {
        Ok(scopes) => {
            for scope in scopes {
                let Ok(url) = base_url.join(&scope.path) else {
                    debug!(path = %scope.path, "skipping saved cookies with a bad path");
                    continue;
                };
                for cookie in &scope.cookies {
                    jar.add_cookie_str(&format!("{cookie}; Path={}", scope.path), &url);
                }
            }
        }
        Err(_) => split_cookie_header(saved)
            .iter()
            .for_each(|cookie| jar.add_cookie_str(cookie, base_url)),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.endpoint(request)?;
        let transport_error = |source: reqwest::Error| ApiError::Transport {
            method: request.method.clone(),
            path: request.path.clone(),
            source: Box::new(source),
        };

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            retried = request.retried,
            "api response"
        );

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::{AppendHeaders, IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    /// Mock backend: trips need `session=fresh`, which only a refresh hands out.
    #[derive(Clone, Default)]
    pub(crate) struct Backend {
        pub refresh_calls: Arc<AtomicUsize>,
        pub refuse_refresh: bool,
        pub fail_trips: bool,
    }

    impl Backend {
        pub fn refresh_calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }
    }

    async fn trip(
        State(backend): State<Backend>,
        Path(id): Path<i64>,
        headers: HeaderMap,
    ) -> Response {
        let authenticated = headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("session=fresh"));

        if !authenticated {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if backend.fail_trips {
            return (StatusCode::INTERNAL_SERVER_ERROR, "database offline").into_response();
        }

        Json(json!({
            "id": id,
            "name": "Paris Trip",
            "destination": "Paris, France",
            "startDate": "2026-05-01T00:00:00.000Z",
            "endDate": "2026-05-06T00:00:00.000Z",
            "isCompleted": false,
            "userId": 1,
            "activities": []
        }))
        .into_response()
    }

    async fn refresh(State(backend): State<Backend>) -> Response {
        backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if backend.refuse_refresh {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        (
            StatusCode::OK,
            AppendHeaders([
                (header::SET_COOKIE, "session=fresh; Path=/"),
                (header::SET_COOKIE, "refresh=r2; Path=/api/auth/refresh"),
            ]),
        )
            .into_response()
    }

    /// Serves `backend` on an ephemeral port and returns its API base URL.
    pub(crate) async fn spawn_backend(backend: Backend) -> String {
        let app = Router::new()
            .route("/api/trips/:id", get(trip))
            .route("/api/auth/refresh", post(refresh))
            .with_state(backend);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/api")
    }
}

#[cfg(test)]
mod tests {
    use super::HttpTransport;
    use super::testing::{Backend, spawn_backend};
    use crate::api::{ApiClient, ApiRequest, REFRESH_PATH};
    use std::time::Duration;

    fn sent_to(transport: &HttpTransport, path: &str) -> Vec<String> {
        let url = transport.endpoint(&ApiRequest::get(path)).unwrap();
        transport.cookie_pairs(&url)
    }

    #[tokio::test]
    async fn refreshes_cookie_session_against_backend() {
        let backend = Backend::default();
        let base_url = spawn_backend(backend.clone()).await;
        let transport =
            HttpTransport::new(&base_url, Duration::from_secs(5), Some("session=stale")).unwrap();
        let client = ApiClient::new(transport);

        let trip = client.trip(7).await.unwrap();

        assert_eq!(trip.id, 7);
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(sent_to(client.transport(), "/trips/7"), vec!["session=fresh"]);
    }

    #[tokio::test]
    async fn refresh_scoped_cookie_survives_save_and_restore() {
        let base_url = spawn_backend(Backend::default()).await;
        let transport =
            HttpTransport::new(&base_url, Duration::from_secs(5), Some("session=stale")).unwrap();
        let client = ApiClient::new(transport);
        client.trip(7).await.unwrap();

        let saved = client.transport().saved_cookies().unwrap();
        let restored =
            HttpTransport::new(&base_url, Duration::from_secs(5), Some(saved.as_str())).unwrap();

        assert_eq!(sent_to(&restored, "/trips/7"), vec!["session=fresh"]);
        let refresh_cookies = sent_to(&restored, REFRESH_PATH);
        assert!(refresh_cookies.contains(&"refresh=r2".to_string()));
        assert!(refresh_cookies.contains(&"session=fresh".to_string()));
    }

    #[test]
    fn empty_jar_saves_nothing() {
        let transport =
            HttpTransport::new("https://api.example.com", Duration::from_secs(5), None).unwrap();

        assert!(transport.saved_cookies().is_none());
    }

    #[test]
    fn endpoint_joins_base_path_and_query() {
        let transport =
            HttpTransport::new("https://api.example.com/v1/", Duration::from_secs(5), None)
                .unwrap();

        let url = transport
            .endpoint(&ApiRequest::delete("/activities/11").query("tripId", 7))
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/activities/11?tripId=7"
        );
    }

    #[test]
    fn plain_cookie_header_is_restored() {
        let transport = HttpTransport::new(
            "https://api.example.com",
            Duration::from_secs(5),
            Some("session=abc; refresh=def"),
        )
        .unwrap();

        let sent = sent_to(&transport, "/trips");
        assert!(sent.contains(&"session=abc".to_string()));
        assert!(sent.contains(&"refresh=def".to_string()));
    }
}
