// Overkiz enduser API HTTP client
//
// Wraps `reqwest::Client` with session-cookie auth, endpoint URL
// construction, and `{error, errorCode}` envelope classification. The
// client is retry-free: every method performs exactly one logical
// operation and surfaces failures as typed errors.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{ApiErrorBody, Device, Event, ExecutionStarted, ListenerRegistration, StateEntry};
use crate::servers::Server;
use crate::transport::TransportConfig;

/// Client for one Overkiz cloud account session.
///
/// Created logged-out; call [`login`](Self::login) once to establish the
/// session cookie. All subsequent requests ride on the cookie jar.
pub struct OverkizClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    /// Event listener id, registered lazily on the first `fetch_events`.
    listener_id: Mutex<Option<String>>,
}

impl OverkizClient {
    /// Create a client against one of the known cloud servers.
    pub fn new(
        server: Server,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(server.endpoint())?;
        Self::with_endpoint(base_url, username, password, transport)
    }

    /// Create a client against an explicit endpoint URL.
    ///
    /// Used by tests to point at a mock server; a missing trailing slash
    /// on the endpoint is tolerated.
    pub fn with_endpoint(
        base_url: Url,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = if base_url.path().ends_with('/') {
            base_url
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            username: username.into(),
            password,
            listener_id: Mutex::new(None),
        })
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Authenticate and store the session cookie.
    ///
    /// `POST login` with `userId`/`userPassword` form fields. A 401 with
    /// a bad-credentials envelope becomes [`Error::BadCredentials`].
    pub async fn login(&self) -> Result<(), Error> {
        let url = self.url("login")?;
        debug!("logging in at {url}");

        let resp = self
            .http
            .post(url)
            .form(&[
                ("userId", self.username.as_str()),
                ("userPassword", self.password.expose_secret()),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp).await);
        }

        debug!("login successful");
        Ok(())
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// List all devices known to the gateway.
    ///
    /// `GET setup/devices`. With `force_refresh`, first issues
    /// `PUT setup/devices/states/refresh` so the server bypasses its own
    /// state cache before answering.
    pub async fn list_devices(&self, force_refresh: bool) -> Result<Vec<Device>, Error> {
        if force_refresh {
            self.refresh_states().await?;
        }
        let url = self.url("setup/devices")?;
        debug!(force_refresh, "listing devices");
        self.get(url).await
    }

    /// Ask the server to refresh all device states from the gateway.
    ///
    /// `PUT setup/devices/states/refresh`
    pub async fn refresh_states(&self) -> Result<(), Error> {
        let url = self.url("setup/devices/states/refresh")?;
        debug!("requesting server-side state refresh");

        let resp = self.http.put(url).send().await.map_err(Error::Transport)?;
        if !resp.status().is_success() {
            return Err(classify_failure(resp).await);
        }
        Ok(())
    }

    /// Current states of one device.
    ///
    /// `GET setup/devices/{deviceURL}/states` -- the device URL is a full
    /// URI and must be percent-encoded into a single path segment.
    pub async fn get_state(&self, device_url: &str) -> Result<Vec<StateEntry>, Error> {
        let path = format!("setup/devices/{}/states", urlencoding::encode(device_url));
        let url = self.url(&path)?;
        debug!(device_url, "fetching device states");
        self.get(url).await
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Execute one command on one device.
    ///
    /// `POST exec/apply` with a single action; `label` tags the execution
    /// in the vendor's history. Returns the execution id.
    pub async fn execute_command(
        &self,
        device_url: &str,
        command: &str,
        parameters: &[Value],
        label: &str,
    ) -> Result<String, Error> {
        let url = self.url("exec/apply")?;
        debug!(device_url, command, "executing command");

        let body = json!({
            "label": label,
            "actions": [{
                "deviceURL": device_url,
                "commands": [{
                    "name": command,
                    "parameters": parameters,
                }],
            }],
        });

        let started: ExecutionStarted = self.post_json(url, &body).await?;
        Ok(started.exec_id)
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Fetch pending events for this session's listener.
    ///
    /// `POST events/{listener}/fetch`. The listener is registered lazily
    /// via `POST events/register` on first use; a listener that expired
    /// server-side surfaces as a classified API error and ends the
    /// session like any other transient failure.
    pub async fn fetch_events(&self) -> Result<Vec<Event>, Error> {
        let listener = self.ensure_listener().await?;
        let url = self.url(&format!("events/{listener}/fetch"))?;
        self.post(url).await
    }

    async fn ensure_listener(&self) -> Result<String, Error> {
        let mut guard = self.listener_id.lock().await;
        if let Some(ref id) = *guard {
            return Ok(id.clone());
        }

        let url = self.url("events/register")?;
        debug!("registering event listener");
        let registration: ListenerRegistration = self.post(url).await?;
        *guard = Some(registration.id.clone());
        Ok(registration.id)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        parse_response(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("POST {url}");
        let resp = self.http.post(url).send().await.map_err(Error::Transport)?;
        parse_response(resp).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        debug!("POST {url}");
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        parse_response(resp).await
    }
}

/// Parse a successful JSON response, or classify the failure.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    if !resp.status().is_success() {
        return Err(classify_failure(resp).await);
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// Turn a non-2xx response into a typed error.
///
/// The API reports failures as `{error, errorCode}`; classification is by
/// status and message content, mirroring the vendor's documented
/// semantics: 401 splits into bad-credentials vs not-authenticated, "too
/// many requests/executions" is rate limiting, 503 is maintenance.
async fn classify_failure(resp: reqwest::Response) -> Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        return Error::Maintenance;
    }

    let envelope: ApiErrorBody = serde_json::from_str(&body).unwrap_or(ApiErrorBody {
        error: None,
        error_code: None,
    });
    let message = envelope.error.unwrap_or_else(|| body.trim().to_owned());
    let lower = message.to_lowercase();

    if lower.contains("too many requests") || lower.contains("too many executions") {
        return Error::RateLimited { message };
    }
    if let Some(ref code) = envelope.error_code {
        if code.starts_with("TOO_MANY") {
            return Error::RateLimited { message };
        }
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        if lower.contains("bad credentials") {
            return Error::BadCredentials { message };
        }
        return Error::NotAuthenticated;
    }

    Error::Api {
        message,
        code: envelope.error_code,
        status: status.as_u16(),
    }
}
