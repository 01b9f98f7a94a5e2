//! HTTP transport for the clock's built-in settings server.
//!
//! The device exposes three endpoints: `GET /setting`, `GET /brightness` and
//! `POST /setting` (form-encoded body, responds with the full settings).

use async_trait::async_trait;
use log::debug;
use std::time::Duration;

use clockpanel_core::settings::{SettingsPatch, SettingsSnapshot, StatusSnapshot};

use crate::error::{Result, SyncError};
use crate::transport::Transport;

/// Default timeout for device requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

fn is_unreachable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Client for one device's settings server.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    client: reqwest::Client,
    base_url: String,
}

impl DeviceClient {
    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[PanelSync] Device response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[PanelSync] Device response error ({}): {}", status, preview);
    }

    /// Create a client with the default request timeout.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root of the device's web server (e.g., "http://192.168.1.20")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SyncError::invalid_request(format!(
                "Device URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a prepared request, mapping connection failures to `Unreachable`.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        request.send().await.map_err(|err| {
            if is_unreachable_error(&err) {
                SyncError::unreachable(err.to_string())
            } else {
                SyncError::Http(err)
            }
        })
    }

    /// Parse a JSON response body.
    ///
    /// The device answers errors with a plain-text message, which becomes the
    /// message of the returned `SyncError::Api`.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            let message = body.trim();
            let message = if message.is_empty() {
                status.canonical_reason().unwrap_or("Request failed")
            } else {
                message
            };
            return Err(SyncError::api(status.as_u16(), message));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "[PanelSync] Failed to deserialize device response. Body: {}, Error: {}",
                body,
                e
            );
            SyncError::Json(e)
        })
    }

    /// Fetch the full settings.
    ///
    /// GET /setting
    pub async fn get_settings(&self) -> Result<SettingsSnapshot> {
        let url = format!("{}/setting", self.base_url);
        let response = self.send(self.client.get(&url)).await?;
        Self::parse_response(response).await
    }

    /// Fetch live brightness telemetry.
    ///
    /// GET /brightness
    pub async fn get_status(&self) -> Result<StatusSnapshot> {
        let url = format!("{}/brightness", self.base_url);
        let response = self.send(self.client.get(&url)).await?;
        Self::parse_response(response).await
    }

    /// Submit one sparse patch. Changing timezone or NTP servers makes the
    /// device reboot, in which case the connection usually drops.
    ///
    /// POST /setting
    pub async fn post_settings(&self, patch: &SettingsPatch) -> Result<SettingsSnapshot> {
        let url = format!("{}/setting", self.base_url);
        debug!("[PanelSync] Posting settings patch: {:?}", patch);

        let response = self
            .send(
                self.client
                    .post(&url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .form(patch),
            )
            .await?;

        Self::parse_response(response).await
    }
}

#[async_trait]
impl Transport for DeviceClient {
    async fn read_settings(&self) -> Result<SettingsSnapshot> {
        self.get_settings().await
    }

    async fn read_status(&self) -> Result<StatusSnapshot> {
        self.get_status().await
    }

    async fn write_settings(&self, patch: &SettingsPatch) -> Result<SettingsSnapshot> {
        self.post_settings(patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockpanel_core::settings::Pane;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    #[derive(Debug, Clone)]
    struct Received {
        method: String,
        path: String,
        content_type: Option<String>,
        body: String,
    }

    /// What the fake clock does with the next connection.
    enum Reply {
        Answer(u16, String),
        Hangup,
    }

    /// One-connection-per-reply fake clock on a loopback port.
    struct FakeClock {
        url: String,
        received: Arc<Mutex<Vec<Received>>>,
        task: JoinHandle<()>,
    }

    impl FakeClock {
        async fn serve(replies: Vec<Reply>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let url = format!("http://{}", listener.local_addr().expect("local addr"));
            let received = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&received);

            let task = tokio::spawn(async move {
                for reply in replies {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    let mut stream = BufReader::new(stream);
                    if let Some(request) = read_request(&mut stream).await {
                        log.lock().expect("request log").push(request);
                    }
                    if let Reply::Answer(status, body) = reply {
                        let head = format!(
                            "HTTP/1.1 {} Reply\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            status,
                            body.len()
                        );
                        let socket = stream.get_mut();
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(body.as_bytes()).await;
                    }
                }
            });

            Self {
                url,
                received,
                task,
            }
        }

        fn received(&self) -> Vec<Received> {
            self.received.lock().expect("request log").clone()
        }
    }

    impl Drop for FakeClock {
        fn drop(&mut self) {
            self.task.abort();
        }
    }

    async fn read_request(stream: &mut BufReader<TcpStream>) -> Option<Received> {
        let mut line = String::new();
        stream.read_line(&mut line).await.ok()?;
        let mut request_line = line.split_whitespace();
        let method = request_line.next()?.to_string();
        let path = request_line.next()?.to_string();

        let mut content_type = None;
        let mut length = 0;
        loop {
            line.clear();
            stream.read_line(&mut line).await.ok()?;
            let Some((name, value)) = line.trim_end().split_once(':') else {
                break;
            };
            match name.to_ascii_lowercase().as_str() {
                "content-type" => content_type = Some(value.trim().to_string()),
                "content-length" => length = value.trim().parse().ok()?,
                _ => {}
            }
        }

        let mut body = vec![0_u8; length];
        stream.read_exact(&mut body).await.ok()?;
        Some(Received {
            method,
            path,
            content_type,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    fn setting_body(pane: &str) -> String {
        format!(
            r#"{{"pane":"{}","override_pane":"NORMAL","brightness":{{"manual_value":3,"thresholds":[1024,360,270,200,160,120],"hysteresis":10}},"tzarea":"Asia","tzcity":"Tokyo","ntp":["ntp.nict.jp"],"elev":0,"use_ambient":false,"ambient_channelid":100,"ambient_writekey":"123456789012345678"}}"#,
            pane
        )
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = DeviceClient::new("192.168.1.20").expect_err("missing scheme");
        assert!(matches!(err, SyncError::InvalidRequest(_)));
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = DeviceClient::new("http://clock.local/").expect("client");
        assert_eq!(client.base_url(), "http://clock.local");
    }

    #[tokio::test]
    async fn reads_settings_and_status() {
        let clock = FakeClock::serve(vec![
            Reply::Answer(200, setting_body("TIME")),
            Reply::Answer(200, r#"{"brightness":4,"adc":210}"#.to_string()),
        ])
        .await;

        let client = DeviceClient::new(&clock.url).expect("client");
        let settings = client.read_settings().await.expect("settings");
        let status = client.read_status().await.expect("status");

        assert_eq!(settings.pane, Pane::Time);
        assert_eq!(status, StatusSnapshot { brightness: 4, adc: 210 });

        let requests = clock.received();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/setting");
        assert_eq!(requests[1].path, "/brightness");
    }

    #[tokio::test]
    async fn write_posts_form_encoded_patch() {
        let clock = FakeClock::serve(vec![Reply::Answer(200, setting_body("PRES_TIME"))]).await;

        let client = DeviceClient::new(&clock.url).expect("client");
        let settings = client
            .write_settings(&SettingsPatch::pane(Pane::PresTime))
            .await
            .expect("write");

        assert_eq!(settings.pane, Pane::PresTime);
        let requests = clock.received();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/setting");
        assert_eq!(
            requests[0].content_type.as_deref(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(requests[0].body, "pane=PRES_TIME");
    }

    #[tokio::test]
    async fn device_rejection_becomes_api_error() {
        let clock = FakeClock::serve(vec![Reply::Answer(
            400,
            "Invalid argument 'pane'\n".to_string(),
        )])
        .await;

        let client = DeviceClient::new(&clock.url).expect("client");
        let err = client
            .write_settings(&SettingsPatch::pane(Pane::Welcome))
            .await
            .expect_err("device rejects firmware-only pane");

        match err {
            SyncError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid argument 'pane'");
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dropped_connection_is_an_error() {
        let clock = FakeClock::serve(vec![Reply::Hangup]).await;

        let client = DeviceClient::new(&clock.url).expect("client");
        let err = client.read_settings().await.expect_err("no response");

        assert!(!err.is_rejected());
    }

    #[tokio::test]
    async fn malformed_body_is_json_error() {
        let clock = FakeClock::serve(vec![Reply::Answer(200, "{\"brightness\":".to_string())]).await;

        let client = DeviceClient::new(&clock.url).expect("client");
        let err = client.read_status().await.expect_err("truncated body");

        assert!(matches!(err, SyncError::Json(_)));
    }
}
