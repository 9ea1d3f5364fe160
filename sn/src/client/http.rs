//! HTTP client for the academic affairs selection system
//!
//! Each attempt refreshes the selection session with a GET on the selection
//! index page, then posts the selection form. The JSON reply carries a
//! `flag` ("1" on success) and a human readable `msg`.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use targetstore::TargetResource;
use tracing::{debug, warn};

use super::{AcquireError, AcquisitionClient, AttemptOutcome};
use crate::config::ClientConfig;

/// Function module code of the self-service selection pages
const GNMKDM: &str = "N253512";

const INDEX_PATH: &str = "/jwglxt/xsxk/zzxkyzb_cxZzxkYzbIndex.html";
const SELECT_PATH: &str = "/jwglxt/xsxk/zzxkyzbjk_xkBcZyZzxkYzb.html";

/// Selection system client
pub struct HttpAcquisitionClient {
    base_url: String,
    student_id: String,
    selection: Vec<(&'static str, String)>,
    http: Client,
    timeout: Duration,
    acquired: Mutex<HashSet<String>>,
}

impl HttpAcquisitionClient {
    /// Create a client from configuration
    ///
    /// The session cookie is read from the environment variable named by
    /// `cookie-env`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AcquireError> {
        debug!(base_url = %config.base_url, "HttpAcquisitionClient::from_config: called");
        config.validate().map_err(|e| AcquireError::Config(e.to_string()))?;

        let cookie = std::env::var(&config.cookie_env)
            .map_err(|_| AcquireError::Config(format!("environment variable {} is not set", config.cookie_env)))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(cookie.trim()).map_err(|e| AcquireError::Config(format!("invalid cookie: {}", e)))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| AcquireError::Config(format!("invalid user agent: {}", e)))?,
        );

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(AcquireError::Network)?;

        let params = &config.selection;
        let selection = vec![
            ("xkkz_id", params.xkkz_id.clone()),
            ("njdm_id", params.njdm_id.clone()),
            ("njdm_id_xs", params.njdm_id_xs.clone()),
            ("zyh_id", params.zyh_id.clone()),
            ("zyh_id_xs", params.zyh_id_xs.clone()),
            ("xkxnm", params.xkxnm.clone()),
            ("xkxqm", params.xkxqm.clone()),
        ];

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            student_id: config.student_id.clone(),
            selection,
            http,
            timeout,
            acquired: Mutex::new(HashSet::new()),
        })
    }

    fn already_acquired(&self, resource_id: &str) -> bool {
        self.acquired.lock().map(|set| set.contains(resource_id)).unwrap_or(false)
    }

    fn remember_acquired(&self, resource_id: &str) {
        if let Ok(mut set) = self.acquired.lock() {
            set.insert(resource_id.to_string());
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> AcquireError {
        if e.is_timeout() {
            AcquireError::Timeout(self.timeout)
        } else {
            AcquireError::Network(e)
        }
    }

    /// Reload the selection index so the server keeps our session selectable
    async fn refresh_session(&self) -> Result<(), AcquireError> {
        let url = format!("{}{}", self.base_url, INDEX_PATH);
        debug!(%url, "HttpAcquisitionClient::refresh_session: called");

        let response = self
            .http
            .get(&url)
            .query(&[("gnmkdm", GNMKDM), ("layout", "default")])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::Session(format!("status {}", status.as_u16())));
        }
        Ok(())
    }

    /// Form fields for one selection request
    pub fn form_fields(&self, target: &TargetResource) -> Vec<(String, String)> {
        let mut fields = vec![
            ("jxb_ids".to_string(), target.section_id.clone()),
            ("kch_id".to_string(), target.resource_id.clone()),
            (
                "qz".to_string(),
                target.attribute_str("qz").unwrap_or("0").to_string(),
            ),
        ];
        for (name, default) in &self.selection {
            let value = target.attribute_str(name).unwrap_or(default.as_str());
            fields.push((name.to_string(), value.to_string()));
        }
        fields
    }
}

#[async_trait]
impl AcquisitionClient for HttpAcquisitionClient {
    async fn attempt(&self, target: &TargetResource) -> Result<AttemptOutcome, AcquireError> {
        let id = target.resource_id.as_str();
        debug!(%id, section = %target.section_id, "HttpAcquisitionClient::attempt: called");

        if self.already_acquired(id) {
            return Ok(AttemptOutcome::Acquired);
        }

        if let Err(e) = self.refresh_session().await {
            warn!(%id, error = %e, "Session refresh failed");
            return Err(e);
        }

        let url = format!("{}{}", self.base_url, SELECT_PATH);
        let referer = format!("{}{}?gnmkdm={}&layout=default", self.base_url, INDEX_PATH, GNMKDM);

        let response = self
            .http
            .post(&url)
            .query(&[("gnmkdm", GNMKDM), ("su", self.student_id.as_str())])
            .header("Referer", referer)
            .header("Origin", self.base_url.as_str())
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Accept", "application/json, text/javascript, */*; q=0.01")
            .form(&self.form_fields(target))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        let outcome = interpret_response(status, &body)?;
        if outcome.is_acquired() {
            self.remember_acquired(id);
        }
        debug!(%id, %outcome, "HttpAcquisitionClient::attempt: done");
        Ok(outcome)
    }
}

#[derive(Debug, Deserialize)]
struct SelectionReply {
    #[serde(default)]
    flag: Option<serde_json::Value>,
    #[serde(default)]
    msg: Option<String>,
}

/// Classify a selection reply
///
/// A non-200 status is transient; a body that is not the expected JSON is an
/// [`AcquireError::InvalidResponse`] (usually an expired-session login page).
pub fn interpret_response(status: u16, body: &str) -> Result<AttemptOutcome, AcquireError> {
    if status != 200 {
        let snippet: String = body.chars().take(120).collect();
        return Ok(AttemptOutcome::transient(format!("HTTP {}: {}", status, snippet.trim())));
    }

    let reply: SelectionReply = serde_json::from_str(body).map_err(|e| {
        let snippet: String = body.chars().take(80).collect();
        AcquireError::InvalidResponse(format!("{} ({})", e, snippet.trim()))
    })?;

    let success = match &reply.flag {
        Some(serde_json::Value::String(s)) => s == "1",
        Some(serde_json::Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    };

    if success {
        Ok(AttemptOutcome::Acquired)
    } else {
        Ok(AttemptOutcome::rejected(
            reply.msg.filter(|m| !m.is_empty()).unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_string_success() {
        let outcome = interpret_response(200, r#"{"flag":"1","msg":"ok"}"#).unwrap();
        assert_eq!(outcome, AttemptOutcome::Acquired);
    }

    #[test]
    fn test_flag_number_success() {
        let outcome = interpret_response(200, r#"{"flag":1}"#).unwrap();
        assert_eq!(outcome, AttemptOutcome::Acquired);
    }

    #[test]
    fn test_rejection_carries_message() {
        let outcome = interpret_response(200, r#"{"flag":"0","msg":"section full"}"#).unwrap();
        assert_eq!(outcome, AttemptOutcome::rejected("section full"));
    }

    #[test]
    fn test_rejection_without_message() {
        let outcome = interpret_response(200, r#"{"flag":"-1"}"#).unwrap();
        assert_eq!(outcome, AttemptOutcome::rejected("unknown error"));
    }

    #[test]
    fn test_non_200_is_transient() {
        let outcome = interpret_response(502, "Bad Gateway").unwrap();
        assert!(matches!(outcome, AttemptOutcome::Transient { .. }));
        assert!(outcome.to_string().contains("HTTP 502"));
    }

    #[test]
    fn test_html_body_is_invalid_response() {
        let err = interpret_response(200, "<html><body>login</body></html>").unwrap_err();
        assert!(matches!(err, AcquireError::InvalidResponse(_)));
        assert!(err.is_transient());
    }

    fn client_config() -> ClientConfig {
        let mut config = ClientConfig {
            base_url: "https://jw.example.edu.cn/".to_string(),
            student_id: "20231234".to_string(),
            cookie_env: "SEATSNIPER_TEST_COOKIE_HTTP".to_string(),
            ..Default::default()
        };
        config.selection.xkkz_id = "KZ1".to_string();
        config.selection.xkxnm = "2024".to_string();
        config
    }

    #[test]
    fn test_missing_cookie_is_config_error() {
        let mut config = client_config();
        config.cookie_env = "SEATSNIPER_TEST_COOKIE_UNSET".to_string();
        let err = HttpAcquisitionClient::from_config(&config).err().unwrap();
        assert!(matches!(err, AcquireError::Config(_)));
    }

    #[test]
    fn test_form_fields_with_overrides() {
        // SAFETY: this variable is only read by this test
        unsafe { std::env::set_var("SEATSNIPER_TEST_COOKIE_HTTP", "JSESSIONID=abc") };
        let client = HttpAcquisitionClient::from_config(&client_config()).unwrap();
        assert_eq!(client.base_url, "https://jw.example.edu.cn");

        let target = TargetResource::new("C1", "Calculus", "J1")
            .with_attribute("xkkz_id", "KZ9")
            .with_attribute("qz", "2");
        let fields = client.form_fields(&target);
        let get = |k: &str| fields.iter().find(|(n, _)| n == k).map(|(_, v)| v.as_str());

        assert_eq!(get("jxb_ids"), Some("J1"));
        assert_eq!(get("kch_id"), Some("C1"));
        assert_eq!(get("qz"), Some("2"));
        assert_eq!(get("xkkz_id"), Some("KZ9"));
        assert_eq!(get("xkxnm"), Some("2024"));
        assert_eq!(get("zyh_id"), Some(""));
    }
}
