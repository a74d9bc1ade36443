// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform session acquisition: cookie reuse or interactive login.
//!
//! The provider validates stored cookies with a cheap authenticated probe
//! and falls back to a UI login flow, harvesting the fresh cookie jar for
//! the credential store. Each pass owns exactly one [`BrowserSession`]; the
//! orchestrator closes it on every exit path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::cookies::Cookie;
use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder};
use staysync_config::model::AutomationConfig;
use staysync_core::types::{
    HostRecord, RemoteListing, RemoteMessage, RemoteThread, SessionCookie, UiSendReceipt,
};
use staysync_core::{BrowserTransport, CredentialStore, PlatformSession, SyncError, Transport};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::fetch;
use crate::locator::{LOGIN_EMAIL_STRATEGIES, LOGIN_PASSWORD_STRATEGIES, pick_sole_visible_non_button};
use crate::send::{self, UiTimeouts, locate_with_strategies};
use crate::threadid::decode_thread_id;

/// Environment variable holding the platform account password for the
/// interactive login fallback.
const PASSWORD_ENV: &str = "STAYSYNC_PLATFORM_PASSWORD";

/// WebDriver-backed session provider implementing [`BrowserTransport`].
pub struct WebDriverSessionProvider {
    config: AutomationConfig,
    credentials: Arc<dyn CredentialStore>,
}

impl WebDriverSessionProvider {
    pub fn new(config: AutomationConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            credentials,
        }
    }

    async fn connect(&self) -> Result<Client, SyncError> {
        let builder = ClientBuilder::rustls().map_err(|e| {
            SyncError::Config(format!("failed to initialize WebDriver TLS: {e}"))
        })?;
        builder
            .connect(&self.config.webdriver_url)
            .await
            .map_err(|e| SyncError::TransportUnavailable {
                transport: Transport::BrowserAutomation,
                reason: format!(
                    "cannot reach WebDriver at {}: {e}",
                    self.config.webdriver_url
                ),
            })
    }

    /// UI login flow, using the same ranked locator machinery as the send
    /// primitive. On success the fresh cookie jar is persisted.
    async fn login(&self, client: &Client, host: &HostRecord) -> Result<Vec<SessionCookie>, SyncError> {
        let login_name = host.platform_login.as_deref().ok_or_else(|| {
            SyncError::Config(format!("host {} has no platform_login configured", host.id))
        })?;
        let password = std::env::var(PASSWORD_ENV).map_err(|_| {
            SyncError::Config(format!(
                "{PASSWORD_ENV} must be set for the interactive login fallback"
            ))
        })?;

        let login_url = format!("{}/login", base(&self.config));
        client
            .goto(&login_url)
            .await
            .map_err(|e| expired(host, format!("cannot open login page: {e}")))?;

        let (email_input, strategy) =
            locate_with_strategies(client, LOGIN_EMAIL_STRATEGIES, pick_sole_visible_non_button)
                .await
                .map_err(|e| expired(host, format!("login email lookup failed: {e}")))?
                .ok_or_else(|| expired(host, "login email field not found".into()))?;
        debug!(strategy, "login email field located");
        email_input
            .send_keys(login_name)
            .await
            .map_err(|e| expired(host, format!("cannot type login name: {e}")))?;

        let (password_input, strategy) = locate_with_strategies(
            client,
            LOGIN_PASSWORD_STRATEGIES,
            pick_sole_visible_non_button,
        )
        .await
        .map_err(|e| expired(host, format!("login password lookup failed: {e}")))?
        .ok_or_else(|| expired(host, "login password field not found".into()))?;
        debug!(strategy, "login password field located");
        password_input
            .send_keys(&password)
            .await
            .map_err(|e| expired(host, format!("cannot type password: {e}")))?;

        let enter = char::from(Key::Enter);
        password_input
            .send_keys(&enter.to_string())
            .await
            .map_err(|e| expired(host, format!("cannot submit login form: {e}")))?;

        tokio::time::sleep(Duration::from_secs(2)).await;

        let url = client
            .current_url()
            .await
            .map(|u| u.to_string())
            .unwrap_or_default();
        let title = client.title().await.unwrap_or_default();
        if send::is_login_surface(&url, &title) {
            return Err(expired(host, "still on login surface after submit".into()));
        }

        let harvested = client
            .get_all_cookies()
            .await
            .map_err(|e| expired(host, format!("cannot harvest cookies: {e}")))?;
        let cookies: Vec<SessionCookie> = harvested
            .iter()
            .map(|c| to_session_cookie(c, &self.config))
            .collect();

        self.credentials.store_cookies(&host.id, &cookies).await?;
        info!(host_id = host.id.as_str(), count = cookies.len(), "login cookies stored");
        Ok(cookies)
    }
}

#[async_trait]
impl BrowserTransport for WebDriverSessionProvider {
    async fn open(&self, host: &HostRecord) -> Result<Box<dyn PlatformSession>, SyncError> {
        if !self.config.enabled {
            return Err(SyncError::TransportUnavailable {
                transport: Transport::BrowserAutomation,
                reason: "automation is disabled in configuration".into(),
            });
        }
        if !host.automation_enabled {
            return Err(SyncError::TransportUnavailable {
                transport: Transport::BrowserAutomation,
                reason: format!("automation is disabled for host {}", host.id),
            });
        }

        let client = self.connect().await?;
        let base_url = base(&self.config);

        // Cookies can only be attached once the browser is on the platform's
        // origin.
        if let Err(e) = client.goto(&base_url).await {
            let _ = client.clone().close().await;
            return Err(SyncError::TransportUnavailable {
                transport: Transport::BrowserAutomation,
                reason: format!("cannot reach {base_url}: {e}"),
            });
        }

        let stored = self.credentials.cookies_for(&host.id).await?;
        let cookies = match stored {
            Some(cookies) if !cookies.is_empty() => {
                for cookie in &cookies {
                    let mut c = Cookie::new(cookie.name.clone(), cookie.value.clone());
                    c.set_domain(cookie.domain.clone());
                    c.set_path(cookie.path.clone());
                    if let Err(e) = client.add_cookie(c).await {
                        debug!(name = cookie.name.as_str(), error = %e, "cookie rejected");
                    }
                }

                let http = build_http_client(&cookies, &base_url, &self.config)?;
                match probe_session(&http, &base_url, &host.id).await {
                    Ok(()) => cookies,
                    Err(e) if e.is_session_expired() => {
                        warn!(host_id = host.id.as_str(), "stored cookies stale, re-logging in");
                        match self.login(&client, host).await {
                            Ok(fresh) => fresh,
                            Err(e) => {
                                let _ = client.clone().close().await;
                                return Err(e);
                            }
                        }
                    }
                    Err(e) => {
                        let _ = client.clone().close().await;
                        return Err(e);
                    }
                }
            }
            _ => match self.login(&client, host).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    let _ = client.clone().close().await;
                    return Err(e);
                }
            },
        };

        let http = build_http_client(&cookies, &base_url, &self.config)?;
        info!(host_id = host.id.as_str(), "platform session established");

        Ok(Box::new(BrowserSession {
            host_id: host.id.clone(),
            client,
            http,
            base_url,
            timeouts: UiTimeouts {
                navigation: Duration::from_secs(self.config.nav_timeout_secs),
                element_wait: Duration::from_secs(self.config.element_wait_secs),
            },
        }))
    }
}

/// One authenticated platform session: a WebDriver client for UI work plus a
/// cookie-loaded HTTP client for the SPA's internal API.
pub struct BrowserSession {
    host_id: String,
    client: Client,
    http: reqwest::Client,
    base_url: String,
    timeouts: UiTimeouts,
}

#[async_trait]
impl PlatformSession for BrowserSession {
    fn host_id(&self) -> &str {
        &self.host_id
    }

    async fn list_listings(&self) -> Result<Vec<RemoteListing>, SyncError> {
        fetch::fetch_listings(&self.http, &self.base_url, &self.host_id).await
    }

    async fn list_threads(&self) -> Result<Vec<RemoteThread>, SyncError> {
        fetch::fetch_threads(&self.http, &self.base_url, &self.host_id).await
    }

    async fn fetch_thread(
        &self,
        external_thread_id: &str,
    ) -> Result<Vec<RemoteMessage>, SyncError> {
        fetch::fetch_thread_messages(&self.http, &self.base_url, &self.host_id, external_thread_id)
            .await
    }

    async fn send_reply(
        &self,
        external_thread_id: &str,
        text: &str,
    ) -> Result<UiSendReceipt, SyncError> {
        let numeric = decode_thread_id(external_thread_id).ok_or_else(|| {
            SyncError::RemoteSendFailed {
                stage: None,
                message: format!("unrecognized thread id `{external_thread_id}`"),
                source: None,
            }
        })?;
        send::send_reply(
            &self.client,
            &self.base_url,
            &self.host_id,
            numeric,
            text,
            &self.timeouts,
        )
        .await
    }

    async fn close(&self) -> Result<(), SyncError> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| SyncError::Internal(format!("failed to close browser session: {e}")))?;
        debug!(host_id = self.host_id.as_str(), "browser session closed");
        Ok(())
    }
}

/// Cheap authenticated probe: any login redirect or 401 means the cookie jar
/// is stale.
async fn probe_session(
    http: &reqwest::Client,
    base_url: &str,
    host_id: &str,
) -> Result<(), SyncError> {
    let url = format!("{base_url}/api/account/me");
    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| SyncError::RemoteFetchFailed {
            message: format!("session probe failed: {e}"),
            source: Some(Box::new(e)),
        })?;

    if fetch::is_login_path(response.url().path())
        || response.status() == reqwest::StatusCode::UNAUTHORIZED
    {
        return Err(SyncError::SessionExpired {
            host_id: host_id.to_string(),
        });
    }
    Ok(())
}

fn build_http_client(
    cookies: &[SessionCookie],
    base_url: &str,
    config: &AutomationConfig,
) -> Result<reqwest::Client, SyncError> {
    let url = reqwest::Url::parse(base_url)
        .map_err(|e| SyncError::Config(format!("invalid platform_base_url: {e}")))?;

    let jar = reqwest::cookie::Jar::default();
    for cookie in cookies {
        jar.add_cookie_str(
            &format!(
                "{}={}; Domain={}; Path={}",
                cookie.name, cookie.value, cookie.domain, cookie.path
            ),
            &url,
        );
    }

    reqwest::Client::builder()
        .cookie_provider(Arc::new(jar))
        .timeout(Duration::from_secs(config.response_timeout_secs))
        .build()
        .map_err(|e| SyncError::Config(format!("failed to build session HTTP client: {e}")))
}

fn to_session_cookie(cookie: &Cookie<'_>, config: &AutomationConfig) -> SessionCookie {
    let fallback_domain = reqwest::Url::parse(&base(config))
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_default();
    SessionCookie {
        name: cookie.name().to_string(),
        value: cookie.value().to_string(),
        domain: cookie
            .domain()
            .map(String::from)
            .unwrap_or(fallback_domain),
        path: cookie.path().map(String::from).unwrap_or_else(|| "/".into()),
    }
}

fn base(config: &AutomationConfig) -> String {
    config.platform_base_url.trim_end_matches('/').to_string()
}

fn expired(host: &HostRecord, reason: String) -> SyncError {
    warn!(host_id = host.id.as_str(), reason = reason.as_str(), "session acquisition failed");
    SyncError::SessionExpired {
        host_id: host.id.clone(),
    }
}

/// In-memory credential cache, the default [`CredentialStore`] when no
/// external store is wired in. Cookies survive across passes within one
/// process only.
#[derive(Default)]
pub struct MemoryCredentialStore {
    cookies: Mutex<HashMap<String, Vec<SessionCookie>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn cookies_for(&self, host_id: &str) -> Result<Option<Vec<SessionCookie>>, SyncError> {
        Ok(self.cookies.lock().await.get(host_id).cloned())
    }

    async fn store_cookies(
        &self,
        host_id: &str,
        cookies: &[SessionCookie],
    ) -> Result<(), SyncError> {
        self.cookies
            .lock()
            .await
            .insert(host_id.to_string(), cookies.to_vec());
        Ok(())
    }
}
