// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The staged UI send primitive.
//!
//! This is the least reliable component by construction: it manipulates a
//! third party's unversioned UI. Unreliability is absorbed through staged
//! degradation (navigate, locate input, enter text, locate send control,
//! verify), with ranked locator strategies at every lookup and per-stage
//! diagnostic context in every failure. Callers see one error kind;
//! operators can tell "page structure changed" from "transient load failure"
//! by the captured context.

use std::fmt;
use std::time::Duration;

use fantoccini::elements::Element;
use fantoccini::key::Key;
use fantoccini::{Client, Locator};
use staysync_core::SyncError;
use staysync_core::types::{SendStage, UiSendReceipt};
use tracing::{debug, info, warn};

use crate::fetch::is_login_path;
use crate::locator::{
    COMPOSER_STRATEGIES, LocatorStrategy, ObservedCandidate, SEND_CONTROL_STRATEGIES,
    pick_first_visible, pick_sole_visible_non_button,
};

/// Page-source markers whose presence suggests the thread view rendered at
/// all; their absence points at a transient load failure rather than a
/// structure change.
const THREAD_VIEW_MARKERS: &[&str] = &["messaging", "thread"];

const SET_VALUE_SCRIPT: &str = "try { \
     var el = arguments[0]; var text = arguments[1]; \
     if ('value' in el) { el.value = text; } else { el.textContent = text; } \
     el.dispatchEvent(new Event('input', { bubbles: true })); \
     return true; \
 } catch (e) { return false; }";

/// Timeouts for UI interaction, taken from the automation config.
#[derive(Debug, Clone, Copy)]
pub struct UiTimeouts {
    pub navigation: Duration,
    pub element_wait: Duration,
}

/// Send reply text into the thread view under the authenticated session.
///
/// Stage E acceptance: once Stage D's action completed without throwing, a
/// failed or impossible verification is still success with
/// `verified: false`.
pub async fn send_reply(
    client: &Client,
    base_url: &str,
    host_id: &str,
    thread_numeric_id: u64,
    text: &str,
    timeouts: &UiTimeouts,
) -> Result<UiSendReceipt, SyncError> {
    // Stage A: navigate to the thread view.
    let url = format!("{base_url}/messaging/thread/{thread_numeric_id}");
    tokio::time::timeout(timeouts.navigation, client.goto(&url))
        .await
        .map_err(|_| SyncError::Timeout {
            duration: timeouts.navigation,
        })?
        .map_err(|e| {
            stage_error(
                SendStage::Navigate,
                &format!("navigation to {url} failed: {e}"),
                None,
            )
        })?;

    let diag = diagnose(client).await;
    if is_login_surface(&diag.url, &diag.title) {
        return Err(SyncError::SessionExpired {
            host_id: host_id.to_string(),
        });
    }

    // Stage B: locate the message-composition input.
    let (input, strategy) = locate_composer(client, timeouts.element_wait)
        .await
        .map_err(|e| {
            stage_error(
                SendStage::LocateInput,
                &format!("composer lookup failed: {e}"),
                Some(&diag),
            )
        })?
        .ok_or_else(|| {
            stage_error(
                SendStage::LocateInput,
                "no strategy yielded exactly one visible non-button candidate",
                Some(&diag),
            )
        })?;
    info!(strategy, "composer located");

    // Stage C: direct value assignment, simulated keystrokes as fallback.
    let assigned = assign_value(client, &input, text).await;
    if !assigned {
        debug!("value assignment rejected, falling back to keystrokes");
        let _ = input.clear().await;
        input.send_keys(text).await.map_err(|e| {
            stage_error(
                SendStage::EnterText,
                &format!("keystroke entry failed: {e}"),
                Some(&diag),
            )
        })?;
    }

    // Stage D: locate and activate the send control, or commit via Enter.
    match locate_send_control(client).await {
        Ok(Some((control, strategy))) => {
            info!(strategy, "send control located");
            control.click().await.map_err(|e| {
                stage_error(
                    SendStage::LocateSend,
                    &format!("send control click failed: {e}"),
                    Some(&diag),
                )
            })?;
        }
        Ok(None) => {
            debug!("no send control found, committing via Enter key");
            let enter = char::from(Key::Enter);
            input.send_keys(&enter.to_string()).await.map_err(|e| {
                stage_error(
                    SendStage::LocateSend,
                    &format!("commit-key fallback failed: {e}"),
                    Some(&diag),
                )
            })?;
        }
        Err(e) => {
            return Err(stage_error(
                SendStage::LocateSend,
                &format!("send control lookup failed: {e}"),
                Some(&diag),
            ));
        }
    }

    // Stage E: opportunistic verification. Never a send failure from here on.
    let verified = match client.source().await {
        Ok(source) => source.contains(text),
        Err(e) => {
            warn!(error = %e, "could not verify sent text in rendered thread");
            false
        }
    };
    if !verified {
        warn!(thread_numeric_id, "send unverified; reporting probably-sent");
    }

    Ok(UiSendReceipt {
        external_message_id: None,
        verified,
    })
}

/// Whether the current location/title indicates an expired session.
pub fn is_login_surface(url: &str, title: &str) -> bool {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let title = title.to_lowercase();
    is_login_path(&path) || title.contains("log in") || title.contains("sign in")
}

async fn assign_value(client: &Client, input: &Element, text: &str) -> bool {
    let element_arg = match serde_json::to_value(input) {
        Ok(v) => v,
        Err(_) => return false,
    };
    match client
        .execute(SET_VALUE_SCRIPT, vec![element_arg, serde_json::json!(text)])
        .await
    {
        Ok(result) => result.as_bool().unwrap_or(false),
        Err(e) => {
            debug!(error = %e, "value-assignment script failed");
            false
        }
    }
}

/// Try composer strategies in rank order until the deadline, re-scanning the
/// page between rounds (SPAs render the composer late).
async fn locate_composer(
    client: &Client,
    wait: Duration,
) -> Result<Option<(Element, &'static str)>, fantoccini::error::CmdError> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        if let Some(found) =
            locate_with_strategies(client, COMPOSER_STRATEGIES, pick_sole_visible_non_button)
                .await?
        {
            return Ok(Some(found));
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

async fn locate_send_control(
    client: &Client,
) -> Result<Option<(Element, &'static str)>, fantoccini::error::CmdError> {
    locate_with_strategies(client, SEND_CONTROL_STRATEGIES, pick_first_visible).await
}

/// Run ranked strategies against the live page: observe each strategy's
/// candidates, let the pure picker decide, stop at the first hit.
pub(crate) async fn locate_with_strategies(
    client: &Client,
    strategies: &[LocatorStrategy],
    pick: fn(&[ObservedCandidate]) -> Option<usize>,
) -> Result<Option<(Element, &'static str)>, fantoccini::error::CmdError> {
    for strategy in strategies {
        let elements = client.find_all(Locator::Css(strategy.css)).await?;
        if elements.is_empty() {
            debug!(strategy = strategy.name, "no candidates");
            continue;
        }

        let mut observed = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let visible = element.is_displayed().await.unwrap_or(false);
            let tag = element
                .prop("tagName")
                .await
                .ok()
                .flatten()
                .unwrap_or_default()
                .to_lowercase();
            let type_attr = element.attr("type").await.ok().flatten();
            observed.push(ObservedCandidate {
                index,
                visible,
                tag,
                type_attr,
            });
        }

        if let Some(index) = pick(&observed) {
            return Ok(Some((elements[index].clone(), strategy.name)));
        }
        debug!(
            strategy = strategy.name,
            candidates = observed.len(),
            "strategy rejected"
        );
    }
    Ok(None)
}

// --- Failure diagnostics ---

/// Best-effort snapshot of where the browser ended up, attached to every
/// stage failure.
pub struct PageDiagnostics {
    pub url: String,
    pub title: String,
    pub markers_present: bool,
}

impl fmt::Display for PageDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "url={} title={:?} thread_markers={}",
            self.url, self.title, self.markers_present
        )
    }
}

async fn diagnose(client: &Client) -> PageDiagnostics {
    let url = client
        .current_url()
        .await
        .map(|u| u.to_string())
        .unwrap_or_else(|_| "-".to_string());
    let title = client.title().await.unwrap_or_else(|_| "-".to_string());
    let markers_present = match client.source().await {
        Ok(source) => {
            let lowered = source.to_lowercase();
            THREAD_VIEW_MARKERS.iter().any(|m| lowered.contains(m))
        }
        Err(_) => false,
    };
    PageDiagnostics {
        url,
        title,
        markers_present,
    }
}

fn stage_error(stage: SendStage, message: &str, diag: Option<&PageDiagnostics>) -> SyncError {
    let message = match diag {
        Some(diag) => format!("{message} ({diag})"),
        None => message.to_string(),
    };
    SyncError::RemoteSendFailed {
        stage: Some(stage),
        message,
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_surface_detected_by_path_and_title() {
        assert!(is_login_surface(
            "https://platform.example/login?next=%2Fmessaging",
            "Welcome"
        ));
        assert!(is_login_surface(
            "https://platform.example/messaging/thread/1",
            "Log in to continue"
        ));
        assert!(!is_login_surface(
            "https://platform.example/messaging/thread/1",
            "Conversation with Bob"
        ));
    }

    #[test]
    fn stage_error_includes_diagnostics() {
        let diag = PageDiagnostics {
            url: "https://platform.example/messaging/thread/1".into(),
            title: "Conversation".into(),
            markers_present: true,
        };
        let err = stage_error(SendStage::LocateInput, "no candidate", Some(&diag));
        let rendered = err.to_string();
        assert!(rendered.contains("locate_input"));
        assert!(rendered.contains("thread_markers=true"));
    }
}
