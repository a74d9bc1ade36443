// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ranked element-locator strategies.
//!
//! The platform's UI is unversioned and changes without notice, so every
//! element lookup is a prioritized list of matching strategies with explicit
//! fallthrough, never a single hard-coded selector. The strategy that
//! matched is logged to keep future breakage diagnosable rather than silent.
//!
//! Candidate selection is a pure function over observed element facts so the
//! ranking rules are testable without a WebDriver.

/// One named CSS strategy in a ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorStrategy {
    /// Short name for logs ("test-hook", "semantic", "structural", ...).
    pub name: &'static str,
    pub css: &'static str,
}

/// Strategies for the message-composition input, most specific first:
/// attribute-based test hooks, then semantic role/placeholder matching,
/// then a broad structural fallback.
pub const COMPOSER_STRATEGIES: &[LocatorStrategy] = &[
    LocatorStrategy {
        name: "test-hook",
        css: "[data-testid*='composer'] textarea, textarea[data-testid], \
              [data-testid*='message-input'], [data-hook*='composer'] textarea",
    },
    LocatorStrategy {
        name: "semantic",
        css: "textarea[placeholder], [role='textbox'], textarea[aria-label]",
    },
    LocatorStrategy {
        name: "structural",
        css: "textarea, [contenteditable='true'], input[type='text']",
    },
];

/// Strategies for the send control: test hooks, then accessible-name
/// matching, then generic submit semantics.
pub const SEND_CONTROL_STRATEGIES: &[LocatorStrategy] = &[
    LocatorStrategy {
        name: "test-hook",
        css: "button[data-testid*='send'], [data-testid*='send'] button, \
              [data-hook*='send-button']",
    },
    LocatorStrategy {
        name: "accessible-name",
        css: "button[aria-label*='Send' i], button[title*='Send' i]",
    },
    LocatorStrategy {
        name: "submit",
        css: "button[type='submit'], form button",
    },
];

/// Strategies for the login form fields.
pub const LOGIN_EMAIL_STRATEGIES: &[LocatorStrategy] = &[
    LocatorStrategy {
        name: "test-hook",
        css: "input[data-testid*='email'], input[data-testid*='login']",
    },
    LocatorStrategy {
        name: "semantic",
        css: "input[type='email'], input[name='email'], input[autocomplete='username']",
    },
];

pub const LOGIN_PASSWORD_STRATEGIES: &[LocatorStrategy] = &[
    LocatorStrategy {
        name: "test-hook",
        css: "input[data-testid*='password']",
    },
    LocatorStrategy {
        name: "semantic",
        css: "input[type='password'], input[name='password']",
    },
];

/// Facts observed about one candidate element, gathered by the driver glue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedCandidate {
    /// Index into the strategy's `find_all` result.
    pub index: usize,
    pub visible: bool,
    /// Lowercased DOM tag name.
    pub tag: String,
    /// The element's `type` attribute, when present.
    pub type_attr: Option<String>,
}

impl ObservedCandidate {
    fn is_button(&self) -> bool {
        self.tag == "button"
            || matches!(self.type_attr.as_deref(), Some("button") | Some("submit"))
    }
}

/// Pick the composer candidate: exactly one visible, non-button element.
///
/// More than one visible match means the strategy is too broad to trust and
/// the next strategy should be tried instead.
pub fn pick_sole_visible_non_button(candidates: &[ObservedCandidate]) -> Option<usize> {
    let mut visible = candidates
        .iter()
        .filter(|c| c.visible && !c.is_button());
    let first = visible.next()?;
    if visible.next().is_some() {
        return None;
    }
    Some(first.index)
}

/// Pick the send control: the first visible candidate.
pub fn pick_first_visible(candidates: &[ObservedCandidate]) -> Option<usize> {
    candidates.iter().find(|c| c.visible).map(|c| c.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(index: usize, visible: bool, tag: &str, type_attr: Option<&str>) -> ObservedCandidate {
        ObservedCandidate {
            index,
            visible,
            tag: tag.to_string(),
            type_attr: type_attr.map(String::from),
        }
    }

    #[test]
    fn sole_visible_textarea_wins() {
        let candidates = vec![
            cand(0, false, "textarea", None),
            cand(1, true, "textarea", None),
        ];
        assert_eq!(pick_sole_visible_non_button(&candidates), Some(1));
    }

    #[test]
    fn buttons_are_excluded_from_composer_pick() {
        let candidates = vec![
            cand(0, true, "button", None),
            cand(1, true, "input", Some("submit")),
            cand(2, true, "textarea", None),
        ];
        assert_eq!(pick_sole_visible_non_button(&candidates), Some(2));
    }

    #[test]
    fn two_visible_inputs_reject_the_strategy() {
        let candidates = vec![
            cand(0, true, "textarea", None),
            cand(1, true, "textarea", None),
        ];
        assert_eq!(pick_sole_visible_non_button(&candidates), None);
    }

    #[test]
    fn no_visible_candidates_reject_the_strategy() {
        let candidates = vec![cand(0, false, "textarea", None)];
        assert_eq!(pick_sole_visible_non_button(&candidates), None);
        assert_eq!(pick_sole_visible_non_button(&[]), None);
    }

    #[test]
    fn send_control_takes_first_visible() {
        let candidates = vec![
            cand(0, false, "button", Some("submit")),
            cand(1, true, "button", Some("submit")),
            cand(2, true, "button", None),
        ];
        assert_eq!(pick_first_visible(&candidates), Some(1));
    }

    #[test]
    fn strategy_lists_are_ordered_most_specific_first() {
        assert_eq!(COMPOSER_STRATEGIES[0].name, "test-hook");
        assert_eq!(COMPOSER_STRATEGIES.last().unwrap().name, "structural");
        assert_eq!(SEND_CONTROL_STRATEGIES[0].name, "test-hook");
        assert_eq!(SEND_CONTROL_STRATEGIES.last().unwrap().name, "submit");
    }
}
