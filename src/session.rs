//! Session establishment.
//!
//! Two alternative strategies, each verified afterwards: cookie injection
//! (tried first: faster, and keeps credentials off the live page) and
//! credential form submission. Injection or submission alone is never taken
//! as proof; the session counts as authenticated only once a logged-in
//! marker is visible.

use eoka::Page;
use tracing::{debug, info, warn};

use crate::config::{Config, COOKIE_DOMAINS};
use crate::diag::Diag;
use crate::labels::LabelPack;
use crate::locate::{self, AttrPattern, Strategy};

/// A cookie parsed from a raw `name=value; ...` header string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Parse a raw cookie header into discrete name/value pairs. Surrounding
/// whitespace is trimmed; segments without a name or without a value are
/// discarded.
pub fn parse_cookie_string(raw: &str) -> Vec<Cookie> {
    raw.split(';')
        .filter_map(|segment| {
            let (name, value) = segment.split_once('=')?;
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some(Cookie {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Whether a logged-in marker is visible on the current page.
pub async fn logged_in(page: &Page, labels: &LabelPack) -> bool {
    locate::any_text_present(page, &labels.logged_in_markers).await
}

/// Establish an authenticated session. Cookie login runs first whenever a
/// cookie is configured; credential login runs only if that did not verify.
/// Returns whether a logged-in marker was confirmed.
pub async fn establish(page: &Page, cfg: &Config, labels: &LabelPack, diag: &Diag) -> bool {
    if cfg.has_cookie() {
        info!("attempting cookie login");
        if cookie_login(page, cfg, labels, diag).await {
            return true;
        }
        warn!("cookie login did not verify");
    }
    if cfg.has_credentials() {
        info!("attempting credential login");
        if password_login(page, cfg, labels, diag).await {
            return true;
        }
        warn!("credential login did not verify");
    }
    false
}

async fn cookie_login(page: &Page, cfg: &Config, labels: &LabelPack, diag: &Diag) -> bool {
    let raw = cfg.cookie.as_deref().unwrap_or_default();
    let cookies = parse_cookie_string(raw);
    if cookies.is_empty() {
        warn!("cookie string yielded no usable pairs");
        return false;
    }
    for domain in COOKIE_DOMAINS {
        for cookie in &cookies {
            if let Err(e) = page
                .set_cookie(&cookie.name, &cookie.value, Some(domain), Some("/"))
                .await
            {
                warn!("failed to set cookie '{}' for {}: {}", cookie.name, domain, e);
                return false;
            }
        }
    }
    debug!("injected {} cookie(s) across {} domain(s)", cookies.len(), COOKIE_DOMAINS.len());

    // Straight to the game index first; some sessions land there directly.
    locate::goto_settled(page, &cfg.panel_url, cfg.timeout_ms).await;
    diag.capture(page, "after_cookie_goto_index").await;
    if logged_in(page, labels).await {
        info!("logged in via cookie (game index)");
        return true;
    }

    // The login URL redirects through to the panel when the session is live.
    locate::goto_settled(page, &cfg.login_url, cfg.timeout_ms).await;
    diag.capture(page, "after_cookie_goto_login").await;
    if logged_in(page, labels).await {
        info!("logged in via cookie (login page)");
        return true;
    }

    false
}

async fn password_login(page: &Page, cfg: &Config, labels: &LabelPack, diag: &Diag) -> bool {
    let email = cfg.email.as_deref().unwrap_or_default();
    let password = cfg.password.as_deref().unwrap_or_default();

    locate::goto_settled(page, &cfg.login_url, cfg.timeout_ms).await;
    diag.capture(page, "login_form_loaded").await;

    let filled_id = locate::fill_first(
        page,
        &field_strategies(&labels.identifier_labels, &labels.identifier_fields),
        email,
        cfg.step_timeout_ms,
    )
    .await;
    if !filled_id {
        warn!("identifier field not found on login form");
    }

    let filled_password = locate::fill_first(
        page,
        &field_strategies(&labels.password_labels, &labels.password_fields),
        password,
        cfg.step_timeout_ms,
    )
    .await;
    if !filled_password {
        warn!("password field not found on login form");
    }

    let clicked = locate::click_any(page, &labels.login_buttons, cfg.step_timeout_ms).await;
    if !clicked && filled_password {
        debug!("no login button matched; submitting with Enter");
        if let Err(e) = page.human().press_key("Enter").await {
            debug!("key press absorbed: {}", e);
        }
    }

    locate::settle(page, cfg.timeout_ms).await;
    diag.capture(page, "after_login_submit").await;
    logged_in(page, labels).await
}

/// Field lookup chain: label association across the known label variants,
/// then attribute patterns across the known field-name/id substrings.
fn field_strategies(label_variants: &[String], css_fallbacks: &[String]) -> Vec<Strategy> {
    label_variants
        .iter()
        .map(|l| Strategy::Label(l.clone()))
        .chain(
            css_fallbacks
                .iter()
                .map(|c| Strategy::Attr(AttrPattern::Css(c.clone()))),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_string() {
        let cookies = parse_cookie_string("sid=abc123; theme=dark");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0], Cookie { name: "sid".into(), value: "abc123".into() });
        assert_eq!(cookies[1], Cookie { name: "theme".into(), value: "dark".into() });
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let cookies = parse_cookie_string("  sid = abc ;  token =  xyz  ");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "sid");
        assert_eq!(cookies[0].value, "abc");
        assert_eq!(cookies[1].name, "token");
        assert_eq!(cookies[1].value, "xyz");
    }

    #[test]
    fn test_parse_discards_incomplete_segments() {
        // No '=', empty name, empty value, and empty segments all drop out.
        let cookies = parse_cookie_string("novalue; =orphan; empty=; ; sid=ok;;");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "sid");
        assert_eq!(cookies[0].value, "ok");
    }

    #[test]
    fn test_parse_keeps_equals_in_value() {
        let cookies = parse_cookie_string("jwt=a=b=c");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value, "a=b=c");
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(parse_cookie_string("").is_empty());
        assert!(parse_cookie_string("   ").is_empty());
    }

    #[test]
    fn test_field_strategies_order() {
        let strategies = field_strategies(
            &["メールアドレス".to_string()],
            &[r#"input[type="email"]"#.to_string()],
        );
        assert_eq!(strategies.len(), 2);
        assert!(matches!(strategies[0], Strategy::Label(_)));
        assert!(matches!(strategies[1], Strategy::Attr(AttrPattern::Css(_))));
    }
}
