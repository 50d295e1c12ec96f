//! Layered locate-and-act.
//!
//! Every logical control is described by an ordered list of identification
//! strategies. Resolution happens through one injected JS matcher per
//! strategy, main document first; when nothing matches there, the same search
//! runs inside every embedded frame in document order. All interaction faults
//! collapse into boolean outcomes so a wording change on the panel can never
//! take the process down.

use std::time::Duration;

use eoka::Page;
use tracing::{debug, trace};

use crate::Result;

/// Settle delay after a successful click, letting async UI updates render
/// before the next lookup.
const CLICK_SETTLE_MS: u64 = 250;

/// Settle delay after a programmatic scroll.
const SCROLL_SETTLE_MS: u64 = 400;

/// Interactive role a strategy can scope to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Button,
    Link,
    Radio,
}

impl Role {
    fn as_kind(self) -> &'static str {
        match self {
            Role::Button => "button",
            Role::Link => "link",
            Role::Radio => "radio",
        }
    }
}

/// Attribute-pattern predicates, tried as a fixed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrPattern {
    /// `<a>` whose text contains the label.
    AnchorText(String),
    /// `<button>` whose text contains the label.
    ButtonText(String),
    /// `<input>` whose value contains the label.
    InputValue(String),
    /// `<label>` whose text contains the label (clicked directly).
    LabelText(String),
    /// Raw CSS selector.
    Css(String),
}

/// One way to identify a target element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Accessible role + name match.
    Role { role: Role, name: String },
    /// Free-text match over interactive elements.
    Text(String),
    /// Attribute-pattern match.
    Attr(AttrPattern),
    /// Label association: the form control the matching `<label>` points at.
    Label(String),
}

impl Strategy {
    /// (kind, value) pair handed to the JS matcher.
    fn as_js_args(&self) -> (&'static str, &str) {
        match self {
            Strategy::Role { role, name } => (role.as_kind(), name),
            Strategy::Text(v) => ("text", v),
            Strategy::Attr(AttrPattern::AnchorText(v)) => ("anchor_text", v),
            Strategy::Attr(AttrPattern::ButtonText(v)) => ("button_text", v),
            Strategy::Attr(AttrPattern::InputValue(v)) => ("input_value", v),
            Strategy::Attr(AttrPattern::LabelText(v)) => ("label_text", v),
            Strategy::Attr(AttrPattern::Css(v)) => ("css", v),
            Strategy::Label(v) => ("label", v),
        }
    }
}

/// Click chain for one candidate label: role-scoped matches, then free text,
/// then the fixed attribute patterns.
pub fn click_plan(label: &str) -> Vec<Strategy> {
    vec![
        Strategy::Role {
            role: Role::Button,
            name: label.into(),
        },
        Strategy::Role {
            role: Role::Link,
            name: label.into(),
        },
        Strategy::Text(label.into()),
        Strategy::Attr(AttrPattern::AnchorText(label.into())),
        Strategy::Attr(AttrPattern::ButtonText(label.into())),
        Strategy::Attr(AttrPattern::InputValue(label.into())),
        Strategy::Attr(AttrPattern::LabelText(label.into())),
    ]
}

/// Matcher injected per strategy. Returns a stable CSS path for the first
/// visible match in the main document, or null.
const MATCH_JS: &str = r##"((kind, value) => {
    const lc = s => (s || '').toLowerCase().trim();
    const want = lc(value);

    function visible(el) {
        const r = el.getBoundingClientRect();
        const s = getComputedStyle(el);
        return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
    }

    function accName(el) {
        return el.innerText?.trim() || el.value || el.getAttribute('aria-label') || el.title || '';
    }

    function radioName(el) {
        if (el.id) {
            const lab = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
            if (lab) return lab.innerText || '';
        }
        const wrap = el.closest('label');
        if (wrap) return wrap.innerText || '';
        return accName(el);
    }

    function cssPath(el) {
        if (el.id) return '#' + CSS.escape(el.id);
        const path = [];
        let n = el;
        while (n && n.nodeType === 1) {
            let s = n.tagName.toLowerCase();
            if (n.id) { path.unshift('#' + CSS.escape(n.id)); break; }
            const p = n.parentElement;
            if (p) {
                const sibs = [...p.children].filter(c => c.tagName === n.tagName);
                if (sibs.length > 1) s += ':nth-of-type(' + (sibs.indexOf(n) + 1) + ')';
            }
            path.unshift(s);
            n = p;
        }
        return path.join(' > ');
    }

    const first = (sel, test) =>
        [...document.querySelectorAll(sel)].find(e => visible(e) && (!test || test(e))) || null;

    let el = null;
    switch (kind) {
        case 'button':
            el = first('button, [role="button"], input[type="submit"], input[type="button"]',
                e => lc(accName(e)).includes(want));
            break;
        case 'link':
            el = first('a, [role="link"]', e => lc(accName(e)).includes(want));
            break;
        case 'radio':
            el = first('input[type="radio"], [role="radio"]',
                e => lc(radioName(e)).includes(want));
            break;
        case 'text':
            el = first('a, button, input, select, label, [role="button"], [onclick]',
                e => lc(accName(e)).includes(want));
            break;
        case 'anchor_text':
            el = first('a', e => lc(e.innerText).includes(want));
            break;
        case 'button_text':
            el = first('button', e => lc(e.innerText).includes(want));
            break;
        case 'input_value':
            el = first('input', e => lc(e.value).includes(want));
            break;
        case 'label_text':
            el = first('label', e => lc(e.innerText).includes(want));
            break;
        case 'label': {
            const lab = first('label', e => lc(e.innerText).includes(want));
            if (lab) {
                el = lab.htmlFor ? document.getElementById(lab.htmlFor)
                                 : lab.querySelector('input, select, textarea');
            }
            break;
        }
        case 'css':
            el = first(value, null);
            break;
    }
    return el ? cssPath(el) : null;
})"##;

/// Frame-escalation matcher: the same search repeated inside every embedded
/// frame in document order, clicking in place. Cross-origin frames throw on
/// contentDocument access and are skipped.
const FRAME_CLICK_JS: &str = r##"((labels) => {
    const lc = s => (s || '').toLowerCase().trim();

    function visible(el) {
        const r = el.getBoundingClientRect();
        const s = (el.ownerDocument.defaultView || window).getComputedStyle(el);
        return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
    }

    function accName(el) {
        return el.innerText?.trim() || el.value || el.getAttribute('aria-label') || el.title || '';
    }

    function clickIn(doc, want) {
        const pools = [
            ['button, [role="button"], input[type="submit"], input[type="button"]',
                e => lc(accName(e)).includes(want)],
            ['a, button, input, select, label, [role="button"], [onclick]',
                e => lc(accName(e)).includes(want)],
            ['a', e => lc(e.innerText).includes(want)],
            ['button', e => lc(e.innerText).includes(want)],
            ['input', e => lc(e.value).includes(want)],
            ['label', e => lc(e.innerText).includes(want)],
        ];
        for (const [sel, test] of pools) {
            const el = [...doc.querySelectorAll(sel)].find(e => visible(e) && test(e));
            if (el) { el.click(); return true; }
        }
        return false;
    }

    for (const f of document.querySelectorAll('iframe, frame')) {
        let doc = null;
        try { doc = f.contentDocument; } catch (e) { continue; }
        if (!doc || !doc.body) continue;
        for (const label of labels) {
            if (clickIn(doc, lc(label))) return true;
        }
    }
    return false;
})"##;

/// Check up to `max` visible, unchecked checkboxes, dispatching `change` so
/// framework listeners observe the toggle. Returns how many were checked.
const CHECK_BOXES_JS: &str = r##"((max) => {
    let checked = 0;
    for (const el of document.querySelectorAll('input[type="checkbox"]')) {
        if (checked >= max) break;
        const r = el.getBoundingClientRect();
        const s = getComputedStyle(el);
        if (r.width === 0 || r.height === 0 || s.visibility === 'hidden' || s.display === 'none') continue;
        if (el.checked) continue;
        el.checked = true;
        el.dispatchEvent(new Event('change', { bubbles: true }));
        checked += 1;
    }
    return checked;
})"##;

/// Resolve one strategy to a main-document CSS path.
pub async fn resolve(page: &Page, strategy: &Strategy) -> Result<Option<String>> {
    let (kind, value) = strategy.as_js_args();
    let js = format!(
        "{}({},{})",
        MATCH_JS,
        serde_json::to_string(kind).unwrap(),
        serde_json::to_string(value).unwrap()
    );
    Ok(page.evaluate(&js).await?)
}

/// Resolve with a bounded wait; absorbs probe faults and timeouts.
async fn resolve_bounded(page: &Page, strategy: &Strategy, timeout_ms: u64) -> Option<String> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), resolve(page, strategy)).await {
        Ok(Ok(sel)) => sel,
        Ok(Err(e)) => {
            trace!("probe {:?} absorbed: {}", strategy, e);
            None
        }
        Err(_) => {
            trace!("probe {:?} timed out after {}ms", strategy, timeout_ms);
            None
        }
    }
}

/// Click a resolved selector. Absorbs every interaction fault; settles on
/// success.
pub async fn try_click(page: &Page, selector: &str) -> bool {
    match page.try_click(selector).await {
        Ok(true) => {
            page.wait(CLICK_SETTLE_MS).await;
            true
        }
        Ok(false) => false,
        Err(e) => {
            trace!("click '{}' absorbed: {}", selector, e);
            false
        }
    }
}

/// Click the first strategy in the list that resolves and accepts the click.
pub async fn click_first(page: &Page, strategies: &[Strategy], timeout_ms: u64) -> bool {
    for strategy in strategies {
        if let Some(sel) = resolve_bounded(page, strategy, timeout_ms).await {
            if try_click(page, &sel).await {
                debug!("clicked via {:?}", strategy);
                return true;
            }
        }
    }
    false
}

/// The full fallback chain: per label, each strategy in priority order over
/// the main document; if nothing matched anywhere, escalate to frames.
/// Never raises.
pub async fn click_any(page: &Page, labels: &[String], timeout_ms: u64) -> bool {
    for label in labels {
        if click_first(page, &click_plan(label), timeout_ms).await {
            debug!("clicked '{}'", label);
            return true;
        }
    }
    if click_in_frames(page, labels, timeout_ms).await {
        return true;
    }
    trace!("no match for any of {:?}", labels);
    false
}

/// Repeat the search inside every embedded frame, clicking in place.
async fn click_in_frames(page: &Page, labels: &[String], timeout_ms: u64) -> bool {
    let js = format!(
        "{}({})",
        FRAME_CLICK_JS,
        serde_json::to_string(labels).unwrap()
    );
    let fut = async {
        let clicked: bool = page.evaluate(&js).await?;
        Result::Ok(clicked)
    };
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(Ok(true)) => {
            debug!("clicked inside an embedded frame");
            page.wait(CLICK_SETTLE_MS).await;
            true
        }
        Ok(Ok(false)) => false,
        Ok(Err(e)) => {
            trace!("frame probe absorbed: {}", e);
            false
        }
        Err(_) => {
            trace!("frame probe timed out after {}ms", timeout_ms);
            false
        }
    }
}

/// Fill the first field reachable through the given strategies.
pub async fn fill_first(
    page: &Page,
    strategies: &[Strategy],
    value: &str,
    timeout_ms: u64,
) -> bool {
    for strategy in strategies {
        if let Some(sel) = resolve_bounded(page, strategy, timeout_ms).await {
            match page.fill(&sel, value).await {
                Ok(()) => {
                    debug!("filled via {:?}", strategy);
                    return true;
                }
                Err(e) => trace!("fill '{}' absorbed: {}", sel, e),
            }
        }
    }
    false
}

/// Check up to `max` visible unchecked checkboxes. Never fails.
pub async fn check_visible_boxes(page: &Page, max: u32) -> u32 {
    let js = format!("{}({})", CHECK_BOXES_JS, max);
    match page.evaluate(&js).await {
        Ok(n) => n,
        Err(e) => {
            trace!("checkbox sweep absorbed: {}", e);
            0
        }
    }
}

/// Whether any of the given text fragments is present on the page.
pub async fn any_text_present(page: &Page, fragments: &[String]) -> bool {
    match page.text().await {
        Ok(text) => fragments.iter().any(|f| text.contains(f)),
        Err(e) => {
            trace!("page text unavailable: {}", e);
            false
        }
    }
}

/// Navigate and wait for the page to settle: bounded network idle plus a
/// short fixed delay. Faults are absorbed; the caller verifies page state.
pub async fn goto_settled(page: &Page, url: &str, timeout_ms: u64) {
    if let Err(e) = page.goto(url).await {
        debug!("navigation to {} absorbed: {}", url, e);
    }
    settle(page, timeout_ms).await;
}

/// Wait for network quiescence within the bound, then a short fixed delay.
pub async fn settle(page: &Page, timeout_ms: u64) {
    if let Err(e) = page.wait_for_network_idle(500, timeout_ms).await {
        trace!("network idle wait ended: {}", e);
    }
    page.wait(500).await;
}

/// Scroll to the bottom of the page and let lazy content settle.
pub async fn scroll_to_bottom(page: &Page) {
    if let Err(e) = page
        .execute("window.scrollTo(0, document.body.scrollHeight)")
        .await
    {
        trace!("scroll absorbed: {}", e);
    }
    page.wait(SCROLL_SETTLE_MS).await;
}
