//! The renewal wizard: a fixed sequence of steps over the panel UI.
//!
//! Required steps (management entry, extend surface, final submission) abort
//! the run with a distinct outcome when their full fallback chain is
//! exhausted. Everything else is best-effort: the panel sometimes skips a
//! page or pre-selects the duration, so a missing optional control is logged
//! and walked past.

use eoka::Page;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::diag::Diag;
use crate::labels::LabelPack;
use crate::locate::{self, AttrPattern, Role, Strategy};

/// Rows inspected one by one when no direct management control matched.
const MAX_ROW_SCAN: u32 = 10;

/// Checkboxes checked per acknowledgment sweep.
const MAX_AGREEMENT_BOXES: u32 = 5;

/// Short bound for the opportunistic agreement-label clicks.
const ACK_CLICK_TIMEOUT_MS: u64 = 800;

/// Extra wait before the second success-marker check.
const LATE_MARKER_WAIT_MS: u64 = 1_000;

/// Terminal outcome of a wizard run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardOutcome {
    /// Submission went through and a success marker was observed.
    Confirmed,
    /// Submission went through but no success marker was found.
    Unconfirmed,
    /// No management control on the index table.
    EntryNotFound,
    /// No route to the upgrade/extend surface.
    ExtendSurfaceNotFound,
    /// No final commit control anywhere.
    SubmissionNotFound,
}

/// A labelled wizard advance driven purely through the fallback chain.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    pub name: &'static str,
    pub candidates: &'a [String],
    pub required: bool,
}

/// Finds the per-row action control on the index table. Prefers the row
/// containing the target name, then any direct control, then a row-by-row
/// scan bounded by maxRows.
const ROW_ACTION_JS: &str = r##"((target, texts, maxRows) => {
    const lc = s => (s || '').toLowerCase().trim();
    const wants = texts.map(lc);

    function visible(el) {
        const r = el.getBoundingClientRect();
        const s = getComputedStyle(el);
        return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
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

    const hit = el => {
        const t = lc(el.innerText || el.value || '');
        return wants.some(w => t.includes(w));
    };

    function rowControl(row) {
        for (const sel of ['button', '[role="button"]', 'a', '[class*="btn"]', 'div, span']) {
            for (const el of row.querySelectorAll(sel)) {
                if (visible(el) && hit(el)) return el;
            }
        }
        return null;
    }

    let rows = [...document.querySelectorAll('tbody tr')];
    if (!rows.length) rows = [...document.querySelectorAll('tr')];

    if (target) {
        const row = rows.find(r => (r.innerText || '').includes(target));
        if (row) {
            const el = rowControl(row);
            if (el) return cssPath(el);
        }
    }

    const direct = [...document.querySelectorAll('button, [role="button"], a')]
        .find(e => visible(e) && hit(e));
    if (direct) return cssPath(direct);

    for (const row of rows.slice(0, maxRows)) {
        const el = rowControl(row);
        if (el) return cssPath(el);
    }
    return null;
})"##;

/// Drive the whole wizard against an authenticated session.
pub async fn drive(page: &Page, cfg: &Config, labels: &LabelPack, diag: &Diag) -> WizardOutcome {
    locate::goto_settled(page, &cfg.panel_url, cfg.timeout_ms).await;
    diag.capture(page, "on_game_index").await;

    if !open_management(page, cfg, labels).await {
        warn!("management entry not found on the index table");
        diag.capture(page, "management_entry_not_found").await;
        return WizardOutcome::EntryNotFound;
    }
    locate::settle(page, cfg.timeout_ms).await;
    diag.capture(page, "after_management_entry").await;

    if !open_extend_surface(page, cfg, labels, diag).await {
        warn!("upgrade/extend surface not found on any route");
        diag.capture(page, "extend_surface_not_found").await;
        return WizardOutcome::ExtendSurfaceNotFound;
    }

    locate::scroll_to_bottom(page).await;
    let entry = Step {
        name: "extend_entry",
        candidates: &labels.extend_entries,
        required: false,
    };
    if !advance(page, cfg, diag, &entry).await {
        info!("extend entry button not found at the bottom; trying the duration picker anyway");
    }

    if select_duration(page, cfg).await {
        diag.capture(page, &format!("selected_{}h", cfg.hours)).await;
    } else {
        warn!(
            "could not select the {}h option; relying on the page default",
            cfg.hours
        );
        diag.capture(page, &format!("failed_select_{}h", cfg.hours)).await;
    }

    accept_acknowledgments(page, labels).await;

    let confirm = Step {
        name: "go_confirm",
        candidates: &labels.confirm_buttons,
        required: false,
    };
    if !advance(page, cfg, diag, &confirm).await {
        info!("confirm-step control not found; assuming we are already on the confirmation page");
    }

    if !final_submission(page, cfg, labels, diag).await {
        warn!("final submission control not found after exhausting all strategies");
        diag.capture(page, "submission_not_found").await;
        return WizardOutcome::SubmissionNotFound;
    }
    diag.capture(page, "after_final_submit").await;

    if detect_success(page, cfg, labels).await {
        info!("renewal success marker detected");
        WizardOutcome::Confirmed
    } else {
        warn!("no success marker detected after submission");
        WizardOutcome::Unconfirmed
    }
}

/// Click one step's candidates through the fallback chain; settle and capture
/// on success.
async fn advance(page: &Page, cfg: &Config, diag: &Diag, step: &Step<'_>) -> bool {
    let clicked = locate::click_any(page, step.candidates, cfg.step_timeout_ms).await;
    if clicked {
        locate::settle(page, cfg.timeout_ms).await;
        diag.capture(page, &format!("after_{}", step.name)).await;
    } else if step.required {
        warn!("required step '{}' found no control", step.name);
    } else {
        debug!("optional step '{}' found no control", step.name);
    }
    clicked
}

/// Step 1: click the management action on the right row of the index table.
async fn open_management(page: &Page, cfg: &Config, labels: &LabelPack) -> bool {
    let target = cfg
        .target_game
        .as_deref()
        .filter(|t| !t.trim().is_empty());
    if let Some(sel) = row_action(
        page,
        target,
        &labels.management_entry,
        MAX_ROW_SCAN,
        cfg.step_timeout_ms,
    )
    .await
    {
        if locate::try_click(page, &sel).await {
            debug!("clicked row management control '{}'", sel);
            return true;
        }
    }
    // The table scan came up empty or the click bounced; run the generic
    // chain (including frames) before giving up.
    locate::click_any(page, &labels.management_entry, cfg.step_timeout_ms).await
}

/// Step 2: reach the upgrade/extend surface, directly or via the
/// detail/contract detours.
async fn open_extend_surface(
    page: &Page,
    cfg: &Config,
    labels: &LabelPack,
    diag: &Diag,
) -> bool {
    if locate::click_any(page, &labels.upgrade_entries, cfg.step_timeout_ms).await {
        locate::settle(page, cfg.timeout_ms).await;
        diag.capture(page, "after_open_extend").await;
        return true;
    }

    info!("extend entry not on the management page; trying detail routes");
    let target = cfg
        .target_game
        .as_deref()
        .filter(|t| !t.trim().is_empty());
    let mut opened = false;
    if let Some(sel) =
        row_action(page, target, &labels.detail_entries, 0, cfg.step_timeout_ms).await
    {
        opened = locate::try_click(page, &sel).await;
    }
    if !opened {
        opened = locate::click_any(page, &labels.detail_entries, cfg.step_timeout_ms).await;
    }
    if !opened {
        return false;
    }
    locate::settle(page, cfg.timeout_ms).await;
    diag.capture(page, "after_open_detail").await;

    if locate::click_any(page, &labels.upgrade_entries, cfg.step_timeout_ms).await {
        locate::settle(page, cfg.timeout_ms).await;
        diag.capture(page, "after_open_extend_from_detail").await;
        return true;
    }
    if locate::click_any(page, &labels.contract_entries, cfg.step_timeout_ms).await {
        locate::settle(page, cfg.timeout_ms).await;
        diag.capture(page, "after_open_contract").await;
        if locate::click_any(page, &labels.upgrade_entries, cfg.step_timeout_ms).await {
            locate::settle(page, cfg.timeout_ms).await;
            diag.capture(page, "after_open_extend_from_contract").await;
            return true;
        }
    }
    false
}

/// Step 3: pick the configured duration, trying every surface rendering
/// across labelled radios, plain labels and value attributes.
async fn select_duration(page: &Page, cfg: &Config) -> bool {
    let hours = cfg.hours;
    let forms = duration_surface_forms(hours);
    let mut strategies: Vec<Strategy> = Vec::new();
    strategies.extend(forms.iter().map(|f| Strategy::Label(f.clone())));
    strategies.extend(forms.iter().map(|f| Strategy::Role {
        role: Role::Radio,
        name: f.clone(),
    }));
    strategies.extend(
        forms
            .iter()
            .map(|f| Strategy::Attr(AttrPattern::LabelText(f.clone()))),
    );
    for css in [
        format!(r#"input[type="radio"][value="{hours}"]"#),
        format!(r#"input[type="radio"][value*="{hours}"]"#),
        format!(r#"input[value="{hours}"]"#),
        format!(r#"input[value*="{hours}"]"#),
    ] {
        strategies.push(Strategy::Attr(AttrPattern::Css(css)));
    }
    if locate::click_first(page, &strategies, cfg.step_timeout_ms).await {
        return true;
    }
    locate::click_any(page, &forms, cfg.step_timeout_ms).await
}

/// Textual renderings of an extension duration, most specific first. The
/// panel mixes ASCII and full-width plus signs and sometimes drops the 延長
/// suffix, so every variant is a candidate.
pub fn duration_surface_forms(hours: u32) -> Vec<String> {
    vec![
        format!("+{hours}時間延長"),
        format!("＋{hours}時間延長"),
        format!("{hours}時間延長"),
        format!("+{hours}時間"),
        format!("＋{hours}時間"),
        format!("{hours}時間"),
        format!("{hours} 時間"),
    ]
}

/// Step 4: best-effort agreement sweep. Clicks labels carrying agreement
/// keywords, then checks up to [`MAX_AGREEMENT_BOXES`] visible unchecked
/// checkboxes. Never fails the run.
async fn accept_acknowledgments(page: &Page, labels: &LabelPack) {
    for keyword in &labels.agreement_keywords {
        locate::click_first(
            page,
            &[Strategy::Attr(AttrPattern::LabelText(keyword.clone()))],
            ACK_CLICK_TIMEOUT_MS,
        )
        .await;
    }
    let checked = locate::check_visible_boxes(page, MAX_AGREEMENT_BOXES).await;
    if checked > 0 {
        info!("checked {} agreement checkbox(es)", checked);
    }
}

/// Step 6: the required commit. Scroll, re-run the agreement sweep, click a
/// commit label; fall back to a generic enabled submit control.
async fn final_submission(page: &Page, cfg: &Config, labels: &LabelPack, diag: &Diag) -> bool {
    locate::scroll_to_bottom(page).await;
    accept_acknowledgments(page, labels).await;

    let commit = Step {
        name: "final_submit",
        candidates: &labels.commit_buttons,
        required: true,
    };
    if advance(page, cfg, diag, &commit).await {
        return true;
    }

    let fallbacks: Vec<Strategy> = labels
        .submit_fallback
        .iter()
        .map(|css| Strategy::Attr(AttrPattern::Css(css.clone())))
        .collect();
    if locate::click_first(page, &fallbacks, cfg.step_timeout_ms).await {
        locate::settle(page, cfg.timeout_ms).await;
        diag.capture(page, "after_submit_fallback").await;
        return true;
    }
    false
}

/// Step 7: look for a success marker, allowing the confirmation wording a
/// moment to render.
async fn detect_success(page: &Page, cfg: &Config, labels: &LabelPack) -> bool {
    locate::settle(page, cfg.timeout_ms).await;
    if locate::any_text_present(page, &labels.success_markers).await {
        return true;
    }
    page.wait(LATE_MARKER_WAIT_MS).await;
    locate::any_text_present(page, &labels.success_markers).await
}

/// Resolve the per-row action control to a CSS path.
async fn row_action(
    page: &Page,
    target: Option<&str>,
    texts: &[String],
    max_rows: u32,
    timeout_ms: u64,
) -> Option<String> {
    let js = format!(
        "{}({},{},{})",
        ROW_ACTION_JS,
        serde_json::to_string(&target).unwrap(),
        serde_json::to_string(texts).unwrap(),
        max_rows
    );
    let fut = async {
        let sel: Option<String> = page.evaluate(&js).await?;
        crate::Result::Ok(sel)
    };
    match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), fut).await {
        Ok(Ok(sel)) => sel,
        Ok(Err(e)) => {
            debug!("row probe absorbed: {}", e);
            None
        }
        Err(_) => {
            debug!("row probe timed out after {}ms", timeout_ms);
            None
        }
    }
}
