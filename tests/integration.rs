//! Integration tests for xserver-renew.
//!
//! The browser-backed tests require Chrome to be installed and available.
//! Run with: cargo test --test integration -- --ignored

use clap::Parser;
use xserver_renew::{locate, runner, Config, Journal, RunOutcome};

/// Check if Chrome is available
fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

fn fixture_url(html: &str) -> String {
    format!("data:text/html;charset=utf-8,{}", html)
}

fn config(args: &[&str]) -> Config {
    let mut full = vec!["xserver-renew"];
    full.extend_from_slice(args);
    Config::try_parse_from(full).expect("config should parse")
}

/// Scenario: neither cookie nor credentials configured. The run must abort
/// before any browser or network activity, so this needs no Chrome.
#[tokio::test]
async fn test_auth_not_configured_aborts_before_browser() {
    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("renew_result.md");
    let cfg = config(&[
        "--cookie",
        "",
        "--email",
        "",
        "--password",
        "",
        "--journal",
        journal_path.to_str().unwrap(),
    ]);

    let outcome = runner::execute(&cfg).await.unwrap();
    assert_eq!(outcome, RunOutcome::AuthNotConfigured);
    assert_eq!(outcome.exit_code(), 3);
    assert!(!journal_path.exists(), "no journal line may be appended");
}

/// Scenario: last success is too recent. The gate must fire before any
/// browser or network activity, so this needs no Chrome either.
#[tokio::test]
async fn test_gate_skips_recent_success_before_browser() {
    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("renew_result.md");
    Journal::new(&journal_path, "Asia/Tokyo")
        .record_success()
        .unwrap();

    let cfg = config(&[
        "--cookie",
        "sid=abc",
        "--journal",
        journal_path.to_str().unwrap(),
    ]);

    let outcome = runner::execute(&cfg).await.unwrap();
    assert_eq!(outcome, RunOutcome::SkippedTooSoon);
    assert_eq!(outcome.exit_code(), 2);

    let lines = std::fs::read_to_string(&journal_path).unwrap();
    assert_eq!(lines.lines().count(), 1, "skipped runs append nothing");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_fallback_chain_miss_leaves_page_untouched() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = eoka::Browser::launch().await.expect("failed to launch");
    let page = browser.new_page("about:blank").await.expect("new page");
    page.goto(&fixture_url(
        r#"<button type="button" onclick="window.n=(window.n||0)+1">OK</button>"#,
    ))
    .await
    .expect("goto");

    let labels = vec!["そんなボタンはない".to_string()];
    assert!(!locate::click_any(&page, &labels, 2_000).await);

    let clicks: i64 = page.evaluate("window.n || 0").await.expect("evaluate");
    assert_eq!(clicks, 0, "a miss must not mutate page state");

    browser.close().await.expect("close");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_fallback_chain_clicks_by_role_name() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = eoka::Browser::launch().await.expect("failed to launch");
    let page = browser.new_page("about:blank").await.expect("new page");
    page.goto(&fixture_url(
        r#"<div>ただのテキスト 延長する</div>
           <button type="button" onclick="window.n=(window.n||0)+1">延長する</button>"#,
    ))
    .await
    .expect("goto");

    let labels = vec!["延長する".to_string()];
    assert!(locate::click_any(&page, &labels, 2_000).await);

    let clicks: i64 = page.evaluate("window.n || 0").await.expect("evaluate");
    assert_eq!(clicks, 1, "the role-scoped button must win over free text");

    browser.close().await.expect("close");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_fallback_chain_escalates_into_frames() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = eoka::Browser::launch().await.expect("failed to launch");
    let page = browser.new_page("about:blank").await.expect("new page");
    page.goto(&fixture_url(
        r#"<p>main document has no matching control</p>
           <iframe srcdoc="<button onclick='parent.clicked=1'>申し込む</button>"></iframe>"#,
    ))
    .await
    .expect("goto");
    page.wait(500).await;

    let labels = vec!["申し込む".to_string()];
    assert!(locate::click_any(&page, &labels, 3_000).await);

    let clicked: i64 = page.evaluate("window.clicked || 0").await.expect("evaluate");
    assert_eq!(clicked, 1, "the click must land inside the frame");

    browser.close().await.expect("close");
}

/// Full happy path: authenticated panel with every wizard control under its
/// first-priority label. One run, one journal line.
#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_wizard_full_run_appends_one_journal_line() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let panel = fixture_url(
        r#"<div>マイページ</div>
           <table><tbody><tr>
             <td>waters</td>
             <td><button type="button" onclick="window.mgmt=1">ゲーム管理</button></td>
           </tr></tbody></table>
           <a onclick="window.up=1">アップグレード・期限延長</a>
           <div><input type="radio" id="h72" value="72"><label for="h72">+72時間延長</label></div>
           <div><input type="checkbox" id="agree"><label for="agree">同意します</label></div>
           <button type="button" onclick="window.conf=1">確認画面に進む</button>
           <button type="button"
             onclick="if(!window.done){window.done=1;const d=document.createElement('div');d.textContent='手続きが完了しました';document.body.appendChild(d);}">期限を延長する</button>"#,
    );

    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("renew_result.md");
    let cfg = config(&[
        "--cookie",
        "sid=abc123",
        "--target-game",
        "waters",
        "--panel-url",
        &panel,
        "--login-url",
        &panel,
        "--journal",
        journal_path.to_str().unwrap(),
        "--shots-dir",
        dir.path().join("shots").to_str().unwrap(),
        "--pages-dir",
        dir.path().join("pages").to_str().unwrap(),
        "--timeout-ms",
        "3000",
        "--step-timeout-ms",
        "2000",
    ]);

    let outcome = runner::execute(&cfg).await.unwrap();
    assert_eq!(outcome, RunOutcome::Success);

    let content = std::fs::read_to_string(&journal_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1, "exactly one journal line per success");
    assert!(lines[0].ends_with("成功"), "malformed line: {}", lines[0]);
}

/// Cookie fails verification, credentials succeed, and the wizard proceeds
/// as usual afterwards.
#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_credential_login_after_cookie_miss() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    // The panel carries no logged-in marker, so the cookie path cannot
    // verify; the login form reveals one when the button is pressed.
    let panel = fixture_url(
        r#"<table><tbody><tr>
             <td>waters</td>
             <td><button type="button">ゲーム管理</button></td>
           </tr></tbody></table>
           <a onclick="window.up=1">アップグレード・期限延長</a>
           <div><input type="radio" id="h72" value="72"><label for="h72">+72時間延長</label></div>
           <button type="button" onclick="window.conf=1">確認画面に進む</button>
           <button type="button"
             onclick="if(!window.done){window.done=1;const d=document.createElement('div');d.textContent='延長しました';document.body.appendChild(d);}">期限を延長する</button>"#,
    );
    let login = fixture_url(
        r#"<form>
             <label for="email">メールアドレス</label><input id="email" type="text">
             <label for="pw">パスワード</label><input id="pw" type="password">
             <button type="button"
               onclick="const d=document.createElement('div');d.textContent='マイページ';document.body.appendChild(d);">ログイン</button>
           </form>"#,
    );

    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("renew_result.md");
    let cfg = config(&[
        "--cookie",
        "stale=1",
        "--email",
        "user@example.com",
        "--password",
        "hunter2",
        "--panel-url",
        &panel,
        "--login-url",
        &login,
        "--journal",
        journal_path.to_str().unwrap(),
        "--shots-dir",
        dir.path().join("shots").to_str().unwrap(),
        "--pages-dir",
        dir.path().join("pages").to_str().unwrap(),
        "--timeout-ms",
        "3000",
        "--step-timeout-ms",
        "2000",
    ]);

    let outcome = runner::execute(&cfg).await.unwrap();
    assert_eq!(outcome, RunOutcome::Success);

    let content = std::fs::read_to_string(&journal_path).unwrap();
    assert_eq!(content.lines().count(), 1);
}

/// Authentication succeeds but no commit control exists anywhere: the run
/// must abort with the distinct submission-not-found condition, leave
/// diagnostics behind, and append nothing.
#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_missing_submission_control_aborts() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let panel = fixture_url(
        r#"<div>マイページ</div>
           <table><tbody><tr>
             <td>waters</td>
             <td><button type="button">ゲーム管理</button></td>
           </tr></tbody></table>
           <a onclick="window.up=1">アップグレード・期限延長</a>"#,
    );

    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("renew_result.md");
    let shots_dir = dir.path().join("shots");
    let cfg = config(&[
        "--cookie",
        "sid=abc123",
        "--panel-url",
        &panel,
        "--login-url",
        &panel,
        "--journal",
        journal_path.to_str().unwrap(),
        "--shots-dir",
        shots_dir.to_str().unwrap(),
        "--pages-dir",
        dir.path().join("pages").to_str().unwrap(),
        "--timeout-ms",
        "3000",
        "--step-timeout-ms",
        "1000",
    ]);

    let outcome = runner::execute(&cfg).await.unwrap();
    assert_eq!(outcome, RunOutcome::SubmissionNotFound);
    assert_eq!(outcome.exit_code(), 7);
    assert!(!journal_path.exists(), "failures append nothing");

    let shots = std::fs::read_dir(&shots_dir).map(|d| d.count()).unwrap_or(0);
    assert!(shots > 0, "diagnostic captures must be written");
}
