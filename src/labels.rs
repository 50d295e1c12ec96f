//! Candidate label sets for every control the bot touches.
//!
//! The panel's wording shifts between releases (link vs. button vs. styled
//! div, ・ vs. /, full-width vs. ASCII plus), so each logical action carries an
//! ordered list of surface texts. The built-in defaults match the panel as
//! last observed; a YAML pack can override any list without rebuilding.

use std::path::Path;

use serde::Deserialize;

use crate::Result;

/// Ordered candidate texts (and a few raw CSS lists) per logical control.
///
/// Order encodes priority: the most specific wording first, generic fallbacks
/// last. Any field missing from a YAML override keeps its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelPack {
    /// Text fragments whose presence proves an authenticated session.
    pub logged_in_markers: Vec<String>,
    /// Form labels for the login identifier field.
    pub identifier_labels: Vec<String>,
    /// CSS fallbacks for the login identifier field.
    pub identifier_fields: Vec<String>,
    /// Form labels for the password field.
    pub password_labels: Vec<String>,
    /// CSS fallbacks for the password field.
    pub password_fields: Vec<String>,
    /// Login submit controls.
    pub login_buttons: Vec<String>,
    /// Per-row management action on the game index table.
    pub management_entry: Vec<String>,
    /// Detail/settings surfaces used as an alternate route.
    pub detail_entries: Vec<String>,
    /// Contract/billing surfaces used as a second alternate route.
    pub contract_entries: Vec<String>,
    /// Upgrade-or-extend entry points.
    pub upgrade_entries: Vec<String>,
    /// Explicit extend button at the bottom of the upgrade page.
    pub extend_entries: Vec<String>,
    /// Keywords identifying agreement labels and checkboxes.
    pub agreement_keywords: Vec<String>,
    /// Proceed-to-confirmation controls.
    pub confirm_buttons: Vec<String>,
    /// Final commit controls.
    pub commit_buttons: Vec<String>,
    /// Generic enabled submit controls, the last resort for the final step.
    pub submit_fallback: Vec<String>,
    /// Text fragments that indicate the renewal went through.
    pub success_markers: Vec<String>,
}

impl Default for LabelPack {
    fn default() -> Self {
        Self {
            logged_in_markers: strings(&["ログアウト", "マイページ", "アカウント", "お知らせ"]),
            identifier_labels: strings(&[
                "メールアドレス",
                "ログインID",
                "アカウントID",
                "ID",
                "メール",
            ]),
            identifier_fields: strings(&[
                r#"input[type="email"]"#,
                r#"input[name*="mail"]"#,
                r#"input[id*="mail"]"#,
                r#"input[name*="login"]"#,
                r#"input[name*="account"]"#,
                r#"input[name*="user"]"#,
                r#"input[name*="id"]"#,
                r#"input[id*="login"]"#,
                r#"input[id*="account"]"#,
                r#"input[id*="user"]"#,
                r#"input[id*="id"]"#,
            ]),
            password_labels: strings(&["パスワード", "Password"]),
            password_fields: strings(&[
                r#"input[type="password"]"#,
                r#"input[name*="pass"]"#,
                r#"input[id*="pass"]"#,
            ]),
            login_buttons: strings(&[
                "ログイン",
                "ログインする",
                "サインイン",
                "ログオン",
                "ログインへ",
            ]),
            management_entry: strings(&["ゲーム管理"]),
            detail_entries: strings(&[
                "詳細",
                "管理",
                "設定",
                "ゲーム詳細",
                "サービス詳細",
                "契約情報",
                "メニュー",
            ]),
            contract_entries: strings(&[
                "契約",
                "契約情報",
                "料金",
                "お支払い",
                "支払い",
                "請求",
                "更新",
                "延長",
                "プラン変更",
            ]),
            upgrade_entries: strings(&[
                "アップグレード・期限延長",
                "アップグレード/期限延長",
                "アップグレード ・ 期限延長",
                "期限延長",
                "期限を延長する",
                "更新",
                "更新手続き",
                "プラン変更・期限延長",
                "プラン変更",
            ]),
            extend_entries: strings(&["期限を延長する", "延長する"]),
            agreement_keywords: strings(&[
                "同意",
                "確認",
                "承諾",
                "同意します",
                "確認しました",
                "規約",
                "注意事項",
            ]),
            confirm_buttons: strings(&[
                "確認画面に進む",
                "確認へ進む",
                "確認画面へ",
                "確認画面へ進む",
                "申込内容を確認",
                "申し込み内容を確認",
                "申込み内容を確認",
                "確認する",
                "次へ",
                "次に進む",
                "進む",
            ]),
            commit_buttons: strings(&[
                "期限を延長する",
                "延長する",
                "実行する",
                "延長を確定する",
                "確定する",
                "申し込む",
                "注文を確定する",
                "無料で延長する",
            ]),
            submit_fallback: strings(&[
                r#"button[type="submit"]:not([disabled])"#,
                r#"input[type="submit"]:not([disabled])"#,
                "button:not([disabled]).is-primary",
                "button:not([disabled]).btn-primary",
                "button:not([disabled]).c-btn--primary",
                "a.button--primary",
                "a.btn-primary",
            ]),
            success_markers: strings(&[
                "完了",
                "受け付けました",
                "受付しました",
                "延長しました",
                "手続きが完了",
                "ありがとうございました",
            ]),
        }
    }
}

impl LabelPack {
    /// Load a pack from a YAML file; fields absent from the file keep their
    /// built-in defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a pack from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
