//! Run configuration, resolved once at process start and passed explicitly
//! into every component. Flags double as environment variables so the bot can
//! run from a shell, a cron entry, or a CI secret store without wrapper
//! scripts.

use std::path::PathBuf;

use clap::Parser;

use crate::{Error, Result};

/// Panel login entry point.
pub const LOGIN_URL: &str =
    "https://secure.xserver.ne.jp/xapanel/login/xserver/?request_page=xmgame%2Findex";

/// Game index (application landing page once authenticated).
pub const GAME_INDEX_URL: &str = "https://secure.xserver.ne.jp/xapanel/xmgame/index";

/// Domains injected cookies are scoped to.
pub const COOKIE_DOMAINS: [&str; 2] = ["secure.xserver.ne.jp", "www.xserver.ne.jp"];

/// Full configuration for one run.
#[derive(Debug, Clone, Parser)]
#[command(name = "xserver-renew")]
#[command(about = "Unattended contract renewal for the Xserver GameServer panel")]
#[command(version)]
pub struct Config {
    /// Login email address or account ID
    #[arg(long, env = "XSERVER_EMAIL")]
    pub email: Option<String>,

    /// Login password
    #[arg(long, env = "XSERVER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Raw cookie string ("name=value; other=value") captured from a browser;
    /// tried before credentials when both are configured
    #[arg(long, env = "XSERVER_COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Game name used to pick the right row on the index table
    #[arg(long, env = "TARGET_GAME")]
    pub target_game: Option<String>,

    /// Extension duration in hours
    #[arg(long, env = "RENEW_HOURS", default_value_t = 72)]
    pub hours: u32,

    /// Minimum hours between successful runs; more recent runs are skipped
    #[arg(long, env = "RENEW_MIN_INTERVAL_HOURS", default_value_t = 24)]
    pub min_interval_hours: u32,

    /// Run even if the last success is within the minimum interval
    #[arg(long, env = "FORCE_RENEW", action = clap::ArgAction::Set, value_parser = parse_flag,
          default_value = "0", num_args = 0..=1, default_missing_value = "1")]
    pub force: bool,

    /// Outcome journal path
    #[arg(long = "journal", env = "RENEW_LOG_MD", default_value = "renew_result.md")]
    pub journal: PathBuf,

    /// IANA time zone name used for journal timestamps (UTC fallback)
    #[arg(long, env = "LOG_TIMEZONE", default_value = "Asia/Tokyo")]
    pub timezone: String,

    /// Run the browser headless (set to 0 to watch it)
    #[arg(long, env = "HEADLESS", action = clap::ArgAction::Set, value_parser = parse_flag,
          default_value = "1", num_args = 0..=1, default_missing_value = "1")]
    pub headless: bool,

    /// Bound on navigation and network-idle waits, in milliseconds
    #[arg(long, env = "PAGE_TIMEOUT_MS", default_value_t = 15_000)]
    pub timeout_ms: u64,

    /// Bound on each element lookup, in milliseconds
    #[arg(long, env = "STEP_TIMEOUT_MS", default_value_t = 4_000)]
    pub step_timeout_ms: u64,

    /// Treat a submission without a detected success marker as a failure
    #[arg(long, env = "STRICT_SUCCESS", action = clap::ArgAction::Set, value_parser = parse_flag,
          default_value = "0", num_args = 0..=1, default_missing_value = "1")]
    pub strict_success: bool,

    /// YAML label pack overriding the built-in candidate texts
    #[arg(long = "labels", env = "RENEW_LABELS")]
    pub labels: Option<PathBuf>,

    /// Directory for step/failure screenshots
    #[arg(long, env = "SHOTS_DIR", default_value = "screenshots")]
    pub shots_dir: PathBuf,

    /// Directory for raw HTML dumps
    #[arg(long, env = "PAGES_DIR", default_value = "pages")]
    pub pages_dir: PathBuf,

    /// Login page URL (override for staging or fixtures)
    #[arg(long, env = "XSERVER_LOGIN_URL", default_value = LOGIN_URL)]
    pub login_url: String,

    /// Game index URL (override for staging or fixtures)
    #[arg(long, env = "XSERVER_PANEL_URL", default_value = GAME_INDEX_URL)]
    pub panel_url: String,
}

impl Config {
    /// Whether a non-empty cookie string is configured.
    pub fn has_cookie(&self) -> bool {
        self.cookie.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Whether both credential halves are configured.
    pub fn has_credentials(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.email) && set(&self.password)
    }

    /// Validate values clap cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.hours == 0 {
            return Err(Error::Config("renewal hours must be at least 1".into()));
        }
        if self.timeout_ms == 0 || self.step_timeout_ms == 0 {
            return Err(Error::Config("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

/// Environment-style flag parser: `0`, `false`, `no`, `off` and the empty
/// string disable, anything else enables.
fn parse_flag(s: &str) -> std::result::Result<bool, String> {
    Ok(!matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut full = vec!["xserver-renew"];
        full.extend_from_slice(args);
        Config::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = parse(&[]);
        assert_eq!(cfg.hours, 72);
        assert_eq!(cfg.min_interval_hours, 24);
        assert_eq!(cfg.timeout_ms, 15_000);
        assert_eq!(cfg.step_timeout_ms, 4_000);
        assert_eq!(cfg.timezone, "Asia/Tokyo");
        assert_eq!(cfg.journal, PathBuf::from("renew_result.md"));
        assert_eq!(cfg.login_url, LOGIN_URL);
        assert_eq!(cfg.panel_url, GAME_INDEX_URL);
        assert!(cfg.headless);
        assert!(!cfg.force);
        assert!(!cfg.strict_success);
    }

    #[test]
    fn test_flag_parsing() {
        assert!(!parse(&["--headless", "0"]).headless);
        assert!(!parse(&["--headless", "false"]).headless);
        assert!(parse(&["--headless", "1"]).headless);
        assert!(parse(&["--force"]).force);
        assert!(parse(&["--force", "yes"]).force);
        assert!(!parse(&["--force", "off"]).force);
        assert!(parse(&["--strict-success"]).strict_success);
    }

    #[test]
    fn test_credential_presence() {
        let cfg = parse(&["--email", "a@example.com", "--password", "hunter2"]);
        assert!(cfg.has_credentials());
        assert!(!parse(&["--email", "a@example.com"]).has_credentials());
        assert!(!parse(&["--email", "a@example.com", "--password", "  "]).has_credentials());

        assert!(parse(&["--cookie", "sid=abc"]).has_cookie());
        assert!(!parse(&["--cookie", "   "]).has_cookie());
    }

    #[test]
    fn test_validation() {
        assert!(parse(&["--hours", "96"]).validate().is_ok());
        assert!(parse(&["--hours", "0"]).validate().is_err());
        assert!(parse(&["--timeout-ms", "0"]).validate().is_err());
    }
}
