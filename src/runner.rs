//! Browser lifecycle and run orchestration: gate → session → wizard →
//! record, with the browser torn down unconditionally at the end.

use eoka::{Browser, Page, StealthConfig};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::diag::Diag;
use crate::labels::LabelPack;
use crate::outcome::Journal;
use crate::wizard::{self, WizardOutcome};
use crate::{session, Result};

/// Terminal condition of a run, surfaced as the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Renewal submitted (and, unless strict mode said otherwise, verified).
    Success,
    /// Last success is within the minimum interval; nothing was done.
    SkippedTooSoon,
    /// Neither a cookie nor a credential pair is configured.
    AuthNotConfigured,
    /// Both authentication strategies failed verification.
    AuthFailed,
    /// No management control on the index table.
    EntryNotFound,
    /// No route to the upgrade/extend surface.
    ExtendSurfaceNotFound,
    /// No final commit control anywhere.
    SubmissionNotFound,
    /// Strict mode: submission went through but no success marker appeared.
    SuccessNotConfirmed,
}

impl RunOutcome {
    /// Stable process exit code for schedulers and wrappers.
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::SkippedTooSoon => 2,
            RunOutcome::AuthNotConfigured => 3,
            RunOutcome::AuthFailed => 4,
            RunOutcome::EntryNotFound => 5,
            RunOutcome::ExtendSurfaceNotFound => 6,
            RunOutcome::SubmissionNotFound => 7,
            RunOutcome::SuccessNotConfirmed => 8,
        }
    }

    /// One-line operator-facing description.
    pub fn describe(self) -> &'static str {
        match self {
            RunOutcome::Success => "renewal succeeded",
            RunOutcome::SkippedTooSoon => "skipped: last success is too recent",
            RunOutcome::AuthNotConfigured => "no cookie and no credentials configured",
            RunOutcome::AuthFailed => "authentication failed",
            RunOutcome::EntryNotFound => "management entry not found",
            RunOutcome::ExtendSurfaceNotFound => "upgrade/extend surface not found",
            RunOutcome::SubmissionNotFound => "final submission control not found",
            RunOutcome::SuccessNotConfirmed => "submission not confirmed by a success marker",
        }
    }
}

/// Owns the browser for exactly one run.
pub struct Runner {
    browser: Browser,
    page: Page,
}

impl Runner {
    /// Launch the browser and open the working page.
    pub async fn launch(cfg: &Config) -> Result<Self> {
        let stealth = StealthConfig {
            headless: cfg.headless,
            ..Default::default()
        };
        debug!("launching browser (headless: {})", cfg.headless);
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;
        Ok(Self { browser, page })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Session + wizard against the already-launched browser.
    pub async fn run(&self, cfg: &Config, labels: &LabelPack, diag: &Diag) -> RunOutcome {
        if !session::establish(&self.page, cfg, labels, diag).await {
            diag.capture(&self.page, "auth_failed").await;
            return RunOutcome::AuthFailed;
        }

        match wizard::drive(&self.page, cfg, labels, diag).await {
            WizardOutcome::Confirmed => RunOutcome::Success,
            WizardOutcome::Unconfirmed => {
                if cfg.strict_success {
                    RunOutcome::SuccessNotConfirmed
                } else {
                    warn!("treating unconfirmed submission as success (strict mode off)");
                    RunOutcome::Success
                }
            }
            WizardOutcome::EntryNotFound => RunOutcome::EntryNotFound,
            WizardOutcome::ExtendSurfaceNotFound => RunOutcome::ExtendSurfaceNotFound,
            WizardOutcome::SubmissionNotFound => RunOutcome::SubmissionNotFound,
        }
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

/// Run the whole bot once. The scheduling gate and the configuration check
/// run before any browser or network activity; the browser, once launched,
/// is torn down on every path.
pub async fn execute(cfg: &Config) -> Result<RunOutcome> {
    cfg.validate()?;
    let labels = match &cfg.labels {
        Some(path) => {
            info!("loading label pack from {}", path.display());
            LabelPack::load(path)?
        }
        None => LabelPack::default(),
    };

    let journal = Journal::new(&cfg.journal, cfg.timezone.clone());
    if journal.too_soon(cfg.min_interval_hours, cfg.force) {
        info!(
            "last success within {}h; skipping (set FORCE_RENEW=1 to override)",
            cfg.min_interval_hours
        );
        return Ok(RunOutcome::SkippedTooSoon);
    }

    if !cfg.has_cookie() && !cfg.has_credentials() {
        error!("set XSERVER_COOKIE, or XSERVER_EMAIL and XSERVER_PASSWORD");
        return Ok(RunOutcome::AuthNotConfigured);
    }

    let diag = Diag::new(&cfg.shots_dir, &cfg.pages_dir);
    let runner = Runner::launch(cfg).await?;
    let outcome = runner.run(cfg, &labels, &diag).await;
    if let Err(e) = runner.close().await {
        warn!("browser teardown failed: {}", e);
    }

    if outcome == RunOutcome::Success {
        journal.record_success()?;
    }
    Ok(outcome)
}
