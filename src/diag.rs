//! Best-effort diagnostic capture.
//!
//! Screenshots and raw HTML dumps at named checkpoints, for post-hoc
//! debugging only: nothing reads these files back, and a capture failure
//! never affects the run.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use eoka::Page;
use regex::Regex;
use tracing::{debug, warn};

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_\-.]+").unwrap());

/// Capture sink writing `<unix-ts>_<label>.png` / `.html` files.
pub struct Diag {
    shots_dir: PathBuf,
    pages_dir: PathBuf,
}

impl Diag {
    pub fn new(shots_dir: impl Into<PathBuf>, pages_dir: impl Into<PathBuf>) -> Self {
        Self {
            shots_dir: shots_dir.into(),
            pages_dir: pages_dir.into(),
        }
    }

    /// Screenshot + HTML dump at a named checkpoint.
    pub async fn capture(&self, page: &Page, label: &str) {
        self.shot(page, label).await;
        self.dump(page, label).await;
    }

    /// Full-page screenshot. Never fails the run.
    pub async fn shot(&self, page: &Page, label: &str) {
        let path = self.file_path(&self.shots_dir, label, "png");
        match page.screenshot().await {
            Ok(data) => match write_file(&path, &data) {
                Ok(()) => debug!("saved screenshot: {}", path.display()),
                Err(e) => warn!("screenshot write failed: {}", e),
            },
            Err(e) => warn!("screenshot failed: {}", e),
        }
    }

    /// Raw HTML dump. Never fails the run.
    pub async fn dump(&self, page: &Page, label: &str) {
        let path = self.file_path(&self.pages_dir, label, "html");
        let html: Result<String, _> = page
            .evaluate("document.documentElement.outerHTML")
            .await;
        match html {
            Ok(html) => match write_file(&path, html.as_bytes()) {
                Ok(()) => debug!("saved page html: {}", path.display()),
                Err(e) => warn!("html dump write failed: {}", e),
            },
            Err(e) => warn!("html dump failed: {}", e),
        }
    }

    fn file_path(&self, dir: &Path, label: &str, ext: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        dir.join(format!("{}_{}.{}", ts, sanitize(label), ext))
    }
}

/// Collapse anything outside `[a-zA-Z0-9_\-.]` into underscores so step
/// labels are safe as file names.
pub fn sanitize(label: &str) -> String {
    UNSAFE_CHARS.replace_all(label, "_").into_owned()
}

fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)
}
