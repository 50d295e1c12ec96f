//! Append-only outcome journal and the minimum-interval run gate.
//!
//! One line per successful run, `<local timestamp> <zone-label> 成功`, never
//! rewritten or deduplicated. The journal's last line is the sole source of
//! truth for "last successful renewal time". Appends are single-writer by
//! deployment contract (one scheduled invocation at a time); concurrent runs
//! are not defended against.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::Result;

/// Status token appended to every success line.
pub const STATUS_TOKEN: &str = "成功";

const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const STAMP_LEN: usize = 19;

/// The append-only success journal.
pub struct Journal {
    path: PathBuf,
    timezone: String,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>, timezone: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            timezone: timezone.into(),
        }
    }

    /// Timestamp of the most recent success, if the journal has a parseable
    /// last line.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let line = content.lines().rev().find(|l| !l.trim().is_empty())?;
        parse_line(line)
    }

    /// Whether the gate is closed: last success within the minimum interval
    /// and no override.
    pub fn too_soon(&self, min_interval_hours: u32, force: bool) -> bool {
        gate_closed(self.last_success(), Utc::now(), min_interval_hours, force)
    }

    /// Append one success line, timestamped in the configured zone (UTC
    /// fallback when the zone name does not resolve).
    pub fn record_success(&self) -> Result<()> {
        let line = render_line(Utc::now(), &self.timezone);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        info!("recorded: {} -> {}", line, self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Gate decision, pure so boundary cases are testable with an arbitrary
/// `now`.
pub fn gate_closed(
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    min_interval_hours: u32,
    force: bool,
) -> bool {
    if force {
        return false;
    }
    let Some(last) = last else {
        return false;
    };
    now.signed_duration_since(last) < Duration::hours(min_interval_hours as i64)
}

/// Render one journal line for the given instant.
pub fn render_line(now_utc: DateTime<Utc>, zone: &str) -> String {
    match zone.parse::<Tz>() {
        Ok(tz) => format!(
            "{} {} {}",
            now_utc.with_timezone(&tz).format(STAMP_FORMAT),
            zone,
            STATUS_TOKEN
        ),
        Err(_) => {
            debug!("time zone '{}' not found; falling back to UTC", zone);
            format!("{} UTC {}", now_utc.format(STAMP_FORMAT), STATUS_TOKEN)
        }
    }
}

/// Parse a journal line's timestamp back to UTC. The leading 19 characters
/// are the local stamp; the following token names the zone it was rendered
/// in (unknown zones are read as UTC).
pub fn parse_line(line: &str) -> Option<DateTime<Utc>> {
    let line = line.trim();
    let stamp = line.get(..STAMP_LEN)?;
    let rest = &line[STAMP_LEN..];
    let naive = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    let zone_label = rest.split_whitespace().next().unwrap_or("UTC");
    match zone_label.parse::<Tz>() {
        Ok(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
        Err(_) => Some(Utc.from_utc_datetime(&naive)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDateTime::parse_from_str(s, STAMP_FORMAT).unwrap())
    }

    #[test]
    fn test_render_line_tokyo() {
        let line = render_line(at("2026-08-05 03:00:00"), "Asia/Tokyo");
        assert_eq!(line, "2026-08-05 12:00:00 Asia/Tokyo 成功");
    }

    #[test]
    fn test_render_line_unknown_zone_falls_back_to_utc() {
        let line = render_line(at("2026-08-05 03:00:00"), "Mars/Olympus");
        assert_eq!(line, "2026-08-05 03:00:00 UTC 成功");
    }

    #[test]
    fn test_parse_round_trip() {
        let now = at("2026-08-05 03:00:00");
        assert_eq!(parse_line(&render_line(now, "Asia/Tokyo")), Some(now));
        assert_eq!(parse_line(&render_line(now, "UTC")), Some(now));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("garbage"), None);
        assert_eq!(parse_line("2026-13-40 99:00:00 UTC 成功"), None);
    }

    #[test]
    fn test_gate_boundaries() {
        let now = at("2026-08-05 12:00:00");
        // Last success at now - (interval - 1h): closed.
        assert!(gate_closed(Some(at("2026-08-04 13:00:00")), now, 24, false));
        // Last success at now - (interval + 1h): open.
        assert!(!gate_closed(Some(at("2026-08-04 11:00:00")), now, 24, false));
        // Override opens the gate regardless.
        assert!(gate_closed(Some(now), now, 24, false));
        assert!(!gate_closed(Some(now), now, 24, true));
        // No history: open.
        assert!(!gate_closed(None, now, 24, false));
    }

    #[test]
    fn test_journal_appends_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("renew_result.md"), "Asia/Tokyo");

        assert_eq!(journal.last_success(), None);
        assert!(!journal.too_soon(24, false));

        journal.record_success().unwrap();
        journal.record_success().unwrap();
        journal.record_success().unwrap();

        let content = std::fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert!(line.ends_with(STATUS_TOKEN), "malformed line: {}", line);
            assert!(parse_line(line).is_some(), "unparseable line: {}", line);
        }
        // Chronological, never rewritten.
        let stamps: Vec<_> = lines.iter().map(|l| parse_line(l).unwrap()).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));

        // A fresh success closes the gate until the interval elapses.
        assert!(journal.too_soon(24, false));
        assert!(!journal.too_soon(24, true));
    }

    #[test]
    fn test_journal_ignores_trailing_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.md");
        std::fs::write(&path, "2026-08-05 12:00:00 Asia/Tokyo 成功\n\n\n").unwrap();
        let journal = Journal::new(&path, "Asia/Tokyo");
        assert_eq!(journal.last_success(), Some(at("2026-08-05 03:00:00")));
    }

    #[test]
    fn test_journal_malformed_last_line_opens_gate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.md");
        std::fs::write(&path, "corrupted entry\n").unwrap();
        let journal = Journal::new(&path, "Asia/Tokyo");
        assert_eq!(journal.last_success(), None);
        assert!(!journal.too_soon(24, false));
    }
}
