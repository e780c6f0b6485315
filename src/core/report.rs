use std::fs::{self, Permissions};
use std::io::Write;
use std::path::Path;

use log::info;
use tempfile::NamedTempFile;

use crate::core::error::ReportError;
use crate::core::history::HistoryStore;

pub const DEFAULT_REPORT_FILE: &str = "history.html";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const HTML_HEAD: &str =
    "<html><header><title>Historico de Navegacao</title></header><body><ul>";
const HTML_TAIL: &str = "</ul></body></html>";

/// Escapes the five HTML-significant characters. Artifact text comes straight
/// off the wire and goes into both an attribute and element content.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_html(history: &HistoryStore) -> String {
    let mut out = String::from(HTML_HEAD);
    for artifact in history {
        let escaped = escape_html(&artifact.text);
        out.push_str(&format!(
            "<li>{} - {} - <a href=\"{escaped}\">{escaped}</a></li>",
            artifact.timestamp.format(TIMESTAMP_FORMAT),
            artifact.src_ip,
        ));
    }
    out.push_str(HTML_TAIL);
    out
}

/// One JSON object per line, in history order.
pub fn render_jsonl(history: &HistoryStore) -> Result<String, ReportError> {
    let mut out = String::new();
    for artifact in history {
        out.push_str(&serde_json::to_string(artifact)?);
        out.push('\n');
    }
    Ok(out)
}

/// Replaces `path` with the HTML report.
pub fn write_html(path: &Path, history: &HistoryStore) -> Result<(), ReportError> {
    write_atomic(path, render_html(history).as_bytes())?;
    info!("wrote {} entries to {}", history.len(), path.display());
    Ok(())
}

pub fn write_jsonl(path: &Path, history: &HistoryStore) -> Result<(), ReportError> {
    write_atomic(path, render_jsonl(history)?.as_bytes())?;
    info!("wrote {} JSON lines to {}", history.len(), path.display());
    Ok(())
}

/// Mode for the replacement file: whatever the current report has, otherwise
/// world-readable like a plain `File::create` under the usual umask.
fn report_permissions(path: &Path) -> Option<Permissions> {
    fs::metadata(path)
        .ok()
        .map(|meta| meta.permissions())
        .or_else(default_permissions)
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

// Write next to the target then rename over it: readers and a second
// interrupt only ever see the old file or the complete new one.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ReportError::io(path, e))?;
    if let Some(perms) = report_permissions(path) {
        tmp.as_file()
            .set_permissions(perms)
            .map_err(|e| ReportError::io(path, e))?;
    }
    tmp.write_all(contents).map_err(|e| ReportError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ReportError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| ReportError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Artifact, ArtifactKind};
    use chrono::{Local, TimeZone};
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    fn artifact(text: &str, kind: ArtifactKind) -> Artifact {
        Artifact {
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap(),
            src_ip: Ipv4Addr::new(192, 168, 0, 10),
            text: text.to_string(),
            kind,
        }
    }

    fn sample_history() -> HistoryStore {
        let mut history = HistoryStore::new();
        history.push(artifact("http://example.com/path", ArtifactKind::Http));
        history.push(artifact("www.example.com", ArtifactKind::Dns));
        history
    }

    #[test]
    fn empty_history_renders_empty_list() {
        assert_eq!(
            render_html(&HistoryStore::new()),
            "<html><header><title>Historico de Navegacao</title></header><body><ul></ul></body></html>"
        );
    }

    #[test]
    fn each_artifact_is_one_list_item() {
        let html = render_html(&sample_history());
        assert_eq!(html.matches("<li>").count(), 2);
        assert!(html.contains(
            "<li>2024-05-01 12:30:15.000000 - 192.168.0.10 - \
             <a href=\"http://example.com/path\">http://example.com/path</a></li>"
        ));
        assert!(html.ends_with(
            "<a href=\"www.example.com\">www.example.com</a></li></ul></body></html>"
        ));
    }

    #[test]
    fn artifact_text_is_escaped() {
        let mut history = HistoryStore::new();
        history.push(artifact(
            "http://evil.test/<script>alert('x')</script>\"&",
            ArtifactKind::Http,
        ));

        let html = render_html(&history);
        assert!(!html.contains("<script>"));
        let escaped =
            "http://evil.test/&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;&quot;&amp;";
        assert!(html.contains(&format!("<a href=\"{escaped}\">{escaped}</a>")));
    }

    #[test]
    fn flush_overwrites_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_REPORT_FILE);
        fs::write(&path, "stale content that is longer than nothing at all").unwrap();

        let history = sample_history();
        write_html(&path, &history).unwrap();
        let first = fs::read(&path).unwrap();
        write_html(&path, &history).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, render_html(&history).into_bytes());

        // Only the report itself is left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn new_report_is_readable_by_others() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_REPORT_FILE);
        write_html(&path, &sample_history()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_existing_report_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_REPORT_FILE);
        for mode in [0o644, 0o640] {
            fs::write(&path, "old").unwrap();
            fs::set_permissions(&path, Permissions::from_mode(mode)).unwrap();

            write_html(&path, &HistoryStore::new()).unwrap();

            let after = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(after, mode);
        }
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("history.html");
        let err = write_html(&path, &HistoryStore::new()).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }

    #[test]
    fn jsonl_has_one_line_per_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        let history = sample_history();
        write_jsonl(&path, &history).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let parsed: Vec<Artifact> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].text, "http://example.com/path");
        assert_eq!(parsed[1].kind, ArtifactKind::Dns);
        assert!(contents.lines().next().unwrap().contains("\"kind\":\"HTTP\""));
    }
}
