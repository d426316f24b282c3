//! JSON files under the data directory: the sent log (append-only) and the
//! message templates (rewritten whole on every change).

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Europe::Amsterdam;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_TEMPLATE_NAME: &str = "Rubric WS";
pub const DEFAULT_TEMPLATE_SUBJECT: &str = "Rubric Writing Skills - {{firstname}} {{lastname}}";
pub const DEFAULT_TEMPLATE_BODY: &str = "Dag {{firstname}},\n\nHierbij ontvang je de rubric voor Writing Skills. Heb je hier vragen over, neem dan contact op met je docent.\n\nDit is een geautomatiseerd bericht.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentLogEntry {
    pub timestamp: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub studentid: String,
    #[serde(default)]
    pub file_name: String,
}

impl SentLogEntry {
    pub fn now(
        firstname: &str,
        lastname: &str,
        email: &str,
        studentid: &str,
        file_name: &str,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            email: email.to_string(),
            studentid: studentid.to_string(),
            file_name: file_name.to_string(),
        }
    }

    /// `[dd-mm-yyyy HH:MM] - sent email to ...`, in Amsterdam time.
    pub fn export_line(&self) -> String {
        let when = match DateTime::parse_from_rfc3339(&self.timestamp) {
            Ok(ts) => ts.with_timezone(&Amsterdam).format("%d-%m-%Y %H:%M").to_string(),
            Err(_) => self.timestamp.clone(),
        };
        format!(
            "[{}] - sent email to {} {} <{}> with attachment {}",
            when, self.firstname, self.lastname, self.email, self.file_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

fn ensure_json_array(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    if !path.exists() {
        std::fs::write(path, "[]")
            .with_context(|| format!("failed to create {}", path.to_string_lossy()))?;
    }
    Ok(())
}

/// A missing or corrupt file reads as empty.
fn read_json_array<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("cannot read {}: {e}", path.display());
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            warn!("ignoring malformed {}: {e}", path.display());
            Vec::new()
        }
    }
}

fn write_json_array<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(items).context("failed to serialize JSON store")?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))
}

#[derive(Debug, Clone)]
pub struct SentLog {
    path: PathBuf,
}

impl SentLog {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        ensure_json_array(&path)?;
        Ok(Self { path })
    }

    pub fn entries(&self) -> Vec<SentLogEntry> {
        read_json_array(&self.path)
    }

    pub fn has_entries(&self) -> bool {
        !self.entries().is_empty()
    }

    pub fn append(&self, new_entries: &[SentLogEntry]) -> anyhow::Result<()> {
        if new_entries.is_empty() {
            return Ok(());
        }
        let mut all = self.entries();
        all.extend_from_slice(new_entries);
        write_json_array(&self.path, &all)
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        std::fs::write(&self.path, "[]")
            .with_context(|| format!("failed to clear {}", self.path.to_string_lossy()))
    }

    /// Writes one line per entry to `out`. Returns the number of lines.
    pub fn export_to(&self, out: &Path) -> anyhow::Result<usize> {
        let lines: Vec<String> = self.entries().iter().map(SentLogEntry::export_line).collect();
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
        }
        std::fs::write(out, lines.join("\n"))
            .with_context(|| format!("failed to write {}", out.to_string_lossy()))?;
        Ok(lines.len())
    }
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    path: PathBuf,
}

impl TemplateStore {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        ensure_json_array(&path)?;
        Ok(Self { path })
    }

    pub fn list(&self) -> Vec<MessageTemplate> {
        read_json_array(&self.path)
    }

    /// Replaces any template of the same name; the saved one goes last.
    pub fn save(&self, template: MessageTemplate) -> anyhow::Result<Vec<MessageTemplate>> {
        if template.name.is_empty() {
            anyhow::bail!("Template name is required.");
        }
        let mut templates: Vec<MessageTemplate> = self
            .list()
            .into_iter()
            .filter(|t| t.name != template.name)
            .collect();
        templates.push(template);
        write_json_array(&self.path, &templates)?;
        Ok(templates)
    }

    pub fn delete(&self, name: &str) -> anyhow::Result<Vec<MessageTemplate>> {
        let templates: Vec<MessageTemplate> =
            self.list().into_iter().filter(|t| t.name != name).collect();
        write_json_array(&self.path, &templates)?;
        Ok(templates)
    }

    pub fn ensure_default(&self) -> anyhow::Result<()> {
        if self.list().iter().any(|t| t.name == DEFAULT_TEMPLATE_NAME) {
            return Ok(());
        }
        self.save(MessageTemplate {
            name: DEFAULT_TEMPLATE_NAME.to_string(),
            subject: DEFAULT_TEMPLATE_SUBJECT.to_string(),
            body: DEFAULT_TEMPLATE_BODY.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn entry(timestamp: &str) -> SentLogEntry {
        SentLogEntry {
            timestamp: timestamp.into(),
            firstname: "Jan".into(),
            lastname: "Bakker".into(),
            email: "jan@x.nl".into(),
            studentid: "S1".into(),
            file_name: "jan_bakker.pdf".into(),
        }
    }

    #[test]
    fn export_line_uses_amsterdam_time() {
        // 13:05 UTC is 15:05 CEST in summer and 14:05 CET in winter.
        assert_eq!(
            entry("2024-07-01T13:05:00.000Z").export_line(),
            "[01-07-2024 15:05] - sent email to Jan Bakker <jan@x.nl> with attachment jan_bakker.pdf"
        );
        assert!(entry("2024-01-15T13:05:00.000Z")
            .export_line()
            .starts_with("[15-01-2024 14:05]"));
    }

    #[test]
    fn sent_log_appends_and_clears() {
        let dir = temp_dir("batchmail-sentlog");
        let log = SentLog::open(dir.join("nested").join("sent-log.json")).expect("open");
        assert!(!log.has_entries());

        log.append(&[entry("2024-07-01T13:05:00.000Z")]).expect("append");
        log.append(&[entry("2024-07-02T13:05:00.000Z")]).expect("append");
        assert_eq!(log.entries().len(), 2);

        let out = dir.join("export.txt");
        assert_eq!(log.export_to(&out).expect("export"), 2);
        let text = std::fs::read_to_string(&out).expect("read export");
        assert_eq!(text.lines().count(), 2);

        log.clear().expect("clear");
        assert!(!log.has_entries());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_log_reads_as_empty() {
        let dir = temp_dir("batchmail-sentlog-corrupt");
        let path = dir.join("sent-log.json");
        std::fs::write(&path, "{not json").expect("write");
        let log = SentLog::open(&path).expect("open");
        assert!(log.entries().is_empty());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn templates_replace_by_name_and_delete() {
        let dir = temp_dir("batchmail-templates");
        let store = TemplateStore::open(dir.join("templates.json")).expect("open");
        store.ensure_default().expect("default");
        store.ensure_default().expect("default twice");
        assert_eq!(store.list().len(), 1);

        let t = |name: &str, subject: &str| MessageTemplate {
            name: name.into(),
            subject: subject.into(),
            body: String::new(),
        };
        store.save(t("A", "first")).expect("save");
        let saved = store.save(t(DEFAULT_TEMPLATE_NAME, "changed")).expect("save");
        let names: Vec<&str> = saved.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["A", DEFAULT_TEMPLATE_NAME]);
        assert_eq!(saved[1].subject, "changed");

        assert!(store.save(t("", "x")).is_err());
        let left = store.delete("A").expect("delete");
        assert_eq!(left.len(), 1);
        let _ = std::fs::remove_dir_all(dir);
    }
}
