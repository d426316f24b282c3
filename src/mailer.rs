use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use crate::store::{SentLog, SentLogEntry};
use crate::template::format_email_body;

pub const DEFAULT_SUBJECT: &str = "Student Feedback";
pub const DEFAULT_BODY: &str = "Please see the attached feedback.";

/// A matched row plus its rendered subject and body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutgoingMatch {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub studentid: String,
    pub file_path: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMatch {
    fn recipient_name(&self) -> String {
        let name = format!("{} {}", self.firstname.trim(), self.lastname.trim());
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub attachment: PathBuf,
    pub subject: String,
    pub html_body: String,
    pub recipient_name: String,
    pub email: String,
}

pub trait MailTransport {
    fn deliver(&self, mail: &Mail) -> anyhow::Result<()>;
}

/// Hands each mail to an external mail-client script, e.g.
/// `osascript outlook.scpt <attachment> <subject> <body> <name> <email>`.
pub struct ScriptTransport {
    runner: String,
    script: PathBuf,
}

impl ScriptTransport {
    pub fn new(runner: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            runner: runner.into(),
            script: script.into(),
        }
    }
}

impl MailTransport for ScriptTransport {
    fn deliver(&self, mail: &Mail) -> anyhow::Result<()> {
        let output = Command::new(&self.runner)
            .arg(&self.script)
            .arg(&mail.attachment)
            .arg(&mail.subject)
            .arg(&mail.html_body)
            .arg(&mail.recipient_name)
            .arg(&mail.email)
            .output()
            .with_context(|| format!("failed to run {}", self.runner))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.runner,
                output.status,
                stderr.trim()
            ));
        }
        Ok(())
    }
}

/// Copies the bundled script into `work_dir` so the mail client can read it
/// from a stable location.
pub fn prepare_script(bundled: &Path, work_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(work_dir)
        .with_context(|| format!("failed to create directory {}", work_dir.to_string_lossy()))?;
    let file_name = bundled
        .file_name()
        .ok_or_else(|| anyhow!("mail script path has no file name"))?;
    let destination = work_dir.join(file_name);
    std::fs::copy(bundled, &destination).with_context(|| {
        format!(
            "failed to copy mail script {} to {}",
            bundled.to_string_lossy(),
            destination.to_string_lossy()
        )
    })?;
    Ok(destination)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub sent: usize,
    /// Set when the batch stopped early.
    pub failure: Option<String>,
}

/// Sends the batch in order, stopping at the first missing attachment or
/// transport failure. Everything delivered before that point is logged.
pub fn send_batch(
    transport: &dyn MailTransport,
    batch: &[OutgoingMatch],
    log: &SentLog,
) -> anyhow::Result<SendOutcome> {
    let mut delivered = Vec::new();
    let mut failure = None;

    for item in batch {
        let attachment = PathBuf::from(&item.file_path);
        if item.file_path.is_empty() || !attachment.is_file() {
            failure = Some(format!(
                "Attachment missing for {} {}",
                item.firstname, item.lastname
            ));
            break;
        }

        let subject = if item.subject.is_empty() {
            DEFAULT_SUBJECT.to_string()
        } else {
            item.subject.clone()
        };
        let body = if item.body.trim().is_empty() {
            DEFAULT_BODY
        } else {
            item.body.as_str()
        };
        let mail = Mail {
            attachment: attachment.clone(),
            subject,
            html_body: format_email_body(body),
            recipient_name: item.recipient_name(),
            email: item.email.clone(),
        };

        if let Err(e) = transport.deliver(&mail) {
            warn!("delivery to {} failed: {e:#}", item.email);
            failure = Some(format!("{e:#}"));
            break;
        }
        info!("sent feedback to {}", item.email);

        let file_name = attachment
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        delivered.push(SentLogEntry::now(
            &item.firstname,
            &item.lastname,
            &item.email,
            &item.studentid,
            &file_name,
        ));
    }

    log.append(&delivered)?;
    Ok(SendOutcome {
        sent: delivered.len(),
        failure,
    })
}
