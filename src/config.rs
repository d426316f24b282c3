use clap::Parser;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "student-batch-mailer";

/// Sidecar for the student batch mailer. Reads one JSON request per line on
/// stdin and writes one JSON response per line on stdout.
#[derive(Debug, Clone, Parser)]
#[command(version)]
pub struct AppConfig {
    /// Where the sent log, templates and upload cache live
    #[arg(long, env = "BATCHMAIL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Mail-client script handed to the runner for every message
    #[arg(long, env = "BATCHMAIL_MAIL_SCRIPT")]
    pub mail_script: Option<PathBuf>,

    /// Program that executes the mail script
    #[arg(long, env = "BATCHMAIL_MAIL_RUNNER", default_value = "osascript")]
    pub mail_runner: String,
}

impl AppConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR_NAME)
        })
    }

    pub fn sent_log_path(&self) -> PathBuf {
        self.data_dir().join("sent-log.json")
    }

    pub fn templates_path(&self) -> PathBuf {
        self.data_dir().join("templates.json")
    }

    pub fn upload_cache_dir(&self) -> PathBuf {
        self.data_dir().join("upload-cache")
    }

    /// Defaults to `outlook.scpt` next to the executable.
    pub fn mail_script(&self) -> Option<PathBuf> {
        if let Some(p) = &self.mail_script {
            return Some(p.clone());
        }
        let exe = std::env::current_exe().ok()?;
        Some(exe.parent()?.join("outlook.scpt"))
    }

    /// Scratch folder the mail script is copied into before use.
    pub fn script_work_dir(&self) -> PathBuf {
        std::env::temp_dir().join(APP_DIR_NAME)
    }
}
