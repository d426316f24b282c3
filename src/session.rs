use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::mailer;
use crate::matcher::{compute_matches, MatchRecord};
use crate::resolver::{merge_files, resolve_entries, DropEntry, Resolution, ResolvedFile, UploadCache};
use crate::roster::Roster;
use crate::store::{SentLog, TemplateStore};

/// Everything one daemon process owns. Created once at start-up; the upload
/// cache is wiped here and nowhere else.
pub struct Session {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub cache: UploadCache,
    pub sent_log: SentLog,
    pub templates: TemplateStore,
    pub roster: Option<Roster>,
    pub files: Vec<ResolvedFile>,
    prepared_script: Option<PathBuf>,
}

impl Session {
    pub fn start(config: AppConfig) -> anyhow::Result<Self> {
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.to_string_lossy()))?;

        let sent_log = SentLog::open(config.sent_log_path())?;
        let templates = TemplateStore::open(config.templates_path())?;
        if let Err(e) = templates.ensure_default() {
            warn!("could not create default template: {e:#}");
        }
        let cache_dir = config.upload_cache_dir();
        let cache = UploadCache::reset(&cache_dir).with_context(|| {
            format!("failed to prepare upload cache {}", cache_dir.to_string_lossy())
        })?;

        info!("session started in {}", data_dir.display());
        Ok(Self {
            config,
            data_dir,
            cache,
            sent_log,
            templates,
            roster: None,
            files: Vec::new(),
            prepared_script: None,
        })
    }

    /// Resolves `entries` and folds the result into the file pool. The
    /// returned resolution only covers the new entries.
    pub fn add_entries(&mut self, entries: &[DropEntry]) -> Resolution {
        let resolution = resolve_entries(entries, &self.cache);
        self.files = merge_files(&self.files, &resolution.files);
        resolution
    }

    pub fn remove_file(&mut self, path: &str) {
        self.files.retain(|f| f.path != path);
    }

    pub fn clear_files(&mut self) {
        self.files.clear();
    }

    /// Recomputed from scratch on every call.
    pub fn matches(&self) -> Vec<MatchRecord> {
        match &self.roster {
            Some(roster) => compute_matches(&roster.students, &self.files),
            None => Vec::new(),
        }
    }

    /// The mail script copy used for sending, prepared on first use.
    pub fn prepared_script(&mut self) -> Option<PathBuf> {
        if let Some(p) = &self.prepared_script {
            if p.is_file() {
                return Some(p.clone());
            }
        }
        let bundled = self.config.mail_script()?;
        if !bundled.is_file() {
            warn!("mail script not found at {}", bundled.display());
            return None;
        }
        match mailer::prepare_script(&bundled, &self.config.script_work_dir()) {
            Ok(p) => {
                self.prepared_script = Some(p.clone());
                Some(p)
            }
            Err(e) => {
                warn!("unable to prepare mail script: {e:#}");
                None
            }
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
