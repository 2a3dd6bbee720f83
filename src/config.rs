//! Settings file and command-line overrides.
//!
//! Settings come from a TOML file (`--config <path>`, else
//! `~/.git-commit-times.toml` when present) with every key optional.
//! Flags given on the command line win over the file.
//!
//! ```toml
//! strategy = "revwalk"
//! merge_parents = "first"
//! jobs = 4
//! since = "2020-01-01"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Offset, TimeZone};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::git::{MergeParents, TimeWindow, WalkOrder};
use crate::models::CommitTime;
use crate::{Strategy, SyncOptions, default_jobs};

pub const CONFIG_FILE_NAME: &str = ".git-commit-times.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub strategy: Strategy,
    pub order: WalkOrder,
    pub merge_parents: MergeParents,
    /// `None` means one worker per available core.
    pub jobs: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub log_level: String,
    pub progress: bool,
    pub git_program: String,
    pub ignore_submodules: bool,
    pub since: Option<String>,
    pub until: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            order: WalkOrder::default(),
            merge_parents: MergeParents::default(),
            jobs: None,
            queue_capacity: None,
            log_level: "warn".to_string(),
            progress: false,
            git_program: "git".to_string(),
            ignore_submodules: true,
            since: None,
            until: None,
        }
    }
}

/// Values taken from the command line. `None`/`false` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub strategy: Option<Strategy>,
    pub order: Option<WalkOrder>,
    pub first_parent: bool,
    pub jobs: Option<usize>,
    pub verbose: bool,
    pub progress: bool,
    pub since: Option<String>,
    pub until: Option<String>,
}

impl Settings {
    /// Reads `explicit` if given, else the per-user file if it exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match user_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn apply_cli(&mut self, overrides: Overrides) {
        if let Some(strategy) = overrides.strategy {
            self.strategy = strategy;
        }
        if let Some(order) = overrides.order {
            self.order = order;
        }
        if overrides.first_parent {
            self.merge_parents = MergeParents::First;
        }
        if let Some(jobs) = overrides.jobs {
            self.jobs = Some(jobs);
        }
        if overrides.verbose {
            self.log_level = "debug".to_string();
        }
        if overrides.progress {
            self.progress = true;
        }
        if overrides.since.is_some() {
            self.since = overrides.since;
        }
        if overrides.until.is_some() {
            self.until = overrides.until;
        }
    }

    pub fn window(&self) -> Result<TimeWindow> {
        Ok(TimeWindow {
            since: self.since.as_deref().map(parse_date).transpose()?,
            until: self.until.as_deref().map(parse_date).transpose()?,
        })
    }

    pub fn sync_options(&self, repo: impl Into<PathBuf>, paths: Vec<String>) -> Result<SyncOptions> {
        let jobs = self.jobs.unwrap_or_else(default_jobs);
        let mut options = SyncOptions::new(repo);
        options.paths = paths;
        options.strategy = self.strategy;
        options.order = self.order;
        options.merge_parents = self.merge_parents;
        options.window = self.window()?;
        options.jobs = jobs;
        options.queue_capacity = self.queue_capacity.unwrap_or(jobs.max(1) * 16);
        options.progress = self.progress;
        options.git_program = self.git_program.clone();
        options.ignore_submodules = self.ignore_submodules;
        Ok(options)
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (local time) or `YYYY-MM-DD` (local midnight).
pub fn parse_date(text: &str) -> Result<CommitTime> {
    let text = text.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(time);
    }

    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| AppError::InvalidDate(text.to_string()))?;

    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| AppError::InvalidDate(format!("{} does not exist in local time", text)))?;
    Ok(local.with_timezone(&local.offset().fix()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.log_level, "warn");
        assert!(settings.ignore_submodules);
    }

    #[test]
    fn reads_every_key() {
        let settings = Settings::from_toml(
            r#"
            strategy = "revwalk"
            order = "native"
            merge_parents = "first"
            jobs = 0
            queue_capacity = 3
            log_level = "info"
            progress = true
            git_program = "/usr/local/bin/git"
            ignore_submodules = false
            since = "2020-01-01"
            until = "2021-06-30T12:00:00Z"
            "#,
        )
        .unwrap();

        assert_eq!(settings.strategy, Strategy::Revwalk);
        assert_eq!(settings.order, WalkOrder::Native);
        assert_eq!(settings.merge_parents, MergeParents::First);
        assert_eq!(settings.jobs, Some(0));
        assert_eq!(settings.queue_capacity, Some(3));
        assert!(settings.progress);
        assert!(!settings.ignore_submodules);

        let options = settings.sync_options("/repo", Vec::new()).unwrap();
        assert_eq!(options.jobs, 0);
        assert_eq!(options.queue_capacity, 3);
        assert_eq!(options.git_program, "/usr/local/bin/git");
        assert_eq!(options.window.until.unwrap().timestamp(), 1_625_054_400);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Settings::from_toml("stratgey = \"log\""),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            Settings::from_toml("strategy = \"svn\""),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut settings = Settings::from_toml("strategy = \"revwalk\"\njobs = 2\nsince = \"2020-01-01\"").unwrap();
        settings.apply_cli(Overrides {
            strategy: Some(Strategy::Log),
            first_parent: true,
            verbose: true,
            since: Some("2022-02-02".to_string()),
            ..Overrides::default()
        });

        assert_eq!(settings.strategy, Strategy::Log);
        assert_eq!(settings.merge_parents, MergeParents::First);
        assert_eq!(settings.jobs, Some(2));
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.since.as_deref(), Some("2022-02-02"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(Settings::load(Some(&missing)), Err(AppError::Config(_))));

        let present = dir.path().join("cfg.toml");
        fs::write(&present, "progress = true").unwrap();
        assert!(Settings::load(Some(&present)).unwrap().progress);
    }

    #[test]
    fn user_config_lives_in_the_home_directory() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(user_config_path(), Some(home.join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn parses_supported_date_forms() {
        let rfc = parse_date("2009-02-13T23:31:30+01:00").unwrap();
        assert_eq!(rfc.timestamp(), 1_234_564_290);
        assert_eq!(rfc.offset().local_minus_utc(), 3600);

        let day = parse_date("2020-03-04").unwrap();
        assert_eq!((day.year(), day.month(), day.day()), (2020, 3, 4));
        assert_eq!((day.hour(), day.minute()), (0, 0));

        let moment = parse_date(" 2020-03-04 05:06:07 ").unwrap();
        assert_eq!((moment.hour(), moment.minute(), moment.second()), (5, 6, 7));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(matches!(parse_date("last tuesday"), Err(AppError::InvalidDate(_))));
        assert!(matches!(
            Settings {
                until: Some("2020-13-40".to_string()),
                ..Settings::default()
            }
            .window(),
            Err(AppError::InvalidDate(_))
        ));
    }
}
