//! Config file synchronization.
//!
//! This module wires the parser, the retention policy and the renderer to the
//! filesystem. A sync:
//! 1. Reads the template (required) and the user config (optional)
//! 2. Asks which user-only keys to keep, unless running unattended
//! 3. Renders the merged content and compares it with what is on disk
//! 4. Prints a diff when asked, then stops on a dry run
//! 5. Backs up the existing file and writes the new content
//!
//! # Examples
//!
//! ```rust,no_run
//! use config_env_sync::sync::{ConfigSync, SyncOptions, default_config_path};
//! use std::path::PathBuf;
//!
//! let options = SyncOptions {
//!     template_file: PathBuf::from("config/config.env.example"),
//!     config_file: default_config_path(),
//!     dry_run: true,
//!     show_diff: false,
//!     non_interactive: true,
//! };
//!
//! ConfigSync::sync_with_options(options).unwrap();
//! ```

use std::{
  ffi::OsString,
  fs::{self, File, FileTimes},
  io::{self, BufRead, Write},
  path::{Path, PathBuf},
};

use similar::TextDiff;
#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::{
  parse::{Template, TemplateError, UserConfig},
  reconcile::{Prompter, Reconciler},
  render::render,
};

const CONFIG_HOME: &str = ".config";
const APP_DIR: &str = "codeman";
const CONFIG_FILENAME: &str = "config.env";
const BACKUP_INFIX: &str = ".bak.";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// `~/.config/codeman/config.env` on every platform, since that is where the
/// app reads it. Falls back to the working directory when there is no home.
pub fn default_config_path() -> PathBuf {
  dirs::home_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join(CONFIG_HOME)
    .join(APP_DIR)
    .join(CONFIG_FILENAME)
}

/// What a sync did to the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
  /// Rendered content matched the file; nothing was written.
  Unchanged,
  /// Content differs but `dry_run` was set.
  DryRun,
  /// The file did not exist and was written fresh.
  Created,
  /// The file was overwritten after being copied to `backup`.
  Updated { backup: PathBuf },
}

pub struct ConfigSync;

impl ConfigSync {
  /// Runs a sync against the process's stdin, stderr and stdout.
  pub fn sync_with_options(options: SyncOptions) -> Result<SyncOutcome, ConfigSyncError> {
    let stdin = io::stdin();
    Self::sync_with_io(options, stdin.lock(), io::stderr(), io::stdout())
  }

  /// Runs a sync reading answers from `input`, writing prompts and progress to
  /// `messages` and the optional diff to `diff_out`.
  pub fn sync_with_io<R, E, O>(
    options: SyncOptions,
    input: R,
    mut messages: E,
    mut diff_out: O,
  ) -> Result<SyncOutcome, ConfigSyncError>
  where
    R: BufRead,
    E: Write,
    O: Write,
  {
    #[cfg(feature = "tracing")]
    info!("Starting config sync");

    let SyncOptions {
      template_file,
      config_file,
      dry_run,
      show_diff,
      non_interactive,
    } = options;

    #[cfg(feature = "tracing")]
    debug!(?template_file, ?config_file, dry_run, show_diff, non_interactive, "Resolved options");

    let template_str = match read_optional(&template_file).map_err(ConfigSyncError::TemplateIo)? {
      Some(content) => content,
      None => return Err(ConfigSyncError::TemplateNotFound(template_file)),
    };
    let template = match Template::try_from(template_str.as_str()) {
      Ok(template) => template,
      Err(TemplateError::Empty) => return Err(ConfigSyncError::TemplateEmpty(template_file)),
    };

    let old_content = read_optional(&config_file)
      .map_err(ConfigSyncError::ConfigIo)?
      .unwrap_or_default();
    let user = UserConfig::from(old_content.as_str());

    let unknown = user.unknown_keys(&template);
    let retained = {
      let prompter = Prompter::new(input, &mut messages);
      Reconciler::new(prompter, !non_interactive)
        .decide(&unknown, &user)
        .map_err(ConfigSyncError::Prompt)?
    };

    let new_content = render(&template, &user, &retained).to_string();

    if new_content == old_content {
      writeln!(messages, "No changes needed.").map_err(ConfigSyncError::Report)?;
      return Ok(SyncOutcome::Unchanged);
    }

    if show_diff {
      Self::write_diff(&mut diff_out, &config_file, &old_content, &new_content)
        .map_err(ConfigSyncError::Diff)?;
    }

    if dry_run {
      writeln!(messages, "Dry run: config would be updated.").map_err(ConfigSyncError::Report)?;
      return Ok(SyncOutcome::DryRun);
    }

    let outcome = Self::update_config(&config_file, &new_content)?;

    let reported = match &outcome {
      SyncOutcome::Updated { backup } => writeln!(
        messages,
        "Updated {} (backup: {}).",
        config_file.display(),
        backup.display()
      ),
      _ => writeln!(messages, "Created {}.", config_file.display()),
    };
    reported.map_err(ConfigSyncError::Report)?;

    #[cfg(feature = "tracing")]
    info!("Sync completed successfully");

    Ok(outcome)
  }

  fn write_diff<O: Write>(out: &mut O, path: &Path, old: &str, new: &str) -> io::Result<()> {
    let from = path.display().to_string();
    let to = format!("{from} (synced)");
    let diff = TextDiff::from_lines(old, new);
    let mut unified = diff.unified_diff();
    unified.header(&from, &to);
    write!(out, "{}", unified)?;
    out.flush()
  }

  /// Backs up the current file if there is one, then replaces its content.
  fn update_config(path: &Path, content: &str) -> Result<SyncOutcome, ConfigSyncError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).map_err(ConfigSyncError::CreateDir)?;
    }

    let backup = if path.exists() {
      Some(backup_file(path).map_err(ConfigSyncError::Backup)?)
    } else {
      None
    };

    #[cfg(feature = "tracing")]
    debug!("Writing synced content to {:?}", path);

    fs::write(path, content).map_err(ConfigSyncError::Write)?;

    Ok(match backup {
      Some(backup) => SyncOutcome::Updated { backup },
      None => SyncOutcome::Created,
    })
  }
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
  match fs::read_to_string(path) {
    Ok(content) => Ok(Some(content)),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e),
  }
}

/// `<path>.bak.<YYYYMMDD-HHMMSS>` for the current local time.
pub fn backup_path(path: &Path) -> PathBuf {
  let timestamp = chrono::Local::now().format(BACKUP_TIMESTAMP_FORMAT);
  let mut name = OsString::from(path.as_os_str());
  name.push(BACKUP_INFIX);
  name.push(timestamp.to_string());
  PathBuf::from(name)
}

/// Copies `path` next to itself, carrying over permissions and timestamps.
fn backup_file(path: &Path) -> io::Result<PathBuf> {
  let backup = backup_path(path);
  let metadata = fs::metadata(path)?;

  fs::copy(path, &backup)?;

  let times = FileTimes::new()
    .set_accessed(metadata.accessed()?)
    .set_modified(metadata.modified()?);
  // The owner may set times through a read-only handle, so a read-only
  // config still gets a backup. Windows needs write access for it.
  #[cfg(unix)]
  let handle = File::open(&backup)?;
  #[cfg(not(unix))]
  let handle = File::options().write(true).open(&backup)?;
  handle.set_times(times)?;

  #[cfg(feature = "tracing")]
  debug!("Backed up {:?} to {:?}", path, backup);

  Ok(backup)
}

/// Errors that can occur while syncing a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigSyncError {
  /// Template file does not exist
  #[error("Template not found: {}", .0.display())]
  TemplateNotFound(PathBuf),
  /// Template file exists but has no content
  #[error("Template is empty: {}", .0.display())]
  TemplateEmpty(PathBuf),
  /// Error reading the template file
  #[error("Template file IO error: {0}")]
  TemplateIo(io::Error),
  /// Error reading the existing config file
  #[error("Config file IO error: {0}")]
  ConfigIo(io::Error),
  /// Error reading an answer or writing a prompt
  #[error("Prompt error: {0}")]
  Prompt(io::Error),
  /// Error writing a progress message
  #[error("Failed to report progress: {0}")]
  Report(io::Error),
  /// Error writing the diff
  #[error("Failed to write diff: {0}")]
  Diff(io::Error),
  /// Error creating the config directory
  #[error("Failed to create config directory: {0}")]
  CreateDir(io::Error),
  /// Error copying the existing config to its backup
  #[error("Failed to back up config: {0}")]
  Backup(io::Error),
  /// Error writing the synchronized content
  #[error("Write error: {0}")]
  Write(io::Error),
}

/// Settings for a single sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
  /// Template that defines structure, order and defaults.
  pub template_file: PathBuf,
  /// User config to bring in line with the template.
  pub config_file: PathBuf,
  /// Report what would change without writing.
  pub dry_run: bool,
  /// Print a unified diff of the change. The diff may contain secrets.
  pub show_diff: bool,
  /// Never prompt; keep every unknown key.
  pub non_interactive: bool,
}
