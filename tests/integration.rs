use config_env_sync::sync::{ConfigSync, ConfigSyncError, SyncOptions, SyncOutcome};
use std::{fs, io::Cursor, path::Path};
use tempfile::TempDir;

const TEMPLATE: &str = "# Codeman configuration
# Core
API_URL=http://localhost:8080
# DEBUG=1

# Notifications
export SLACK_WEBHOOK=
# export RETRIES=3
";

struct Run {
  outcome: Result<SyncOutcome, ConfigSyncError>,
  messages: String,
  diff: String,
}

fn sync(dir: &Path, input: &str, configure: impl FnOnce(&mut SyncOptions)) -> Run {
  let mut options = SyncOptions {
    template_file: dir.join("config.env.example"),
    config_file: dir.join("codeman").join("config.env"),
    dry_run: false,
    show_diff: false,
    non_interactive: true,
  };
  configure(&mut options);

  let mut messages = Vec::new();
  let mut diff = Vec::new();
  let outcome = ConfigSync::sync_with_io(options, Cursor::new(input), &mut messages, &mut diff);

  Run {
    outcome,
    messages: String::from_utf8(messages).unwrap(),
    diff: String::from_utf8(diff).unwrap(),
  }
}

fn setup(user: Option<&str>) -> TempDir {
  let temp_dir = TempDir::new().unwrap();
  fs::write(temp_dir.path().join("config.env.example"), TEMPLATE).unwrap();
  if let Some(user) = user {
    fs::create_dir_all(temp_dir.path().join("codeman")).unwrap();
    fs::write(config_path(&temp_dir), user).unwrap();
  }
  temp_dir
}

fn config_path(dir: &TempDir) -> std::path::PathBuf {
  dir.path().join("codeman").join("config.env")
}

fn backups(dir: &TempDir) -> Vec<std::path::PathBuf> {
  fs::read_dir(dir.path().join("codeman"))
    .unwrap()
    .map(|entry| entry.unwrap().path())
    .filter(|path| path.to_string_lossy().contains("config.env.bak."))
    .collect()
}

#[test]
fn test_sync_integration() {
  let user = "API_URL=https://codeman.internal
DEBUG=1
SLACK_WEBHOOK=https://hooks.slack.com/services/XYZ
API_URL=https://codeman.example.com
LEGACY_FLAG=on
";
  let temp_dir = setup(Some(user));

  let run = sync(temp_dir.path(), "", |_| {});

  let expected = "# Codeman configuration
# Core
API_URL=https://codeman.example.com
DEBUG=1

# Notifications
SLACK_WEBHOOK=https://hooks.slack.com/services/XYZ
# export RETRIES=3

# --- User-defined (not in template) ---
LEGACY_FLAG=on
";

  let backup = match run.outcome.unwrap() {
    SyncOutcome::Updated { backup } => backup,
    other => panic!("Expected Updated, got {other:?}"),
  };
  assert_eq!(fs::read_to_string(config_path(&temp_dir)).unwrap(), expected);
  assert_eq!(fs::read_to_string(&backup).unwrap(), user);
  assert!(run.messages.contains("(backup: "));
  assert!(run.diff.is_empty());
}

#[test]
fn test_second_run_is_noop() {
  let temp_dir = setup(Some("DEBUG=1\nEXTRA=x\n"));

  sync(temp_dir.path(), "", |_| {}).outcome.unwrap();
  let first = fs::read_to_string(config_path(&temp_dir)).unwrap();

  let run = sync(temp_dir.path(), "", |_| {});
  assert_eq!(run.outcome.unwrap(), SyncOutcome::Unchanged);
  assert_eq!(run.messages, "No changes needed.\n");
  assert_eq!(fs::read_to_string(config_path(&temp_dir)).unwrap(), first);
  assert_eq!(backups(&temp_dir).len(), 1);
}

#[test]
fn test_fresh_install_creates_config() {
  let temp_dir = setup(None);

  let run = sync(temp_dir.path(), "", |_| {});

  assert_eq!(run.outcome.unwrap(), SyncOutcome::Created);
  assert_eq!(fs::read_to_string(config_path(&temp_dir)).unwrap(), TEMPLATE);
  assert!(run.messages.starts_with("Created "));
  assert!(backups(&temp_dir).is_empty());
}

#[test]
fn test_dry_run_with_diff_writes_nothing() {
  let temp_dir = setup(Some("# stale note\n"));

  let run = sync(temp_dir.path(), "", |options| {
    options.dry_run = true;
    options.show_diff = true;
  });

  assert_eq!(run.outcome.unwrap(), SyncOutcome::DryRun);
  assert!(run.messages.contains("Dry run: config would be updated."));
  assert!(run.diff.contains("config.env (synced)"));
  assert!(run.diff.contains("+API_URL=http://localhost:8080\n"));
  assert!(run.diff.contains("-# stale note\n"));
  assert_eq!(
    fs::read_to_string(config_path(&temp_dir)).unwrap(),
    "# stale note\n"
  );
  assert!(backups(&temp_dir).is_empty());
}

#[test]
fn test_interactive_delete_all() {
  let temp_dir = setup(Some("OLD_TOKEN=abcdefghijklmnopqrstuvwxyz1234\nAPI_URL=x\n"));

  let run = sync(temp_dir.path(), "d\n", |options| options.non_interactive = false);

  run.outcome.unwrap();
  assert!(run.messages.contains("  - OLD_TOKEN=abc<...>234\n"));
  let content = fs::read_to_string(config_path(&temp_dir)).unwrap();
  assert!(!content.contains("OLD_TOKEN"));
  assert!(!content.contains("User-defined"));
}

#[test]
fn test_interactive_individual() {
  let temp_dir = setup(Some("ZED=1\nALPHA=2\nMID=3\n"));

  let run = sync(temp_dir.path(), "i\ny\nwhat\nn\n\n", |options| {
    options.non_interactive = false;
  });

  run.outcome.unwrap();
  assert!(run.messages.contains("Invalid choice: what\n"));
  let content = fs::read_to_string(config_path(&temp_dir)).unwrap();
  assert!(content.ends_with("# --- User-defined (not in template) ---\nALPHA=2\nZED=1\n"));
}

#[test]
fn test_missing_template_aborts() {
  let temp_dir = TempDir::new().unwrap();

  let run = sync(temp_dir.path(), "", |_| {});

  assert!(matches!(run.outcome, Err(ConfigSyncError::TemplateNotFound(_))));
  assert!(!config_path(&temp_dir).exists());
}
