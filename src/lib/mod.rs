//! Config env file reconciliation library.
//!
//! This library brings a user's `KEY=VALUE` config file in line with a versioned
//! template. The template decides structure, comments, ordering and defaults;
//! the user file supplies values. Keys only the user declares are kept or
//! dropped according to a retention policy.
//!
//! # Features
//!
//! - **Zero-copy parsing**: Uses `Cow<str>` borrowed from the input text
//! - **Value preservation**: User values, commented and `export` state survive a sync
//! - **Safe writes**: Opt-in diff, dry runs and timestamped backups
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust
//! use config_env_sync::parse::{Template, UserConfig};
//! use config_env_sync::render::render;
//! use std::collections::BTreeSet;
//!
//! let template = Template::try_from("FOO=default\n# BAR=disabled\n").unwrap();
//! let user = UserConfig::from("FOO=custom\nBAR=enabled\n");
//!
//! let merged = render(&template, &user, &BTreeSet::new());
//! assert_eq!(merged.to_string(), "FOO=custom\nBAR=enabled\n");
//! ```

pub mod parse;
pub mod reconcile;
pub mod render;
pub mod sync;
