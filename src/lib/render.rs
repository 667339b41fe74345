//! Merges a parsed template with the user's index into the final file.
//!
//! The output follows the template line for line. Assignment lines take the
//! user's value, commented state and export state when the user declares the
//! key, and the template's own state otherwise. Unknown user keys that were
//! retained are appended under [`TRAILER_MARKER`], sorted by key.
//!
//! Nothing in here touches the filesystem.

use std::{collections::BTreeSet, fmt};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::parse::{AssignLine, Template, TemplateLine, UserConfig};

pub const TRAILER_MARKER: &str = "# --- User-defined (not in template) ---";

const COMMENTED_PREFIX: &str = "# ";
const EXPORT_PREFIX: &str = "export ";

/// Rendered file content, one entry per output line without terminators.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rendered {
  pub lines: Vec<String>,
}

impl fmt::Display for Rendered {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for line in &self.lines {
      writeln!(f, "{}", line)?;
    }
    Ok(())
  }
}

/// Formats a single assignment, dropping trailing whitespace.
pub fn render_assign(key: &str, value: &str, commented: bool, exported: bool) -> String {
  let mut line = String::with_capacity(key.len() + value.len() + 10);
  if commented {
    line.push_str(COMMENTED_PREFIX);
  }
  if exported {
    line.push_str(EXPORT_PREFIX);
  }
  line.push_str(key);
  line.push('=');
  line.push_str(value);
  line.truncate(line.trim_end().len());
  line
}

fn render_with_state(key: &str, state: &AssignLine) -> String {
  render_assign(key, &state.value, state.commented, state.exported)
}

/// Produces the merged line sequence.
///
/// `retained` names the unknown keys to keep. Keys in it that the template
/// declares, or that the user file lacks, are ignored.
pub fn render(template: &Template, user: &UserConfig, retained: &BTreeSet<String>) -> Rendered {
  #[cfg(feature = "tracing")]
  debug!(
    "Rendering {} template lines against {} user keys",
    template.lines.len(),
    user.entries.len()
  );

  let mut lines = Vec::with_capacity(template.lines.len() + retained.len() + 2);

  for line in &template.lines {
    match line {
      TemplateLine::Passthrough(raw) => lines.push(raw.to_string()),
      TemplateLine::Assign(default) => {
        let key = &default.key;
        let rendered = match user.get(key) {
          Some(user_var) => {
            #[cfg(feature = "tracing")]
            trace!("Using user state for {}", key);
            render_with_state(key, user_var)
          }
          None => {
            #[cfg(feature = "tracing")]
            trace!("Keeping template default for {}", key);
            render_with_state(key, default)
          }
        };
        lines.push(rendered);
      }
    }
  }

  let trailer: Vec<String> = retained
    .iter()
    .filter(|key| !template.contains(key))
    .filter_map(|key| user.get(key).map(|var| render_with_state(key, var)))
    .collect();

  if !trailer.is_empty() {
    #[cfg(feature = "tracing")]
    debug!("Appending {} user-defined keys", trailer.len());

    lines.push(String::new());
    lines.push(TRAILER_MARKER.to_string());
    lines.extend(trailer);
  }

  Rendered { lines }
}
