//! Decides which user-only keys survive a sync.
//!
//! Unknown keys are never dropped without an explicit answer. Unattended runs,
//! blank answers and end of input all keep them.

use std::{
  collections::BTreeSet,
  io::{self, BufRead, Write},
};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::parse::UserConfig;

const REDACTED: &str = "<redacted>";
const ELLIPSIS: &str = "<...>";
const MASK_THRESHOLD: usize = 24;
const MASK_KEEP: usize = 3;

/// Hides values that look like secrets before they are shown on a terminal.
pub fn mask_value(value: &str) -> String {
  let value = value.trim();
  if value.is_empty() {
    return String::new();
  }

  if value.contains("http://")
    || value.contains("https://")
    || value.to_lowercase().contains("webhook")
  {
    return REDACTED.to_string();
  }

  let len = value.chars().count();
  if len > MASK_THRESHOLD {
    let head: String = value.chars().take(MASK_KEEP).collect();
    let tail: String = value.chars().skip(len - MASK_KEEP).collect();
    return format!("{head}{ELLIPSIS}{tail}");
  }

  value.to_string()
}

/// Line-based question/answer loop over arbitrary streams.
pub struct Prompter<R, W> {
  input: R,
  output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
  pub fn new(input: R, output: W) -> Self {
    Self { input, output }
  }

  pub fn output(&mut self) -> &mut W {
    &mut self.output
  }

  /// Asks `question` until the answer matches one of `options`.
  ///
  /// A blank line or end of input selects `options[default]`. Unrecognized
  /// answers are reported and the question is asked again.
  pub fn choose<T: Copy>(
    &mut self,
    question: &str,
    options: &[(&str, T)],
    default: usize,
  ) -> io::Result<T> {
    let hint = options
      .iter()
      .enumerate()
      .map(|(i, (answer, _))| {
        if i == default {
          answer.to_uppercase()
        } else {
          answer.to_string()
        }
      })
      .collect::<Vec<_>>()
      .join("/");

    loop {
      write!(self.output, "{question} [{hint}]: ")?;
      self.output.flush()?;

      let mut line = String::new();
      if self.input.read_line(&mut line)? == 0 {
        #[cfg(feature = "tracing")]
        trace!("End of input, taking default");
        return Ok(options[default].1);
      }

      let answer = line.trim().to_lowercase();
      if answer.is_empty() {
        return Ok(options[default].1);
      }

      if let Some((_, value)) = options.iter().find(|(option, _)| *option == answer) {
        return Ok(*value);
      }

      writeln!(self.output, "Invalid choice: {answer}")?;
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkChoice {
  KeepAll,
  DeleteAll,
  Individually,
}

const BULK_OPTIONS: &[(&str, BulkChoice)] = &[
  ("k", BulkChoice::KeepAll),
  ("d", BulkChoice::DeleteAll),
  ("i", BulkChoice::Individually),
];

const KEY_OPTIONS: &[(&str, bool)] = &[("y", true), ("n", false)];

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
  Start,
  BulkPrompt,
  PerKey(usize),
  Done(BTreeSet<String>),
}

/// Retention policy for keys the template does not know about.
pub struct Reconciler<R, W> {
  prompter: Prompter<R, W>,
  interactive: bool,
}

impl<R: BufRead, W: Write> Reconciler<R, W> {
  pub fn new(prompter: Prompter<R, W>, interactive: bool) -> Self {
    Self {
      prompter,
      interactive,
    }
  }

  /// Returns the subset of `unknown` to keep.
  pub fn decide(&mut self, unknown: &[String], user: &UserConfig) -> io::Result<BTreeSet<String>> {
    let all = || unknown.iter().cloned().collect::<BTreeSet<_>>();
    let mut kept = BTreeSet::new();
    let mut state = State::Start;

    loop {
      #[cfg(feature = "tracing")]
      trace!(?state, "Reconcile step");

      state = match state {
        State::Start if unknown.is_empty() => State::Done(BTreeSet::new()),
        State::Start if !self.interactive => {
          #[cfg(feature = "tracing")]
          debug!("Non-interactive, keeping {} unknown keys", unknown.len());
          State::Done(all())
        }
        State::Start => {
          self.list_unknown(unknown, user)?;
          State::BulkPrompt
        }
        State::BulkPrompt => {
          let choice = self.prompter.choose(
            "Delete unknown keys not present in the template?",
            BULK_OPTIONS,
            0,
          )?;
          match choice {
            BulkChoice::KeepAll => State::Done(all()),
            BulkChoice::DeleteAll => State::Done(BTreeSet::new()),
            BulkChoice::Individually => State::PerKey(0),
          }
        }
        State::PerKey(index) => match unknown.get(index) {
          Some(key) => {
            if self.prompter.choose(&format!("Keep {key}?"), KEY_OPTIONS, 0)? {
              kept.insert(key.clone());
            }
            State::PerKey(index + 1)
          }
          None => State::Done(std::mem::take(&mut kept)),
        },
        State::Done(retained) => return Ok(retained),
      };
    }
  }

  fn list_unknown(&mut self, unknown: &[String], user: &UserConfig) -> io::Result<()> {
    let out = self.prompter.output();
    writeln!(out, "Found keys in your config that are not in the template:")?;
    for key in unknown {
      let value = user.get(key).map(|var| mask_value(&var.value)).unwrap_or_default();
      writeln!(out, "  - {key}={value}")?;
    }
    Ok(())
  }
}
