use std::{borrow::Cow, collections::BTreeMap, convert::TryFrom};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

const COMMENT_PREFIX: char = '#';
const ASSIGNMENT_OPERATOR: char = '=';
const EXPORT_KEYWORD: &str = "export";

/// A `KEY=VALUE` line, either active or disabled behind a single `#`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignLine<'a> {
  pub key: Cow<'a, str>,
  /// Everything after the first `=`, untouched.
  pub value: Cow<'a, str>,
  pub commented: bool,
  pub exported: bool,
  pub raw: Cow<'a, str>,
}

impl<'a> AssignLine<'a> {
  /// Recognizes `[#][export ]KEY=VALUE` with optional whitespace around the
  /// comment marker. Returns `None` for anything else.
  pub fn parse(line: &'a str) -> Option<Self> {
    let body = line.trim_start();

    let (commented, body) = match body.strip_prefix(COMMENT_PREFIX) {
      Some(rest) => (true, rest.trim_start()),
      None => (false, body),
    };

    let (exported, body) = strip_export(body);

    let (key, value) = body.split_once(ASSIGNMENT_OPERATOR)?;
    if !is_valid_key(key) {
      return None;
    }

    #[cfg(feature = "tracing")]
    trace!(key, commented, exported, "Parsed assignment");

    Some(AssignLine {
      key: Cow::Borrowed(key),
      value: Cow::Borrowed(value),
      commented,
      exported,
      raw: Cow::Borrowed(line),
    })
  }
}

fn strip_export(s: &str) -> (bool, &str) {
  if let Some(rest) = s.strip_prefix(EXPORT_KEYWORD)
    && rest.starts_with(char::is_whitespace)
  {
    (true, rest.trim_start())
  } else {
    (false, s)
  }
}

fn is_valid_key(key: &str) -> bool {
  let mut chars = key.chars();
  match chars.next() {
    Some(first) if first.is_ascii_alphabetic() || first == '_' => {
      chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
    _ => false,
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateLine<'a> {
  /// Comments, blank lines, section headers: copied as-is.
  Passthrough(Cow<'a, str>),
  Assign(AssignLine<'a>),
}

impl<'a> From<&'a str> for TemplateLine<'a> {
  fn from(line: &'a str) -> Self {
    match AssignLine::parse(line) {
      Some(assign) => TemplateLine::Assign(assign),
      None => TemplateLine::Passthrough(Cow::Borrowed(line)),
    }
  }
}

/// The template's full line sequence plus the keys it declares, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Template<'a> {
  pub lines: Vec<TemplateLine<'a>>,
  pub keys: Vec<Cow<'a, str>>,
}

impl<'a> TryFrom<&'a str> for Template<'a> {
  type Error = TemplateError;

  fn try_from(s: &'a str) -> Result<Self, Self::Error> {
    if s.is_empty() {
      return Err(TemplateError::Empty);
    }

    #[cfg(feature = "tracing")]
    debug!("Parsing template with {} lines", s.lines().count());

    let mut lines = Vec::new();
    let mut keys = Vec::new();

    for line in s.lines() {
      let line = TemplateLine::from(line);
      if let TemplateLine::Assign(ref assign) = line {
        keys.push(assign.key.clone());
      }
      lines.push(line);
    }

    #[cfg(feature = "tracing")]
    debug!("Template declares {} keys", keys.len());

    Ok(Self { lines, keys })
  }
}

impl<'a> Template<'a> {
  pub fn contains(&self, key: &str) -> bool {
    self.keys.iter().any(|k| k == key)
  }
}

/// Index of the user's assignments. A later declaration of the same key
/// replaces the earlier one, as when the file is sourced by a shell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserConfig<'a> {
  pub entries: BTreeMap<Cow<'a, str>, AssignLine<'a>>,
}

impl<'a> From<&'a str> for UserConfig<'a> {
  fn from(s: &'a str) -> Self {
    let mut entries = BTreeMap::new();

    for assign in s.lines().filter_map(AssignLine::parse) {
      #[cfg(feature = "tracing")]
      if entries.contains_key(&assign.key) {
        trace!("Key {} redeclared, later value wins", assign.key);
      }

      entries.insert(assign.key.clone(), assign);
    }

    #[cfg(feature = "tracing")]
    debug!("Indexed {} user keys", entries.len());

    Self { entries }
  }
}

impl<'a> UserConfig<'a> {
  pub fn get(&self, key: &str) -> Option<&AssignLine<'a>> {
    self.entries.get(key)
  }

  /// Keys the user declares that the template does not, sorted ascending.
  pub fn unknown_keys(&self, template: &Template) -> Vec<String> {
    self
      .entries
      .keys()
      .filter(|key| !template.contains(key))
      .map(|key| key.to_string())
      .collect()
  }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
  #[error("template is empty")]
  Empty,
}
