use crate::error::ValidationError;
use std::fmt;
use std::path::Path;

/// Values the form layer emits for a field the user never filled in.
const PLACEHOLDERS: &[&str] = &["None", "null", "undefined"];

/// Keys the supervisor appends itself so the tool writes where the archiver looks.
pub(crate) const RESERVED_KEYS: &[&str] = &["project", "name"];

/// An argument string for the detection tool, e.g. `model=yolov10n.pt source=video.mp4 conf=0.25`.
///
/// The string is opaque to the supervisor. It is only checked for being non-empty and for
/// `key=value` tokens whose value was never resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunParameters(String);

impl RunParameters {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::EmptyParameters);
        }
        for token in raw.split_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            if RESERVED_KEYS.contains(&key) {
                return Err(ValidationError::ReservedParameter(key.to_string()));
            }
            if is_placeholder(value) {
                return Err(ValidationError::UnresolvedParameter {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_placeholder(value: &str) -> bool {
    let value = value.trim_matches(|c| c == '"' || c == '\'');
    value.is_empty()
        || PLACEHOLDERS.contains(&value)
        || (value.starts_with('{') && value.ends_with('}'))
}

/// Name of a run, and of the directory the tool writes its results into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunName(String);

impl RunName {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyRunName);
        }
        if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
            return Err(ValidationError::InvalidRunName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for RunName {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for RunName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
