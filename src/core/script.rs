use crate::domain::error::AtCommanderError;
use std::time::Duration;
use thiserror::Error;

/// One step of a replayable command script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Send this text verbatim, paced character by character
    SendCommand(String),
    /// Hold playback for this many whole seconds
    Wait(u64),
}

/// A parsed, immutable command script
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    /// Display name from the `[NAME]` marker
    pub name: String,
    /// Description from the `[DESC]` marker, empty when absent
    pub description: String,
    /// Inter-character pacing override from the `[DELAY]` marker
    pub pacing: Option<Duration>,
    /// Ordered playback steps
    pub directives: Vec<Directive>,
}

/// Script source rejection
#[derive(Error, Debug)]
pub enum ScriptParseError {
    #[error("Script has no [NAME] marker")]
    MissingName,

    #[error("Script has no [START] marker")]
    MissingStart,

    #[error("Missing [END] after [START]")]
    Unterminated,

    #[error("Line {line}: malformed wait directive: {text}")]
    MalformedWait { line: usize, text: String },

    #[error("Line {line}: malformed delay marker: {text}")]
    MalformedDelay { line: usize, text: String },
}

impl From<ScriptParseError> for AtCommanderError {
    fn from(err: ScriptParseError) -> Self {
        AtCommanderError::Script {
            message: err.to_string(),
        }
    }
}

impl Script {
    /// Parse a script source.
    ///
    /// Markers `[NAME]`, `[DESC]`, and `[DELAY]` precede `[START]`; lines
    /// between `[START]` and `[END]` are `[WAIT] <seconds>` directives or
    /// verbatim send lines. `//` comments and blank lines are skipped
    /// everywhere; anything after `[END]` is ignored.
    pub fn parse(source: &str) -> Result<Script, ScriptParseError> {
        let mut name: Option<String> = None;
        let mut description = String::new();
        let mut pacing = None;
        let mut directives = Vec::new();
        let mut in_body = false;
        let mut terminated = false;

        for (index, raw) in source.lines().enumerate() {
            let line = raw.trim();
            let line_no = index + 1;

            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            if !in_body {
                if let Some(rest) = line.strip_prefix("[NAME]") {
                    name = Some(unquote(rest.trim()));
                } else if let Some(rest) = line.strip_prefix("[DESC]") {
                    description = unquote(rest.trim());
                } else if let Some(rest) = line.strip_prefix("[DELAY]") {
                    let text = rest.trim();
                    let seconds: f64 = text.parse().map_err(|_| ScriptParseError::MalformedDelay {
                        line: line_no,
                        text: text.to_string(),
                    })?;
                    // Rejects negative, non-finite, and beyond-Duration values
                    let delay = Duration::try_from_secs_f64(seconds).map_err(|_| {
                        ScriptParseError::MalformedDelay {
                            line: line_no,
                            text: text.to_string(),
                        }
                    })?;
                    pacing = Some(delay);
                } else if line == "[START]" {
                    in_body = true;
                }
                // Unknown header lines are skipped
                continue;
            }

            if line == "[END]" {
                terminated = true;
                break;
            }

            // The marker claims the line wherever it appears
            if let Some((_, rest)) = line.split_once("[WAIT]") {
                let text = rest.trim();
                let seconds: u64 = text.parse().map_err(|_| ScriptParseError::MalformedWait {
                    line: line_no,
                    text: text.to_string(),
                })?;
                directives.push(Directive::Wait(seconds));
            } else {
                directives.push(Directive::SendCommand(line.to_string()));
            }
        }

        if !in_body {
            return Err(ScriptParseError::MissingStart);
        }
        if !terminated {
            return Err(ScriptParseError::Unterminated);
        }
        let name = name.ok_or(ScriptParseError::MissingName)?;

        Ok(Script {
            name,
            description,
            pacing,
            directives,
        })
    }

    /// Number of send directives, for listings.
    pub fn send_count(&self) -> usize {
        self.directives
            .iter()
            .filter(|d| matches!(d, Directive::SendCommand(_)))
            .count()
    }
}

fn unquote(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

/// Set of loaded scripts, looked up by declared name
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    scripts: Vec<Script>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script, replacing any script with the same name.
    pub fn insert(&mut self, script: Script) {
        self.scripts.retain(|existing| existing.name != script.name);
        self.scripts.push(script);
    }

    pub fn find(&self, name: &str) -> Option<&Script> {
        self.scripts.iter().find(|script| script.name == name)
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
