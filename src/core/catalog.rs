use crate::domain::config::CatalogEntry;

/// A single AT directive from the command catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Literal text written to the modem, terminator excluded
    pub text: String,
    /// Response lines containing this substring are suppressed
    pub ignore: Option<String>,
    /// Expect exactly one payload line before the terminal OK
    pub single_line: bool,
    /// Operator-facing description
    pub hint: Option<String>,
}

impl Command {
    /// Create a plain multi-line command.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ignore: None,
            single_line: false,
            hint: None,
        }
    }

    pub fn with_ignore(mut self, ignore: impl Into<String>) -> Self {
        self.ignore = Some(ignore.into());
        self
    }

    pub fn with_single_line(mut self, single_line: bool) -> Self {
        self.single_line = single_line;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<&CatalogEntry> for Command {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            text: entry.command.clone(),
            ignore: entry.ignore.clone(),
            single_line: entry.response_line_count == 1,
            hint: if entry.description.is_empty() {
                None
            } else {
                Some(entry.description.clone())
            },
        }
    }
}

/// Immutable set of known AT commands
#[derive(Debug, Clone, Default)]
pub struct CommandCatalog {
    commands: Vec<Command>,
}

impl CommandCatalog {
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        Self {
            commands: entries.iter().map(Command::from).collect(),
        }
    }

    /// The nRF91 bench set used when no catalog file is present.
    pub fn default_set() -> Self {
        let single = [
            ("AT+CNUM", "subscriber number"),
            ("AT+CGMI", "manufacturer identification"),
            ("AT+CGMM", "model identification"),
            ("AT+CGMR", "revision identification"),
            ("AT+CGSN", "serial number (IMEI)"),
            ("AT%SHORTSWVER", "short software version"),
            ("AT%HWVERSION", "hardware version"),
            ("AT%XMODEMUUID", "modem build UUID"),
            ("AT%2DID", "second device ID"),
        ];
        let multi = [
            ("AT+ODIS", "ODIS fields"),
            ("AT+ODISNTF", "ODIS notification setting"),
        ];
        let mut commands: Vec<Command> = single
            .iter()
            .map(|(text, hint)| Command::new(*text).with_single_line(true).with_hint(*hint))
            .collect();
        commands.extend(
            multi
                .iter()
                .map(|(text, hint)| Command::new(*text).with_hint(*hint)),
        );
        Self { commands }
    }

    /// Exact-text lookup.
    pub fn find(&self, text: &str) -> Option<&Command> {
        self.commands.iter().find(|command| command.text == text)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Catalog entry for the given text, or an ad-hoc multi-line command.
    pub fn resolve(&self, text: &str) -> Command {
        self.find(text)
            .cloned()
            .unwrap_or_else(|| Command::new(text))
    }
}
