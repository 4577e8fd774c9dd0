use crate::mi::value::TList;
use std::fmt::{Display, Formatter};

/// Record category, the first character after an optional token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sigil {
    /// `^`, reply to a command.
    Result,
    /// `+`, on-going status of a slow operation.
    StatusAsync,
    /// `*`, change of target execution state.
    ExecAsync,
    /// `=`, supplementary notification.
    NotifyAsync,
    /// `~`, CLI console output.
    ConsoleStream,
    /// `@`, output of the running target.
    TargetStream,
    /// `&`, debugger internal log.
    LogStream,
    /// `?`, line has no sigil: it is empty or was rejected before one was read.
    Malformed,
}

impl Sigil {
    pub fn from_char(c: char) -> Option<Self> {
        let sigil = match c {
            '^' => Sigil::Result,
            '+' => Sigil::StatusAsync,
            '*' => Sigil::ExecAsync,
            '=' => Sigil::NotifyAsync,
            '~' => Sigil::ConsoleStream,
            '@' => Sigil::TargetStream,
            '&' => Sigil::LogStream,
            _ => return None,
        };
        Some(sigil)
    }

    pub fn as_char(self) -> char {
        match self {
            Sigil::Result => '^',
            Sigil::StatusAsync => '+',
            Sigil::ExecAsync => '*',
            Sigil::NotifyAsync => '=',
            Sigil::ConsoleStream => '~',
            Sigil::TargetStream => '@',
            Sigil::LogStream => '&',
            Sigil::Malformed => '?',
        }
    }

    pub fn is_stream(self) -> bool {
        matches!(
            self,
            Sigil::ConsoleStream | Sigil::TargetStream | Sigil::LogStream
        )
    }
}

/// Class of result and async records.
#[derive(Debug, Clone, PartialEq, Eq, Default, strum_macros::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum RecordClass {
    Done,
    Running,
    Connected,
    Error,
    Exit,
    Stopped,
    #[strum(default)]
    Other(String),
    /// Stream and malformed records have no class.
    #[default]
    #[strum(disabled)]
    None,
}

impl RecordClass {
    pub fn parse(name: &str) -> Self {
        name.parse()
            .unwrap_or_else(|_| RecordClass::Other(name.to_string()))
    }

    pub fn name(&self) -> &str {
        match self {
            RecordClass::Done => "done",
            RecordClass::Running => "running",
            RecordClass::Connected => "connected",
            RecordClass::Error => "error",
            RecordClass::Exit => "exit",
            RecordClass::Stopped => "stopped",
            RecordClass::Other(name) => name,
            RecordClass::None => "",
        }
    }
}

/// Snapshot of the command a record answered, attached during dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCommand {
    pub token: u32,
    /// Caller defined routing token, see [`crate::mi::Command::with_routing_token`].
    pub routing_token: u32,
    pub text: String,
    pub console_stream: String,
    pub log_stream: String,
}

/// One parsed MI output line.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub(crate) token: u32,
    pub(crate) sigil: Sigil,
    pub(crate) stream: String,
    pub(crate) class: RecordClass,
    pub(crate) results: TList,
    pub(crate) error: Option<String>,
    pub(crate) command: Option<IssuedCommand>,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            token: 0,
            sigil: Sigil::Malformed,
            stream: String::new(),
            class: RecordClass::None,
            results: TList::top_level(),
            error: None,
            command: None,
        }
    }
}

impl Record {
    pub(crate) fn failed(token: u32, sigil: Sigil, message: String) -> Self {
        Self {
            token,
            sigil,
            error: Some(message),
            ..Default::default()
        }
    }

    /// Correlation token, 0 if the line has none.
    pub fn token(&self) -> u32 {
        self.token
    }

    pub fn sigil(&self) -> Sigil {
        self.sigil
    }

    pub fn is_stream(&self) -> bool {
        self.sigil.is_stream()
    }

    /// Decoded text of a stream record.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn class(&self) -> &RecordClass {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn results(&self) -> &TList {
        &self.results
    }

    /// Return true if the record has no results.
    ///
    /// GDB answers some failed commands with a bare `^done`, so an empty
    /// reply often means the real message went to the log stream.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Return true if the line could not be parsed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Parse error message, empty if the line was parsed.
    pub fn error(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }

    /// Command this record answered, set by the correlator.
    pub fn command(&self) -> Option<&IssuedCommand> {
        self.command.as_ref()
    }

    /// Best available human readable failure description.
    pub fn error_message(&self) -> String {
        if let Some(err) = &self.error {
            return err.clone();
        }
        if !self.is_empty() {
            return self.results.get_const_value("msg").to_string();
        }
        match &self.command {
            Some(cmd) if !cmd.log_stream.is_empty() => cmd.log_stream.clone(),
            _ => "unknown failure".to_string(),
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(err) = &self.error {
            return write!(f, "<malformed: {err}>");
        }
        if self.token != 0 {
            write!(f, "{}", self.token)?;
        }
        // line without a record
        if self.sigil == Sigil::Malformed {
            return Ok(());
        }
        write!(f, "{}", self.sigil.as_char())?;
        if self.is_stream() {
            return write!(f, "\"{}\"", crate::mi::decode::escape(&self.stream));
        }
        f.write_str(self.class.name())?;
        if !self.results.is_empty() {
            write!(f, ",{}", self.results)?;
        }
        Ok(())
    }
}
