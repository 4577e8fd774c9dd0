//! Entry point for backend output.

use crate::mi::correlator::Correlator;
use crate::mi::parser::Parser;
use crate::mi::record::{Record, Sigil};
use crate::{mi_info, mi_warn};
use std::sync::Arc;

pub const DEFAULT_PROMPT: &str = "(gdb)";

/// Extension points of a session.
///
/// Default implementations route result and async records to the correlator and
/// feed console and log streams into its capture buffers.
pub trait SessionHooks {
    fn result(&mut self, correlator: &Correlator, record: Record) {
        correlator.dispatch(record)
    }

    fn status_async_output(&mut self, correlator: &Correlator, record: Record) {
        correlator.dispatch(record)
    }

    fn exec_async_output(&mut self, correlator: &Correlator, record: Record) {
        correlator.dispatch(record)
    }

    fn notify_async_output(&mut self, correlator: &Correlator, record: Record) {
        correlator.dispatch(record)
    }

    fn console_stream_output(&mut self, correlator: &Correlator, record: Record) {
        correlator.log_console(record.stream())
    }

    fn target_stream_output(&mut self, _correlator: &Correlator, _record: Record) {}

    fn log_stream_output(&mut self, correlator: &Correlator, record: Record) {
        correlator.log_stream(record.stream())
    }

    /// Backend is ready for the next command.
    fn prompt(&mut self, _correlator: &Correlator) {}

    /// First prompt seen.
    fn connection_established(&mut self, _correlator: &Correlator) {}

    fn error_bad_line(&mut self, _correlator: &Correlator, line: &str) {
        mi_warn!("bad line from backend: {line}");
    }
}

/// Hooks with default behaviour only.
pub struct DefaultHooks;

impl SessionHooks for DefaultHooks {}

/// Protocol session: classifies backend lines and routes them to hooks.
///
/// Lines must be fed from a single thread, commands may be sent from any
/// thread through [`Session::correlator`].
pub struct Session<H: SessionHooks> {
    correlator: Arc<Correlator>,
    parser: Parser,
    hooks: H,
    prompt: String,
    connected: bool,
    trace: bool,
}

impl<H: SessionHooks> Session<H> {
    pub fn new(correlator: Arc<Correlator>, parser: Parser, hooks: H) -> Self {
        Self {
            correlator,
            parser,
            hooks,
            prompt: DEFAULT_PROMPT.to_string(),
            connected: false,
            trace: true,
        }
    }

    /// Use a custom prompt string, surrounding whitespace is ignored.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into().trim().to_string();
        self
    }

    /// Write incoming lines into the correlator traffic log (enabled by default).
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Handle a single line of backend output (without line end).
    pub fn process_line(&mut self, line: &str) {
        if self.trace {
            if let Some(traffic) = self.correlator.traffic_log() {
                traffic.log_message(&format!("<- {line}"));
            }
        }

        if line.trim() == self.prompt {
            if !self.connected {
                self.connected = true;
                mi_info!("connection established");
                self.hooks.connection_established(&self.correlator);
            }
            self.hooks.prompt(&self.correlator);
            return;
        }

        let Some(sigil) = leading_sigil(line) else {
            self.hooks.error_bad_line(&self.correlator, line);
            return;
        };

        let record = self.parser.parse(line);
        if sigil.is_stream() && record.is_error() {
            self.correlator.echo(&format!("{}\n", record.error()));
            self.hooks.error_bad_line(&self.correlator, line);
            return;
        }

        let correlator = self.correlator.as_ref();
        match sigil {
            Sigil::Result => self.hooks.result(correlator, record),
            Sigil::StatusAsync => self.hooks.status_async_output(correlator, record),
            Sigil::ExecAsync => self.hooks.exec_async_output(correlator, record),
            Sigil::NotifyAsync => self.hooks.notify_async_output(correlator, record),
            Sigil::ConsoleStream => self.hooks.console_stream_output(correlator, record),
            Sigil::TargetStream => self.hooks.target_stream_output(correlator, record),
            Sigil::LogStream => self.hooks.log_stream_output(correlator, record),
            Sigil::Malformed => self.hooks.error_bad_line(correlator, line),
        }
    }
}

/// Sigil after an optional numeric token.
fn leading_sigil(line: &str) -> Option<Sigil> {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.chars().next().and_then(Sigil::from_char)
}
