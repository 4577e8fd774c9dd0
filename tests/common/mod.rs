use mitap::mi::{Command, Correlator, Outcome, Record, SessionHooks, Transport};
use std::sync::{Arc, Mutex};

/// Transport that keeps everything written to it.
#[derive(Clone, Default)]
pub struct TestWire {
    pub lines: Arc<Mutex<Vec<String>>>,
    pub console: Arc<Mutex<Vec<String>>>,
}

impl Transport for TestWire {
    fn inject(&mut self, line: &str) -> std::io::Result<()> {
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn log(&mut self, text: &str) {
        self.console.lock().unwrap().push(text.to_string());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub token: u32,
    pub outcome: Outcome,
    pub record: String,
    pub console: String,
    pub log: String,
}

#[derive(Clone, Default)]
pub struct Replies(pub Arc<Mutex<Vec<Reply>>>);

impl Replies {
    pub fn command(&self, text: &str) -> Command {
        let replies = self.0.clone();
        Command::with_fn(text, move |outcome, record| {
            let cmd = record.command().unwrap();
            replies.lock().unwrap().push(Reply {
                token: cmd.token,
                outcome,
                record: record.to_string(),
                console: cmd.console_stream.clone(),
                log: cmd.log_stream.clone(),
            });
        })
    }

    pub fn take(&self) -> Vec<Reply> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Hooks that remember what was called and then behave as the default hooks.
#[derive(Default)]
pub struct TestHooks {
    pub events: Vec<String>,
}

impl SessionHooks for TestHooks {
    fn result(&mut self, correlator: &Correlator, record: Record) {
        self.events.push(format!("result {record}"));
        correlator.dispatch(record)
    }

    fn status_async_output(&mut self, correlator: &Correlator, record: Record) {
        self.events.push(format!("status {record}"));
        correlator.dispatch(record)
    }

    fn exec_async_output(&mut self, correlator: &Correlator, record: Record) {
        self.events.push(format!("exec {record}"));
        correlator.dispatch(record)
    }

    fn notify_async_output(&mut self, correlator: &Correlator, record: Record) {
        self.events.push(format!("notify {record}"));
        correlator.dispatch(record)
    }

    fn console_stream_output(&mut self, correlator: &Correlator, record: Record) {
        self.events.push(format!("console {}", record.stream()));
        correlator.log_console(record.stream())
    }

    fn target_stream_output(&mut self, _: &Correlator, record: Record) {
        self.events.push(format!("target {}", record.stream()));
    }

    fn log_stream_output(&mut self, correlator: &Correlator, record: Record) {
        self.events.push(format!("log {}", record.stream()));
        correlator.log_stream(record.stream())
    }

    fn prompt(&mut self, _: &Correlator) {
        self.events.push("prompt".to_string());
    }

    fn connection_established(&mut self, _: &Correlator) {
        self.events.push("connected".to_string());
    }

    fn error_bad_line(&mut self, _: &Correlator, line: &str) {
        self.events.push(format!("bad {line}"));
    }
}
