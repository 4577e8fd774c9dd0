//! Command/token correlation.
//!
//! Every outgoing command gets a token and waits in the pending queue until
//! a result record with the same token arrives. GDB answers commands in order,
//! so the queue head always holds the smallest pending token; a record with
//! a bigger token means that earlier commands will never be answered.
//!
//! [`Correlator::send`] may be called from any thread, [`Correlator::dispatch`]
//! must be called from a single thread processing backend output in order.

use crate::mi::command::{deliver, Command, CommandHandler, Ignore, Menu, Outcome};
use crate::mi::error::Error;
use crate::mi::record::{IssuedCommand, Record, RecordClass, Sigil};
use crate::mi::transport::{TrafficLog, Transport};
use crate::{mi_debug, mi_warn};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// First token in use, 0 means "no token".
pub const FIRST_TOKEN: u32 = 2;
/// Last token issued before wrapping back to [`FIRST_TOKEN`].
pub const LAST_TOKEN: u32 = (i32::MAX - 1000) as u32;
/// GDB may reject a command with this message without the command ever
/// reaching the queue head.
pub const TARGET_RUNNING_MARKER: &str = "while the target is running.";

/// Why a pending command left the queue without a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DropReason {
    #[strum(serialize = "rejected while target is running")]
    TargetRunning,
    #[strum(serialize = "no answer")]
    Unanswered,
    #[strum(serialize = "removed")]
    Removed,
}

pub type IdleHandler = Box<dyn FnOnce() + Send>;
pub type DropObserver = Box<dyn Fn(DropReason, &IssuedCommand) + Send + Sync>;

/// Command taken out of the queue by [`Correlator::remove`].
pub struct Abandoned {
    pub token: u32,
    pub routing_token: u32,
    pub text: String,
    pub handler: Box<dyn CommandHandler>,
}

struct Pending {
    token: u32,
    routing_token: u32,
    text: String,
    handler: Box<dyn CommandHandler>,
}

impl Pending {
    fn issued(&self, console_stream: String, log_stream: String) -> IssuedCommand {
        IssuedCommand {
            token: self.token,
            routing_token: self.routing_token,
            text: self.text.clone(),
            console_stream,
            log_stream,
        }
    }
}

struct State {
    next_token: u32,
    pending: VecDeque<Pending>,
    transport: Box<dyn Transport>,
    console: Vec<String>,
    log: Vec<String>,
    idle: Option<IdleHandler>,
}

impl State {
    fn take_token(&mut self) -> u32 {
        let token = self.next_token;
        self.next_token = if token >= LAST_TOKEN {
            FIRST_TOKEN
        } else {
            token + 1
        };
        token
    }

    fn clear_streams(&mut self) {
        self.console.clear();
        self.log.clear();
    }
}

pub struct Correlator {
    state: Mutex<State>,
    traffic: Option<Arc<dyn TrafficLog>>,
    drop_observer: Option<DropObserver>,
}

fn is_target_running_error(record: &Record) -> bool {
    record.class() == &RecordClass::Error
        && !record.is_empty()
        && record
            .results()
            .get_const_value("msg")
            .trim_end()
            .ends_with(TARGET_RUNNING_MARKER)
}

fn outcome(record: &Record) -> Outcome {
    match (record.sigil(), record.class()) {
        (Sigil::Result, RecordClass::Done) => Outcome::Done,
        (Sigil::Result, RecordClass::Running) => Outcome::Running,
        (Sigil::Result, RecordClass::Error) => Outcome::Error,
        (Sigil::Result, RecordClass::Exit) => Outcome::Exit,
        (Sigil::ExecAsync, RecordClass::Stopped) => Outcome::Stopped,
        _ => Outcome::Other,
    }
}

/// Result of the locked part of dispatch.
enum Matched {
    Command(Pending, IssuedCommand),
    Nothing,
}

impl Correlator {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            state: Mutex::new(State {
                next_token: FIRST_TOKEN,
                pending: VecDeque::new(),
                transport: Box::new(transport),
                console: vec![],
                log: vec![],
                idle: None,
            }),
            traffic: None,
            drop_observer: None,
        }
    }

    /// Record every outgoing line into a traffic log.
    pub fn with_traffic_log(mut self, traffic: Arc<dyn TrafficLog>) -> Self {
        self.traffic = Some(traffic);
        self
    }

    /// Observe commands dropped without a callback.
    pub fn with_drop_observer(
        mut self,
        observer: impl Fn(DropReason, &IssuedCommand) + Send + Sync + 'static,
    ) -> Self {
        self.drop_observer = Some(Box::new(observer));
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn traffic_log(&self) -> Option<&Arc<dyn TrafficLog>> {
        self.traffic.as_ref()
    }

    pub fn traffic_log_file(&self) -> Option<&Path> {
        self.traffic.as_ref().and_then(|t| t.file_name())
    }

    /// Assign a token, enqueue the command and write it to the backend.
    ///
    /// Return the assigned token. If the transport fails the command is not
    /// left in the queue.
    pub fn send(&self, command: Command) -> Result<u32, Error> {
        let (text, routing_token, handler) = command.into_parts();
        let mut state = self.lock();

        let token = state.take_token();
        let line = format!("{token}{text}\n");
        state.pending.push_back(Pending {
            token,
            routing_token,
            text,
            handler,
        });

        if let Some(traffic) = &self.traffic {
            traffic.log_message(&format!("-> {line}"));
        }
        if let Err(e) = state.transport.inject(&line) {
            state.pending.pop_back();
            return Err(e.into());
        }
        mi_debug!("sent {}", line.trim_end());
        Ok(token)
    }

    /// Buffer `&` stream text for the next answered command.
    pub fn log_stream(&self, text: &str) {
        self.lock().log.push(text.to_string());
    }

    /// Buffer `~` stream text for the next answered command.
    ///
    /// A menu prompt after numbered choices is passed to the oldest pending
    /// command and removed from the buffer, see [`CommandHandler::on_user_interaction`].
    pub fn log_console(&self, text: &str) {
        let (token, mut handler, menu) = {
            let mut state = self.lock();
            state.console.push(text.to_string());
            if text.lines().last().map(str::trim_end) != Some(Menu::PROMPT) {
                return;
            }
            let Some(menu) = Menu::parse(&state.console.concat()) else {
                return;
            };
            // menu text is answered here, not captured by the command
            state.console.clear();
            let Some(head) = state.pending.front_mut() else {
                mi_warn!("menu without a pending command: {:?}", menu.items());
                return;
            };
            let handler: Box<dyn CommandHandler> = Box::new(Ignore);
            (head.token, std::mem::replace(&mut head.handler, handler), menu)
        };

        let answer = handler.on_user_interaction(&menu);

        let mut state = self.lock();
        // command may be removed while its handler was out
        if let Some(pending) = state.pending.iter_mut().find(|p| p.token == token) {
            pending.handler = handler;
        }
        if let Some(answer) = answer {
            let line = format!("{answer}\n");
            if let Some(traffic) = &self.traffic {
                traffic.log_message(&format!("-> {line}"));
            }
            if let Err(e) = state.transport.inject(&line) {
                mi_warn!("failed to answer menu of command {token}: {e}");
            }
        }
    }

    /// Print diagnostic text to the debugger console.
    pub fn echo(&self, text: &str) {
        self.lock().transport.log(text);
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Tokens of pending commands, oldest first.
    pub fn pending_tokens(&self) -> Vec<u32> {
        self.lock().pending.iter().map(|p| p.token).collect()
    }

    pub fn is_idle(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Run `handler` once, when the pending queue becomes empty.
    ///
    /// A handler registered earlier and not yet fired is replaced.
    pub fn set_idle_handler(&self, handler: impl FnOnce() + Send + 'static) -> Result<(), Error> {
        let mut state = self.lock();
        if state.pending.is_empty() {
            return Err(Error::IdleWithoutPending);
        }
        state.idle = Some(Box::new(handler));
        Ok(())
    }

    /// Take a pending command out of the queue without calling its handler.
    pub fn remove(&self, token: u32) -> Result<Abandoned, Error> {
        let pending = {
            let mut state = self.lock();
            let pos = state
                .pending
                .iter()
                .position(|p| p.token == token)
                .ok_or(Error::NotPending(token))?;
            state.pending.remove(pos).ok_or(Error::NotPending(token))?
        };

        self.notify_dropped(DropReason::Removed, &pending.issued(String::new(), String::new()));
        self.run_idle_if_empty();
        Ok(Abandoned {
            token: pending.token,
            routing_token: pending.routing_token,
            text: pending.text,
            handler: pending.handler,
        })
    }

    /// Match a result or async record with its command and call the command handler.
    pub fn dispatch(&self, mut record: Record) {
        let mut dropped = vec![];
        let matched = self.match_record(&record, &mut dropped);

        for issued in &dropped {
            self.notify_dropped(issued.0, &issued.1);
        }

        let finished = match matched {
            Matched::Command(mut pending, issued) => {
                record.command = Some(issued);
                if !record.is_error() {
                    deliver(pending.handler.as_mut(), outcome(&record), &record);
                }
                true
            }
            Matched::Nothing => false,
        };

        if finished || !dropped.is_empty() {
            self.run_idle_if_empty();
        }
    }

    fn match_record(
        &self,
        record: &Record,
        dropped: &mut Vec<(DropReason, IssuedCommand)>,
    ) -> Matched {
        let token = record.token();
        let mut state = self.lock();

        if is_target_running_error(record) {
            match state.pending.iter().position(|p| p.token == token) {
                Some(pos) => {
                    if let Some(pending) = state.pending.remove(pos) {
                        mi_debug!("`{}` rejected while target is running", pending.text);
                        dropped.push((
                            DropReason::TargetRunning,
                            pending.issued(String::new(), String::new()),
                        ));
                    }
                }
                None => mi_warn!("no command for record {record}"),
            }
            return Matched::Nothing;
        }

        while let Some(head) = state.pending.front() {
            if head.token >= token {
                break;
            }
            if let Some(pending) = state.pending.pop_front() {
                mi_warn!("no answer for {}{}", pending.token, pending.text);
                dropped.push((
                    DropReason::Unanswered,
                    pending.issued(String::new(), String::new()),
                ));
            }
        }

        if state.pending.front().map(|p| p.token) != Some(token) {
            mi_warn!("no command for record {record}");
            state.clear_streams();
            return Matched::Nothing;
        }
        let Some(pending) = state.pending.pop_front() else {
            return Matched::Nothing;
        };

        if record.is_error() {
            let message = format!("{}\n", record.error());
            state.transport.log(&message);
        }

        let console = state.console.concat();
        let log = state.log.concat();
        state.clear_streams();
        let issued = pending.issued(console, log);
        Matched::Command(pending, issued)
    }

    fn notify_dropped(&self, reason: DropReason, command: &IssuedCommand) {
        if let Some(observer) = &self.drop_observer {
            observer(reason, command);
        }
    }

    fn run_idle_if_empty(&self) {
        let idle = {
            let mut state = self.lock();
            if state.pending.is_empty() {
                state.idle.take()
            } else {
                None
            }
        };
        if let Some(idle) = idle {
            idle();
        }
    }
}
