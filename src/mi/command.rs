//! Outgoing commands and their completion callbacks.

use crate::mi::record::Record;
use crate::mi_debug;

/// Terminal callback selected for a matched record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    Done,
    Running,
    Error,
    Exit,
    Stopped,
    Other,
}

/// Numbered choice list GDB prints into the console when a command is
/// ambiguous, e.g. a breakpoint on an overloaded function:
///
/// ```text
/// [0] cancel
/// [1] all
/// [2] foo(int) at foo.cc:3
/// >
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    items: Vec<String>,
}

impl Menu {
    /// Line GDB prints when it waits for a menu choice.
    pub const PROMPT: &'static str = ">";

    /// Collect `[N] item` lines from console text, `None` if there are none.
    pub fn parse(console: &str) -> Option<Self> {
        let items: Vec<String> = console
            .lines()
            .filter_map(|line| {
                let (index, item) = line.trim().strip_prefix('[')?.split_once(']')?;
                index.parse::<u32>().ok()?;
                Some(item.trim().to_string())
            })
            .collect();
        if items.is_empty() {
            return None;
        }
        Some(Self { items })
    }

    /// Item texts, the position of an item is its choice number.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn has_cancel(&self) -> bool {
        self.items.first().map(String::as_str) == Some("cancel")
    }
}

/// Receives the reply of a single command. Exactly one method is called,
/// unless the command is dropped by the correlator.
///
/// Every record passed here has [`Record::command`] set.
pub trait CommandHandler: Send {
    fn on_done(&mut self, record: &Record) {
        unexpected(Outcome::Done, record);
    }

    fn on_running(&mut self, record: &Record) {
        unexpected(Outcome::Running, record);
    }

    fn on_error(&mut self, record: &Record) {
        unexpected(Outcome::Error, record);
    }

    fn on_exit(&mut self, record: &Record) {
        unexpected(Outcome::Exit, record);
    }

    fn on_stopped(&mut self, record: &Record) {
        unexpected(Outcome::Stopped, record);
    }

    fn on_other(&mut self, record: &Record) {
        unexpected(Outcome::Other, record);
    }

    /// GDB asks to choose from `menu` while this command is the oldest pending one.
    /// Returned text is sent to the backend as the answer.
    fn on_user_interaction(&mut self, menu: &Menu) -> Option<String> {
        mi_debug!("unhandled user interaction: {:?}", menu.items());
        None
    }
}

fn unexpected(outcome: Outcome, record: &Record) {
    let command = record.command().map(|c| c.text.as_str()).unwrap_or_default();
    mi_debug!("unhandled `{outcome}` reply for `{command}`: {record}");
}

/// Closures see every outcome through a single call.
impl<F> CommandHandler for F
where
    F: FnMut(Outcome, &Record) + Send,
{
    fn on_done(&mut self, record: &Record) {
        self(Outcome::Done, record)
    }

    fn on_running(&mut self, record: &Record) {
        self(Outcome::Running, record)
    }

    fn on_error(&mut self, record: &Record) {
        self(Outcome::Error, record)
    }

    fn on_exit(&mut self, record: &Record) {
        self(Outcome::Exit, record)
    }

    fn on_stopped(&mut self, record: &Record) {
        self(Outcome::Stopped, record)
    }

    fn on_other(&mut self, record: &Record) {
        self(Outcome::Other, record)
    }
}

/// Handler that ignores every reply.
pub struct Ignore;

impl CommandHandler for Ignore {
    fn on_done(&mut self, _: &Record) {}
    fn on_running(&mut self, _: &Record) {}
    fn on_error(&mut self, _: &Record) {}
    fn on_exit(&mut self, _: &Record) {}
    fn on_stopped(&mut self, _: &Record) {}
    fn on_other(&mut self, _: &Record) {}
    fn on_user_interaction(&mut self, _: &Menu) -> Option<String> {
        None
    }
}

/// Command to be sent to the backend, the token is assigned on send.
pub struct Command {
    text: String,
    routing_token: u32,
    handler: Box<dyn CommandHandler>,
}

impl Command {
    pub fn new(text: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        Self {
            text: text.into(),
            routing_token: 0,
            handler: Box::new(handler),
        }
    }

    /// Command answered through a single closure.
    pub fn with_fn(
        text: impl Into<String>,
        f: impl FnMut(Outcome, &Record) + Send + 'static,
    ) -> Self {
        Self::new(text, f)
    }

    /// Command whose reply is not interesting.
    pub fn fire_and_forget(text: impl Into<String>) -> Self {
        Self::new(text, Ignore)
    }

    /// Tag the command with a caller defined routing token (e.g. the
    /// subsystem that issued it). It is never sent to the backend.
    pub fn with_routing_token(mut self, routing_token: u32) -> Self {
        self.routing_token = routing_token;
        self
    }

    /// Wire form of the command, without token and line end.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn routing_token(&self) -> u32 {
        self.routing_token
    }

    pub(crate) fn into_parts(self) -> (String, u32, Box<dyn CommandHandler>) {
        (self.text, self.routing_token, self.handler)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("text", &self.text)
            .field("routing_token", &self.routing_token)
            .finish()
    }
}

/// Route a reply to the matching callback.
pub(crate) fn deliver(handler: &mut dyn CommandHandler, outcome: Outcome, record: &Record) {
    match outcome {
        Outcome::Done => handler.on_done(record),
        Outcome::Running => handler.on_running(record),
        Outcome::Error => handler.on_error(record),
        Outcome::Exit => handler.on_exit(record),
        Outcome::Stopped => handler.on_stopped(record),
        Outcome::Other => handler.on_other(record),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_menu_parse() {
        struct TestCase {
            console: &'static str,
            expected: Option<Vec<&'static str>>,
        }
        let cases = vec![
            TestCase {
                console: "[0] cancel\n[1] all\n[2] foo(int) at foo.cc:3\n[3] foo(char) at foo.cc:7\n",
                expected: Some(vec![
                    "cancel",
                    "all",
                    "foo(int) at foo.cc:3",
                    "foo(char) at foo.cc:7",
                ]),
            },
            TestCase {
                console: "Breakpoint 1 at 0x1149\n[0] cancel\n",
                expected: Some(vec!["cancel"]),
            },
            TestCase {
                console: "[x] not a choice\n[1 unclosed\n> ",
                expected: None,
            },
            TestCase {
                console: "",
                expected: None,
            },
        ];

        for tc in cases {
            let menu = Menu::parse(tc.console);
            assert_eq!(
                menu.as_ref().map(|m| m.items().to_vec()),
                tc.expected
                    .map(|items| items.into_iter().map(String::from).collect::<Vec<_>>()),
                "console: {}",
                tc.console
            );
        }
    }

    #[test]
    fn test_menu_cancel() {
        assert!(Menu::parse("[0] cancel\n[1] all\n").unwrap().has_cancel());
        assert!(!Menu::parse("[1] all\n").unwrap().has_cancel());
    }

    #[test]
    fn test_routing_token() {
        let cmd = Command::fire_and_forget("-break-insert foo");
        assert_eq!(cmd.routing_token(), 0);
        let cmd = cmd.with_routing_token(7);
        assert_eq!(cmd.routing_token(), 7);
        let (text, routing_token, _) = cmd.into_parts();
        assert_eq!((text.as_str(), routing_token), ("-break-insert foo", 7));
    }
}
