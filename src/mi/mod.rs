//! GDB/MI client protocol engine.
//!
//! Backend output flows through [`Session::process_line`]: each line is parsed into
//! a [`Record`] and either matched with the command it answers by the
//! [`Correlator`] or routed to a stream hook. Commands are sent with
//! [`Correlator::send`] which prefixes them with a correlation token.

pub mod command;
pub mod correlator;
pub mod decode;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod record;
pub mod session;
pub mod transport;
pub mod value;

pub use command::{Command, CommandHandler, Menu, Outcome};
pub use correlator::{Abandoned, Correlator, DropReason};
pub use decode::{Decoder, Encoding};
pub use error::Error;
pub use parser::Parser;
pub use record::{IssuedCommand, Record, RecordClass, Sigil};
pub use session::{DefaultHooks, Session, SessionHooks};
pub use transport::{FileTracer, TrafficLog, Transport, WriterTransport};
pub use value::{Delimiter, Item, MiResult, TList, Value};
