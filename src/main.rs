//! Replay an MI transcript through a protocol session.
//!
//! Lines starting with `-> ` are sent as commands, all other lines are handled
//! as backend output. Every hook and command callback is printed to stdout.

use anyhow::Context;
use clap::Parser;
use mitap::config::SessionConfig;
use mitap::mi::{Command, Correlator, Record, SessionHooks, WriterTransport};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Session config file (default: ~/.config/mitap/config.toml)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Traffic log file, overrides the config.
    #[clap(long, env = "MITAP_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Backend prompt string, overrides the config.
    #[clap(long)]
    prompt: Option<String>,

    /// Do not write incoming lines to the traffic log.
    #[clap(long)]
    no_trace: bool,

    /// Transcript to replay, stdin if omitted.
    transcript: Option<PathBuf>,
}

const COMMAND_PREFIX: &str = "-> ";

struct PrintHooks;

impl PrintHooks {
    /// Untokened async records are notifications, the correlator would count them as orphans.
    fn async_output(&self, kind: &str, correlator: &Correlator, record: Record) {
        if record.token() == 0 {
            println!("[{kind}] {record}");
        } else {
            correlator.dispatch(record);
        }
    }
}

impl SessionHooks for PrintHooks {
    fn status_async_output(&mut self, correlator: &Correlator, record: Record) {
        self.async_output("status", correlator, record)
    }

    fn exec_async_output(&mut self, correlator: &Correlator, record: Record) {
        self.async_output("exec", correlator, record)
    }

    fn notify_async_output(&mut self, correlator: &Correlator, record: Record) {
        self.async_output("notify", correlator, record)
    }

    fn console_stream_output(&mut self, correlator: &Correlator, record: Record) {
        print!("{}", record.stream());
        correlator.log_console(record.stream());
    }

    fn target_stream_output(&mut self, _: &Correlator, record: Record) {
        print!("[target] {}", record.stream());
    }

    fn log_stream_output(&mut self, correlator: &Correlator, record: Record) {
        print!("[log] {}", record.stream());
        correlator.log_stream(record.stream());
    }

    fn prompt(&mut self, _: &Correlator) {
        println!("[prompt]");
    }

    fn connection_established(&mut self, _: &Correlator) {
        println!("[connected]");
    }

    fn error_bad_line(&mut self, _: &Correlator, line: &str) {
        println!("[bad line] {line}");
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = SessionConfig::from_file(args.config.as_deref());
    if args.log_file.is_some() {
        config.log_file = args.log_file;
    }
    if let Some(prompt) = args.prompt {
        config.prompt = prompt;
    }
    if args.no_trace {
        config.trace = false;
    }

    let correlator = Correlator::new(WriterTransport::new(std::io::stdout()))
        .with_drop_observer(|reason, cmd| {
            println!("[dropped] {}{}: {reason}", cmd.token, cmd.text)
        });
    let mut session = config.build_session(correlator, PrintHooks)?;
    if let Some(file) = session.correlator().traffic_log_file() {
        log::info!(target: "mi", "traffic log: {}", file.display());
    }

    let input: Box<dyn BufRead> = match &args.transcript {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("open transcript {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    for line in input.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        match line.strip_prefix(COMMAND_PREFIX) {
            Some(text) => {
                session.correlator().send(Command::with_fn(text, |outcome, record| {
                    let token = record.command().map(|c| c.token).unwrap_or_default();
                    println!("[{token} {outcome}] {}", record.results());
                    if let Some(console) = record.command().map(|c| &c.console_stream) {
                        if !console.is_empty() {
                            println!("[{token} console] {}", console.trim_end());
                        }
                    }
                }))?;
            }
            None => session.process_line(line),
        }
    }

    let pending = session.correlator().pending_tokens();
    if !pending.is_empty() {
        println!("[unanswered] {pending:?}");
    }
    Ok(())
}
