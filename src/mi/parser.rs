//! Recursive descent parser of MI output records.

use crate::mi::decode::{unescape, Decoder, Encoding};
use crate::mi::error::Error;
use crate::mi::lexer::{Lexer, Token, TokenKind};
use crate::mi::record::{Record, RecordClass, Sigil};
use crate::mi::value::{Delimiter, MiResult, TList, Value};
use crate::mi_error;
use std::sync::Arc;

/// Result names whose values are file system paths.
const PATH_KEYS: [&str; 2] = ["file", "fullname"];

/// Deepest `{}`/`[]` nesting accepted in a line.
pub const MAX_DEPTH: usize = 64;

pub struct Parser {
    decoder: Arc<dyn Decoder>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(Arc::new(Encoding::Utf8))
    }
}

impl Parser {
    pub fn new(decoder: Arc<dyn Decoder>) -> Self {
        Self { decoder }
    }

    /// Parse a line (without trailing newline) into a record.
    ///
    /// Malformed input never fails the call, instead the record is flagged,
    /// see [`Record::is_error`].
    pub fn parse(&self, line: &str) -> Record {
        let mut state = LineParser {
            lexer: Lexer::new(line),
            decoder: self.decoder.as_ref(),
            token: 0,
            sigil: Sigil::Malformed,
            depth: 0,
        };
        match state.record() {
            Ok(record) => record,
            Err(e) => {
                if !e.is_protocol() {
                    mi_error!("unexpected error while parsing `{line}`: {e}");
                }
                Record::failed(state.token, state.sigil, e.to_string())
            }
        }
    }
}

/// Parsing state of a single line, keeps what was already recognized for error records.
struct LineParser<'a, 'd> {
    lexer: Lexer<'a>,
    decoder: &'d dyn Decoder,
    token: u32,
    sigil: Sigil,
    depth: usize,
}

fn unexpected(context: &'static str, expected: &'static str, found: &Token) -> Error {
    Error::Unexpected {
        context,
        expected,
        found: found.to_string(),
    }
}

impl<'a> LineParser<'a, '_> {
    fn expect(
        &mut self,
        kind: TokenKind,
        context: &'static str,
        expected: &'static str,
    ) -> Result<Token<'a>, Error> {
        let token = self.lexer.next_token()?;
        if token.kind != kind {
            return Err(unexpected(context, expected, &token));
        }
        Ok(token)
    }

    fn record(&mut self) -> Result<Record, Error> {
        let mut next = self.lexer.next_token()?;
        if next.kind == TokenKind::Number {
            self.token = next
                .text
                .parse()
                .map_err(|_| Error::TokenOverflow(next.text.to_string()))?;
            next = self.lexer.next_token()?;
        }
        if next.kind == TokenKind::Eol {
            return Ok(Record {
                token: self.token,
                ..Default::default()
            });
        }

        self.sigil = match next.kind {
            TokenKind::Caret => Sigil::Result,
            TokenKind::Plus => Sigil::StatusAsync,
            TokenKind::Star => Sigil::ExecAsync,
            TokenKind::Equals => Sigil::NotifyAsync,
            TokenKind::Tilde => Sigil::ConsoleStream,
            TokenKind::At => Sigil::TargetStream,
            TokenKind::Ampersand => Sigil::LogStream,
            _ => return Err(unexpected("record", "record type", &next)),
        };

        if self.sigil.is_stream() {
            let text = self.expect(TokenKind::String, "stream record", "string")?;
            self.expect(TokenKind::Eol, "stream record", "end of line")?;
            return Ok(Record {
                token: self.token,
                sigil: self.sigil,
                stream: String::from_utf8_lossy(&unescape(text.text)).into_owned(),
                ..Default::default()
            });
        }

        let class = self.expect(TokenKind::Symbol, "record", "class name")?;
        let mut record = Record {
            token: self.token,
            sigil: self.sigil,
            class: RecordClass::parse(class.text),
            ..Default::default()
        };

        let next = self.lexer.next_token()?;
        match next.kind {
            TokenKind::Eol => {}
            TokenKind::Comma => {
                record.results = self.tlist()?;
                let end = self.lexer.next_token()?;
                if end.kind != TokenKind::Eol {
                    return Err(unexpected("record results", "`,` or end of line", &end));
                }
            }
            _ => return Err(unexpected("record", "`,` or end of line", &next)),
        }
        Ok(record)
    }

    /// Top level list, optionally wrapped in delimiters.
    fn tlist(&mut self) -> Result<TList, Error> {
        let next = self.lexer.next_token()?;
        match next.kind {
            TokenKind::LeftBrace => self.delimited(Delimiter::Brace),
            TokenKind::LeftBracket => self.delimited(Delimiter::Bracket),
            _ => {
                self.lexer.push_back(next);
                let mut list = TList::top_level();
                self.body(&mut list)?;
                Ok(list)
            }
        }
    }

    /// List after its opening delimiter, consumes the closing one.
    fn delimited(&mut self, delimiter: Delimiter) -> Result<TList, Error> {
        let (close, expected) = match delimiter {
            Delimiter::Brace => (TokenKind::RightBrace, "`,` or `}`"),
            _ => (TokenKind::RightBracket, "`,` or `]`"),
        };
        if self.depth == MAX_DEPTH {
            return Err(Error::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;

        let mut list = TList::new(delimiter);
        if self.lexer.peek()?.kind != close {
            self.body(&mut list)?;
        }
        self.expect(close, "list", expected)?;
        self.depth -= 1;
        Ok(list)
    }

    /// Comma separated items, the first token decides between results and values.
    fn body(&mut self, list: &mut TList) -> Result<(), Error> {
        let by_results = match self.lexer.peek()?.kind {
            TokenKind::Symbol => true,
            TokenKind::String | TokenKind::LeftBrace | TokenKind::LeftBracket => false,
            // empty top-level list
            TokenKind::Eol => return Ok(()),
            _ => {
                let found = self.lexer.next_token()?;
                return Err(unexpected("list", "result or value", &found));
            }
        };

        loop {
            if by_results {
                let result = self.result()?;
                list.add_result(result)?;
            } else {
                let value = self.value(None)?;
                list.add_value(value)?;
            }

            let next = self.lexer.peek()?;
            if next.kind != TokenKind::Comma {
                return Ok(());
            }
            self.lexer.next_token()?;
        }
    }

    fn result(&mut self) -> Result<MiResult, Error> {
        let name = self.expect(TokenKind::Symbol, "result", "result name")?;
        self.expect(TokenKind::Equals, "result", "`=`")?;
        let value = self.value(Some(name.text))?;
        Ok(MiResult::new(name.text, value))
    }

    fn value(&mut self, name: Option<&str>) -> Result<Value, Error> {
        let next = self.lexer.next_token()?;
        match next.kind {
            TokenKind::String => {
                let raw = unescape(next.text);
                let text = match name {
                    Some(name) if PATH_KEYS.contains(&name) => self.decoder.decode(&raw),
                    _ => String::from_utf8_lossy(&raw).into_owned(),
                };
                Ok(Value::Const(text))
            }
            TokenKind::LeftBrace => Ok(Value::List(self.delimited(Delimiter::Brace)?)),
            TokenKind::LeftBracket => Ok(Value::List(self.delimited(Delimiter::Bracket)?)),
            _ => Err(unexpected("value", "string, `{` or `[`", &next)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mi::value::ListKind;

    fn parse(line: &str) -> Record {
        Parser::default().parse(line)
    }

    #[test]
    fn test_canonical_records() {
        struct TestCase {
            line: &'static str,
            check: fn(Record),
        }
        let cases = vec![
            TestCase {
                line: r#"1^done,value="5""#,
                check: |r| {
                    assert!(!r.is_error());
                    assert_eq!(r.token(), 1);
                    assert_eq!(r.sigil(), Sigil::Result);
                    assert_eq!(r.class(), &RecordClass::Done);
                    assert_eq!(r.results().get_const_value("value"), "5");
                },
            },
            TestCase {
                line: r#"2^error,msg="Undefined command""#,
                check: |r| {
                    assert!(!r.is_error());
                    assert_eq!(r.token(), 2);
                    assert_eq!(r.class(), &RecordClass::Error);
                    assert_eq!(r.results().get_const_value("msg"), "Undefined command");
                },
            },
            TestCase {
                line: r#"~"Starting program\n""#,
                check: |r| {
                    assert!(r.is_stream());
                    assert_eq!(r.sigil(), Sigil::ConsoleStream);
                    assert_eq!(r.stream(), "Starting program\n");
                    assert_eq!(r.class_name(), "");
                },
            },
            TestCase {
                line: r#"=thread-group-added,id="i1""#,
                check: |r| {
                    assert_eq!(r.token(), 0);
                    assert_eq!(r.sigil(), Sigil::NotifyAsync);
                    assert_eq!(r.class_name(), "thread-group-added");
                    assert_eq!(r.results().get_const_value("id"), "i1");
                },
            },
            TestCase {
                line: "5^running",
                check: |r| {
                    assert_eq!(r.class(), &RecordClass::Running);
                    assert!(r.is_empty());
                },
            },
            TestCase {
                line: r#"*stopped,reason="breakpoint-hit",frame={addr="0x0000555555555131",func="main",args=[]},thread-id="1""#,
                check: |r| {
                    assert_eq!(r.sigil(), Sigil::ExecAsync);
                    assert_eq!(r.class(), &RecordClass::Stopped);
                    let frame = r.results().value_of("frame").unwrap().as_tlist().unwrap();
                    assert_eq!(frame.delimiter(), Delimiter::Brace);
                    assert_eq!(frame.get_const_value("func"), "main");
                    let args = frame.value_of("args").unwrap().as_tlist().unwrap();
                    assert!(args.is_empty());
                    assert_eq!(args.kind(), None);
                    assert_eq!(r.results().get_const_value("thread-id"), "1");
                },
            },
            TestCase {
                line: r#"@"target out""#,
                check: |r| {
                    assert_eq!(r.sigil(), Sigil::TargetStream);
                    assert_eq!(r.stream(), "target out");
                },
            },
            TestCase {
                line: r#"+download,{section=".text",section-size="6668"}"#,
                check: |r| {
                    assert_eq!(r.sigil(), Sigil::StatusAsync);
                    assert_eq!(r.results().delimiter(), Delimiter::Brace);
                    assert_eq!(r.results().get_const_value("section"), ".text");
                },
            },
            TestCase {
                line: "",
                check: |r| {
                    assert!(!r.is_error());
                    assert_eq!(r.token(), 0);
                    assert_eq!(r.sigil(), Sigil::Malformed);
                    assert!(r.is_empty());
                },
            },
            TestCase {
                line: "   ",
                check: |r| {
                    assert!(!r.is_error());
                    assert!(r.is_empty());
                },
            },
            TestCase {
                line: "42",
                check: |r| {
                    assert!(!r.is_error());
                    assert_eq!(r.token(), 42);
                    assert_eq!(r.class_name(), "");
                    assert_eq!(r.to_string(), "42");
                },
            },
        ];

        for tc in cases {
            (tc.check)(parse(tc.line));
        }
    }

    #[test]
    fn test_value_lists() {
        let record =
            parse(r#"^done,groups=["a","b"],frames=[frame={level="0"},frame={level="1"}]"#);
        assert!(!record.is_error(), "{}", record.error());

        let groups = record.results().value_of("groups").unwrap().as_tlist().unwrap();
        assert_eq!(groups.kind(), Some(ListKind::Values));
        assert_eq!(groups.delimiter(), Delimiter::Bracket);
        let names: Vec<_> = groups
            .iter()
            .map(|item| item.value().as_const().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        let frames = record.results().value_of("frames").unwrap();
        assert_eq!(frames.as_list().len(), 2);
        assert!(frames.as_list().iter().all(|item| item.matches("frame")));
    }

    #[test]
    fn test_malformed_lines() {
        struct TestCase {
            line: &'static str,
            token: u32,
            sigil: Sigil,
            message_part: &'static str,
        }
        let cases = vec![
            TestCase {
                line: r#"3^done,a={b="1""#,
                token: 3,
                sigil: Sigil::Result,
                message_part: "expected `,` or `}`, found end of line",
            },
            TestCase {
                line: r#"^done,a=b"#,
                token: 0,
                sigil: Sigil::Result,
                message_part: "while parsing value",
            },
            TestCase {
                line: r#"~unquoted"#,
                token: 0,
                sigil: Sigil::ConsoleStream,
                message_part: "expected string",
            },
            TestCase {
                line: r#"~"unterminated"#,
                token: 0,
                sigil: Sigil::ConsoleStream,
                message_part: "unterminated string",
            },
            TestCase {
                line: "7(gdb)",
                token: 7,
                sigil: Sigil::Malformed,
                message_part: "expected record type",
            },
            TestCase {
                line: r#"^done,a="1",b"#,
                token: 0,
                sigil: Sigil::Result,
                message_part: "expected `=`",
            },
            TestCase {
                line: r#"^done,a="1","b""#,
                token: 0,
                sigil: Sigil::Result,
                message_part: "expected result name",
            },
            TestCase {
                line: r#"^done "x""#,
                token: 0,
                sigil: Sigil::Result,
                message_part: "expected `,` or end of line",
            },
            TestCase {
                line: "99999999999^done",
                token: 0,
                sigil: Sigil::Malformed,
                message_part: "does not fit",
            },
        ];

        for tc in cases {
            let record = parse(tc.line);
            assert!(record.is_error(), "line: {}", tc.line);
            assert!(record.is_empty());
            assert_eq!(record.token(), tc.token, "line: {}", tc.line);
            assert_eq!(record.sigil(), tc.sigil, "line: {}", tc.line);
            assert!(
                record.error().contains(tc.message_part),
                "line: {}, error: {}",
                tc.line,
                record.error()
            );
        }
    }

    #[test]
    fn test_deep_nesting_rejected() {
        struct TestCase {
            open: &'static str,
            close: &'static str,
        }
        let cases = vec![
            TestCase {
                open: "{b=",
                close: "}",
            },
            TestCase {
                open: "[",
                close: "]",
            },
        ];

        for tc in cases {
            let depth = 100_000;
            let line = format!(
                "^done,a={}\"x\"{}",
                tc.open.repeat(depth),
                tc.close.repeat(depth)
            );
            let record = parse(&line);
            assert!(record.is_error());
            assert!(record.error().contains("nested deeper"), "{}", record.error());
            assert_eq!(record.sigil(), Sigil::Result);
        }
    }

    #[test]
    fn test_nesting_up_to_limit() {
        let line = format!(
            "^done,a={}\"x\"{}",
            "[".repeat(MAX_DEPTH),
            "]".repeat(MAX_DEPTH)
        );
        let record = parse(&line);
        assert!(!record.is_error(), "{}", record.error());
        assert_eq!(record.to_string(), line);
    }

    #[test]
    fn test_file_names_use_decoder() {
        let line =
            r#"*stopped,frame={file="\320\237.c",fullname="/src/\320\237.c",func="\320\237"}"#;

        let record = Parser::new(Arc::new(Encoding::Latin1)).parse(line);
        let frame = record.results().value_of("frame").unwrap().as_tlist().unwrap();
        assert_eq!(frame.get_const_value("file"), "\u{d0}\u{9f}.c");
        assert_eq!(frame.get_const_value("fullname"), "/src/\u{d0}\u{9f}.c");
        // other values are always utf-8
        assert_eq!(frame.get_const_value("func"), "П");

        let record = parse(line);
        let frame = record.results().value_of("frame").unwrap().as_tlist().unwrap();
        assert_eq!(frame.get_const_value("file"), "П.c");
    }

    #[test]
    fn test_render_reproduces_line() {
        for line in [
            r#"1^done,value="5""#,
            r#"*stopped,frame={func="main",args=[{name="a",value="1"}]},thread-id="1""#,
            r#"^done,groups=["a","b"]"#,
            r#"~"hello\n""#,
        ] {
            assert_eq!(parse(line).to_string(), line);
        }
    }
}
