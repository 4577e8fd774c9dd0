//! Escape collapsing and file name decoding for MI string constants.

use crate::mi::error::Error;
use serde::Deserialize;
use std::str::FromStr;

/// Converts raw bytes of a file name into text.
///
/// GDB prints bytes of non-ASCII file names as octal escapes, so the
/// encoding is only known to the front-end (usually the host file system encoding).
pub trait Decoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> String;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Encoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            _ => Err(Error::UnknownEncoding(s.to_string())),
        }
    }
}

impl Decoder for Encoding {
    fn decode(&self, raw: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(raw).into_owned(),
            Encoding::Latin1 => raw.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Collapse C-style escapes (`\n`, `\"`, `\\`, `\NNN` octal, ...) into raw bytes.
pub fn unescape(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        if b != b'\\' || i == bytes.len() {
            out.push(b);
            continue;
        }

        let esc = bytes[i];
        i += 1;
        match esc {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'e' => out.push(0x1b),
            b'0'..=b'7' => {
                let mut value = (esc - b'0') as u32;
                let mut digits = 1;
                while digits < 3 && i < bytes.len() && (b'0'..=b'7').contains(&bytes[i]) {
                    let next = value * 8 + (bytes[i] - b'0') as u32;
                    // `Ā` and above do not fit a byte, the last digit is a plain char
                    let Ok(byte) = u8::try_from(next) else {
                        break;
                    };
                    value = byte as u32;
                    i += 1;
                    digits += 1;
                }
                out.push(value as u8);
            }
            // `\"`, `\\` and unknown escapes stand for the character itself
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`unescape`] for text, used when rendering constants back to MI syntax.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unescape() {
        struct TestCase {
            raw: &'static str,
            expected: &'static [u8],
        }
        let cases = vec![
            TestCase {
                raw: r"Starting program\n",
                expected: b"Starting program\n",
            },
            TestCase {
                raw: r#"say \"hi\""#,
                expected: b"say \"hi\"",
            },
            TestCase {
                raw: r"c:\\dir",
                expected: b"c:\\dir",
            },
            TestCase {
                raw: r"\320\237x",
                expected: &[0o320, 0o237, b'x'],
            },
            TestCase {
                raw: r"\0",
                expected: &[0],
            },
            TestCase {
                raw: r"trailing\",
                expected: b"trailing\\",
            },
            TestCase {
                raw: r"\q",
                expected: b"q",
            },
            TestCase {
                raw: r"\377\400\777",
                expected: &[0o377, 0o40, b'0', 0o77, b'7'],
            },
        ];

        for tc in cases {
            assert_eq!(unescape(tc.raw), tc.expected, "raw: {}", tc.raw);
        }
    }

    #[test]
    fn test_decode_file_names() {
        let raw = unescape(r"/src/\320\237.c");
        assert_eq!(Encoding::Utf8.decode(&raw), "/src/П.c");
        assert_eq!(Encoding::Latin1.decode(&raw), "/src/\u{d0}\u{9f}.c");
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("latin1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!(matches!(
            "koi8-r".parse::<Encoding>(),
            Err(Error::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_escape_roundtrips_controls() {
        struct TestCase {
            text: &'static str,
            escaped: &'static str,
        }
        let cases = vec![
            TestCase {
                text: "a\"b\\c\nd\u{1b}",
                escaped: r#"a\"b\\c\nd\033"#,
            },
            TestCase {
                text: "\u{7f}",
                escaped: r"\177",
            },
            TestCase {
                text: "\u{85}\u{9f}П",
                escaped: "\u{85}\u{9f}П",
            },
        ];

        for tc in cases {
            assert_eq!(escape(tc.text), tc.escaped);
            assert_eq!(String::from_utf8(unescape(&escape(tc.text))).unwrap(), tc.text);
        }
    }
}
