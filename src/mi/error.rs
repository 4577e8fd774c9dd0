use crate::mi::value::ListKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),

    // --------------------------------- lexing errors ---------------------------------------------
    #[error("unterminated string literal starting at column {0}")]
    UnterminatedString(usize),

    // --------------------------------- parsing errors --------------------------------------------
    #[error("while parsing {context}: expected {expected}, found {found}")]
    Unexpected {
        context: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("token `{0}` does not fit the token range")]
    TokenOverflow(String),
    #[error("lists nested deeper than {0} levels")]
    TooDeep(usize),

    // --------------------------------- value tree errors -----------------------------------------
    #[error("cannot add a {adding} to a {kind}")]
    MixedList {
        kind: ListKind,
        adding: &'static str,
    },

    // --------------------------------- correlation errors ----------------------------------------
    #[error("idle handler registered while no command is pending")]
    IdleWithoutPending,
    #[error("no pending command with token {0}")]
    NotPending(u32),

    // --------------------------------- configuration errors --------------------------------------
    #[error("config parsing error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("unknown file name encoding `{0}`")]
    UnknownEncoding(String),
}

impl Error {
    /// Return true if error produced by a malformed protocol line.
    pub fn is_protocol(&self) -> bool {
        match self {
            Error::UnterminatedString(_) => true,
            Error::Unexpected { .. } => true,
            Error::TokenOverflow(_) => true,
            Error::TooDeep(_) => true,

            Error::IO(_) => false,
            Error::MixedList { .. } => false,
            Error::IdleWithoutPending => false,
            Error::NotPending(_) => false,
            Error::Config(_) => false,
            Error::UnknownEncoding(_) => false,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "mi", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "mi", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(::log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(::log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(::log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(::log::debug, $res, $msg)
    };
}
