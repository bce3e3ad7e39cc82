use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::heap::ObjId;

/// Result type alias for operations that can produce a runtime error or a
/// control-flow signal.
pub(crate) type EvalResult<T> = Result<T, Flow>;

/// Error kinds raised by the engine.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. These are kinds, not script-visible classes: a script sees the
/// message and the `errorCode` variable, while the embedding host can match on the
/// kind programmatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ErrKind {
    /// The script could not be parsed.
    ParseError,
    /// A value could not be converted to the requested representation.
    WrongType,
    /// Unknown command or variable name.
    NameError,
    /// A command was invoked with the wrong number of arguments.
    WrongNumArgs,
    /// Division by zero or a math domain error inside `expr`.
    ArithmeticError,
    /// The configured recursion ceiling was exceeded.
    RecursionLimit,
    /// An error propagated out of a foreign-type callback.
    ForeignError,
    /// BREAK/CONTINUE outside a loop or a bad completion code at top level.
    ControlFlowMisuse,
    /// An error raised by the script itself via the `error` command.
    General,
    /// Should never escape; becomes an error with a diagnostic if it does.
    Internal,
}

/// A runtime error being propagated.
///
/// Carries the user-visible message, the optional `errorCode` value, and the
/// location trace accumulated while unwinding (the future `errorInfo`).
#[derive(Debug, Clone)]
pub(crate) struct Raise {
    pub kind: ErrKind,
    pub message: String,
    /// Value for the `errorCode` global; `NONE` when absent.
    pub error_code: Option<String>,
    /// Unwind trace lines appended as evaluation frames are peeled off.
    /// Joined under the message to form `errorInfo`.
    pub trace: Vec<String>,
}

impl Raise {
    pub fn new(kind: ErrKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            error_code: None,
            trace: Vec::new(),
        }
    }

    pub fn wrong_type(message: impl Into<String>) -> Self {
        Self::new(ErrKind::WrongType, message)
    }

    pub fn name_error(message: impl Into<String>) -> Self {
        Self::new(ErrKind::NameError, message)
    }

    /// Builds the canonical `wrong # args: should be "..."` message.
    pub fn wrong_num_args(usage: &str) -> Self {
        Self::new(ErrKind::WrongNumArgs, format!("wrong # args: should be \"{usage}\""))
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::new(ErrKind::ArithmeticError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrKind::Internal, message)
    }

    /// Renders the `errorInfo` text: the message followed by the unwind trace.
    pub fn error_info(&self) -> String {
        let mut out = self.message.clone();
        for line in &self.trace {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}

/// Completion code carried by a `return` in flight.
///
/// Mirrors the numeric codes scripts see from `catch`: 0 ok, 1 error,
/// 2 return, 3 break, 4 continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReturnCode {
    Ok,
    Error,
    Return,
    Break,
    Continue,
}

impl ReturnCode {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::Return => 2,
            Self::Break => 3,
            Self::Continue => 4,
        }
    }

    /// Parses a `-code` option value: a symbolic name or an integer.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "ok" | "0" => Some(Self::Ok),
            "error" | "1" => Some(Self::Error),
            "return" | "2" => Some(Self::Return),
            "break" | "3" => Some(Self::Break),
            "continue" | "4" => Some(Self::Continue),
            _ => None,
        }
    }
}

/// Error metadata attached by `return -code error -errorcode/-errorinfo`.
#[derive(Debug, Default)]
pub(crate) struct ReturnOpts {
    pub error_code: Option<String>,
    pub error_info: Option<String>,
}

/// Non-OK completion of a command, propagated through the evaluator.
///
/// `Error` unwinds to the nearest `catch` or the top level; `Break` and
/// `Continue` unwind to the nearest loop; `Return` unwinds to the nearest
/// procedure boundary, where its `code` and `level` decide what the caller
/// observes.
#[derive(Debug)]
pub(crate) enum Flow {
    Error(Raise),
    Return {
        value: ObjId,
        code: ReturnCode,
        level: u32,
        options: Option<Box<ReturnOpts>>,
    },
    Break,
    Continue,
}

impl Flow {
    /// The numeric completion code `catch` reports for this signal.
    pub fn catch_code(&self) -> i64 {
        match self {
            Self::Error(_) => 1,
            Self::Return { .. } => 2,
            Self::Break => 3,
            Self::Continue => 4,
        }
    }
}

impl From<Raise> for Flow {
    fn from(raise: Raise) -> Self {
        Self::Error(raise)
    }
}

/// An evaluation failure reported to the embedding host.
///
/// This is the public, fully-owned form of a runtime error: the kind from the
/// engine taxonomy, the message (the interpreter result at the time of the
/// error), and the `errorCode`/`errorInfo` values scripts would observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    kind: ErrKind,
    message: String,
    error_code: String,
    error_info: String,
}

impl Exception {
    /// Creates an exception with no accumulated trace.
    ///
    /// Host command and foreign-type callbacks use this to report failures;
    /// the engine fills in the unwind trace as the error propagates.
    #[must_use]
    pub fn new(kind: ErrKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind,
            error_info: message.clone(),
            message,
            error_code: "NONE".to_owned(),
        }
    }

    /// Attaches an `errorCode` value.
    #[must_use]
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = code.into();
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrKind {
        self.kind
    }

    /// The user-visible error message (the interpreter result).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The `errorCode` value; `NONE` when the raiser did not set one.
    #[must_use]
    pub fn error_code(&self) -> &str {
        &self.error_code
    }

    /// The `errorInfo` text: the message plus the unwind location trace.
    #[must_use]
    pub fn error_info(&self) -> &str {
        &self.error_info
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Exception {}

impl From<Exception> for Raise {
    fn from(exc: Exception) -> Self {
        let error_code = if exc.error_code == "NONE" {
            None
        } else {
            Some(exc.error_code)
        };
        Self {
            kind: exc.kind,
            message: exc.message,
            error_code,
            trace: Vec::new(),
        }
    }
}

impl From<Raise> for Exception {
    fn from(raise: Raise) -> Self {
        Self {
            error_info: raise.error_info(),
            kind: raise.kind,
            message: raise.message,
            error_code: raise.error_code.unwrap_or_else(|| "NONE".to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_info_joins_trace_under_message() {
        let mut raise = Raise::new(ErrKind::General, "boom");
        raise.trace.push("    while executing".to_owned());
        raise.trace.push("\"error boom\"".to_owned());
        assert_eq!(raise.error_info(), "boom\n    while executing\n\"error boom\"");
    }

    #[test]
    fn return_code_parses_names_and_numbers() {
        assert_eq!(ReturnCode::parse("error"), Some(ReturnCode::Error));
        assert_eq!(ReturnCode::parse("4"), Some(ReturnCode::Continue));
        assert_eq!(ReturnCode::parse("bogus"), None);
    }
}
