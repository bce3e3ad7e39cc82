use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

/// Parse status of a script, reported without evaluating.
///
/// `Incomplete` is distinct from `Error`: interactive hosts use it to keep
/// reading input until the open brace, quote, or bracket is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completeness {
    Complete,
    Incomplete,
    Error,
}

/// A parsed script: an ordered sequence of commands over a shared source.
///
/// Parsing only plans substitutions; nothing is evaluated. A `Script` can be
/// serialized with [`Script::dump`] and restored with [`Script::load`] to
/// cache parse results across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    source: Rc<str>,
    commands: Vec<Cmd>,
}

impl Script {
    pub(crate) fn commands(&self) -> &[Cmd] {
        &self.commands
    }

    /// The source text of one command, for error traces.
    pub(crate) fn cmd_text(&self, cmd: &Cmd) -> &str {
        self.source[cmd.span.0 as usize..cmd.span.1 as usize].trim()
    }

    /// Serializes the parsed form to a binary blob.
    pub fn dump(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Restores a parsed script from [`Script::dump`] output.
    pub fn load(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// One command: the words to substitute and the byte span in the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Cmd {
    pub words: Vec<Word>,
    pub span: (u32, u32),
}

/// One word of a command, captured as a sequence of segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Word {
    pub segments: SmallVec<[Segment; 2]>,
    /// Braced words are a single literal segment with no substitution.
    pub braced: bool,
}

/// A planned piece of a word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum Segment {
    /// Literal bytes copied through unchanged.
    Literal(String),
    /// `$name`, `${name}`, or `$name(index)`; the index is itself a word.
    VarRef { name: String, index: Option<Box<Word>> },
    /// `[...]`: the subscript is evaluated and its result spliced in.
    CmdSubst(Rc<Script>),
    /// A decoded backslash escape.
    Escape(char),
}

/// Outcome of parsing a script.
#[derive(Debug, Clone)]
pub enum Parsed {
    Complete(Script),
    /// Unclosed brace, quote, or bracket at end of input; `offset` is the
    /// byte position of the opener.
    Incomplete { offset: usize },
    /// Malformed input; reported as close to the offending byte as possible.
    Error { offset: usize, message: String },
}

impl Parsed {
    #[must_use]
    pub fn completeness(&self) -> Completeness {
        match self {
            Self::Complete(_) => Completeness::Complete,
            Self::Incomplete { .. } => Completeness::Incomplete,
            Self::Error { .. } => Completeness::Error,
        }
    }
}

/// Parses a script into its command list.
#[must_use]
pub fn parse_script(src: &str) -> Parsed {
    let source: Rc<str> = Rc::from(src);
    let mut parser = Parser {
        src,
        source: source.clone(),
        pos: 0,
        depth: 0,
    };
    match parser.parse_commands(None) {
        Ok(commands) => Parsed::Complete(Script { source, commands }),
        Err(PFail::Incomplete { offset }) => Parsed::Incomplete { offset },
        Err(PFail::Error { offset, message }) => Parsed::Error { offset, message },
    }
}

/// Reports whether a script is complete without evaluating it.
#[must_use]
pub fn check_complete(src: &str) -> Completeness {
    parse_script(src).completeness()
}

/// A decoded backslash sequence.
pub(crate) enum EscapeKind {
    /// A single substituted character.
    Char(char),
    /// Backslash-newline (plus following blanks): joins lines as a space.
    LineJoin,
}

/// Decodes the backslash sequence starting at `*pos` (which must point at
/// the backslash) and advances `*pos` past it.
pub(crate) fn read_escape(src: &str, pos: &mut usize) -> EscapeKind {
    let bytes = src.as_bytes();
    debug_assert_eq!(bytes[*pos], b'\\');
    let i = *pos + 1;
    if i >= bytes.len() {
        *pos += 1;
        return EscapeKind::Char('\\');
    }
    match bytes[i] {
        b'n' => {
            *pos = i + 1;
            EscapeKind::Char('\n')
        }
        b't' => {
            *pos = i + 1;
            EscapeKind::Char('\t')
        }
        b'r' => {
            *pos = i + 1;
            EscapeKind::Char('\r')
        }
        b'a' => {
            *pos = i + 1;
            EscapeKind::Char('\x07')
        }
        b'b' => {
            *pos = i + 1;
            EscapeKind::Char('\x08')
        }
        b'f' => {
            *pos = i + 1;
            EscapeKind::Char('\x0c')
        }
        b'v' => {
            *pos = i + 1;
            EscapeKind::Char('\x0b')
        }
        b'\n' => {
            let mut p = i + 1;
            while p < bytes.len() && matches!(bytes[p], b' ' | b'\t') {
                p += 1;
            }
            *pos = p;
            EscapeKind::LineJoin
        }
        b'x' => {
            let mut value: u32 = 0;
            let mut p = i + 1;
            let mut digits = 0;
            while p < bytes.len() && digits < 2 {
                let Some(d) = (bytes[p] as char).to_digit(16) else { break };
                value = value * 16 + d;
                p += 1;
                digits += 1;
            }
            if digits == 0 {
                *pos = i + 1;
                EscapeKind::Char('x')
            } else {
                *pos = p;
                EscapeKind::Char(char::from_u32(value).unwrap_or('\u{fffd}'))
            }
        }
        b'u' => {
            let mut value: u32 = 0;
            let mut p = i + 1;
            let mut digits = 0;
            while p < bytes.len() && digits < 4 {
                let Some(d) = (bytes[p] as char).to_digit(16) else { break };
                value = value * 16 + d;
                p += 1;
                digits += 1;
            }
            if digits == 0 {
                *pos = i + 1;
                EscapeKind::Char('u')
            } else {
                *pos = p;
                EscapeKind::Char(char::from_u32(value).unwrap_or('\u{fffd}'))
            }
        }
        b'0'..=b'7' => {
            let mut value: u32 = 0;
            let mut p = i;
            let mut digits = 0;
            while p < bytes.len() && digits < 3 {
                let Some(d) = (bytes[p] as char).to_digit(8) else { break };
                value = value * 8 + d;
                p += 1;
                digits += 1;
            }
            *pos = p;
            EscapeKind::Char(char::from_u32(value).unwrap_or('\u{fffd}'))
        }
        _ => {
            let c = src[i..].chars().next().unwrap_or('\\');
            *pos = i + c.len_utf8();
            EscapeKind::Char(c)
        }
    }
}

/// Maximum nesting depth for brackets and array indices during parsing.
/// Prevents host-stack overflow from input like `[[[[...]]]]`.
const MAX_NESTING_DEPTH: u16 = 200;

enum PFail {
    Incomplete { offset: usize },
    Error { offset: usize, message: String },
}

type PResult<T> = Result<T, PFail>;

struct Parser<'s> {
    src: &'s str,
    source: Rc<str>,
    pos: usize,
    depth: u16,
}

impl Parser<'_> {
    fn bytes(&self) -> &[u8] {
        self.src.as_bytes()
    }

    fn len(&self) -> usize {
        self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    /// Advances past one (possibly multi-byte) character and returns it.
    fn next_char(&mut self) -> char {
        let c = self.src[self.pos..].chars().next().unwrap_or('\0');
        self.pos += c.len_utf8();
        c
    }

    fn at_line_join(&self) -> bool {
        self.peek() == Some(b'\\') && self.bytes().get(self.pos + 1) == Some(&b'\n')
    }

    /// Skips blanks and command separators (newlines and semicolons).
    fn skip_command_separators(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | b';') => self.pos += 1,
                Some(b'\\') if self.at_line_join() => {
                    let _ = read_escape(self.src, &mut self.pos);
                }
                _ => break,
            }
        }
    }

    /// Skips blanks between words (a backslash-newline counts as a blank).
    fn skip_word_separators(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => self.pos += 1,
                Some(b'\\') if self.at_line_join() => {
                    let _ = read_escape(self.src, &mut self.pos);
                }
                _ => break,
            }
        }
    }

    /// Skips a `#` comment. Comments run to end of line; a backslash escapes
    /// the following character, so a backslash-newline continues the comment.
    fn skip_comment(&mut self) {
        while self.pos < self.len() {
            match self.peek() {
                Some(b'\\') if self.pos + 1 < self.len() => {
                    self.pos += 1;
                    let _ = self.next_char();
                }
                Some(b'\n') => break,
                _ => {
                    let _ = self.next_char();
                }
            }
        }
    }

    /// Parses commands until end of input, or until the matching `]` when
    /// `bracket_open` marks an enclosing subscript.
    fn parse_commands(&mut self, bracket_open: Option<usize>) -> PResult<Vec<Cmd>> {
        let mut commands = Vec::new();
        loop {
            self.skip_command_separators();
            let Some(b) = self.peek() else {
                match bracket_open {
                    Some(offset) => return Err(PFail::Incomplete { offset }),
                    None => break,
                }
            };
            if b == b']' && bracket_open.is_some() {
                self.pos += 1;
                break;
            }
            if b == b'#' {
                self.skip_comment();
                continue;
            }
            let cmd = self.parse_command(bracket_open.is_some())?;
            if !cmd.words.is_empty() {
                commands.push(cmd);
            }
        }
        Ok(commands)
    }

    fn parse_command(&mut self, in_bracket: bool) -> PResult<Cmd> {
        let start = self.pos;
        let mut words = Vec::new();
        loop {
            self.skip_word_separators();
            match self.peek() {
                None | Some(b'\n' | b';') => break,
                Some(b']') if in_bracket => break,
                Some(b'{') => words.push(self.parse_braced_word(in_bracket)?),
                Some(b'"') => words.push(self.parse_quoted_word(in_bracket)?),
                _ => words.push(self.parse_bare_word(in_bracket)?),
            }
        }
        Ok(Cmd {
            words,
            span: (start as u32, self.pos as u32),
        })
    }

    /// Checks that a closed brace/quote word is followed by a separator.
    fn check_word_end(&self, in_bracket: bool, message: &str) -> PResult<()> {
        match self.peek() {
            None | Some(b' ' | b'\t' | b'\r' | b'\n' | b';') => Ok(()),
            Some(b']') if in_bracket => Ok(()),
            Some(b'\\') if self.at_line_join() => Ok(()),
            Some(_) => Err(PFail::Error {
                offset: self.pos,
                message: message.to_owned(),
            }),
        }
    }

    /// `{...}`: a single literal segment. Nested braces need no escaping;
    /// backslashes are literal except backslash-newline, which joins lines.
    fn parse_braced_word(&mut self, in_bracket: bool) -> PResult<Word> {
        let open = self.pos;
        self.pos += 1;
        let mut depth = 1usize;
        let mut content = String::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(PFail::Incomplete { offset: open });
            };
            match b {
                b'\\' => {
                    if self.at_line_join() {
                        let _ = read_escape(self.src, &mut self.pos);
                        content.push(' ');
                    } else {
                        content.push('\\');
                        self.pos += 1;
                        if self.pos < self.len() {
                            content.push(self.next_char());
                        }
                    }
                }
                b'{' => {
                    depth += 1;
                    content.push('{');
                    self.pos += 1;
                }
                b'}' => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        break;
                    }
                    content.push('}');
                }
                _ => content.push(self.next_char()),
            }
        }
        self.check_word_end(in_bracket, "extra characters after close-brace")?;
        Ok(Word {
            segments: smallvec![Segment::Literal(content)],
            braced: true,
        })
    }

    /// `"..."`: literal segments mixed with variable, command, and escape
    /// segments.
    fn parse_quoted_word(&mut self, in_bracket: bool) -> PResult<Word> {
        let open = self.pos;
        self.pos += 1;
        let mut segments: SmallVec<[Segment; 2]> = SmallVec::new();
        let mut cur = String::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(PFail::Incomplete { offset: open });
            };
            match b {
                b'"' => {
                    self.pos += 1;
                    break;
                }
                b'$' => {
                    if let Some(segment) = self.parse_varref()? {
                        flush_literal(&mut segments, &mut cur);
                        segments.push(segment);
                    } else {
                        cur.push('$');
                    }
                }
                b'[' => {
                    flush_literal(&mut segments, &mut cur);
                    segments.push(self.parse_bracket()?);
                }
                b'\\' => match read_escape(self.src, &mut self.pos) {
                    EscapeKind::LineJoin => cur.push(' '),
                    EscapeKind::Char(c) => {
                        flush_literal(&mut segments, &mut cur);
                        segments.push(Segment::Escape(c));
                    }
                },
                _ => cur.push(self.next_char()),
            }
        }
        self.check_word_end(in_bracket, "extra characters after close-quote")?;
        flush_literal(&mut segments, &mut cur);
        if segments.is_empty() {
            segments.push(Segment::Literal(String::new()));
        }
        Ok(Word {
            segments,
            braced: false,
        })
    }

    fn parse_bare_word(&mut self, in_bracket: bool) -> PResult<Word> {
        let mut segments: SmallVec<[Segment; 2]> = SmallVec::new();
        let mut cur = String::new();
        loop {
            let Some(b) = self.peek() else { break };
            match b {
                b' ' | b'\t' | b'\r' | b'\n' | b';' => break,
                b']' if in_bracket => break,
                b'$' => {
                    if let Some(segment) = self.parse_varref()? {
                        flush_literal(&mut segments, &mut cur);
                        segments.push(segment);
                    } else {
                        cur.push('$');
                    }
                }
                b'[' => {
                    flush_literal(&mut segments, &mut cur);
                    segments.push(self.parse_bracket()?);
                }
                b'\\' => {
                    if self.at_line_join() {
                        break;
                    }
                    match read_escape(self.src, &mut self.pos) {
                        EscapeKind::LineJoin => break,
                        EscapeKind::Char(c) => {
                            flush_literal(&mut segments, &mut cur);
                            segments.push(Segment::Escape(c));
                        }
                    }
                }
                _ => cur.push(self.next_char()),
            }
        }
        flush_literal(&mut segments, &mut cur);
        if segments.is_empty() {
            segments.push(Segment::Literal(String::new()));
        }
        Ok(Word {
            segments,
            braced: false,
        })
    }

    /// `$name`, `${name}`, or `$name(index)`. Returns `None` when the `$` is
    /// not followed by a variable name and stays literal.
    fn parse_varref(&mut self) -> PResult<Option<Segment>> {
        let dollar = self.pos;
        self.pos += 1;
        match self.peek() {
            Some(b'{') => {
                let open = self.pos;
                self.pos += 1;
                let start = self.pos;
                loop {
                    match self.peek() {
                        None => return Err(PFail::Incomplete { offset: open }),
                        Some(b'}') => break,
                        _ => {
                            let _ = self.next_char();
                        }
                    }
                }
                let name = self.src[start..self.pos].to_owned();
                self.pos += 1;
                Ok(Some(Segment::VarRef { name, index: None }))
            }
            Some(b) if b.is_ascii_alphanumeric() || b == b'_' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                    self.pos += 1;
                }
                let name = self.src[start..self.pos].to_owned();
                let index = if self.peek() == Some(b'(') {
                    Some(Box::new(self.parse_array_index()?))
                } else {
                    None
                };
                Ok(Some(Segment::VarRef { name, index }))
            }
            _ => {
                self.pos = dollar;
                self.pos += 1;
                Ok(None)
            }
        }
    }

    fn enter_nesting(&mut self, at: usize) -> PResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(PFail::Error {
                offset: at,
                message: "too many nested substitutions".to_owned(),
            });
        }
        Ok(())
    }

    /// The `(index)` part of an array reference; the index itself may
    /// contain substitutions.
    fn parse_array_index(&mut self) -> PResult<Word> {
        let open = self.pos;
        self.enter_nesting(open)?;
        self.pos += 1;
        let mut segments: SmallVec<[Segment; 2]> = SmallVec::new();
        let mut cur = String::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(PFail::Error {
                    offset: open,
                    message: "missing close-parenthesis in array reference".to_owned(),
                });
            };
            match b {
                b')' => {
                    self.pos += 1;
                    break;
                }
                b'$' => {
                    if let Some(segment) = self.parse_varref()? {
                        flush_literal(&mut segments, &mut cur);
                        segments.push(segment);
                    } else {
                        cur.push('$');
                    }
                }
                b'[' => {
                    flush_literal(&mut segments, &mut cur);
                    segments.push(self.parse_bracket()?);
                }
                b'\\' => match read_escape(self.src, &mut self.pos) {
                    EscapeKind::LineJoin => cur.push(' '),
                    EscapeKind::Char(c) => {
                        flush_literal(&mut segments, &mut cur);
                        segments.push(Segment::Escape(c));
                    }
                },
                _ => cur.push(self.next_char()),
            }
        }
        flush_literal(&mut segments, &mut cur);
        if segments.is_empty() {
            segments.push(Segment::Literal(String::new()));
        }
        self.depth -= 1;
        Ok(Word {
            segments,
            braced: false,
        })
    }

    /// `[...]`: parses the subscript as a nested command list.
    fn parse_bracket(&mut self) -> PResult<Segment> {
        let open = self.pos;
        self.enter_nesting(open)?;
        self.pos += 1;
        let commands = self.parse_commands(Some(open))?;
        self.depth -= 1;
        Ok(Segment::CmdSubst(Rc::new(Script {
            source: self.source.clone(),
            commands,
        })))
    }
}

fn flush_literal(segments: &mut SmallVec<[Segment; 2]>, cur: &mut String) {
    if !cur.is_empty() {
        segments.push(Segment::Literal(std::mem::take(cur)));
    }
}

/// Parses array-index text (already substituted or taken from `expr`
/// source) into a word of segments.
pub(crate) fn parse_index_text(text: &str) -> Result<Word, String> {
    let source: Rc<str> = Rc::from(text);
    let mut parser = Parser {
        src: text,
        source,
        pos: 0,
        depth: 0,
    };
    let mut segments: SmallVec<[Segment; 2]> = SmallVec::new();
    let mut cur = String::new();
    while parser.pos < parser.len() {
        match parser.peek() {
            Some(b'$') => match parser.parse_varref() {
                Ok(Some(segment)) => {
                    flush_literal(&mut segments, &mut cur);
                    segments.push(segment);
                }
                Ok(None) => cur.push('$'),
                Err(fail) => return Err(fail_message(fail)),
            },
            Some(b'[') => match parser.parse_bracket() {
                Ok(segment) => {
                    flush_literal(&mut segments, &mut cur);
                    segments.push(segment);
                }
                Err(fail) => return Err(fail_message(fail)),
            },
            Some(b'\\') => match read_escape(parser.src, &mut parser.pos) {
                EscapeKind::LineJoin => cur.push(' '),
                EscapeKind::Char(c) => {
                    flush_literal(&mut segments, &mut cur);
                    segments.push(Segment::Escape(c));
                }
            },
            _ => cur.push(parser.next_char()),
        }
    }
    flush_literal(&mut segments, &mut cur);
    if segments.is_empty() {
        segments.push(Segment::Literal(String::new()));
    }
    Ok(Word {
        segments,
        braced: false,
    })
}

/// Parses a `[...]` subscript inside foreign text (used by `expr`).
///
/// `open` is the byte offset of the `[`; returns the parsed subscript and
/// the position just past the closing `]`.
pub(crate) fn parse_subscript(src: &str, open: usize) -> Result<(Rc<Script>, usize), String> {
    let source: Rc<str> = Rc::from(src);
    let mut parser = Parser {
        src,
        source: source.clone(),
        pos: open + 1,
        depth: 0,
    };
    let commands = parser.parse_commands(Some(open)).map_err(fail_message)?;
    Ok((Rc::new(Script { source, commands }), parser.pos))
}

fn fail_message(fail: PFail) -> String {
    match fail {
        PFail::Incomplete { .. } => "missing close-bracket".to_owned(),
        PFail::Error { message, .. } => message,
    }
}

/// Splits a string into list elements following the canonical list syntax.
///
/// Braced elements are taken literally; quoted and bare elements process
/// backslash escapes. No `$` or `[...]` substitution happens here.
pub(crate) fn split_list(s: &str) -> Result<Vec<String>, String> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut pos = 0usize;
    let mut out = Vec::new();
    loop {
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= len {
            break;
        }
        match bytes[pos] {
            b'{' => {
                pos += 1;
                let start = pos;
                let mut depth = 1usize;
                loop {
                    if pos >= len {
                        return Err("unmatched open brace in list".to_owned());
                    }
                    match bytes[pos] {
                        b'\\' => {
                            pos += 1;
                            if pos < len {
                                pos += utf8_len(bytes[pos]);
                            }
                        }
                        b'{' => {
                            depth += 1;
                            pos += 1;
                        }
                        b'}' => {
                            depth -= 1;
                            pos += 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => pos += utf8_len(bytes[pos]),
                    }
                }
                let element = s[start..pos - 1].to_owned();
                if pos < len && !bytes[pos].is_ascii_whitespace() {
                    return Err("list element in braces followed by non-space character".to_owned());
                }
                out.push(element);
            }
            b'"' => {
                pos += 1;
                let mut element = String::new();
                loop {
                    if pos >= len {
                        return Err("unmatched open quote in list".to_owned());
                    }
                    match bytes[pos] {
                        b'"' => {
                            pos += 1;
                            break;
                        }
                        b'\\' => match read_escape(s, &mut pos) {
                            EscapeKind::LineJoin => element.push(' '),
                            EscapeKind::Char(c) => element.push(c),
                        },
                        _ => {
                            let c = s[pos..].chars().next().unwrap_or('\0');
                            element.push(c);
                            pos += c.len_utf8();
                        }
                    }
                }
                if pos < len && !bytes[pos].is_ascii_whitespace() {
                    return Err("list element in quotes followed by non-space character".to_owned());
                }
                out.push(element);
            }
            _ => {
                let mut element = String::new();
                while pos < len && !bytes[pos].is_ascii_whitespace() {
                    if bytes[pos] == b'\\' {
                        match read_escape(s, &mut pos) {
                            EscapeKind::LineJoin => break,
                            EscapeKind::Char(c) => element.push(c),
                        }
                    } else {
                        let c = s[pos..].chars().next().unwrap_or('\0');
                        element.push(c);
                        pos += c.len_utf8();
                    }
                }
                out.push(element);
            }
        }
    }
    Ok(out)
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(src: &str) -> Script {
        match parse_script(src) {
            Parsed::Complete(script) => script,
            other => panic!("expected complete parse of {src:?}, got {other:?}"),
        }
    }

    #[test]
    fn commands_split_on_newlines_and_semicolons() {
        let script = complete("set x 1; set y 2\nset z 3");
        assert_eq!(script.commands().len(), 3);
        assert_eq!(script.commands()[0].words.len(), 3);
    }

    #[test]
    fn comment_only_at_command_position() {
        let script = complete("# a comment\nset x #notcomment");
        assert_eq!(script.commands().len(), 1);
        assert_eq!(script.commands()[0].words.len(), 3);
    }

    #[test]
    fn braced_word_is_single_literal() {
        let script = complete("set x {a $b [c]}");
        let word = &script.commands()[0].words[2];
        assert!(word.braced);
        assert_eq!(word.segments.len(), 1);
        match &word.segments[0] {
            Segment::Literal(s) => assert_eq!(s, "a $b [c]"),
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn quoted_word_plans_substitutions() {
        let script = complete("set x \"a $b [c] d\"");
        let word = &script.commands()[0].words[2];
        assert!(!word.braced);
        assert!(word.segments.len() >= 3);
        assert!(
            word.segments
                .iter()
                .any(|s| matches!(s, Segment::VarRef { name, .. } if name == "b"))
        );
        assert!(word.segments.iter().any(|s| matches!(s, Segment::CmdSubst(_))));
    }

    #[test]
    fn unclosed_brace_is_incomplete_at_opener() {
        match parse_script("set x {") {
            Parsed::Incomplete { offset } => assert_eq!(offset, 6),
            other => panic!("expected incomplete, got {other:?}"),
        }
    }

    #[test]
    fn unclosed_quote_and_bracket_are_incomplete() {
        assert_eq!(check_complete("set x \"abc"), Completeness::Incomplete);
        assert_eq!(check_complete("set x [llength"), Completeness::Incomplete);
        assert_eq!(check_complete("set x {}"), Completeness::Complete);
    }

    #[test]
    fn extra_characters_after_close_brace_is_error() {
        match parse_script("set x {a}b") {
            Parsed::Error { message, .. } => {
                assert!(message.contains("close-brace"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn split_list_handles_braces_quotes_and_escapes() {
        assert_eq!(split_list("a {b c} {}").unwrap(), vec!["a", "b c", ""]);
        assert_eq!(split_list("\"x y\" z").unwrap(), vec!["x y", "z"]);
        assert_eq!(split_list("a\\ b").unwrap(), vec!["a b"]);
        assert!(split_list("{unclosed").is_err());
    }

    #[test]
    fn dump_load_round_trips() {
        let script = complete("set x [expr {1 + 2}]");
        let blob = script.dump().unwrap();
        let restored = Script::load(&blob).unwrap();
        assert_eq!(restored.commands().len(), script.commands().len());
    }

    #[test]
    fn array_reference_parses_index_word() {
        let script = complete("set y $a(k$i)");
        let word = &script.commands()[0].words[2];
        match &word.segments[0] {
            Segment::VarRef { name, index } => {
                assert_eq!(name, "a");
                let index = index.as_ref().expect("index word");
                assert!(index.segments.len() >= 2);
            }
            other => panic!("expected varref, got {other:?}"),
        }
    }
}
