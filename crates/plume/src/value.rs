use crate::{dict::Dict, heap::ObjId};

/// A value in the object store.
///
/// Every argument, variable binding, and command result is an `Obj`. An `Obj`
/// carries up to five cached representations; any subset may be valid at a
/// time, and all valid representations agree under canonical conversion. A
/// missing representation is materialized on demand ("shimmering") by the
/// arena accessors and cached; mutating a derived representation invalidates
/// the cached string form until it is regenerated.
///
/// Values are immutable from the script's perspective: commands return new
/// objects, and the in-place mutators are only applied to objects the engine
/// knows are unshared (freshly built results).
#[derive(Debug, Default, Clone)]
pub(crate) struct Obj {
    /// Cached canonical string form.
    pub string: Option<String>,
    pub int: Option<i64>,
    pub double: Option<f64>,
    /// Ordered sequence of object handles.
    pub list: Option<Vec<ObjId>>,
    /// Insertion-ordered string-keyed mapping.
    pub dict: Option<Dict>,
    /// Foreign-instance handle for objects naming a live foreign instance.
    pub foreign: Option<u32>,
}

impl Obj {
    pub fn from_string(s: String) -> Self {
        Self {
            string: Some(s),
            ..Self::default()
        }
    }

    pub fn from_int(i: i64) -> Self {
        Self {
            int: Some(i),
            ..Self::default()
        }
    }

    pub fn from_double(d: f64) -> Self {
        Self {
            double: Some(d),
            ..Self::default()
        }
    }

    pub fn from_list(items: Vec<ObjId>) -> Self {
        Self {
            list: Some(items),
            ..Self::default()
        }
    }

    pub fn from_dict(dict: Dict) -> Self {
        Self {
            dict: Some(dict),
            ..Self::default()
        }
    }

    /// Clears every cached representation other than the list.
    ///
    /// Called after an in-place list mutation: the string form (and anything
    /// derived from it) no longer agrees and must be regenerated on demand.
    pub fn invalidate_for_list_change(&mut self) {
        self.string = None;
        self.int = None;
        self.double = None;
        self.dict = None;
    }
}

/// Canonical string form of an integer.
pub(crate) fn fmt_int(i: i64) -> String {
    i.to_string()
}

/// Canonical string form of a double.
///
/// Finite values use the shortest round-trip form; infinities and NaN use
/// the spellings the numeric parser accepts back.
pub(crate) fn fmt_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_owned();
    }
    if d.is_infinite() {
        return if d > 0.0 { "Inf".to_owned() } else { "-Inf".to_owned() };
    }
    let mut buf = ryu::Buffer::new();
    buf.format(d).to_owned()
}

/// Parses an integer in script syntax: optional sign, then decimal or a
/// `0x`/`0o`/`0b` prefixed radix form. The whole (trimmed) string must be
/// consumed; anything else is not an integer.
pub(crate) fn parse_int(text: &str) -> Option<i64> {
    let s = text.trim_ascii();
    if s.is_empty() {
        return None;
    }
    let (negative, rest) = match s.as_bytes()[0] {
        b'+' => (false, &s[1..]),
        b'-' => (true, &s[1..]),
        _ => (false, s),
    };
    if rest.is_empty() {
        return None;
    }
    let (radix, digits) = match rest.as_bytes() {
        [b'0', b'x' | b'X', ..] => (16, &rest[2..]),
        [b'0', b'o' | b'O', ..] => (8, &rest[2..]),
        [b'0', b'b' | b'B', ..] => (2, &rest[2..]),
        _ => (10, rest),
    };
    if digits.is_empty() {
        return None;
    }
    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    if negative {
        // allow -(2^63)
        if magnitude > (i64::MAX as u64) + 1 {
            return None;
        }
        Some((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).ok()
    }
}

/// Parses a double in script syntax. Integer syntax is accepted and
/// converted; `Inf`/`NaN` spellings (any case) are accepted.
pub(crate) fn parse_double(text: &str) -> Option<f64> {
    let s = text.trim_ascii();
    if s.is_empty() {
        return None;
    }
    if let Some(i) = parse_int(s) {
        return Some(i as f64);
    }
    // reject forms Rust accepts but scripts don't write
    if s.contains(['x', 'X']) {
        return None;
    }
    s.parse::<f64>().ok()
}

fn braces_balanced(s: &str) -> bool {
    let mut depth: i64 = 0;
    let mut bytes = s.bytes();
    while let Some(b) = bytes.next() {
        match b {
            b'\\' => {
                let _ = bytes.next();
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s.starts_with('#')
        || s.contains([
            ' ', '\t', '\n', '\r', '\x0b', '\x0c', ';', '"', '{', '}', '[', ']', '$', '\\',
        ])
}

/// Appends one list element to `out` in canonical form.
///
/// Elements that contain whitespace or syntax characters are wrapped in
/// braces when their braces balance, otherwise backslash-quoted. The output
/// re-parses to the identical element.
pub(crate) fn quote_element(element: &str, out: &mut String) {
    if element.is_empty() {
        out.push_str("{}");
        return;
    }
    if !needs_quoting(element) {
        out.push_str(element);
        return;
    }
    if braces_balanced(element) && !element.ends_with('\\') && !element.contains('\n') {
        out.push('{');
        out.push_str(element);
        out.push('}');
        return;
    }
    for c in element.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            ' ' | ';' | '"' | '{' | '}' | '[' | ']' | '$' | '\\' | '#' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
}
