//! Built-in commands, grouped by family and registered into the unified
//! command table at interpreter construction.

mod control;
mod dict;
mod info;
mod list;
mod string;
mod var;

use crate::{
    error::{Flow, Raise},
    interp::Interp,
    registry::{CommandKind, Registry},
    resource::ResourceTracker,
};

pub(crate) fn register_all<T: ResourceTracker>(registry: &mut Registry<T>) {
    // variables and frames
    registry.register("set", CommandKind::Builtin(var::cmd_set));
    registry.register("unset", CommandKind::Builtin(var::cmd_unset));
    registry.register("incr", CommandKind::Builtin(var::cmd_incr));
    registry.register("append", CommandKind::Builtin(var::cmd_append));
    registry.register("global", CommandKind::Builtin(var::cmd_global));
    registry.register("upvar", CommandKind::Builtin(var::cmd_upvar));
    registry.register("uplevel", CommandKind::Builtin(var::cmd_uplevel));
    registry.register("eval", CommandKind::Builtin(var::cmd_eval));
    registry.register("trace", CommandKind::Builtin(var::cmd_trace));
    // control flow
    registry.register("if", CommandKind::Builtin(control::cmd_if));
    registry.register("while", CommandKind::Builtin(control::cmd_while));
    registry.register("for", CommandKind::Builtin(control::cmd_for));
    registry.register("foreach", CommandKind::Builtin(control::cmd_foreach));
    registry.register("break", CommandKind::Builtin(control::cmd_break));
    registry.register("continue", CommandKind::Builtin(control::cmd_continue));
    registry.register("proc", CommandKind::Builtin(control::cmd_proc));
    registry.register("return", CommandKind::Builtin(control::cmd_return));
    registry.register("catch", CommandKind::Builtin(control::cmd_catch));
    registry.register("error", CommandKind::Builtin(control::cmd_error));
    registry.register("expr", CommandKind::Builtin(control::cmd_expr));
    // lists
    registry.register("list", CommandKind::Builtin(list::cmd_list));
    registry.register("llength", CommandKind::Builtin(list::cmd_llength));
    registry.register("lindex", CommandKind::Builtin(list::cmd_lindex));
    registry.register("lrange", CommandKind::Builtin(list::cmd_lrange));
    registry.register("lappend", CommandKind::Builtin(list::cmd_lappend));
    registry.register("linsert", CommandKind::Builtin(list::cmd_linsert));
    registry.register("lreverse", CommandKind::Builtin(list::cmd_lreverse));
    registry.register("lsort", CommandKind::Builtin(list::cmd_lsort));
    registry.register("concat", CommandKind::Builtin(list::cmd_concat));
    registry.register("join", CommandKind::Builtin(list::cmd_join));
    registry.register("split", CommandKind::Builtin(list::cmd_split));
    // dicts
    registry.register("dict", CommandKind::Builtin(dict::cmd_dict));
    // strings
    registry.register("string", CommandKind::Builtin(string::cmd_string));
    // introspection
    registry.register("info", CommandKind::Builtin(info::cmd_info));
    registry.register("rename", CommandKind::Builtin(info::cmd_rename));
}

/// Builds the standard arity error.
pub(super) fn wrong_args(usage: &str) -> Flow {
    Raise::wrong_num_args(usage).into()
}

/// Parses a list index: an integer, `end`, or `end-N`/`end+N`.
pub(super) fn parse_list_index(text: &str, len: usize) -> Result<i64, Raise> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("end") {
        let end = len as i64 - 1;
        if rest.is_empty() {
            return Ok(end);
        }
        if let Some(delta) = crate::value::parse_int(rest)
            && (rest.starts_with('-') || rest.starts_with('+'))
        {
            return Ok(end + delta);
        }
        return Err(Raise::wrong_type(format!("bad index \"{text}\": must be integer or end?[+-]integer?")));
    }
    crate::value::parse_int(text)
        .ok_or_else(|| Raise::wrong_type(format!("bad index \"{text}\": must be integer or end?[+-]integer?")))
}

/// Resolves an optional frame-level word (`#N` absolute, `N` relative to
/// the active frame). Returns `None` when the word is not a level spec.
pub(super) fn parse_level_spec<T: ResourceTracker>(interp: &Interp<T>, spec: &str) -> Option<usize> {
    if let Some(abs) = spec.strip_prefix('#') {
        let level: usize = abs.parse().ok()?;
        return Some(level);
    }
    if !spec.is_empty() && spec.bytes().all(|b| b.is_ascii_digit()) {
        let up: usize = spec.parse().ok()?;
        return interp.frames.active_level().checked_sub(up);
    }
    None
}

/// Glob matching with `*`, `?`, `[...]` classes, and backslash escapes.
pub(super) fn glob_match(pattern: &str, text: &str, nocase: bool) -> bool {
    let pat: Vec<char> = if nocase {
        pattern.chars().flat_map(char::to_lowercase).collect()
    } else {
        pattern.chars().collect()
    };
    let txt: Vec<char> = if nocase {
        text.chars().flat_map(char::to_lowercase).collect()
    } else {
        text.chars().collect()
    };
    glob_inner(&pat, &txt)
}

fn glob_inner(pat: &[char], txt: &[char]) -> bool {
    if pat.is_empty() {
        return txt.is_empty();
    }
    match pat[0] {
        '*' => {
            let rest = &pat[1..];
            (0..=txt.len()).any(|skip| glob_inner(rest, &txt[skip..]))
        }
        '?' => !txt.is_empty() && glob_inner(&pat[1..], &txt[1..]),
        '[' => {
            let Some(close) = pat.iter().position(|&c| c == ']') else {
                return !txt.is_empty() && txt[0] == '[' && glob_inner(&pat[1..], &txt[1..]);
            };
            if txt.is_empty() {
                return false;
            }
            let class = &pat[1..close];
            if class_matches(class, txt[0]) {
                glob_inner(&pat[close + 1..], &txt[1..])
            } else {
                false
            }
        }
        '\\' if pat.len() > 1 => !txt.is_empty() && txt[0] == pat[1] && glob_inner(&pat[2..], &txt[1..]),
        c => !txt.is_empty() && txt[0] == c && glob_inner(&pat[1..], &txt[1..]),
    }
}

fn class_matches(class: &[char], c: char) -> bool {
    let mut i = 0;
    while i < class.len() {
        if i + 2 < class.len() && class[i + 1] == '-' {
            if (class[i]..=class[i + 2]).contains(&c) {
                return true;
            }
            i += 3;
        } else {
            if class[i] == c {
                return true;
            }
            i += 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_index_forms() {
        assert_eq!(parse_list_index("2", 5).unwrap(), 2);
        assert_eq!(parse_list_index("end", 5).unwrap(), 4);
        assert_eq!(parse_list_index("end-2", 5).unwrap(), 2);
        assert!(parse_list_index("pear", 5).is_err());
    }

    #[test]
    fn glob_patterns() {
        assert!(glob_match("a*c", "abc", false));
        assert!(glob_match("a?c", "abc", false));
        assert!(glob_match("[a-c]x", "bx", false));
        assert!(!glob_match("a*d", "abc", false));
        assert!(glob_match("ABC", "abc", true));
        assert!(glob_match("l*", "llength", false));
    }
}
