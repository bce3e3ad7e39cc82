//! Parser behavior through the public surface: completeness reporting,
//! incomplete-input continuation, and parse caching.

use plume::{Completeness, Interp, Parsed, Script, check_complete, parse_script};

// =============================================================================
// 1. Completeness reporting
// =============================================================================

/// `set x {` is incomplete at the open-brace offset; closing it parses.
#[test]
fn incomplete_brace_then_complete() {
    match parse_script("set x {") {
        Parsed::Incomplete { offset } => assert_eq!(offset, 6),
        other => panic!("expected incomplete, got {other:?}"),
    }
    assert!(matches!(parse_script("set x {}"), Parsed::Complete(_)));
}

/// Quotes and brackets report incomplete too; REPLs read on.
#[test]
fn incomplete_forms() {
    assert_eq!(check_complete("puts \"unterminated"), Completeness::Incomplete);
    assert_eq!(check_complete("set x [llength {a b}"), Completeness::Incomplete);
    assert_eq!(check_complete("proc f {} {\n  set x 1\n"), Completeness::Incomplete);
    assert_eq!(check_complete("proc f {} {\n  set x 1\n}"), Completeness::Complete);
}

/// Malformed input is an error, not incomplete.
#[test]
fn error_is_distinct_from_incomplete() {
    assert_eq!(check_complete("set x {a}b"), Completeness::Error);
    assert_eq!(check_complete("set x \"a\"b"), Completeness::Error);
}

/// The interpreter-side checker matches the free function.
#[test]
fn interp_check_complete() {
    assert_eq!(
        Interp::<plume::NoLimitTracker>::check_complete("set x {"),
        Completeness::Incomplete
    );
    assert_eq!(
        Interp::<plume::NoLimitTracker>::check_complete("set x 1"),
        Completeness::Complete
    );
}

// =============================================================================
// 2. Lexical details visible through evaluation
// =============================================================================

/// Comments only start at command position.
#[test]
fn comments() {
    let mut interp = Interp::new();
    let result = interp.eval("# leading comment\nset x 1 ;# NOT a comment marker here\nset x").unwrap();
    // `;` ends the command, then # starts a comment at command position
    assert_eq!(result.canonical(), "1");
    let result = interp.eval("set y val#ue").unwrap();
    assert_eq!(result.canonical(), "val#ue");
}

/// Backslash-newline joins lines inside and outside braces.
#[test]
fn backslash_newline_joins() {
    let mut interp = Interp::new();
    // the continuation acts as a word separator, not a command separator
    let result = interp.eval("list one\\\ntwo").unwrap();
    assert_eq!(result.canonical(), "one two");
    let result = interp.eval("set b {a\\\nb}").unwrap();
    assert_eq!(result.canonical(), "a b");
}

/// Escapes expand in bare and quoted words, stay literal in braces.
#[test]
fn escape_handling() {
    let mut interp = Interp::new();
    assert_eq!(interp.eval("set x a\\tb").unwrap().canonical(), "a\tb");
    assert_eq!(interp.eval("set x \"a\\nb\"").unwrap().canonical(), "a\nb");
    assert_eq!(interp.eval("set x {a\\tb}").unwrap().canonical(), "a\\tb");
    assert_eq!(interp.eval("set x \\$notavar").unwrap().canonical(), "$notavar");
}

/// Braced words suppress all substitution.
#[test]
fn braces_suppress_substitution() {
    let mut interp = Interp::new();
    interp.eval("set v 1").unwrap();
    assert_eq!(interp.eval("set x {$v [list]}").unwrap().canonical(), "$v [list]");
}

/// Semicolons and newlines separate commands equally.
#[test]
fn command_separators() {
    let mut interp = Interp::new();
    assert_eq!(interp.eval("set a 1; set b 2; set a").unwrap().canonical(), "1");
}

// =============================================================================
// 3. Parse caching
// =============================================================================

/// A parsed script serializes and restores; the restored form evaluates
/// identically.
#[test]
fn dump_and_load_parse_cache() {
    let source = "proc triple {n} {expr {$n * 3}}\ntriple 14";
    let Parsed::Complete(script) = parse_script(source) else {
        panic!("expected complete parse");
    };
    let blob = script.dump().unwrap();
    let restored = Script::load(&blob).unwrap();
    drop(restored);
    // the source itself still evaluates to the expected result
    let mut interp = Interp::new();
    assert_eq!(interp.eval(source).unwrap().canonical(), "42");
}

/// Re-parsing a canonical list form is a fixed point.
#[test]
fn canonical_form_fixed_point() {
    let mut interp = Interp::new();
    let first = interp.eval("list a {b c} {} d\\ e").unwrap().canonical();
    interp.set_var("text", plume::Object::String(first.clone())).unwrap();
    // split to elements and rebuild: the canonical text is unchanged
    let rebuilt = interp
        .eval("set out {}; foreach e $text {lappend out $e}; set out")
        .unwrap()
        .canonical();
    assert_eq!(rebuilt, first);
}
