//! List, dict, and string command families.

use plume::{ErrKind, Interp, Object};
use pretty_assertions::assert_eq;

// =============================================================================
// 1. Lists
// =============================================================================

/// `list` builds canonical form; `llength` counts elements.
#[test]
fn list_and_llength() {
    let mut interp = Interp::new();
    let result = interp.eval("list a {b c} {}").unwrap();
    assert_eq!(result.canonical(), "a {b c} {}");
    assert_eq!(interp.eval("llength [list a {b c} {}]").unwrap(), Object::Int(3));
}

/// `lindex` supports plain, `end`, and nested indexing.
#[test]
fn lindex_forms() {
    let mut interp = Interp::new();
    interp.eval("set l {a b c d}").unwrap();
    assert_eq!(interp.eval("lindex $l 1").unwrap().canonical(), "b");
    assert_eq!(interp.eval("lindex $l end").unwrap().canonical(), "d");
    assert_eq!(interp.eval("lindex $l end-2").unwrap().canonical(), "b");
    assert_eq!(interp.eval("lindex $l 99").unwrap().canonical(), "");
    assert_eq!(interp.eval("lindex {{a b} {c d}} 1 0").unwrap().canonical(), "c");
}

#[test]
fn lrange_and_linsert_and_lreverse() {
    let mut interp = Interp::new();
    assert_eq!(interp.eval("lrange {a b c d e} 1 3").unwrap().canonical(), "b c d");
    assert_eq!(interp.eval("lrange {a b c} 1 end").unwrap().canonical(), "b c");
    assert_eq!(interp.eval("linsert {a d} 1 b c").unwrap().canonical(), "a b c d");
    assert_eq!(interp.eval("lreverse {1 2 3}").unwrap().canonical(), "3 2 1");
}

/// `lappend` grows a variable's list and creates it when missing.
#[test]
fn lappend_grows_variable() {
    let mut interp = Interp::new();
    interp.eval("lappend acc a").unwrap();
    interp.eval("lappend acc b {c d}").unwrap();
    assert_eq!(interp.eval("set acc").unwrap().canonical(), "a b {c d}");
}

#[test]
fn join_split_concat() {
    let mut interp = Interp::new();
    assert_eq!(interp.eval("join {a b c} -").unwrap().canonical(), "a-b-c");
    assert_eq!(interp.eval("join {a b}").unwrap().canonical(), "a b");
    assert_eq!(interp.eval("split a,b,,c ,").unwrap().canonical(), "a b {} c");
    assert_eq!(interp.eval("llength [split \"x y\"]").unwrap(), Object::Int(2));
    assert_eq!(interp.eval("concat {a b} {} { c }").unwrap().canonical(), "a b c");
}

// =============================================================================
// 2. lsort
// =============================================================================

#[test]
fn lsort_modes() {
    let mut interp = Interp::new();
    assert_eq!(interp.eval("lsort {banana apple cherry}").unwrap().canonical(), "apple banana cherry");
    assert_eq!(interp.eval("lsort -integer -decreasing {1 3 2}").unwrap().canonical(), "3 2 1");
    assert_eq!(interp.eval("lsort -integer {10 9 2}").unwrap().canonical(), "2 9 10");
    assert_eq!(interp.eval("lsort -real {2.5 1.5 10.25}").unwrap().canonical(), "1.5 2.5 10.25");
    assert_eq!(interp.eval("lsort -nocase {b A c}").unwrap().canonical(), "A b c");
    assert_eq!(interp.eval("lsort -unique {b a b c a}").unwrap().canonical(), "a b c");
}

/// Sorting is stable: equal keys keep their relative order.
#[test]
fn lsort_stability() {
    let mut interp = Interp::new();
    // compare only the first character; the digit suffix shows input order
    interp
        .eval("proc bychar {a b} {string compare [string index $a 0] [string index $b 0]}")
        .unwrap();
    let result = interp.eval("lsort -command bychar {b1 a1 b2 a2 b3}").unwrap();
    assert_eq!(result.canonical(), "a1 a2 b1 b2 b3");
}

/// A comparator script drives the ordering.
#[test]
fn lsort_with_command() {
    let mut interp = Interp::new();
    interp.eval("proc desc {a b} {expr {$b - $a}}").unwrap();
    assert_eq!(interp.eval("lsort -command desc {1 3 2}").unwrap().canonical(), "3 2 1");
}

/// Non-numeric input in numeric mode reports a wrong-type error.
#[test]
fn lsort_wrong_type() {
    let mut interp = Interp::new();
    let exc = interp.eval("lsort -integer {1 pear 2}").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::WrongType);
}

// =============================================================================
// 3. Dicts
// =============================================================================

/// `dict create`/`get`/`keys`: insertion order, lookup.
#[test]
fn dict_create_get_keys() {
    let mut interp = Interp::new();
    interp.eval("set d [dict create a 1 b 2]").unwrap();
    assert_eq!(interp.eval("dict get $d a").unwrap().canonical(), "1");
    assert_eq!(interp.eval("dict keys $d").unwrap().canonical(), "a b");
    assert_eq!(interp.eval("dict values $d").unwrap().canonical(), "1 2");
    assert_eq!(interp.eval("dict size $d").unwrap(), Object::Int(2));
}

/// Overwriting keeps position; removal drops from the order.
#[test]
fn dict_order_semantics() {
    let mut interp = Interp::new();
    interp.eval("set d [dict create a 1 b 2 c 3]").unwrap();
    interp.eval("dict set d a 9").unwrap();
    assert_eq!(interp.eval("dict keys $d").unwrap().canonical(), "a b c");
    assert_eq!(interp.eval("dict get $d a").unwrap().canonical(), "9");
    interp.eval("set d [dict remove $d b]").unwrap();
    assert_eq!(interp.eval("dict keys $d").unwrap().canonical(), "a c");
}

/// `dict set` with nested keys rebuilds the path copy-on-write.
#[test]
fn dict_nested_set_and_get() {
    let mut interp = Interp::new();
    interp.eval("dict set cfg server host localhost").unwrap();
    interp.eval("dict set cfg server port 8080").unwrap();
    assert_eq!(interp.eval("dict get $cfg server host").unwrap().canonical(), "localhost");
    assert_eq!(interp.eval("dict get $cfg server port").unwrap().canonical(), "8080");
}

/// `dict exists` answers without erroring; `dict get` errors on a
/// missing key.
#[test]
fn dict_exists_and_missing_keys() {
    let mut interp = Interp::new();
    interp.eval("set d [dict create a 1]").unwrap();
    assert_eq!(interp.eval("dict exists $d a").unwrap(), Object::Int(1));
    assert_eq!(interp.eval("dict exists $d z").unwrap(), Object::Int(0));
    let exc = interp.eval("dict get $d z").unwrap_err();
    assert!(exc.message().contains("not known in dictionary"));
}

/// Dicts shimmer from their flat-list string form; odd lengths fail.
#[test]
fn dict_from_string() {
    let mut interp = Interp::new();
    interp.eval("set d {a 1 b 2}").unwrap();
    assert_eq!(interp.eval("dict get $d b").unwrap().canonical(), "2");
    let exc = interp.eval("dict get {a 1 b} a").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::WrongType);
    assert!(exc.message().contains("missing value"));
}

/// `dict for` iterates in insertion order.
#[test]
fn dict_for_iterates_in_order() {
    let mut interp = Interp::new();
    let result = interp
        .eval("set out {}\ndict for {k v} {a 1 b 2 c 3} {lappend out $k=$v}\nset out")
        .unwrap();
    assert_eq!(result.canonical(), "a=1 b=2 c=3");
}

// =============================================================================
// 4. Strings
// =============================================================================

#[test]
fn string_family() {
    let mut interp = Interp::new();
    assert_eq!(interp.eval("string length héllo").unwrap(), Object::Int(5));
    assert_eq!(interp.eval("string index abcdef 2").unwrap().canonical(), "c");
    assert_eq!(interp.eval("string index abcdef end").unwrap().canonical(), "f");
    assert_eq!(interp.eval("string range abcdef 1 3").unwrap().canonical(), "bcd");
    assert_eq!(interp.eval("string toupper abc").unwrap().canonical(), "ABC");
    assert_eq!(interp.eval("string tolower AbC").unwrap().canonical(), "abc");
    assert_eq!(interp.eval("string trim {  padded  }").unwrap().canonical(), "padded");
    assert_eq!(interp.eval("string trimleft xxabc x").unwrap().canonical(), "abc");
    assert_eq!(interp.eval("string repeat ab 3").unwrap().canonical(), "ababab");
    assert_eq!(interp.eval("string first cd abcdef").unwrap(), Object::Int(2));
    assert_eq!(interp.eval("string first zz abcdef").unwrap(), Object::Int(-1));
}

#[test]
fn string_compare_equal_match() {
    let mut interp = Interp::new();
    assert_eq!(interp.eval("string equal a a").unwrap(), Object::Int(1));
    assert_eq!(interp.eval("string equal -nocase A a").unwrap(), Object::Int(1));
    assert_eq!(interp.eval("string compare a b").unwrap(), Object::Int(-1));
    assert_eq!(interp.eval("string compare b a").unwrap(), Object::Int(1));
    assert_eq!(interp.eval("string match {f*o} foo").unwrap(), Object::Int(1));
    assert_eq!(interp.eval("string match {f?o} foo").unwrap(), Object::Int(1));
    assert_eq!(interp.eval("string match {[a-c]*} beta").unwrap(), Object::Int(1));
    assert_eq!(interp.eval("string match {f*o} bar").unwrap(), Object::Int(0));
}
