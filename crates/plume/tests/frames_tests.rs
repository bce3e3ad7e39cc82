//! Call frames, variable linkage (`upvar`, `global`, `uplevel`), and
//! variable traces.

use plume::{Interp, Object};

// =============================================================================
// 1. upvar and global
// =============================================================================

/// `upvar` links a caller variable into the procedure frame.
#[test]
fn upvar_links_to_caller() {
    let mut interp = Interp::new();
    interp.eval("proc bump {name} {upvar 1 $name v; incr v}").unwrap();
    interp.eval("set counter 5").unwrap();
    assert_eq!(interp.eval("bump counter").unwrap(), Object::Int(6));
    assert_eq!(interp.eval("set counter").unwrap(), Object::Int(6));
}

/// Writes through the link are visible through the target, and later
/// target changes are seen through the link.
#[test]
fn upvar_is_a_live_link() {
    let mut interp = Interp::new();
    interp
        .eval("proc poke {} {upvar 1 shared s; set s poked; set s}")
        .unwrap();
    interp.eval("set shared before").unwrap();
    assert_eq!(interp.eval("poke").unwrap().canonical(), "poked");
    assert_eq!(interp.eval("set shared").unwrap().canonical(), "poked");
}

/// `upvar` with `#0` targets the global frame from any depth.
#[test]
fn upvar_absolute_level() {
    let mut interp = Interp::new();
    interp
        .eval("proc deep {} {upvar #0 g v; set v fromdeep}\nproc mid {} {deep}")
        .unwrap();
    interp.eval("mid").unwrap();
    assert_eq!(interp.eval("set g").unwrap().canonical(), "fromdeep");
}

/// Chained links resolve to the ultimate target.
#[test]
fn upvar_chains() {
    let mut interp = Interp::new();
    interp
        .eval(concat!(
            "proc outer {} {upvar 1 x a; inner}\n",
            "proc inner {} {upvar 2 x b; set b linked}\n",
        ))
        .unwrap();
    interp.eval("set x start; outer").unwrap();
    assert_eq!(interp.eval("set x").unwrap().canonical(), "linked");
}

/// `global` is upvar to level 0.
#[test]
fn global_command() {
    let mut interp = Interp::new();
    interp.eval("set g 1").unwrap();
    interp.eval("proc readg {} {global g; set g}").unwrap();
    assert_eq!(interp.eval("readg").unwrap().canonical(), "1");
    interp.eval("proc writeg {} {global g; set g 2}").unwrap();
    interp.eval("writeg").unwrap();
    assert_eq!(interp.eval("set g").unwrap().canonical(), "2");
}

/// Without linkage, procedure variables are frame-local.
#[test]
fn locals_do_not_leak() {
    let mut interp = Interp::new();
    interp.eval("proc f {} {set local inside}").unwrap();
    interp.eval("f").unwrap();
    assert!(interp.eval("set local").is_err());
}

// =============================================================================
// 2. uplevel
// =============================================================================

/// `uplevel 1` evaluates in the caller's frame.
#[test]
fn uplevel_evaluates_in_caller() {
    let mut interp = Interp::new();
    interp.eval("proc setter {} {uplevel 1 {set made here}}").unwrap();
    interp.eval("setter").unwrap();
    assert_eq!(interp.eval("set made").unwrap().canonical(), "here");
}

/// `uplevel #0` reaches the global frame from nested procedures.
#[test]
fn uplevel_global() {
    let mut interp = Interp::new();
    interp
        .eval("proc a {} {b}\nproc b {} {uplevel #0 {set gtop 9}}")
        .unwrap();
    interp.eval("a").unwrap();
    assert_eq!(interp.eval("set gtop").unwrap().canonical(), "9");
}

/// Procedures called during `uplevel` still resolve their own frames, and
/// the active frame is restored afterwards.
#[test]
fn uplevel_restores_active_frame() {
    let mut interp = Interp::new();
    interp
        .eval(concat!(
            "proc helper {} {set h inhelper}\n",
            "proc runner {} {\n",
            "  set mine local\n",
            "  uplevel 1 {helper}\n",
            "  set mine\n",
            "}\n",
        ))
        .unwrap();
    assert_eq!(interp.eval("runner").unwrap().canonical(), "local");
}

// =============================================================================
// 3. Variable traces
// =============================================================================

/// Write traces fire after assignment and observe the new value.
#[test]
fn write_trace_fires() {
    let mut interp = Interp::new();
    interp.eval("set log {}").unwrap();
    interp
        .eval("trace add variable x {write} {lappend log}")
        .unwrap();
    interp.eval("set x first").unwrap();
    interp.eval("set x second").unwrap();
    // each firing appends: name, element (empty), operation
    assert_eq!(
        interp.eval("set log").unwrap().canonical(),
        "x {} write x {} write"
    );
}

/// Read traces fire on variable reads.
#[test]
fn read_trace_fires() {
    let mut interp = Interp::new();
    interp.eval("set hits 0; set y 1").unwrap();
    interp
        .eval("trace add variable y {read} {incr hits; list}")
        .unwrap();
    interp.eval("set y").unwrap();
    interp.eval("set y").unwrap();
    assert_eq!(interp.eval("set hits").unwrap(), Object::Int(2));
}

/// The trace script can see the traced variable's new value.
#[test]
fn write_trace_observes_new_value() {
    let mut interp = Interp::new();
    interp
        .eval("trace add variable watched {write} {global watched seen; set seen $watched; list}")
        .unwrap();
    interp.eval("set watched 41").unwrap();
    interp.eval("set watched 42").unwrap();
    assert_eq!(interp.eval("set seen").unwrap().canonical(), "42");
}

/// Unset traces fire when the variable is removed.
#[test]
fn unset_trace_fires() {
    let mut interp = Interp::new();
    interp.eval("set z 1").unwrap();
    interp
        .eval("trace add variable z {unset} {set unset_fired 1; list}")
        .unwrap();
    interp.eval("unset z").unwrap();
    assert_eq!(interp.eval("set unset_fired").unwrap().canonical(), "1");
}

/// Traces fire in registration order.
#[test]
fn traces_fire_in_registration_order() {
    let mut interp = Interp::new();
    interp.eval("set order {}").unwrap();
    interp.eval("trace add variable t {write} {lappend order one; list}").unwrap();
    interp.eval("trace add variable t {write} {lappend order two; list}").unwrap();
    interp.eval("set t go").unwrap();
    assert_eq!(interp.eval("set order").unwrap().canonical(), "one two");
}

/// `trace remove` detaches a trace; `trace info` lists what remains.
#[test]
fn trace_remove_and_info() {
    let mut interp = Interp::new();
    interp.eval("set n 0; set v 1").unwrap();
    interp.eval("trace add variable v {write} {incr n; list}").unwrap();
    interp.eval("set v 2").unwrap();
    interp.eval("trace remove variable v {write} {incr n; list}").unwrap();
    interp.eval("set v 3").unwrap();
    assert_eq!(interp.eval("set n").unwrap(), Object::Int(1));
    assert_eq!(interp.eval("llength [trace info variable v]").unwrap(), Object::Int(0));
}

/// An erroring write trace aborts the assignment with its error.
#[test]
fn write_trace_error_propagates() {
    let mut interp = Interp::new();
    interp.eval("proc deny {args} {error \"write denied\"}").unwrap();
    interp.eval("trace add variable guarded {write} deny").unwrap();
    let code = interp.eval("catch {set guarded 1} msg").unwrap();
    assert_eq!(code, Object::Int(1));
    assert!(interp.get_var("msg").unwrap().canonical().contains("write denied"));
}
