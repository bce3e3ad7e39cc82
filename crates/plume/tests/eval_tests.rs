//! Core evaluation behavior: variables, procedures, control flow, errors,
//! and the unified command table, exercised through the public `Interp`
//! surface.

use plume::{ErrKind, Interp, Object, ResourceLimits};

// =============================================================================
// 1. Variables and simple commands
// =============================================================================

/// `set x 1; set x` leaves "1" in the variable and returns it.
#[test]
fn set_and_read_back() {
    let mut interp = Interp::new();
    let result = interp.eval("set x 1; set x").unwrap();
    assert_eq!(result.canonical(), "1");
}

/// A script's result is the result of its last command.
#[test]
fn result_is_last_command() {
    let mut interp = Interp::new();
    let result = interp.eval("set a 10\nset b 20").unwrap();
    assert_eq!(result.canonical(), "20");
}

/// Reading an unset variable is a name error.
#[test]
fn reading_missing_variable_fails() {
    let mut interp = Interp::new();
    let exc = interp.eval("set nosuch").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::NameError);
    assert!(exc.message().contains("can't read \"nosuch\""));
}

/// `unset` removes a variable; `-nocomplain` tolerates absence.
#[test]
fn unset_variable() {
    let mut interp = Interp::new();
    interp.eval("set x 5; unset x").unwrap();
    assert!(interp.eval("set x").is_err());
    interp.eval("unset -nocomplain x").unwrap();
    assert!(interp.eval("unset x").is_err());
}

/// `incr` defaults to 1, accepts an explicit increment, and auto-creates.
#[test]
fn incr_semantics() {
    let mut interp = Interp::new();
    assert_eq!(interp.eval("incr fresh").unwrap(), Object::Int(1));
    assert_eq!(interp.eval("incr fresh 9").unwrap(), Object::Int(10));
    let exc = interp.eval("set s pear; incr s").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::WrongType);
}

/// `append` concatenates onto a variable, creating it when missing.
#[test]
fn append_builds_strings() {
    let mut interp = Interp::new();
    let result = interp.eval("append out a b c; append out !").unwrap();
    assert_eq!(result.canonical(), "abc!");
}

/// Array-style element access reads and writes through dict-valued
/// variables.
#[test]
fn array_element_syntax() {
    let mut interp = Interp::new();
    interp.eval("set a(x) 1; set a(y) 2").unwrap();
    assert_eq!(interp.eval("set a(x)").unwrap().canonical(), "1");
    assert_eq!(interp.eval("set i y; set a($i)").unwrap().canonical(), "2");
    let exc = interp.eval("set a(missing)").unwrap_err();
    assert!(exc.message().contains("no such element"));
}

/// Host-side variable access promotes values into the interpreter.
#[test]
fn host_variable_access() {
    let mut interp = Interp::new();
    interp.set_var("n", Object::Int(21)).unwrap();
    assert_eq!(interp.eval("expr {$n * 2}").unwrap(), Object::Int(42));
    interp.eval("set greeting hello").unwrap();
    assert_eq!(interp.get_var("greeting").unwrap().canonical(), "hello");
}

// =============================================================================
// 2. Procedures
// =============================================================================

/// `proc add {a b} {expr {$a + $b}}; add 2 3` returns 5.
#[test]
fn define_and_call_procedure() {
    let mut interp = Interp::new();
    let result = interp.eval("proc add {a b} {expr {$a + $b}}\nadd 2 3").unwrap();
    assert_eq!(result, Object::Int(5));
}

/// Defaults fill missing optional parameters.
#[test]
fn procedure_defaults() {
    let mut interp = Interp::new();
    interp.eval("proc greet {name {greeting hi}} {list $greeting $name}").unwrap();
    assert_eq!(interp.eval("greet sam").unwrap().canonical(), "hi sam");
    assert_eq!(interp.eval("greet sam yo").unwrap().canonical(), "yo sam");
}

/// A trailing `args` parameter collects the rest as a list.
#[test]
fn variadic_args_parameter() {
    let mut interp = Interp::new();
    interp.eval("proc p {a args} {list $a $args}").unwrap();
    assert_eq!(interp.eval("p 1 2 3 4").unwrap().canonical(), "1 {2 3 4}");
    assert_eq!(interp.eval("p 1").unwrap().canonical(), "1 {}");
}

/// Arity errors use the canonical message shape.
#[test]
fn wrong_number_of_arguments() {
    let mut interp = Interp::new();
    interp.eval("proc add {a b} {expr {$a + $b}}").unwrap();
    let exc = interp.eval("add 1").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::WrongNumArgs);
    assert_eq!(exc.message(), "wrong # args: should be \"add a b\"");
    let exc = interp.eval("add 1 2 3").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::WrongNumArgs);
}

/// A procedure without `return` yields its last command's result; an empty
/// body yields the empty string.
#[test]
fn procedure_result_conventions() {
    let mut interp = Interp::new();
    interp.eval("proc last {} {set x 1; set y 2}").unwrap();
    assert_eq!(interp.eval("last").unwrap().canonical(), "2");
    interp.eval("proc nothing {} {}").unwrap();
    assert_eq!(interp.eval("nothing").unwrap().canonical(), "");
}

/// `return` stops the body and yields its value.
#[test]
fn return_stops_procedure() {
    let mut interp = Interp::new();
    interp.eval("proc f {} {return early; set never reached}").unwrap();
    assert_eq!(interp.eval("f").unwrap().canonical(), "early");
    assert!(interp.eval("set never").is_err());
}

/// `return -code error` surfaces as an error at the call site.
#[test]
fn return_code_error() {
    let mut interp = Interp::new();
    interp.eval("proc f {} {return -code error failed}").unwrap();
    let exc = interp.eval("f").unwrap_err();
    assert_eq!(exc.message(), "failed");
}

/// `return -level 2` unwinds through two procedure boundaries.
#[test]
fn return_level_two() {
    let mut interp = Interp::new();
    interp
        .eval("proc inner {} {return -level 2 deep}\nproc outer {} {inner; return shallow}")
        .unwrap();
    assert_eq!(interp.eval("outer").unwrap().canonical(), "deep");
}

/// Procedures can recurse; results flow back through the frames.
#[test]
fn recursive_procedure() {
    let mut interp = Interp::new();
    interp
        .eval("proc fact {n} {if {$n <= 1} {return 1}; expr {$n * [fact [expr {$n - 1}]]}}")
        .unwrap();
    assert_eq!(interp.eval("fact 10").unwrap(), Object::Int(3_628_800));
}

// =============================================================================
// 3. Control flow
// =============================================================================

/// `if`/`elseif`/`else` pick the first true branch.
#[test]
fn if_elseif_else() {
    let mut interp = Interp::new();
    interp.eval("set x 7").unwrap();
    let result = interp
        .eval("if {$x < 5} {set r low} elseif {$x < 10} {set r mid} else {set r high}")
        .unwrap();
    assert_eq!(result.canonical(), "mid");
}

/// `while` loops until the test fails; `break` and `continue` steer it.
#[test]
fn while_with_break_and_continue() {
    let mut interp = Interp::new();
    let result = interp
        .eval(
            "set total 0\nset i 0\nwhile {1} {\n  incr i\n  if {$i > 10} {break}\n  if {$i % 2} {continue}\n  incr total $i\n}\nset total",
        )
        .unwrap();
    assert_eq!(result, Object::Int(2 + 4 + 6 + 8 + 10));
}

/// `for` runs start/test/next around the body.
#[test]
fn for_loop() {
    let mut interp = Interp::new();
    let result = interp
        .eval("set sum 0\nfor {set i 1} {$i <= 4} {incr i} {incr sum $i}\nset sum")
        .unwrap();
    assert_eq!(result, Object::Int(10));
}

/// `foreach` binds one or more variables per iteration.
#[test]
fn foreach_single_and_multi_var() {
    let mut interp = Interp::new();
    let result = interp
        .eval("set out {}\nforeach x {a b c} {lappend out $x!}\nset out")
        .unwrap();
    assert_eq!(result.canonical(), "a! b! c!");
    let result = interp
        .eval("set pairs {}\nforeach {k v} {a 1 b 2} {lappend pairs $k=$v}\nset pairs")
        .unwrap();
    assert_eq!(result.canonical(), "a=1 b=2");
}

/// `break` outside a loop is a control-flow misuse error.
#[test]
fn break_outside_loop() {
    let mut interp = Interp::new();
    let exc = interp.eval("break").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::ControlFlowMisuse);
    assert_eq!(exc.message(), "invoked \"break\" outside of a loop");
}

// =============================================================================
// 4. Errors, catch, and errorInfo
// =============================================================================

/// `catch {error boom} msg` captures code 1 and binds the message.
#[test]
fn catch_error() {
    let mut interp = Interp::new();
    let result = interp.eval("catch {error boom} msg").unwrap();
    assert_eq!(result, Object::Int(1));
    assert_eq!(interp.get_var("msg").unwrap().canonical(), "boom");
}

/// `catch` reports the full code range: ok, return, break, continue.
#[test]
fn catch_reports_all_codes() {
    let mut interp = Interp::new();
    assert_eq!(interp.eval("catch {set x ok}").unwrap(), Object::Int(0));
    assert_eq!(interp.eval("catch {return r}").unwrap(), Object::Int(2));
    assert_eq!(interp.eval("catch {break}").unwrap(), Object::Int(3));
    assert_eq!(interp.eval("catch {continue}").unwrap(), Object::Int(4));
}

/// Uncaught errors populate errorInfo with the unwind trace and errorCode
/// with NONE by default.
#[test]
fn error_info_and_code_globals() {
    let mut interp = Interp::new();
    interp.eval("proc p {} {error boom}").unwrap();
    let exc = interp.eval("p").unwrap_err();
    assert_eq!(exc.message(), "boom");
    assert!(exc.error_info().contains("while executing"));
    assert!(exc.error_info().contains("invoked from within"));
    let info = interp.get_var("errorInfo").unwrap().canonical();
    assert!(info.starts_with("boom"));
    assert_eq!(interp.get_var("errorCode").unwrap().canonical(), "NONE");
}

/// `error message info code` seeds errorCode.
#[test]
fn error_with_explicit_code() {
    let mut interp = Interp::new();
    let exc = interp.eval("error boom {} {POSIX ENOENT}").unwrap_err();
    assert_eq!(exc.error_code(), "POSIX ENOENT");
}

/// The return-options dictionary reflects the last error.
#[test]
fn return_options_dictionary() {
    let mut interp = Interp::new();
    let _ = interp.eval("error boom").unwrap_err();
    let options = interp.return_options().expect("options recorded");
    let Object::Dict(pairs) = options else {
        panic!("expected dict, got {options:?}");
    };
    assert_eq!(pairs.get("-code").unwrap().canonical(), "1");
    assert_eq!(pairs.get("-errorcode").unwrap().canonical(), "NONE");
    assert!(pairs.get("-errorinfo").unwrap().canonical().starts_with("boom"));
}

/// A parse failure reports as a parse error without evaluating anything.
#[test]
fn parse_error_reported() {
    let mut interp = Interp::new();
    let exc = interp.eval("set x {a}b").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::ParseError);
}

// =============================================================================
// 5. Recursion limit
// =============================================================================

/// A self-recursive procedure hits the recursion-limit error rather than
/// overflowing the host stack.
#[test]
fn recursion_limit_is_a_catchable_error() {
    let mut interp = Interp::with_limits(ResourceLimits::with_recursion_depth(50));
    interp.eval("proc f {} {f}").unwrap();
    let exc = interp.eval("f").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::RecursionLimit);
    let result = interp.eval("catch {f}").unwrap();
    assert_eq!(result, Object::Int(1));
}

/// The default ceiling also fails cleanly, with no host-stack overflow.
#[test]
fn default_recursion_limit() {
    let mut interp = Interp::new();
    interp.eval("proc f {} {f}").unwrap();
    let exc = interp.eval("f").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::RecursionLimit);
}

// =============================================================================
// 6. Command registry: rename, unknown, host commands, info
// =============================================================================

/// `rename` moves a command; renaming to the empty name deletes it.
#[test]
fn rename_and_delete_commands() {
    let mut interp = Interp::new();
    interp.eval("proc hello {} {return hi}").unwrap();
    interp.eval("rename hello howdy").unwrap();
    assert_eq!(interp.eval("howdy").unwrap().canonical(), "hi");
    let exc = interp.eval("hello").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::NameError);
    interp.eval("rename howdy {}").unwrap();
    assert!(interp.eval("howdy").is_err());
}

/// Renaming onto an existing name fails atomically.
#[test]
fn rename_refuses_collision() {
    let mut interp = Interp::new();
    interp.eval("proc a {} {return a}\nproc b {} {return b}").unwrap();
    let exc = interp.eval("rename a b").unwrap_err();
    assert!(exc.message().contains("already exists"));
    assert_eq!(interp.eval("a").unwrap().canonical(), "a");
}

/// A registered `unknown` procedure receives unresolvable command words.
#[test]
fn unknown_handler_fallback() {
    let mut interp = Interp::new();
    interp.eval("proc unknown {args} {return \"unknown: $args\"}").unwrap();
    let result = interp.eval("nosuchcmd a b").unwrap();
    assert_eq!(result.canonical(), "unknown: nosuchcmd a b");
}

/// Without a handler, unresolvable names report the standard error.
#[test]
fn invalid_command_name() {
    let mut interp = Interp::new();
    let exc = interp.eval("definitely-not-a-command").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::NameError);
    assert_eq!(exc.message(), "invalid command name \"definitely-not-a-command\"");
}

/// Host commands join the same table as built-ins and procedures.
#[test]
fn host_command_registration() {
    let mut interp = Interp::new();
    interp.register_command("double", |interp, argv| {
        let n = interp.get_int(argv[1])?;
        interp.alloc_int(n * 2)
    });
    assert_eq!(interp.eval("double 21").unwrap(), Object::Int(42));
    // visible to introspection alongside everything else
    let commands = interp.eval("info commands double").unwrap();
    assert_eq!(commands.canonical(), "double");
}

/// `info` reports commands, procs, variables, and existence.
#[test]
fn info_introspection() {
    let mut interp = Interp::new();
    interp.eval("proc myproc {} {}").unwrap();
    interp.eval("set myvar 1").unwrap();
    assert_eq!(interp.eval("info procs my*").unwrap().canonical(), "myproc");
    assert_eq!(interp.eval("info exists myvar").unwrap(), Object::Int(1));
    assert_eq!(interp.eval("info exists novar").unwrap(), Object::Int(0));
    let commands = interp.eval("info commands lso*").unwrap();
    assert_eq!(commands.canonical(), "lsort");
    assert_eq!(interp.eval("info level").unwrap(), Object::Int(0));
}

/// `info level N` inside a procedure reports the invocation words.
#[test]
fn info_level_reports_invocation() {
    let mut interp = Interp::new();
    interp.eval("proc p {a b} {info level 1}").unwrap();
    assert_eq!(interp.eval("p x y").unwrap().canonical(), "p x y");
}

// =============================================================================
// 7. eval and nesting
// =============================================================================

/// `eval` concatenates its arguments into a script.
#[test]
fn eval_concatenates() {
    let mut interp = Interp::new();
    let result = interp.eval("eval set joined 12").unwrap();
    assert_eq!(result.canonical(), "12");
    assert_eq!(interp.eval("eval {set x 5; incr x}").unwrap(), Object::Int(6));
}

/// Command substitution nests; the substituted word carries the inner
/// result's string form.
#[test]
fn command_substitution() {
    let mut interp = Interp::new();
    let result = interp.eval("set x [expr {3 * [expr {2 + 2}]}]").unwrap();
    assert_eq!(result.canonical(), "12");
}

/// Substitution output merges into surrounding word text.
#[test]
fn substitution_in_word_context() {
    let mut interp = Interp::new();
    interp.eval("set who world").unwrap();
    assert_eq!(interp.eval("set msg \"hello $who!\"").unwrap().canonical(), "hello world!");
    assert_eq!(interp.eval("set msg pre[expr {1 + 1}]post").unwrap().canonical(), "pre2post");
}
