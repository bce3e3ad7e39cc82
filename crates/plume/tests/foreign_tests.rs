//! Foreign-type dispatch: registration, construction, method calls,
//! destruction, and teardown.

use std::{
    any::Any,
    cell::Cell,
    rc::Rc,
};

use plume::{ErrKind, Exception, ForeignHandler, Interp, Object, ObjId};

#[derive(Debug)]
struct Counter {
    value: i64,
}

/// A counter type with `get`, `set`, and `incr` methods. Destruction is
/// observable through a shared flag so teardown order can be asserted.
#[derive(Debug)]
struct CounterType {
    destroyed: Rc<Cell<u32>>,
}

impl ForeignHandler for CounterType {
    fn type_name(&self) -> &str {
        "Counter"
    }

    fn methods(&self) -> &[&str] {
        &["get", "set", "incr"]
    }

    fn construct(&self, interp: &mut Interp, argv: &[ObjId]) -> Result<Box<dyn Any>, Exception> {
        let value = match argv {
            [] => 0,
            [initial] => interp.get_int(*initial)?,
            _ => {
                return Err(Exception::new(
                    ErrKind::WrongNumArgs,
                    "wrong # args: should be \"Counter new ?initial?\"",
                ));
            }
        };
        Ok(Box::new(Counter { value }))
    }

    fn invoke(
        &self,
        interp: &mut Interp,
        instance: &mut dyn Any,
        method: &str,
        argv: &[ObjId],
    ) -> Result<ObjId, Exception> {
        let counter = instance
            .downcast_mut::<Counter>()
            .ok_or_else(|| Exception::new(ErrKind::Internal, "instance is not a Counter"))?;
        match method {
            "get" => interp.alloc_int(counter.value),
            "set" => {
                let [value] = argv else {
                    return Err(Exception::new(
                        ErrKind::WrongNumArgs,
                        "wrong # args: should be \"counter set value\"",
                    ));
                };
                counter.value = interp.get_int(*value)?;
                interp.alloc_int(counter.value)
            }
            "incr" => {
                counter.value += 1;
                interp.alloc_int(counter.value)
            }
            other => Err(Exception::new(
                ErrKind::Internal,
                format!("unexpected method \"{other}\""),
            )),
        }
    }

    fn destroy(&self, instance: Box<dyn Any>) {
        self.destroyed.set(self.destroyed.get() + 1);
        drop(instance);
    }
}

fn counter_interp() -> (Interp, Rc<Cell<u32>>) {
    let destroyed = Rc::new(Cell::new(0));
    let mut interp = Interp::new();
    interp.register_foreign(Rc::new(CounterType {
        destroyed: destroyed.clone(),
    }));
    (interp, destroyed)
}

// =============================================================================
// 1. Construction and method dispatch
// =============================================================================

/// `Counter new` yields an instance command; methods dispatch through it.
#[test]
fn construct_and_invoke() {
    let (mut interp, _) = counter_interp();
    let result = interp
        .eval("set c [Counter new]\n$c set 10\n$c incr\n$c get")
        .unwrap();
    assert_eq!(result, Object::Int(11));
}

/// Instance names follow the `typename<N>` scheme and are unique.
#[test]
fn instance_naming() {
    let (mut interp, _) = counter_interp();
    let first = interp.eval("Counter new").unwrap().canonical();
    let second = interp.eval("Counter new").unwrap().canonical();
    assert_eq!(first, "counter<1>");
    assert_eq!(second, "counter<2>");
}

/// Constructor arguments reach the handler.
#[test]
fn constructor_arguments() {
    let (mut interp, _) = counter_interp();
    let result = interp.eval("set c [Counter new 40]; $c incr; $c incr; $c get").unwrap();
    assert_eq!(result, Object::Int(42));
}

/// The instance value carries a foreign-handle intrep the host can query.
#[test]
fn instance_handle_intrep() {
    let (mut interp, _) = counter_interp();
    let id = interp.eval_handle("Counter new").unwrap();
    assert!(interp.foreign_instance(id).is_some());
    let plain = interp.eval_handle("set x notaninstance").unwrap();
    assert!(interp.foreign_instance(plain).is_none());
}

/// Unknown methods list the alternatives; handler errors propagate as
/// foreign errors.
#[test]
fn method_errors() {
    let (mut interp, _) = counter_interp();
    interp.eval("set c [Counter new]").unwrap();
    let exc = interp.eval("$c frobnicate").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::NameError);
    assert!(exc.message().contains("unknown method \"frobnicate\""));
    let exc = interp.eval("$c set pear").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::ForeignError);
}

/// Unknown subcommands on the type dispatcher are rejected.
#[test]
fn dispatcher_subcommands() {
    let (mut interp, _) = counter_interp();
    let exc = interp.eval("Counter frobnicate").unwrap_err();
    assert!(exc.message().contains("must be instances or new"));
}

/// The per-type table lists live instances for introspection.
#[test]
fn instances_introspection() {
    let (mut interp, _) = counter_interp();
    interp.eval("Counter new; Counter new").unwrap();
    let result = interp.eval("Counter instances").unwrap();
    assert_eq!(result.canonical(), "counter<1> counter<2>");
    interp.eval("counter<1> destroy").unwrap();
    let result = interp.eval("Counter instances").unwrap();
    assert_eq!(result.canonical(), "counter<2>");
}

// =============================================================================
// 2. Destruction
// =============================================================================

/// `destroy` unregisters the instance command; later calls are name
/// errors.
#[test]
fn destroy_unregisters_command() {
    let (mut interp, destroyed) = counter_interp();
    interp.eval("set c [Counter new]; $c set 10").unwrap();
    interp.eval("$c destroy").unwrap();
    assert_eq!(destroyed.get(), 1);
    let exc = interp.eval("$c get").unwrap_err();
    assert_eq!(exc.kind(), ErrKind::NameError);
    assert!(exc.message().contains("invalid command name"));
}

/// Interpreter teardown destroys all live instances.
#[test]
fn teardown_destroys_live_instances() {
    let (mut interp, destroyed) = counter_interp();
    interp.eval("Counter new; Counter new; Counter new").unwrap();
    interp.eval("counter<2> destroy").unwrap();
    assert_eq!(destroyed.get(), 1);
    drop(interp);
    assert_eq!(destroyed.get(), 3);
}

/// Destroying twice is a name error, not a double free.
#[test]
fn no_double_destroy() {
    let (mut interp, destroyed) = counter_interp();
    interp.eval("set c [Counter new]").unwrap();
    interp.eval("$c destroy").unwrap();
    assert!(interp.eval("$c destroy").is_err());
    drop(interp);
    assert_eq!(destroyed.get(), 1);
}
