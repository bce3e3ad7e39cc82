use std::{any::Any, fmt, rc::Rc};

use ahash::AHashMap;

use crate::{
    error::Exception,
    heap::ObjId,
    interp::Interp,
    resource::{NoLimitTracker, ResourceTracker},
};

/// A host-defined object type exposed to scripts.
///
/// Registering a handler creates a dispatcher command named after
/// [`ForeignHandler::type_name`]. `TypeName new ...` calls
/// [`ForeignHandler::construct`] and registers a per-instance command whose
/// subcommands are the handler's methods plus the built-in `destroy`.
/// Instance state is an opaque `Box<dyn Any>` owned by the interpreter;
/// the handler downcasts it inside [`ForeignHandler::invoke`].
///
/// Interpreter teardown destroys all live instances in reverse creation
/// order.
pub trait ForeignHandler<T: ResourceTracker = NoLimitTracker>: fmt::Debug {
    /// The script-visible type name (the dispatcher command).
    fn type_name(&self) -> &str;

    /// Method names the instances respond to (excluding `destroy`).
    fn methods(&self) -> &[&str];

    /// Constructs a new instance. `argv` holds the arguments after
    /// `TypeName new`.
    fn construct(&self, interp: &mut Interp<T>, argv: &[ObjId]) -> Result<Box<dyn Any>, Exception>;

    /// Invokes a method on an instance. `argv` holds the arguments after
    /// `$instance method`.
    fn invoke(
        &self,
        interp: &mut Interp<T>,
        instance: &mut dyn Any,
        method: &str,
        argv: &[ObjId],
    ) -> Result<ObjId, Exception>;

    /// Releases an instance. Called by the `destroy` method and at
    /// interpreter teardown.
    fn destroy(&self, instance: Box<dyn Any>) {
        drop(instance);
    }
}

/// A registered foreign type and its per-type instance table.
pub(crate) struct ForeignTypeEntry<T: ResourceTracker> {
    pub handler: Rc<dyn ForeignHandler<T>>,
    /// Counter for `typename<N>` instance names.
    pub next_serial: u32,
    /// Live instance ids, in creation order, for introspection.
    pub live: Vec<u32>,
}

impl<T: ResourceTracker> fmt::Debug for ForeignTypeEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignTypeEntry")
            .field("type_name", &self.handler.type_name())
            .field("next_serial", &self.next_serial)
            .field("live", &self.live)
            .finish()
    }
}

/// One foreign instance owned by the interpreter.
///
/// `data` is taken out of the slot while a method runs so the handler can
/// hold `&mut dyn Any` and `&mut Interp` at the same time; it is restored
/// afterwards.
pub(crate) struct InstanceSlot {
    pub type_name: String,
    pub command_name: String,
    pub data: Option<Box<dyn Any>>,
    pub alive: bool,
}

impl fmt::Debug for InstanceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceSlot")
            .field("type_name", &self.type_name)
            .field("command_name", &self.command_name)
            .field("alive", &self.alive)
            .finish()
    }
}

/// All registered foreign types and live instances.
///
/// Instances live outside the arena with their own explicit lifecycle; the
/// global `instances` vector records creation order so teardown can destroy
/// in reverse.
#[derive(Debug)]
pub(crate) struct ForeignRegistry<T: ResourceTracker> {
    pub types: AHashMap<String, ForeignTypeEntry<T>>,
    pub instances: Vec<InstanceSlot>,
}

impl<T: ResourceTracker> ForeignRegistry<T> {
    pub fn new() -> Self {
        Self {
            types: AHashMap::new(),
            instances: Vec::new(),
        }
    }

    pub fn handler(&self, type_name: &str) -> Option<Rc<dyn ForeignHandler<T>>> {
        self.types.get(type_name).map(|entry| entry.handler.clone())
    }

    /// Destroys all live instances in reverse creation order.
    pub fn teardown(&mut self) {
        for idx in (0..self.instances.len()).rev() {
            let slot = &mut self.instances[idx];
            if !slot.alive {
                continue;
            }
            slot.alive = false;
            let data = slot.data.take();
            let handler = self.types.get(&slot.type_name).map(|e| e.handler.clone());
            if let (Some(handler), Some(data)) = (handler, data) {
                handler.destroy(data);
            }
        }
    }
}
