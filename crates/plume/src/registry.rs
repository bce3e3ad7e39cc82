use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;

use crate::{
    error::{EvalResult, Exception, Raise},
    heap::ObjId,
    interp::Interp,
    parse::Script,
    resource::ResourceTracker,
};

/// Signature of an engine built-in command.
///
/// `argv[0]` is the command name object; the rest are the substituted
/// arguments. Built-ins may return control-flow signals, not just errors.
pub(crate) type NativeFn<T> = fn(&mut Interp<T>, &[ObjId]) -> EvalResult<ObjId>;

/// Signature of a host-registered command.
pub(crate) type HostFn<T> = Rc<dyn Fn(&mut Interp<T>, &[ObjId]) -> Result<ObjId, Exception>>;

/// One procedure parameter: a bare name or a (name, default) pair.
#[derive(Debug)]
pub(crate) struct Param {
    pub name: String,
    pub default: Option<ObjId>,
}

/// A user procedure: parameter spec and body, both kept as objects.
///
/// The body is parsed lazily on first call and the parsed form cached; a
/// body with bad syntax only fails when invoked.
#[derive(Debug)]
pub(crate) struct ProcDef {
    pub params_obj: ObjId,
    pub body_obj: ObjId,
    pub params: Vec<Param>,
    /// True when the last parameter is the `args` sentinel.
    pub variadic: bool,
    pub body: RefCell<Option<Rc<Script>>>,
    /// Rendered parameter list for `wrong # args` messages (without the
    /// command name, which is taken from the invocation).
    pub usage_suffix: String,
}

/// How a registered name dispatches.
pub(crate) enum CommandKind<T: ResourceTracker> {
    /// An engine built-in.
    Builtin(NativeFn<T>),
    /// A host-registered native callback.
    Host(HostFn<T>),
    /// A user procedure defined by `proc`.
    Proc(Rc<ProcDef>),
    /// The dispatcher command of a registered foreign type.
    ForeignCtor(String),
    /// A live foreign instance; the payload is the instance id.
    ForeignInstance(u32),
}

impl<T: ResourceTracker> Clone for CommandKind<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Builtin(f) => Self::Builtin(*f),
            Self::Host(f) => Self::Host(f.clone()),
            Self::Proc(def) => Self::Proc(def.clone()),
            Self::ForeignCtor(name) => Self::ForeignCtor(name.clone()),
            Self::ForeignInstance(id) => Self::ForeignInstance(*id),
        }
    }
}

impl<T: ResourceTracker> std::fmt::Debug for CommandKind<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin(_) => f.write_str("Builtin"),
            Self::Host(_) => f.write_str("Host"),
            Self::Proc(def) => f.debug_tuple("Proc").field(def).finish(),
            Self::ForeignCtor(name) => f.debug_tuple("ForeignCtor").field(name).finish(),
            Self::ForeignInstance(id) => f.debug_tuple("ForeignInstance").field(id).finish(),
        }
    }
}

/// The unified command table: built-ins, procedures, and foreign-type
/// dispatchers share one namespace, so resolution, rename, and
/// introspection have a single implementation.
#[derive(Debug)]
pub(crate) struct Registry<T: ResourceTracker> {
    commands: AHashMap<String, CommandKind<T>>,
}

impl<T: ResourceTracker> Registry<T> {
    pub fn new() -> Self {
        Self {
            commands: AHashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, kind: CommandKind<T>) {
        self.commands.insert(name.into(), kind);
    }

    pub fn remove(&mut self, name: &str) -> Option<CommandKind<T>> {
        self.commands.remove(name)
    }

    /// Resolves a name to its dispatch entry.
    pub fn lookup(&self, name: &str) -> Option<CommandKind<T>> {
        self.commands.get(name).cloned()
    }

    /// Atomic rename. Renaming to the empty name deletes the command;
    /// renaming onto an existing name fails.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), Raise> {
        if !self.commands.contains_key(old) {
            return Err(Raise::name_error(format!(
                "can't rename \"{old}\": command doesn't exist"
            )));
        }
        if new.is_empty() {
            self.commands.remove(old);
            return Ok(());
        }
        if self.commands.contains_key(new) {
            return Err(Raise::name_error(format!(
                "can't rename to \"{new}\": command already exists"
            )));
        }
        let kind = self.commands.remove(old).expect("presence checked above");
        self.commands.insert(new.to_owned(), kind);
        Ok(())
    }

    /// All registered names, sorted for deterministic introspection.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of user procedures only, sorted.
    pub fn proc_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .commands
            .iter()
            .filter(|(_, kind)| matches!(kind, CommandKind::Proc(_)))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Handles reachable from command entries, for the arena sweep.
    pub fn roots(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.commands.values().flat_map(|kind| {
            let ids: Vec<ObjId> = match kind {
                CommandKind::Proc(def) => {
                    let mut ids = vec![def.params_obj, def.body_obj];
                    ids.extend(def.params.iter().filter_map(|p| p.default));
                    ids
                }
                _ => Vec::new(),
            };
            ids
        })
    }
}
