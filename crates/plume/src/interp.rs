use std::rc::Rc;

use crate::{
    dict::Dict,
    error::{ErrKind, EvalResult, Exception, Flow, Raise},
    foreign::{ForeignHandler, ForeignRegistry, ForeignTypeEntry},
    frame::{Frames, TraceOps, VarTrace},
    heap::{Arena, ArenaStats, ObjId},
    io::{PrintWriter, StdPrint},
    object::{DictPairs, Object},
    parse::{Completeness, Parsed, parse_script},
    registry::{CommandKind, Registry},
    resource::{LimitedTracker, NoLimitTracker, ResourceLimits, ResourceTracker},
    tracer::{EvalTracer, NoopTracer},
    value::quote_element,
};

const MAX_CONVERT_DEPTH: u16 = 200;

/// An embeddable script interpreter.
///
/// An interpreter owns its object arena, call frames, command registry, and
/// foreign-type table. It is not safe for concurrent use; hosts must
/// serialize submissions. Separate interpreters share nothing and may run
/// on separate threads.
///
/// The type parameter selects the resource-tracking strategy; the default
/// [`NoLimitTracker`] compiles every check away except the recursion
/// ceiling. Use [`Interp::with_limits`] for a sandboxed interpreter.
///
/// # Example
///
/// ```
/// use plume::{Interp, Object};
///
/// let mut interp = Interp::new();
/// let result = interp.eval("set x 40; expr {$x + 2}").unwrap();
/// assert_eq!(result, Object::Int(42));
/// ```
#[derive(Debug)]
pub struct Interp<T: ResourceTracker = NoLimitTracker> {
    pub(crate) arena: Arena<T>,
    pub(crate) frames: Frames,
    pub(crate) registry: Registry<T>,
    pub(crate) foreign: ForeignRegistry<T>,
    /// Host-stack re-entry depth (command substitution, body-evaluating
    /// built-ins). Counted together with frame depth against the ceiling.
    pub(crate) eval_depth: usize,
    /// Nesting of outermost-style evaluations; the arena sweep runs when
    /// this returns to zero.
    pub(crate) epoch_depth: usize,
    /// The return-options dictionary of the most recent non-OK completion.
    pub(crate) return_options: Option<ObjId>,
    /// Result of the most recent evaluation; a promotion root.
    pub(crate) last_result: ObjId,
    pub(crate) print: Box<dyn PrintWriter>,
    pub(crate) tracer: Box<dyn EvalTracer>,
}

impl Interp<NoLimitTracker> {
    /// Creates an interpreter with no resource limits beyond the default
    /// recursion ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tracker(NoLimitTracker)
    }
}

impl Default for Interp<NoLimitTracker> {
    fn default() -> Self {
        Self::new()
    }
}

impl Interp<LimitedTracker> {
    /// Creates a sandboxed interpreter enforcing the given limits.
    #[must_use]
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self::with_tracker(LimitedTracker::new(limits))
    }
}

impl<T: ResourceTracker> Interp<T> {
    /// Creates an interpreter with a custom resource tracker.
    #[must_use]
    pub fn with_tracker(tracker: T) -> Self {
        let arena = Arena::new(tracker);
        let empty = arena.empty();
        let mut interp = Self {
            arena,
            frames: Frames::new(),
            registry: Registry::new(),
            foreign: ForeignRegistry::new(),
            eval_depth: 0,
            epoch_depth: 0,
            return_options: None,
            last_result: empty,
            print: Box::new(StdPrint),
            tracer: Box::new(NoopTracer),
        };
        crate::builtins::register_all(&mut interp.registry);
        interp
    }

    // --- evaluation -------------------------------------------------------

    /// Evaluates a script and returns its result as an owned [`Object`].
    ///
    /// This is an outermost evaluation: when it completes, temporaries
    /// allocated during the call are swept from the arena unless promoted
    /// into a variable, a command entry, or an interpreter-global slot.
    pub fn eval(&mut self, script: &str) -> Result<Object, Exception> {
        let id = self.eval_handle(script)?;
        self.extract(id)
    }

    /// Evaluates a script and returns a handle to the result.
    ///
    /// The handle is rooted as the interpreter result and remains valid
    /// until the next evaluation completes.
    pub fn eval_handle(&mut self, script: &str) -> Result<ObjId, Exception> {
        let parsed = match parse_script(script) {
            Parsed::Complete(parsed) => Rc::new(parsed),
            Parsed::Incomplete { offset } => {
                return Err(Exception::new(
                    ErrKind::ParseError,
                    format!("incomplete script: unclosed delimiter at offset {offset}"),
                ));
            }
            Parsed::Error { offset, message } => {
                return Err(Exception::new(
                    ErrKind::ParseError,
                    format!("{message} (at offset {offset})"),
                ));
            }
        };
        self.epoch_depth += 1;
        let outcome = self.eval_script(parsed);
        let result = match outcome {
            Ok(id) => {
                self.last_result = id;
                Ok(id)
            }
            Err(flow) => {
                let exc = self.finalize_flow(flow);
                self.last_result = self.arena.empty();
                Err(exc)
            }
        };
        self.epoch_depth -= 1;
        if self.epoch_depth == 0 {
            self.sweep_epoch();
        }
        result
    }

    /// Reports whether a script parses as complete, without evaluating.
    #[must_use]
    pub fn check_complete(script: &str) -> Completeness {
        crate::parse::check_complete(script)
    }

    /// Maps a leaked control-flow signal at the top level to an exception,
    /// recording `errorInfo`/`errorCode` and the return options.
    fn finalize_flow(&mut self, flow: Flow) -> Exception {
        let raise = match flow {
            Flow::Error(raise) => raise,
            Flow::Break => Raise::new(ErrKind::ControlFlowMisuse, "invoked \"break\" outside of a loop"),
            Flow::Continue => Raise::new(ErrKind::ControlFlowMisuse, "invoked \"continue\" outside of a loop"),
            Flow::Return { .. } => Raise::new(
                ErrKind::ControlFlowMisuse,
                "invoked \"return\" outside of a procedure",
            ),
        };
        self.tracer.on_error(&raise.message);
        self.record_error_state(&raise);
        raise.into()
    }

    /// Stores `errorInfo`/`errorCode` globals and the return-options dict
    /// for an error. Also used by `catch` when it intercepts an error.
    pub(crate) fn record_error_state(&mut self, raise: &Raise) {
        let info = raise.error_info();
        let code = raise.error_code.clone().unwrap_or_else(|| "NONE".to_owned());
        if let Ok(info_id) = self.arena.alloc_string(info.clone()) {
            self.frames
                .frame_mut(0)
                .expect("global frame always exists")
                .vars
                .insert("errorInfo".to_owned(), info_id);
        }
        if let Ok(code_id) = self.arena.alloc_string(code.clone()) {
            self.frames
                .frame_mut(0)
                .expect("global frame always exists")
                .vars
                .insert("errorCode".to_owned(), code_id);
        }
        let mut options = Dict::new();
        let entries: [(&str, String); 4] = [
            ("-code", "1".to_owned()),
            ("-level", "0".to_owned()),
            ("-errorcode", code),
            ("-errorinfo", info),
        ];
        for (key, value) in entries {
            if let Ok(id) = self.arena.alloc_string(value) {
                options.insert(key.to_owned(), id);
            }
        }
        if let Ok(id) = self.arena.alloc_dict(options) {
            self.return_options = Some(id);
        }
    }

    /// The return-options dictionary of the most recent non-OK completion.
    pub fn return_options(&mut self) -> Option<Object> {
        let id = self.return_options?;
        self.extract(id).ok()
    }

    fn sweep_epoch(&mut self) {
        let mut roots: Vec<ObjId> = self.frames.roots().collect();
        roots.extend(self.registry.roots());
        roots.push(self.last_result);
        if let Some(options) = self.return_options {
            roots.push(options);
        }
        self.arena.sweep(roots);
    }

    /// Arena occupancy snapshot, for tests and monitoring.
    #[must_use]
    pub fn arena_stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    // --- registration -----------------------------------------------------

    /// Registers a native host command under `name`.
    ///
    /// The callback receives the interpreter and the substituted argument
    /// handles (`argv[0]` is the command name). Handles passed in are valid
    /// for the duration of the call; allocate results through the
    /// interpreter's `alloc_*` helpers.
    pub fn register_command<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut Self, &[ObjId]) -> Result<ObjId, Exception> + 'static,
    {
        self.registry.register(name, CommandKind::Host(Rc::new(f)));
    }

    /// Registers a foreign object type. The handler's type name becomes the
    /// dispatcher command (`TypeName new ...`).
    pub fn register_foreign(&mut self, handler: Rc<dyn ForeignHandler<T>>) {
        let type_name = handler.type_name().to_owned();
        self.foreign.types.insert(
            type_name.clone(),
            ForeignTypeEntry {
                handler,
                next_serial: 0,
                live: Vec::new(),
            },
        );
        self.registry
            .register(type_name.clone(), CommandKind::ForeignCtor(type_name));
    }

    // --- host output and tracing -----------------------------------------

    /// Replaces the print writer host commands write through; returns the
    /// previous writer.
    pub fn set_print_writer(&mut self, writer: Box<dyn PrintWriter>) -> Box<dyn PrintWriter> {
        std::mem::replace(&mut self.print, writer)
    }

    /// Writes host-command output followed by a newline.
    pub fn writeln_output(&mut self, text: &str) -> Result<(), Exception> {
        self.print.stdout_write(text.into())?;
        self.print.stdout_push('\n')
    }

    /// Writes host-command output without a terminator.
    pub fn write_output(&mut self, text: &str) -> Result<(), Exception> {
        self.print.stdout_write(text.into())
    }

    /// Replaces the evaluation tracer; returns the previous one.
    pub fn set_tracer(&mut self, tracer: Box<dyn EvalTracer>) -> Box<dyn EvalTracer> {
        std::mem::replace(&mut self.tracer, tracer)
    }

    // --- variables --------------------------------------------------------

    /// Sets a variable in the active frame (the global frame when called
    /// between evaluations). Accepts `name` or `name(index)` syntax.
    pub fn set_var(&mut self, name: &str, value: Object) -> Result<(), Exception> {
        let id = self.intern(&value)?;
        let (base, index) = split_var_name(name);
        self.var_set_parts(base, index, id).map_err(flow_to_exception)?;
        Ok(())
    }

    /// Reads a variable from the active frame. Accepts `name` or
    /// `name(index)` syntax.
    pub fn get_var(&mut self, name: &str) -> Result<Object, Exception> {
        let (base, index) = split_var_name(name);
        let id = self.var_get_parts(base, index).map_err(flow_to_exception)?;
        self.extract(id)
    }

    /// Reads a variable through the resolved frame and any upvar links,
    /// firing read traces. `index` selects an element of a dict-valued
    /// variable.
    pub(crate) fn var_get_parts(&mut self, name: &str, index: Option<&str>) -> EvalResult<ObjId> {
        let (level, resolved) = self.frames.resolve(name)?;
        self.fire_traces(level, &resolved, name, index, TraceKind::Read)?;
        let var = self
            .frames
            .frame(level)
            .and_then(|f| f.vars.get(&resolved))
            .copied();
        let Some(id) = var else {
            return Err(Raise::name_error(format!(
                "can't read \"{}\": no such variable",
                display_name(name, index)
            ))
            .into());
        };
        match index {
            None => Ok(id),
            Some(key) => {
                let dict = self.arena.dict_ref(id)?;
                dict.get(key).ok_or_else(|| {
                    Raise::name_error(format!(
                        "can't read \"{}\": no such element in array",
                        display_name(name, index)
                    ))
                    .into()
                })
            }
        }
    }

    /// Writes a variable, creating it if needed; returns the value stored
    /// under the name/index the script asked for. Dict-element writes are
    /// copy-on-write: the variable is rebound to a new dict object.
    pub(crate) fn var_set_parts(&mut self, name: &str, index: Option<&str>, value: ObjId) -> EvalResult<ObjId> {
        let (level, resolved) = self.frames.resolve(name)?;
        let stored = match index {
            None => value,
            Some(key) => {
                let existing = self
                    .frames
                    .frame(level)
                    .and_then(|f| f.vars.get(&resolved))
                    .copied();
                let mut dict = match existing {
                    Some(id) => self.arena.dict_of(id).map_err(|_| {
                        Raise::wrong_type(format!(
                            "can't set \"{}\": variable isn't a dict",
                            display_name(name, index)
                        ))
                    })?,
                    None => Dict::new(),
                };
                dict.insert(key.to_owned(), value);
                self.arena.alloc_dict(dict)?
            }
        };
        match self.frames.frame_mut(level) {
            Some(frame) => {
                frame.vars.insert(resolved.clone(), stored);
            }
            // a link whose target frame no longer exists
            None => return Err(Raise::name_error(format!("bad level \"#{level}\"")).into()),
        }
        self.tracer.on_var_write(name);
        self.fire_traces(level, &resolved, name, index, TraceKind::Write)?;
        Ok(value)
    }

    /// Removes a variable or a dict element of it. Unset traces fire after
    /// removal; a plain unset also discards the variable's traces.
    pub(crate) fn var_unset_parts(&mut self, name: &str, index: Option<&str>, complain: bool) -> EvalResult<()> {
        let (level, resolved) = self.frames.resolve(name)?;
        match index {
            Some(key) => {
                let existing = self
                    .frames
                    .frame(level)
                    .and_then(|f| f.vars.get(&resolved))
                    .copied();
                let Some(id) = existing else {
                    if complain {
                        return Err(Raise::name_error(format!(
                            "can't unset \"{}\": no such variable",
                            display_name(name, index)
                        ))
                        .into());
                    }
                    return Ok(());
                };
                let mut dict = self.arena.dict_of(id)?;
                if dict.remove(key).is_none() && complain {
                    return Err(Raise::name_error(format!(
                        "can't unset \"{}\": no such element in array",
                        display_name(name, index)
                    ))
                    .into());
                }
                let rebound = self.arena.alloc_dict(dict)?;
                if let Some(frame) = self.frames.frame_mut(level) {
                    frame.vars.insert(resolved.clone(), rebound);
                }
                self.fire_unset_traces(level, &resolved, name, index);
                Ok(())
            }
            None => {
                let removed = self
                    .frames
                    .frame_mut(level)
                    .and_then(|f| f.vars.remove(&resolved))
                    .is_some();
                if !removed && complain {
                    return Err(Raise::name_error(format!("can't unset \"{name}\": no such variable")).into());
                }
                if removed {
                    self.fire_unset_traces(level, &resolved, name, index);
                    if let Some(frame) = self.frames.frame_mut(level) {
                        frame.traces.remove(&resolved);
                    }
                }
                Ok(())
            }
        }
    }

    /// Existence check; does not fire traces.
    pub(crate) fn var_exists_parts(&mut self, name: &str, index: Option<&str>) -> EvalResult<bool> {
        let (level, resolved) = self.frames.resolve(name)?;
        let var = self
            .frames
            .frame(level)
            .and_then(|f| f.vars.get(&resolved))
            .copied();
        match (var, index) {
            (None, _) => Ok(false),
            (Some(_), None) => Ok(true),
            (Some(id), Some(key)) => match self.arena.dict_ref(id) {
                Ok(dict) => Ok(dict.contains(key)),
                Err(_) => Ok(false),
            },
        }
    }

    /// Attaches a trace to the variable's owning frame.
    pub(crate) fn add_var_trace(&mut self, name: &str, ops: TraceOps, script: String) -> EvalResult<()> {
        let (base, _) = split_var_name(name);
        let (level, resolved) = self.frames.resolve(base)?;
        if let Some(frame) = self.frames.frame_mut(level) {
            frame
                .traces
                .entry(resolved)
                .or_default()
                .push(VarTrace { ops, script });
        }
        Ok(())
    }

    /// Removes the first matching trace.
    pub(crate) fn remove_var_trace(&mut self, name: &str, ops: TraceOps, script: &str) -> EvalResult<()> {
        let (base, _) = split_var_name(name);
        let (level, resolved) = self.frames.resolve(base)?;
        if let Some(traces) = self.frames.frame_mut(level).and_then(|f| f.traces.get_mut(&resolved)) {
            if let Some(pos) = traces.iter().position(|t| t.ops == ops && t.script == script) {
                traces.remove(pos);
            }
        }
        Ok(())
    }

    /// Lists traces on a variable as (ops, script) pairs.
    pub(crate) fn var_traces(&mut self, name: &str) -> EvalResult<Vec<(TraceOps, String)>> {
        let (base, _) = split_var_name(name);
        let (level, resolved) = self.frames.resolve(base)?;
        Ok(self
            .frames
            .frame(level)
            .and_then(|f| f.traces.get(&resolved))
            .map(|traces| traces.iter().map(|t| (t.ops, t.script.clone())).collect())
            .unwrap_or_default())
    }

    /// Fires read/write traces synchronously in registration order. Trace
    /// script failures propagate as the operation's error.
    fn fire_traces(
        &mut self,
        level: usize,
        resolved: &str,
        display: &str,
        index: Option<&str>,
        kind: TraceKind,
    ) -> EvalResult<()> {
        let scripts = self.matching_traces(level, resolved, kind);
        for script in scripts {
            let command = trace_command(&script, display, index, kind);
            self.eval_nested_str(&command)?;
        }
        Ok(())
    }

    /// Unset traces fire after removal; their errors are ignored.
    fn fire_unset_traces(&mut self, level: usize, resolved: &str, display: &str, index: Option<&str>) {
        let scripts = self.matching_traces(level, resolved, TraceKind::Unset);
        for script in scripts {
            let command = trace_command(&script, display, index, TraceKind::Unset);
            let _ = self.eval_nested_str(&command);
        }
    }

    fn matching_traces(&self, level: usize, resolved: &str, kind: TraceKind) -> Vec<String> {
        self.frames
            .frame(level)
            .and_then(|f| f.traces.get(resolved))
            .map(|traces| {
                traces
                    .iter()
                    .filter(|t| match kind {
                        TraceKind::Read => t.ops.read,
                        TraceKind::Write => t.ops.write,
                        TraceKind::Unset => t.ops.unset,
                    })
                    .map(|t| t.script.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- object conversion ------------------------------------------------

    /// Builds arena objects from an owned [`Object`].
    pub fn intern(&mut self, value: &Object) -> Result<ObjId, Exception> {
        self.intern_depth(value, MAX_CONVERT_DEPTH).map_err(Exception::from)
    }

    fn intern_depth(&mut self, value: &Object, depth: u16) -> Result<ObjId, Raise> {
        if depth == 0 {
            return Err(Raise::internal("value nesting too deep to convert"));
        }
        match value {
            Object::String(s) => self.arena.alloc_string(s.clone()),
            Object::Int(i) => self.arena.alloc_int(*i),
            Object::Double(d) => self.arena.alloc_double(*d),
            Object::List(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    ids.push(self.intern_depth(item, depth - 1)?);
                }
                self.arena.alloc_list(ids)
            }
            Object::Dict(pairs) => {
                let mut dict = Dict::new();
                for (key, item) in pairs {
                    let id = self.intern_depth(item, depth - 1)?;
                    dict.insert(key.clone(), id);
                }
                self.arena.alloc_dict(dict)
            }
        }
    }

    /// Extracts an owned [`Object`] from a handle, preferring the native
    /// representation the object currently carries.
    pub fn extract(&mut self, id: ObjId) -> Result<Object, Exception> {
        self.extract_depth(id, MAX_CONVERT_DEPTH).map_err(Exception::from)
    }

    fn extract_depth(&mut self, id: ObjId, depth: u16) -> Result<Object, Raise> {
        if depth == 0 {
            return Err(Raise::internal("value nesting too deep to convert"));
        }
        let obj = self.arena.obj(id);
        if let Some(i) = obj.int {
            return Ok(Object::Int(i));
        }
        if let Some(d) = obj.double {
            return Ok(Object::Double(d));
        }
        if obj.dict.is_some() {
            let pairs: Vec<(String, ObjId)> = obj
                .dict
                .as_ref()
                .map(|d| d.iter().map(|(k, v)| (k.to_owned(), v)).collect())
                .unwrap_or_default();
            let mut out = DictPairs::new();
            for (key, value) in pairs {
                out.insert(key, self.extract_depth(value, depth - 1)?);
            }
            return Ok(Object::Dict(out));
        }
        if obj.list.is_some() {
            let items = obj.list.clone().unwrap_or_default();
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(self.extract_depth(item, depth - 1)?);
            }
            return Ok(Object::List(out));
        }
        Ok(Object::String(self.arena.string_of(id)?))
    }

    // --- handle helpers for command authors -------------------------------

    /// Allocates a string object.
    pub fn alloc_string(&mut self, s: impl Into<String>) -> Result<ObjId, Exception> {
        self.arena.alloc_string(s).map_err(Exception::from)
    }

    /// Allocates an integer object.
    pub fn alloc_int(&mut self, i: i64) -> Result<ObjId, Exception> {
        self.arena.alloc_int(i).map_err(Exception::from)
    }

    /// Allocates a double object.
    pub fn alloc_double(&mut self, d: f64) -> Result<ObjId, Exception> {
        self.arena.alloc_double(d).map_err(Exception::from)
    }

    /// Allocates a list object from element handles.
    pub fn alloc_list(&mut self, items: Vec<ObjId>) -> Result<ObjId, Exception> {
        self.arena.alloc_list(items).map_err(Exception::from)
    }

    /// The canonical string form of an object.
    pub fn get_string(&mut self, id: ObjId) -> Result<String, Exception> {
        self.arena.string_of(id).map_err(Exception::from)
    }

    /// The integer representation, shimmering if needed.
    pub fn get_int(&mut self, id: ObjId) -> Result<i64, Exception> {
        self.arena.get_int(id).map_err(Exception::from)
    }

    /// The double representation, shimmering if needed.
    pub fn get_double(&mut self, id: ObjId) -> Result<f64, Exception> {
        self.arena.get_double(id).map_err(Exception::from)
    }

    /// The list representation, shimmering if needed.
    pub fn get_list(&mut self, id: ObjId) -> Result<Vec<ObjId>, Exception> {
        self.arena.get_list(id).map_err(Exception::from)
    }

    /// Element count of the list representation.
    pub fn list_len(&mut self, id: ObjId) -> Result<usize, Exception> {
        self.arena.list_len(id).map_err(Exception::from)
    }

    /// Element at `index`, or `None` out of range.
    pub fn list_at(&mut self, id: ObjId, index: usize) -> Result<Option<ObjId>, Exception> {
        self.arena.list_at(id, index).map_err(Exception::from)
    }

    /// Appends to a list in place, invalidating the cached string form.
    ///
    /// In-place mutation is only sound on values no script variable or
    /// other holder shares, typically a list the caller just built.
    pub fn list_push(&mut self, id: ObjId, item: ObjId) -> Result<(), Exception> {
        self.arena.list_push(id, item).map_err(Exception::from)
    }

    /// Removes and returns the last element in place.
    pub fn list_pop(&mut self, id: ObjId) -> Result<Option<ObjId>, Exception> {
        self.arena.list_pop(id).map_err(Exception::from)
    }

    /// Removes and returns the first element in place.
    pub fn list_shift(&mut self, id: ObjId) -> Result<Option<ObjId>, Exception> {
        self.arena.list_shift(id).map_err(Exception::from)
    }

    /// Prepends an element in place.
    pub fn list_unshift(&mut self, id: ObjId, item: ObjId) -> Result<(), Exception> {
        self.arena.list_unshift(id, item).map_err(Exception::from)
    }

    /// Equality over canonical string forms.
    pub fn obj_equals(&mut self, a: ObjId, b: ObjId) -> Result<bool, Exception> {
        self.arena.obj_eq(a, b).map_err(Exception::from)
    }

    /// The shared empty-string object.
    #[must_use]
    pub fn empty(&self) -> ObjId {
        self.arena.empty()
    }

    /// The foreign-instance id carried by a value's intrep, if the value
    /// names a live foreign instance.
    #[must_use]
    pub fn foreign_instance(&self, id: ObjId) -> Option<u32> {
        if !self.arena.is_live(id) {
            return None;
        }
        let instance = self.arena.obj(id).foreign?;
        self.foreign
            .instances
            .get(instance as usize)
            .filter(|slot| slot.alive)
            .map(|_| instance)
    }
}

impl<T: ResourceTracker> Drop for Interp<T> {
    fn drop(&mut self) {
        self.foreign.teardown();
    }
}

/// Which trace kind an operation fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraceKind {
    Read,
    Write,
    Unset,
}

impl TraceKind {
    fn op_name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Unset => "unset",
        }
    }
}

/// Builds the `script name1 name2 op` invocation for a fired trace.
fn trace_command(script: &str, name: &str, index: Option<&str>, kind: TraceKind) -> String {
    let mut out = String::with_capacity(script.len() + name.len() + 16);
    out.push_str(script);
    out.push(' ');
    quote_element(name, &mut out);
    out.push(' ');
    quote_element(index.unwrap_or(""), &mut out);
    out.push(' ');
    out.push_str(kind.op_name());
    out
}

/// Splits `name(index)` into its base name and index text.
pub(crate) fn split_var_name(full: &str) -> (&str, Option<&str>) {
    if full.ends_with(')')
        && let Some(open) = full.find('(')
    {
        return (&full[..open], Some(&full[open + 1..full.len() - 1]));
    }
    (full, None)
}

fn display_name(name: &str, index: Option<&str>) -> String {
    match index {
        Some(key) => format!("{name}({key})"),
        None => name.to_owned(),
    }
}

/// Maps an internal control-flow signal to a public exception at an API
/// boundary that only reports errors.
pub(crate) fn flow_to_exception(flow: Flow) -> Exception {
    match flow {
        Flow::Error(raise) => raise.into(),
        Flow::Break => Exception::new(ErrKind::ControlFlowMisuse, "invoked \"break\" outside of a loop"),
        Flow::Continue => Exception::new(ErrKind::ControlFlowMisuse, "invoked \"continue\" outside of a loop"),
        Flow::Return { .. } => Exception::new(ErrKind::ControlFlowMisuse, "invoked \"return\" outside of a procedure"),
    }
}
