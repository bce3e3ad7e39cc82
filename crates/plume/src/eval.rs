use std::rc::Rc;

use crate::{
    error::{ErrKind, EvalResult, Flow, Raise, ReturnCode},
    heap::ObjId,
    interp::Interp,
    parse::{Cmd, Parsed, Script, parse_script},
    registry::{CommandKind, ProcDef},
    resource::ResourceTracker,
    value::Obj,
};

/// A pending item on the evaluator's work stack.
///
/// Script sequencing and procedure bodies run flat through this stack, so a
/// procedure recursing to the configured ceiling consumes work-stack slots,
/// not host-stack frames. Built-ins that evaluate a sub-script (`if`
/// branches, loop bodies, `[...]` substitution, `eval`) re-enter the driver
/// on the host stack, bounded by the same ceiling.
enum Task {
    Script { script: Rc<Script>, idx: usize },
    /// Marks a procedure boundary: pops the frame and consumes RETURN.
    PopFrame { invocation: String },
}

enum CmdOutcome {
    Value(ObjId),
    /// A procedure call: the frame is already pushed; run the body next.
    Frame { body: Rc<Script>, invocation: String },
    Skip,
}

impl<T: ResourceTracker> Interp<T> {
    /// Evaluates a parsed script against the current frame and returns the
    /// result of its last command.
    ///
    /// Re-entrant: built-ins and substitution call back in here, with depth
    /// checked against the recursion ceiling.
    pub(crate) fn eval_script(&mut self, script: Rc<Script>) -> EvalResult<ObjId> {
        self.arena
            .tracker()
            .check_recursion_depth(self.frames.depth() + self.eval_depth)
            .map_err(Raise::from)?;
        self.eval_depth += 1;
        let result = self.drive(script);
        self.eval_depth -= 1;
        result
    }

    /// Parses and evaluates script text (used by `eval`, `uplevel`, traces,
    /// and trace-style callbacks).
    pub(crate) fn eval_nested_str(&mut self, src: &str) -> EvalResult<ObjId> {
        match parse_script(src) {
            Parsed::Complete(script) => self.eval_script(Rc::new(script)),
            Parsed::Incomplete { .. } => {
                Err(Raise::new(ErrKind::ParseError, "unexpected end of script: missing closing delimiter").into())
            }
            Parsed::Error { message, .. } => Err(Raise::new(ErrKind::ParseError, message).into()),
        }
    }

    /// The driver loop: dispatches commands from the work stack until it
    /// drains, unwinding control-flow signals as they arise.
    fn drive(&mut self, script: Rc<Script>) -> EvalResult<ObjId> {
        let mut tasks = vec![Task::Script { script, idx: 0 }];
        let mut result = self.arena.empty();
        while let Some(top) = tasks.last_mut() {
            match top {
                Task::Script { script, idx } => {
                    if *idx >= script.commands().len() {
                        tasks.pop();
                        if matches!(tasks.last(), Some(Task::PopFrame { .. })) {
                            tasks.pop();
                            self.finish_proc_frame();
                        }
                        continue;
                    }
                    let script = script.clone();
                    let i = *idx;
                    *idx += 1;
                    match self.run_command(&script, i) {
                        Ok(CmdOutcome::Skip) => {}
                        Ok(CmdOutcome::Value(value)) => result = value,
                        Ok(CmdOutcome::Frame { body, invocation }) => {
                            tasks.push(Task::PopFrame { invocation });
                            tasks.push(Task::Script { script: body, idx: 0 });
                            // an empty body must yield the empty result
                            result = self.arena.empty();
                        }
                        Err(flow) => match self.unwind(&mut tasks, flow) {
                            Ok(value) => result = value,
                            Err(flow) => return Err(flow),
                        },
                    }
                }
                Task::PopFrame { .. } => {
                    tasks.pop();
                    self.finish_proc_frame();
                }
            }
        }
        Ok(result)
    }

    /// Peels work-stack items off until something consumes the signal:
    /// procedure boundaries consume RETURN (applying its code and level);
    /// everything else keeps unwinding. Errors collect their location trace
    /// here.
    fn unwind(&mut self, tasks: &mut Vec<Task>, flow: Flow) -> Result<ObjId, Flow> {
        if let Flow::Error(raise) = &flow {
            self.tracer.on_error(&raise.message);
        }
        let mut flow = flow;
        loop {
            match tasks.pop() {
                None => return Err(flow),
                Some(Task::Script { .. }) => {}
                Some(Task::PopFrame { invocation }) => {
                    self.finish_proc_frame();
                    flow = match flow {
                        Flow::Return {
                            value,
                            code,
                            level,
                            options,
                        } => {
                            if level > 1 {
                                Flow::Return {
                                    value,
                                    code,
                                    level: level - 1,
                                    options,
                                }
                            } else {
                                match code {
                                    ReturnCode::Ok => return Ok(value),
                                    ReturnCode::Error => {
                                        let message = self.arena.string_of(value).unwrap_or_default();
                                        let mut raise = Raise::new(ErrKind::General, message);
                                        if let Some(options) = options {
                                            raise.error_code = options.error_code;
                                            if let Some(info) = options.error_info {
                                                raise.trace = info.lines().skip(1).map(str::to_owned).collect();
                                                raise.message =
                                                    info.lines().next().unwrap_or(&raise.message).to_owned();
                                            }
                                        }
                                        Flow::Error(raise)
                                    }
                                    ReturnCode::Return => Flow::Return {
                                        value,
                                        code: ReturnCode::Ok,
                                        level: 1,
                                        options,
                                    },
                                    ReturnCode::Break => Flow::Break,
                                    ReturnCode::Continue => Flow::Continue,
                                }
                            }
                        }
                        Flow::Error(mut raise) => {
                            raise.trace.push("    invoked from within".to_owned());
                            raise.trace.push(format!("\"{invocation}\""));
                            Flow::Error(raise)
                        }
                        other => other,
                    };
                }
            }
        }
    }

    fn run_command(&mut self, script: &Rc<Script>, idx: usize) -> EvalResult<CmdOutcome> {
        let outcome = self.run_command_inner(script, idx);
        match outcome {
            Err(Flow::Error(mut raise)) => {
                if raise.trace.is_empty() {
                    let cmd = &script.commands()[idx];
                    raise.trace.push("    while executing".to_owned());
                    raise.trace.push(format!("\"{}\"", truncate_invocation(script.cmd_text(cmd))));
                }
                Err(Flow::Error(raise))
            }
            other => other,
        }
    }

    fn run_command_inner(&mut self, script: &Rc<Script>, idx: usize) -> EvalResult<CmdOutcome> {
        let cmd = &script.commands()[idx];
        if cmd.words.is_empty() {
            return Ok(CmdOutcome::Skip);
        }
        let mut argv = Vec::with_capacity(cmd.words.len());
        for word in &cmd.words {
            argv.push(self.subst_word(word)?);
        }
        self.arena.tracker_mut().check_time().map_err(Raise::from)?;
        let name = self.arena.string_of(argv[0])?;
        self.tracer.on_command(&name, argv.len() - 1, self.frames.depth());
        match self.registry.lookup(&name) {
            Some(kind) => self.dispatch(&kind, argv, script, cmd),
            None => {
                // unknown-command fallback: a registered `unknown` command
                // receives the original words as its arguments
                if let Some(unknown) = self.registry.lookup("unknown") {
                    let mut fallback = Vec::with_capacity(argv.len() + 1);
                    fallback.push(self.arena.alloc_string("unknown")?);
                    fallback.extend(argv);
                    self.dispatch(&unknown, fallback, script, cmd)
                } else {
                    Err(Raise::name_error(format!("invalid command name \"{name}\"")).into())
                }
            }
        }
    }

    fn dispatch(
        &mut self,
        kind: &CommandKind<T>,
        argv: Vec<ObjId>,
        script: &Rc<Script>,
        cmd: &Cmd,
    ) -> EvalResult<CmdOutcome> {
        match kind {
            CommandKind::Builtin(f) => f(self, &argv).map(CmdOutcome::Value),
            CommandKind::Host(f) => {
                let callback = f.clone();
                match (callback.as_ref())(self, &argv) {
                    Ok(value) => Ok(CmdOutcome::Value(value)),
                    Err(exc) => Err(Flow::Error(exc.into())),
                }
            }
            CommandKind::Proc(def) => self.begin_proc_call(&def.clone(), &argv, script.cmd_text(cmd)),
            CommandKind::ForeignCtor(type_name) => {
                self.dispatch_foreign_ctor(&type_name.clone(), &argv).map(CmdOutcome::Value)
            }
            CommandKind::ForeignInstance(instance) => {
                self.dispatch_foreign_instance(*instance, &argv).map(CmdOutcome::Value)
            }
        }
    }

    /// Binds arguments, pushes the frame, and hands the parsed body back to
    /// the driver. Defaults fill missing optionals; a trailing `args`
    /// parameter collects the rest as a list.
    fn begin_proc_call(&mut self, def: &Rc<ProcDef>, argv: &[ObjId], invocation: &str) -> EvalResult<CmdOutcome> {
        self.arena
            .tracker()
            .check_recursion_depth(self.frames.depth() + self.eval_depth)
            .map_err(Raise::from)?;
        let body = self.proc_body(def)?;
        let name = self.arena.string_of(argv[0])?;
        let call_args = &argv[1..];
        let nparams = def.params.len();
        let mut bindings: Vec<(String, ObjId)> = Vec::with_capacity(nparams);
        for (i, param) in def.params.iter().enumerate() {
            if def.variadic && i + 1 == nparams {
                let rest = call_args.get(i..).unwrap_or(&[]).to_vec();
                let id = self.arena.alloc_list(rest)?;
                bindings.push((param.name.clone(), id));
            } else if i < call_args.len() {
                bindings.push((param.name.clone(), call_args[i]));
            } else if let Some(default) = param.default {
                bindings.push((param.name.clone(), default));
            } else {
                return Err(Raise::wrong_num_args(&format!("{name}{}", def.usage_suffix)).into());
            }
        }
        if !def.variadic && call_args.len() > nparams {
            return Err(Raise::wrong_num_args(&format!("{name}{}", def.usage_suffix)).into());
        }
        let args_list = self.arena.alloc_list(call_args.to_vec())?;
        let level = self.frames.push(argv[0], args_list);
        for (var, value) in bindings {
            self.frames.active_mut().vars.insert(var, value);
        }
        self.tracer.on_frame_push(&name, level);
        Ok(CmdOutcome::Frame {
            body,
            invocation: truncate_invocation(invocation),
        })
    }

    /// Parses the procedure body on first call and caches the result.
    fn proc_body(&mut self, def: &Rc<ProcDef>) -> EvalResult<Rc<Script>> {
        if let Some(body) = def.body.borrow().as_ref() {
            return Ok(body.clone());
        }
        let source = self.arena.string_of(def.body_obj)?;
        let parsed = match parse_script(&source) {
            Parsed::Complete(script) => Rc::new(script),
            Parsed::Incomplete { .. } => {
                return Err(Raise::new(
                    ErrKind::ParseError,
                    "missing close-brace: procedure body is incomplete",
                )
                .into());
            }
            Parsed::Error { message, .. } => return Err(Raise::new(ErrKind::ParseError, message).into()),
        };
        *def.body.borrow_mut() = Some(parsed.clone());
        Ok(parsed)
    }

    fn finish_proc_frame(&mut self) {
        self.frames.pop();
        self.tracer.on_frame_pop(self.frames.depth());
    }

    // --- foreign dispatch -------------------------------------------------

    fn dispatch_foreign_ctor(&mut self, type_name: &str, argv: &[ObjId]) -> EvalResult<ObjId> {
        if argv.len() < 2 {
            return Err(Raise::wrong_num_args(&format!("{type_name} subcommand ?arg ...?")).into());
        }
        let subcmd = self.arena.string_of(argv[1])?;
        match subcmd.as_str() {
            "new" => {
                let handler = self
                    .foreign
                    .handler(type_name)
                    .ok_or_else(|| Raise::internal(format!("foreign type \"{type_name}\" vanished")))?;
                let instance = handler
                    .construct(self, &argv[2..])
                    .map_err(|exc| foreign_raise(&exc))?;
                let entry = self
                    .foreign
                    .types
                    .get_mut(type_name)
                    .ok_or_else(|| Raise::internal(format!("foreign type \"{type_name}\" vanished")))?;
                entry.next_serial += 1;
                let serial = entry.next_serial;
                let command_name = format!("{}<{serial}>", type_name.to_lowercase());
                let instance_id = u32::try_from(self.foreign.instances.len())
                    .map_err(|_| Raise::internal("foreign instance count exceeded u32 range"))?;
                entry.live.push(instance_id);
                self.foreign.instances.push(crate::foreign::InstanceSlot {
                    type_name: type_name.to_owned(),
                    command_name: command_name.clone(),
                    data: Some(instance),
                    alive: true,
                });
                self.registry
                    .register(command_name.clone(), CommandKind::ForeignInstance(instance_id));
                let mut obj = Obj::from_string(command_name);
                obj.foreign = Some(instance_id);
                Ok(self.arena.alloc(obj)?)
            }
            "instances" => {
                let ids: Vec<u32> = self
                    .foreign
                    .types
                    .get(type_name)
                    .map(|entry| entry.live.clone())
                    .unwrap_or_default();
                let mut names = Vec::with_capacity(ids.len());
                for id in ids {
                    let name = self.foreign.instances[id as usize].command_name.clone();
                    names.push(self.arena.alloc_string(name)?);
                }
                Ok(self.arena.alloc_list(names)?)
            }
            other => Err(Raise::name_error(format!("unknown subcommand \"{other}\": must be instances or new")).into()),
        }
    }

    fn dispatch_foreign_instance(&mut self, instance_id: u32, argv: &[ObjId]) -> EvalResult<ObjId> {
        let slot_name = self.foreign.instances[instance_id as usize].command_name.clone();
        if argv.len() < 2 {
            return Err(Raise::wrong_num_args(&format!("{slot_name} method ?arg ...?")).into());
        }
        let method = self.arena.string_of(argv[1])?;
        let type_name = self.foreign.instances[instance_id as usize].type_name.clone();
        let handler = self
            .foreign
            .handler(&type_name)
            .ok_or_else(|| Raise::internal(format!("foreign type \"{type_name}\" vanished")))?;
        if method == "destroy" {
            let slot = &mut self.foreign.instances[instance_id as usize];
            let data = slot.data.take();
            slot.alive = false;
            if let Some(entry) = self.foreign.types.get_mut(&type_name) {
                entry.live.retain(|&id| id != instance_id);
            }
            self.registry.remove(&slot_name);
            if let Some(data) = data {
                handler.destroy(data);
            }
            return Ok(self.arena.empty());
        }
        if !handler.methods().contains(&method.as_str()) {
            let mut methods: Vec<&str> = handler.methods().to_vec();
            methods.push("destroy");
            methods.sort_unstable();
            return Err(Raise::name_error(format!(
                "unknown method \"{method}\": must be {}",
                join_alternatives(&methods)
            ))
            .into());
        }
        let mut data = self.foreign.instances[instance_id as usize]
            .data
            .take()
            .ok_or_else(|| Raise::internal(format!("foreign instance \"{slot_name}\" is busy")))?;
        let result = handler.invoke(self, &mut *data, &method, &argv[2..]);
        self.foreign.instances[instance_id as usize].data = Some(data);
        result.map_err(|exc| foreign_raise(&exc).into())
    }
}

/// Errors from foreign callbacks propagate with the foreign-error kind.
fn foreign_raise(exc: &crate::error::Exception) -> Raise {
    let mut raise = Raise::new(ErrKind::ForeignError, exc.message());
    if exc.error_code() != "NONE" {
        raise.error_code = Some(exc.error_code().to_owned());
    }
    raise
}

fn join_alternatives(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_owned(),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}

/// Keeps error-trace invocation lines readable for long commands.
fn truncate_invocation(text: &str) -> String {
    const LIMIT: usize = 150;
    if text.len() <= LIMIT {
        return text.to_owned();
    }
    let mut end = LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
