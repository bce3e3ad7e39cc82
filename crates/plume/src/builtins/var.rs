//! Variable and frame commands: `set`, `unset`, `incr`, `append`,
//! `global`, `upvar`, `uplevel`, `eval`, `trace`.

use super::{parse_level_spec, wrong_args};
use crate::{
    error::{ErrKind, EvalResult, Flow, Raise},
    frame::TraceOps,
    heap::ObjId,
    interp::{Interp, split_var_name},
    resource::ResourceTracker,
    value::quote_element,
};

pub(super) fn cmd_set<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 || argv.len() > 3 {
        return Err(wrong_args("set varName ?newValue?"));
    }
    let full = interp.arena.string_of(argv[1])?;
    let (name, index) = split_var_name(&full);
    if argv.len() == 3 {
        interp.var_set_parts(name, index, argv[2])
    } else {
        interp.var_get_parts(name, index)
    }
}

pub(super) fn cmd_unset<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    let mut complain = true;
    let mut first = 1;
    while first < argv.len() {
        let word = interp.arena.string_of(argv[first])?;
        match word.as_str() {
            "-nocomplain" => {
                complain = false;
                first += 1;
            }
            "--" => {
                first += 1;
                break;
            }
            _ => break,
        }
    }
    for &arg in &argv[first..] {
        let full = interp.arena.string_of(arg)?;
        let (name, index) = split_var_name(&full);
        interp.var_unset_parts(name, index, complain)?;
    }
    Ok(interp.empty())
}

pub(super) fn cmd_incr<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 || argv.len() > 3 {
        return Err(wrong_args("incr varName ?increment?"));
    }
    let increment = if argv.len() == 3 {
        interp.arena.get_int(argv[2])?
    } else {
        1
    };
    let full = interp.arena.string_of(argv[1])?;
    let (name, index) = split_var_name(&full);
    let current = match interp.var_get_parts(name, index) {
        Ok(id) => interp.arena.get_int(id)?,
        Err(Flow::Error(raise)) if raise.kind == ErrKind::NameError => 0,
        Err(flow) => return Err(flow),
    };
    let result = interp.arena.alloc_int(current.wrapping_add(increment))?;
    interp.var_set_parts(name, index, result)
}

pub(super) fn cmd_append<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 {
        return Err(wrong_args("append varName ?value value ...?"));
    }
    let full = interp.arena.string_of(argv[1])?;
    let (name, index) = split_var_name(&full);
    let mut value = match interp.var_get_parts(name, index) {
        Ok(id) => interp.arena.string_of(id)?,
        Err(Flow::Error(raise)) if raise.kind == ErrKind::NameError => String::new(),
        Err(flow) => return Err(flow),
    };
    for &arg in &argv[2..] {
        value.push_str(interp.arena.get_str(arg)?);
    }
    let result = interp.arena.alloc_string(value)?;
    interp.var_set_parts(name, index, result)
}

pub(super) fn cmd_global<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 {
        return Err(wrong_args("global varName ?varName ...?"));
    }
    if interp.frames.active_level() != 0 {
        for &arg in &argv[1..] {
            let name = interp.arena.string_of(arg)?;
            interp.frames.link(&name, 0, &name)?;
        }
    }
    Ok(interp.empty())
}

pub(super) fn cmd_upvar<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 3 {
        return Err(wrong_args("upvar ?level? otherVar localVar ?otherVar localVar ...?"));
    }
    let first_word = interp.arena.string_of(argv[1])?;
    let (target_level, mut rest) = match parse_level_spec(interp, &first_word) {
        Some(level) if argv.len() > 3 => (level, 2),
        _ => {
            let level = interp
                .frames
                .active_level()
                .checked_sub(1)
                .ok_or_else(|| Raise::name_error("bad level \"1\""))?;
            (level, 1)
        }
    };
    if (argv.len() - rest) % 2 != 0 {
        return Err(wrong_args("upvar ?level? otherVar localVar ?otherVar localVar ...?"));
    }
    while rest < argv.len() {
        let other = interp.arena.string_of(argv[rest])?;
        let local = interp.arena.string_of(argv[rest + 1])?;
        interp.frames.link(&local, target_level, &other)?;
        rest += 2;
    }
    Ok(interp.empty())
}

pub(super) fn cmd_uplevel<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 {
        return Err(wrong_args("uplevel ?level? arg ?arg ...?"));
    }
    let first_word = interp.arena.string_of(argv[1])?;
    let (target_level, first_arg) = match parse_level_spec(interp, &first_word) {
        Some(level) if argv.len() > 2 => (level, 2),
        _ => {
            let level = interp
                .frames
                .active_level()
                .checked_sub(1)
                .ok_or_else(|| Raise::name_error("bad level \"1\""))?;
            (level, 1)
        }
    };
    let script = join_words(interp, &argv[first_arg..])?;
    let previous = interp.frames.set_active(target_level)?;
    let result = interp.eval_nested_str(&script);
    let _ = interp.frames.set_active(previous);
    result
}

pub(super) fn cmd_eval<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 {
        return Err(wrong_args("eval arg ?arg ...?"));
    }
    let script = join_words(interp, &argv[1..])?;
    interp.eval_nested_str(&script)
}

pub(super) fn cmd_trace<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 3 {
        return Err(wrong_args("trace add|remove|info variable name ?ops script?"));
    }
    let action = interp.arena.string_of(argv[1])?;
    let target = interp.arena.string_of(argv[2])?;
    if target != "variable" {
        return Err(Raise::name_error(format!("bad trace target \"{target}\": must be variable")).into());
    }
    match action.as_str() {
        "add" => {
            if argv.len() != 6 {
                return Err(wrong_args("trace add variable name ops script"));
            }
            let name = interp.arena.string_of(argv[3])?;
            let ops = trace_ops(interp, argv[4])?;
            let script = interp.arena.string_of(argv[5])?;
            interp.add_var_trace(&name, ops, script)?;
            Ok(interp.empty())
        }
        "remove" => {
            if argv.len() != 6 {
                return Err(wrong_args("trace remove variable name ops script"));
            }
            let name = interp.arena.string_of(argv[3])?;
            let ops = trace_ops(interp, argv[4])?;
            let script = interp.arena.string_of(argv[5])?;
            interp.remove_var_trace(&name, ops, &script)?;
            Ok(interp.empty())
        }
        "info" => {
            if argv.len() != 4 {
                return Err(wrong_args("trace info variable name"));
            }
            let name = interp.arena.string_of(argv[3])?;
            let traces = interp.var_traces(&name)?;
            let mut entries = Vec::with_capacity(traces.len());
            for (ops, script) in traces {
                let mut entry = String::new();
                quote_element(&ops.render(), &mut entry);
                entry.push(' ');
                quote_element(&script, &mut entry);
                entries.push(interp.arena.alloc_string(entry)?);
            }
            Ok(interp.arena.alloc_list(entries)?)
        }
        other => Err(Raise::name_error(format!("bad option \"{other}\": must be add, info, or remove")).into()),
    }
}

fn trace_ops<T: ResourceTracker>(interp: &mut Interp<T>, id: ObjId) -> Result<TraceOps, Flow> {
    let items = interp.arena.get_list(id)?;
    let mut ops = Vec::with_capacity(items.len());
    for item in items {
        ops.push(interp.arena.string_of(item)?);
    }
    TraceOps::parse(&ops).map_err(|message| Raise::name_error(message).into())
}

/// Concatenates argument string forms with single spaces, the way `eval`
/// and `uplevel` assemble their script.
fn join_words<T: ResourceTracker>(interp: &mut Interp<T>, args: &[ObjId]) -> Result<String, Flow> {
    let mut script = String::new();
    for (n, &arg) in args.iter().enumerate() {
        if n > 0 {
            script.push(' ');
        }
        script.push_str(interp.arena.get_str(arg)?);
    }
    Ok(script)
}
