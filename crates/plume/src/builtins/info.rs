//! Introspection: the `info` ensemble and `rename`.

use super::{glob_match, wrong_args};
use crate::{
    error::{EvalResult, Raise},
    heap::ObjId,
    interp::{Interp, split_var_name},
    resource::ResourceTracker,
};

pub(super) fn cmd_info<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 {
        return Err(wrong_args("info subcommand ?arg ...?"));
    }
    let subcmd = interp.arena.string_of(argv[1])?;
    match subcmd.as_str() {
        "commands" => {
            let pattern = optional_pattern(interp, argv, 2)?;
            let names = interp.registry.names();
            alloc_filtered(interp, names, pattern.as_deref())
        }
        "procs" => {
            let pattern = optional_pattern(interp, argv, 2)?;
            let names = interp.registry.proc_names();
            alloc_filtered(interp, names, pattern.as_deref())
        }
        "exists" => {
            if argv.len() != 3 {
                return Err(wrong_args("info exists varName"));
            }
            let full = interp.arena.string_of(argv[2])?;
            let (name, index) = split_var_name(&full);
            let exists = interp.var_exists_parts(name, index)?;
            Ok(interp.arena.alloc_bool(exists)?)
        }
        "vars" => {
            let pattern = optional_pattern(interp, argv, 2)?;
            let frame = interp.frames.active();
            let mut names: Vec<String> = frame.vars.keys().chain(frame.links.keys()).cloned().collect();
            names.sort();
            names.dedup();
            alloc_filtered(interp, names, pattern.as_deref())
        }
        "level" => match argv.len() {
            2 => Ok(interp.arena.alloc_int(interp.frames.active_level() as i64)?),
            3 => {
                let requested = interp.arena.get_int(argv[2])?;
                let level = if requested <= 0 {
                    interp.frames.active_level() as i64 + requested
                } else {
                    requested
                };
                let frame = usize::try_from(level)
                    .ok()
                    .and_then(|l| interp.frames.frame(l))
                    .ok_or_else(|| Raise::name_error(format!("bad level \"{requested}\"")))?;
                let (owner, args) = (frame.owner, frame.args);
                if owner.is_nil() {
                    return Ok(interp.empty());
                }
                let mut words = vec![owner];
                words.extend(interp.arena.get_list(args)?);
                Ok(interp.arena.alloc_list(words)?)
            }
            _ => Err(wrong_args("info level ?number?")),
        },
        other => Err(Raise::name_error(format!(
            "unknown or ambiguous subcommand \"{other}\": must be commands, exists, level, procs, or vars"
        ))
        .into()),
    }
}

fn optional_pattern<T: ResourceTracker>(
    interp: &mut Interp<T>,
    argv: &[ObjId],
    at: usize,
) -> EvalResult<Option<String>> {
    match argv.len() - at {
        0 => Ok(None),
        1 => Ok(Some(interp.arena.string_of(argv[at])?)),
        _ => Err(wrong_args("info subcommand ?pattern?")),
    }
}

fn alloc_filtered<T: ResourceTracker>(
    interp: &mut Interp<T>,
    names: Vec<String>,
    pattern: Option<&str>,
) -> EvalResult<ObjId> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        if pattern.is_none_or(|p| glob_match(p, &name, false)) {
            ids.push(interp.arena.alloc_string(name)?);
        }
    }
    Ok(interp.arena.alloc_list(ids)?)
}

pub(super) fn cmd_rename<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() != 3 {
        return Err(wrong_args("rename oldName newName"));
    }
    let old = interp.arena.string_of(argv[1])?;
    let new = interp.arena.string_of(argv[2])?;
    interp.registry.rename(&old, &new)?;
    Ok(interp.empty())
}
