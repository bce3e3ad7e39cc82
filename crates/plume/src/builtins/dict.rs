//! The `dict` command ensemble. Dict values are immutable; `dict set` and
//! `dict remove` build new objects, and variable forms rebind the variable.

use super::{glob_match, wrong_args};
use crate::{
    dict::Dict,
    error::{ErrKind, EvalResult, Flow, Raise},
    heap::ObjId,
    interp::{Interp, split_var_name},
    parse::Parsed,
    resource::ResourceTracker,
};

pub(super) fn cmd_dict<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 {
        return Err(wrong_args("dict subcommand ?arg ...?"));
    }
    let subcmd = interp.arena.string_of(argv[1])?;
    match subcmd.as_str() {
        "create" => dict_create(interp, &argv[2..]),
        "get" => dict_get(interp, &argv[2..]),
        "set" => dict_set(interp, &argv[2..]),
        "exists" => dict_exists(interp, &argv[2..]),
        "keys" => dict_keys(interp, &argv[2..]),
        "values" => dict_values(interp, &argv[2..]),
        "size" => dict_size(interp, &argv[2..]),
        "remove" => dict_remove(interp, &argv[2..]),
        "for" => dict_for(interp, &argv[2..]),
        other => Err(Raise::name_error(format!(
            "unknown or ambiguous subcommand \"{other}\": must be create, exists, for, get, keys, remove, set, size, or values"
        ))
        .into()),
    }
}

fn dict_create<T: ResourceTracker>(interp: &mut Interp<T>, args: &[ObjId]) -> EvalResult<ObjId> {
    if args.len() % 2 != 0 {
        return Err(wrong_args("dict create ?key value ...?"));
    }
    let mut dict = Dict::new();
    for pair in args.chunks_exact(2) {
        let key = interp.arena.string_of(pair[0])?;
        dict.insert(key, pair[1]);
    }
    Ok(interp.arena.alloc_dict(dict)?)
}

fn dict_get<T: ResourceTracker>(interp: &mut Interp<T>, args: &[ObjId]) -> EvalResult<ObjId> {
    if args.is_empty() {
        return Err(wrong_args("dict get dictionary ?key ...?"));
    }
    let mut current = args[0];
    for &key_arg in &args[1..] {
        let key = interp.arena.string_of(key_arg)?;
        let dict = interp.arena.dict_ref(current)?;
        current = dict
            .get(&key)
            .ok_or_else(|| Raise::name_error(format!("key \"{key}\" not known in dictionary")))?;
    }
    Ok(current)
}

fn dict_set<T: ResourceTracker>(interp: &mut Interp<T>, args: &[ObjId]) -> EvalResult<ObjId> {
    if args.len() < 3 {
        return Err(wrong_args("dict set dictVarName key ?key ...? value"));
    }
    let full = interp.arena.string_of(args[0])?;
    let (name, index) = split_var_name(&full);
    let existing = match interp.var_get_parts(name, index) {
        Ok(id) => Some(id),
        Err(Flow::Error(raise)) if raise.kind == ErrKind::NameError => None,
        Err(flow) => return Err(flow),
    };
    let keys = &args[1..args.len() - 1];
    let value = args[args.len() - 1];
    let rebuilt = dict_set_path(interp, existing, keys, value)?;
    interp.var_set_parts(name, index, rebuilt)
}

/// Copy-on-write nested insert: rebuilds the dicts along the key path.
fn dict_set_path<T: ResourceTracker>(
    interp: &mut Interp<T>,
    existing: Option<ObjId>,
    keys: &[ObjId],
    value: ObjId,
) -> EvalResult<ObjId> {
    let mut dict = match existing {
        Some(id) => interp.arena.dict_of(id)?,
        None => Dict::new(),
    };
    let key = interp.arena.string_of(keys[0])?;
    if keys.len() == 1 {
        dict.insert(key, value);
    } else {
        let inner = dict.get(&key);
        let rebuilt = dict_set_path(interp, inner, &keys[1..], value)?;
        dict.insert(key, rebuilt);
    }
    Ok(interp.arena.alloc_dict(dict)?)
}

fn dict_exists<T: ResourceTracker>(interp: &mut Interp<T>, args: &[ObjId]) -> EvalResult<ObjId> {
    if args.len() < 2 {
        return Err(wrong_args("dict exists dictionary key ?key ...?"));
    }
    let mut current = args[0];
    for &key_arg in &args[1..] {
        let key = interp.arena.string_of(key_arg)?;
        let Ok(dict) = interp.arena.dict_ref(current) else {
            return Ok(interp.arena.alloc_bool(false)?);
        };
        match dict.get(&key) {
            Some(next) => current = next,
            None => return Ok(interp.arena.alloc_bool(false)?),
        }
    }
    Ok(interp.arena.alloc_bool(true)?)
}

fn dict_keys<T: ResourceTracker>(interp: &mut Interp<T>, args: &[ObjId]) -> EvalResult<ObjId> {
    if args.is_empty() || args.len() > 2 {
        return Err(wrong_args("dict keys dictionary ?pattern?"));
    }
    let pattern = if args.len() == 2 {
        Some(interp.arena.string_of(args[1])?)
    } else {
        None
    };
    let keys: Vec<String> = interp
        .arena
        .dict_ref(args[0])?
        .keys()
        .filter(|key| pattern.as_deref().is_none_or(|p| glob_match(p, key, false)))
        .map(str::to_owned)
        .collect();
    let mut ids = Vec::with_capacity(keys.len());
    for key in keys {
        ids.push(interp.arena.alloc_string(key)?);
    }
    Ok(interp.arena.alloc_list(ids)?)
}

fn dict_values<T: ResourceTracker>(interp: &mut Interp<T>, args: &[ObjId]) -> EvalResult<ObjId> {
    if args.len() != 1 {
        return Err(wrong_args("dict values dictionary"));
    }
    let values: Vec<ObjId> = interp.arena.dict_ref(args[0])?.values().collect();
    Ok(interp.arena.alloc_list(values)?)
}

fn dict_size<T: ResourceTracker>(interp: &mut Interp<T>, args: &[ObjId]) -> EvalResult<ObjId> {
    if args.len() != 1 {
        return Err(wrong_args("dict size dictionary"));
    }
    let size = interp.arena.dict_ref(args[0])?.len();
    Ok(interp.arena.alloc_int(size as i64)?)
}

fn dict_remove<T: ResourceTracker>(interp: &mut Interp<T>, args: &[ObjId]) -> EvalResult<ObjId> {
    if args.is_empty() {
        return Err(wrong_args("dict remove dictionary ?key ...?"));
    }
    let mut dict = interp.arena.dict_of(args[0])?;
    for &key_arg in &args[1..] {
        let key = interp.arena.string_of(key_arg)?;
        dict.remove(&key);
    }
    Ok(interp.arena.alloc_dict(dict)?)
}

fn dict_for<T: ResourceTracker>(interp: &mut Interp<T>, args: &[ObjId]) -> EvalResult<ObjId> {
    if args.len() != 3 {
        return Err(wrong_args("dict for {keyVarName valueVarName} dictionary body"));
    }
    let var_items = interp.arena.get_list(args[0])?;
    if var_items.len() != 2 {
        return Err(Raise::wrong_type("must have exactly two variable names").into());
    }
    let key_var = interp.arena.string_of(var_items[0])?;
    let value_var = interp.arena.string_of(var_items[1])?;
    let pairs: Vec<(String, ObjId)> = interp
        .arena
        .dict_ref(args[1])?
        .iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();
    let source = interp.arena.string_of(args[2])?;
    let body = match crate::parse::parse_script(&source) {
        Parsed::Complete(script) => std::rc::Rc::new(script),
        Parsed::Incomplete { .. } => {
            return Err(Raise::new(ErrKind::ParseError, "unexpected end of script: missing closing delimiter").into());
        }
        Parsed::Error { message, .. } => return Err(Raise::new(ErrKind::ParseError, message).into()),
    };
    for (key, value) in pairs {
        let key_id = interp.arena.alloc_string(key)?;
        interp.var_set_parts(&key_var, None, key_id)?;
        interp.var_set_parts(&value_var, None, value)?;
        match interp.eval_script(body.clone()) {
            Ok(_) => {}
            Err(Flow::Break) => break,
            Err(Flow::Continue) => {}
            Err(flow) => return Err(flow),
        }
    }
    Ok(interp.empty())
}
