//! Control-flow commands: `if`, `while`, `for`, `foreach`, `break`,
//! `continue`, `proc`, `return`, `catch`, `error`, and `expr`.

use std::{cell::RefCell, rc::Rc};

use super::wrong_args;
use crate::{
    error::{ErrKind, EvalResult, Flow, Raise, ReturnCode, ReturnOpts},
    expr::{eval_expr_bool, eval_expr_obj},
    heap::ObjId,
    interp::Interp,
    parse::{Parsed, Script, parse_script},
    registry::{CommandKind, Param, ProcDef},
    resource::ResourceTracker,
};

/// Parses a body word into a script, reporting parse failures as errors.
fn parse_body<T: ResourceTracker>(interp: &mut Interp<T>, id: ObjId) -> EvalResult<Rc<Script>> {
    let source = interp.arena.string_of(id)?;
    match parse_script(&source) {
        Parsed::Complete(script) => Ok(Rc::new(script)),
        Parsed::Incomplete { .. } => {
            Err(Raise::new(ErrKind::ParseError, "unexpected end of script: missing closing delimiter").into())
        }
        Parsed::Error { message, .. } => Err(Raise::new(ErrKind::ParseError, message).into()),
    }
}

pub(super) fn cmd_if<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 3 {
        return Err(wrong_args("if expr1 ?then? body1 elseif expr2 ?then? body2 ... ?else? ?bodyN?"));
    }
    let mut i = 1;
    loop {
        let condition = interp.arena.string_of(argv[i])?;
        i += 1;
        if i < argv.len() && interp.arena.get_str(argv[i])? == "then" {
            i += 1;
        }
        if i >= argv.len() {
            return Err(Raise::new(
                ErrKind::WrongNumArgs,
                format!("wrong # args: no script following \"{condition}\" argument"),
            )
            .into());
        }
        let body = argv[i];
        i += 1;
        if eval_expr_bool(interp, &condition)? {
            let script = parse_body(interp, body)?;
            return interp.eval_script(script);
        }
        if i >= argv.len() {
            return Ok(interp.empty());
        }
        let word = interp.arena.string_of(argv[i])?;
        match word.as_str() {
            "elseif" => {
                i += 1;
                if i >= argv.len() {
                    return Err(wrong_args("if expr1 ?then? body1 elseif expr2 ?then? body2 ..."));
                }
            }
            "else" => {
                i += 1;
                if i != argv.len() - 1 {
                    return Err(Raise::new(
                        ErrKind::WrongNumArgs,
                        "wrong # args: extra words after \"else\" clause",
                    )
                    .into());
                }
                let script = parse_body(interp, argv[i])?;
                return interp.eval_script(script);
            }
            _ => {
                // bare else body
                if i != argv.len() - 1 {
                    return Err(wrong_args("if expr1 ?then? body1 ?else? ?bodyN?"));
                }
                let script = parse_body(interp, argv[i])?;
                return interp.eval_script(script);
            }
        }
    }
}

pub(super) fn cmd_while<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() != 3 {
        return Err(wrong_args("while test command"));
    }
    let test = interp.arena.string_of(argv[1])?;
    let body = parse_body(interp, argv[2])?;
    while eval_expr_bool(interp, &test)? {
        match interp.eval_script(body.clone()) {
            Ok(_) => {}
            Err(Flow::Break) => break,
            Err(Flow::Continue) => {}
            Err(flow) => return Err(flow),
        }
    }
    Ok(interp.empty())
}

pub(super) fn cmd_for<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() != 5 {
        return Err(wrong_args("for start test next command"));
    }
    let start = parse_body(interp, argv[1])?;
    let test = interp.arena.string_of(argv[2])?;
    let next = parse_body(interp, argv[3])?;
    let body = parse_body(interp, argv[4])?;
    interp.eval_script(start)?;
    while eval_expr_bool(interp, &test)? {
        match interp.eval_script(body.clone()) {
            Ok(_) => {}
            Err(Flow::Break) => break,
            Err(Flow::Continue) => {}
            Err(flow) => return Err(flow),
        }
        match interp.eval_script(next.clone()) {
            Ok(_) => {}
            Err(Flow::Break) => break,
            Err(flow) => return Err(flow),
        }
    }
    Ok(interp.empty())
}

pub(super) fn cmd_foreach<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 4 || argv.len() % 2 != 0 {
        return Err(wrong_args("foreach varList list ?varList list ...? command"));
    }
    let body = parse_body(interp, argv[argv.len() - 1])?;
    let mut groups: Vec<(Vec<String>, Vec<ObjId>)> = Vec::new();
    let mut iterations = 0usize;
    let mut pair = 1;
    while pair + 1 < argv.len() {
        let var_items = interp.arena.get_list(argv[pair])?;
        let mut vars = Vec::with_capacity(var_items.len());
        for item in var_items {
            vars.push(interp.arena.string_of(item)?);
        }
        if vars.is_empty() {
            return Err(Raise::wrong_type("foreach varlist is empty").into());
        }
        let values = interp.arena.get_list(argv[pair + 1])?;
        iterations = iterations.max(values.len().div_ceil(vars.len()));
        groups.push((vars, values));
        pair += 2;
    }
    for iteration in 0..iterations {
        for (vars, values) in &groups {
            for (k, var) in vars.iter().enumerate() {
                let value = values
                    .get(iteration * vars.len() + k)
                    .copied()
                    .unwrap_or_else(|| interp.empty());
                interp.var_set_parts(var, None, value)?;
            }
        }
        match interp.eval_script(body.clone()) {
            Ok(_) => {}
            Err(Flow::Break) => break,
            Err(Flow::Continue) => {}
            Err(flow) => return Err(flow),
        }
    }
    Ok(interp.empty())
}

pub(super) fn cmd_break<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() != 1 {
        return Err(wrong_args("break"));
    }
    let _ = interp;
    Err(Flow::Break)
}

pub(super) fn cmd_continue<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() != 1 {
        return Err(wrong_args("continue"));
    }
    let _ = interp;
    Err(Flow::Continue)
}

pub(super) fn cmd_proc<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() != 4 {
        return Err(wrong_args("proc name args body"));
    }
    let name = interp.arena.string_of(argv[1])?;
    let param_items = interp.arena.get_list(argv[2])?;
    let mut params = Vec::with_capacity(param_items.len());
    for &item in &param_items {
        let fields = interp.arena.get_list(item)?;
        match fields.as_slice() {
            [] => {
                return Err(Raise::wrong_type(format!("argument with no name in \"{name}\"")).into());
            }
            [field] => {
                let param_name = interp.arena.string_of(*field)?;
                params.push(Param {
                    name: param_name,
                    default: None,
                });
            }
            [field, default] => {
                let param_name = interp.arena.string_of(*field)?;
                params.push(Param {
                    name: param_name,
                    default: Some(*default),
                });
            }
            _ => {
                return Err(Raise::wrong_type(format!(
                    "too many fields in argument specifier \"{}\"",
                    interp.arena.string_of(item)?
                ))
                .into());
            }
        }
    }
    let variadic = params.last().is_some_and(|p| p.name == "args" && p.default.is_none());
    let mut usage_suffix = String::new();
    for (i, param) in params.iter().enumerate() {
        if variadic && i + 1 == params.len() {
            usage_suffix.push_str(" ?arg ...?");
        } else if param.default.is_some() {
            usage_suffix.push_str(&format!(" ?{}?", param.name));
        } else {
            usage_suffix.push_str(&format!(" {}", param.name));
        }
    }
    let def = ProcDef {
        params_obj: argv[2],
        body_obj: argv[3],
        params,
        variadic,
        body: RefCell::new(None),
        usage_suffix,
    };
    interp.registry.register(name, CommandKind::Proc(Rc::new(def)));
    Ok(interp.empty())
}

pub(super) fn cmd_return<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    let mut code = ReturnCode::Ok;
    let mut level: u32 = 1;
    let mut error_code: Option<String> = None;
    let mut error_info: Option<String> = None;
    let mut i = 1;
    while i + 1 < argv.len() {
        let word = interp.arena.string_of(argv[i])?;
        match word.as_str() {
            "-code" => {
                let value = interp.arena.string_of(argv[i + 1])?;
                code = ReturnCode::parse(&value)
                    .ok_or_else(|| Raise::wrong_type(format!("bad completion code \"{value}\"")))?;
                i += 2;
            }
            "-level" => {
                let value = interp.arena.get_int(argv[i + 1])?;
                level = u32::try_from(value).map_err(|_| Raise::wrong_type(format!("bad -level value \"{value}\"")))?;
                i += 2;
            }
            "-errorcode" => {
                error_code = Some(interp.arena.string_of(argv[i + 1])?);
                i += 2;
            }
            "-errorinfo" => {
                error_info = Some(interp.arena.string_of(argv[i + 1])?);
                i += 2;
            }
            _ => break,
        }
    }
    let value = match argv.len() - i {
        0 => interp.empty(),
        1 => argv[i],
        _ => return Err(wrong_args("return ?-code code? ?-level level? ?result?")),
    };
    record_return_options(interp, code, level, error_code.as_deref(), error_info.as_deref())?;
    if level == 0 {
        return match code {
            ReturnCode::Ok => Ok(value),
            ReturnCode::Error => {
                let message = interp.arena.string_of(value)?;
                let mut raise = Raise::new(ErrKind::General, message);
                raise.error_code = error_code;
                Err(raise.into())
            }
            ReturnCode::Break => Err(Flow::Break),
            ReturnCode::Continue => Err(Flow::Continue),
            ReturnCode::Return => Err(Flow::Return {
                value,
                code: ReturnCode::Ok,
                level: 1,
                options: None,
            }),
        };
    }
    let options = if error_code.is_some() || error_info.is_some() {
        Some(Box::new(ReturnOpts {
            error_code,
            error_info,
        }))
    } else {
        None
    };
    Err(Flow::Return {
        value,
        code,
        level,
        options,
    })
}

/// Keeps the interpreter's return-options dictionary current.
fn record_return_options<T: ResourceTracker>(
    interp: &mut Interp<T>,
    code: ReturnCode,
    level: u32,
    error_code: Option<&str>,
    error_info: Option<&str>,
) -> EvalResult<()> {
    let mut options = crate::dict::Dict::new();
    let code_id = interp.arena.alloc_int(code.as_i64())?;
    options.insert("-code".to_owned(), code_id);
    let level_id = interp.arena.alloc_int(i64::from(level))?;
    options.insert("-level".to_owned(), level_id);
    if let Some(error_code) = error_code {
        let id = interp.arena.alloc_string(error_code)?;
        options.insert("-errorcode".to_owned(), id);
    }
    if let Some(error_info) = error_info {
        let id = interp.arena.alloc_string(error_info)?;
        options.insert("-errorinfo".to_owned(), id);
    }
    let id = interp.arena.alloc_dict(options)?;
    interp.return_options = Some(id);
    Ok(())
}

pub(super) fn cmd_catch<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 || argv.len() > 3 {
        return Err(wrong_args("catch command ?varName?"));
    }
    let script = interp.arena.string_of(argv[1])?;
    let (code, result) = match interp.eval_nested_str(&script) {
        Ok(value) => (0, value),
        Err(flow) => {
            let code = flow.catch_code();
            let result = match flow {
                Flow::Error(raise) => {
                    interp.record_error_state(&raise);
                    interp.arena.alloc_string(raise.message)?
                }
                Flow::Return { value, .. } => value,
                Flow::Break | Flow::Continue => interp.empty(),
            };
            (code, result)
        }
    };
    if argv.len() == 3 {
        let full = interp.arena.string_of(argv[2])?;
        let (name, index) = crate::interp::split_var_name(&full);
        interp.var_set_parts(name, index, result)?;
    }
    Ok(interp.arena.alloc_int(code)?)
}

pub(super) fn cmd_error<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 || argv.len() > 4 {
        return Err(wrong_args("error message ?errorInfo? ?errorCode?"));
    }
    let message = interp.arena.string_of(argv[1])?;
    let mut raise = Raise::new(ErrKind::General, message.clone());
    if argv.len() >= 3 {
        let info = interp.arena.string_of(argv[2])?;
        if !info.is_empty() {
            // seed the unwind trace with caller-provided errorInfo
            let mut lines = info.lines();
            if lines.next() == Some(message.as_str()) {
                raise.trace.extend(lines.map(str::to_owned));
            } else {
                raise.trace.extend(info.lines().map(str::to_owned));
            }
        }
    }
    if argv.len() == 4 {
        let code = interp.arena.string_of(argv[3])?;
        raise.error_code = Some(code);
    }
    Err(raise.into())
}

pub(super) fn cmd_expr<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 {
        return Err(wrong_args("expr arg ?arg ...?"));
    }
    let mut text = String::new();
    for (n, &arg) in argv[1..].iter().enumerate() {
        if n > 0 {
            text.push(' ');
        }
        text.push_str(interp.arena.get_str(arg)?);
    }
    eval_expr_obj(interp, &text)
}
