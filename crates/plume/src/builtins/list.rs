//! List commands: construction, access, mutation-by-copy, and sorting.

use std::cmp::Ordering;

use super::{parse_list_index, wrong_args};
use crate::{
    error::{ErrKind, EvalResult, Flow, Raise},
    heap::ObjId,
    interp::{Interp, split_var_name},
    resource::ResourceTracker,
    value::quote_element,
};

pub(super) fn cmd_list<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    Ok(interp.arena.alloc_list(argv[1..].to_vec())?)
}

pub(super) fn cmd_llength<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() != 2 {
        return Err(wrong_args("llength list"));
    }
    let len = interp.arena.list_len(argv[1])?;
    Ok(interp.arena.alloc_int(len as i64)?)
}

pub(super) fn cmd_lindex<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 {
        return Err(wrong_args("lindex list ?index ...?"));
    }
    let mut current = argv[1];
    for &index_arg in &argv[2..] {
        let items = interp.arena.get_list(current)?;
        let spec = interp.arena.string_of(index_arg)?;
        let index = parse_list_index(&spec, items.len())?;
        if index < 0 || index as usize >= items.len() {
            return Ok(interp.empty());
        }
        current = items[index as usize];
    }
    Ok(current)
}

pub(super) fn cmd_lrange<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() != 4 {
        return Err(wrong_args("lrange list first last"));
    }
    let items = interp.arena.get_list(argv[1])?;
    let first_spec = interp.arena.string_of(argv[2])?;
    let last_spec = interp.arena.string_of(argv[3])?;
    let first = parse_list_index(&first_spec, items.len())?.max(0) as usize;
    let last = parse_list_index(&last_spec, items.len())?;
    if last < first as i64 || first >= items.len() {
        return Ok(interp.empty());
    }
    let last = (last as usize).min(items.len() - 1);
    Ok(interp.arena.alloc_list(items[first..=last].to_vec())?)
}

pub(super) fn cmd_lappend<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 {
        return Err(wrong_args("lappend varName ?value value ...?"));
    }
    let full = interp.arena.string_of(argv[1])?;
    let (name, index) = split_var_name(&full);
    let mut items = match interp.var_get_parts(name, index) {
        Ok(id) => interp.arena.get_list(id)?,
        Err(Flow::Error(raise)) if raise.kind == ErrKind::NameError => Vec::new(),
        Err(flow) => return Err(flow),
    };
    items.extend_from_slice(&argv[2..]);
    let result = interp.arena.alloc_list(items)?;
    interp.var_set_parts(name, index, result)
}

pub(super) fn cmd_linsert<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 3 {
        return Err(wrong_args("linsert list index ?element element ...?"));
    }
    let mut items = interp.arena.get_list(argv[1])?;
    let spec = interp.arena.string_of(argv[2])?;
    let index = parse_list_index(&spec, items.len())?.clamp(0, items.len() as i64) as usize;
    for (offset, &element) in argv[3..].iter().enumerate() {
        items.insert(index + offset, element);
    }
    Ok(interp.arena.alloc_list(items)?)
}

pub(super) fn cmd_lreverse<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() != 2 {
        return Err(wrong_args("lreverse list"));
    }
    let mut items = interp.arena.get_list(argv[1])?;
    items.reverse();
    Ok(interp.arena.alloc_list(items)?)
}

pub(super) fn cmd_concat<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    let mut out = String::new();
    for &arg in &argv[1..] {
        let text = interp.arena.string_of(arg)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(trimmed);
    }
    Ok(interp.arena.alloc_string(out)?)
}

pub(super) fn cmd_join<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 || argv.len() > 3 {
        return Err(wrong_args("join list ?joinString?"));
    }
    let separator = if argv.len() == 3 {
        interp.arena.string_of(argv[2])?
    } else {
        " ".to_owned()
    };
    let items = interp.arena.get_list(argv[1])?;
    let mut out = String::new();
    for (n, item) in items.iter().enumerate() {
        if n > 0 {
            out.push_str(&separator);
        }
        out.push_str(interp.arena.get_str(*item)?);
    }
    Ok(interp.arena.alloc_string(out)?)
}

pub(super) fn cmd_split<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 || argv.len() > 3 {
        return Err(wrong_args("split string ?splitChars?"));
    }
    let text = interp.arena.string_of(argv[1])?;
    let separators: Vec<char> = if argv.len() == 3 {
        interp.arena.string_of(argv[2])?.chars().collect()
    } else {
        vec![' ', '\t', '\n', '\r']
    };
    let mut elements: Vec<ObjId> = Vec::new();
    if separators.is_empty() {
        for c in text.chars() {
            elements.push(interp.arena.alloc_string(c.to_string())?);
        }
    } else {
        let mut current = String::new();
        for c in text.chars() {
            if separators.contains(&c) {
                elements.push(interp.arena.alloc_string(std::mem::take(&mut current))?);
            } else {
                current.push(c);
            }
        }
        elements.push(interp.arena.alloc_string(current)?);
    }
    Ok(interp.arena.alloc_list(elements)?)
}

/// Sort key comparison mode.
enum SortMode {
    Ascii,
    Integer,
    Real,
    /// A comparator command invoked with the two elements appended.
    Command(String),
}

struct SortSpec {
    mode: SortMode,
    nocase: bool,
    decreasing: bool,
    unique: bool,
}

pub(super) fn cmd_lsort<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 2 {
        return Err(wrong_args("lsort ?options? list"));
    }
    let mut spec = SortSpec {
        mode: SortMode::Ascii,
        nocase: false,
        decreasing: false,
        unique: false,
    };
    let mut i = 1;
    while i < argv.len() - 1 {
        let option = interp.arena.string_of(argv[i])?;
        match option.as_str() {
            "-ascii" => spec.mode = SortMode::Ascii,
            "-integer" => spec.mode = SortMode::Integer,
            "-real" => spec.mode = SortMode::Real,
            "-nocase" => spec.nocase = true,
            "-increasing" => spec.decreasing = false,
            "-decreasing" => spec.decreasing = true,
            "-unique" => spec.unique = true,
            "-command" => {
                i += 1;
                if i >= argv.len() - 1 {
                    return Err(wrong_args("lsort -command command list"));
                }
                spec.mode = SortMode::Command(interp.arena.string_of(argv[i])?);
            }
            other => {
                return Err(Raise::name_error(format!(
                    "bad option \"{other}\": must be -ascii, -command, -decreasing, -increasing, -integer, -nocase, -real, or -unique"
                ))
                .into());
            }
        }
        i += 1;
    }
    let items = interp.arena.get_list(argv[i])?;
    let mut sorted = merge_sort(interp, items, &spec)?;
    if spec.unique {
        let mut unique: Vec<ObjId> = Vec::with_capacity(sorted.len());
        for item in sorted {
            match unique.last() {
                Some(&last) if compare(interp, &spec, last, item)? == Ordering::Equal => {}
                _ => unique.push(item),
            }
        }
        sorted = unique;
    }
    Ok(interp.arena.alloc_list(sorted)?)
}

/// Stable O(n log n) merge sort; the comparator can fail (bad numeric
/// element, comparator script error), so the standard-library sorts don't
/// fit.
fn merge_sort<T: ResourceTracker>(interp: &mut Interp<T>, items: Vec<ObjId>, spec: &SortSpec) -> EvalResult<Vec<ObjId>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mid = items.len() / 2;
    let right_half = items[mid..].to_vec();
    let left_half = items[..mid].to_vec();
    let left = merge_sort(interp, left_half, spec)?;
    let right = merge_sort(interp, right_half, spec)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut li, mut ri) = (0, 0);
    while li < left.len() && ri < right.len() {
        // take from the left on ties to keep the sort stable
        if compare(interp, spec, right[ri], left[li])? == Ordering::Less {
            merged.push(right[ri]);
            ri += 1;
        } else {
            merged.push(left[li]);
            li += 1;
        }
    }
    merged.extend_from_slice(&left[li..]);
    merged.extend_from_slice(&right[ri..]);
    Ok(merged)
}

fn compare<T: ResourceTracker>(interp: &mut Interp<T>, spec: &SortSpec, a: ObjId, b: ObjId) -> EvalResult<Ordering> {
    let ordering = match &spec.mode {
        SortMode::Ascii => {
            let left = interp.arena.string_of(a)?;
            let right = interp.arena.string_of(b)?;
            if spec.nocase {
                left.to_lowercase().cmp(&right.to_lowercase())
            } else {
                left.cmp(&right)
            }
        }
        SortMode::Integer => interp.arena.get_int(a)?.cmp(&interp.arena.get_int(b)?),
        SortMode::Real => {
            let left = interp.arena.get_double(a)?;
            let right = interp.arena.get_double(b)?;
            left.partial_cmp(&right).unwrap_or(Ordering::Equal)
        }
        SortMode::Command(command) => {
            let mut invocation = command.clone();
            invocation.push(' ');
            let left = interp.arena.string_of(a)?;
            quote_element(&left, &mut invocation);
            invocation.push(' ');
            let right = interp.arena.string_of(b)?;
            quote_element(&right, &mut invocation);
            let result = interp.eval_nested_str(&invocation)?;
            interp.arena.get_int(result)?.cmp(&0)
        }
    };
    Ok(if spec.decreasing { ordering.reverse() } else { ordering })
}
