//! The `string` command ensemble. Indexing is character-based.

use super::{glob_match, parse_list_index, wrong_args};
use crate::{
    error::{EvalResult, Raise},
    heap::ObjId,
    interp::Interp,
    resource::ResourceTracker,
};

pub(super) fn cmd_string<T: ResourceTracker>(interp: &mut Interp<T>, argv: &[ObjId]) -> EvalResult<ObjId> {
    if argv.len() < 3 {
        return Err(wrong_args("string subcommand string ?arg ...?"));
    }
    let subcmd = interp.arena.string_of(argv[1])?;
    match subcmd.as_str() {
        "length" => {
            let text = interp.arena.string_of(argv[2])?;
            Ok(interp.arena.alloc_int(text.chars().count() as i64)?)
        }
        "index" => {
            if argv.len() != 4 {
                return Err(wrong_args("string index string charIndex"));
            }
            let text = interp.arena.string_of(argv[2])?;
            let chars: Vec<char> = text.chars().collect();
            let spec = interp.arena.string_of(argv[3])?;
            let index = parse_list_index(&spec, chars.len())?;
            if index < 0 || index as usize >= chars.len() {
                return Ok(interp.empty());
            }
            Ok(interp.arena.alloc_string(chars[index as usize].to_string())?)
        }
        "range" => {
            if argv.len() != 5 {
                return Err(wrong_args("string range string first last"));
            }
            let text = interp.arena.string_of(argv[2])?;
            let chars: Vec<char> = text.chars().collect();
            let first_spec = interp.arena.string_of(argv[3])?;
            let last_spec = interp.arena.string_of(argv[4])?;
            let first = parse_list_index(&first_spec, chars.len())?.max(0) as usize;
            let last = parse_list_index(&last_spec, chars.len())?;
            if last < first as i64 || first >= chars.len() {
                return Ok(interp.empty());
            }
            let last = (last as usize).min(chars.len() - 1);
            let out: String = chars[first..=last].iter().collect();
            Ok(interp.arena.alloc_string(out)?)
        }
        "toupper" => {
            let text = interp.arena.string_of(argv[2])?;
            Ok(interp.arena.alloc_string(text.to_uppercase())?)
        }
        "tolower" => {
            let text = interp.arena.string_of(argv[2])?;
            Ok(interp.arena.alloc_string(text.to_lowercase())?)
        }
        "trim" | "trimleft" | "trimright" => {
            if argv.len() > 4 {
                return Err(wrong_args("string trim string ?chars?"));
            }
            let text = interp.arena.string_of(argv[2])?;
            let chars: Vec<char> = if argv.len() == 4 {
                interp.arena.string_of(argv[3])?.chars().collect()
            } else {
                vec![' ', '\t', '\n', '\r', '\x0b', '\x0c']
            };
            let matches = |c: char| chars.contains(&c);
            let out = match subcmd.as_str() {
                "trim" => text.trim_matches(matches),
                "trimleft" => text.trim_start_matches(matches),
                _ => text.trim_end_matches(matches),
            };
            Ok(interp.arena.alloc_string(out.to_owned())?)
        }
        "equal" | "compare" => {
            let mut i = 2;
            let mut nocase = false;
            while i < argv.len() {
                let word = interp.arena.string_of(argv[i])?;
                if word == "-nocase" {
                    nocase = true;
                    i += 1;
                } else {
                    break;
                }
            }
            if argv.len() - i != 2 {
                return Err(wrong_args("string compare ?-nocase? string1 string2"));
            }
            let mut left = interp.arena.string_of(argv[i])?;
            let mut right = interp.arena.string_of(argv[i + 1])?;
            if nocase {
                left = left.to_lowercase();
                right = right.to_lowercase();
            }
            if subcmd == "equal" {
                Ok(interp.arena.alloc_bool(left == right)?)
            } else {
                let ordering = match left.cmp(&right) {
                    std::cmp::Ordering::Less => -1,
                    std::cmp::Ordering::Equal => 0,
                    std::cmp::Ordering::Greater => 1,
                };
                Ok(interp.arena.alloc_int(ordering)?)
            }
        }
        "repeat" => {
            if argv.len() != 4 {
                return Err(wrong_args("string repeat string count"));
            }
            let text = interp.arena.string_of(argv[2])?;
            let count = interp.arena.get_int(argv[3])?;
            let count = usize::try_from(count).unwrap_or(0);
            Ok(interp.arena.alloc_string(text.repeat(count))?)
        }
        "first" => {
            if argv.len() != 4 {
                return Err(wrong_args("string first needleString haystackString"));
            }
            let needle = interp.arena.string_of(argv[2])?;
            let haystack = interp.arena.string_of(argv[3])?;
            let index = haystack
                .find(&needle)
                .map_or(-1, |byte| haystack[..byte].chars().count() as i64);
            Ok(interp.arena.alloc_int(index)?)
        }
        "match" => {
            let mut i = 2;
            let mut nocase = false;
            while i < argv.len() {
                let word = interp.arena.string_of(argv[i])?;
                if word == "-nocase" {
                    nocase = true;
                    i += 1;
                } else {
                    break;
                }
            }
            if argv.len() - i != 2 {
                return Err(wrong_args("string match ?-nocase? pattern string"));
            }
            let pattern = interp.arena.string_of(argv[i])?;
            let text = interp.arena.string_of(argv[i + 1])?;
            Ok(interp.arena.alloc_bool(glob_match(&pattern, &text, nocase))?)
        }
        other => Err(Raise::name_error(format!(
            "unknown or ambiguous subcommand \"{other}\": must be compare, equal, first, index, length, match, range, repeat, tolower, toupper, trim, trimleft, or trimright"
        ))
        .into()),
    }
}
