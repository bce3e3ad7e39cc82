#![doc = include_str!("../../../README.md")]

mod builtins;
mod dict;
mod error;
mod eval;
mod expr;
mod foreign;
mod frame;
mod heap;
mod interp;
mod io;
mod object;
mod parse;
mod registry;
mod resource;
mod subst;
pub mod tracer;
mod value;

pub use crate::{
    error::{ErrKind, Exception},
    foreign::ForeignHandler,
    heap::{ArenaStats, ObjId},
    interp::Interp,
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint},
    object::{DictPairs, Object},
    parse::{Completeness, Parsed, Script, check_complete, parse_script},
    resource::{
        DEFAULT_MAX_RECURSION_DEPTH, LimitedTracker, NO_LIMIT_TRACKER, NoLimitTracker, ResourceError, ResourceLimits,
        ResourceTracker,
    },
    tracer::{EvalTracer, NoopTracer, RecordingTracer, StderrTracer, TraceEvent},
};
