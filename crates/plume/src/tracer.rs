//! Evaluation tracing infrastructure.
//!
//! Provides a trait-based tracing system for the command evaluator. The
//! [`EvalTracer`] trait defines hook points at key execution events (command
//! dispatch, frame push/pop, variable writes, error unwinding). Concrete
//! implementations collect different kinds of data:
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | No-op (production default) |
//! | [`StderrTracer`] | Human-readable execution log to stderr |
//! | [`RecordingTracer`] | Full event recording for post-mortem inspection |
//!
//! The interpreter holds its tracer as a boxed trait object; swap it with
//! `Interp::set_tracer` before evaluating.

/// Trace event emitted during evaluation.
///
/// Used by [`RecordingTracer`] to capture an execution trace for inspection
/// after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A command is about to be dispatched.
    Command {
        /// Resolved command name.
        name: String,
        /// Number of arguments (excluding the command word).
        argc: usize,
        /// Call-frame depth at dispatch time.
        depth: usize,
    },
    /// A procedure call pushed a new frame.
    FramePush {
        /// Procedure name.
        name: String,
        /// Frame depth after the push.
        depth: usize,
    },
    /// A procedure frame was popped.
    FramePop {
        /// Frame depth after the pop.
        depth: usize,
    },
    /// A variable was written.
    VarWrite {
        /// Variable name as written by the script (without array index).
        name: String,
    },
    /// An error is unwinding through the evaluator.
    ErrorUnwind {
        /// The error message.
        message: String,
    },
}

/// Trait for observing evaluation events.
///
/// All methods have empty default implementations so tracers only override
/// the hook points they care about.
pub trait EvalTracer: std::fmt::Debug {
    /// Called before each command dispatch.
    fn on_command(&mut self, _name: &str, _argc: usize, _depth: usize) {}

    /// Called after a procedure frame is pushed.
    fn on_frame_push(&mut self, _name: &str, _depth: usize) {}

    /// Called after a procedure frame is popped.
    fn on_frame_pop(&mut self, _depth: usize) {}

    /// Called after a variable write completes.
    fn on_var_write(&mut self, _name: &str) {}

    /// Called when an error begins unwinding.
    fn on_error(&mut self, _message: &str) {}
}

/// No-op tracer, the production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {}

/// Tracer that logs a human-readable line per event to stderr.
#[derive(Debug, Default)]
pub struct StderrTracer {
    /// Number of events emitted so far.
    count: u64,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, line: &str) {
        self.count += 1;
        eprintln!("[plume:{:>6}] {line}", self.count);
    }
}

impl EvalTracer for StderrTracer {
    fn on_command(&mut self, name: &str, argc: usize, depth: usize) {
        self.emit(&format!("{:indent$}cmd {name} ({argc} args)", "", indent = depth * 2));
    }

    fn on_frame_push(&mut self, name: &str, depth: usize) {
        self.emit(&format!("push frame {depth} for proc {name}"));
    }

    fn on_frame_pop(&mut self, depth: usize) {
        self.emit(&format!("pop frame -> depth {depth}"));
    }

    fn on_error(&mut self, message: &str) {
        self.emit(&format!("error: {message}"));
    }
}

/// Tracer that records every event for later inspection.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The events recorded so far, in emission order.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Consumes the tracer and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl EvalTracer for RecordingTracer {
    fn on_command(&mut self, name: &str, argc: usize, depth: usize) {
        self.events.push(TraceEvent::Command {
            name: name.to_owned(),
            argc,
            depth,
        });
    }

    fn on_frame_push(&mut self, name: &str, depth: usize) {
        self.events.push(TraceEvent::FramePush {
            name: name.to_owned(),
            depth,
        });
    }

    fn on_frame_pop(&mut self, depth: usize) {
        self.events.push(TraceEvent::FramePop { depth });
    }

    fn on_var_write(&mut self, name: &str) {
        self.events.push(TraceEvent::VarWrite { name: name.to_owned() });
    }

    fn on_error(&mut self, message: &str) {
        self.events.push(TraceEvent::ErrorUnwind {
            message: message.to_owned(),
        });
    }
}
