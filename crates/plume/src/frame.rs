use ahash::AHashMap;

use crate::{error::Raise, heap::ObjId};

/// An `upvar` link: the target resolved at link-creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VarLink {
    pub level: usize,
    pub name: String,
}

/// Which operations a variable trace fires on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TraceOps {
    pub read: bool,
    pub write: bool,
    pub unset: bool,
}

impl TraceOps {
    /// Parses an ops word like `{read write}`. Unknown ops are rejected.
    pub fn parse(ops: &[String]) -> Result<Self, String> {
        let mut result = Self::default();
        for op in ops {
            match op.as_str() {
                "read" => result.read = true,
                "write" => result.write = true,
                "unset" => result.unset = true,
                other => return Err(format!("bad operation \"{other}\": must be read, unset, or write")),
            }
        }
        Ok(result)
    }

    /// Renders back to the canonical ops list.
    pub fn render(self) -> String {
        let mut parts = Vec::new();
        if self.read {
            parts.push("read");
        }
        if self.write {
            parts.push("write");
        }
        if self.unset {
            parts.push("unset");
        }
        parts.join(" ")
    }
}

/// A script attached to a variable, fired synchronously on matching
/// operations in registration order.
#[derive(Debug, Clone)]
pub(crate) struct VarTrace {
    pub ops: TraceOps,
    pub script: String,
}

/// One call frame: variable bindings, upvar links, and traces.
#[derive(Debug)]
pub(crate) struct Frame {
    /// The command object that created this frame (nil for the global frame).
    pub owner: ObjId,
    /// The argument list object (nil for the global frame).
    pub args: ObjId,
    pub vars: AHashMap<String, ObjId>,
    pub links: AHashMap<String, VarLink>,
    pub traces: AHashMap<String, Vec<VarTrace>>,
    pub level: usize,
    /// The active level to restore when this frame pops. Usually the level
    /// below, but `uplevel` may have activated a lower frame at call time.
    prior_active: usize,
}

impl Frame {
    fn new(owner: ObjId, args: ObjId, level: usize, prior_active: usize) -> Self {
        Self {
            owner,
            args,
            vars: AHashMap::new(),
            links: AHashMap::new(),
            traces: AHashMap::new(),
            level,
            prior_active,
        }
    }
}

/// The call-frame stack. Frame 0 is the global frame and always exists.
///
/// Exactly one frame is "active" at a time; reads and writes go through it.
/// The active frame is normally the top of the stack, but `uplevel`-style
/// commands may temporarily activate an outer frame.
#[derive(Debug)]
pub(crate) struct Frames {
    stack: Vec<Frame>,
    active: usize,
}

impl Frames {
    pub fn new() -> Self {
        Self {
            stack: vec![Frame::new(ObjId::NIL, ObjId::NIL, 0, 0)],
            active: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn active_level(&self) -> usize {
        self.stack[self.active].level
    }

    pub fn active(&self) -> &Frame {
        &self.stack[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Frame {
        &mut self.stack[self.active]
    }

    pub fn frame(&self, level: usize) -> Option<&Frame> {
        self.stack.get(level)
    }

    pub fn frame_mut(&mut self, level: usize) -> Option<&mut Frame> {
        self.stack.get_mut(level)
    }

    /// Pushes a frame and makes it active. The recursion check happens at
    /// the caller, which has access to the resource tracker.
    pub fn push(&mut self, owner: ObjId, args: ObjId) -> usize {
        let level = self.stack.len();
        self.stack.push(Frame::new(owner, args, level, self.active));
        self.active = level;
        level
    }

    /// Pops the topmost frame and restores the active level from call time.
    /// The global frame is never popped.
    pub fn pop(&mut self) {
        assert!(self.stack.len() > 1, "attempted to pop the global frame");
        let frame = self.stack.pop().expect("depth checked above");
        self.active = frame.prior_active.min(self.stack.len() - 1);
    }

    /// Temporarily activates another frame; returns the previous active
    /// level for restoration.
    pub fn set_active(&mut self, level: usize) -> Result<usize, Raise> {
        if level >= self.stack.len() {
            return Err(Raise::name_error(format!("bad level \"#{level}\"")));
        }
        let previous = self.active;
        self.active = level;
        Ok(previous)
    }

    /// Resolves a name from the given frame through upvar links to the
    /// frame that actually owns the variable.
    ///
    /// Link chains are finite because cycles are rejected at creation; the
    /// chase is still bounded as an internal safety net.
    pub fn resolve_from(&self, mut level: usize, name: &str) -> Result<(usize, String), Raise> {
        let mut name = name.to_owned();
        for _ in 0..=self.stack.len() {
            match self.stack.get(level).and_then(|f| f.links.get(&name)) {
                Some(link) => {
                    level = link.level;
                    name = link.name.clone();
                }
                None => return Ok((level, name)),
            }
        }
        Err(Raise::internal(format!("variable link cycle for \"{name}\"")))
    }

    /// Resolves a name from the active frame.
    pub fn resolve(&self, name: &str) -> Result<(usize, String), Raise> {
        self.resolve_from(self.active, name)
    }

    /// Creates an upvar link in the active frame. Cyclic links are rejected.
    pub fn link(&mut self, local_name: &str, target_level: usize, target_name: &str) -> Result<(), Raise> {
        if target_level >= self.stack.len() {
            return Err(Raise::name_error(format!("bad level \"#{target_level}\"")));
        }
        let (final_level, final_name) = self.resolve_from(target_level, target_name)?;
        if final_level == self.active && final_name == local_name {
            return Err(Raise::name_error(format!(
                "can't upvar from variable to itself (\"{local_name}\")"
            )));
        }
        self.active_mut().links.insert(
            local_name.to_owned(),
            VarLink {
                level: final_level,
                name: final_name,
            },
        );
        Ok(())
    }

    /// Handles reachable from frames, for the arena sweep.
    pub fn roots(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.stack.iter().flat_map(|frame| {
            frame
                .vars
                .values()
                .copied()
                .chain([frame.owner, frame.args])
        })
    }
}
