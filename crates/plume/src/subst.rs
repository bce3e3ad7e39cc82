use crate::{
    error::EvalResult,
    heap::ObjId,
    interp::Interp,
    parse::{Segment, Word},
    resource::ResourceTracker,
};

impl<T: ResourceTracker> Interp<T> {
    /// Produces the argument object for one parsed word.
    ///
    /// Only a single braced or bare literal keeps its native
    /// representation (the numeric forms of the fresh string object
    /// shimmer in lazily). A lone variable reference or command
    /// substitution yields its value's string form, like multi-segment
    /// words: handing the referenced object itself to the caller would
    /// alias storage that a variable or another holder still shares.
    pub(crate) fn subst_word(&mut self, word: &Word) -> EvalResult<ObjId> {
        // braced words are always a single literal segment
        if word.braced || word.segments.len() == 1 {
            return match &word.segments[0] {
                Segment::Literal(text) => Ok(self.arena.alloc_string(text.clone())?),
                Segment::Escape(c) => Ok(self.arena.alloc_string(c.to_string())?),
                Segment::VarRef { name, index } => {
                    let id = self.subst_varref(name, index.as_deref())?;
                    let text = self.arena.string_of(id)?;
                    Ok(self.arena.alloc_string(text)?)
                }
                Segment::CmdSubst(script) => {
                    let id = self.eval_script(script.clone())?;
                    let text = self.arena.string_of(id)?;
                    Ok(self.arena.alloc_string(text)?)
                }
            };
        }
        let mut out = String::new();
        for segment in &word.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Escape(c) => out.push(*c),
                Segment::VarRef { name, index } => {
                    let id = self.subst_varref(name, index.as_deref())?;
                    out.push_str(self.arena.get_str(id)?);
                }
                Segment::CmdSubst(script) => {
                    let id = self.eval_script(script.clone())?;
                    out.push_str(self.arena.get_str(id)?);
                }
            }
        }
        Ok(self.arena.alloc_string(out)?)
    }

    /// Looks up `$name` or `$name(index)`; the index word is substituted
    /// first and selects an element of the dict-valued variable.
    fn subst_varref(&mut self, name: &str, index: Option<&Word>) -> EvalResult<ObjId> {
        let index_text = match index {
            Some(word) => {
                let id = self.subst_word(word)?;
                Some(self.arena.string_of(id)?)
            }
            None => None,
        };
        self.var_get_parts(name, index_text.as_deref())
    }
}
