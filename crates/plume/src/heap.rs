use crate::{
    dict::Dict,
    error::Raise,
    resource::ResourceTracker,
    value::{Obj, fmt_double, fmt_int, parse_double, parse_int, quote_element},
};

/// Maximum nesting depth for value traversals (canonical-form generation,
/// extraction). Bounds pathological handle graphs built through the
/// embedding API.
const MAX_DATA_DEPTH: u16 = 200;

/// Opaque handle for a value in the arena.
///
/// Handles are plain integers; the raw value 0 is the reserved nil handle
/// and never names a live object. Handles stay valid until the end of the
/// outermost evaluation unless the object is promoted by being stored in a
/// variable, a command entry, or an interpreter-global slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(u32);

impl ObjId {
    /// The reserved nil handle.
    pub const NIL: Self = Self(0);

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn is_nil(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Snapshot of arena occupancy at a point in time.
///
/// Useful for asserting the sweep invariant in tests and for monitoring
/// long-lived interpreters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaStats {
    /// Number of live objects.
    pub live_objects: usize,
    /// Number of free (recycled) slots available for reuse.
    pub free_slots: usize,
    /// Total slot count (live + free + reserved).
    pub total_slots: usize,
    /// Cumulative allocation count, if the resource tracker records one.
    pub tracker_allocations: Option<usize>,
}

/// Arena that backs all runtime values.
///
/// Slots are reused through a free list. Reclamation follows the epoch
/// discipline: at the end of each outermost evaluation the interpreter calls
/// [`Arena::sweep`] with the promotion roots, and every unreachable object
/// is freed. Within an epoch handles are stable.
///
/// Generic over `T: ResourceTracker`; with the default no-limit tracker the
/// allocation checks compile away.
#[derive(Debug)]
pub(crate) struct Arena<T: ResourceTracker> {
    /// Slot 0 is permanently reserved so raw handle 0 can mean nil.
    entries: Vec<Option<Obj>>,
    /// Freed slot ids available for reuse. Populated by `sweep`, consumed by `alloc`.
    free_list: Vec<u32>,
    tracker: T,
    /// Shared handle for the empty string, always live.
    empty_id: ObjId,
}

impl<T: ResourceTracker> Arena<T> {
    pub fn new(tracker: T) -> Self {
        // slot 1 holds the empty-string singleton, outside any allocation
        // budget
        Self {
            entries: vec![None, Some(Obj::from_string(String::new()))],
            free_list: Vec::new(),
            tracker,
            empty_id: ObjId(1),
        }
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }

    /// The shared empty-string object. Never swept.
    pub fn empty(&self) -> ObjId {
        self.empty_id
    }

    pub fn alloc(&mut self, obj: Obj) -> Result<ObjId, Raise> {
        self.tracker.on_allocate()?;
        match self.free_list.pop() {
            Some(slot) => {
                self.entries[slot as usize] = Some(obj);
                Ok(ObjId(slot))
            }
            None => {
                let slot = u32::try_from(self.entries.len())
                    .map_err(|_| Raise::internal("arena slot count exceeded u32 range"))?;
                self.entries.push(Some(obj));
                Ok(ObjId(slot))
            }
        }
    }

    pub fn alloc_string(&mut self, s: impl Into<String>) -> Result<ObjId, Raise> {
        let s = s.into();
        if s.is_empty() {
            return Ok(self.empty_id);
        }
        self.alloc(Obj::from_string(s))
    }

    pub fn alloc_int(&mut self, i: i64) -> Result<ObjId, Raise> {
        self.alloc(Obj::from_int(i))
    }

    pub fn alloc_double(&mut self, d: f64) -> Result<ObjId, Raise> {
        self.alloc(Obj::from_double(d))
    }

    pub fn alloc_list(&mut self, items: Vec<ObjId>) -> Result<ObjId, Raise> {
        self.alloc(Obj::from_list(items))
    }

    pub fn alloc_dict(&mut self, dict: Dict) -> Result<ObjId, Raise> {
        self.alloc(Obj::from_dict(dict))
    }

    pub fn alloc_bool(&mut self, b: bool) -> Result<ObjId, Raise> {
        self.alloc_int(i64::from(b))
    }

    /// Borrows an object. Panics on a stale or nil handle; handing the
    /// arena an invalid handle is an internal invariant violation.
    pub fn obj(&self, id: ObjId) -> &Obj {
        self.entries
            .get(id.index())
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("invalid object handle {}", id.raw()))
    }

    fn obj_mut(&mut self, id: ObjId) -> &mut Obj {
        self.entries
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("invalid object handle {}", id.raw()))
    }

    /// True when the handle names a live object.
    pub fn is_live(&self, id: ObjId) -> bool {
        !id.is_nil() && matches!(self.entries.get(id.index()), Some(Some(_)))
    }

    // --- string representation -------------------------------------------

    /// Materializes the canonical string form if missing.
    fn ensure_string(&mut self, id: ObjId, depth: u16) -> Result<(), Raise> {
        enum Repr {
            Int(i64),
            Double(f64),
            List(Vec<ObjId>),
            Dict(Vec<(String, ObjId)>),
            Empty,
        }
        if self.obj(id).string.is_some() {
            return Ok(());
        }
        if depth == 0 {
            return Err(Raise::internal("value nesting too deep to format"));
        }
        let repr = {
            let obj = self.obj(id);
            if let Some(i) = obj.int {
                Repr::Int(i)
            } else if let Some(d) = obj.double {
                Repr::Double(d)
            } else if let Some(list) = &obj.list {
                Repr::List(list.clone())
            } else if let Some(dict) = &obj.dict {
                Repr::Dict(dict.iter().map(|(k, v)| (k.to_owned(), v)).collect())
            } else {
                Repr::Empty
            }
        };
        let s = match repr {
            Repr::Int(i) => fmt_int(i),
            Repr::Double(d) => fmt_double(d),
            Repr::List(items) => {
                let mut out = String::new();
                for (n, item) in items.iter().enumerate() {
                    self.ensure_string(*item, depth - 1)?;
                    if n > 0 {
                        out.push(' ');
                    }
                    let element = self.obj(*item).string.as_deref().unwrap_or_default();
                    quote_element(element, &mut out);
                }
                out
            }
            Repr::Dict(pairs) => {
                let mut out = String::new();
                for (n, (key, value)) in pairs.iter().enumerate() {
                    self.ensure_string(*value, depth - 1)?;
                    if n > 0 {
                        out.push(' ');
                    }
                    quote_element(key, &mut out);
                    out.push(' ');
                    let element = self.obj(*value).string.as_deref().unwrap_or_default();
                    quote_element(element, &mut out);
                }
                out
            }
            Repr::Empty => String::new(),
        };
        self.obj_mut(id).string = Some(s);
        Ok(())
    }

    /// The canonical string form, borrowed.
    pub fn get_str(&mut self, id: ObjId) -> Result<&str, Raise> {
        self.ensure_string(id, MAX_DATA_DEPTH)?;
        Ok(self.obj(id).string.as_deref().unwrap_or_default())
    }

    /// The canonical string form, owned.
    pub fn string_of(&mut self, id: ObjId) -> Result<String, Raise> {
        Ok(self.get_str(id)?.to_owned())
    }

    // --- numeric representations -----------------------------------------

    pub fn get_int(&mut self, id: ObjId) -> Result<i64, Raise> {
        if let Some(i) = self.obj(id).int {
            return Ok(i);
        }
        let s = self.get_str(id)?;
        match parse_int(s) {
            Some(i) => {
                self.obj_mut(id).int = Some(i);
                Ok(i)
            }
            None => Err(Raise::wrong_type(format!("expected integer but got \"{s}\""))),
        }
    }

    pub fn get_double(&mut self, id: ObjId) -> Result<f64, Raise> {
        let obj = self.obj(id);
        if let Some(d) = obj.double {
            return Ok(d);
        }
        if let Some(i) = obj.int {
            let d = i as f64;
            self.obj_mut(id).double = Some(d);
            return Ok(d);
        }
        let s = self.get_str(id)?;
        match parse_double(s) {
            Some(d) => {
                self.obj_mut(id).double = Some(d);
                Ok(d)
            }
            None => Err(Raise::wrong_type(format!(
                "expected floating-point number but got \"{s}\""
            ))),
        }
    }

    // --- list representation ---------------------------------------------

    fn ensure_list(&mut self, id: ObjId) -> Result<(), Raise> {
        if self.obj(id).list.is_some() {
            return Ok(());
        }
        if self.obj(id).dict.is_some() {
            // a dict reads as the flat key/value list
            let pairs: Vec<(String, ObjId)> = self
                .obj(id)
                .dict
                .as_ref()
                .map(|d| d.iter().map(|(k, v)| (k.to_owned(), v)).collect())
                .unwrap_or_default();
            let mut items = Vec::with_capacity(pairs.len() * 2);
            for (key, value) in pairs {
                items.push(self.alloc_string(key)?);
                items.push(value);
            }
            self.obj_mut(id).list = Some(items);
            return Ok(());
        }
        let s = self.string_of(id)?;
        let elements = crate::parse::split_list(&s).map_err(Raise::wrong_type)?;
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            items.push(self.alloc_string(element)?);
        }
        self.obj_mut(id).list = Some(items);
        Ok(())
    }

    /// The list representation, cloned. Shimmers from the dict or string
    /// form when missing.
    pub fn get_list(&mut self, id: ObjId) -> Result<Vec<ObjId>, Raise> {
        self.ensure_list(id)?;
        Ok(self.obj(id).list.clone().unwrap_or_default())
    }

    pub fn list_len(&mut self, id: ObjId) -> Result<usize, Raise> {
        self.ensure_list(id)?;
        Ok(self.obj(id).list.as_ref().map_or(0, Vec::len))
    }

    pub fn list_at(&mut self, id: ObjId, index: usize) -> Result<Option<ObjId>, Raise> {
        self.ensure_list(id)?;
        Ok(self.obj(id).list.as_ref().and_then(|l| l.get(index).copied()))
    }

    /// Appends in place. Only for objects no other reference can observe.
    pub fn list_push(&mut self, id: ObjId, item: ObjId) -> Result<(), Raise> {
        self.ensure_list(id)?;
        let obj = self.obj_mut(id);
        if let Some(list) = obj.list.as_mut() {
            list.push(item);
        }
        obj.invalidate_for_list_change();
        Ok(())
    }

    /// Removes and returns the last element in place.
    pub fn list_pop(&mut self, id: ObjId) -> Result<Option<ObjId>, Raise> {
        self.ensure_list(id)?;
        let obj = self.obj_mut(id);
        let item = obj.list.as_mut().and_then(Vec::pop);
        obj.invalidate_for_list_change();
        Ok(item)
    }

    /// Removes and returns the first element in place.
    pub fn list_shift(&mut self, id: ObjId) -> Result<Option<ObjId>, Raise> {
        self.ensure_list(id)?;
        let obj = self.obj_mut(id);
        let item = match obj.list.as_mut() {
            Some(l) if !l.is_empty() => Some(l.remove(0)),
            _ => None,
        };
        obj.invalidate_for_list_change();
        Ok(item)
    }

    /// Prepends an element in place.
    pub fn list_unshift(&mut self, id: ObjId, item: ObjId) -> Result<(), Raise> {
        self.ensure_list(id)?;
        let obj = self.obj_mut(id);
        if let Some(list) = obj.list.as_mut() {
            list.insert(0, item);
        }
        obj.invalidate_for_list_change();
        Ok(())
    }

    // --- dict representation ---------------------------------------------

    fn ensure_dict(&mut self, id: ObjId) -> Result<(), Raise> {
        if self.obj(id).dict.is_some() {
            return Ok(());
        }
        let items = self.get_list(id)?;
        if items.len() % 2 != 0 {
            return Err(Raise::wrong_type("missing value to go with key"));
        }
        let mut dict = Dict::new();
        for pair in items.chunks_exact(2) {
            let key = self.string_of(pair[0])?;
            dict.insert(key, pair[1]);
        }
        self.obj_mut(id).dict = Some(dict);
        Ok(())
    }

    /// Borrows the dict representation, shimmering it in when missing.
    pub fn dict_ref(&mut self, id: ObjId) -> Result<&Dict, Raise> {
        self.ensure_dict(id)?;
        Ok(self.obj(id).dict.as_ref().expect("dict just ensured"))
    }

    /// The dict representation, cloned for copy-on-write updates.
    pub fn dict_of(&mut self, id: ObjId) -> Result<Dict, Raise> {
        self.ensure_dict(id)?;
        Ok(self.obj(id).dict.clone().unwrap_or_default())
    }

    // --- equality ---------------------------------------------------------

    /// Equality over canonical string forms.
    ///
    /// No numeric shortcut: a shimmered `.int` can coexist with a
    /// non-canonical spelling (`"007"` reads as 7 but its string form stays
    /// `"007"`), so only the canonical strings decide.
    pub fn obj_eq(&mut self, a: ObjId, b: ObjId) -> Result<bool, Raise> {
        if a == b {
            return Ok(true);
        }
        let left = self.string_of(a)?;
        let right = self.get_str(b)?;
        Ok(left == right)
    }

    // --- reclamation ------------------------------------------------------

    /// Frees every object not reachable from `roots`.
    ///
    /// Called at the end of the outermost evaluation; the roots are the
    /// promoted locations (frame variables, command-table payloads,
    /// interpreter-global slots, the final result). Reachability follows
    /// list elements and dict values.
    pub fn sweep(&mut self, roots: impl IntoIterator<Item = ObjId>) {
        let n = self.entries.len();
        let mut marked = vec![false; n];
        marked[self.empty_id.index()] = true;
        let mut stack: Vec<ObjId> = roots.into_iter().filter(|id| !id.is_nil()).collect();
        while let Some(id) = stack.pop() {
            let i = id.index();
            if i >= n || marked[i] {
                continue;
            }
            let Some(obj) = &self.entries[i] else { continue };
            marked[i] = true;
            if let Some(list) = &obj.list {
                stack.extend(list.iter().copied());
            }
            if let Some(dict) = &obj.dict {
                stack.extend(dict.values());
            }
        }
        for i in 1..n {
            if !marked[i] && self.entries[i].is_some() {
                self.entries[i] = None;
                self.free_list.push(i as u32);
            }
        }
    }

    pub fn stats(&self) -> ArenaStats {
        let live_objects = self.entries.iter().filter(|e| e.is_some()).count();
        ArenaStats {
            live_objects,
            free_slots: self.free_list.len(),
            total_slots: self.entries.len(),
            tracker_allocations: self.tracker.allocation_count(),
        }
    }
}
