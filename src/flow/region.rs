//! Regions and the capture table
//!
//! Regions are arena-allocated and strictly nested; each owns the capture
//! ids first used inside it and any locals it declares. The capture table
//! is per-lowering-call state: ids increase strictly by first use and a
//! region's ids retire when it closes. Requesting a capture with no region
//! open is a contract violation and panics.

/// Index of a region within the arena; renders as `R{n+1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(pub u32);

impl RegionId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A flow-capture slot; renders as its bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureId(pub u32);

/// One lexical scope of the flow graph.
#[derive(Debug, Clone)]
pub struct Region {
    /// Enclosing region, `None` for a root region.
    pub parent: Option<RegionId>,
    /// Capture ids owned by this region, in first-use order.
    pub captures: Vec<CaptureId>,
    /// Declared locals as `(type display, name)` pairs.
    pub locals: Vec<(String, String)>,
}

/// Region stack and capture-id allocator for one lowering call.
#[derive(Debug, Default)]
pub struct CaptureTable {
    regions: Vec<Region>,
    stack: Vec<RegionId>,
    next_id: u32,
}

impl CaptureTable {
    /// An empty table with no open region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a child of the current region (or a root region).
    pub fn open_region(&mut self) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(Region {
            parent: self.stack.last().copied(),
            captures: Vec::new(),
            locals: Vec::new(),
        });
        self.stack.push(id);
        id
    }

    /// Allocate the next capture id in the innermost open region.
    ///
    /// # Panics
    /// Panics when no region is open.
    pub fn capture(&mut self) -> CaptureId {
        let region = *self
            .stack
            .last()
            .expect("capture requested outside any open region");
        let id = CaptureId(self.next_id);
        self.next_id += 1;
        self.regions[region.index()].captures.push(id);
        id
    }

    /// Reserve a capture id for a branch result assigned in each arm.
    /// Identical to [`CaptureTable::capture`]; the distinction is for call
    /// sites.
    pub fn reserve(&mut self) -> CaptureId {
        self.capture()
    }

    /// Close a region. Must be the innermost open one.
    ///
    /// # Panics
    /// Panics on out-of-order closes.
    pub fn close_region(&mut self, id: RegionId) {
        let top = self.stack.pop().expect("close_region with no open region");
        assert_eq!(top, id, "regions must close innermost-first");
    }

    /// Declare a local in the given region.
    pub fn declare_local(&mut self, region: RegionId, ty: impl Into<String>, name: impl Into<String>) {
        self.regions[region.index()].locals.push((ty.into(), name.into()));
    }

    /// The innermost open region, if any.
    pub fn current(&self) -> Option<RegionId> {
        self.stack.last().copied()
    }

    /// Consume the table at the end of a build.
    pub fn into_regions(self) -> Vec<Region> {
        debug_assert!(self.stack.is_empty(), "unclosed regions at end of build");
        self.regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase_across_regions() {
        let mut table = CaptureTable::new();
        let outer = table.open_region();
        let a = table.capture();
        let inner = table.open_region();
        let b = table.capture();
        let c = table.capture();
        table.close_region(inner);
        let d = table.capture();
        table.close_region(outer);
        assert_eq!((a, b, c, d), (CaptureId(0), CaptureId(1), CaptureId(2), CaptureId(3)));
        let regions = table.into_regions();
        assert_eq!(regions[outer.index()].captures, vec![a, d]);
        assert_eq!(regions[inner.index()].captures, vec![b, c]);
        assert_eq!(regions[inner.index()].parent, Some(outer));
    }

    #[test]
    #[should_panic(expected = "outside any open region")]
    fn test_capture_without_region_panics() {
        let mut table = CaptureTable::new();
        table.capture();
    }

    #[test]
    #[should_panic(expected = "innermost-first")]
    fn test_out_of_order_close_panics() {
        let mut table = CaptureTable::new();
        let outer = table.open_region();
        let _inner = table.open_region();
        table.close_region(outer);
    }
}
