use bf_types::CellWidth;

/// Fixed-length cell storage.
///
/// Cells are stored as `u16` whatever the configured width; every write is
/// masked to the width so arithmetic wraps at its maximum. Indexing is
/// unchecked beyond the slice bounds: the machine resolves the data pointer
/// against the bounds policy before touching a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Box<[u16]>,
    width: CellWidth,
}

impl Tape {
    /// A zeroed tape of `len` cells.
    pub fn new(len: usize, width: CellWidth) -> Self {
        Self {
            cells: vec![0; len].into_boxed_slice(),
            width,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn width(&self) -> CellWidth {
        self.width
    }

    #[inline]
    pub fn get(&self, index: usize) -> u16 {
        self.cells[index]
    }

    /// Store `value` truncated to the cell width.
    #[inline]
    pub fn set(&mut self, index: usize, value: u16) {
        self.cells[index] = value & self.width.max_value();
    }

    #[inline]
    pub fn increment(&mut self, index: usize) {
        self.set(index, self.cells[index].wrapping_add(1));
    }

    #[inline]
    pub fn decrement(&mut self, index: usize) {
        self.set(index, self.cells[index].wrapping_sub(1));
    }

    pub fn cells(&self) -> &[u16] {
        &self.cells
    }
}
