/// Default number of memory cells.
pub const DEFAULT_CELLS: usize = 3000;

/// Fixed-size array of integer cells with a single movable pointer.
///
/// The pointer is free to leave the array. Reads and writes through an
/// out-of-range pointer report `None`/`false`; what happens next is the
/// interpreter's bounds policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<i32>,
    pointer: i64,
}

impl Memory {
    pub fn new(capacity: usize) -> Self {
        Memory {
            cells: vec![0; capacity],
            pointer: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn pointer(&self) -> i64 {
        self.pointer
    }

    pub fn set_pointer(&mut self, pointer: i64) {
        self.pointer = pointer;
    }

    pub fn move_pointer(&mut self, delta: i64) {
        self.pointer = self.pointer.wrapping_add(delta);
    }

    fn slot(&self, index: i64) -> Option<usize> {
        usize::try_from(index).ok().filter(|&i| i < self.cells.len())
    }

    pub fn read(&self, index: i64) -> Option<i32> {
        self.slot(index).map(|i| self.cells[i])
    }

    /// Returns `false` when `index` is out of range.
    pub fn write(&mut self, index: i64, value: i32) -> bool {
        match self.slot(index) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    /// Rebuild from saved cells. Callers check `cells.len()` against the
    /// session's capacity.
    pub(crate) fn from_parts(cells: Vec<i32>, pointer: i64) -> Self {
        Memory { cells, pointer }
    }

    /// Zero every cell and return the pointer to 0.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = 0);
        self.pointer = 0;
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new(DEFAULT_CELLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write() {
        let mut memory = Memory::default();
        assert_eq!(memory.capacity(), 3000);
        assert_eq!(memory.read(0), Some(0));
        assert!(memory.write(2999, 7));
        assert_eq!(memory.read(2999), Some(7));
    }

    #[test]
    fn test_out_of_range() {
        let mut memory = Memory::new(4);
        assert_eq!(memory.read(-1), None);
        assert_eq!(memory.read(4), None);
        assert!(!memory.write(4, 1));
        assert!(!memory.write(-3, 1));
        assert_eq!(memory.cells(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_pointer_moves_freely() {
        let mut memory = Memory::new(2);
        memory.move_pointer(-1);
        assert_eq!(memory.pointer(), -1);
        assert_eq!(memory.read(memory.pointer()), None);
        memory.set_pointer(1);
        assert_eq!(memory.read(memory.pointer()), Some(0));
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut memory = Memory::new(8);
        memory.write(3, 9);
        memory.set_pointer(5);
        memory.clear();
        assert_eq!(memory.capacity(), 8);
        assert_eq!(memory.read(3), Some(0));
        assert_eq!(memory.pointer(), 0);
    }
}
