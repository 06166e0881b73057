use crate::prelude::HashSet;

/// Occupancy of the foreground tile grid at one zoom level.
///
/// A cell is present iff a live foreground tile covers it. Lookups are by
/// `(x, y)` only; the zoom belongs to the whole index.
#[derive(Debug, Clone, Default)]
pub struct TileIndex {
    zoom: u8,
    cells: HashSet<(u32, u32)>,
}

impl TileIndex {
    pub fn new(zoom: u8) -> Self {
        Self {
            zoom,
            cells: HashSet::default(),
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Empties the index and moves it to `zoom`.
    pub fn reset(&mut self, zoom: u8) {
        self.zoom = zoom;
        self.cells.clear();
    }

    /// Returns false if the cell was already occupied.
    pub fn insert(&mut self, x: u32, y: u32) -> bool {
        self.cells.insert((x, y))
    }

    pub fn remove(&mut self, x: u32, y: u32) -> bool {
        self.cells.remove(&(x, y))
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.cells.contains(&(x, y))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.cells.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_reset() {
        let mut index = TileIndex::new(4);
        assert!(index.insert(1, 2));
        assert!(!index.insert(1, 2));
        assert!(index.contains(1, 2));
        assert!(!index.contains(2, 1));

        assert!(index.remove(1, 2));
        assert!(!index.remove(1, 2));
        assert!(index.is_empty());

        index.insert(0, 0);
        index.reset(5);
        assert_eq!(index.zoom(), 5);
        assert_eq!(index.len(), 0);
    }
}
