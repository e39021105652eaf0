//! The 4x4 grid of destructible platforms

/// Cells per side
pub const GRID_SIDE: usize = 4;
/// Total number of platforms
pub const CELL_COUNT: usize = GRID_SIDE * GRID_SIDE;
/// Side length of one platform in arena units
pub const CELL_SIZE: i32 = 128;
/// Largest valid coordinate on either axis (inclusive)
pub const ARENA_EXTENT: i32 = CELL_SIZE * GRID_SIDE as i32;

/// One platform position, `index = col + row * 4`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell(u8);

impl Cell {
    pub fn from_index(index: usize) -> Option<Self> {
        (index < CELL_COUNT).then_some(Self(index as u8))
    }

    /// Cell a coordinate pair lands on for movement validation.
    /// The far edge (512) belongs to the last column/row.
    pub fn containing(x: i32, y: i32) -> Self {
        let last = GRID_SIDE as i32 - 1;
        let col = (x / CELL_SIZE).clamp(0, last);
        let row = (y / CELL_SIZE).clamp(0, last);
        Self((col + row * GRID_SIDE as i32) as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn col(self) -> u8 {
        self.0 % GRID_SIDE as u8
    }

    pub fn row(self) -> u8 {
        self.0 / GRID_SIDE as u8
    }

    /// Whether a position lies within this cell's pixel bounds.
    ///
    /// Bounds are inclusive on both edges, so a position on a shared edge
    /// belongs to both neighbouring cells.
    pub fn contains(self, x: i32, y: i32) -> bool {
        let x0 = i32::from(self.col()) * CELL_SIZE;
        let y0 = i32::from(self.row()) * CELL_SIZE;
        (x0..=x0 + CELL_SIZE).contains(&x) && (y0..=y0 + CELL_SIZE).contains(&y)
    }

    pub fn all() -> impl Iterator<Item = Cell> {
        (0..CELL_COUNT as u8).map(Cell)
    }
}

/// Destruction state of every platform
#[derive(Debug, Clone, Default)]
pub struct Grid {
    blown: [bool; CELL_COUNT],
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore every platform
    pub fn reset(&mut self) {
        self.blown = [false; CELL_COUNT];
    }

    pub fn is_blown(&self, cell: Cell) -> bool {
        self.blown[cell.index()]
    }

    /// Mark a cell destroyed. Returns false if it already was.
    pub fn blow(&mut self, cell: Cell) -> bool {
        !std::mem::replace(&mut self.blown[cell.index()], true)
    }

    pub fn blown_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        Cell::all().filter(|cell| self.is_blown(*cell))
    }

    pub fn is_fully_blown(&self) -> bool {
        self.blown.iter().all(|b| *b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_geometry_follows_index() {
        let cell = Cell::from_index(6).unwrap();
        assert_eq!((cell.col(), cell.row()), (2, 1));
        assert!(Cell::from_index(16).is_none());
    }

    #[test]
    fn containing_clamps_far_edge() {
        assert_eq!(Cell::containing(200, 200).index(), 5);
        assert_eq!(Cell::containing(512, 512).index(), 15);
        assert_eq!(Cell::containing(0, 511).index(), 12);
    }

    #[test]
    fn bounds_are_inclusive_on_shared_edges() {
        let left = Cell::from_index(0).unwrap();
        let right = Cell::from_index(1).unwrap();
        assert!(left.contains(128, 10));
        assert!(right.contains(128, 10));
        assert!(!right.contains(127, 10));
    }

    #[test]
    fn blow_is_once_per_reset() {
        let mut grid = Grid::new();
        let cell = Cell::from_index(3).unwrap();
        assert!(grid.blow(cell));
        assert!(!grid.blow(cell));
        assert_eq!(grid.blown_cells().collect::<Vec<_>>(), vec![cell]);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut grid = Grid::new();
        grid.reset();
        grid.reset();
        assert_eq!(grid.blown_cells().count(), 0);

        for cell in Cell::all() {
            grid.blow(cell);
        }
        assert!(grid.is_fully_blown());
        grid.reset();
        grid.reset();
        assert!(Cell::all().all(|cell| !grid.is_blown(cell)));
    }
}
