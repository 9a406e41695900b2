use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::errors::GameError;

/// Edge length of the square grid when nothing else is configured.
pub const DEFAULT_GRID_SIZE: u8 = 10;

/// A cell on the grid. Both axes are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Self {
        Coord { x, y }
    }

    pub fn in_bounds(&self, grid_size: u8) -> bool {
        in_bounds(*self, grid_size)
    }
}

// persisted as "x_y"
impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

impl FromStr for Coord {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || GameError::MalformedKey(s.to_string());
        let (x, y) = s.split_once('_').ok_or_else(malformed)?;
        let x = x.parse::<i32>().map_err(|_| malformed())?;
        let y = y.parse::<i32>().map_err(|_| malformed())?;
        Ok(Coord { x, y })
    }
}

/// True iff both axes lie in `1..=grid_size`.
pub fn in_bounds(coord: Coord, grid_size: u8) -> bool {
    let max = i32::from(grid_size);
    (1..=max).contains(&coord.x) && (1..=max).contains(&coord.y)
}

/// Enumerates the `length` cells of a ship starting at `start`, growing along +x when
/// `horizontal` and along +y otherwise. The start cell is the first one returned.
pub fn expand_ship(start: Coord, length: u8, horizontal: bool) -> Vec<Coord> {
    (0..i32::from(length))
        .map(|i| {
            if horizontal {
                Coord::new(start.x.saturating_add(i), start.y)
            } else {
                Coord::new(start.x, start.y.saturating_add(i))
            }
        })
        .collect()
}

fn cell_index(cell: Coord, size: usize) -> usize {
    (cell.y as usize - 1) * size + (cell.x as usize - 1)
}

/// Packs a set of cells into a row-major bitmap of `grid_size * grid_size` bits.
/// Cells outside the grid are dropped.
pub fn to_bitmap(cells: &BTreeSet<Coord>, grid_size: u8) -> Vec<u8> {
    let size = usize::from(grid_size);
    let mut bits = BitVec::from_elem(size * size, false);
    for cell in cells.iter().filter(|cell| cell.in_bounds(grid_size)) {
        bits.set(cell_index(*cell, size), true);
    }
    bits.to_bytes()
}

/// Inverse of [`to_bitmap`]. Padding bits past the grid are ignored.
pub fn from_bitmap(bytes: &[u8], grid_size: u8) -> BTreeSet<Coord> {
    let size = usize::from(grid_size);
    BitVec::from_bytes(bytes)
        .iter()
        .take(size * size)
        .enumerate()
        .filter(|(_, set)| *set)
        .map(|(i, _)| Coord::new((i % size) as i32 + 1, (i / size) as i32 + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_one_indexed_and_inclusive() {
        assert!(in_bounds(Coord::new(1, 1), 10));
        assert!(in_bounds(Coord::new(10, 10), 10));
        assert!(!in_bounds(Coord::new(0, 5), 10));
        assert!(!in_bounds(Coord::new(5, 11), 10));
        assert!(!in_bounds(Coord::new(-3, 2), 10));
        assert!(in_bounds(Coord::new(12, 12), 16));
    }

    #[test]
    fn expand_horizontal_yields_exactly_length_cells() {
        let cells = expand_ship(Coord::new(5, 5), 3, true);
        assert_eq!(cells, vec![Coord::new(5, 5), Coord::new(6, 5), Coord::new(7, 5)]);
    }

    #[test]
    fn expand_vertical_grows_along_y() {
        let cells = expand_ship(Coord::new(2, 8), 2, false);
        assert_eq!(cells, vec![Coord::new(2, 8), Coord::new(2, 9)]);
        assert!(expand_ship(Coord::new(2, 8), 0, false).is_empty());
    }

    #[test]
    fn coord_string_form() {
        assert_eq!(Coord::new(3, 10).to_string(), "3_10");
        assert_eq!("3_10".parse::<Coord>(), Ok(Coord::new(3, 10)));
        assert_eq!("-1_4".parse::<Coord>(), Ok(Coord::new(-1, 4)));
    }

    #[test]
    fn malformed_coord_strings_are_rejected() {
        for bad in ["", "3", "3_", "_4", "a_b", "3-4", "3_4_5"] {
            assert!(
                matches!(bad.parse::<Coord>(), Err(GameError::MalformedKey(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn bitmap_keeps_the_set() {
        let cells: BTreeSet<Coord> = [Coord::new(1, 1), Coord::new(10, 10), Coord::new(4, 7)]
            .into_iter()
            .collect();
        let bytes = to_bitmap(&cells, 10);
        assert_eq!(bytes.len(), 13);
        assert_eq!(from_bitmap(&bytes, 10), cells);
        assert!(from_bitmap(&to_bitmap(&BTreeSet::new(), 10), 10).is_empty());
    }
}
