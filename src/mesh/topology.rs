/// Corner tables and node/cell connectivity of a voxel lattice
///
/// Corner numbering (offset of the node relative to its cell):
///   0: (0,0,0)   1: (1,0,0)   2: (0,1,0)   3: (0,0,1)
///   4: (1,1,0)   5: (1,0,1)   6: (0,1,1)   7: (1,1,1)
///
/// The same corner seen from the node lies at the negated offset, so
/// `NEIGHBOR_CELLS[i] == -NEIGHBOR_NODES[i]` for every corner i.

/// Offsets from a node index to its eight neighboring cells.
pub const NEIGHBOR_CELLS: [[isize; 3]; 8] = [
    [0, 0, 0],
    [-1, 0, 0],
    [0, -1, 0],
    [0, 0, -1],
    [-1, -1, 0],
    [-1, 0, -1],
    [0, -1, -1],
    [-1, -1, -1],
];

/// Offsets from a cell index to its eight corner nodes.
pub const NEIGHBOR_NODES: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 1, 0],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// Number of corners of a cell (and neighboring cells of a node).
pub const NUM_CORNERS: usize = 8;

/// Index space of lattice nodes.
///
/// Periodic lattices have one node per cell along each axis; open lattices
/// carry one extra layer of nodes on the upper faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSpace {
    /// Grid shape (nx, ny, nz).
    pub cells: [usize; 3],
    /// Node extent along each axis.
    pub extent: [usize; 3],
    pub periodic: bool,
}

impl NodeSpace {
    pub fn new(cells: [usize; 3], periodic: bool) -> Self {
        let extent = if periodic {
            cells
        } else {
            [cells[0] + 1, cells[1] + 1, cells[2] + 1]
        };
        Self { cells, extent, periodic }
    }

    /// Number of candidate node indices.
    pub fn len(&self) -> usize {
        self.extent.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn linear_index(&self, [k, l, m]: [usize; 3]) -> usize {
        (k * self.extent[1] + l) * self.extent[2] + m
    }

    #[inline]
    pub fn position(&self, linear: usize) -> [usize; 3] {
        let [_, ny, nz] = self.extent;
        [linear / (ny * nz), (linear / nz) % ny, linear % nz]
    }

    /// Cell touching `node` at `corner`.
    ///
    /// Periodic: wraps modulo the grid shape. Open: `None` when the cell
    /// falls outside the grid.
    #[inline]
    pub fn neighbor_cell(&self, node: [usize; 3], corner: usize) -> Option<[usize; 3]> {
        let offset = NEIGHBOR_CELLS[corner];
        let mut cell = [0usize; 3];
        for axis in 0..3 {
            let n = self.cells[axis] as isize;
            let c = node[axis] as isize + offset[axis];
            cell[axis] = if self.periodic {
                c.rem_euclid(n) as usize
            } else if (0..n).contains(&c) {
                c as usize
            } else {
                return None;
            };
        }
        Some(cell)
    }

    /// Node at `corner` of `cell`, wrapped modulo the node extent.
    ///
    /// The wrap is applied whether or not the space is periodic; for an
    /// open space the extent already covers every corner so it never fires.
    #[inline]
    pub fn corner_node(&self, cell: [usize; 3], corner: usize) -> [usize; 3] {
        let offset = NEIGHBOR_NODES[corner];
        [
            (cell[0] + offset[0]) % self.extent[0],
            (cell[1] + offset[1]) % self.extent[1],
            (cell[2] + offset[2]) % self.extent[2],
        ]
    }
}

/// A neighbor reference tagged with the corner it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CornerLink {
    /// Corner position, 0..8.
    pub corner: usize,
    /// Node or cell index, depending on the list.
    pub index: usize,
}

impl CornerLink {
    pub fn new(corner: usize, index: usize) -> Self {
        Self { corner, index }
    }
}

/// Bidirectional node <-> cell adjacency
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connectivity {
    /// Per cell: (corner, node) in corner order.
    pub surrounding_nodes: Vec<Vec<CornerLink>>,
    /// Per node: (corner, cell) in the order the links were made.
    pub surrounding_cells: Vec<Vec<CornerLink>>,
}

impl Connectivity {
    pub fn new(num_cells: usize, num_nodes: usize) -> Self {
        Self {
            surrounding_nodes: vec![Vec::with_capacity(NUM_CORNERS); num_cells],
            surrounding_cells: vec![Vec::new(); num_nodes],
        }
    }

    /// Record that `node` sits at `corner` of `cell`, in both directions.
    pub fn link(&mut self, cell: usize, node: usize, corner: usize) {
        self.surrounding_nodes[cell].push(CornerLink::new(corner, node));
        self.surrounding_cells[node].push(CornerLink::new(corner, cell));
    }

    pub fn num_cells(&self) -> usize {
        self.surrounding_nodes.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.surrounding_cells.len()
    }

    /// Every cell->node link has a matching node->cell link and vice versa.
    pub fn is_symmetric(&self) -> bool {
        let forward = self.surrounding_nodes.iter().enumerate().all(|(cell, links)| {
            links.iter().all(|link| {
                self.surrounding_cells
                    .get(link.index)
                    .is_some_and(|back| back.contains(&CornerLink::new(link.corner, cell)))
            })
        });
        let backward = self.surrounding_cells.iter().enumerate().all(|(node, links)| {
            links.iter().all(|link| {
                self.surrounding_nodes
                    .get(link.index)
                    .is_some_and(|back| back.contains(&CornerLink::new(link.corner, node)))
            })
        });
        forward && backward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_tables_are_mirrored() {
        for corner in 0..NUM_CORNERS {
            for axis in 0..3 {
                assert_eq!(NEIGHBOR_CELLS[corner][axis], -(NEIGHBOR_NODES[corner][axis] as isize));
            }
        }
    }

    #[test]
    fn test_node_extent() {
        assert_eq!(NodeSpace::new([2, 3, 4], true).extent, [2, 3, 4]);
        assert_eq!(NodeSpace::new([2, 3, 4], false).extent, [3, 4, 5]);
        assert_eq!(NodeSpace::new([2, 3, 4], false).len(), 60);
    }

    #[test]
    fn test_neighbor_cell_open_boundary() {
        let space = NodeSpace::new([2, 2, 2], false);
        assert_eq!(space.neighbor_cell([0, 0, 0], 0), Some([0, 0, 0]));
        assert_eq!(space.neighbor_cell([0, 0, 0], 1), None);
        assert_eq!(space.neighbor_cell([2, 2, 2], 0), None);
        assert_eq!(space.neighbor_cell([2, 2, 2], 7), Some([1, 1, 1]));
    }

    #[test]
    fn test_neighbor_cell_periodic_wraps() {
        let space = NodeSpace::new([2, 3, 4], true);
        assert_eq!(space.neighbor_cell([0, 0, 0], 7), Some([1, 2, 3]));
        assert_eq!(space.neighbor_cell([1, 0, 2], 2), Some([1, 2, 2]));
    }

    #[test]
    fn test_corner_node_round_trip() {
        // Walking from a cell to a corner node and back along the same corner
        // returns the original cell
        for periodic in [true, false] {
            let space = NodeSpace::new([3, 2, 2], periodic);
            for corner in 0..NUM_CORNERS {
                let node = space.corner_node([2, 1, 0], corner);
                assert_eq!(space.neighbor_cell(node, corner), Some([2, 1, 0]));
            }
        }
    }

    #[test]
    fn test_corner_node_wraps_on_single_cell_period() {
        let space = NodeSpace::new([1, 1, 1], true);
        for corner in 0..NUM_CORNERS {
            assert_eq!(space.corner_node([0, 0, 0], corner), [0, 0, 0]);
        }
    }

    #[test]
    fn test_linear_index_round_trip() {
        let space = NodeSpace::new([2, 3, 1], false);
        for linear in 0..space.len() {
            assert_eq!(space.linear_index(space.position(linear)), linear);
        }
    }

    #[test]
    fn test_link_is_symmetric() {
        let mut conn = Connectivity::new(2, 3);
        conn.link(0, 2, 5);
        conn.link(1, 2, 0);
        conn.link(1, 0, 7);
        assert!(conn.is_symmetric());
        assert_eq!(conn.surrounding_cells[2], vec![CornerLink::new(5, 0), CornerLink::new(0, 1)]);

        conn.surrounding_cells[0].clear();
        assert!(!conn.is_symmetric());
    }
}
