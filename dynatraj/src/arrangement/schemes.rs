/// Position of an atom in a replicated lattice: the integer coordinates of the
/// unit cell containing it, and the index of the atom inside the primitive
/// cell (its sublattice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LatticeSite {
    /// Integer coordinates of the unit cell. These can be negative for the
    /// experimental two-partition scheme.
    pub cell: [i64; 3],
    /// Index of the atom in the primitive cell
    pub sublattice: usize,
}

impl LatticeSite {
    /// Create a new `LatticeSite` from cell coordinates and a sublattice index
    pub fn new(x: i64, y: i64, z: i64, sublattice: usize) -> LatticeSite {
        LatticeSite { cell: [x, y, z], sublattice }
    }
}

/// The different conventions a simulation engine can use to flatten a
/// `size[0] x size[1] x size[2]` replica of a primitive cell containing
/// `atoms_per_cell` atoms into a single list of atoms.
///
/// New conventions are added by creating a new variant and registering it in
/// [`IndexingScheme::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingScheme {
    /// Cell coordinates vary fastest (`x` first), and the sublattice index
    /// varies slowest. This is the order used by [`crate::Structure`] for
    /// supercells.
    CellMajor,
    /// The sublattice index varies fastest, then the cell coordinates (`x`
    /// first).
    AtomMajor,
    /// Same as `AtomMajor`, but the list is split in two contiguous halves
    /// along the `x` axis, as produced by an engine running on two domains.
    ///
    /// This scheme has not been validated against real data.
    TwoPartitionAtomMajor,
}

/// Number of domains assumed by `IndexingScheme::TwoPartitionAtomMajor`
const PARTITIONS: usize = 2;

impl IndexingScheme {
    /// All the known schemes, in the order they are tried. The first one
    /// corresponds to the structure order.
    pub const ALL: &'static [IndexingScheme] = &[
        IndexingScheme::CellMajor,
        IndexingScheme::AtomMajor,
        IndexingScheme::TwoPartitionAtomMajor,
    ];

    /// Get a human readable name for this scheme
    pub fn name(self) -> &'static str {
        match self {
            IndexingScheme::CellMajor => "cell-major",
            IndexingScheme::AtomMajor => "atom-major",
            IndexingScheme::TwoPartitionAtomMajor => "two-partition atom-major",
        }
    }

    /// Is this scheme experimental?
    pub fn is_experimental(self) -> bool {
        matches!(self, IndexingScheme::TwoPartitionAtomMajor)
    }

    /// Get the lattice site of the atom at index `i` in a flat list of atoms.
    ///
    /// `i` must be in `0..(size[0] * size[1] * size[2] * atoms_per_cell)`, and
    /// all sizes must be non-zero. No bounds checking is done.
    pub fn site(self, i: usize, size: [usize; 3], atoms_per_cell: usize) -> LatticeSite {
        match self {
            IndexingScheme::CellMajor => cell_major(i, size),
            IndexingScheme::AtomMajor => atom_major(i, size, atoms_per_cell),
            IndexingScheme::TwoPartitionAtomMajor => two_partition_atom_major(i, size, atoms_per_cell),
        }
    }
}

fn cell_major(i: usize, size: [usize; 3]) -> LatticeSite {
    let [nx, ny, nz] = size;

    let x = i % nx;
    let y = (i / nx) % ny;
    let z = (i / (nx * ny)) % nz;
    let sublattice = i / (nx * ny * nz);

    LatticeSite::new(x as i64, y as i64, z as i64, sublattice)
}

fn atom_major(i: usize, size: [usize; 3], atoms_per_cell: usize) -> LatticeSite {
    let [nx, ny, _] = size;
    let n = atoms_per_cell;

    let x = (i % (nx * n)) / n;
    let y = (i % (nx * n * ny)) / (nx * n);
    let z = i / (nx * ny * n);
    let sublattice = i % n;

    LatticeSite::new(x as i64, y as i64, z as i64, sublattice)
}

fn two_partition_atom_major(i: usize, size: [usize; 3], atoms_per_cell: usize) -> LatticeSite {
    let [nx, ny, nz] = size;
    let n = atoms_per_cell;

    let half = usize::max(nx / PARTITIONS, 1);
    let total = nx * ny * nz * n;

    let mut x = ((i % (half * n)) / n) as i64;
    let y = ((i % (half * n * ny)) / (half * n)) as i64;
    let mut z = (i / (ny * half * n)) as i64;
    let sublattice = i % n;

    // atoms in the second partition
    if PARTITIONS * i >= total {
        x += half as i64;
        z -= half as i64;
    }

    LatticeSite::new(x, y, z, sublattice)
}
