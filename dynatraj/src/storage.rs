//! Storage for large `(frames, atoms, 3)` arrays, either in memory or in
//! memory-mapped scratch files.
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};
use memmap2::MmapMut;
use ndarray::{Array3, ArrayView3, ArrayViewMut3};

use crate::Error;

/// Environment variable used to set the default directory of scratch files
pub const SCRATCH_DIRECTORY_ENV: &str = "DYNATRAJ_TMPDIR";

/// Counter making scratch file names unique inside a process
static SCRATCH_FILES: AtomicUsize = AtomicUsize::new(0);

/// Get the directory in which scratch files should be created.
///
/// This uses `explicit` if given, then the directory in the
/// `DYNATRAJ_TMPDIR` environment variable, and finally the current working
/// directory. Paths which are not existing directories are ignored with a
/// warning.
pub fn scratch_directory(explicit: Option<&Path>) -> PathBuf {
    if let Some(directory) = explicit {
        if directory.is_dir() {
            return directory.to_path_buf();
        }
        warn!("scratch directory '{}' does not exist, ignoring it", directory.display());
    }

    if let Some(directory) = std::env::var_os(SCRATCH_DIRECTORY_ENV) {
        let directory = PathBuf::from(directory);
        if directory.is_dir() {
            return directory;
        }
        warn!(
            "{} is set to '{}', which is not a directory, ignoring it",
            SCRATCH_DIRECTORY_ENV, directory.display()
        );
    }

    return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
}

/// A `(frames, atoms, 3)` array of `f64` backed by a memory-mapped scratch
/// file. The file is removed when the array is dropped.
pub struct MappedArray {
    path: PathBuf,
    // always `Some`, except while dropping
    mmap: Option<MmapMut>,
    shape: (usize, usize, usize),
}

impl std::fmt::Debug for MappedArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedArray")
            .field("path", &self.path)
            .field("shape", &self.shape)
            .finish()
    }
}

impl MappedArray {
    /// Create a new zero-initialized array with the given `shape`, in a file
    /// named `<name>.<pid>.<counter>` inside `directory`.
    pub fn create(directory: &Path, name: &str, shape: (usize, usize, usize)) -> Result<MappedArray, Error> {
        let count = shape.0 * shape.1 * shape.2;
        if count == 0 {
            return Err(Error::InvalidParameter(format!(
                "can not create a memory-mapped array with shape {:?}", shape
            )));
        }

        let unique = SCRATCH_FILES.fetch_add(1, Ordering::Relaxed);
        let path = directory.join(format!("{}.{}.{}", name, std::process::id(), unique));

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.set_len((count * std::mem::size_of::<f64>()) as u64)?;

        // SAFETY: the file was just created by this process, and is only
        // accessed through this mapping
        let mmap = match unsafe { MmapMut::map_mut(&file) } {
            Ok(mmap) => mmap,
            Err(error) => {
                let _ = std::fs::remove_file(&path);
                return Err(error.into());
            }
        };

        debug!("created scratch file '{}' for {:?} array", path.display(), shape);

        return Ok(MappedArray {
            path: path,
            mmap: Some(mmap),
            shape: shape,
        });
    }

    /// Get the path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the shape of this array
    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    pub fn view(&self) -> ArrayView3<'_, f64> {
        let mmap = self.mmap.as_ref().expect("mapping is only released on drop");
        // SAFETY: the mapping is page aligned, contains exactly
        // `shape.0 * shape.1 * shape.2` f64 (checked at creation), and any bit
        // pattern is a valid f64
        unsafe {
            ArrayView3::from_shape_ptr(self.shape, mmap.as_ptr().cast::<f64>())
        }
    }

    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, f64> {
        let mmap = self.mmap.as_mut().expect("mapping is only released on drop");
        // SAFETY: same as `view`, and the mutable borrow of self guarantees
        // unique access
        unsafe {
            ArrayViewMut3::from_shape_ptr(self.shape, mmap.as_mut_ptr().cast::<f64>())
        }
    }
}

impl Drop for MappedArray {
    fn drop(&mut self) {
        // the mapping must be released before removing the file
        std::mem::drop(self.mmap.take());
        if let Err(error) = std::fs::remove_file(&self.path) {
            warn!("failed to remove scratch file '{}': {}", self.path.display(), error);
        } else {
            debug!("removed scratch file '{}'", self.path.display());
        }
    }
}

/// A `(frames, atoms, 3)` array stored either in memory or in a scratch file
#[derive(Debug)]
pub enum ArrayStorage {
    Memory(Array3<f64>),
    Mapped(MappedArray),
}

impl ArrayStorage {
    pub fn view(&self) -> ArrayView3<'_, f64> {
        match self {
            ArrayStorage::Memory(array) => array.view(),
            ArrayStorage::Mapped(array) => array.view(),
        }
    }

    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, f64> {
        match self {
            ArrayStorage::Memory(array) => array.view_mut(),
            ArrayStorage::Mapped(array) => array.view_mut(),
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        match self {
            ArrayStorage::Memory(array) => array.dim(),
            ArrayStorage::Mapped(array) => array.shape(),
        }
    }

    /// Get the path of the scratch file backing this array, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            ArrayStorage::Memory(_) => None,
            ArrayStorage::Mapped(array) => Some(array.path()),
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, ArrayStorage::Mapped(_))
    }
}

/// Allocation policy for the large derived arrays
#[derive(Debug, Clone)]
pub struct Storage {
    /// Directory for scratch files, `None` to keep everything in memory
    directory: Option<PathBuf>,
}

impl Storage {
    /// Keep all arrays in memory
    pub fn memory() -> Storage {
        Storage { directory: None }
    }

    /// Store arrays in memory-mapped files inside `directory`
    pub fn mapped(directory: PathBuf) -> Storage {
        Storage { directory: Some(directory) }
    }

    /// Allocate a new zero-initialized array with the given `shape`. `name`
    /// is used as prefix for the scratch file name.
    pub fn zeros(&self, name: &str, shape: (usize, usize, usize)) -> Result<ArrayStorage, Error> {
        let count = shape.0 * shape.1 * shape.2;
        match self.directory {
            Some(ref directory) if count != 0 => {
                let array = MappedArray::create(directory, name, shape)?;
                Ok(ArrayStorage::Mapped(array))
            }
            _ => Ok(ArrayStorage::Memory(Array3::zeros(shape))),
        }
    }
}
