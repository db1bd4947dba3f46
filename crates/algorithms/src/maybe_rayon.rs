/// Compatibility layer for rayon/sequential execution.
///
/// With the `parallel` feature this re-exports rayon's parallel iterators.
/// Without it, `into_par_iter()` falls back to `into_iter()` so the same
/// row-block code runs on a single thread. Only the API surface used by the
/// per-pixel stages (`into_par_iter` followed by `map`/`flat_map`/`collect`)
/// is mirrored.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;

/// Rows per work item when a stage partitions a raster into row blocks.
pub(crate) const ROW_BLOCK: usize = 64;

/// Split `0..len` into consecutive `[start, end)` blocks of at most `block` items.
pub(crate) fn blocks(len: usize, block: usize) -> Vec<(usize, usize)> {
    let block = block.max(1);
    (0..len)
        .step_by(block)
        .map(|start| (start, (start + block).min(len)))
        .collect()
}
