//! Index-parallel mapping with a sequential fallback.
//!
//! With the `parallel` feature the work is spread over rayon's global pool;
//! without it (e.g. WASM builds) the same closure runs in a plain loop. Either
//! way the output keeps index order, so callers can zip it back onto their
//! inputs.

#[cfg(feature = "parallel")]
pub(crate) fn map_indexed<T, F>(len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    use rayon::prelude::*;
    (0..len).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_indexed<T, F>(len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..len).map(f).collect()
}
