use crate::error::Result;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Maps `f` over `items`, on the rayon pool when `parallel` is set and the
/// feature is enabled. The first error aborts the remaining work.
pub(crate) fn try_map<T, R, F>(items: &[T], parallel: bool, f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return items.par_iter().map(&f).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    items.iter().map(f).collect()
}
