//! Rank-order filter over one sample batch.

/// Middle element of `samples` after an ascending sort.
///
/// For even `N` the element at zero-based index `N / 2` is returned, never
/// an average of the two middle values.  The input is left untouched;
/// selection runs on a copy.
pub fn median<const N: usize>(samples: &[u32; N]) -> u32 {
    const { assert!(N > 0, "median of an empty batch") };

    let mut scratch = *samples;
    let (_, mid, _) = scratch.select_nth_unstable(N / 2);
    *mid
}
