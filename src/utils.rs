//! Small collection helpers used by the section validators.
use itertools::Itertools;

/// Append the items of `src` to `dst`, returning `dst` for chaining.
pub fn append<T, I>(dst: &mut Vec<T>, src: I) -> &mut Vec<T>
where
    I: IntoIterator<Item = T>,
{
    dst.extend(src);
    dst
}

/// Check that the stride between every pair of consecutive items equals
/// `stride`, where `measure(a, b)` computes the stride from `a` to `b`.
///
/// Sequences of length 0 or 1 trivially pass.
pub fn test_stride<T, S, F>(items: &[T], measure: F, stride: S) -> bool
where
    S: PartialEq,
    F: Fn(&T, &T) -> S,
{
    items
        .iter()
        .tuple_windows()
        .all(|(a, b)| measure(a, b) == stride)
}
