//! CSR-style storage for variable-length adjacency lists.
//!
//! A [`NestedVector`] stores rows back to back in one `values` array, with
//! `offsets[i]..offsets[i + 1]` delimiting row `i`. Rows are ordered with the
//! locally owned ones first, then the halo ones, so both views are contiguous
//! windows over the same backing arrays.

use std::ops::Range;

/// Variable-length rows in compressed sparse row layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NestedVector<T> {
    offsets: Vec<usize>,
    values: Vec<T>,
    nlocal: usize,
    nhalo: usize,
}

impl<T> Default for NestedVector<T> {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            values: Vec::new(),
            nlocal: 0,
            nhalo: 0,
        }
    }
}

impl<T> NestedVector<T> {
    /// Build from local rows followed by halo rows.
    pub fn from_rows<L, H, RL, RH>(local: L, halo: H) -> Self
    where
        L: IntoIterator<Item = RL>,
        H: IntoIterator<Item = RH>,
        RL: IntoIterator<Item = T>,
        RH: IntoIterator<Item = T>,
    {
        let mut nested = Self::default();
        for row in local {
            nested.push_row(row);
        }
        nested.nlocal = nested.rows();
        for row in halo {
            nested.push_row(row);
        }
        nested.nhalo = nested.rows() - nested.nlocal;
        nested
    }

    fn push_row<I: IntoIterator<Item = T>>(&mut self, row: I) {
        self.values.extend(row);
        self.offsets.push(self.values.len());
    }

    /// Total number of rows (local + halo).
    #[inline]
    pub fn size(&self) -> usize {
        self.nlocal + self.nhalo
    }

    #[inline]
    fn rows(&self) -> usize {
        self.offsets.len() - 1
    }

    /// `true` when there are no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Row `i`, if present.
    pub fn row(&self, i: usize) -> Option<&[T]> {
        if i >= self.size() {
            return None;
        }
        Some(&self.values[self.offsets[i]..self.offsets[i + 1]])
    }

    /// The first `nlocal` rows.
    pub fn local(&self) -> NestedSlice<'_, T> {
        self.slice(0..self.nlocal)
    }

    /// The `nhalo` rows following the local ones.
    pub fn halo(&self) -> NestedSlice<'_, T> {
        self.slice(self.nlocal..self.nlocal + self.nhalo)
    }

    /// Iterate over all rows.
    pub fn iter(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.slice(0..self.size()).iter()
    }

    /// Row-offset array (`size() + 1` entries).
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Flattened values.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    fn slice(&self, rows: Range<usize>) -> NestedSlice<'_, T> {
        NestedSlice {
            offsets: &self.offsets[rows.start..=rows.end],
            values: &self.values,
        }
    }
}

/// A contiguous window of rows over a [`NestedVector`].
#[derive(Clone, Copy, Debug)]
pub struct NestedSlice<'a, T> {
    offsets: &'a [usize],
    values: &'a [T],
}

impl<'a, T> NestedSlice<'a, T> {
    /// Number of rows in the window.
    #[inline]
    pub fn size(&self) -> usize {
        self.offsets.len() - 1
    }

    /// `true` when the window holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Row `i` of the window.
    pub fn row(&self, i: usize) -> Option<&'a [T]> {
        if i >= self.size() {
            return None;
        }
        Some(&self.values[self.offsets[i]..self.offsets[i + 1]])
    }

    /// Iterate over the rows of the window.
    pub fn iter(self) -> impl Iterator<Item = &'a [T]> + 'a {
        let values = self.values;
        self.offsets
            .windows(2)
            .map(move |w| &values[w[0]..w[1]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_rows() {
        let nv: NestedVector<usize> = NestedVector::default();
        assert_eq!(nv.size(), 0);
        assert!(nv.local().is_empty());
        assert!(nv.halo().is_empty());
        assert_eq!(nv.offsets(), &[0]);
    }

    #[test]
    fn local_and_halo_views_share_storage() {
        let nv = NestedVector::from_rows(
            vec![vec![1, 2, 3], vec![]],
            vec![vec![4], vec![5, 6]],
        );
        assert_eq!(nv.size(), 4);
        assert_eq!(nv.offsets(), &[0, 3, 3, 4, 6]);
        assert_eq!(nv.values(), &[1, 2, 3, 4, 5, 6]);

        let local = nv.local();
        assert_eq!(local.size(), 2);
        assert_eq!(local.row(0), Some(&[1, 2, 3][..]));
        assert_eq!(local.row(1), Some(&[][..]));
        assert_eq!(local.row(2), None);

        let halo: Vec<&[i32]> = nv.halo().iter().collect();
        assert_eq!(halo, vec![&[4][..], &[5, 6][..]]);
        assert_eq!(nv.row(3), Some(&[5, 6][..]));
        assert_eq!(nv.iter().count(), 4);
    }
}
