//! Compressed Sparse Row (CSR) store — the canonical matrix representation.
//!
//! A [`CsrMatrix`] either borrows the caller's three arrays (*shared* mode,
//! spec.md §3: "never free them; user must outlive the matrix") or owns a
//! deep copy (*copy* mode). Both are modeled with [`alloc::borrow::Cow`] so
//! the distinction costs nothing beyond an enum discriminant and Rust's
//! ownership rules make "never free a shared array" a property of the type
//! rather than a runtime promise.

use crate::error::{EngineError, Result};
use crate::types::{DimensionType, IndexBase, IndexType, Operation, Precision, StoredShape};
use alloc::borrow::Cow;
use alloc::vec;
use alloc::vec::Vec;

/// The canonical CSR sparse matrix.
///
/// `ptr[0..rows]` are non-decreasing offsets into `ind`/`val`, expressed in
/// the matrix's [`IndexBase`]; `ptr[rows] == nnz + base`. `ind[k]` is a
/// column index (also base-relative) and `val[k]` its value, for
/// `ptr[i] <= k < ptr[i+1]`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CsrMatrix<'a> {
    rows: DimensionType,
    cols: DimensionType,
    base: IndexBase,
    shape: StoredShape,
    implicit_unit_diagonal: bool,
    sorted: bool,
    unique: bool,
    #[cfg_attr(feature = "serde", serde(borrow))]
    ptr: Cow<'a, [IndexType]>,
    #[cfg_attr(feature = "serde", serde(borrow))]
    ind: Cow<'a, [IndexType]>,
    #[cfg_attr(feature = "serde", serde(borrow))]
    val: Cow<'a, [Precision]>,
}

/// Asserted properties supplied by the caller at matrix creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertedProperties {
    /// Index base the arrays are expressed in.
    pub base: IndexBase,
    /// Stored shape (general, triangular, symmetric/Hermitian half/full).
    pub shape: StoredShape,
    /// Whether column indices within a row are claimed sorted ascending.
    pub sorted: bool,
    /// Whether column indices within a row are claimed unique.
    pub unique: bool,
    /// Whether a unit diagonal is implicit (not explicitly stored).
    pub implicit_unit_diagonal: bool,
}

impl Default for AssertedProperties {
    fn default() -> Self {
        Self {
            base: IndexBase::Zero,
            shape: StoredShape::General,
            sorted: false,
            unique: false,
            implicit_unit_diagonal: false,
        }
    }
}

impl<'a> CsrMatrix<'a> {
    /// Wrap the caller's arrays in *shared* mode: the matrix borrows `ptr`,
    /// `ind`, `val` and never frees them. The caller must keep the arrays
    /// alive and must not mutate them for the matrix's lifetime.
    ///
    /// Runs the `O(nnz)` asserted-property check unless `bypass_check` is
    /// set (mirrors `OSKI_BYPASS_CHECK=yes`, config.rs).
    pub fn from_shared(
        ptr: &'a [IndexType],
        ind: &'a [IndexType],
        val: &'a [Precision],
        rows: DimensionType,
        cols: DimensionType,
        props: AssertedProperties,
        bypass_check: bool,
    ) -> Result<Self> {
        Self::new(Cow::Borrowed(ptr), Cow::Borrowed(ind), Cow::Borrowed(val), rows, cols, props, bypass_check)
    }

    /// Build a matrix in *copy* mode from owned vectors.
    pub fn from_owned(
        ptr: Vec<IndexType>,
        ind: Vec<IndexType>,
        val: Vec<Precision>,
        rows: DimensionType,
        cols: DimensionType,
        props: AssertedProperties,
        bypass_check: bool,
    ) -> Result<Self> {
        Self::new(Cow::Owned(ptr), Cow::Owned(ind), Cow::Owned(val), rows, cols, props, bypass_check)
    }

    /// Build a matrix in copy mode from coordinate triplets, assuming
    /// general shape and zero base.
    pub fn from_triplets(
        triplets: &[(usize, usize, Precision)],
        rows: DimensionType,
        cols: DimensionType,
    ) -> Result<Self> {
        for &(r, c, v) in triplets {
            if r >= rows {
                return Err(EngineError::IndexOutOfBounds {
                    index: r,
                    max_index: rows.saturating_sub(1),
                    context: "row index in triplet".into(),
                });
            }
            if c >= cols {
                return Err(EngineError::IndexOutOfBounds {
                    index: c,
                    max_index: cols.saturating_sub(1),
                    context: "column index in triplet".into(),
                });
            }
            if !v.is_finite() {
                return Err(EngineError::BadArg {
                    parameter: "value".into(),
                    message: alloc::format!("non-finite value at ({r}, {c})"),
                });
            }
        }

        let mut sorted_entries: Vec<(usize, usize, Precision)> = triplets.to_vec();
        sorted_entries.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut ptr = vec![0u32; rows + 1];
        let mut ind = Vec::with_capacity(sorted_entries.len());
        let mut val = Vec::with_capacity(sorted_entries.len());

        let mut current_row = 0usize;
        for (row, col, value) in sorted_entries {
            while current_row < row {
                current_row += 1;
                ptr[current_row] = ind.len() as u32;
            }
            ind.push(col as IndexType);
            val.push(value);
        }
        while current_row < rows {
            current_row += 1;
            ptr[current_row] = ind.len() as u32;
        }

        let props = AssertedProperties {
            sorted: true,
            unique: true,
            ..AssertedProperties::default()
        };
        Self::from_owned(ptr, ind, val, rows, cols, props, true)
    }

    /// Build directly from already-wrapped arrays, mixing owned and
    /// borrowed storage per array. Used by the partitioner to pair a
    /// freshly computed, owned row-pointer array with `ind`/`val` slices
    /// borrowed straight from the parent matrix.
    pub(crate) fn new(
        ptr: Cow<'a, [IndexType]>,
        ind: Cow<'a, [IndexType]>,
        val: Cow<'a, [Precision]>,
        rows: DimensionType,
        cols: DimensionType,
        props: AssertedProperties,
        bypass_check: bool,
    ) -> Result<Self> {
        if ptr.len() != rows + 1 {
            return Err(EngineError::BadArg {
                parameter: "ptr".into(),
                message: alloc::format!("expected length {}, got {}", rows + 1, ptr.len()),
            });
        }
        if ind.len() != val.len() {
            return Err(EngineError::BadArg {
                parameter: "ind/val".into(),
                message: "ind and val must have equal length".into(),
            });
        }

        let mut matrix = Self {
            rows,
            cols,
            base: props.base,
            shape: props.shape,
            implicit_unit_diagonal: props.implicit_unit_diagonal,
            sorted: props.sorted,
            unique: props.unique,
            ptr,
            ind,
            val,
        };

        if !bypass_check {
            matrix.check_properties()?;
        }

        Ok(matrix)
    }

    /// `O(nnz)` validation of the asserted properties; may *strengthen* them
    /// (e.g. unsorted-claimed-but-actually-sorted is allowed and recorded),
    /// but never weaken an assertion the caller made.
    fn check_properties(&mut self) -> Result<()> {
        let base = self.base.value() as usize;

        for i in 0..self.rows {
            let start = self.ptr[i] as usize - base;
            let end = self.ptr[i + 1] as usize - base;
            if start > end {
                return Err(EngineError::FalseAssertedProperty {
                    property: "non-decreasing row pointers".into(),
                    row: Some(i),
                });
            }
            for k in start..end {
                let col = self.ind[k] as usize;
                if col < base || col - base >= self.cols {
                    return Err(EngineError::FalseAssertedProperty {
                        property: "column index in range".into(),
                        row: Some(i),
                    });
                }
            }
        }

        if self.ptr[self.rows] as usize - base != self.ind.len() {
            return Err(EngineError::FalseAssertedProperty {
                property: "ptr[m] == nnz + base".into(),
                row: None,
            });
        }

        let mut observed_sorted = true;
        let mut observed_unique = true;
        for i in 0..self.rows {
            let start = self.ptr[i] as usize - base;
            let end = self.ptr[i + 1] as usize - base;
            for k in (start + 1)..end {
                match self.ind[k - 1].cmp(&self.ind[k]) {
                    core::cmp::Ordering::Greater => observed_sorted = false,
                    core::cmp::Ordering::Equal => observed_unique = false,
                    core::cmp::Ordering::Less => {}
                }
            }
        }

        if self.sorted && !observed_sorted {
            return Err(EngineError::FalseAssertedProperty {
                property: "indices-sorted-per-row".into(),
                row: None,
            });
        }
        if self.unique && !observed_unique {
            return Err(EngineError::FalseAssertedProperty {
                property: "indices-unique-per-row".into(),
                row: None,
            });
        }

        // Strengthening is allowed: record what we actually observed.
        self.sorted = self.sorted || observed_sorted;
        self.unique = self.unique || observed_unique;

        if self.shape.is_upper_only() || self.shape.is_lower_only() {
            for i in 0..self.rows {
                let start = self.ptr[i] as usize - base;
                let end = self.ptr[i + 1] as usize - base;
                for k in start..end {
                    let col = self.ind[k] as usize - base;
                    let in_violation = if self.shape.is_upper_only() {
                        col < i
                    } else {
                        col > i
                    };
                    if in_violation {
                        return Err(EngineError::FalseAssertedProperty {
                            property: "triangularity".into(),
                            row: Some(i),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Number of rows.
    pub fn rows(&self) -> DimensionType {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> DimensionType {
        self.cols
    }

    /// Number of explicitly-stored entries.
    pub fn nnz(&self) -> usize {
        self.ind.len()
    }

    /// The matrix's index base.
    pub fn base(&self) -> IndexBase {
        self.base
    }

    /// The matrix's stored shape.
    pub fn shape(&self) -> StoredShape {
        self.shape
    }

    /// Whether indices are known (asserted or observed) sorted per row.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Row-pointer array, base-relative.
    pub fn row_ptr(&self) -> &[IndexType] {
        &self.ptr
    }

    /// Column-index array, base-relative.
    pub fn col_ind(&self) -> &[IndexType] {
        &self.ind
    }

    /// Value array.
    pub fn values(&self) -> &[Precision] {
        &self.val
    }

    fn base_offset(&self) -> usize {
        self.base.value() as usize
    }

    /// Start/end offsets (zero-based, into `ind`/`val`) for `row`.
    pub fn row_range(&self, row: usize) -> (usize, usize) {
        let base = self.base_offset();
        let start = self.ptr[row] as usize - base;
        let end = self.ptr[row + 1] as usize - base;
        (start, end)
    }

    /// Iterate over `(column, value)` pairs stored explicitly in `row`.
    pub fn row_iter(&self, row: usize) -> impl Iterator<Item = (usize, Precision)> + '_ {
        let (start, end) = self.row_range(row);
        let base = self.base_offset();
        (start..end).map(move |k| (self.ind[k] as usize - base, self.val[k]))
    }

    /// Get the value at `(row, col)`, obeying the stored shape: zero below
    /// the diagonal of an upper-triangular matrix, one on an implicit-unit
    /// diagonal, and — for symmetric/Hermitian half storage — the mirrored
    /// entry (conjugated for Hermitian) when `(row, col)` falls in the
    /// unstored triangle.
    pub fn get_entry(&self, row: usize, col: usize) -> Result<Precision> {
        if row >= self.rows || col >= self.cols {
            return Err(EngineError::IndexOutOfBounds {
                index: row.max(col),
                max_index: self.rows.max(self.cols).saturating_sub(1),
                context: "get_entry".into(),
            });
        }

        if self.implicit_unit_diagonal && row == col {
            return Ok(1.0);
        }

        if self.shape.is_symmetric_like() {
            let (primary_row, primary_col, mirrored) = if self.shape.is_upper_only() {
                if col >= row {
                    (row, col, false)
                } else {
                    (col, row, true)
                }
            } else if self.shape.is_lower_only() {
                if col <= row {
                    (row, col, false)
                } else {
                    (col, row, true)
                }
            } else {
                (row, col, false)
            };

            let value = self.scan_row_for_col(primary_row, primary_col);
            return Ok(match (value, mirrored, self.shape.is_hermitian()) {
                (Some(v), false, _) => v,
                (Some(v), true, false) => v,
                (Some(v), true, true) => v, // conj(v) == v for real Precision
                (None, _, _) => 0.0,
            });
        }

        if self.shape.is_upper_only() && col < row {
            return Ok(0.0);
        }
        if self.shape.is_lower_only() && col > row {
            return Ok(0.0);
        }

        Ok(self.scan_row_for_col(row, col).unwrap_or(0.0))
    }

    fn scan_row_for_col(&self, row: usize, col: usize) -> Option<Precision> {
        let base = self.base_offset();
        let (start, end) = self.row_range(row);
        if self.sorted {
            self.ind[start..end]
                .binary_search(&((col + base) as IndexType))
                .ok()
                .map(|pos| self.val[start + pos])
        } else {
            (start..end)
                .find(|&k| self.ind[k] as usize - base == col)
                .map(|k| self.val[k])
        }
    }

    /// Write `value` at `(row, col)`. Fails with
    /// [`EngineError::LogicalZeroNotStored`] if the position has no explicit
    /// storage slot; writes the mirrored slot too for half-stored
    /// symmetric/Hermitian matrices.
    pub fn set_entry(&mut self, row: usize, col: usize, value: Precision) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(EngineError::IndexOutOfBounds {
                index: row.max(col),
                max_index: self.rows.max(self.cols).saturating_sub(1),
                context: "set_entry".into(),
            });
        }

        let (primary_row, primary_col) = if self.shape.is_symmetric_like() {
            if self.shape.is_upper_only() && col < row {
                (col, row)
            } else if self.shape.is_lower_only() && col > row {
                (col, row)
            } else {
                (row, col)
            }
        } else {
            (row, col)
        };

        let slot = self.find_slot(primary_row, primary_col).ok_or(EngineError::LogicalZeroNotStored { row, col })?;
        self.val.to_mut()[slot] = value;
        Ok(())
    }

    fn find_slot(&self, row: usize, col: usize) -> Option<usize> {
        let base = self.base_offset();
        let (start, end) = self.row_range(row);
        if self.sorted {
            self.ind[start..end]
                .binary_search(&((col + base) as IndexType))
                .ok()
                .map(|pos| start + pos)
        } else {
            (start..end).find(|&k| self.ind[k] as usize - base == col)
        }
    }

    /// Get the diagonal as a dense vector of length `min(rows, cols)`.
    pub fn get_diagonal(&self) -> Vec<Precision> {
        let n = self.rows.min(self.cols);
        (0..n)
            .map(|i| self.get_entry(i, i).unwrap_or(0.0))
            .collect()
    }

    /// Extract a dense `rows x cols` clique (sub-block) `[r0, r1) x [c0, c1)`.
    /// Only implemented for [`StoredShape::General`] — matches the
    /// reference engine, which restricts clique access to general CSR.
    pub fn get_clique(&self, r0: usize, r1: usize, c0: usize, c1: usize) -> Result<Vec<Precision>> {
        if self.shape != StoredShape::General {
            return Err(EngineError::NotImplemented {
                operation: "get_clique on non-general shape".into(),
            });
        }
        if r1 > self.rows || c1 > self.cols || r0 > r1 || c0 > c1 {
            return Err(EngineError::BadArg {
                parameter: "range".into(),
                message: "clique range out of bounds".into(),
            });
        }

        let nrows = r1 - r0;
        let ncols = c1 - c0;
        let mut out = vec![0.0; nrows * ncols];
        for row in r0..r1 {
            for (col, value) in self.row_iter(row) {
                if col >= c0 && col < c1 {
                    out[(row - r0) * ncols + (col - c0)] = value;
                }
            }
        }
        Ok(out)
    }

    /// Sum of absolute values of all explicitly-stored entries (the
    /// induced 1-norm when the matrix is general; for triangular/symmetric
    /// shapes this sums only what is explicitly stored, per spec.md §4.1).
    pub fn one_norm(&self) -> Precision {
        self.val.iter().map(|v| v.abs()).sum()
    }

    /// Number of rows with zero explicitly-stored entries.
    pub fn count_zero_rows(&self) -> usize {
        (0..self.rows).filter(|&i| self.row_range(i).0 == self.row_range(i).1).count()
    }

    /// Stable per-row sort by column index. Idempotent; sets
    /// `indices-sorted = true` on completion.
    pub fn sort_indices(&mut self) {
        if self.sorted {
            return;
        }
        let ind = self.ind.to_mut();
        let val = self.val.to_mut();
        for i in 0..self.rows {
            let start = self.ptr[i] as usize - self.base.value() as usize;
            let end = self.ptr[i + 1] as usize - self.base.value() as usize;
            let mut row: Vec<(IndexType, Precision)> = ind[start..end]
                .iter()
                .zip(val[start..end].iter())
                .map(|(&c, &v)| (c, v))
                .collect();
            row.sort_by_key(|&(c, _)| c);
            for (k, (c, v)) in row.into_iter().enumerate() {
                ind[start + k] = c;
                val[start + k] = v;
            }
        }
        self.sorted = true;
    }

    /// Expand a symmetric/Hermitian half-stored matrix into a new, fully
    /// stored, sorted, general CSR matrix: `(i, j)` and `(j, i)` both
    /// appear with value `val` (symmetric) or `conj(val)` (Hermitian, a
    /// no-op for real `Precision`); an implicit unit diagonal is
    /// materialized.
    pub fn expand_symmetric_to_full(&self) -> Result<CsrMatrix<'static>> {
        if !self.shape.is_symmetric_like() {
            return Err(EngineError::NotImplemented {
                operation: "expand_symmetric_to_full on a non-symmetric shape".into(),
            });
        }
        if self.rows != self.cols {
            return Err(EngineError::BadArg {
                parameter: "shape".into(),
                message: "symmetric expansion requires a square matrix".into(),
            });
        }

        let mut triplets: Vec<(usize, usize, Precision)> = Vec::with_capacity(self.nnz() * 2);
        for row in 0..self.rows {
            for (col, value) in self.row_iter(row) {
                triplets.push((row, col, value));
                if col != row {
                    triplets.push((col, row, value));
                }
            }
        }
        if self.implicit_unit_diagonal {
            for i in 0..self.rows {
                triplets.push((i, i, 1.0));
            }
        }
        // Later entries win on duplicate (row, col): the diagonal pushed
        // last overrides any explicit diagonal entry, matching
        // "implicit-unit-diagonal is materialized".
        triplets.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        triplets.dedup_by(|a, b| {
            if a.0 == b.0 && a.1 == b.1 {
                b.2 = a.2;
                true
            } else {
                false
            }
        });

        CsrMatrix::from_triplets(&triplets, self.rows, self.cols)
    }

    /// Reference (unblocked, single-threaded) SpMV:
    /// `y <- beta*y + alpha*op(A)*x`.
    ///
    /// This is the canonical, always-available kernel: the oracle every
    /// block-store kernel variant (`kernel` module) is checked against, and
    /// the fallback path when no tuned representation is installed.
    pub fn spmv(
        &self,
        op: Operation,
        alpha: Precision,
        x: &[Precision],
        beta: Precision,
        y: &mut [Precision],
    ) -> Result<()> {
        let (expected_x, expected_y) = match op.is_transpose() {
            false => (self.cols, self.rows),
            true => (self.rows, self.cols),
        };
        if x.len() != expected_x {
            return Err(EngineError::DimensionMismatch {
                expected: expected_x,
                actual: x.len(),
                operation: "spmv:x".into(),
            });
        }
        if y.len() != expected_y {
            return Err(EngineError::DimensionMismatch {
                expected: expected_y,
                actual: y.len(),
                operation: "spmv:y".into(),
            });
        }

        if beta == 0.0 {
            y.fill(0.0);
        } else if beta != 1.0 {
            for v in y.iter_mut() {
                *v *= beta;
            }
        }

        if alpha == 0.0 {
            return Ok(());
        }

        if !op.is_transpose() {
            for row in 0..self.rows {
                let mut acc = 0.0;
                for (col, value) in self.row_iter(row) {
                    acc += value * x[col];
                }
                y[row] += alpha * acc;
            }
        } else {
            for row in 0..self.rows {
                let xv = x[row];
                if xv == 0.0 {
                    continue;
                }
                for (col, value) in self.row_iter(row) {
                    y[col] += alpha * value * xv;
                }
            }
        }

        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    fn identity3() -> CsrMatrix<'static> {
        CsrMatrix::from_triplets(&[(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)], 3, 3).unwrap()
    }

    #[test]
    fn identity_spmv() {
        let a = identity3();
        let x = [7.0, 11.0, 13.0];
        let mut y = [0.0; 3];
        a.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
        assert_eq!(y, [7.0, 11.0, 13.0]);
    }

    #[test]
    fn transpose_of_identity() {
        let a = identity3();
        let x = [7.0, 11.0, 13.0];
        let mut y = [0.0; 3];
        a.spmv(Operation::Transpose, 1.0, &x, 0.0, &mut y).unwrap();
        assert_eq!(y, [7.0, 11.0, 13.0]);
    }

    #[test]
    fn rectangular_normal_and_transpose() {
        // 2x3: row0 = [1, 0, 2], row1 = [0, 3, 0]
        let a = CsrMatrix::from_triplets(&[(0, 0, 1.0), (0, 2, 2.0), (1, 1, 3.0)], 2, 3).unwrap();
        let x = [1.0, 1.0, 1.0];
        let mut y = [0.0; 2];
        a.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
        assert_eq!(y, [3.0, 3.0]);

        let xt = [1.0, 1.0];
        let mut yt = [0.0; 3];
        a.spmv(Operation::Transpose, 1.0, &xt, 0.0, &mut yt).unwrap();
        assert_eq!(yt, [1.0, 3.0, 2.0]);
    }

    #[test]
    fn alpha_zero_is_just_beta_scale() {
        let a = identity3();
        let x = [1.0, 1.0, 1.0];
        let mut y = [2.0, 3.0, 4.0];
        a.spmv(Operation::Normal, 0.0, &x, 2.0, &mut y).unwrap();
        assert_eq!(y, [4.0, 6.0, 8.0]);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut a = identity3();
        a.set_entry(1, 1, 42.0).unwrap();
        assert_eq!(a.get_entry(1, 1).unwrap(), 42.0);
    }

    #[test]
    fn set_on_unstored_slot_fails() {
        let mut a = identity3();
        let err = a.set_entry(0, 1, 5.0).unwrap_err();
        assert!(matches!(err, EngineError::LogicalZeroNotStored { row: 0, col: 1 }));
    }

    #[test]
    fn symmetric_lower_storage_get_entry() {
        // A[0,0]=2, A[1,0]=3, A[1,1]=5, A[2,1]=7, A[2,2]=11
        let props = AssertedProperties {
            shape: StoredShape::SymmetricLower,
            sorted: true,
            unique: true,
            ..AssertedProperties::default()
        };
        let ptr = vec![0, 1, 3, 5];
        let ind = vec![0, 0, 1, 1, 2];
        let val = vec![2.0, 3.0, 5.0, 7.0, 11.0];
        let a = CsrMatrix::from_owned(ptr, ind, val, 3, 3, props, false).unwrap();

        assert_eq!(a.get_entry(0, 1).unwrap(), 3.0); // mirrored
        assert_eq!(a.get_entry(1, 0).unwrap(), 3.0);
        assert_eq!(a.get_entry(2, 2).unwrap(), 11.0);
        assert_eq!(a.get_entry(0, 2).unwrap(), 0.0);
    }

    #[test]
    fn symmetric_expansion_matches_scenario_6() {
        let props = AssertedProperties {
            shape: StoredShape::SymmetricLower,
            sorted: true,
            unique: true,
            ..AssertedProperties::default()
        };
        let ptr = vec![0, 1, 3, 5];
        let ind = vec![0, 0, 1, 1, 2];
        let val = vec![2.0, 3.0, 5.0, 7.0, 11.0];
        let a = CsrMatrix::from_owned(ptr, ind, val, 3, 3, props, false).unwrap();
        let full = a.expand_symmetric_to_full().unwrap();

        let x = [1.0, 1.0, 1.0];
        let mut y = [0.0; 3];
        full.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
        assert_eq!(y, [5.0, 15.0, 18.0]);
    }

    #[test]
    fn false_asserted_sortedness_is_rejected() {
        let props = AssertedProperties {
            sorted: true,
            ..AssertedProperties::default()
        };
        let ptr = vec![0, 2];
        let ind = vec![1, 0]; // not actually sorted
        let val = vec![1.0, 2.0];
        let err = CsrMatrix::from_owned(ptr, ind, val, 1, 2, props, false).unwrap_err();
        assert!(matches!(err, EngineError::FalseAssertedProperty { .. }));
    }

    #[test]
    fn bypass_check_skips_validation() {
        let props = AssertedProperties {
            sorted: true,
            ..AssertedProperties::default()
        };
        let ptr = vec![0, 2];
        let ind = vec![1, 0];
        let val = vec![1.0, 2.0];
        assert!(CsrMatrix::from_owned(ptr, ind, val, 1, 2, props, true).is_ok());
    }

    #[test]
    fn shared_mode_borrows_callers_arrays() {
        let ptr = [0u32, 1, 2];
        let ind = [0u32, 1];
        let val = [1.0, 1.0];
        let a = CsrMatrix::from_shared(&ptr, &ind, &val, 2, 2, AssertedProperties::default(), false).unwrap();
        assert_eq!(a.nnz(), 2);
    }

    #[test]
    fn one_norm_and_zero_rows() {
        let a = CsrMatrix::from_triplets(&[(0, 0, -3.0), (2, 1, 4.0)], 3, 2).unwrap();
        assert_eq!(a.one_norm(), 7.0);
        assert_eq!(a.count_zero_rows(), 1);
    }
}
