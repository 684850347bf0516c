//! CSI post-processing.
//!
//! Nexmon reports subcarriers in FFT order, DC first. [`fftshift`] moves DC
//! to the middle of each row, so column `k` holds subcarrier `k - nsub / 2`.

use ndarray::{ArrayBase, DataMut, Ix2};
use num_traits::Zero;

fn rotate_rows<T: Clone>(
    a: &mut ArrayBase<impl DataMut<Elem = T>, Ix2>,
    rotate: impl Fn(&mut [T]),
) {
    for mut row in a.rows_mut() {
        match row.as_slice_mut() {
            Some(row) => rotate(row),
            None => {
                let mut buf = row.to_vec();
                rotate(&mut buf);
                for (dst, src) in row.iter_mut().zip(buf) {
                    *dst = src;
                }
            }
        }
    }
}

/// Shifts the zero-frequency column of every row to the center.
///
/// ```
/// # use ndarray::array;
/// let mut a = array![[0, 1, 2, 3], [4, 5, 6, 7]];
/// nexcsi::proc::fftshift(&mut a);
/// assert_eq!(a, array![[2, 3, 0, 1], [6, 7, 4, 5]]);
/// ```
pub fn fftshift<T: Clone>(a: &mut ArrayBase<impl DataMut<Elem = T>, Ix2>) {
    let n = a.ncols();
    rotate_rows(a, |row| row.rotate_right(n / 2));
}

/// Inverse of [`fftshift`].
pub fn ifftshift<T: Clone>(a: &mut ArrayBase<impl DataMut<Elem = T>, Ix2>) {
    let n = a.ncols();
    rotate_rows(a, |row| row.rotate_left(n / 2));
}

/// Zeroes the given columns of every row.
///
/// # Panics
///
/// Panics if a column is out of bounds.
pub fn zero_subcarriers<T: Clone + Zero>(
    a: &mut ArrayBase<impl DataMut<Elem = T>, Ix2>,
    columns: &[usize],
) {
    for &col in columns {
        a.column_mut(col).fill(T::zero());
    }
}
