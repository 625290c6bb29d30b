//! Axis collapsing.
//!
//! Adjacent axes that are contiguous in every array of a group can be iterated as one axis.
//! Fewer axes means fewer kernel variants and cheaper index arithmetic.

/// Collapse `dims` in place, applying the same merges to every array in `strides`.
///
/// Size-1 axes are dropped first (at least one axis is kept). Then axis `i - 1` absorbs axis
/// `i` wherever `strides[k][i - 1] == dims[i] * strides[k][i]` holds for every `k`. The element
/// addresses reachable through the result are exactly those of the input.
pub fn collapse(dims: &mut Vec<usize>, strides: &mut [Vec<isize>]) {
    debug_assert!(strides.iter().all(|s| s.len() == dims.len()));

    let mut i = dims.len();
    while i > 0 {
        if dims.len() > 1 && dims[i - 1] == 1 {
            dims.remove(i - 1);
            for s in strides.iter_mut() {
                s.remove(i - 1);
            }
        }
        i -= 1;
    }

    let mut i = dims.len().saturating_sub(1);
    while i > 0 {
        let contiguous = strides.iter().all(|s| s[i - 1] == dims[i] as isize * s[i]);
        if contiguous {
            dims[i - 1] *= dims[i];
            dims.remove(i);
            for s in strides.iter_mut() {
                s[i - 1] = s[i];
                s.remove(i);
            }
        }
        i -= 1;
    }
}
