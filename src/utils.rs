use ndarray::ArrayView1;

#[inline(always)]
pub fn from_2d_to_1d(ncol: usize, row: usize, col: usize) -> usize {
    row * ncol + col
}

#[inline(always)]
pub fn from_1d_to_2d(ncol: usize, pos: usize) -> (usize, usize) {
    (pos / ncol, pos % ncol)
}

/// Moves `(row, col)` by `(d_row, d_col)`.
/// Returns `None` when the move would leave a `nrow` x `ncol` grid.
#[inline(always)]
pub fn offset_in_grid(
    nrow: usize,
    ncol: usize,
    row: usize,
    col: usize,
    (d_row, d_col): (isize, isize),
) -> Option<(usize, usize)> {
    let new_row = row.checked_add_signed(d_row)?;
    let new_col = col.checked_add_signed(d_col)?;
    if new_row >= nrow || new_col >= ncol {
        return None;
    }
    Some((new_row, new_col))
}

/// Inverse-CDF sampling: smallest index whose running sum reaches `random`.
///
/// If rounding leaves the total below `random`, the last index carrying
/// probability mass is returned, so a zero-probability outcome is never picked.
/// Zero entries are skipped even when the running sum already reaches
/// `random`: with `random == 0.0` on `[0.0, 1.0]` the result is 1, not 0.
#[inline(always)]
pub fn categorical_sample(probs: ArrayView1<f64>, random: f64) -> usize {
    let mut b: f64 = 0.0;
    let mut last_positive: usize = 0;
    for (i, p) in probs.iter().enumerate() {
        b += p;
        if *p > 0.0 {
            last_positive = i;
        }
        if b >= random && *p > 0.0 {
            return i;
        }
    }
    last_positive
}

pub fn ndarray_max(x: ArrayView1<f64>) -> f64 {
    x.fold(f64::NEG_INFINITY, |acc, v| acc.max(*v))
}

pub fn softmax(x: ArrayView1<f64>) -> ndarray::Array1<f64> {
    let max = ndarray_max(x);
    let e = x.map(|v| (v - max).exp());
    let total = e.sum();
    e / total
}

pub fn moving_average(window: usize, vector: &[f64]) -> Vec<f64> {
    if window == 0 {
        return vec![];
    }
    vector
        .chunks(window)
        .map(|slice| slice.iter().sum::<f64>() / slice.len() as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 1)]
    #[case(0.2, 1)]
    #[case(0.2000001, 2)]
    #[case(0.65, 2)]
    #[case(0.9999, 3)]
    fn categorical_sample_picks_smallest_reaching_index(#[case] random: f64, #[case] expected: usize) {
        let probs = array![0.0, 0.2, 0.5, 0.3];
        assert_eq!(categorical_sample(probs.view(), random), expected);
    }

    #[test]
    fn categorical_sample_falls_back_to_last_positive_entry() {
        let probs = array![0.3, 0.69999, 0.0];
        assert_eq!(categorical_sample(probs.view(), 0.999995), 1);
    }

    #[test]
    fn softmax_survives_huge_values() {
        let x = array![1e308, 1e308, -1e308];
        let p = softmax(x.view());
        assert!(p.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert_float_eq!(p.sum(), 1.0, abs <= 1e-12);
        assert_float_eq!(p[0], 0.5, abs <= 1e-12);
        assert_float_eq!(p[2], 0.0, abs <= 1e-12);
    }

    #[test]
    fn offset_in_grid_stops_at_the_border() {
        assert_eq!(offset_in_grid(4, 4, 0, 0, (-1, 0)), None);
        assert_eq!(offset_in_grid(4, 4, 3, 3, (0, 1)), None);
        assert_eq!(offset_in_grid(4, 4, 1, 2, (1, 0)), Some((2, 2)));
        assert_eq!(from_1d_to_2d(4, from_2d_to_1d(4, 2, 3)), (2, 3));
    }

    #[test]
    fn moving_average_handles_a_partial_tail() {
        let avg = moving_average(2, &[1.0, 3.0, 5.0, 7.0, 9.0]);
        assert_float_eq!(avg, vec![2.0, 6.0, 9.0], abs_all <= 1e-12);
    }
}
