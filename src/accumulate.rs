use crate::error::{MotifError, Result};
use crate::onehot::{OneHotElement, OneHotTensor};
use nalgebra::DMatrix;

/// Alphabet x window-length occurrence counts
pub type CountMatrix = DMatrix<f64>;

pub const DEFAULT_PSEUDOCOUNT: f64 = 1e-3;

/// Conversion buffer for tensors whose elements are not `f64`.
///
/// Owned by the caller and reused for every event of a group, so a group of
/// many thousands of events converts without allocating per event.
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    values: Vec<f64>,
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    fn convert<T: OneHotElement>(&mut self, block: &[T]) -> &[f64] {
        self.values.clear();
        self.values.extend(block.iter().map(|v| v.to_f64()));
        &self.values
    }
}

/// Add the tensor slice `[start, end)` of `sequence` into `dest` in place
pub fn accumulate_window<T: OneHotElement>(
    dest: &mut CountMatrix,
    tensor: &OneHotTensor<T>,
    start: usize,
    end: usize,
    sequence: usize,
    scratch: &mut ScratchBuffer,
) -> Result<()> {
    let width = end.saturating_sub(start);
    if dest.nrows() != tensor.channels() || dest.ncols() != width {
        return Err(MotifError::InvalidInput(format!(
            "destination is {}x{}, window is {}x{}",
            dest.nrows(),
            dest.ncols(),
            tensor.channels(),
            width
        )));
    }

    let block = tensor.window(sequence, start, end)?;
    let values = match T::as_working(block) {
        Some(values) => values,
        None => scratch.convert(block),
    };
    for (cell, value) in dest.as_mut_slice().iter_mut().zip(values) {
        *cell += value;
    }
    Ok(())
}

/// Fold the windows `(sequence, start)` of a group into a fresh count matrix.
/// Windows are added in iteration order; an empty input yields all zeros.
pub fn accumulate_group<T, I>(
    tensor: &OneHotTensor<T>,
    windows: I,
    window_len: usize,
    scratch: &mut ScratchBuffer,
) -> Result<CountMatrix>
where
    T: OneHotElement,
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut counts = CountMatrix::zeros(tensor.channels(), window_len);
    for (sequence, start) in windows {
        let end = start
            .checked_add(window_len)
            .ok_or(MotifError::WindowOutOfBounds {
                sequence,
                start,
                end: usize::MAX,
                len: tensor.length(),
            })?;
        accumulate_window(&mut counts, tensor, start, end, sequence, scratch)?;
    }
    Ok(counts)
}

/// Column-stochastic frequency matrix: add `pseudocount` to every cell and
/// divide each column by its sum (clamped to machine epsilon).
pub fn normalize(counts: &CountMatrix, pseudocount: f64) -> DMatrix<f64> {
    let mut freqs = counts.add_scalar(pseudocount);
    for mut column in freqs.column_iter_mut() {
        let total = column.sum().max(f64::EPSILON);
        column /= total;
    }
    freqs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onehot::Alphabet;

    fn tensor_u8(seqs: &[&str]) -> OneHotTensor<u8> {
        OneHotTensor::from_sequences(Alphabet::Dna, seqs).unwrap()
    }

    #[test]
    fn test_column_sums_equal_event_count() {
        let tensor = tensor_u8(&["ACGTACGTAC", "TTGCAACGTA", "GGGGCCCCAA"]);
        let windows = vec![(0, 0), (1, 3), (2, 5), (0, 4), (1, 0)];
        let mut scratch = ScratchBuffer::new();
        let counts = accumulate_group(&tensor, windows.iter().copied(), 4, &mut scratch).unwrap();

        for column in counts.column_iter() {
            assert_eq!(column.sum(), windows.len() as f64);
        }
    }

    #[test]
    fn test_float_tensor_skips_scratch() {
        let tensor =
            OneHotTensor::<f64>::from_sequences(Alphabet::Dna, &["ACGTA", "ACGTT"]).unwrap();
        let mut scratch = ScratchBuffer::new();
        let counts = accumulate_group(&tensor, [(0, 1), (1, 1)], 3, &mut scratch).unwrap();
        assert_eq!(scratch.capacity(), 0);
        assert_eq!(counts[(1, 0)], 2.0);
        assert_eq!(counts[(2, 1)], 2.0);
        assert_eq!(counts[(3, 2)], 2.0);
    }

    #[test]
    fn test_scratch_reused_across_events() {
        let tensor = tensor_u8(&["ACGTACGTAC"; 8]);
        let mut scratch = ScratchBuffer::new();
        accumulate_group(&tensor, [(0, 0)], 6, &mut scratch).unwrap();
        let capacity = scratch.capacity();
        let windows = (0..8).flat_map(|s| (0..4).map(move |p| (s, p)));
        accumulate_group(&tensor, windows, 6, &mut scratch).unwrap();
        assert_eq!(scratch.capacity(), capacity);
    }

    #[test]
    fn test_empty_group_is_zero() {
        let tensor = tensor_u8(&["ACGT"]);
        let mut scratch = ScratchBuffer::new();
        let counts = accumulate_group(&tensor, std::iter::empty(), 3, &mut scratch).unwrap();
        assert!(counts.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_window_past_sequence_end() {
        let tensor = tensor_u8(&["ACGT"]);
        let mut scratch = ScratchBuffer::new();
        let result = accumulate_group(&tensor, [(0, 2)], 3, &mut scratch);
        assert!(matches!(result, Err(MotifError::WindowOutOfBounds { .. })));
    }

    #[test]
    fn test_window_end_overflow_is_out_of_bounds() {
        let tensor = tensor_u8(&["ACGT"]);
        let mut scratch = ScratchBuffer::new();
        let result = accumulate_group(&tensor, [(0, usize::MAX - 1)], 3, &mut scratch);
        assert!(matches!(
            result,
            Err(MotifError::WindowOutOfBounds { len: 4, .. })
        ));
    }

    #[test]
    fn test_destination_shape_mismatch() {
        let tensor = tensor_u8(&["ACGT"]);
        let mut dest = CountMatrix::zeros(4, 2);
        let mut scratch = ScratchBuffer::new();
        let result = accumulate_window(&mut dest, &tensor, 0, 3, 0, &mut scratch);
        assert!(matches!(result, Err(MotifError::InvalidInput(_))));
    }

    #[test]
    fn test_normalized_columns_are_stochastic() {
        let mut counts = CountMatrix::zeros(4, 3);
        counts[(0, 0)] = 5.0;
        counts[(1, 0)] = 5.0;
        counts[(3, 1)] = 1.0;
        // column 2 stays all zero
        let freqs = normalize(&counts, DEFAULT_PSEUDOCOUNT);
        for column in freqs.column_iter() {
            assert!((column.sum() - 1.0).abs() < 1e-12);
            assert!(column.iter().all(|&v| v > 0.0));
        }
        assert!((freqs[(0, 2)] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_pseudocount_on_empty_column_stays_finite() {
        let counts = CountMatrix::zeros(4, 2);
        let freqs = normalize(&counts, 0.0);
        assert!(freqs.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_identical_events_give_dominant_base() {
        let mut seq = "T".repeat(20);
        seq.push_str("ACGTA");
        seq.push_str(&"T".repeat(5));
        let seqs: Vec<&str> = vec![seq.as_str(); 10];
        let tensor = tensor_u8(&seqs);
        let mut scratch = ScratchBuffer::new();
        let counts =
            accumulate_group(&tensor, (0..10).map(|s| (s, 20)), 5, &mut scratch).unwrap();

        let sums: Vec<f64> = counts.column_iter().map(|c| c.sum()).collect();
        assert_eq!(sums, vec![10.0; 5]);

        let freqs = normalize(&counts, DEFAULT_PSEUDOCOUNT);
        let dominant = 10.001 / 10.004;
        let background = 0.001 / 10.004;
        for (col, &base) in [0usize, 1, 2, 3, 0].iter().enumerate() {
            for row in 0..4 {
                let expected = if row == base { dominant } else { background };
                assert!((freqs[(row, col)] - expected).abs() < 1e-12);
            }
        }
    }
}
