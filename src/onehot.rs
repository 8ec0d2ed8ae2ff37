use crate::error::{MotifError, Result};
use nalgebra::DMatrix;
use serde::Deserialize;

const DNA_SYMBOLS: &[u8] = b"ACGT";
const PROTEIN_SYMBOLS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// Residue alphabet; its size is the number of one-hot channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alphabet {
    #[default]
    Dna,
    Protein,
}

impl Alphabet {
    pub fn symbols(&self) -> &'static [u8] {
        match self {
            Alphabet::Dna => DNA_SYMBOLS,
            Alphabet::Protein => PROTEIN_SYMBOLS,
        }
    }

    pub fn size(&self) -> usize {
        self.symbols().len()
    }

    /// Channel of a symbol, or None for ambiguous/unknown symbols (N, X, gaps)
    pub fn channel(&self, symbol: u8) -> Option<usize> {
        let upper = match (self, symbol.to_ascii_uppercase()) {
            (Alphabet::Dna, b'U') => b'T',
            (_, s) => s,
        };
        self.symbols().iter().position(|&s| s == upper)
    }
}

/// Element type of a one-hot tensor.
///
/// The accumulator works in `f64`; every other element type is converted
/// through a caller-owned scratch buffer.
pub trait OneHotElement: Copy + Send + Sync + 'static {
    const ZERO: Self;
    const ONE: Self;

    fn to_f64(self) -> f64;

    /// Borrow the slice as working floats when no conversion is needed
    fn as_working(_slice: &[Self]) -> Option<&[f64]> {
        None
    }
}

impl OneHotElement for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    fn to_f64(self) -> f64 {
        self
    }

    fn as_working(slice: &[Self]) -> Option<&[f64]> {
        Some(slice)
    }
}

impl OneHotElement for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl OneHotElement for u8 {
    const ZERO: Self = 0;
    const ONE: Self = 1;

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl OneHotElement for bool {
    const ZERO: Self = false;
    const ONE: Self = true;

    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}

/// One-hot encoded sequences indexed by (channel, position, sequence).
///
/// Channels vary fastest, so the window `[start, end)` of one sequence is a
/// contiguous column-major `channels x (end - start)` block.
#[derive(Debug, Clone)]
pub struct OneHotTensor<T> {
    data: Vec<T>,
    channels: usize,
    length: usize,
    sequences: usize,
}

impl<T: OneHotElement> OneHotTensor<T> {
    pub fn zeros(channels: usize, length: usize, sequences: usize) -> Self {
        Self {
            data: vec![T::ZERO; channels * length * sequences],
            channels,
            length,
            sequences,
        }
    }

    /// Encode equal-length sequences
    pub fn from_sequences<S: AsRef<[u8]>>(alphabet: Alphabet, sequences: &[S]) -> Result<Self> {
        let length = sequences.first().map(|s| s.as_ref().len()).unwrap_or(0);
        let mut tensor = Self::zeros(alphabet.size(), length, sequences.len());

        for (seq_idx, seq) in sequences.iter().enumerate() {
            let seq = seq.as_ref();
            if seq.len() != length {
                return Err(MotifError::InvalidInput(format!(
                    "sequence {} has length {}, expected {}",
                    seq_idx,
                    seq.len(),
                    length
                )));
            }
            for (pos, &symbol) in seq.iter().enumerate() {
                if let Some(channel) = alphabet.channel(symbol) {
                    tensor.set(channel, pos, seq_idx, T::ONE);
                }
            }
        }

        Ok(tensor)
    }

    fn offset(&self, channel: usize, position: usize, sequence: usize) -> usize {
        (sequence * self.length + position) * self.channels + channel
    }

    pub fn get(&self, channel: usize, position: usize, sequence: usize) -> T {
        self.data[self.offset(channel, position, sequence)]
    }

    pub fn set(&mut self, channel: usize, position: usize, sequence: usize, value: T) {
        let idx = self.offset(channel, position, sequence);
        self.data[idx] = value;
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn sequences(&self) -> usize {
        self.sequences
    }

    /// Column-major block covering positions `[start, end)` of one sequence
    pub fn window(&self, sequence: usize, start: usize, end: usize) -> Result<&[T]> {
        if sequence >= self.sequences {
            return Err(MotifError::SequenceOutOfRange {
                index: sequence,
                count: self.sequences,
            });
        }
        if start > end || end > self.length {
            return Err(MotifError::WindowOutOfBounds {
                sequence,
                start,
                end,
                len: self.length,
            });
        }
        let from = self.offset(0, start, sequence);
        let to = from + (end - start) * self.channels;
        Ok(&self.data[from..to])
    }
}

/// Boolean one-hot matrix (alphabet x length) of a reference sequence
#[derive(Debug, Clone)]
pub struct Reference {
    matrix: DMatrix<bool>,
}

impl Reference {
    pub fn from_sequence(alphabet: Alphabet, sequence: &[u8]) -> Self {
        let mut matrix = DMatrix::from_element(alphabet.size(), sequence.len(), false);
        for (pos, &symbol) in sequence.iter().enumerate() {
            if let Some(channel) = alphabet.channel(symbol) {
                matrix[(channel, pos)] = true;
            }
        }
        Self { matrix }
    }

    pub fn from_matrix(matrix: DMatrix<bool>) -> Self {
        Self { matrix }
    }

    pub fn len(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.ncols() == 0
    }

    pub fn channels(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn matrix(&self) -> &DMatrix<bool> {
        &self.matrix
    }

    /// Element-wise dot product of `counts` with the reference window at `start`.
    /// None when the window would leave the reference.
    pub fn window_score(&self, counts: &DMatrix<f64>, start: usize) -> Option<f64> {
        let width = counts.ncols();
        if counts.nrows() != self.channels() || start + width > self.len() {
            return None;
        }
        let window = self.matrix.columns(start, width);
        let score = counts
            .iter()
            .zip(window.iter())
            .filter(|(_, hit)| **hit)
            .map(|(&count, _)| count)
            .sum();
        Some(score)
    }
}
