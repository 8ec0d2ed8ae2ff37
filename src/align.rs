use crate::accumulate::CountMatrix;
use crate::onehot::Reference;
use log::debug;

pub const DEFAULT_SEARCH_RADIUS: usize = 3;

/// Placement of a window against the reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    pub start: usize,
    pub shift: i64,
    /// None when no candidate fit inside the reference
    pub score: Option<f64>,
}

/// Best start for `counts` within `center - radius ..= center + radius`.
///
/// Candidates are scored by the element-wise product with the reference
/// window and evaluated left to right; only a strictly better score replaces
/// the current best, so ties keep the leftmost start. Candidates that would
/// leave the reference are skipped. Falls back to `center` when none fit.
pub fn best_offset(
    counts: &CountMatrix,
    reference: &Reference,
    center: usize,
    radius: usize,
) -> Alignment {
    let mut best = Alignment {
        start: center,
        shift: 0,
        score: None,
    };
    let mut best_score = f64::NEG_INFINITY;

    let center = center as i64;
    let radius = radius as i64;
    for delta in -radius..=radius {
        let candidate = center + delta;
        if candidate < 0 {
            continue;
        }
        let Some(score) = reference.window_score(counts, candidate as usize) else {
            continue;
        };
        if score > best_score {
            best_score = score;
            best = Alignment {
                start: candidate as usize,
                shift: delta,
                score: Some(score),
            };
        }
    }

    if best.score.is_none() {
        debug!(
            "No window of width {} fits the reference around {}; keeping center",
            counts.ncols(),
            center
        );
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onehot::Alphabet;

    fn counts_for(seq: &[u8], copies: f64) -> CountMatrix {
        let mut counts = CountMatrix::zeros(4, seq.len());
        for (col, &symbol) in seq.iter().enumerate() {
            let row = Alphabet::Dna.channel(symbol).unwrap();
            counts[(row, col)] = copies;
        }
        counts
    }

    #[test]
    fn test_prefers_matching_offset() {
        let reference = Reference::from_sequence(Alphabet::Dna, b"TTTTTTACGGTTTTT");
        // "ACGG" starts at 6, center is 5
        let counts = counts_for(b"ACGG", 4.0);
        let alignment = best_offset(&counts, &reference, 5, 1);
        assert_eq!(alignment.start, 6);
        assert_eq!(alignment.shift, 1);
        assert_eq!(alignment.score, Some(16.0));
    }

    #[test]
    fn test_match_outside_radius_is_ignored() {
        let reference = Reference::from_sequence(Alphabet::Dna, b"TTTTTTTTTTACGG");
        let counts = counts_for(b"ACGG", 1.0);
        let alignment = best_offset(&counts, &reference, 2, 3);
        assert!(alignment.start <= 5);
    }

    #[test]
    fn test_ties_keep_leftmost() {
        let reference = Reference::from_sequence(Alphabet::Dna, b"AAAAAAAAAA");
        let counts = counts_for(b"AA", 1.0);
        let alignment = best_offset(&counts, &reference, 5, 2);
        assert_eq!(alignment.start, 3);
        assert_eq!(alignment.shift, -2);
    }

    #[test]
    fn test_candidates_clipped_to_reference() {
        let reference = Reference::from_sequence(Alphabet::Dna, b"ACGTACGT");
        let counts = counts_for(b"ACG", 1.0);
        // only starts 0 and 1 fit at the left edge
        let alignment = best_offset(&counts, &reference, 0, 3);
        assert_eq!(alignment.start, 0);
        assert_eq!(alignment.score, Some(3.0));

        let right = best_offset(&counts, &reference, 7, 2);
        assert_eq!(right.start, 5);
    }

    #[test]
    fn test_falls_back_to_center_when_nothing_fits() {
        let reference = Reference::from_sequence(Alphabet::Dna, b"ACG");
        let counts = counts_for(b"ACGTA", 1.0);
        let alignment = best_offset(&counts, &reference, 1, 3);
        assert_eq!(alignment.start, 1);
        assert_eq!(alignment.shift, 0);
        assert_eq!(alignment.score, None);
    }
}
