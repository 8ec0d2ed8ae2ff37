use crate::error::{MotifError, Result};
use crate::onehot::{Alphabet, OneHotTensor, Reference};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufReader, Read};

/// One motif occurrence (or co-occurrence) with its contribution value
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    pub identities: Vec<u32>,
    pub positions: Vec<usize>,
    /// Gap between the end of window i and the start of window i+1; derived
    /// from positions when absent
    #[serde(default)]
    pub distances: Vec<i64>,
    pub sequence: usize,
    pub value: f64,
}

impl Event {
    pub fn new(identities: Vec<u32>, positions: Vec<usize>, sequence: usize, value: f64) -> Self {
        Self {
            identities,
            positions,
            distances: Vec::new(),
            sequence,
            value,
        }
    }

    /// Number of constituent motifs
    pub fn size(&self) -> usize {
        self.identities.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.identities.is_empty() {
            return Err(MotifError::InvalidInput("event without identities".to_string()));
        }
        if self.positions.len() != self.identities.len() {
            return Err(MotifError::InvalidInput(format!(
                "event has {} identities but {} positions",
                self.identities.len(),
                self.positions.len()
            )));
        }
        if !self.distances.is_empty() && self.distances.len() + 1 != self.identities.len() {
            return Err(MotifError::InvalidInput(format!(
                "event has {} identities but {} distances",
                self.identities.len(),
                self.distances.len()
            )));
        }
        Ok(())
    }

    /// Distance between constituent `i` and `i + 1`
    pub fn distance(&self, i: usize, window_len: usize) -> Option<i64> {
        match self.distances.get(i) {
            Some(&d) => Some(d),
            None => self.positional_distance(i, window_len),
        }
    }

    /// Distance implied by the positions; None when it does not fit in an i64
    fn positional_distance(&self, i: usize, window_len: usize) -> Option<i64> {
        let next = i64::try_from(*self.positions.get(i + 1)?).ok()?;
        let current = i64::try_from(*self.positions.get(i)?).ok()?;
        next.checked_sub(current)?
            .checked_sub(i64::try_from(window_len).ok()?)
    }

    /// Explicit distances must agree with the positions at `window_len`
    pub fn check_distances(&self, window_len: usize) -> Result<()> {
        for (i, &explicit) in self.distances.iter().enumerate() {
            let derived = self.positional_distance(i, window_len);
            if derived != Some(explicit) {
                return Err(MotifError::InvalidInput(format!(
                    "distance {} is {} but positions {:?} imply {:?} at window length {}",
                    i + 1,
                    explicit,
                    self.positions,
                    derived,
                    window_len
                )));
            }
        }
        Ok(())
    }
}

/// Read-only table of events in upstream order
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    events: Vec<Event>,
}

impl EventTable {
    pub fn new(events: Vec<Event>) -> Result<Self> {
        for (idx, event) in events.iter().enumerate() {
            event
                .validate()
                .map_err(|e| MotifError::InvalidInput(format!("event {idx}: {e}")))?;
        }
        Ok(Self { events })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Indices (in table order) of events with `motif_size` constituents
    pub fn indices_of_size(&self, motif_size: usize) -> impl Iterator<Item = usize> + '_ {
        self.events
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.size() == motif_size)
            .map(|(idx, _)| idx)
    }
}

/// JSON envelope carrying everything one aggregation run consumes
#[derive(Debug, Clone, Deserialize)]
pub struct InputBundle {
    #[serde(default)]
    pub alphabet: Alphabet,
    pub sequences: Vec<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub events: Vec<Event>,
}

impl InputBundle {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn load(path: &str) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Failed to read input bundle '{path}': {e}"),
            )
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn tensor(&self) -> Result<OneHotTensor<u8>> {
        OneHotTensor::from_sequences(self.alphabet, &self.sequences)
    }

    pub fn reference(&self) -> Option<Reference> {
        self.reference
            .as_ref()
            .map(|seq| Reference::from_sequence(self.alphabet, seq.as_bytes()))
    }

    pub fn into_table(self) -> Result<EventTable> {
        EventTable::new(self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_derived_from_positions() {
        let event = Event::new(vec![1, 2], vec![10, 22], 0, 0.5);
        assert_eq!(event.distance(0, 5), Some(7));
        assert_eq!(event.distance(1, 5), None);

        let mut explicit = event.clone();
        explicit.distances = vec![7];
        assert_eq!(explicit.distance(0, 5), Some(7));
        assert!(explicit.check_distances(5).is_ok());
    }

    #[test]
    fn test_explicit_distance_must_match_positions() {
        let mut event = Event::new(vec![1, 2], vec![10, 22], 0, 0.5);
        event.distances = vec![3];
        assert!(matches!(
            event.check_distances(5),
            Err(MotifError::InvalidInput(_))
        ));
        // the same distance is consistent for a wider window
        assert!(event.check_distances(9).is_ok());
    }

    #[test]
    fn test_distance_of_huge_positions_is_none() {
        let event = Event::new(vec![1, 2], vec![0, usize::MAX], 0, 0.5);
        assert_eq!(event.distance(0, 5), None);

        let mut explicit = event.clone();
        explicit.distances = vec![i64::MAX];
        assert!(explicit.check_distances(5).is_err());
    }

    #[test]
    fn test_validate_rejects_mismatched_positions() {
        let event = Event::new(vec![1, 2], vec![10], 0, 0.5);
        assert!(matches!(event.validate(), Err(MotifError::InvalidInput(_))));
        assert!(EventTable::new(vec![event]).is_err());
    }

    #[test]
    fn test_indices_of_size_keeps_table_order() {
        let table = EventTable::new(vec![
            Event::new(vec![1], vec![0], 0, 1.0),
            Event::new(vec![1, 2], vec![0, 8], 0, 1.0),
            Event::new(vec![3], vec![4], 1, -1.0),
        ])
        .unwrap();
        assert_eq!(table.indices_of_size(1).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(table.indices_of_size(2).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_bundle_from_json() {
        let json = r#"{
            "sequences": ["ACGTACGT", "TTTTACGT"],
            "reference": "ACGTACGT",
            "events": [
                {"identities": [7], "positions": [2], "sequence": 1, "value": -0.25}
            ]
        }"#;
        let bundle = InputBundle::from_reader(json.as_bytes()).unwrap();
        assert_eq!(bundle.alphabet, Alphabet::Dna);
        let tensor = bundle.tensor().unwrap();
        assert_eq!(tensor.sequences(), 2);
        assert_eq!(bundle.reference().map(|r| r.len()), Some(8));
        let table = bundle.into_table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.events()[0].identities, vec![7]);
    }
}
