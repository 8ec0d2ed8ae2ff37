use crate::error::{MotifError, Result};
use crate::event::Event;
use std::fmt;
use std::str::FromStr;

/// How events are grouped into motif groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Criterion {
    ByIdentity,
    ByPosition,
    ByDistance,
    ByIdentityAndDistance,
    Complete,
}

impl Criterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::ByIdentity => "identity",
            Criterion::ByPosition => "position",
            Criterion::ByDistance => "distance",
            Criterion::ByIdentityAndDistance => "identity-distance",
            Criterion::Complete => "complete",
        }
    }

    /// Whether group keys pin every window to an absolute position
    pub fn fixes_positions(&self) -> bool {
        matches!(self, Criterion::ByPosition | Criterion::Complete)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Criterion {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "identity" | "motif" => Ok(Criterion::ByIdentity),
            "position" => Ok(Criterion::ByPosition),
            "distance" => Ok(Criterion::ByDistance),
            "identity-distance" | "motif-distance" => Ok(Criterion::ByIdentityAndDistance),
            "complete" => Ok(Criterion::Complete),
            _ => Err(MotifError::InvalidCriterion(s.to_string())),
        }
    }
}

/// One column of a group key; indices are 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Identity(usize),
    Distance(usize),
    Position(usize),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Identity(i) => write!(f, "id{i}"),
            Field::Distance(i) => write!(f, "dist{i}"),
            Field::Position(i) => write!(f, "pos{i}"),
        }
    }
}

/// Ordered list of fields defining a group under `criterion`
pub fn group_fields(criterion: Criterion, motif_size: Option<usize>) -> Result<Vec<Field>> {
    let n = motif_size.ok_or_else(|| {
        MotifError::InvalidCriterion(format!("criterion '{criterion}' requires a motif size"))
    })?;
    let min_size = match criterion {
        Criterion::ByDistance => 2,
        _ => 1,
    };
    if n < min_size {
        return Err(MotifError::InvalidMotifSize {
            criterion: criterion.to_string(),
            size: n,
        });
    }

    let identities = (1..=n).map(Field::Identity);
    let distances = (1..n).map(Field::Distance);
    let positions = (1..=n).map(Field::Position);

    let fields: Vec<Field> = match criterion {
        Criterion::ByIdentity => identities.collect(),
        Criterion::ByPosition => positions.collect(),
        Criterion::ByDistance => distances.collect(),
        Criterion::ByIdentityAndDistance => identities.chain(distances).collect(),
        Criterion::Complete => identities.chain(distances).chain(positions).collect(),
    };
    Ok(fields)
}

/// Values of an event on a fixed field list
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    entries: Vec<(Field, i64)>,
}

impl GroupKey {
    pub fn new(entries: Vec<(Field, i64)>) -> Self {
        Self { entries }
    }

    pub fn from_event(fields: &[Field], event: &Event, window_len: usize) -> Result<Self> {
        let missing = |field: &Field| {
            MotifError::InvalidInput(format!(
                "event of size {} has no field {}",
                event.size(),
                field
            ))
        };

        let entries = fields
            .iter()
            .map(|field| {
                let value = match *field {
                    Field::Identity(i) => event.identities.get(i - 1).map(|&v| v as i64),
                    Field::Position(i) => event
                        .positions
                        .get(i - 1)
                        .and_then(|&v| i64::try_from(v).ok()),
                    Field::Distance(i) => event.distance(i - 1, window_len),
                };
                value.map(|v| (*field, v)).ok_or_else(|| missing(field))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    pub fn get(&self, field: Field) -> Option<i64> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|&(_, v)| v)
    }

    pub fn entries(&self) -> &[(Field, i64)] {
        &self.entries
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (field, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(";")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_per_criterion() {
        use Field::*;
        assert_eq!(
            group_fields(Criterion::ByIdentity, Some(2)).unwrap(),
            vec![Identity(1), Identity(2)]
        );
        assert_eq!(
            group_fields(Criterion::ByPosition, Some(1)).unwrap(),
            vec![Position(1)]
        );
        assert_eq!(
            group_fields(Criterion::ByDistance, Some(3)).unwrap(),
            vec![Distance(1), Distance(2)]
        );
        assert_eq!(
            group_fields(Criterion::ByIdentityAndDistance, Some(2)).unwrap(),
            vec![Identity(1), Identity(2), Distance(1)]
        );
        assert_eq!(
            group_fields(Criterion::Complete, Some(2)).unwrap(),
            vec![Identity(1), Identity(2), Distance(1), Position(1), Position(2)]
        );
    }

    #[test]
    fn test_missing_or_invalid_size() {
        assert!(matches!(
            group_fields(Criterion::ByIdentity, None),
            Err(MotifError::InvalidCriterion(_))
        ));
        assert!(matches!(
            group_fields(Criterion::ByIdentity, Some(0)),
            Err(MotifError::InvalidMotifSize { size: 0, .. })
        ));
        assert!(matches!(
            group_fields(Criterion::ByDistance, Some(1)),
            Err(MotifError::InvalidMotifSize { size: 1, .. })
        ));
    }

    #[test]
    fn test_parse_criterion() {
        assert_eq!("complete".parse::<Criterion>().unwrap(), Criterion::Complete);
        assert_eq!(
            "Identity-Distance".parse::<Criterion>().unwrap(),
            Criterion::ByIdentityAndDistance
        );
        assert!(matches!(
            "by-color".parse::<Criterion>(),
            Err(MotifError::InvalidCriterion(_))
        ));
    }

    #[test]
    fn test_key_from_event() {
        let event = Event::new(vec![7, 3], vec![20, 31], 4, 0.1);
        let fields = group_fields(Criterion::Complete, Some(2)).unwrap();
        let key = GroupKey::from_event(&fields, &event, 5).unwrap();
        assert_eq!(key.get(Field::Identity(2)), Some(3));
        assert_eq!(key.get(Field::Distance(1)), Some(6));
        assert_eq!(key.get(Field::Position(1)), Some(20));
        assert_eq!(key.to_string(), "id1=7;id2=3;dist1=6;pos1=20;pos2=31");

        let single = Event::new(vec![7], vec![20], 0, 0.1);
        assert!(GroupKey::from_event(&fields, &single, 5).is_err());
    }
}
