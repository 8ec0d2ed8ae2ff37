use log::debug;

/// Sign of a group's median contribution; positive orders first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    /// A zero median counts as positive
    pub fn of(value: f64) -> Self {
        if value < 0.0 {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }
}

/// The two maximized objectives of a group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objectives {
    /// |median contribution|
    pub magnitude: f64,
    /// Number of events
    pub count: f64,
}

impl Objectives {
    pub fn new(median: f64, count: usize) -> Self {
        Self {
            magnitude: median.abs(),
            count: count as f64,
        }
    }

    /// At least as good on both objectives and strictly better on one
    pub fn dominates(&self, other: &Self) -> bool {
        self.magnitude >= other.magnitude
            && self.count >= other.count
            && (self.magnitude > other.magnitude || self.count > other.count)
    }
}

/// Layered non-dominated ranking.
///
/// Rank 1 is the non-dominated set; each following rank is the non-dominated
/// set of what remains. Peeling stops after `max_rank`, leaving the rest as
/// `None`.
pub fn pareto_ranks(points: &[Objectives], max_rank: Option<usize>) -> Vec<Option<usize>> {
    let mut ranks = vec![None; points.len()];
    let mut remaining: Vec<usize> = (0..points.len()).collect();
    let mut rank = 1;

    while !remaining.is_empty() && max_rank.map_or(true, |max| rank <= max) {
        let front: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| !remaining.iter().any(|&j| points[j].dominates(&points[i])))
            .collect();
        for &i in &front {
            ranks[i] = Some(rank);
        }
        remaining.retain(|&i| ranks[i].is_none());
        rank += 1;
    }

    if !remaining.is_empty() {
        debug!(
            "{} groups excluded beyond Pareto rank {}",
            remaining.len(),
            rank - 1
        );
    }
    ranks
}

/// Rank `(median, count)` pairs, optionally ranking positive and negative
/// medians independently of each other.
pub fn rank_by_sign(
    groups: &[(f64, usize)],
    max_rank: Option<usize>,
    split_sign: bool,
) -> Vec<Option<usize>> {
    if !split_sign {
        let points: Vec<Objectives> = groups
            .iter()
            .map(|&(median, count)| Objectives::new(median, count))
            .collect();
        return pareto_ranks(&points, max_rank);
    }

    let mut ranks = vec![None; groups.len()];
    for sign in [Sign::Positive, Sign::Negative] {
        let members: Vec<usize> = (0..groups.len())
            .filter(|&i| Sign::of(groups[i].0) == sign)
            .collect();
        let points: Vec<Objectives> = members
            .iter()
            .map(|&i| Objectives::new(groups[i].0, groups[i].1))
            .collect();
        for (&i, rank) in members.iter().zip(pareto_ranks(&points, max_rank)) {
            ranks[i] = rank;
        }
    }
    ranks
}
