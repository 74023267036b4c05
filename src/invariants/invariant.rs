use crate::trace::EventType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The closed set of mined relation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantKind {
    AlwaysFollowedBy,
    NeverFollowedBy,
    AlwaysPrecedes,
}

impl InvariantKind {
    pub const ALL: [InvariantKind; 3] = [
        InvariantKind::AlwaysFollowedBy,
        InvariantKind::NeverFollowedBy,
        InvariantKind::AlwaysPrecedes,
    ];

    pub fn short_name(self) -> &'static str {
        match self {
            InvariantKind::AlwaysFollowedBy => "AFby",
            InvariantKind::NeverFollowedBy => "NFby",
            InvariantKind::AlwaysPrecedes => "AP",
        }
    }
}

/// A temporal relation between two event types
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Invariant {
    pub kind: InvariantKind,
    pub first: EventType,
    pub second: EventType,
}

impl Invariant {
    pub fn new(kind: InvariantKind, first: impl Into<EventType>, second: impl Into<EventType>) -> Self {
        Self {
            kind,
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn always_followed_by(first: impl Into<EventType>, second: impl Into<EventType>) -> Self {
        Self::new(InvariantKind::AlwaysFollowedBy, first, second)
    }

    pub fn never_followed_by(first: impl Into<EventType>, second: impl Into<EventType>) -> Self {
        Self::new(InvariantKind::NeverFollowedBy, first, second)
    }

    pub fn always_precedes(first: impl Into<EventType>, second: impl Into<EventType>) -> Self {
        Self::new(InvariantKind::AlwaysPrecedes, first, second)
    }

    /// `INITIAL AFby x` and friends: the first predicate is the trace start
    pub fn is_anchored(&self) -> bool {
        self.first.is_initial()
    }

    /// Check the invariant against one totally ordered label sequence
    ///
    /// An anchored invariant treats the start of the sequence as one
    /// occurrence of its first predicate.
    ///
    /// # Example
    /// ```
    /// use tracemint::invariants::Invariant;
    /// use tracemint::trace::EventType;
    ///
    /// let labels: Vec<EventType> = ["open", "read", "close"].into_iter().map(Into::into).collect();
    /// assert!(Invariant::always_followed_by("open", "close").holds_on(&labels));
    /// assert!(!Invariant::never_followed_by("open", "read").holds_on(&labels));
    /// ```
    pub fn holds_on<'a, I>(&self, labels: I) -> bool
    where
        I: IntoIterator<Item = &'a EventType>,
    {
        let (a, b) = (&self.first, &self.second);
        let anchored = self.is_anchored();
        match self.kind {
            InvariantKind::AlwaysFollowedBy => {
                let mut pending = anchored;
                for label in labels {
                    if label == a {
                        pending = true;
                    } else if label == b {
                        pending = false;
                    }
                }
                !pending
            }
            InvariantKind::NeverFollowedBy => {
                let mut seen_a = anchored;
                for label in labels {
                    if seen_a && label == b {
                        return false;
                    }
                    seen_a |= label == a;
                }
                true
            }
            InvariantKind::AlwaysPrecedes if anchored => true,
            InvariantKind::AlwaysPrecedes => {
                for label in labels {
                    if label == b {
                        return false;
                    }
                    if label == a {
                        return true;
                    }
                }
                true
            }
        }
    }

    /// Event types mentioned by the invariant
    pub fn predicates(&self) -> [&EventType; 2] {
        [&self.first, &self.second]
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.first, self.kind.short_name(), self.second)
    }
}

/// Ordered, duplicate-free collection of mined invariants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvariantSet {
    invariants: BTreeSet<Invariant>,
}

impl InvariantSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, invariant: Invariant) -> bool {
        self.invariants.insert(invariant)
    }

    pub fn contains(&self, invariant: &Invariant) -> bool {
        self.invariants.contains(invariant)
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invariant> + '_ {
        self.invariants.iter()
    }

    pub fn of_kind(&self, kind: InvariantKind) -> impl Iterator<Item = &Invariant> + '_ {
        self.invariants.iter().filter(move |inv| inv.kind == kind)
    }

    /// Invariants relating two distinct event types
    ///
    /// Reflexive invariants (`a NFby a`: at most one `a`) are genuine but
    /// rarely interesting in reports.
    pub fn without_reflexive(&self) -> InvariantSet {
        self.invariants
            .iter()
            .filter(|inv| inv.first != inv.second)
            .cloned()
            .collect()
    }
}

impl FromIterator<Invariant> for InvariantSet {
    fn from_iter<I: IntoIterator<Item = Invariant>>(iter: I) -> Self {
        Self {
            invariants: iter.into_iter().collect(),
        }
    }
}

impl Extend<Invariant> for InvariantSet {
    fn extend<I: IntoIterator<Item = Invariant>>(&mut self, iter: I) {
        self.invariants.extend(iter);
    }
}

impl<'a> IntoIterator for &'a InvariantSet {
    type Item = &'a Invariant;
    type IntoIter = std::collections::btree_set::Iter<'a, Invariant>;

    fn into_iter(self) -> Self::IntoIter {
        self.invariants.iter()
    }
}
