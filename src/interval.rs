//! Sorted, disjoint integer ranges.
//!
//! An [IntervalSet] is the label representation for range, set and negated-set transitions of
//! the grammar network, and the result type of the follow-set computations. The set keeps its
//! intervals sorted and merges adjacent or overlapping intervals on every mutation, so the
//! membership test is a binary search. A set can be frozen with
//! [set_readonly](IntervalSet::set_readonly) once it is published into a shared cache;
//! mutating a frozen set is a programming error and panics.

use crate::TOKEN_EOF;
use std::cmp::{max, min};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// A closed integer range `a..=b`.
pub struct Interval {
    pub a: i32,
    pub b: i32,
}

#[derive(Debug, Clone, Default)]
/// A sorted list of disjoint closed intervals.
pub struct IntervalSet {
    intervals: Vec<Interval>,
    readonly: bool,
}

impl Interval {
    pub fn of(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// The number of elements in the range; empty when `b < a`.
    pub fn length(&self) -> usize {
        if self.b < self.a {
            0
        } else {
            (self.b as i64 - self.a as i64 + 1) as usize
        }
    }

    pub fn contains(&self, el: i32) -> bool {
        self.a <= el && el <= self.b
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.a == self.b {
            write!(f, "{}", self.a)
        } else {
            write!(f, "{}..{}", self.a, self.b)
        }
    }
}

impl IntervalSet {
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
            readonly: false,
        }
    }

    /// A set holding the single element `el`.
    pub fn of(el: i32) -> Self {
        let mut set = Self::new();
        set.add(el);
        set
    }

    /// A set holding the closed range `a..=b`.
    pub fn of_range(a: i32, b: i32) -> Self {
        let mut set = Self::new();
        set.add_range(a, b);
        set
    }

    fn check_writable(&self) {
        if self.readonly {
            panic!("Interval set is readonly and can not be altered.");
        }
    }

    /// Prevent any further mutation of this set.
    pub fn set_readonly(&mut self) {
        self.readonly = true;
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn add(&mut self, el: i32) {
        self.add_range(el, el);
    }

    pub fn add_range(&mut self, a: i32, b: i32) {
        self.add_interval(Interval::of(a, b));
    }

    pub fn add_interval(&mut self, added: Interval) {
        self.check_writable();
        if added.b < added.a {
            return;
        }
        // First interval which ends at or after the position just before `added`;
        // everything earlier can neither overlap nor touch it.
        let pos = self
            .intervals
            .partition_point(|iv| iv.b < added.a.saturating_sub(1));
        if pos == self.intervals.len() {
            self.intervals.push(added);
            return;
        }
        if self.intervals[pos].a > added.b.saturating_add(1) {
            self.intervals.insert(pos, added);
            return;
        }
        let mut merged = added;
        let mut last = pos;
        while last < self.intervals.len() && self.intervals[last].a <= merged.b.saturating_add(1) {
            merged.a = min(merged.a, self.intervals[last].a);
            merged.b = max(merged.b, self.intervals[last].b);
            last += 1;
        }
        self.intervals.splice(pos..last, std::iter::once(merged));
    }

    /// Add every interval of `other` to this set.
    pub fn add_set(&mut self, other: &IntervalSet) {
        for iv in &other.intervals {
            self.add_interval(*iv);
        }
    }

    /// Remove the single element `el`, splitting its interval when it falls inside one.
    pub fn remove(&mut self, el: i32) {
        self.check_writable();
        let pos = self.intervals.partition_point(|iv| iv.b < el);
        if pos == self.intervals.len() || !self.intervals[pos].contains(el) {
            return;
        }
        let iv = self.intervals[pos];
        match (iv.a == el, iv.b == el) {
            (true, true) => {
                self.intervals.remove(pos);
            }
            (true, false) => self.intervals[pos].a = el + 1,
            (false, true) => self.intervals[pos].b = el - 1,
            (false, false) => {
                self.intervals[pos].b = el - 1;
                self.intervals.insert(pos + 1, Interval::of(el + 1, iv.b));
            }
        }
    }

    pub fn contains(&self, el: i32) -> bool {
        let pos = self.intervals.partition_point(|iv| iv.b < el);
        pos < self.intervals.len() && self.intervals[pos].contains(el)
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The number of elements covered by the set.
    pub fn size(&self) -> usize {
        self.intervals.iter().map(|iv| iv.length()).sum()
    }

    /// The single element of the set, if the set holds exactly one.
    pub fn single_element(&self) -> Option<i32> {
        if self.intervals.len() == 1 && self.intervals[0].a == self.intervals[0].b {
            Some(self.intervals[0].a)
        } else {
            None
        }
    }

    pub fn min(&self) -> Option<i32> {
        self.intervals.first().map(|iv| iv.a)
    }

    pub fn max(&self) -> Option<i32> {
        self.intervals.last().map(|iv| iv.b)
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// The elements of `vocabulary` not contained in this set.
    pub fn complement(&self, vocabulary: &IntervalSet) -> IntervalSet {
        vocabulary.subtract(self)
    }

    /// The elements of this set not contained in `other`.
    pub fn subtract(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = IntervalSet::new();
        for &iv in &self.intervals {
            let mut start = iv.a;
            let mut exhausted = false;
            for &o in &other.intervals {
                if o.b < start {
                    continue;
                }
                if o.a > iv.b {
                    break;
                }
                if o.a > start {
                    result.add_range(start, o.a - 1);
                }
                if o.b >= iv.b {
                    exhausted = true;
                    break;
                }
                start = o.b + 1;
            }
            if !exhausted && start <= iv.b {
                result.add_range(start, iv.b);
            }
        }
        result
    }

    /// The elements contained in both sets.
    pub fn and(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = IntervalSet::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let mine = self.intervals[i];
            let theirs = other.intervals[j];
            let a = max(mine.a, theirs.a);
            let b = min(mine.b, theirs.b);
            if a <= b {
                result.add_range(a, b);
            }
            if mine.b < theirs.b {
                i += 1;
            } else {
                j += 1;
            }
        }
        result
    }

    /// The elements contained in either set.
    pub fn or(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = self.clone();
        result.readonly = false;
        result.add_set(other);
        result
    }

    /// Iterate over every element of the set in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals.iter().flat_map(|iv| iv.a..=iv.b)
    }
}

impl PartialEq for IntervalSet {
    fn eq(&self, other: &Self) -> bool {
        self.intervals == other.intervals
    }
}

impl Eq for IntervalSet {}

impl std::hash::Hash for IntervalSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for iv in &self.intervals {
            state.write_i32(iv.a);
            state.write_i32(iv.b);
        }
    }
}

impl Display for IntervalSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.intervals.is_empty() {
            return write!(f, "{{}}");
        }
        if self.size() == 1 && self.min() == Some(TOKEN_EOF) {
            return write!(f, "'<EOF>'");
        }
        if self.intervals.len() == 1 && self.size() == 1 {
            return write!(f, "{}", self.intervals[0]);
        }
        write!(f, "{{")?;
        for (n, iv) in self.intervals.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            if iv.a == TOKEN_EOF && iv.b == TOKEN_EOF {
                write!(f, "'<EOF>'")?;
            } else {
                write!(f, "{}", iv)?;
            }
        }
        write!(f, "}}")
    }
}
