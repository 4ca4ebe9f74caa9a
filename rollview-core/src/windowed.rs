//! # Windowed Index
//!
//! Narrows a time-ordered event list down to the events a drawer could possibly paint for the
//! visible time range, using binary searches over start and end times.
//!
//! Events that start inside the window or end inside it are always found. Events that start up to
//! one viewport length (plus slack) *before* the window are included as well, so a held note that
//! began off-screen still gets drawn. Anything that ended before that look-back point is excluded.
//!
//! Every boundary comparison goes through a [`FuzzyCmp`], so a value sitting on a grid line does
//! not flicker in and out of the set as the scroll position jitters by rounding error.

/// The only view of an event the index needs.
pub trait Timed {
    fn time(&self) -> f64;
    /// Negative durations are indexed as zero, so an event never ends before it starts.
    fn duration(&self) -> f64;
    /// Orders events sharing a start time. Defaults to declaration order.
    fn secondary_key(&self) -> i64 {
        0
    }
}
impl<T: Timed + ?Sized> Timed for &T {
    fn time(&self) -> f64 {
        (**self).time()
    }
    fn duration(&self) -> f64 {
        (**self).duration()
    }
    fn secondary_key(&self) -> i64 {
        (**self).secondary_key()
    }
}
/// `(time, duration)`
impl Timed for (f64, f64) {
    fn time(&self) -> f64 {
        self.0
    }
    fn duration(&self) -> f64 {
        self.1
    }
}

/// Comparisons where values within `threshold` of each other are equal.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FuzzyCmp {
    threshold: f64,
}
impl Default for FuzzyCmp {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}
impl FuzzyCmp {
    pub const DEFAULT_THRESHOLD: f64 = 1e-6;
    /// Negative thresholds are taken by magnitude.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.abs(),
        }
    }
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
    #[must_use]
    pub fn eq(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.threshold
    }
    #[must_use]
    pub fn lt(&self, a: f64, b: f64) -> bool {
        a < b && !self.eq(a, b)
    }
    #[must_use]
    pub fn le(&self, a: f64, b: f64) -> bool {
        a < b || self.eq(a, b)
    }
    #[must_use]
    pub fn gt(&self, a: f64, b: f64) -> bool {
        self.lt(b, a)
    }
    #[must_use]
    pub fn ge(&self, a: f64, b: f64) -> bool {
        self.le(b, a)
    }
    /// First index whose value is not fuzzily less than `x`. `values` must be non-decreasing.
    #[must_use]
    pub fn lower_bound(&self, values: &[f64], x: f64) -> usize {
        values.partition_point(|&v| self.lt(v, x))
    }
    /// First index whose value is fuzzily greater than `x`. `values` must be non-decreasing.
    #[must_use]
    pub fn upper_bound(&self, values: &[f64], x: f64) -> usize {
        values.partition_point(|&v| self.le(v, x))
    }
}

/// The binary search results behind one query.
///
/// `lo_end..hi_end` index the sorted end times, not events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WindowBounds {
    pub back_lo: usize,
    pub lo_start: usize,
    pub hi_start: usize,
    pub lo_end: usize,
    pub hi_end: usize,
}

pub struct WindowedIndex<E> {
    events: Vec<E>,
    /// Start times, parallel to `events`.
    starts: Vec<f64>,
    /// End times, sorted on their own.
    ends: Vec<f64>,
    /// `ends[k]` belongs to `events[end_order[k]]`.
    end_order: Vec<usize>,
}
impl<E: Timed> WindowedIndex<E> {
    /// Sort `events` by `(time, secondary_key)` and derive the search arrays.
    pub fn build(events: impl IntoIterator<Item = E>) -> Self {
        let mut events: Vec<E> = events.into_iter().collect();
        events.sort_by(|a, b| {
            a.time()
                .total_cmp(&b.time())
                .then_with(|| a.secondary_key().cmp(&b.secondary_key()))
        });
        let starts: Vec<f64> = events.iter().map(Timed::time).collect();

        // Sorting by start does not sort the ends when events overlap.
        let raw_ends: Vec<f64> = events
            .iter()
            .map(|e| e.time() + e.duration().max(0.0))
            .collect();
        let mut end_order: Vec<usize> = (0..events.len()).collect();
        end_order.sort_by(|&a, &b| raw_ends[a].total_cmp(&raw_ends[b]));
        let ends = end_order.iter().map(|&i| raw_ends[i]).collect();

        Self {
            events,
            starts,
            ends,
            end_order,
        }
    }
    /// Events in index order. Query results index into this.
    #[must_use]
    pub fn events(&self) -> &[E] {
        &self.events
    }
    #[must_use]
    pub fn starts(&self) -> &[f64] {
        &self.starts
    }
    /// Sorted end times.
    #[must_use]
    pub fn ends(&self) -> &[f64] {
        &self.ends
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
    /// Binary search boundaries for a window. A reversed window is treated as its mirror.
    #[must_use]
    pub fn bounds(
        &self,
        t_begin: f64,
        t_end: f64,
        viewport_len: f64,
        slack: f64,
        cmp: &FuzzyCmp,
    ) -> WindowBounds {
        let (t_begin, t_end) = if t_end < t_begin {
            (t_end, t_begin)
        } else {
            (t_begin, t_end)
        };
        let look_back = t_begin - viewport_len.max(0.0) - slack.max(0.0);
        WindowBounds {
            back_lo: cmp.lower_bound(&self.starts, look_back),
            lo_start: cmp.lower_bound(&self.starts, t_begin),
            hi_start: cmp.upper_bound(&self.starts, t_end),
            lo_end: cmp.lower_bound(&self.ends, t_begin),
            hi_end: cmp.upper_bound(&self.ends, t_end),
        }
    }
    /// Indices of every event worth drawing for `[t_begin, t_end]`, ascending and unique.
    #[must_use]
    pub fn query(
        &self,
        t_begin: f64,
        t_end: f64,
        viewport_len: f64,
        slack: f64,
        cmp: &FuzzyCmp,
    ) -> Vec<usize> {
        let bounds = self.bounds(t_begin, t_end, viewport_len, slack, cmp);
        // back_lo <= lo_start <= hi_start always holds, the range is never reversed.
        let mut candidates: Vec<usize> = (bounds.back_lo..bounds.hi_start).collect();
        candidates.extend(
            self.end_order[bounds.lo_end..bounds.hi_end.max(bounds.lo_end)]
                .iter()
                .copied(),
        );
        candidates.sort_unstable();
        candidates.dedup();
        log::trace!(
            "window [{t_begin}, {t_end}]: {} of {} events ({bounds:?})",
            candidates.len(),
            self.events.len()
        );
        candidates
    }
    /// Like [`Self::query`], yielding the events themselves.
    pub fn query_events(
        &self,
        t_begin: f64,
        t_end: f64,
        viewport_len: f64,
        slack: f64,
        cmp: &FuzzyCmp,
    ) -> impl Iterator<Item = &E> {
        self.query(t_begin, t_end, viewport_len, slack, cmp)
            .into_iter()
            .map(|index| &self.events[index])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sustained_and_far_events() {
        let index = WindowedIndex::build([(90.0, 50.0), (150.0, 5.0), (500.0, 10.0)]);
        let found = index.query(100.0, 200.0, 100.0, 7.0, &FuzzyCmp::default());
        assert_eq!(found, vec![0, 1]);
    }
    #[test]
    fn sorted_on_build() {
        struct Note {
            time: f64,
            voice: i64,
        }
        impl Timed for Note {
            fn time(&self) -> f64 {
                self.time
            }
            fn duration(&self) -> f64 {
                1.0
            }
            fn secondary_key(&self) -> i64 {
                self.voice
            }
        }
        let index = WindowedIndex::build([
            Note { time: 5.0, voice: 2 },
            Note { time: 1.0, voice: 0 },
            Note { time: 5.0, voice: 1 },
        ]);
        let order: Vec<(f64, i64)> = index.events().iter().map(|n| (n.time, n.voice)).collect();
        assert_eq!(order, vec![(1.0, 0), (5.0, 1), (5.0, 2)]);
        assert!(index.starts().windows(2).all(|w| w[0] <= w[1]));
        assert!(index.ends().windows(2).all(|w| w[0] <= w[1]));
    }
    #[test]
    fn ends_sorted_independently() {
        // A long event first, then short ones: end times are out of start order.
        let index = WindowedIndex::build([(0.0, 1000.0), (10.0, 1.0), (20.0, 1.0)]);
        assert_eq!(index.ends(), &[11.0, 21.0, 1000.0]);
        // Window around the long event's end finds it by its end.
        let found = index.query(990.0, 1010.0, 10.0, 0.0, &FuzzyCmp::default());
        assert_eq!(found, vec![0]);
    }
    #[test]
    fn negative_durations_end_at_start() {
        // Without clamping this one would "end" at 0, far behind the look-back point.
        let index = WindowedIndex::build([(150.0, -150.0), (120.0, -5.0)]);
        assert_eq!(index.ends(), &[120.0, 150.0]);
        let found = index.query(100.0, 200.0, 10.0, 0.0, &FuzzyCmp::default());
        assert_eq!(found, vec![0, 1]);
        // Starts inside the look-back but is excluded, as its end is still its start.
        let index = WindowedIndex::build([(85.0, -80.0)]);
        assert_eq!(index.ends(), &[85.0]);
        assert!(index
            .query(100.0, 200.0, 10.0, 0.0, &FuzzyCmp::default())
            .is_empty());
        let index = WindowedIndex::build([(95.0, -80.0)]);
        assert_eq!(index.query(100.0, 200.0, 10.0, 0.0, &FuzzyCmp::default()), vec![0]);
    }
    #[test]
    fn fuzzy_boundaries() {
        let cmp = FuzzyCmp::new(1e-6);
        assert!(cmp.eq(1.0, 1.0 + 1e-7));
        assert!(!cmp.lt(1.0, 1.0 + 1e-7));
        assert!(cmp.le(1.0 + 1e-7, 1.0));
        assert!(cmp.gt(2.0, 1.0) && cmp.ge(1.0, 1.0 + 1e-7));
        // Starting a hair past the window's end still counts as on the boundary.
        let index = WindowedIndex::build([(200.000_000_1, 5.0)]);
        assert_eq!(index.query(100.0, 200.0, 0.0, 0.0, &cmp), vec![0]);
        // With an exact comparator it is outside.
        assert!(index
            .query(100.0, 200.0, 0.0, 0.0, &FuzzyCmp::new(0.0))
            .is_empty());
    }
    #[test]
    fn empty_and_reversed() {
        let index = WindowedIndex::<(f64, f64)>::build([]);
        assert!(index.query(0.0, 10.0, 5.0, 1.0, &FuzzyCmp::default()).is_empty());
        let index = WindowedIndex::build([(5.0, 1.0)]);
        assert_eq!(index.query(10.0, 0.0, 0.0, 0.0, &FuzzyCmp::default()), vec![0]);
    }
    #[test]
    fn soundness() {
        // Small deterministic LCG, enough to scatter events around.
        let mut state = 0x2545_f491_4f6c_dd1du64;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            #[allow(clippy::cast_precision_loss)]
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            unit
        };
        let events: Vec<(f64, f64)> = (0..400)
            .map(|_| ((next() * 1000.0).floor(), (next() * 140.0).floor() - 20.0))
            .collect();
        let index = WindowedIndex::build(events);
        let cmp = FuzzyCmp::default();
        let (viewport_len, slack) = (80.0, 7.0);

        for _ in 0..200 {
            let a = (next() * 1100.0).floor() - 50.0;
            let b = a + (next() * 150.0).floor();
            let found = index.query(a, b, viewport_len, slack, &cmp);
            assert!(found.windows(2).all(|w| w[0] < w[1]), "sorted and unique");
            for (i, &(time, duration)) in index.events().iter().enumerate() {
                let end = time + duration.max(0.0);
                let starts_inside = time >= a && time <= b;
                let ends_inside = end >= a && end <= b;
                if starts_inside || ends_inside {
                    assert!(found.contains(&i), "missed {time}+{duration} in [{a}, {b}]");
                }
                if end < a - viewport_len - slack {
                    assert!(!found.contains(&i), "kept stale {time}+{duration} for [{a}, {b}]");
                }
            }
        }
    }
}
