use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::heap::{MaxHeap, MinHeap};

/// Numeric value the running median can be taken over.
pub trait Sample: Ord + Copy + Debug + Send + Sync + 'static {
    fn to_f64(self) -> f64;
}

macro_rules! impl_sample {
    ($($ty:ty),*) => {
        $(
            impl Sample for $ty {
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_sample!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Anything that can absorb samples one at a time and report the median so far.
pub trait RunningMedian {
    type Value: Sample;

    fn insert(&mut self, x: Self::Value);
    /// `NaN` while nothing has been inserted.
    fn median(&self) -> f64;
    fn count(&self) -> u64;
}

/// Dual-heap running median.
///
/// `lower` is a max-heap holding the smaller half of the samples and `upper` a
/// min-heap holding the larger half. After every insertion the two sizes differ
/// by at most one and `max(lower) <= min(upper)`, so the median is always
/// sitting on top of one or both heaps.
#[derive(Debug, Clone)]
pub struct MedianFinder<T: Sample = i64> {
    lower: MaxHeap<T>,
    upper: MinHeap<T>,
    count: u64,
}

impl<T: Sample> Default for MedianFinder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sample> MedianFinder<T> {
    pub fn new() -> Self {
        Self {
            lower: MaxHeap::new(),
            upper: MinHeap::new(),
            count: 0,
        }
    }

    /// O(log n). The first sample and every sample equal to the current
    /// lower maximum go to `lower`.
    pub fn insert(&mut self, x: T) {
        self.count += 1;

        match self.lower.peek() {
            Some(&lower_max) if x > lower_max => self.upper.push(x),
            _ => self.lower.push(x),
        }
        self.rebalance();
    }

    /// A single insertion unbalances the heaps by at most one, so each loop
    /// moves at most one element.
    fn rebalance(&mut self) {
        while self.lower.len() > self.upper.len() + 1 {
            let Some(moved) = self.lower.pop() else { break };
            self.upper.push(moved);
        }

        while self.upper.len() > self.lower.len() + 1 {
            let Some(moved) = self.upper.pop() else { break };
            self.lower.push(moved);
        }
    }

    /// O(1). Returns `NaN` for an empty stream; check it with `is_nan`.
    pub fn median(&self) -> f64 {
        match self.lower.len().cmp(&self.upper.len()) {
            Ordering::Greater => self.lower.peek().map_or(f64::NAN, |v| v.to_f64()),
            Ordering::Less => self.upper.peek().map_or(f64::NAN, |v| v.to_f64()),
            Ordering::Equal => match (self.lower.peek(), self.upper.peek()) {
                (Some(&lower_max), Some(&upper_min)) => {
                    (lower_max.to_f64() + upper_min.to_f64()) / 2.0
                }
                _ => f64::NAN,
            },
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl<T: Sample> RunningMedian for MedianFinder<T> {
    type Value = T;

    fn insert(&mut self, x: T) {
        MedianFinder::insert(self, x)
    }

    fn median(&self) -> f64 {
        MedianFinder::median(self)
    }

    fn count(&self) -> u64 {
        MedianFinder::count(self)
    }
}

impl<R: RunningMedian + ?Sized> RunningMedian for &mut R {
    type Value = R::Value;

    fn insert(&mut self, x: Self::Value) {
        (**self).insert(x)
    }

    fn median(&self) -> f64 {
        (**self).median()
    }

    fn count(&self) -> u64 {
        (**self).count()
    }
}

impl<T: Sample> Extend<T> for MedianFinder<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for x in iter {
            self.insert(x);
        }
    }
}

impl<T: Sample> FromIterator<T> for MedianFinder<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut finder = Self::new();
        finder.extend(iter);
        finder
    }
}

/// Cloneable handle to one `MedianFinder` behind a read/write lock.
///
/// Writers are serialized, and readers never observe a half-finished
/// insertion. Every clone refers to the same engine.
#[derive(Debug, Clone)]
pub struct SharedMedianFinder<T: Sample = i64> {
    inner: Arc<RwLock<MedianFinder<T>>>,
}

impl<T: Sample> Default for SharedMedianFinder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sample> From<MedianFinder<T>> for SharedMedianFinder<T> {
    fn from(finder: MedianFinder<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(finder)),
        }
    }
}

impl<T: Sample> SharedMedianFinder<T> {
    pub fn new() -> Self {
        MedianFinder::new().into()
    }

    // A panic while holding the lock cannot leave the heaps half-updated in a
    // way later reads would misreport, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, MedianFinder<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MedianFinder<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, x: T) {
        self.write().insert(x);
    }

    pub fn median(&self) -> f64 {
        self.read().median()
    }

    pub fn count(&self) -> u64 {
        self.read().count()
    }

    /// Copy of the engine as it is right now.
    pub fn snapshot(&self) -> MedianFinder<T> {
        self.read().clone()
    }
}

impl<T: Sample> RunningMedian for SharedMedianFinder<T> {
    type Value = T;

    fn insert(&mut self, x: T) {
        self.write().insert(x);
    }

    fn median(&self) -> f64 {
        self.read().median()
    }

    fn count(&self) -> u64 {
        self.read().count()
    }
}

#[cfg(test)]
mod tests {
    use super::{MedianFinder, RunningMedian, SharedMedianFinder};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::thread;

    const EPS: f64 = 1e-9;

    fn assert_close(got: f64, want: f64) {
        assert!(
            (got - want).abs() <= EPS,
            "floats not equal: got={} want={}",
            got,
            want
        );
    }

    fn median_oracle(xs: &[i64]) -> f64 {
        let mut sorted = xs.to_vec();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            sorted[mid] as f64
        } else {
            (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
        }
    }

    fn assert_balanced(finder: &MedianFinder<i64>) {
        let lower = finder.lower.len();
        let upper = finder.upper.len();
        assert!(lower.abs_diff(upper) <= 1, "sizes {} / {}", lower, upper);
        assert_eq!((lower + upper) as u64, finder.count());
        if let (Some(lower_max), Some(upper_min)) = (finder.lower.peek(), finder.upper.peek()) {
            assert!(lower_max <= upper_min, "{} > {}", lower_max, upper_min);
        }
    }

    #[test]
    fn test_empty_median_is_nan() {
        let finder = MedianFinder::<i64>::new();
        assert_eq!(finder.count(), 0);
        assert!(finder.is_empty());
        assert!(finder.median().is_nan());
        // Repeated reads do not change anything.
        assert!(finder.median().is_nan());
    }

    #[test]
    fn test_single_element() {
        let mut finder = MedianFinder::new();
        finder.insert(42);
        assert_eq!(finder.count(), 1);
        assert_close(finder.median(), 42.0);
    }

    #[test]
    fn test_odd_number_of_elements() {
        let finder: MedianFinder = [5, 1, 9, -2, 7].into_iter().collect();
        assert_eq!(finder.count(), 5);
        // Sorted: -2, 1, 5, 7, 9
        assert_close(finder.median(), 5.0);
    }

    #[test]
    fn test_even_number_of_elements() {
        let finder: MedianFinder = [5, 1, 9, -2].into_iter().collect();
        assert_eq!(finder.count(), 4);
        // Sorted: -2, 1, 5, 9
        assert_close(finder.median(), 3.0);
    }

    #[test]
    fn test_incremental_medians_mixed_sequence() {
        let mut finder = MedianFinder::new();
        let want = [5.0, 3.5, 5.0, 3.5, 5.0, 5.5];
        for (i, x) in [5, 2, 10, -1, 6, 6].into_iter().enumerate() {
            finder.insert(x);
            assert_close(finder.median(), want[i]);
            assert_eq!(finder.count(), i as u64 + 1);
        }
    }

    #[test]
    fn test_negatives_and_duplicates() {
        let finder: MedianFinder = [-5, -5, -1, -10, -1, -5].into_iter().collect();
        assert_eq!(finder.count(), 6);
        assert_close(finder.median(), -5.0);
    }

    #[test]
    fn test_monotonic_increasing() {
        let mut finder = MedianFinder::new();
        let want = [1.0, 1.5, 2.0, 2.5, 3.0, 3.5];
        for (i, x) in (1..=6).enumerate() {
            finder.insert(x);
            assert_close(finder.median(), want[i]);
            assert_balanced(&finder);
        }
    }

    #[test]
    fn test_monotonic_decreasing() {
        let mut finder = MedianFinder::new();
        let want = [6.0, 5.5, 5.0, 4.5, 4.0, 3.5];
        for (i, x) in (1..=6).rev().enumerate() {
            finder.insert(x);
            assert_close(finder.median(), want[i]);
            assert_balanced(&finder);
        }
    }

    #[test]
    fn test_all_same_value() {
        let mut finder = MedianFinder::new();
        for i in 0..1000u64 {
            finder.insert(7);
            assert_close(finder.median(), 7.0);
            assert_eq!(finder.count(), i + 1);
        }
    }

    #[test]
    fn test_alternating_extremes() {
        let mut finder = MedianFinder::new();
        let mut seen = Vec::new();
        for i in 0..501 {
            let x = if i % 2 == 0 { -1_000_000 } else { 1_000_000 };
            seen.push(x);
            finder.insert(x);
            assert_close(finder.median(), median_oracle(&seen));
        }
    }

    #[test]
    fn test_upper_side_can_hold_the_median() {
        let mut finder = MedianFinder::new();
        finder.extend([1, 5, 10]);
        assert_eq!(finder.lower.len(), 1);
        assert_eq!(finder.upper.len(), 2);
        assert_close(finder.median(), 5.0);
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let finder: MedianFinder<u128> = [u128::MAX, u128::MAX].into_iter().collect();
        assert!(finder.median().is_finite());

        let finder: MedianFinder<i64> = [i64::MAX, i64::MAX - 1].into_iter().collect();
        assert!(finder.median() > 9.0e18);
    }

    #[test]
    fn test_random_sequences_match_oracle() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..100 {
            let mut finder = MedianFinder::new();
            let mut seen = Vec::new();
            let len = rng.gen_range(1..=200);
            for _ in 0..len {
                let x = rng.gen_range(-1000..=1000);
                seen.push(x);
                finder.insert(x);
                assert_eq!(finder.count(), seen.len() as u64);
                assert_close(finder.median(), median_oracle(&seen));
                assert_balanced(&finder);
            }
        }
    }

    #[test]
    fn test_trait_object_through_mut_reference() {
        fn feed<R: RunningMedian<Value = i64>>(mut engine: R, values: &[i64]) -> f64 {
            for &x in values {
                engine.insert(x);
            }
            engine.median()
        }

        let mut finder = MedianFinder::new();
        assert_close(feed(&mut finder, &[10, 20, 30, 40]), 25.0);
        assert_eq!(finder.count(), 4);
    }

    #[test]
    fn test_shared_concurrent_inserts_count_matches() {
        let shared = SharedMedianFinder::<i64>::new();
        let workers = thread::available_parallelism().map_or(4, |n| n.get()) * 4;
        let per_worker = 2000;

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let base = (worker * per_worker) as i64;
                    for i in 0..per_worker as i64 {
                        shared.insert(base + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.count(), (workers * per_worker) as u64);
        let median = shared.median();
        assert!(median.is_finite(), "invalid median {}", median);
        let total = (workers * per_worker) as f64;
        assert_close(median, (total - 1.0) / 2.0);
    }

    #[test]
    fn test_shared_concurrent_insert_and_read() {
        let shared = SharedMedianFinder::<i64>::new();
        let adders = 4;
        let per_adder = 3000;

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let mut last_count = 0;
                    while last_count < (adders * per_adder) as u64 {
                        let count = shared.count();
                        assert!(count >= last_count, "count went backwards");
                        if count > 0 {
                            assert!(!shared.median().is_nan());
                        }
                        last_count = count;
                        thread::yield_now();
                    }
                })
            })
            .collect();

        let writers: Vec<_> = (0..adders)
            .map(|worker| {
                let mut shared = shared.clone();
                thread::spawn(move || {
                    let base = (worker * per_adder) as i64;
                    for i in 0..per_adder as i64 {
                        RunningMedian::insert(&mut shared, base - i);
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        assert_eq!(shared.count(), (adders * per_adder) as u64);
        assert!(shared.median().is_finite());
        assert_eq!(shared.snapshot().count(), shared.count());
    }

    proptest! {
        #[test]
        fn prop_heaps_stay_balanced(values in prop::collection::vec(any::<i64>(), 0..300)) {
            let mut finder = MedianFinder::new();
            for (i, x) in values.into_iter().enumerate() {
                finder.insert(x);
                prop_assert_eq!(finder.count(), i as u64 + 1);
                let lower = finder.lower.len();
                let upper = finder.upper.len();
                prop_assert!(lower.abs_diff(upper) <= 1);
                prop_assert_eq!((lower + upper) as u64, finder.count());
                if let (Some(l), Some(u)) = (finder.lower.peek(), finder.upper.peek()) {
                    prop_assert!(l <= u);
                }
            }
        }

        #[test]
        fn prop_matches_sort_oracle(values in prop::collection::vec(-10_000i64..10_000, 1..200)) {
            let mut finder = MedianFinder::new();
            for k in 1..=values.len() {
                finder.insert(values[k - 1]);
                let want = median_oracle(&values[..k]);
                prop_assert!((finder.median() - want).abs() <= EPS);
            }
        }
    }
}
