use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Decides which element a heap hands out first.
///
/// `BinaryHeap` is always max-first, so an ordering maps every value to the
/// key the heap actually stores and back again.
pub trait HeapOrder<T> {
    type Key: Ord;

    fn wrap(value: T) -> Self::Key;
    fn unwrap(key: Self::Key) -> T;
    fn top(key: &Self::Key) -> &T;
}

/// Largest element first.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxFirst;

/// Smallest element first.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinFirst;

impl<T: Ord> HeapOrder<T> for MaxFirst {
    type Key = T;

    fn wrap(value: T) -> T {
        value
    }

    fn unwrap(key: T) -> T {
        key
    }

    fn top(key: &T) -> &T {
        key
    }
}

impl<T: Ord> HeapOrder<T> for MinFirst {
    type Key = Reverse<T>;

    fn wrap(value: T) -> Reverse<T> {
        Reverse(value)
    }

    fn unwrap(key: Reverse<T>) -> T {
        key.0
    }

    fn top(key: &Reverse<T>) -> &T {
        &key.0
    }
}

/// Array-backed binary heap whose extreme is chosen by `O`.
pub struct OrderedHeap<T, O: HeapOrder<T>> {
    inner: BinaryHeap<O::Key>,
    _order: PhantomData<O>,
}

pub type MaxHeap<T> = OrderedHeap<T, MaxFirst>;
pub type MinHeap<T> = OrderedHeap<T, MinFirst>;

impl<T, O: HeapOrder<T>> OrderedHeap<T, O> {
    pub fn new() -> Self {
        Self {
            inner: BinaryHeap::new(),
            _order: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: BinaryHeap::with_capacity(capacity),
            _order: PhantomData,
        }
    }

    /// O(log n)
    pub fn push(&mut self, value: T) {
        self.inner.push(O::wrap(value));
    }

    /// Removes and returns the extreme element, O(log n).
    pub fn pop(&mut self) -> Option<T> {
        self.inner.pop().map(O::unwrap)
    }

    /// O(1)
    pub fn peek(&self) -> Option<&T> {
        self.inner.peek().map(O::top)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T, O: HeapOrder<T>> Default for OrderedHeap<T, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, O> Clone for OrderedHeap<T, O>
where
    O: HeapOrder<T>,
    O::Key: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _order: PhantomData,
        }
    }
}

impl<T: Debug, O: HeapOrder<T>> Debug for OrderedHeap<T, O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedHeap")
            .field("len", &self.len())
            .field("top", &self.peek())
            .finish()
    }
}

impl<T, O: HeapOrder<T>> Extend<T> for OrderedHeap<T, O> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.inner.extend(iter.into_iter().map(O::wrap));
    }
}

impl<T, O: HeapOrder<T>> FromIterator<T> for OrderedHeap<T, O> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(O::wrap).collect(),
            _order: PhantomData,
        }
    }
}
