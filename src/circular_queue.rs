use std::fmt;

/// Fixed-capacity ring: the write pointer wraps and overwrites the oldest entry.
pub struct CircularQueue<T> {
    items: Vec<T>,
    pointer: usize,
    capacity: usize,
}

impl<T: Clone> Clone for CircularQueue<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            pointer: self.pointer,
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> CircularQueue<T> {
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        let capacity = cap.max(1);

        Self {
            items: Vec::with_capacity(capacity),
            pointer: 0,
            capacity,
        }
    }

    /// Store `item`, handing back the entry it overwrote once the ring is full
    pub fn push(&mut self, item: T) -> Option<T> {
        let poped = if self.is_full() {
            Some(std::mem::replace(&mut self.items[self.pointer], item))
        } else {
            self.items.push(item);
            None
        };

        self.pointer = (self.pointer + 1) % self.capacity;

        poped
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot the next push writes to
    #[inline]
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
        self.pointer = 0;
    }

    /// Most recent entry
    #[inline]
    pub fn top(&self) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }

        let idx = (self.pointer + self.capacity - 1) % self.capacity;
        self.items.get(idx)
    }

    /// Oldest to newest
    #[inline]
    pub fn asc_iter(&self) -> impl Iterator<Item = &'_ T> {
        let split = if self.is_full() { self.pointer } else { 0 };
        let (head, tail) = self.items.split_at(split);

        tail.iter().chain(head.iter())
    }

    /// Newest to oldest
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'_ T> {
        let split = if self.is_full() { self.pointer } else { 0 };
        let (head, tail) = self.items.split_at(split);

        head.iter().rev().chain(tail.iter().rev())
    }

    /// Raw slots in storage order, as an index-based consumer sees them
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_then_overwrites_oldest() {
        let mut q = CircularQueue::with_capacity(3);

        assert_eq!(q.push(1), None);
        assert_eq!(q.push(2), None);
        assert_eq!(q.push(3), None);
        assert!(q.is_full());
        assert_eq!(q.push(4), Some(1));
        assert_eq!(q.push(5), Some(2));

        assert_eq!(q.len(), 3);
        assert_eq!(q.asc_iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![5, 4, 3]);
        assert_eq!(q.top(), Some(&5));
        assert_eq!(q.as_slice(), &[4, 5, 3]);
        assert_eq!(q.pointer(), 2);
    }

    #[test]
    fn partial_fill_order() {
        let mut q = CircularQueue::with_capacity(4);
        q.push('a');
        q.push('b');

        assert_eq!(q.asc_iter().copied().collect::<String>(), "ab");
        assert_eq!(q.iter().copied().collect::<String>(), "ba");
        assert_eq!(q.top(), Some(&'b'));
    }

    #[test]
    fn clear_resets_pointer() {
        let mut q = CircularQueue::with_capacity(2);
        q.push(1);
        q.push(2);
        q.push(3);
        q.clear();

        assert!(q.is_empty());
        assert_eq!(q.pointer(), 0);
        assert_eq!(q.top(), None);
    }
}
