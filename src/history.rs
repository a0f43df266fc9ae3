use crate::circular_queue::CircularQueue;
use nalgebra as na;

/// Recent target centroids, kept for heading estimation downstream
#[derive(Debug, Clone)]
pub struct LocationHistory {
    history: CircularQueue<na::Point2<i32>>,
}

impl LocationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: CircularQueue::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, pos: na::Point2<i32>) {
        self.history.push(pos);
    }

    #[inline]
    pub fn latest(&self) -> Option<na::Point2<i32>> {
        self.history.top().copied()
    }

    /// Oldest to newest
    #[inline]
    pub fn iter_points(&self) -> impl Iterator<Item = &na::Point2<i32>> {
        self.history.asc_iter()
    }

    #[inline]
    pub fn num_points(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.history.capacity()
    }

    /// Change the capacity, keeping the newest points that still fit
    pub fn resize(&mut self, capacity: usize) {
        let mut history = CircularQueue::with_capacity(capacity);
        for &pos in self.history.asc_iter() {
            history.push(pos);
        }

        self.history = history;
    }

    #[inline]
    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_most_recent_capacity_points() {
        let mut history = LocationHistory::new(50);
        for i in 0..57 {
            history.push(na::Point2::new(i, -i));
        }

        assert_eq!(history.num_points(), 50);
        let xs: Vec<i32> = history.iter_points().map(|p| p.x).collect();
        assert_eq!(xs, (7..57).collect::<Vec<_>>());
        assert_eq!(history.latest(), Some(na::Point2::new(56, -56)));
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut history = LocationHistory::new(4);
        for i in 0..4 {
            history.push(na::Point2::new(i, i));
            assert!(history.num_points() <= history.capacity());
        }

        assert_eq!(history.num_points(), 4);
        history.push(na::Point2::new(9, 9));
        assert_eq!(history.num_points(), 4);
        assert_eq!(history.iter_points().next(), Some(&na::Point2::new(1, 1)));
    }

    #[test]
    fn resize_keeps_newest_points() {
        let mut history = LocationHistory::new(6);
        for i in 0..6 {
            history.push(na::Point2::new(i, 0));
        }

        history.resize(3);
        assert_eq!(history.capacity(), 3);
        let xs: Vec<i32> = history.iter_points().map(|p| p.x).collect();
        assert_eq!(xs, vec![3, 4, 5]);

        history.resize(5);
        history.push(na::Point2::new(6, 0));
        let xs: Vec<i32> = history.iter_points().map(|p| p.x).collect();
        assert_eq!(xs, vec![3, 4, 5, 6]);
        assert_eq!(history.latest(), Some(na::Point2::new(6, 0)));
    }
}
