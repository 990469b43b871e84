//! Resource load tracking with sorted bookings.
//!
//! Bookings never delay a task; they only reveal when a resource ends up with
//! more concurrent tasks than its capacity allows.

use chrono::{DateTime, FixedOffset};

/// A task occupying a resource over `[start, end)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Booking {
    pub task_id: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Tracks bookings for one resource.
///
/// Invariant: `bookings` is sorted by start.
#[derive(Clone, Debug)]
pub struct ResourceLoad {
    pub resource_id: String,
    pub capacity: u32,
    bookings: Vec<Booking>,
}

/// Result of booking a task onto a resource past its capacity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overallocation {
    /// Peak number of concurrent tasks, the new one included.
    pub concurrent: u32,
    /// Tasks overlapping the new booking.
    pub overlapping: Vec<String>,
}

impl ResourceLoad {
    pub fn new(resource_id: impl Into<String>, capacity: u32) -> Self {
        Self {
            resource_id: resource_id.into(),
            capacity,
            bookings: Vec::new(),
        }
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Peak concurrency within `[start, end)` if a task were added there.
    fn peak_with(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> (u32, Vec<&Booking>) {
        let overlapping: Vec<&Booking> = self
            .bookings
            .iter()
            .take_while(|b| b.start < end)
            .filter(|b| b.end > start)
            .collect();

        // Concurrency only rises at a start point, so checking those suffices
        let points = std::iter::once(start).chain(
            overlapping
                .iter()
                .map(|b| b.start)
                .filter(|&s| s > start),
        );
        let peak = points
            .map(|p| overlapping.iter().filter(|b| b.start <= p && p < b.end).count())
            .max()
            .unwrap_or(0);

        (peak as u32 + 1, overlapping)
    }

    /// Book `task_id` over `[start, end)`.
    ///
    /// Always records the booking; returns the overallocation if capacity was exceeded.
    pub fn book(
        &mut self,
        task_id: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Option<Overallocation> {
        let overallocation = {
            let (concurrent, overlapping) = self.peak_with(start, end);
            (concurrent > self.capacity).then(|| Overallocation {
                concurrent,
                overlapping: overlapping.iter().map(|b| b.task_id.clone()).collect(),
            })
        };

        let idx = self.bookings.partition_point(|b| b.start <= start);
        self.bookings.insert(
            idx,
            Booking {
                task_id: task_id.to_string(),
                start,
                end,
            },
        );

        overallocation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2025-01-{:02}T{:02}:00:00+00:00", day, hour)).unwrap()
    }

    #[test]
    fn test_sequential_bookings_fit() {
        let mut load = ResourceLoad::new("dev1", 1);
        assert_eq!(load.book("a", at(6, 0), at(8, 0)), None);
        // Touching intervals do not overlap
        assert_eq!(load.book("b", at(8, 0), at(9, 0)), None);
        assert_eq!(load.bookings().len(), 2);
    }

    #[test]
    fn test_overlap_exceeds_capacity() {
        let mut load = ResourceLoad::new("dev1", 1);
        load.book("a", at(6, 0), at(8, 0));
        let over = load.book("b", at(7, 0), at(9, 0)).unwrap();
        assert_eq!(over.concurrent, 2);
        assert_eq!(over.overlapping, vec!["a".to_string()]);
    }

    #[test]
    fn test_capacity_two_allows_pair() {
        let mut load = ResourceLoad::new("team", 2);
        assert_eq!(load.book("a", at(6, 0), at(10, 0)), None);
        assert_eq!(load.book("b", at(6, 0), at(10, 0)), None);
        let over = load.book("c", at(9, 0), at(11, 0)).unwrap();
        assert_eq!(over.concurrent, 3);
    }

    #[test]
    fn test_non_concurrent_overlaps_counted_by_peak() {
        let mut load = ResourceLoad::new("team", 2);
        load.book("a", at(6, 0), at(7, 0));
        load.book("b", at(8, 0), at(9, 0));
        // Overlaps both a and b, but never both at once
        assert_eq!(load.book("c", at(6, 0), at(9, 0)), None);
        assert_eq!(load.bookings()[0].task_id, "a");
    }
}
