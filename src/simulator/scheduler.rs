use std::f64::INFINITY;

/// A calendar queue - a bucketed priority queue over next-event times,
/// with amortized constant-time enqueue and dequeue when the bucket width
/// tracks the average separation of scheduled times.  Buckets hold their
/// entries sorted descending, so the minimum of a bucket is always at the
/// tail.
///
/// Entries with equal times dequeue most-recently-inserted first.  This
/// tie order is load-bearing for deterministic replication and is pinned
/// by the unit tests.
///
/// Passive components are resident with a scheduled time of infinity; the
/// direct-search fallback serves them once nothing finite remains.
pub struct CalendarQueue<T: PartialEq> {
    width: f64,
    buckets: Vec<Vec<Entry<T>>>,
    last_bucket: usize,
    bucket_top: f64,
    last_priority: f64,
    size: usize,
    resize_enabled: bool,
}

#[derive(Debug)]
struct Entry<T> {
    time: f64,
    item: T,
}

impl<T: PartialEq> Default for CalendarQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> CalendarQueue<T> {
    const INITIAL_BUCKETS: usize = 2;
    const INITIAL_WIDTH: f64 = 1.0;

    pub fn new() -> Self {
        Self {
            width: Self::INITIAL_WIDTH,
            buckets: (0..Self::INITIAL_BUCKETS).map(|_| Vec::new()).collect(),
            last_bucket: 0,
            bucket_top: 1.5 * Self::INITIAL_WIDTH,
            last_priority: 0.0,
            size: 0,
            resize_enabled: true,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn bucket_index(&self, time: f64) -> usize {
        // The cast saturates for infinite times, which still maps them to
        // a stable bucket.
        ((time / self.width).floor() as usize) % self.buckets.len()
    }

    fn expand_threshold(&self) -> usize {
        2 * self.buckets.len()
    }

    fn shrink_threshold(&self) -> usize {
        (self.buckets.len() / 2).saturating_sub(2)
    }

    /// Schedules an item.  Equal times insert toward the tail, ahead of
    /// earlier arrivals.
    pub fn enqueue(&mut self, item: T, time: f64) {
        let index = self.bucket_index(time);
        let bucket = &mut self.buckets[index];
        let mut position = bucket.len();
        while position > 0 && bucket[position - 1].time < time {
            position -= 1;
        }
        bucket.insert(position, Entry { time, item });
        self.size += 1;
        if self.size > self.expand_threshold() {
            self.resize(2 * self.buckets.len());
        }
    }

    /// The scheduled (item, time) pair with the lowest time, without
    /// removing it.
    pub fn peek(&mut self) -> Option<(&T, f64)> {
        let index = self.locate()?;
        self.buckets[index].last().map(|entry| (&entry.item, entry.time))
    }

    /// Removes and returns the scheduled (item, time) pair with the
    /// lowest time.
    pub fn pop(&mut self) -> Option<(T, f64)> {
        let index = self.locate()?;
        let entry = self.buckets[index].pop()?;
        self.size -= 1;
        self.last_priority = entry.time;
        if self.size < self.shrink_threshold() {
            self.resize(self.buckets.len() / 2);
        }
        Some((entry.item, entry.time))
    }

    /// Removes the entry scheduled at `time` whose item compares equal to
    /// `item`.  Returns whether an entry was removed.
    pub fn delete(&mut self, item: &T, time: f64) -> bool {
        let index = self.bucket_index(time);
        let position = self.buckets[index]
            .iter()
            .position(|entry| &entry.item == item);
        match position {
            Some(position) => {
                self.buckets[index].remove(position);
                self.size -= 1;
                if self.size < self.shrink_threshold() {
                    self.resize(self.buckets.len() / 2);
                }
                true
            }
            None => false,
        }
    }

    /// Finds the bucket holding the minimum entry, advancing the sweep
    /// window as needed.  A full fruitless sweep falls back to a direct
    /// search over every bucket tail, which re-anchors the window.
    fn locate(&mut self) -> Option<usize> {
        if self.size == 0 {
            return None;
        }
        for _ in 0..self.buckets.len() {
            if let Some(entry) = self.buckets[self.last_bucket].last() {
                if entry.time < self.bucket_top {
                    return Some(self.last_bucket);
                }
            }
            self.last_bucket = (self.last_bucket + 1) % self.buckets.len();
            self.bucket_top += self.width;
        }
        let mut lowest = INFINITY;
        let mut found: Option<usize> = None;
        for (index, bucket) in self.buckets.iter().enumerate() {
            if let Some(entry) = bucket.last() {
                if found.is_none() || entry.time < lowest {
                    lowest = entry.time;
                    found = Some(index);
                }
            }
        }
        let index = found?;
        self.last_bucket = index;
        self.bucket_top = ((lowest / self.width).floor() + 1.5) * self.width;
        Some(index)
    }

    /// Re-buckets every entry into `bucket_count` buckets, with the width
    /// re-estimated from a sample of imminent separations.  No-op while
    /// resizing is disabled or below the minimum bucket count.
    fn resize(&mut self, bucket_count: usize) {
        if !self.resize_enabled || bucket_count < Self::INITIAL_BUCKETS {
            return;
        }
        let width = self.new_width();
        let entries: Vec<Entry<T>> = self
            .buckets
            .iter_mut()
            .flat_map(|bucket| bucket.drain(..))
            .collect();
        self.buckets = (0..bucket_count).map(|_| Vec::new()).collect();
        self.width = width;
        self.size = 0;
        let virtual_bucket = (self.last_priority / width).floor();
        self.last_bucket = (virtual_bucket as usize) % bucket_count;
        self.bucket_top = (virtual_bucket + 1.5) * width;
        self.resize_enabled = false;
        entries
            .into_iter()
            .for_each(|entry| self.enqueue(entry.item, entry.time));
        self.resize_enabled = true;
    }

    /// Estimates a bucket width from the queue contents: sample up to
    /// clamp(size, 5, 25) successive pops, take the mean separation of
    /// their times, re-take the mean over separations below twice that,
    /// and return three times the refined mean.  The samples and the
    /// sweep position are restored before returning.
    fn new_width(&mut self) -> f64 {
        if self.size < 2 {
            return Self::INITIAL_WIDTH;
        }
        let samples = self.size.clamp(5, 25).min(self.size);
        let saved_bucket = self.last_bucket;
        let saved_top = self.bucket_top;
        let saved_priority = self.last_priority;
        self.resize_enabled = false;
        let mut popped: Vec<(T, f64)> = Vec::with_capacity(samples);
        for _ in 0..samples {
            match self.pop() {
                Some(pair) => popped.push(pair),
                None => break,
            }
        }
        let times: Vec<f64> = popped.iter().map(|(_, time)| *time).collect();
        popped
            .into_iter()
            .rev()
            .for_each(|(item, time)| self.enqueue(item, time));
        self.last_bucket = saved_bucket;
        self.bucket_top = saved_top;
        self.last_priority = saved_priority;
        self.resize_enabled = true;

        let separations: Vec<f64> = times
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|separation| separation.is_finite())
            .collect();
        if separations.is_empty() {
            return self.width;
        }
        let mean = separations.iter().sum::<f64>() / separations.len() as f64;
        if mean <= 0.0 {
            return self.width;
        }
        let refined: Vec<f64> = separations
            .iter()
            .copied()
            .filter(|separation| *separation < 2.0 * mean)
            .collect();
        if refined.is_empty() {
            return 3.0 * mean;
        }
        let refined_mean = refined.iter().sum::<f64>() / refined.len() as f64;
        if refined_mean <= 0.0 {
            return self.width;
        }
        3.0 * refined_mean
    }
}
