//! Bounded capture log.
//!
//! A fixed-capacity, append-only store of [`Observation`]s. Once full it
//! saturates: further appends are dropped rather than overwriting older
//! records. Storage is a plain array so the whole log can sit in a `static`.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::record::Observation;

/// Saturating append-only record store with capacity `N`.
///
/// Not synchronized. Use [`SharedLog`] when the sniffer callback and the
/// duty-cycle task both need access.
pub struct CaptureLog<const N: usize> {
    records: [Observation; N],
    count: usize,
}

impl<const N: usize> CaptureLog<N> {
    pub const fn new() -> Self {
        Self {
            records: [Observation::EMPTY; N],
            count: 0,
        }
    }

    /// Append a record. Returns `false` (record dropped) when the log is full.
    pub fn append(&mut self, record: Observation) -> bool {
        if self.count >= N {
            return false;
        }
        self.records[self.count] = record;
        self.count += 1;
        true
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= N
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn get(&self, index: usize) -> Option<&Observation> {
        self.as_slice().get(index)
    }

    /// Stored records in capture order.
    pub fn as_slice(&self) -> &[Observation] {
        &self.records[..self.count]
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Observation> {
        self.as_slice().iter()
    }

    /// Reset the cursor and zero every occupied slot.
    pub fn clear(&mut self) {
        self.records[..self.count].fill(Observation::EMPTY);
        self.count = 0;
    }
}

impl<const N: usize> Default for CaptureLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`CaptureLog`] shareable between the sniffer callback and the
/// duty-cycle task.
///
/// Every accessor holds the critical section for a single cursor update or
/// record copy, never for a whole-log walk.
pub struct SharedLog<const N: usize> {
    inner: Mutex<RefCell<CaptureLog<N>>>,
}

impl<const N: usize> SharedLog<N> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(CaptureLog::new())),
        }
    }

    pub fn append(&self, record: Observation) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).append(record))
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).is_full())
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Copy out the record at `index`.
    pub fn get(&self, index: usize) -> Option<Observation> {
        critical_section::with(|cs| self.inner.borrow_ref(cs).get(index).copied())
    }

    /// Iterate over a copy of each record present when iteration started.
    ///
    /// Only meaningful once the producer is stopped; records appended during
    /// iteration are not visited.
    pub fn snapshot(&self) -> Snapshot<'_, N> {
        Snapshot {
            log: self,
            next: 0,
            end: self.len(),
        }
    }

    pub fn clear(&self) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).clear());
    }
}

impl<const N: usize> Default for SharedLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`SharedLog::snapshot`].
pub struct Snapshot<'a, const N: usize> {
    log: &'a SharedLog<N>,
    next: usize,
    end: usize,
}

impl<const N: usize> Iterator for Snapshot<'_, N> {
    type Item = Observation;

    fn next(&mut self) -> Option<Observation> {
        if self.next >= self.end {
            return None;
        }
        let record = self.log.get(self.next);
        self.next += 1;
        record
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (0, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(n: u8) -> Observation {
        Observation {
            timestamp: n as u32 * 10,
            sender: [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, n],
            rssi: -(n as i8),
            channel: 1 + n % 13,
            frame_control: 0x0080,
        }
    }

    #[test]
    fn new_log_is_empty() {
        let log = CaptureLog::<4>::new();
        assert_eq!(log.len(), 0);
        assert!(log.is_empty());
        assert!(!log.is_full());
        assert_eq!(log.capacity(), 4);
        assert!(log.get(0).is_none());
    }

    #[test]
    fn append_preserves_capture_order() {
        let mut log = CaptureLog::<4>::new();
        assert!(log.append(obs(1)));
        assert!(log.append(obs(2)));
        assert!(log.append(obs(3)));
        assert_eq!(log.len(), 3);
        let senders: heapless::Vec<u8, 4> = log.iter().map(|o| o.sender[5]).collect();
        assert_eq!(senders.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn append_saturates_at_capacity() {
        let mut log = CaptureLog::<3>::new();
        for n in 0..3 {
            assert!(log.append(obs(n)));
        }
        assert!(log.is_full());
        assert!(!log.append(obs(99)), "N+1th append must be dropped");
        assert_eq!(log.len(), 3);
        for n in 0..3u8 {
            assert_eq!(log.get(n as usize), Some(&obs(n)));
        }
    }

    #[test]
    fn len_never_exceeds_capacity() {
        let mut log = CaptureLog::<5>::new();
        for n in 0..50u8 {
            log.append(obs(n));
            assert!(log.len() <= 5);
        }
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn clear_resets_cursor_and_next_append_lands_at_zero() {
        let mut log = CaptureLog::<4>::new();
        log.append(obs(1));
        log.append(obs(2));
        log.clear();
        assert_eq!(log.len(), 0);
        assert!(log.get(0).is_none());

        assert!(log.append(obs(7)));
        assert_eq!(log.get(0), Some(&obs(7)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn clear_wipes_backing_storage() {
        let mut log = CaptureLog::<2>::new();
        log.append(obs(1));
        log.append(obs(2));
        log.clear();
        assert!(log.records.iter().all(|r| *r == Observation::EMPTY));
    }

    #[test]
    fn clear_after_saturation_accepts_again() {
        let mut log = CaptureLog::<1>::new();
        assert!(log.append(obs(1)));
        assert!(!log.append(obs(2)));
        log.clear();
        assert!(log.append(obs(3)));
        assert_eq!(log.as_slice(), &[obs(3)]);
    }

    // ── SharedLog ───────────────────────────────────────────────────

    #[test]
    fn shared_log_mirrors_capture_log() {
        let log = SharedLog::<2>::new();
        assert!(log.is_empty());
        assert!(log.append(obs(1)));
        assert!(log.append(obs(2)));
        assert!(!log.append(obs(3)));
        assert!(log.is_full());
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(1), Some(obs(2)));
        assert_eq!(log.get(2), None);
    }

    #[test]
    fn snapshot_yields_records_in_order() {
        let log = SharedLog::<8>::new();
        for n in 1..=3 {
            log.append(obs(n));
        }
        let got: heapless::Vec<Observation, 8> = log.snapshot().collect();
        assert_eq!(got.as_slice(), &[obs(1), obs(2), obs(3)]);
    }

    #[test]
    fn snapshot_ignores_later_appends() {
        let log = SharedLog::<8>::new();
        log.append(obs(1));
        let mut snap = log.snapshot();
        log.append(obs(2));
        assert_eq!(snap.next(), Some(obs(1)));
        assert_eq!(snap.next(), None);
    }

    #[test]
    fn shared_clear_empties_log() {
        let log = SharedLog::<2>::new();
        log.append(obs(1));
        log.clear();
        assert_eq!(log.len(), 0);
        assert_eq!(log.get(0), None);
    }
}
