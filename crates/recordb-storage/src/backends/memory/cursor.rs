//! Memory cursor: merges the snapshot with the transaction's staged writes.

use std::cmp::Ordering;
use std::iter::Peekable;

use crate::engine::{Cursor, CursorResult, RangeOptions};

use super::transaction::{KeyRange, MemoryTransaction};

type Entries<'a, V> = Peekable<Box<dyn Iterator<Item = (&'a Vec<u8>, &'a V)> + 'a>>;

fn entries<'a, V>(
    map: &'a std::collections::BTreeMap<Vec<u8>, V>,
    range: &KeyRange,
    reverse: bool,
) -> Entries<'a, V> {
    if range.is_empty() {
        let empty: Box<dyn Iterator<Item = (&'a Vec<u8>, &'a V)> + 'a> = Box::new(std::iter::empty());
        return empty.peekable();
    }
    let iter = map.range::<[u8], _>(range.bounds());
    let boxed: Box<dyn Iterator<Item = (&'a Vec<u8>, &'a V)> + 'a> =
        if reverse { Box::new(iter.rev()) } else { Box::new(iter) };
    boxed.peekable()
}

/// A lazy cursor over a [`MemoryTransaction`].
///
/// Yields committed pairs from the snapshot, overlaid with the
/// transaction's own puts and clears.
pub struct MemoryCursor<'a> {
    tx: &'a MemoryTransaction,
    committed: Entries<'a, Vec<u8>>,
    staged: Entries<'a, Option<Vec<u8>>>,
    reverse: bool,
    remaining: Option<usize>,
}

impl<'a> MemoryCursor<'a> {
    pub(crate) fn new(tx: &'a MemoryTransaction, range: KeyRange, options: RangeOptions) -> Self {
        Self {
            tx,
            committed: entries(tx.snapshot(), &range, options.reverse),
            staged: entries(tx.writes(), &range, options.reverse),
            reverse: options.reverse,
            remaining: options.limit,
        }
    }

    /// Which source holds the next key in iteration order.
    fn next_source(&mut self) -> Option<Ordering> {
        match (self.committed.peek(), self.staged.peek()) {
            (None, None) => None,
            (Some(_), None) => Some(Ordering::Less),
            (None, Some(_)) => Some(Ordering::Greater),
            (Some((c, _)), Some((s, _))) => {
                let ord = c.cmp(s);
                Some(if self.reverse { ord.reverse() } else { ord })
            }
        }
    }
}

impl Cursor for MemoryCursor<'_> {
    fn next(&mut self) -> CursorResult {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        loop {
            let pair = match self.next_source() {
                None => return Ok(None),
                Some(Ordering::Less) => match self.committed.next() {
                    Some((k, v)) if !self.tx.is_cleared(k) => Some((k.clone(), v.clone())),
                    _ => None,
                },
                Some(Ordering::Equal) => {
                    self.committed.next();
                    self.staged.next().and_then(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
                }
                Some(Ordering::Greater) => {
                    self.staged.next().and_then(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
                }
            };
            if let Some(pair) = pair {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Ok(Some(pair));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::ops::Bound;

    use crate::backends::memory::MemoryEngine;
    use crate::engine::{Cursor, RangeOptions, StorageEngine, Transaction};

    fn keys(pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<Vec<u8>> {
        pairs.into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn staged_writes_overlay_snapshot() {
        let engine = MemoryEngine::new();
        let mut tx = engine.begin_write().unwrap();
        for k in [b"a", b"c", b"e"] {
            tx.put(k, b"old").unwrap();
        }
        tx.commit().unwrap();

        let mut tx = engine.begin_write().unwrap();
        tx.put(b"b", b"new").unwrap();
        tx.put(b"c", b"new").unwrap();
        tx.clear(b"e").unwrap();

        let pairs = tx
            .range(Bound::Unbounded, Bound::Unbounded, RangeOptions::new())
            .unwrap()
            .collect_remaining()
            .unwrap();
        assert_eq!(
            pairs,
            vec![
                (b"a".to_vec(), b"old".to_vec()),
                (b"b".to_vec(), b"new".to_vec()),
                (b"c".to_vec(), b"new".to_vec()),
            ]
        );

        let reversed = tx
            .range(Bound::Unbounded, Bound::Unbounded, RangeOptions::new().reverse(true).limit(2))
            .unwrap()
            .collect_remaining()
            .unwrap();
        assert_eq!(keys(reversed), vec![b"c".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn cleared_range_hides_snapshot_until_rewritten() {
        let engine = MemoryEngine::new();
        let mut tx = engine.begin_write().unwrap();
        for k in [b"a1", b"a2", b"b1"] {
            tx.put(k, b"v").unwrap();
        }
        tx.commit().unwrap();

        let mut tx = engine.begin_write().unwrap();
        tx.clear_range(b"a", b"b").unwrap();
        tx.put(b"a2", b"again").unwrap();
        let pairs = tx
            .range(Bound::Unbounded, Bound::Unbounded, RangeOptions::new())
            .unwrap()
            .collect_remaining()
            .unwrap();
        assert_eq!(keys(pairs), vec![b"a2".to_vec(), b"b1".to_vec()]);
    }

    #[test]
    fn inverted_bounds_yield_nothing() {
        let engine = MemoryEngine::new();
        let tx = engine.begin_read().unwrap();
        let mut cursor = tx
            .range(Bound::Included(b"z".as_slice()), Bound::Excluded(b"a".as_slice()), RangeOptions::new())
            .unwrap();
        assert_eq!(cursor.next().unwrap(), None);
    }
}
