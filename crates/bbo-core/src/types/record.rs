//! Fixed-size binary record: the unit of persistence in the capture log.
//!
//! Every record occupies exactly one 64-byte slot so that no record straddles
//! a cache line. The byte layout is fixed and shared by the writer and every
//! reader of the same file:
//!
//! ```text
//! ┌────────┬────────────┬────────────┬──────┬──────────────┐
//! │ 0..8   │ 8..16      │ 16..24     │ 24   │ 25..64       │
//! │ price  │ quantity   │ event_time │ side │ zero padding │
//! │ f64 LE │ f64 LE     │ i64 LE     │ u8   │              │
//! └────────┴────────────┴────────────┴──────┴──────────────┘
//! ```
//!
//! `event_time == 0` is the sentinel for a slot that was never written. There
//! is no version field: changing this layout invalidates existing files.

use std::sync::atomic::{Ordering, fence};

use super::enums::Side;

/// Size of one slot in bytes (one cache line).
pub const RECORD_SIZE: usize = 64;

const PRICE: std::ops::Range<usize> = 0..8;
const QUANTITY: std::ops::Range<usize> = 8..16;
const EVENT_TIME: std::ops::Range<usize> = 16..24;
const SIDE: usize = 24;

/// Reserved `event_time` meaning "slot never written".
pub const EMPTY_EVENT_TIME: i64 = 0;

/// A persisted best bid/offer update.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C, align(64))]
pub struct Record {
    pub price: f64,
    pub quantity: f64,
    /// Milliseconds since Unix epoch. Never `0` for a written record.
    pub event_time: i64,
    pub side: Side,
}

const _: () = assert!(std::mem::size_of::<Record>() == RECORD_SIZE);
const _: () = assert!(std::mem::align_of::<Record>() == RECORD_SIZE);

/// Classification of one raw slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    /// Zero timestamp: never written (or not yet visible).
    Empty,
    Filled(Record),
    /// Non-zero timestamp but an unknown side tag. Only foreign or torn files
    /// produce this.
    Malformed { event_time: i64, tag: u8 },
}

impl Record {
    /// Build a record from its fields. Callers guarantee finite, non-negative
    /// price and quantity and a non-zero event time.
    #[inline]
    pub fn encode(price: f64, quantity: f64, event_time: i64, side: Side) -> Self {
        Self { price, quantity, event_time, side }
    }

    /// Serialize into the on-disk byte layout.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        self.write_to(&mut buf);
        buf
    }

    /// Write this record into a slot.
    ///
    /// The body is stored first and `event_time` last, after a release fence,
    /// so a reader on the same machine that sees a non-zero timestamp also
    /// sees the body. Nothing stronger is promised across processes.
    pub fn write_to(&self, slot: &mut [u8; RECORD_SIZE]) {
        slot[PRICE].copy_from_slice(&self.price.to_le_bytes());
        slot[QUANTITY].copy_from_slice(&self.quantity.to_le_bytes());
        slot[SIDE] = self.side.tag();
        slot[SIDE + 1..].fill(0);
        fence(Ordering::Release);
        slot[EVENT_TIME].copy_from_slice(&self.event_time.to_le_bytes());
    }
}

/// Classify a raw slot.
///
/// Returns [`Slot::Empty`] whenever the timestamp is the sentinel, whatever
/// the other bytes contain.
pub fn decode(slot: &[u8; RECORD_SIZE]) -> Slot {
    let event_time = read_i64(slot, EVENT_TIME);
    if event_time == EMPTY_EVENT_TIME {
        return Slot::Empty;
    }
    fence(Ordering::Acquire);

    let tag = slot[SIDE];
    let Some(side) = Side::from_tag(tag) else {
        return Slot::Malformed { event_time, tag };
    };

    Slot::Filled(Record {
        price: f64::from_le_bytes(read_8(slot, PRICE)),
        quantity: f64::from_le_bytes(read_8(slot, QUANTITY)),
        event_time,
        side,
    })
}

#[inline]
fn read_8(slot: &[u8; RECORD_SIZE], range: std::ops::Range<usize>) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&slot[range]);
    out
}

#[inline]
fn read_i64(slot: &[u8; RECORD_SIZE], range: std::ops::Range<usize>) -> i64 {
    i64::from_le_bytes(read_8(slot, range))
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Record({} {:.2}x{:.8} t={})", self.side, self.price, self.quantity, self.event_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode() {
        let rec = Record::encode(27000.5, 0.015, 1_700_000_000_123, Side::Bid);
        assert_eq!(decode(&rec.to_bytes()), Slot::Filled(rec));
    }

    #[test]
    fn fixed_layout_offsets() {
        let bytes = Record::encode(1.5, 2.25, 42, Side::Ask).to_bytes();
        assert_eq!(&bytes[0..8], &1.5f64.to_le_bytes());
        assert_eq!(&bytes[8..16], &2.25f64.to_le_bytes());
        assert_eq!(&bytes[16..24], &42i64.to_le_bytes());
        assert_eq!(bytes[24], b'a');
        assert!(bytes[25..].iter().all(|&b| b == 0));
    }

    #[test]
    fn display_shows_side_and_fields() {
        let rec = Record::encode(27000.5, 0.015, 1_700_000_000_123, Side::Ask);
        assert_eq!(rec.to_string(), "Record(a 27000.50x0.01500000 t=1700000000123)");
    }

    #[test]
    fn zero_slot_is_empty() {
        assert_eq!(decode(&[0u8; RECORD_SIZE]), Slot::Empty);
    }

    #[test]
    fn sentinel_wins_over_other_fields() {
        let mut bytes = Record::encode(123.0, 4.0, 1, Side::Bid).to_bytes();
        bytes[EVENT_TIME].fill(0);
        assert_eq!(decode(&bytes), Slot::Empty);

        // Garbage everywhere except the timestamp.
        let mut junk = [0xFFu8; RECORD_SIZE];
        junk[EVENT_TIME].fill(0);
        assert_eq!(decode(&junk), Slot::Empty);
    }

    #[test]
    fn unknown_side_tag_is_malformed() {
        let mut bytes = Record::encode(1.0, 1.0, 99, Side::Bid).to_bytes();
        bytes[SIDE] = b'z';
        assert_eq!(decode(&bytes), Slot::Malformed { event_time: 99, tag: b'z' });
    }

    #[test]
    fn write_to_clears_stale_padding() {
        let mut slot = [0xAAu8; RECORD_SIZE];
        Record::encode(10.0, 1.0, 5, Side::Bid).write_to(&mut slot);
        assert!(slot[SIDE + 1..].iter().all(|&b| b == 0));
        assert!(matches!(decode(&slot), Slot::Filled(r) if r.price == 10.0));
    }
}
