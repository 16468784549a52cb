//! Binance `bookTicker` message decoder.
//!
//! Turns one raw WebSocket text frame into a [`NormalizedUpdate`] for a single
//! side of the book. Spot `bookTicker` frames carry no event time, so the
//! caller supplies the wall-clock timestamp; futures frames carry `E`, which
//! is preferred when present.
//!
//! ```text
//! {"u":400900217,"s":"BTCUSDT","b":"25.35190000","B":"31.21000000","a":"25.36520000","A":"40.66000000"}
//! ```

use bbo_core::error::DecodeError;
use bbo_core::{Record, Side};

use crate::json_util::{parse_str_i64, require_f64};

/// One decoded quote update, ready to be encoded as a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedUpdate {
    pub price: f64,
    pub quantity: f64,
    pub side: Side,
    /// Milliseconds since Unix epoch, always positive.
    pub event_time: i64,
}

impl NormalizedUpdate {
    #[inline]
    pub fn to_record(&self) -> Record {
        Record::encode(self.price, self.quantity, self.event_time, self.side)
    }
}

/// Stateless decoder tracking one side of the book.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickDecoder {
    side: Side,
}

impl TickDecoder {
    pub fn new(side: Side) -> Self {
        Self { side }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// `(price_key, quantity_key)` for the tracked side.
    fn keys(&self) -> (&'static str, &'static str) {
        match self.side {
            Side::Bid => ("b", "B"),
            Side::Ask => ("a", "A"),
        }
    }

    /// Decode one raw message. `now_ms` is used as the event time when the
    /// message carries no positive `E` field.
    pub fn decode(&self, raw: &str, now_ms: i64) -> Result<NormalizedUpdate, DecodeError> {
        let v: serde_json::Value = serde_json::from_str(raw).map_err(|e| DecodeError::Json(e.to_string()))?;

        // Combined-stream frames wrap the payload: {"stream": "...", "data": {...}}
        let payload = match v.get("data") {
            Some(data) if v.get("stream").is_some() => data,
            _ => &v,
        };
        if !payload.is_object() {
            return Err(DecodeError::NotAnObject);
        }

        let (price_key, qty_key) = self.keys();
        let price = checked(price_key, require_f64(payload, price_key)?)?;
        let quantity = checked(qty_key, require_f64(payload, qty_key)?)?;

        let event_time = match parse_str_i64(payload.get("E")) {
            Some(e) if e > 0 => e,
            _ => now_ms,
        };
        if event_time <= 0 {
            return Err(DecodeError::InvalidTimestamp(event_time));
        }

        Ok(NormalizedUpdate { price, quantity, side: self.side, event_time })
    }
}

/// Prices and sizes must be finite and non-negative.
#[inline]
fn checked(field: &'static str, value: f64) -> Result<f64, DecodeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(DecodeError::OutOfRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn decode_bid_fields() {
        let d = TickDecoder::new(Side::Bid);
        let up = d.decode(r#"{"b":"27000.50","B":"0.015"}"#, NOW).unwrap();
        assert_eq!(up, NormalizedUpdate { price: 27000.50, quantity: 0.015, side: Side::Bid, event_time: NOW });
    }

    #[test]
    fn non_numeric_price_is_rejected() {
        let d = TickDecoder::default();
        let err = d.decode(r#"{"b":"notanumber","B":"0.015"}"#, NOW).unwrap_err();
        assert!(matches!(err, DecodeError::NotNumeric { field: "b", .. }));
    }

    #[test]
    fn full_spot_book_ticker() {
        let json = r#"{"u":400900217,"s":"BNBUSDT","b":"25.35190000","B":"31.21000000","a":"25.36520000","A":"40.66000000"}"#;
        let bid = TickDecoder::new(Side::Bid).decode(json, NOW).unwrap();
        assert!((bid.price - 25.3519).abs() < 1e-9);
        assert!((bid.quantity - 31.21).abs() < 1e-9);

        let ask = TickDecoder::new(Side::Ask).decode(json, NOW).unwrap();
        assert_eq!(ask.side, Side::Ask);
        assert!((ask.price - 25.3652).abs() < 1e-9);
        assert!((ask.quantity - 40.66).abs() < 1e-9);
    }

    #[test]
    fn embedded_event_time_wins() {
        let json = r#"{"e":"bookTicker","u":1,"s":"BTCUSDT","b":"1","B":"2","a":"3","A":"4","E":1672515782136,"T":1672515782136}"#;
        let up = TickDecoder::default().decode(json, NOW).unwrap();
        assert_eq!(up.event_time, 1_672_515_782_136);

        let zero_e = r#"{"b":"1","B":"2","E":0}"#;
        assert_eq!(TickDecoder::default().decode(zero_e, NOW).unwrap().event_time, NOW);
    }

    #[test]
    fn combined_stream_envelope() {
        let json = r#"{"stream":"btcusdt@bookTicker","data":{"u":1,"s":"BTCUSDT","b":"10.5","B":"1","a":"11","A":"2"}}"#;
        let up = TickDecoder::default().decode(json, NOW).unwrap();
        assert_eq!(up.price, 10.5);
    }

    #[test]
    fn malformed_inputs() {
        let d = TickDecoder::default();
        assert!(matches!(d.decode("{not json", NOW), Err(DecodeError::Json(_))));
        assert_eq!(d.decode("[1,2]", NOW), Err(DecodeError::NotAnObject));
        assert_eq!(d.decode(r#"{"B":"1"}"#, NOW), Err(DecodeError::MissingField("b")));
        assert_eq!(d.decode(r#"{"b":"1"}"#, NOW), Err(DecodeError::MissingField("B")));
        // Subscription ack.
        assert_eq!(d.decode(r#"{"result":null,"id":1}"#, NOW), Err(DecodeError::MissingField("b")));
    }

    #[test]
    fn negative_and_non_finite_values() {
        let d = TickDecoder::default();
        assert!(matches!(d.decode(r#"{"b":"-1","B":"1"}"#, NOW), Err(DecodeError::OutOfRange { field: "b", .. })));
        assert!(matches!(d.decode(r#"{"b":"1","B":"inf"}"#, NOW), Err(DecodeError::OutOfRange { field: "B", .. })));
    }

    #[test]
    fn sentinel_timestamp_is_never_produced() {
        let d = TickDecoder::default();
        assert_eq!(d.decode(r#"{"b":"1","B":"1"}"#, 0), Err(DecodeError::InvalidTimestamp(0)));
    }

    #[test]
    fn numeric_json_values_accepted() {
        let up = TickDecoder::default().decode(r#"{"b":27000.5,"B":0.015}"#, NOW).unwrap();
        assert_eq!(up.to_record(), Record::encode(27000.5, 0.015, NOW, Side::Bid));
    }
}
