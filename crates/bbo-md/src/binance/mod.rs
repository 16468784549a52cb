//! Binance best bid/offer feed.
//!
//! The capture uses the raw `<symbol>@bookTicker` stream, which needs no
//! subscription message: the stream is selected by the URL path.

pub mod json_parser;

use bbo_core::config::FeedConfig;
use bbo_core::error::ConfigError;

pub use json_parser::{NormalizedUpdate, TickDecoder};

/// Raw-stream URL for a symbol, e.g. `wss://stream.binance.com:443/ws/btcusdt@bookTicker`.
pub fn book_ticker_url(base_url: &str, symbol: &str) -> String {
    format!("{}/{}@bookTicker", base_url.trim_end_matches('/'), symbol.to_lowercase())
}

/// Stream URL and decoder for a feed config. The URL must be `ws://` or
/// `wss://` and the symbol non-empty.
pub fn build(feed: &FeedConfig) -> Result<(String, TickDecoder), ConfigError> {
    if feed.symbol.trim().is_empty() {
        return Err(ConfigError::Invalid("feed.symbol is empty".to_string()));
    }
    let url = book_ticker_url(&feed.url, feed.symbol.trim());
    let parsed = url::Url::parse(&url).map_err(|e| ConfigError::Invalid(format!("feed.url {url}: {e}")))?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(ConfigError::Invalid(format!("feed.url {url}: expected ws:// or wss://")));
    }
    Ok((url, TickDecoder::new(feed.side)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbo_core::Side;

    #[test]
    fn url_from_symbol() {
        assert_eq!(
            book_ticker_url("wss://stream.binance.com:443/ws", "BTCUSDT"),
            "wss://stream.binance.com:443/ws/btcusdt@bookTicker"
        );
        assert_eq!(book_ticker_url("wss://x.test/ws/", "EthUsdt"), "wss://x.test/ws/ethusdt@bookTicker");
    }

    #[test]
    fn build_uses_configured_side() {
        let feed = FeedConfig { side: Side::Ask, ..Default::default() };
        let (url, decoder) = build(&feed).unwrap();
        assert!(url.ends_with("/btcusdt@bookTicker"));
        assert_eq!(decoder.side(), Side::Ask);
    }

    #[test]
    fn build_rejects_bad_feed() {
        let http = FeedConfig { url: "https://stream.binance.com/ws".into(), ..Default::default() };
        assert!(matches!(build(&http), Err(ConfigError::Invalid(_))));

        let garbage = FeedConfig { url: "not a url".into(), ..Default::default() };
        assert!(matches!(build(&garbage), Err(ConfigError::Invalid(_))));

        let no_symbol = FeedConfig { symbol: "  ".into(), ..Default::default() };
        assert!(matches!(build(&no_symbol), Err(ConfigError::Invalid(_))));
    }
}
