//! Candle and order-book aggregation state, keyed by symbol, per spec
//! §4.6. Single-flight per (module, job) (spec §5) makes this safe to keep
//! as plain in-memory maps without locking.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub start_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub trade_count: u64,
}

/// Buckets trades into fixed-width candles per symbol. A trade whose
/// bucket differs from the current one flushes the old candle (the caller
/// upserts it) and starts a new one.
#[derive(Default)]
pub struct CandleAggregator {
    interval_ms: i64,
    current: HashMap<String, Candle>,
}

impl CandleAggregator {
    pub fn new(interval_ms: i64) -> Self {
        Self { interval_ms, current: HashMap::new() }
    }

    fn bucket_start(&self, ts_ms: i64) -> i64 {
        (ts_ms / self.interval_ms) * self.interval_ms
    }

    /// Applies one trade. Returns the candle that should be flushed
    /// (upserted) if this trade started a new bucket.
    pub fn apply_trade(&mut self, symbol: &str, ts_ms: i64, price: f64, size: f64) -> Option<Candle> {
        let bucket = self.bucket_start(ts_ms);

        let flushed = match self.current.get(symbol) {
            Some(candle) if candle.start_time != bucket => self.current.remove(symbol),
            _ => None,
        };

        let candle = self.current.entry(symbol.to_string()).or_insert_with(|| Candle {
            start_time: bucket,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
            trade_count: 0,
        });

        candle.high = candle.high.max(price);
        candle.low = candle.low.min(price);
        candle.close = price;
        candle.volume += size;
        candle.trade_count += 1;

        flushed
    }

    /// Flushes every open candle, e.g. at the end of a sweep's budget.
    pub fn flush_all(&mut self) -> Vec<(String, Candle)> {
        self.current.drain().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

/// Top-K bid/ask levels for one symbol, sorted best-first. A size-0 update
/// removes the level (spec §4.6, §8.7).
#[derive(Default)]
pub struct OrderBook {
    depth: usize,
    bids: Vec<BookLevel>,
    asks: Vec<BookLevel>,
}

impl OrderBook {
    pub fn new(depth: usize) -> Self {
        Self { depth, bids: Vec::new(), asks: Vec::new() }
    }

    pub fn apply_bid(&mut self, price: f64, size: f64) {
        Self::apply(&mut self.bids, price, size, self.depth, true);
    }

    pub fn apply_ask(&mut self, price: f64, size: f64) {
        Self::apply(&mut self.asks, price, size, self.depth, false);
    }

    fn apply(levels: &mut Vec<BookLevel>, price: f64, size: f64, depth: usize, best_is_highest: bool) {
        levels.retain(|l| l.price != price);

        if size > 0.0 {
            levels.push(BookLevel { price, size });
            if best_is_highest {
                levels.sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap());
            } else {
                levels.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap());
            }
            levels.truncate(depth);
        }
    }

    pub fn bids(&self) -> &[BookLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[BookLevel] {
        &self.asks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_tracks_ohlcv_within_one_bucket() {
        let mut agg = CandleAggregator::new(60_000);
        assert!(agg.apply_trade("BTCUSD", 1_000, 100.0, 1.0).is_none());
        assert!(agg.apply_trade("BTCUSD", 2_000, 105.0, 2.0).is_none());
        assert!(agg.apply_trade("BTCUSD", 3_000, 95.0, 0.5).is_none());

        let flushed = agg.flush_all();
        let (_, candle) = flushed.into_iter().find(|(s, _)| s == "BTCUSD").unwrap();
        assert_eq!(candle.open, 100.0);
        assert_eq!(candle.close, 95.0);
        assert_eq!(candle.high, 105.0);
        assert_eq!(candle.low, 95.0);
        assert_eq!(candle.volume, 3.5);
        assert_eq!(candle.trade_count, 3);
    }

    #[test]
    fn new_bucket_flushes_previous_candle() {
        let mut agg = CandleAggregator::new(60_000);
        agg.apply_trade("BTCUSD", 1_000, 100.0, 1.0);
        let flushed = agg.apply_trade("BTCUSD", 61_000, 110.0, 1.0);
        let candle = flushed.expect("crossing a bucket boundary should flush");
        assert_eq!(candle.start_time, 0);
        assert_eq!(candle.open, 100.0);
    }

    #[test]
    fn order_book_size_zero_removes_level() {
        let mut book = OrderBook::new(5);
        book.apply_bid(100.0, 1.0);
        book.apply_bid(99.0, 2.0);
        assert_eq!(book.bids().len(), 2);

        book.apply_bid(100.0, 0.0);
        assert_eq!(book.bids().len(), 1);
        assert_eq!(book.bids()[0].price, 99.0);
    }

    #[test]
    fn order_book_bids_sorted_best_first() {
        let mut book = OrderBook::new(5);
        book.apply_bid(99.0, 1.0);
        book.apply_bid(101.0, 1.0);
        book.apply_bid(100.0, 1.0);
        let prices: Vec<f64> = book.bids().iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![101.0, 100.0, 99.0]);
    }

    #[test]
    fn order_book_truncates_to_depth() {
        let mut book = OrderBook::new(2);
        book.apply_ask(10.0, 1.0);
        book.apply_ask(11.0, 1.0);
        book.apply_ask(9.0, 1.0);
        assert_eq!(book.asks().len(), 2);
        assert_eq!(book.asks()[0].price, 9.0);
    }
}
