//! Streaming trade-ticker collector (spec §8 scenarios S2 and S4): one
//! bounded sweep opens a WebSocket session, drives it through the
//! reconnect/backoff/circuit-breaker state machine in
//! `feedeater_collector::connection`, ingests trades idempotently, and
//! rolls them up into candles via `feedeater_collector::aggregate`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use feedeater_ai::Embedder;
use feedeater_broker::BrokerClient;
use feedeater_collector::aggregate::{Candle, CandleAggregator, OrderBook};
use feedeater_collector::budget::Budget;
use feedeater_collector::connection::{Backoff, CircuitBreaker};
use feedeater_collector::pipeline::{guarded, EventPipeline};
use feedeater_collector::{Collector, ContextMetrics as CollectorContextMetrics, SweepMetrics, CIRCUIT_BREAKER_TRIPPED_KEY};
use feedeater_common::model::{ContextRef, Message, MessageSource};
use feedeater_context::ContextEngine;
use feedeater_idempotency::derive_message_id;
use feedeater_schema::SchemaManager;
use feedeater_settings::SettingsRegistry;
use futures_util::{SinkExt, StreamExt};
use pgvector::Vector;
use serde::Deserialize;
use sqlx::PgPool;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context_source::TickerContextSource;
use crate::manifest::MODULE_NAME;
use crate::schema::DDL;
use crate::settings::TickerSettings;

/// One decoded trade frame, independent of the wire JSON shape so decoding
/// can be unit-tested without a live socket.
#[derive(Debug, Clone, PartialEq)]
struct DecodedTrade {
    symbol: String,
    trade_id: String,
    price: f64,
    size: f64,
    traded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
enum BookSide {
    Bid,
    Ask,
}

#[derive(Debug, Clone, PartialEq)]
enum DecodedFrame {
    Trade(DecodedTrade),
    BookLevel { symbol: String, side: BookSide, price: f64, size: f64 },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireFrame {
    Trade { symbol: String, trade_id: String, price: f64, size: f64, ts_ms: i64 },
    Book { symbol: String, side: String, price: f64, size: f64 },
}

fn decode_frame(text: &str) -> anyhow::Result<DecodedFrame> {
    let frame: WireFrame = serde_json::from_str(text)?;
    Ok(match frame {
        WireFrame::Trade { symbol, trade_id, price, size, ts_ms } => {
            let traded_at = Utc.timestamp_millis_opt(ts_ms).single().unwrap_or_else(Utc::now);
            DecodedFrame::Trade(DecodedTrade { symbol, trade_id, price, size, traded_at })
        }
        WireFrame::Book { symbol, side, price, size } => {
            let side = match side.as_str() {
                "bid" => BookSide::Bid,
                _ => BookSide::Ask,
            };
            DecodedFrame::BookLevel { symbol, side, price, size }
        }
    })
}

pub struct TickerCollector {
    pool: PgPool,
    broker: BrokerClient,
    settings: Arc<SettingsRegistry>,
    embedder: Arc<dyn Embedder>,
    summarizer: Arc<dyn feedeater_ai::Summarizer>,
}

impl TickerCollector {
    pub fn new(
        pool: PgPool,
        broker: BrokerClient,
        settings: Arc<SettingsRegistry>,
        embedder: Arc<dyn Embedder>,
        summarizer: Arc<dyn feedeater_ai::Summarizer>,
    ) -> Self {
        Self { pool, broker, settings, embedder, summarizer }
    }

    /// Drives one open session until the socket closes or the budget is
    /// exhausted, per spec §4.5(a) step 3. Returns once there is nothing
    /// more to read.
    #[allow(clippy::too_many_arguments)]
    async fn drive_session(
        &self,
        mut ws: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        settings: &TickerSettings,
        budget: &Budget,
        metrics: &mut SweepMetrics,
        candles: &mut CandleAggregator,
        books: &mut HashMap<String, OrderBook>,
        pipeline: &EventPipeline<'_>,
    ) {
        loop {
            let next = budget.or_cancel(ws.next()).await;
            let frame = match next {
                None => {
                    info!(module = MODULE_NAME, "sweep budget exhausted mid-session, closing");
                    let _ = ws.send(WsMessage::Close(None)).await;
                    return;
                }
                Some(None) => return,
                Some(Some(Err(e))) => {
                    warn!(module = MODULE_NAME, error = %e, "websocket read error, treating as disconnect");
                    return;
                }
                Some(Some(Ok(frame))) => frame,
            };

            match frame {
                WsMessage::Text(text) => {
                    self.handle_text_frame(&text.to_string(), settings, metrics, candles, books, pipeline).await
                }
                WsMessage::Ping(payload) => {
                    let _ = ws.send(WsMessage::Pong(payload)).await;
                }
                WsMessage::Close(_) => return,
                _ => {}
            }
        }
    }

    async fn handle_text_frame(
        &self,
        text: &str,
        settings: &TickerSettings,
        metrics: &mut SweepMetrics,
        candles: &mut CandleAggregator,
        books: &mut HashMap<String, OrderBook>,
        pipeline: &EventPipeline<'_>,
    ) {
        let decoded = match decode_frame(text) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(module = MODULE_NAME, error = %e, "failed to decode ticker frame, skipping");
                metrics.increment("frames_errored");
                return;
            }
        };

        match decoded {
            DecodedFrame::Trade(trade) => self.handle_trade(trade, settings, metrics, candles, pipeline).await,
            DecodedFrame::BookLevel { symbol, side, price, size } => {
                let book = books.entry(symbol.clone()).or_insert_with(|| OrderBook::new(settings.orderbook_depth));
                match side {
                    BookSide::Bid => book.apply_bid(price, size),
                    BookSide::Ask => book.apply_ask(price, size),
                }
                if let Err(e) = self.upsert_orderbook_snapshot(&symbol, book).await {
                    warn!(module = MODULE_NAME, symbol, error = %e, "failed to upsert orderbook snapshot");
                }
            }
        }
    }

    async fn handle_trade(
        &self,
        trade: DecodedTrade,
        settings: &TickerSettings,
        metrics: &mut SweepMetrics,
        candles: &mut CandleAggregator,
        pipeline: &EventPipeline<'_>,
    ) {
        let natural_key = format!("{MODULE_NAME}:{}:tradeId={}", trade.symbol, trade.trade_id);
        let message_id = derive_message_id(MODULE_NAME, &natural_key);

        let flushed = candles.apply_trade(
            &trade.symbol,
            trade.traded_at.timestamp_millis(),
            trade.price,
            trade.size,
        );
        if let Some(candle) = flushed {
            let interval_secs = settings.candle_interval.as_secs() as i32;
            if let Err(e) = self.upsert_candle(&trade.symbol, interval_secs, &candle).await {
                warn!(module = MODULE_NAME, symbol = trade.symbol, error = %e, "failed to upsert candle");
            }
        }

        guarded("insert", &natural_key, || async {
            let inserted = self
                .insert_trade(message_id, &trade.symbol, &trade.trade_id, trade.price, trade.size, trade.traded_at)
                .await
                .map_err(|e| e.to_string())?;

            if inserted {
                metrics.increment("trades_collected");

                let text = format!("{} traded {} @ {}", trade.symbol, trade.size, trade.price);
                let message = Message {
                    id: message_id,
                    created_at: Utc::now(),
                    source: MessageSource { module: MODULE_NAME.to_string(), stream: Some(trade.symbol.clone()) },
                    realtime: true,
                    message: text.clone(),
                    from: None,
                    context_ref: Some(ContextRef { owner_module: MODULE_NAME.to_string(), source_key: trade.symbol.clone() }),
                    follow_me_panel: None,
                    is_direct_mention: false,
                    is_digest: false,
                    is_system_message: false,
                    likes: 0,
                    tags: HashMap::new(),
                };

                pipeline.publish_if_applicable(message, inserted).await.map_err(|e| e.to_string())?;

                let trade_subject = self.broker.subject_for(MODULE_NAME, "tradeExecuted");
                let payload = serde_json::json!({
                    "symbol": trade.symbol,
                    "price": trade.price,
                    "size": trade.size,
                    "tradedAt": trade.traded_at,
                })
                .to_string();
                self.broker.publish(&trade_subject, &payload).await;

                if settings.embed_trades {
                    if let Err(e) = self.embed_trade_if_enabled(message_id, &text).await {
                        warn!(module = MODULE_NAME, natural_key, error = %e, "failed to embed trade, continuing");
                    }
                }
            }

            Ok::<(), String>(())
        })
        .await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_trade(
        &self,
        id: Uuid,
        symbol: &str,
        trade_id: &str,
        price: f64,
        size: f64,
        traded_at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"INSERT INTO "mod_ticker"."trades" (id, symbol, trade_id, price, size, traded_at, message_id)
               VALUES ($1, $2, $3, $4, $5, $6, $1)
               ON CONFLICT (symbol, trade_id) DO NOTHING"#,
        )
        .bind(id)
        .bind(symbol)
        .bind(trade_id)
        .bind(price)
        .bind(size)
        .bind(traded_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn embed_trade_if_enabled(&self, item_id: Uuid, text: &str) -> anyhow::Result<()> {
        let embedding = self.embedder.embed(text).await?;
        let vector = Vector::from(embedding);

        sqlx::query(
            r#"INSERT INTO "mod_ticker"."trades_embeddings" (item_id, embedding, updated_at)
               VALUES ($1, $2, now())
               ON CONFLICT (item_id) DO UPDATE SET embedding = EXCLUDED.embedding, updated_at = now()"#,
        )
        .bind(item_id)
        .bind(vector)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upserts a flushed candle, per spec §4.6: `high`/`low` merge with
    /// `GREATEST`/`LEAST`, `close`/`volume`/`tradeCount` are replaced with
    /// this invocation's values.
    async fn upsert_candle(&self, symbol: &str, interval_secs: i32, candle: &Candle) -> anyhow::Result<()> {
        let start_time = Utc.timestamp_millis_opt(candle.start_time).single().unwrap_or_else(Utc::now);

        sqlx::query(
            r#"INSERT INTO "mod_ticker"."candles" (symbol, interval_secs, start_time, open, high, low, close, volume, trade_count, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
               ON CONFLICT (symbol, interval_secs, start_time) DO UPDATE SET
                   high = GREATEST("mod_ticker"."candles".high, EXCLUDED.high),
                   low = LEAST("mod_ticker"."candles".low, EXCLUDED.low),
                   close = EXCLUDED.close,
                   volume = EXCLUDED.volume,
                   trade_count = EXCLUDED.trade_count,
                   updated_at = now()"#,
        )
        .bind(symbol)
        .bind(interval_secs)
        .bind(start_time)
        .bind(candle.open)
        .bind(candle.high)
        .bind(candle.low)
        .bind(candle.close)
        .bind(candle.volume)
        .bind(candle.trade_count as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Snapshot the current top-of-book, per spec §4.6's "snapshots taken
    /// at a minimum interval per symbol" — callers upsert on every
    /// book-level update; the single-row-per-symbol shape naturally
    /// coalesces bursts into the latest state.
    async fn upsert_orderbook_snapshot(&self, symbol: &str, book: &OrderBook) -> anyhow::Result<()> {
        let bids = serde_json::to_value(
            book.bids().iter().map(|l| serde_json::json!({"price": l.price, "size": l.size})).collect::<Vec<_>>(),
        )?;
        let asks = serde_json::to_value(
            book.asks().iter().map(|l| serde_json::json!({"price": l.price, "size": l.size})).collect::<Vec<_>>(),
        )?;

        sqlx::query(
            r#"INSERT INTO "mod_ticker"."orderbook_snapshots" (symbol, bids, asks, captured_at)
               VALUES ($1, $2, $3, now())
               ON CONFLICT (symbol) DO UPDATE SET bids = EXCLUDED.bids, asks = EXCLUDED.asks, captured_at = now()"#,
        )
        .bind(symbol)
        .bind(bids)
        .bind(asks)
        .execute(&self.pool)
        .await?;

        let subject = self.broker.subject_for(MODULE_NAME, "orderbookSnapshot");
        self.broker.publish(&subject, &serde_json::json!({"symbol": symbol}).to_string()).await;

        Ok(())
    }
}

#[async_trait]
impl Collector for TickerCollector {
    fn module_name(&self) -> &str {
        MODULE_NAME
    }

    async fn ensure_schema(&self) -> anyhow::Result<()> {
        let manager = SchemaManager::new(self.pool.clone());
        manager.ensure_schema(MODULE_NAME, DDL).await?;

        let settings = TickerSettings::load(&self.settings).await?;
        manager
            .ensure_embedding_dimension(MODULE_NAME, "trades_embeddings", "embedding", settings.embedding_dim)
            .await?;

        Ok(())
    }

    async fn run_sweep(&self, budget: Budget) -> SweepMetrics {
        let mut metrics = SweepMetrics::new();
        metrics.set("trades_collected", 0i64);

        let settings = match TickerSettings::load(&self.settings).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(module = MODULE_NAME, error = %e, "failed to load settings, skipping sweep");
                metrics.set("settings_error", true);
                return metrics;
            }
        };

        let mut candles = CandleAggregator::new(settings.candle_interval.as_millis() as i64);
        let mut books: HashMap<String, OrderBook> = HashMap::new();
        let pipeline = EventPipeline::new(&self.broker, MODULE_NAME, false);
        let mut backoff = Backoff::default_module();
        let mut breaker = CircuitBreaker::default_module();

        while !budget.is_expired() {
            let connect_result = budget.or_cancel(tokio_tungstenite::connect_async(&settings.ws_url)).await;

            match connect_result {
                None => {
                    info!(module = MODULE_NAME, "sweep budget exhausted while connecting");
                    break;
                }
                Some(Ok((ws, _response))) => {
                    breaker.record_success();
                    backoff.reset();
                    self.drive_session(ws, &settings, &budget, &mut metrics, &mut candles, &mut books, &pipeline).await;
                }
                Some(Err(e)) => {
                    warn!(module = MODULE_NAME, error = %e, "failed to connect, will retry");
                    metrics.increment("reconnect_attempts");

                    let reconnecting_subject = self.broker.subject_for(MODULE_NAME, "reconnecting");
                    let payload = serde_json::json!({"at": Utc::now(), "attempt": breaker.consecutive_failures() + 1}).to_string();
                    self.broker.publish(&reconnecting_subject, &payload).await;

                    if breaker.record_failure() {
                        warn!(module = MODULE_NAME, "circuit breaker tripped, ending invocation");
                        let dead_subject = self.broker.dead_module_subject(MODULE_NAME);
                        let payload = serde_json::json!({"at": Utc::now()}).to_string();
                        self.broker.publish(&dead_subject, &payload).await;
                        metrics.set(CIRCUIT_BREAKER_TRIPPED_KEY, true);
                        break;
                    }

                    let delay = backoff.next_delay();
                    if budget.or_cancel(tokio::time::sleep(delay)).await.is_none() {
                        break;
                    }
                }
            }
        }

        for (symbol, candle) in candles.flush_all() {
            let interval_secs = settings.candle_interval.as_secs() as i32;
            if let Err(e) = self.upsert_candle(&symbol, interval_secs, &candle).await {
                warn!(module = MODULE_NAME, symbol, error = %e, "failed to flush final candle");
            }
        }

        metrics
    }

    async fn refresh_contexts(&self, lookback: Duration) -> CollectorContextMetrics {
        let source = Arc::new(TickerContextSource::new(self.pool.clone()));
        let engine = ContextEngine::new(
            Arc::new(self.broker.clone()),
            source,
            self.summarizer.clone(),
            self.embedder.clone(),
        );

        let metrics = engine.refresh(lookback).await;
        CollectorContextMetrics {
            updated: metrics.updated,
            ai_summaries: metrics.ai_summaries,
            fallback_summaries: metrics.fallback_summaries,
            embeddings_inserted: metrics.embeddings_inserted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_frame_parses_trade() {
        let text = r#"{"type":"trade","symbol":"tBTCUSD","trade_id":"12345","price":42000.5,"size":0.01,"ts_ms":1700000000000}"#;
        let decoded = decode_frame(text).unwrap();
        match decoded {
            DecodedFrame::Trade(trade) => {
                assert_eq!(trade.symbol, "tBTCUSD");
                assert_eq!(trade.trade_id, "12345");
                assert_eq!(trade.price, 42000.5);
                assert_eq!(trade.size, 0.01);
            }
            _ => panic!("expected a trade frame"),
        }
    }

    #[test]
    fn decode_frame_parses_book_level() {
        let text = r#"{"type":"book","symbol":"tBTCUSD","side":"bid","price":100.0,"size":2.0}"#;
        let decoded = decode_frame(text).unwrap();
        assert_eq!(decoded, DecodedFrame::BookLevel { symbol: "tBTCUSD".to_string(), side: BookSide::Bid, price: 100.0, size: 2.0 });
    }

    #[test]
    fn decode_frame_rejects_garbage() {
        assert!(decode_frame("not json").is_err());
    }

    #[test]
    fn same_trade_yields_same_message_id() {
        let a = derive_message_id(MODULE_NAME, "ticker:tBTCUSD:tradeId=12345");
        let b = derive_message_id(MODULE_NAME, "ticker:tBTCUSD:tradeId=12345");
        assert_eq!(a, b);
    }

    /// Exercises spec §8 scenario S4's exact backoff sequence and
    /// circuit-breaker trip point: 10 consecutive failures, backoffs
    /// 1,2,4,8,16,30,30,30,30,30s, tripped exactly on the 10th.
    #[test]
    fn circuit_breaker_trips_after_ten_failures_with_expected_backoffs() {
        let mut backoff = Backoff::default_module();
        let mut breaker = CircuitBreaker::default_module();

        let delays: Vec<Duration> = (0..10).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            vec![1, 2, 4, 8, 16, 30, 30, 30, 30, 30].into_iter().map(Duration::from_secs).collect::<Vec<_>>()
        );

        let mut tripped_at = None;
        for attempt in 1..=10 {
            if breaker.record_failure() {
                tripped_at = Some(attempt);
            }
        }
        assert_eq!(tripped_at, Some(10));
        assert!(breaker.is_tripped());
    }
}
