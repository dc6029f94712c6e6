//! `mod_ticker` DDL (spec §4.2/§4.4/§4.6): a raw trades table with a
//! sibling `*_embeddings` table, plus candle and order-book snapshot
//! tables for the aggregation state described in spec §4.6.

pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

pub const DDL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "mod_ticker"."trades" (
        id UUID PRIMARY KEY,
        symbol TEXT NOT NULL,
        trade_id TEXT NOT NULL,
        price DOUBLE PRECISION NOT NULL,
        size DOUBLE PRECISION NOT NULL,
        traded_at TIMESTAMPTZ NOT NULL,
        collected_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        message_id UUID,
        UNIQUE (symbol, trade_id)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS trades_symbol_collected_idx ON "mod_ticker"."trades" (symbol, collected_at DESC)"#,
    r#"CREATE TABLE IF NOT EXISTS "mod_ticker"."trades_embeddings" (
        item_id UUID PRIMARY KEY REFERENCES "mod_ticker"."trades" (id) ON DELETE CASCADE,
        embedding vector(1536),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "mod_ticker"."candles" (
        symbol TEXT NOT NULL,
        interval_secs INTEGER NOT NULL,
        start_time TIMESTAMPTZ NOT NULL,
        open DOUBLE PRECISION NOT NULL,
        high DOUBLE PRECISION NOT NULL,
        low DOUBLE PRECISION NOT NULL,
        close DOUBLE PRECISION NOT NULL,
        volume DOUBLE PRECISION NOT NULL,
        trade_count BIGINT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (symbol, interval_secs, start_time)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "mod_ticker"."orderbook_snapshots" (
        symbol TEXT PRIMARY KEY,
        bids JSONB NOT NULL,
        asks JSONB NOT NULL,
        captured_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
];
