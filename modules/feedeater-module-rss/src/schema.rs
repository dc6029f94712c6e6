//! `mod_rss` DDL (spec §4.2/§4.4): one raw table plus a sibling
//! `*_embeddings` table, per spec §4.2's "a `*_embeddings` table whose
//! embedding column is of a configurable vector dimension".

pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

pub const DDL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "mod_rss"."rss_items" (
        id UUID PRIMARY KEY,
        feed_url TEXT NOT NULL,
        source_id TEXT NOT NULL,
        title TEXT,
        link TEXT,
        author TEXT,
        published_at TIMESTAMPTZ,
        content TEXT NOT NULL,
        collected_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        message_id UUID,
        UNIQUE (feed_url, source_id)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS rss_items_feed_collected_idx ON "mod_rss"."rss_items" (feed_url, collected_at DESC)"#,
    r#"CREATE TABLE IF NOT EXISTS "mod_rss"."rss_items_embeddings" (
        item_id UUID PRIMARY KEY REFERENCES "mod_rss"."rss_items" (id) ON DELETE CASCADE,
        embedding vector(1536),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
];
