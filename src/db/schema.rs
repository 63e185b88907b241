/// Item table. `{table}` is replaced with the configured collection name.
///
/// `guid` and `link` are unique on their own; rows are never updated.
const ITEMS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS {table} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    guid TEXT NOT NULL,
    link TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    content TEXT NOT NULL,
    author TEXT NOT NULL,
    categories TEXT NOT NULL DEFAULT '[]',
    media TEXT NOT NULL DEFAULT '[]',
    thumbnail TEXT,
    is_premium INTEGER NOT NULL DEFAULT 0,
    feed_title TEXT NOT NULL,
    feed_url TEXT NOT NULL,
    published_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_guid ON {table}(guid);
CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_link ON {table}(link);
CREATE INDEX IF NOT EXISTS idx_{table}_published_at ON {table}(published_at DESC);

CREATE TRIGGER IF NOT EXISTS {table}_immutable
BEFORE UPDATE ON {table}
BEGIN
    SELECT RAISE(ABORT, 'items are immutable');
END;
"#;

pub fn items_schema(table: &str) -> String {
    ITEMS_SCHEMA.replace("{table}", table)
}

/// Collection names end up in SQL text, so only plain identifiers are accepted.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
