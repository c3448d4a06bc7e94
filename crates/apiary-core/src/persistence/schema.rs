//! SQLite schema for namespace stores
//!
//! Each namespace database holds a single collection table named after its
//! registry kind. Record bodies are JSON; the columns beside the body exist
//! only to be indexed.

use crate::namespace::RegistryKind;

/// Schema version for migrations
pub const SCHEMA_VERSION: u32 = 3;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Version bookkeeping table, shared by every kind
    pub fn version_table() -> &'static str {
        r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#
    }

    /// Complete schema SQL for a fresh database of the given kind
    pub fn create_tables(kind: RegistryKind) -> String {
        let table = kind.table();
        let mut sql = format!(
            r#"
CREATE TABLE IF NOT EXISTS {table} (
    id TEXT PRIMARY KEY,
    sort_key INTEGER NOT NULL,
    path TEXT,
    method TEXT,
    body TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{table}_{field} ON {table}(sort_key);
"#,
            table = table,
            field = kind.sort_field(),
        );
        if kind.unique_endpoints() {
            sql.push_str(&Self::unique_endpoint_index(kind));
        } else {
            sql.push_str(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_endpoint ON {table}(path, method);\n",
                table = table
            ));
        }
        sql
    }

    fn unique_endpoint_index(kind: RegistryKind) -> String {
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_endpoint ON {table}(path, method);\n",
            table = kind.table()
        )
    }

    /// Get migration SQL for a specific version step
    pub fn migration(kind: RegistryKind, from_version: u32, to_version: u32) -> Option<String> {
        match (from_version, to_version) {
            // v1 stored (path, method) without a uniqueness constraint, so
            // racing inserts could leave duplicates. Keep the latest row of
            // each key, then enforce the key.
            (1, 2) if kind.unique_endpoints() => {
                let table = kind.table();
                let mut sql = format!(
                    r#"
DELETE FROM {table}
WHERE path IS NOT NULL
  AND rowid NOT IN (SELECT MAX(rowid) FROM {table} WHERE path IS NOT NULL GROUP BY path, method);
"#,
                    table = table
                );
                if kind == RegistryKind::Tabs {
                    // Removing duplicates leaves holes in the tab order.
                    sql.push_str(
                        r#"
CREATE TEMP TABLE tab_ranks AS
    SELECT id, ROW_NUMBER() OVER (ORDER BY sort_key, rowid) - 1 AS rank FROM tabs;
UPDATE tabs SET sort_key = (SELECT rank FROM tab_ranks WHERE tab_ranks.id = tabs.id);
UPDATE tabs SET body = json_set(body, '$.order', sort_key);
DROP TABLE tab_ranks;
"#,
                    );
                }
                sql.push_str(&format!("DROP INDEX IF EXISTS idx_{}_endpoint;\n", table));
                sql.push_str(&Self::unique_endpoint_index(kind));
                Some(sql)
            }
            (1, 2) => Some(format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_endpoint ON {table}(path, method);\n",
                table = kind.table()
            )),
            _ => None,
        }
    }

    /// Body field whose timestamp must be re-derived into `sort_key` at a
    /// version step.
    ///
    /// Before v3 timestamp sort keys were whole milliseconds; from v3 they
    /// are nanoseconds. SQL cannot parse sub-second RFC 3339 reliably, so
    /// the handle recomputes these rows in Rust.
    pub fn rekey_field(
        kind: RegistryKind,
        from_version: u32,
        to_version: u32,
    ) -> Option<&'static str> {
        match (from_version, to_version) {
            (2, 3) if kind != RegistryKind::Tabs => Some(kind.sort_field()),
            _ => None,
        }
    }
}
