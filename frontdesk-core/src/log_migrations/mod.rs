//! Event log schema, kept apart from the main database in logs.duckdb
//!
//! Same layout as `migrations`: SQL files embedded with include_str! and
//! applied in name order, tracked in the log database's own sys_migrations.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
