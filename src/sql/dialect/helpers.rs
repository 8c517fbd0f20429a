//! Shared helper functions for SQL dialect implementations.

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Parameters
// =============================================================================

/// Numbered placeholder, 1-based.
/// Used by: Postgres, DuckDB
pub fn placeholder_dollar(n: usize) -> String {
    format!("${}", n)
}

// =============================================================================
// Spatial
// =============================================================================

/// `EPSG:<code>` authority string.
pub fn epsg(srid: u32) -> String {
    format!("EPSG:{}", srid)
}
