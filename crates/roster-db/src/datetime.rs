use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a timestamp column written either as RFC 3339 or by SQLite's
/// `datetime('now')` / `CURRENT_TIMESTAMP` ("YYYY-MM-DD HH:MM:SS", UTC).
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|naive| naive.and_utc())
                .ok()
        })
}

/// Read a timestamp column, surfacing unparseable text as a conversion error.
pub(crate) fn column_datetime(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp: {raw}").into(),
        )
    })
}
