//! Canonical conversion identifiers
//!
//! A query names one directed currency pair as `FROM_TO`. Several queries can be
//! joined with `,` into a batch, which the fetcher and the in-flight tracker treat
//! as a single unit of work.

/// Separator between the two currency codes of a pair.
pub const PAIR_SEPARATOR: char = '_';

/// Separator between queries in a batch.
pub const BATCH_SEPARATOR: &str = ",";

/// Builds the query for a `from -> to` conversion. Missing codes become empty
/// segments, so `to_query(None, None)` is `"_"`.
pub fn to_query(from: Option<&str>, to: Option<&str>) -> String {
    format!(
        "{}{}{}",
        from.unwrap_or_default(),
        PAIR_SEPARATOR,
        to.unwrap_or_default()
    )
}

/// Joins individual queries into one composite batch key.
pub fn batch<S: AsRef<str>>(queries: &[S]) -> String {
    queries
        .iter()
        .map(|q| q.as_ref())
        .collect::<Vec<&str>>()
        .join(BATCH_SEPARATOR)
}

/// Splits a composite batch key back into its queries. Empty segments are dropped.
pub fn split_batch(batch: &str) -> Vec<&str> {
    batch
        .split(BATCH_SEPARATOR)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .collect()
}

/// Splits a single query into its `(from, to)` codes.
pub fn parse_query(query: &str) -> Option<(&str, &str)> {
    query.split_once(PAIR_SEPARATOR)
}
