//! Pagination: opaque page tokens and `max_results` validation.
//!
//! A page token encodes nothing but an offset into the already-sorted
//! result set. It is "opaque" in the sense that callers must not
//! construct or interpret it themselves, not in the sense of being
//! encrypted.

use track_core::Error;

const TOKEN_PREFIX: &str = "tk1_";

/// Validate `max_results` against the store's configured ceiling, filling
/// in the default when absent.
///
/// The reference store's `max_results` is a required keyword argument with
/// a numeric default, so passing `None` *explicitly* is itself a rejected
/// value there ("It must be a positive integer, but got None"). This Rust
/// API instead models "caller omitted max_results" as `None` — the only way
/// to spell omission for an `Option<i64>` parameter — and resolves it to
/// `default_limit`, a deliberate adaptation to Rust's lack of default
/// parameter values. Zero and negative values are rejected either way: they
/// can only arise from a caller explicitly supplying one, so they get the
/// same "It must be a positive integer" message the reference store gives
/// its own zero/negative/`None` cases, distinct from the "It must be at
/// most N" ceiling message.
pub fn resolve_max_results(
    max_results: Option<i64>,
    default_limit: u32,
    ceiling: u32,
) -> Result<usize, Error> {
    match max_results {
        None => Ok(default_limit as usize),
        Some(n) if n <= 0 => Err(Error::MaxResultsNotPositive { actual: n.to_string() }),
        Some(n) if n > ceiling as i64 => {
            Err(Error::MaxResultsOutOfRange { limit: ceiling, actual: n })
        }
        Some(n) => Ok(n as usize),
    }
}

/// Encode an offset into an opaque page token.
pub fn encode_offset(offset: usize) -> String {
    format!("{TOKEN_PREFIX}{offset:x}")
}

/// Decode an offset from a page token produced by [`encode_offset`].
pub fn decode_offset(token: &str) -> Result<usize, Error> {
    let hex = token.strip_prefix(TOKEN_PREFIX).ok_or_else(|| Error::InvalidPageToken {
        reason: "unrecognized token format".to_string(),
    })?;
    usize::from_str_radix(hex, 16)
        .map_err(|_| Error::InvalidPageToken { reason: "corrupt token payload".to_string() })
}

/// Slice `items` starting at `page_token` (or the start) and take at most
/// `page_size`, returning the items plus a token for the next page if any
/// remain.
pub fn paginate<T: Clone>(
    items: &[T],
    page_token: Option<&str>,
    page_size: usize,
) -> Result<(Vec<T>, Option<String>), Error> {
    let offset = match page_token {
        Some(t) => decode_offset(t)?,
        None => 0,
    };
    if offset > items.len() {
        return Err(Error::InvalidPageToken { reason: "offset past end of result set".to_string() });
    }
    let end = (offset + page_size).min(items.len());
    let page = items[offset..end].to_vec();
    let next = if end < items.len() { Some(encode_offset(end)) } else { None };
    Ok((page, next))
}
