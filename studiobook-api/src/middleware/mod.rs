/// Middleware for the API server
///
/// - `security`: security response headers
/// - `rate_limit`: per-client fixed-window rate limiting

pub mod rate_limit;
pub mod security;
