//! Size discovery from HTTP responses.

use reqwest::header::CONTENT_RANGE;
use reqwest::Response;

/// Size of the remote object a response describes.
///
/// A `Content-Range` header (answer to a range probe) wins over
/// `Content-Length`, which for a range answer only covers the requested slice.
pub fn response_size(response: &Response) -> Option<u64> {
    match response.headers().get(CONTENT_RANGE) {
        Some(range) => range.to_str().ok().and_then(parse_content_range_total),
        None => response.content_length(),
    }
}

/// Parse the total out of a `Content-Range` value.
///
/// ```rust
/// use haul::utils::parse_content_range_total;
///
/// assert_eq!(parse_content_range_total("bytes 0-1023/2048"), Some(2048));
/// assert_eq!(parse_content_range_total("bytes 0-1023/*"), None);
/// ```
pub fn parse_content_range_total(content_range: &str) -> Option<u64> {
    content_range
        .split('/')
        .next_back()
        .and_then(|size| size.trim().parse::<u64>().ok())
}
