//! Display segmentation of completed model responses.
//!
//! Words are accumulated into a buffer (each followed by a space) and the
//! buffer is flushed as one segment whenever its length reaches the width.
//! Any remainder is flushed at the end. Segmentation only paces display;
//! joining the segments with single spaces gives back the response's words.

/// Flush threshold in characters.
pub const DEFAULT_SEGMENT_WIDTH: usize = 70;

/// Split `response` into display segments of roughly `width` characters.
///
/// ```rust
/// use sherlock::segment::segment;
///
/// let parts = segment("The  suspect\nleft at nine.", 70);
/// assert_eq!(parts, vec!["The suspect left at nine."]);
/// ```
pub fn segment(response: &str, width: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for word in response.split_whitespace() {
        buf.push_str(word);
        buf.push(' ');
        buf_chars += word.chars().count() + 1;
        if buf_chars >= width {
            segments.push(buf.trim_end().to_string());
            buf.clear();
            buf_chars = 0;
        }
    }
    if !buf.is_empty() {
        segments.push(buf.trim_end().to_string());
    }

    segments
}
