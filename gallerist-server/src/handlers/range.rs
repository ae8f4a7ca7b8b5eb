//! `Range: bytes=` parsing for media streaming.

/// Largest slice served for one range request; clients re-request the rest.
pub const MAX_CHUNK: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive.
    pub end: u64,
}

impl ByteRange {
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Clamp to at most [`MAX_CHUNK`] bytes from `start`.
    pub fn capped(self) -> Self {
        Self {
            start: self.start,
            end: self.end.min(self.start + MAX_CHUNK - 1),
        }
    }

    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

/// Parse a single-range header against a file of `file_size` bytes.
///
/// Supports `start-end`, open-ended `start-` and suffix `-len` forms. Returns
/// `None` when the header is malformed or the range cannot be satisfied.
pub fn parse_range_header(raw: &str, file_size: u64) -> Option<ByteRange> {
    let ranges = raw.trim().strip_prefix("bytes=")?;
    // Multi-range requests are answered with their first range.
    let first = ranges.split(',').next()?.trim();
    let (start, end) = first.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    if file_size == 0 {
        return None;
    }
    let last = file_size - 1;

    let (start, end) = if start.is_empty() {
        let suffix: u64 = end.parse().ok()?;
        if suffix == 0 {
            return None;
        }
        (file_size.saturating_sub(suffix), last)
    } else {
        let start: u64 = start.parse().ok()?;
        let end = if end.is_empty() {
            last
        } else {
            end.parse::<u64>().ok()?.min(last)
        };
        (start, end)
    };

    (start <= end && start < file_size).then_some(ByteRange { start, end })
}

pub fn unsatisfied_range(file_size: u64) -> String {
    format!("bytes */{file_size}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_forms() {
        assert_eq!(
            parse_range_header("bytes=0-99", 1000),
            Some(ByteRange { start: 0, end: 99 })
        );
        assert_eq!(
            parse_range_header("bytes=500-", 1000),
            Some(ByteRange { start: 500, end: 999 })
        );
        assert_eq!(
            parse_range_header("bytes=-100", 1000),
            Some(ByteRange { start: 900, end: 999 })
        );
        assert_eq!(
            parse_range_header("bytes=900-5000", 1000),
            Some(ByteRange { start: 900, end: 999 })
        );
        assert_eq!(
            parse_range_header("bytes=0-1, 5-9", 1000),
            Some(ByteRange { start: 0, end: 1 })
        );
    }

    #[test]
    fn rejects_unsatisfiable_or_malformed() {
        assert_eq!(parse_range_header("bytes=1000-", 1000), None);
        assert_eq!(parse_range_header("bytes=50-10", 1000), None);
        assert_eq!(parse_range_header("items=0-1", 1000), None);
        assert_eq!(parse_range_header("bytes=abc", 1000), None);
        assert_eq!(parse_range_header("bytes=-0", 1000), None);
        assert_eq!(parse_range_header("bytes=0-", 0), None);
    }

    #[test]
    fn caps_chunks() {
        let size = 10 * MAX_CHUNK;
        let range = parse_range_header("bytes=0-", size).unwrap().capped();
        assert_eq!(range.length(), MAX_CHUNK);
        assert_eq!(
            range.content_range(size),
            format!("bytes 0-{}/{size}", MAX_CHUNK - 1)
        );

        let small = ByteRange { start: 10, end: 20 }.capped();
        assert_eq!(small.length(), 11);
    }
}
