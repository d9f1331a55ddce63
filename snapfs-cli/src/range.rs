//! `Range` request header handling
//!
//! Only single byte ranges are honoured. A multi-range request is answered
//! with the whole file, which RFC 9110 allows.

/// What to send back for a request against a file of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range: send everything with 200
    Full,
    /// Send `start..=end` with 206
    Partial { start: u64, end: u64 },
    /// Answer 416
    Unsatisfiable,
}

impl ByteRange {
    /// Parse the value of a `Range` header
    pub fn parse(header: Option<&str>, size: u64) -> Self {
        let Some(header) = header else {
            return ByteRange::Full;
        };
        let Some(spec) = header.trim().strip_prefix("bytes=") else {
            return ByteRange::Unsatisfiable;
        };
        if spec.contains(',') {
            return ByteRange::Full;
        }
        let Some((first, last)) = spec.trim().split_once('-') else {
            return ByteRange::Unsatisfiable;
        };
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            // suffix form: the last n bytes
            return match last.parse::<u64>() {
                Ok(0) | Err(_) => ByteRange::Unsatisfiable,
                Ok(_) if size == 0 => ByteRange::Unsatisfiable,
                Ok(n) => ByteRange::Partial {
                    start: size.saturating_sub(n),
                    end: size - 1,
                },
            };
        }

        let Ok(start) = first.parse::<u64>() else {
            return ByteRange::Unsatisfiable;
        };
        if start >= size {
            return ByteRange::Unsatisfiable;
        }

        let end = if last.is_empty() {
            size - 1
        } else {
            match last.parse::<u64>() {
                Ok(end) if end >= start => end.min(size - 1),
                _ => return ByteRange::Unsatisfiable,
            }
        };

        ByteRange::Partial { start, end }
    }

    /// Number of bytes in the response body
    pub fn len(&self, size: u64) -> u64 {
        match *self {
            ByteRange::Full => size,
            ByteRange::Partial { start, end } => end - start + 1,
            ByteRange::Unsatisfiable => 0,
        }
    }

    /// `Content-Range` header value, if one is sent
    pub fn content_range(&self, size: u64) -> Option<String> {
        match *self {
            ByteRange::Full => None,
            ByteRange::Partial { start, end } => Some(format!("bytes {start}-{end}/{size}")),
            ByteRange::Unsatisfiable => Some(format!("bytes */{size}")),
        }
    }
}
