use bytes::BytesMut;

use crate::MultipartError;

/// Upper bound on the raw size of one part's header block.
pub(crate) const MAX_HEADER_BLOCK: usize = 8 * 1024;

/// Headers of a single multipart body part.
///
/// Names keep the case they arrived with; lookup is case-insensitive. A name
/// may occur more than once, [`get`][Headers::get] returns the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Look up the first header with the given name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether a header with the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over all headers in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of headers, counting repeats.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the part arrived without any headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Accumulates the raw bytes of a header block until the blank line.
#[derive(Debug, Default)]
pub(crate) struct HeaderBlock {
    buf: BytesMut,
}

impl HeaderBlock {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Result<(), MultipartError> {
        if self.buf.len() + chunk.len() > MAX_HEADER_BLOCK {
            return Err(MultipartError::HeaderBlockTooLarge {
                limit: MAX_HEADER_BLOCK,
            });
        }
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    /// Where the `CRLF CRLF` terminator starts, if it arrived.
    pub(crate) fn terminator(&self) -> Option<usize> {
        self.buf
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
    }

    /// Parse the accumulated block into headers.
    ///
    /// `until` bounds the header bytes; anything past it (the terminator and
    /// the body start) is ignored by the parse and handed back separately by
    /// the caller.
    pub(crate) fn parse(&self, until: usize) -> Result<Headers, MultipartError> {
        let raw = &self.buf[..until];
        let mut entries = Vec::new();
        for line in split_crlf(raw) {
            if line.is_empty() {
                continue;
            }
            let line = String::from_utf8_lossy(line);
            let Some((name, value)) = line.split_once(':') else {
                return Err(MultipartError::MalformedHeader(line.into_owned()));
            };
            entries.push((name.trim().to_string(), value.trim().to_string()));
        }
        Ok(Headers { entries })
    }

    pub(crate) fn body_start(&self, terminator: usize) -> &[u8] {
        &self.buf[terminator + 4..]
    }
}

fn split_crlf(raw: &[u8]) -> impl Iterator<Item = &[u8]> {
    raw.split(|byte| *byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}
