use bytes::{Buf, Bytes, BytesMut};

/// A slice of input between delimiter occurrences.
///
/// `end` marks the last fragment of a token: the next delimiter (or the end
/// of input, for [`Tokenizer::finish`]) was found right after `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) data: Bytes,
    pub(crate) end: bool,
}

/// Incremental splitter for delimiter-separated byte streams.
///
/// Chunks may cut the delimiter at any byte, so after scanning, the last
/// `delimiter length - 1` bytes stay buffered until more input arrives. A
/// token may therefore be emitted as several non-`end` fragments followed by
/// one `end` fragment.
#[derive(Debug)]
pub(crate) struct Tokenizer {
    delim: Vec<u8>,
    acc: BytesMut,
}

impl Tokenizer {
    pub(crate) fn new(delim: &[u8]) -> Self {
        debug_assert!(delim.len() > 1);
        Self {
            delim: delim.to_vec(),
            acc: BytesMut::new(),
        }
    }

    /// Feed the next chunk and collect the fragments it completes.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<Token> {
        self.acc.extend_from_slice(chunk);

        let mut tokens = Vec::new();
        let mut offset = 0;
        while let Some(at) = find(&self.acc[offset..], &self.delim) {
            let at = offset + at;
            tokens.push(Token {
                data: Bytes::copy_from_slice(&self.acc[offset..at]),
                end: true,
            });
            offset = at + self.delim.len();
        }

        // Hold back enough bytes to recognize a delimiter split across
        // chunk boundaries.
        let margin = self.acc.len().saturating_sub(self.delim.len() - 1);
        if offset < margin {
            tokens.push(Token {
                data: Bytes::copy_from_slice(&self.acc[offset..margin]),
                end: false,
            });
            self.acc.advance(margin);
        } else {
            self.acc.advance(offset);
        }
        tokens
    }

    /// Flush the buffered remainder as the final fragment of the last token.
    pub(crate) fn finish(&mut self) -> Token {
        let data = Bytes::copy_from_slice(&self.acc);
        self.acc.clear();
        Token { data, end: true }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
