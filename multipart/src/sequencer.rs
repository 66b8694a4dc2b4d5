use bytes::{Bytes, BytesMut};

use crate::headers::{HeaderBlock, Headers};
use crate::tokenizer::{Token, Tokenizer};
use crate::MultipartError;

/// Parser output, in stream order.
///
/// Every part is a `Headers`, zero or more `Body` fragments, then `End`.
#[derive(Debug)]
pub(crate) enum Event {
    Headers(Headers),
    Body(Bytes),
    End,
}

enum PartPhase {
    Headers(HeaderBlock),
    Body,
}

/// Assembles one part from the fragments of its boundary-delimited token.
///
/// Everything up to the first blank line is the header block; the rest of
/// the token is the body, passed through verbatim.
struct PartAssembler {
    phase: PartPhase,
}

impl PartAssembler {
    fn new() -> Self {
        Self {
            phase: PartPhase::Headers(HeaderBlock::default()),
        }
    }

    fn push(&mut self, chunk: Bytes, out: &mut Vec<Event>) -> Result<(), MultipartError> {
        match &mut self.phase {
            PartPhase::Headers(block) => {
                block.push(&chunk)?;
                if let Some(at) = block.terminator() {
                    out.push(Event::Headers(block.parse(at)?));
                    let body = block.body_start(at);
                    if !body.is_empty() {
                        out.push(Event::Body(Bytes::copy_from_slice(body)));
                    }
                    self.phase = PartPhase::Body;
                }
            }
            PartPhase::Body => {
                if !chunk.is_empty() {
                    out.push(Event::Body(chunk));
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<Event>) -> Result<(), MultipartError> {
        // A part without a blank line is all headers and has an empty body.
        if let PartPhase::Headers(block) = &self.phase {
            out.push(Event::Headers(block.parse(block.len())?));
        }
        out.push(Event::End);
        Ok(())
    }
}

enum Stage {
    Preamble,
    Parts,
    Epilogue,
}

/// Streaming `multipart/*` parser core.
///
/// Input chunks may split boundaries, headers, and bodies at any byte.
/// Bytes before the first boundary are the preamble and are discarded, even
/// when empty; `--` right after a boundary ends the parts and everything
/// after it is discarded as the epilogue.
pub(crate) struct Sequencer {
    tokenizer: Tokenizer,
    stage: Stage,
    current: Option<PartAssembler>,
    // First bytes of a token, buffered until we can tell a part from the
    // `--` terminator.
    pending: BytesMut,
}

impl Sequencer {
    pub(crate) fn new(boundary: &str) -> Self {
        let mut tokenizer = Tokenizer::new(format!("\r\n--{boundary}").as_bytes());
        // The first boundary line is not preceded by CRLF; seeding one lets
        // the delimiter match at the very start of the stream.
        let seeded = tokenizer.push(b"\r\n");
        debug_assert!(seeded.is_empty());
        Self {
            tokenizer,
            stage: Stage::Preamble,
            current: None,
            pending: BytesMut::new(),
        }
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) -> Result<Vec<Event>, MultipartError> {
        let mut out = Vec::new();
        for token in self.tokenizer.push(chunk) {
            self.token(token, &mut out)?;
        }
        Ok(out)
    }

    pub(crate) fn finish(&mut self) -> Result<Vec<Event>, MultipartError> {
        let mut out = Vec::new();
        let token = self.tokenizer.finish();
        self.token(token, &mut out)?;
        Ok(out)
    }

    fn token(&mut self, token: Token, out: &mut Vec<Event>) -> Result<(), MultipartError> {
        match self.stage {
            Stage::Preamble => {
                if token.end {
                    self.stage = Stage::Parts;
                }
            }
            Stage::Epilogue => {}
            Stage::Parts => {
                match &mut self.current {
                    Some(assembler) => assembler.push(token.data, out)?,
                    None => {
                        self.pending.extend_from_slice(&token.data);
                        if self.pending.len() < 2 && !token.end {
                            return Ok(());
                        }
                        if self.pending.starts_with(b"--") {
                            self.stage = Stage::Epilogue;
                            self.pending.clear();
                            return Ok(());
                        }
                        let buffered = self.pending.split().freeze();
                        let mut assembler = PartAssembler::new();
                        assembler.push(buffered, out)?;
                        self.current = Some(assembler);
                    }
                }
                if token.end {
                    if let Some(mut assembler) = self.current.take() {
                        assembler.finish(out)?;
                    }
                }
            }
        }
        Ok(())
    }
}
