//! Streaming generation decoder (SSE bytes -> [`StreamChunk`]).
//!
//! Lines prefixed `data: ` carry one JSON chunk `{text, done}`. The stream ends
//! after the first chunk with `done = true`, or when the connection closes.
//! Blank lines, comments and non-data fields are skipped.

use crate::types::StreamChunk;
use crate::{BoxStream, Error};
use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};

const DATA_PREFIX: &str = "data:";

enum Line {
    Chunk(StreamChunk),
    Skip,
    Malformed(Error),
}

fn parse_line(raw: &str) -> Line {
    let line = raw.trim();
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Line::Skip;
    };
    let payload = payload.trim_start();
    if payload.is_empty() {
        return Line::Skip;
    }
    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => Line::Chunk(chunk),
        Err(e) => Line::Malformed(
            Error::protocol(format!("Malformed stream chunk: {}", e)).with_detail("line", line),
        ),
    }
}

/// Decode one complete line. Lines are only decoded once whole, so a
/// character split across network reads is reassembled first.
fn decode_line(raw: &[u8]) -> Line {
    match std::str::from_utf8(raw) {
        Ok(line) => parse_line(line),
        Err(e) => Line::Malformed(
            Error::protocol(format!("Stream line is not valid UTF-8: {}", e))
                .with_detail("line_bytes", raw.len()),
        ),
    }
}

/// Decode a raw SSE byte stream into generation chunks.
///
/// A malformed data line yields one protocol error and ends the stream.
pub fn decode_chunks(input: BoxStream<'static, Bytes>) -> BoxStream<'static, StreamChunk> {
    let chunks = stream::unfold(
        (input, BytesMut::new(), false),
        |(mut input, mut buf, finished)| async move {
            if finished {
                return None;
            }
            loop {
                if let Some(idx) = buf.iter().position(|b| *b == b'\n') {
                    let line = buf.split_to(idx + 1);
                    match decode_line(&line) {
                        Line::Chunk(chunk) => {
                            let done = chunk.done;
                            return Some((Ok(chunk), (input, buf, done)));
                        }
                        Line::Malformed(e) => return Some((Err(e), (input, buf, true))),
                        Line::Skip => continue,
                    }
                }

                match input.next().await {
                    Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                    Some(Err(e)) => return Some((Err(e), (input, buf, true))),
                    None => {
                        // EOF: the last line may lack a trailing newline.
                        let rest = buf.split();
                        return match decode_line(&rest) {
                            Line::Chunk(chunk) => Some((Ok(chunk), (input, buf, true))),
                            Line::Malformed(e) => Some((Err(e), (input, buf, true))),
                            Line::Skip => None,
                        };
                    }
                }
            }
        },
    );
    Box::pin(chunks)
}
