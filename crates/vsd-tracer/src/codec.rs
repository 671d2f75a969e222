use encoding_rs::{Decoder, Encoding};

/// Converts raw bytes captured from the debuggee into text.
///
/// Two kinds of buffers reach the codec:
/// - debug strings read from the memory of a traced process, either wide
///   (UTF-16) or narrow (multi-byte, in the configured codepage);
/// - chunks of bytes read from an output pipe, always narrow.
///
/// The same narrow encoding is used for both, so that a process printing
/// the same bytes to its console and to the debug channel is rendered the
/// same way.
#[derive(Clone, Copy, Debug)]
pub struct TextCodec {
    narrow: &'static Encoding,
}

impl TextCodec {
    /// Creates a codec decoding narrow buffers with the given encoding.
    pub const fn new(narrow: &'static Encoding) -> Self {
        Self { narrow }
    }

    /// Creates a codec decoding narrow buffers as UTF-8.
    pub const fn utf8() -> Self {
        Self::new(encoding_rs::UTF_8)
    }

    /// Returns the encoding used for narrow buffers.
    pub const fn narrow_encoding(&self) -> &'static Encoding {
        self.narrow
    }

    /// Decodes a debug string read from the memory of a traced process.
    ///
    /// The text stops at the first terminator, which is never part of the
    /// returned string. Whitespace preceding the terminator is kept.
    pub fn decode_debug_string(&self, bytes: &[u8], is_wide: bool) -> String {
        if is_wide {
            decode_wide(bytes)
        } else {
            self.decode_narrow(bytes)
        }
    }

    /// Decodes a narrow buffer, up to its first NUL byte.
    pub fn decode_narrow(&self, bytes: &[u8]) -> String {
        let bytes = match bytes.iter().position(|&b| b == 0) {
            Some(end) => &bytes[..end],
            None => bytes,
        };

        let (text, _) = self.narrow.decode_without_bom_handling(bytes);
        text.into_owned()
    }

    /// Creates a stateful decoder for a byte stream (e.g., an output pipe).
    pub fn stream_decoder(&self) -> StreamDecoder {
        StreamDecoder {
            decoder: self.narrow.new_decoder_without_bom_handling(),
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::utf8()
    }
}

/// Decodes a little-endian UTF-16 buffer, up to its first NUL code unit.
///
/// A trailing odd byte (incomplete code unit) is ignored, and unpaired
/// surrogates are replaced with U+FFFD.
pub fn decode_wide(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|unit| u16::from_le_bytes([unit[0], unit[1]]))
        .take_while(|&unit| unit != 0);

    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Stateful decoder of a narrow byte stream.
///
/// Multi-byte sequences split across two reads are decoded once the
/// remaining bytes arrive.
pub struct StreamDecoder {
    decoder: Decoder,
}

impl StreamDecoder {
    /// Decodes the next chunk of the stream.
    ///
    /// Bytes of an incomplete trailing sequence are kept for the next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.decode_inner(bytes, false)
    }

    /// Flushes the bytes of an incomplete trailing sequence, if any.
    pub fn finish(&mut self) -> String {
        self.decode_inner(&[], true)
    }

    fn decode_inner(&mut self, bytes: &[u8], last: bool) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len().saturating_mul(3) + 4);

        let mut text = String::with_capacity(capacity);
        let (_, _, _) = self.decoder.decode_to_string(bytes, &mut text, last);

        text
    }
}
