use crate::codec::{StreamDecoder, TextCodec};
use crate::debugger::PipeReader;

/// Standard stream a pipe is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Read end of an output pipe, along with the decoder of its byte stream.
pub(crate) struct OutputPipe<R> {
    stream: Stream,
    reader: R,
    decoder: StreamDecoder,
    buf: Vec<u8>,
}

impl<R: PipeReader> OutputPipe<R> {
    pub(crate) fn new(stream: Stream, reader: R, codec: &TextCodec) -> Self {
        Self {
            stream,
            reader,
            decoder: codec.stream_decoder(),
            buf: Vec::new(),
        }
    }

    pub(crate) const fn stream(&self) -> Stream {
        self.stream
    }

    /// Reads and decodes the bytes currently available, without blocking.
    pub(crate) fn read_text(&mut self) -> Result<Option<String>, R::Error> {
        self.buf.clear();

        if self.reader.read_available(&mut self.buf)? == 0 {
            return Ok(None);
        }

        let text = self.decoder.decode(&self.buf);
        Ok((!text.is_empty()).then_some(text))
    }

    /// Decodes the bytes of an incomplete trailing sequence, if any.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let text = self.decoder.finish();
        (!text.is_empty()).then_some(text)
    }
}
