/// Trait implemented by the read end of an output pipe.
pub trait PipeReader {
    /// Error returned by this trait.
    type Error: std::error::Error;

    /// Appends the bytes currently available in the pipe to `buf`.
    ///
    /// This function never blocks: `0` is returned when no bytes are
    /// available, and also once the write ends are all closed.
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, Self::Error>;
}
