pub(crate) const READ_BUF_SIZE: usize = 4096;

/// Fixed-size read buffer with mark/limit cursors.
///
/// Bytes between `mark` and `limit` are unconsumed input. Before each refill
/// the consumed prefix is shifted out so the free region at the tail is as
/// large as possible.
pub(crate) struct ReadBuffer {
    buf: [u8; READ_BUF_SIZE],
    mark: usize,
    limit: usize,
}

impl ReadBuffer {
    pub fn new() -> Self {
        Self {
            buf: [0; READ_BUF_SIZE],
            mark: 0,
            limit: 0,
        }
    }

    pub fn available(&self) -> usize {
        self.limit - self.mark
    }

    /// Discards the consumed prefix, moving unread bytes to the front.
    pub fn compact(&mut self) {
        if self.mark != 0 {
            self.buf.copy_within(self.mark..self.limit, 0);
            self.limit -= self.mark;
            self.mark = 0;
        }
    }

    /// The free region a transport callback may fill.
    pub fn space(&mut self) -> &mut [u8] {
        &mut self.buf[self.limit..]
    }

    /// Records `n` bytes written into `space()`.
    pub fn extend(&mut self, n: usize) {
        debug_assert!(self.limit + n <= READ_BUF_SIZE);
        self.limit += n;
    }

    /// Consumes `n` unread bytes, returning them.
    pub fn take(&mut self, n: usize) -> &[u8] {
        debug_assert!(n <= self.available());
        let start = self.mark;
        self.mark += n;
        &self.buf[start..self.mark]
    }

    /// Consumes `n` unread bytes with mutable access, for in-place unmasking.
    pub fn take_mut(&mut self, n: usize) -> &mut [u8] {
        debug_assert!(n <= self.available());
        let start = self.mark;
        self.mark += n;
        &mut self.buf[start..self.mark]
    }
}
