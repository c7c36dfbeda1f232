/// Append-only accumulator for the payload of one transfer.
#[derive(Debug, Default)]
pub struct TransferBuffer {
    data: Vec<u8>,
}

impl TransferBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` after everything received so far.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Drops all accumulated bytes.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns an owned copy of the accumulated bytes.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.clone()
    }

    /// Moves the accumulated bytes out, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }
}
