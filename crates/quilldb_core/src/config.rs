//! Database configuration.

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Records processed by `modify` and bulk operations between scheduler
    /// yields. Values below 1 are treated as 1.
    pub chunk_size: usize,

    /// Whether bulk operations yield to the scheduler between chunks.
    pub yield_between_chunks: bool,

    /// Whether table operations without a bound transaction open their own.
    pub implicit_transactions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            yield_between_chunks: true,
            implicit_transactions: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of records processed between yields.
    #[must_use]
    pub const fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets whether bulk operations yield between chunks.
    #[must_use]
    pub const fn yield_between_chunks(mut self, value: bool) -> Self {
        self.yield_between_chunks = value;
        self
    }

    /// Sets whether unbound operations open implicit transactions.
    #[must_use]
    pub const fn implicit_transactions(mut self, value: bool) -> Self {
        self.implicit_transactions = value;
        self
    }

    /// Returns the effective chunk size.
    #[must_use]
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}
