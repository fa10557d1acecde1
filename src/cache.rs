use std::cell::OnceCell;

/// A derived artifact that is either `Clean` (holding a value) or `Dirty`.
///
/// Readers compute the value on demand through a shared reference; only
/// the mutation that affects the artifact invalidates it.
#[derive(Debug)]
pub struct Cached<T> {
    value: OnceCell<T>,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self {
            value: OnceCell::new(),
        }
    }
}

impl<T> Clone for Cached<T> {
    /// Clones start dirty.
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl<T> Cached<T> {
    /// Creates a dirty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a value is held.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.value.get().is_some()
    }

    /// Marks the artifact dirty, dropping the held value.
    pub fn invalidate(&mut self) {
        self.value.take();
    }

    /// Returns the held value, computing it first if dirty.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> &T {
        self.value.get_or_init(compute)
    }
}
