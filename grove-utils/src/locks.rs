//! Thin aliases over `parking_lot`/`tokio::sync` so call sites read `SyncMutex`/`SyncRwLock`/
//! `AsyncMutex`, independent of whichever lock implementation backs them.

/// A `parking_lot::Mutex` alias for short, non-blocking-I/O critical sections.
pub type SyncMutex<T> = parking_lot::Mutex<T>;
/// A `parking_lot::RwLock` alias for state with many readers and infrequent writers.
pub type SyncRwLock<T> = parking_lot::RwLock<T>;
/// A `tokio::sync::Mutex` alias for critical sections that hold across an `.await`, e.g. a
/// write-through cache entry whose update must stay serialized with its backing-store write.
pub type AsyncMutex<T> = tokio::sync::Mutex<T>;
