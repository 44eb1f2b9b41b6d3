//! Actor-based capture sink
//!
//! The sink runs as one async task that owns every batch buffer. Nothing
//! else touches the buffers, so no locking is needed.
//!
//! ```text
//!   decoder ──► bounded mpsc (CaptureRecord) ──► SinkActor ──► StorageBackend
//!                                                   │
//!                      SinkHandle (commands) ──────►│
//!                                                   ▼
//!                                       broadcast (FlushReport)
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Input**: a bounded mpsc queue; a full queue blocks the producer while
//!    a flush is in progress
//! 2. **Commands**: mpsc command channel with oneshot replies
//! 3. **Events**: flush reports on a broadcast channel

pub mod messages;
pub mod sink;
