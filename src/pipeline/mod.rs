//! Pipeline stages for exam-paper analysis.
//!
//! Each submodule implements one step, so each can be tested on its own
//! and the external call can be swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ request ──▶ llm ──▶ validate
//! (base64)   (parts +    (one     (schema
//!             schema)     call)    check)
//! ```
//!
//! 1. [`intake`]   — read paths/URLs, detect MIME type, base64-encode
//! 2. [`request`]  — ordered inline parts, trailing instruction, system
//!    instruction and output schema
//! 3. [`llm`]      — the only stage with network I/O; no retry
//! 4. [`validate`] — parse JSON and walk it against the schema

pub mod intake;
pub mod llm;
pub mod request;
pub mod validate;
