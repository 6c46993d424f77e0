//! Pipeline stages for document translation.
//!
//! Each submodule implements exactly one transformation step. The stages are
//! pure or I/O-isolated so each is testable on its own; the
//! [`crate::orchestrator`] sequences them and owns every store interaction.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ chunk ──▶ translate ──┬──▶ pdf  ──▶ .pdf bytes
//! (lossy)    (≤500)    (HTTP)      └──▶ docx ──▶ .docx bytes
//! ```
//!
//! 1. [`extract`]  : recover printable lines from arbitrary original bytes
//! 2. [`chunk`]    : split text into bounded, ordered segments
//! 3. [`translate`]: call the translation service with retry/backoff and
//!    reassemble by index; the only stage with network I/O
//! 4. [`pdf`]      : paginated PDF from the translated lines
//! 5. [`docx`]     : packaged word-processor document from the same lines
//!
//! [`input`] sits outside the flow: it loads a local path or URL for the CLI.

pub mod chunk;
pub mod docx;
pub mod extract;
pub mod input;
pub mod pdf;
pub mod translate;
