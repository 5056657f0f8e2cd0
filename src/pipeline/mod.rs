//! Pipeline stages for ledger-to-CSV extraction.
//!
//! Each submodule implements one step. The grid stages are pure functions over
//! strings so they can be tested without a PDF; only [`pdfium`] touches the
//! C library.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pdfium/table ──▶ group ──▶ assemble ──▶ sink
//! (%PDF)    (cell grid)     (rows)    (Record)    (CSV + log)
//! ```
//!
//! 1. [`input`]    — check the path is a readable PDF before any work starts
//! 2. [`grid`]     — the [`grid::GridSource`] / [`grid::GridProvider`] seam
//! 3. [`pdfium`] + [`table`] — page objects to a rows × columns string grid
//! 4. [`group`]    — split a page's rows into per-record groups at date markers
//! 5. [`assemble`] — collapse a group into one [`crate::output::Record`]
//! 6. [`page`]     — run 4–5 for a page, isolating failures to that page
//! 7. [`chunk`]    — partition the document and walk one chunk of pages
//! 8. [`sink`]     — the append-only CSV and failure-log writer

pub mod assemble;
pub mod chunk;
pub mod grid;
pub mod group;
pub mod input;
pub mod page;
pub mod pdfium;
pub mod sink;
pub mod table;
