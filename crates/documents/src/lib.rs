//! Billing documents module.
//!
//! This crate contains the document lifecycle (draft, issued, paid, canceled) and
//! the PDF record each issued document owns, implemented purely as deterministic
//! domain logic (no IO, no rendering, no storage).

pub mod document;
pub mod kind;
pub mod pdf;

pub use document::{
    CancelDocument, Document, DocumentCanceled, DocumentCommand, DocumentEvent, DocumentIssued,
    DocumentLine, DocumentPaid, DocumentStatus, IssueDocument, PayDocument,
};
pub use kind::DocumentKind;
pub use pdf::{CleanOutcome, PdfRecord};
