//! The closed set of document kinds that own a generated PDF.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use docforge_core::{DocumentId, DomainError};

/// Kind of billing document.
///
/// Every kind exposes the same capability set (name, upload path); callers
/// select behaviour by matching on the variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Invoice,
    Proforma,
}

impl DocumentKind {
    /// All kinds, in the order the dispatch sweep visits them.
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Invoice, DocumentKind::Proforma];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::Proforma => "proforma",
        }
    }

    /// Human-readable title used on rendered documents.
    pub fn title(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "Invoice",
            DocumentKind::Proforma => "Proforma Invoice",
        }
    }

    fn directory(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoices",
            DocumentKind::Proforma => "proformas",
        }
    }

    /// Storage path of the PDF for a document of this kind.
    ///
    /// Pure function of `(kind, id)`: regenerating a document overwrites the
    /// same location.
    pub fn upload_path(&self, id: &DocumentId) -> String {
        format!("documents/{}/{}.pdf", self.directory(), id)
    }
}

impl core::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoice" => Ok(DocumentKind::Invoice),
            "proforma" => Ok(DocumentKind::Proforma),
            other => Err(DomainError::invalid_id(format!("unknown document kind: {other}"))),
        }
    }
}
