//! Rendering collaborators: turn a document into artifact bytes.

use std::fmt::Write as _;
use std::sync::Arc;

use docforge_documents::Document;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// The document lacks data the layout needs.
    #[error("incomplete document: {0}")]
    Incomplete(String),
    #[error("template error: {0}")]
    Template(String),
}

pub trait Renderer: Send + Sync {
    fn render(&self, document: &Document) -> Result<Vec<u8>, RenderError>;
}

impl<R> Renderer for Arc<R>
where
    R: Renderer + ?Sized,
{
    fn render(&self, document: &Document) -> Result<Vec<u8>, RenderError> {
        (**self).render(document)
    }
}

fn money(amount: u64, currency: &str) -> String {
    format!("{}.{:02} {}", amount / 100, amount % 100, currency)
}

/// Plain-text layout of a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, document: &Document) -> Result<Vec<u8>, RenderError> {
        let number = document
            .number()
            .ok_or_else(|| RenderError::Incomplete("document has no number".to_string()))?;
        if document.lines().is_empty() {
            return Err(RenderError::Incomplete("document has no lines".to_string()));
        }

        let currency = document.currency();
        let mut out = String::new();
        let template = |e: std::fmt::Error| RenderError::Template(e.to_string());

        writeln!(out, "{} #{}", document.kind().title(), number).map_err(template)?;
        writeln!(out, "Status: {}", document.status().as_str()).map_err(template)?;
        writeln!(out, "Customer: {}", document.customer()).map_err(template)?;
        if let Some(issued_at) = document.issued_at() {
            writeln!(out, "Issued: {}", issued_at.format("%Y-%m-%d")).map_err(template)?;
        }
        writeln!(out).map_err(template)?;

        for line in document.lines() {
            let amount = line
                .amount()
                .ok_or_else(|| RenderError::Incomplete("line amount overflow".to_string()))?;
            writeln!(
                out,
                "{:<40} {:>6} x {:>14} = {:>14}",
                line.description,
                line.quantity,
                money(line.unit_price, currency),
                money(amount, currency)
            )
            .map_err(template)?;
        }

        writeln!(out).map_err(template)?;
        writeln!(out, "Total: {}", money(document.total(), currency)).map_err(template)?;

        Ok(out.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use docforge_core::{Aggregate, DocumentId};
    use docforge_documents::{DocumentCommand, DocumentKind, DocumentLine, IssueDocument};

    use super::*;

    fn issued(lines: Vec<DocumentLine>) -> Document {
        let mut doc =
            Document::draft(DocumentId::new(), DocumentKind::Invoice, "ACME", "EUR", lines).unwrap();
        let events = doc
            .handle(&DocumentCommand::Issue(IssueDocument {
                number: 42,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        doc.apply(&events[0]);
        doc
    }

    #[test]
    fn renders_header_lines_and_total() {
        let doc = issued(vec![DocumentLine {
            description: "Support plan".to_string(),
            quantity: 3,
            unit_price: 1250,
        }]);

        let text = String::from_utf8(TextRenderer.render(&doc).unwrap()).unwrap();

        assert!(text.starts_with("Invoice #42\n"));
        assert!(text.contains("Status: issued"));
        assert!(text.contains("Support plan"));
        assert!(text.contains("Total: 37.50 EUR"));
    }

    #[test]
    fn drafts_are_incomplete() {
        let doc = Document::draft(DocumentId::new(), DocumentKind::Proforma, "ACME", "EUR", vec![])
            .unwrap();
        assert!(matches!(
            TextRenderer.render(&doc),
            Err(RenderError::Incomplete(_))
        ));
    }
}
