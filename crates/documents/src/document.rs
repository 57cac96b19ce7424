use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docforge_core::{Aggregate, AggregateRoot, DocumentId, DomainError, DomainResult};

use crate::kind::DocumentKind;
use crate::pdf::PdfRecord;

/// Document status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Issued,
    Paid,
    Canceled,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Issued => "issued",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Canceled => "canceled",
        }
    }
}

/// A billed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLine {
    pub description: String,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl DocumentLine {
    pub fn amount(&self) -> Option<u64> {
        self.unit_price.checked_mul(u64::from(self.quantity))
    }
}

/// Aggregate root: a billing document (invoice or proforma).
///
/// The PDF record is not part of the serialized body; repositories persist it
/// separately so the generation pipeline can update it atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    kind: DocumentKind,
    status: DocumentStatus,
    number: Option<u64>,
    customer: String,
    currency: String,
    lines: Vec<DocumentLine>,
    issued_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    pdf: Option<PdfRecord>,
}

impl Document {
    /// Create a new draft. Drafts never own a PDF record.
    pub fn draft(
        id: DocumentId,
        kind: DocumentKind,
        customer: impl Into<String>,
        currency: impl Into<String>,
        lines: Vec<DocumentLine>,
    ) -> DomainResult<Self> {
        let customer = customer.into();
        if customer.trim().is_empty() {
            return Err(DomainError::validation("customer must not be empty"));
        }
        let currency = currency.into();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(
                "currency must be a three-letter ISO code",
            ));
        }

        Ok(Self {
            id,
            kind,
            status: DocumentStatus::Draft,
            number: None,
            customer,
            currency,
            lines,
            issued_at: None,
            paid_at: None,
            canceled_at: None,
            version: 0,
            pdf: None,
        })
    }

    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn number(&self) -> Option<u64> {
        self.number
    }

    pub fn customer(&self) -> &str {
        &self.customer
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn lines(&self) -> &[DocumentLine] {
        &self.lines
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn canceled_at(&self) -> Option<DateTime<Utc>> {
        self.canceled_at
    }

    /// Sum of line amounts, saturating on overflow (issuance rejects overflowing documents).
    pub fn total(&self) -> u64 {
        self.lines
            .iter()
            .map(|l| l.amount().unwrap_or(u64::MAX))
            .fold(0u64, |acc, a| acc.saturating_add(a))
    }

    pub fn pdf(&self) -> Option<&PdfRecord> {
        self.pdf.as_ref()
    }

    pub fn upload_path(&self) -> String {
        self.kind.upload_path(&self.id)
    }

    /// Attach the persisted PDF record (repository rehydration).
    pub fn with_pdf(mut self, pdf: Option<PdfRecord>) -> Self {
        self.pdf = pdf;
        self
    }
}

impl AggregateRoot for Document {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: IssueDocument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDocument {
    pub number: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PayDocument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayDocument {
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelDocument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelDocument {
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentCommand {
    Issue(IssueDocument),
    Pay(PayDocument),
    Cancel(CancelDocument),
}

/// Event: DocumentIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIssued {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub number: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocumentPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPaid {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocumentCanceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCanceled {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentEvent {
    Issued(DocumentIssued),
    Paid(DocumentPaid),
    Canceled(DocumentCanceled),
}

impl DocumentEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DocumentEvent::Issued(_) => "documents.document.issued",
            DocumentEvent::Paid(_) => "documents.document.paid",
            DocumentEvent::Canceled(_) => "documents.document.canceled",
        }
    }

    /// Whether the event changes what the rendered PDF shows.
    ///
    /// Status is printed on every document, so all current transitions do.
    pub fn invalidates_pdf(&self) -> bool {
        match self {
            DocumentEvent::Issued(_) | DocumentEvent::Paid(_) | DocumentEvent::Canceled(_) => {
                true
            }
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DocumentEvent::Issued(e) => e.occurred_at,
            DocumentEvent::Paid(e) => e.occurred_at,
            DocumentEvent::Canceled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Document {
    type Command = DocumentCommand;
    type Event = DocumentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DocumentEvent::Issued(e) => {
                self.status = DocumentStatus::Issued;
                self.number = Some(e.number);
                self.issued_at = Some(e.occurred_at);
                // Issuance is the moment a document starts requiring a PDF.
                self.pdf = Some(PdfRecord::new(self.kind.upload_path(&self.id)));
            }
            DocumentEvent::Paid(e) => {
                self.status = DocumentStatus::Paid;
                self.paid_at = Some(e.occurred_at);
                self.invalidate_pdf();
            }
            DocumentEvent::Canceled(e) => {
                self.status = DocumentStatus::Canceled;
                self.canceled_at = Some(e.occurred_at);
                self.invalidate_pdf();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DocumentCommand::Issue(cmd) => self.handle_issue(cmd),
            DocumentCommand::Pay(cmd) => self.handle_pay(cmd),
            DocumentCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Document {
    fn invalidate_pdf(&mut self) {
        if let Some(pdf) = self.pdf.as_mut() {
            pdf.mark_dirty();
        }
    }

    fn ensure_issued(&self, action: &str) -> Result<(), DomainError> {
        if self.status != DocumentStatus::Issued {
            return Err(DomainError::invalid_transition(format!(
                "cannot {action} a {} document",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    fn handle_issue(&self, cmd: &IssueDocument) -> Result<Vec<DocumentEvent>, DomainError> {
        if self.status != DocumentStatus::Draft {
            return Err(DomainError::invalid_transition(format!(
                "cannot issue a {} document",
                self.status.as_str()
            )));
        }
        if cmd.number == 0 {
            return Err(DomainError::validation("document number must be positive"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot issue a document without lines"));
        }

        let mut total: u64 = 0;
        for line in &self.lines {
            if line.quantity == 0 {
                return Err(DomainError::validation("line quantity must be positive"));
            }
            let amount = line
                .amount()
                .ok_or_else(|| DomainError::validation("line amount overflow"))?;
            total = total
                .checked_add(amount)
                .ok_or_else(|| DomainError::validation("document total overflow"))?;
        }

        Ok(vec![DocumentEvent::Issued(DocumentIssued {
            document_id: self.id,
            kind: self.kind,
            number: cmd.number,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_pay(&self, cmd: &PayDocument) -> Result<Vec<DocumentEvent>, DomainError> {
        if self.kind != DocumentKind::Invoice {
            return Err(DomainError::invalid_transition(format!(
                "a {} cannot be paid",
                self.kind.title().to_lowercase()
            )));
        }
        self.ensure_issued("pay")?;

        Ok(vec![DocumentEvent::Paid(DocumentPaid {
            document_id: self.id,
            kind: self.kind,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelDocument) -> Result<Vec<DocumentEvent>, DomainError> {
        self.ensure_issued("cancel")?;

        Ok(vec![DocumentEvent::Canceled(DocumentCanceled {
            document_id: self.id,
            kind: self.kind,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
