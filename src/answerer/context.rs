//! Context assembly from retrieved documents.

use crate::models::RetrievedDocument;

/// Separator placed between documents in the context block.
const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Flattens a document's text onto a single line.
pub fn format_doc_text(text: &str) -> String {
    text.replace('\n', " ")
}

/// Joins the flattened texts of all documents, in retrieval order, with a
/// blank line between each pair.
///
/// An empty slice yields an empty string.
pub fn format_retrieved_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|doc| format_doc_text(&doc.text))
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}
