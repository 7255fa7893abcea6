//! Prompts for field extraction

use crate::model::ExtractedFields;

/// Fixed instruction for the field-extraction model
const FIELD_EXTRACTION_INSTRUCTION: &str = r#"You read OCR text of scanned supporting documents attached to loan deferment requests. Documents are usually in Russian, sometimes in Kazakh or English.

## Task

Extract the following fields and answer with a single JSON object, nothing else:

- "applicantName": full name of the person the document was issued to, as written (surname first if so printed)
- "documentType": one of "SickLeave" (sick leave sheet / лист временной нетрудоспособности / больничный), "Order" (приказ), "Certificate" (справка)
- "documentTitle": the document title exactly as printed
- "issueDate": date the document was issued
- "leaveStartDate": start of the leave period, if any
- "leaveEndDate": end of the leave period, if any

## Rules

1. Dates must be formatted as DD.MM.YYYY.
2. Use null for any field that is not present in the text. Never guess.
3. Copy names exactly as printed; do not translate or transliterate them.
4. Do not wrap the JSON in markdown or add commentary.

## Output schema
"#;

/// System prompt: instruction followed by the JSON schema of [`ExtractedFields`]
pub fn field_extraction_preamble() -> String {
    let schema = schemars::schema_for!(ExtractedFields);
    let schema_json = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!("{}\n{}\n", FIELD_EXTRACTION_INSTRUCTION, schema_json)
}

/// User prompt carrying the recognized document text
pub fn build_extraction_prompt(text: &str) -> String {
    format!(
        "Document text (OCR, one recognized line per row):\n\n{}\n\nReturn the JSON object now.",
        text
    )
}
