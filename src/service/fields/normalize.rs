//! Canonical, comparable forms of extracted names, document types and dates

use chrono::NaiveDate;

use crate::model::{DocumentType, ExtractedFields, NormalizedFields};

/// Terms for a leave / temporary incapacity sheet. Checked first.
const SICK_LEAVE_TERMS: &[&str] = &[
    "sickleave",
    "sick leave",
    "sick_leave",
    "больничн",          // больничный лист
    "нетрудоспособн",    // лист временной нетрудоспособности
    "листок нетруд",
    "жарамсыздық",       // kk: еңбекке уақытша жарамсыздық парағы
];

/// Terms for an order
const ORDER_TERMS: &[&str] = &[
    "order",
    "приказ",
    "бұйрық",            // kk
];

/// Terms for a certificate / reference letter
const CERTIFICATE_TERMS: &[&str] = &[
    "certificate",
    "справк",            // справка, справку
    "анықтама",          // kk
    "reference",
];

/// Accepted date layouts, tried in order
const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Lowercase, keep only Latin/Cyrillic letters, spaces and hyphens, collapse whitespace.
///
/// `ё` folds to `е`, accented Latin letters to their base letter and
/// typographic dashes to `-`, so common spelling variants of the same name
/// compare equal.
pub fn normalize_name(raw: &str) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'ё' => Some('е'),
            c if fold_latin(c).is_some() => fold_latin(c),
            '‐' | '‑' | '‒' | '–' | '—' => Some('-'),
            c if c.is_whitespace() => Some(' '),
            '-' => Some('-'),
            c if is_name_letter(c) => Some(c),
            _ => None,
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_latin(c: char) -> Option<char> {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => 'u',
        'ý' | 'ÿ' => 'y',
        'ś' | 'š' => 's',
        'ź' | 'ż' | 'ž' => 'z',
        _ => return None,
    };
    Some(base)
}

fn is_name_letter(c: char) -> bool {
    if !c.is_alphabetic() {
        return false;
    }
    let latin = c.is_ascii_alphabetic() || ('\u{00C0}'..='\u{024F}').contains(&c);
    let cyrillic = ('\u{0400}'..='\u{04FF}').contains(&c);
    latin || cyrillic
}

/// Whether two names refer to the same person; `None` when either side is missing
pub fn names_match(a: Option<&str>, b: Option<&str>) -> Option<bool> {
    let a = normalize_name(a?);
    let b = normalize_name(b?);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some(a == b)
}

/// Map a free-text label to a canonical document type by keyword containment
pub fn canonical_document_type(label: &str) -> Option<DocumentType> {
    let label = label.to_lowercase();
    let contains_any = |terms: &[&str]| terms.iter().any(|t| label.contains(t));

    if contains_any(SICK_LEAVE_TERMS) {
        Some(DocumentType::SickLeave)
    } else if contains_any(ORDER_TERMS) {
        Some(DocumentType::Order)
    } else if contains_any(CERTIFICATE_TERMS) {
        Some(DocumentType::Certificate)
    } else {
        None
    }
}

/// First format that parses wins
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Normalize every extracted field. The document type comes from the type
/// label, falling back to the printed title.
pub fn normalize_fields(fields: &ExtractedFields) -> NormalizedFields {
    let applicant_name = fields
        .applicant_name
        .as_deref()
        .map(normalize_name)
        .filter(|n| !n.is_empty());

    let document_type = fields
        .document_type_label
        .as_deref()
        .and_then(canonical_document_type)
        .or_else(|| fields.document_title.as_deref().and_then(canonical_document_type));

    NormalizedFields {
        applicant_name,
        document_type,
        issue_date: fields.issue_date.as_deref().and_then(parse_date),
        leave_start_date: fields.leave_start_date.as_deref().and_then(parse_date),
        leave_end_date: fields.leave_end_date.as_deref().and_then(parse_date),
    }
}
