//! Reconciliation of the applicant's claim against extracted fields and evidence

use chrono::NaiveDate;

use crate::model::{
    ApplicantClaim, ArtifactEvidence, CheckResult, MediaKind, NormalizedFields, ReconciliationCheck,
    RuleName, Verdict, VerdictError,
};

pub mod rules;

/// Everything the rules look at for one document
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationInput<'a> {
    pub claim: &'a ApplicantClaim,
    pub fields: &'a NormalizedFields,
    pub evidence: &'a ArtifactEvidence,
    pub media_kind: MediaKind,
    pub page_count: Option<usize>,
}

/// Run every rule in table order and aggregate the verdict
pub fn evaluate(input: ReconciliationInput<'_>, today: NaiveDate) -> Verdict {
    let fields = input.fields;

    let checks = vec![
        ReconciliationCheck::new(
            RuleName::NameMatch,
            rules::name_match(input.claim, fields.applicant_name.as_deref()),
        ),
        ReconciliationCheck::new(
            RuleName::DocumentTypeMatch,
            rules::document_type_match(input.claim, fields.document_type),
        ),
        ReconciliationCheck::new(
            RuleName::ValidityWindow,
            rules::validity_window(fields.document_type, fields.issue_date, today),
        ),
        ReconciliationCheck::new(
            RuleName::ArtifactPresence,
            rules::artifact_presence(input.evidence),
        ),
        ReconciliationCheck::new(
            RuleName::SinglePageDocument,
            rules::single_page_document(input.media_kind, input.page_count),
        ),
    ];

    let errors: Vec<VerdictError> = checks
        .iter()
        .filter_map(|check| check.error_code)
        .map(VerdictError::from)
        .collect();
    let overall = aggregate(&checks);

    tracing::info!(
        verdict = ?overall,
        failed = errors.len(),
        unknown = checks.iter().filter(|c| c.result == CheckResult::Unknown).count(),
        "Reconciliation complete"
    );

    Verdict {
        overall,
        checks,
        errors,
    }
}

/// Any `Fail` wins; otherwise `Pass` if at least one rule was decided; otherwise `Unknown`
pub fn aggregate(checks: &[ReconciliationCheck]) -> CheckResult {
    if checks.iter().any(|c| c.result == CheckResult::Fail) {
        CheckResult::Fail
    } else if checks.iter().any(|c| c.result == CheckResult::Pass) {
        CheckResult::Pass
    } else {
        CheckResult::Unknown
    }
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;
    use crate::model::{ArtifactSignal, DocumentType, ErrorCode, ExtractedFields, Tristate};
    use crate::service::fields::normalize_fields;

    fn check(result: CheckResult) -> ReconciliationCheck {
        ReconciliationCheck::new(RuleName::NameMatch, result)
    }

    #[test]
    fn test_fail_dominates() {
        let checks = [
            check(CheckResult::Pass),
            check(CheckResult::Unknown),
            check(CheckResult::Fail),
            check(CheckResult::Pass),
        ];
        assert_eq!(aggregate(&checks), CheckResult::Fail);
    }

    #[test]
    fn test_all_unknown_is_unknown() {
        let checks = vec![check(CheckResult::Unknown); 5];
        assert_eq!(aggregate(&checks), CheckResult::Unknown);
        assert_eq!(aggregate(&[]), CheckResult::Unknown);
    }

    #[test]
    fn test_pass_with_some_unknown() {
        let checks = [check(CheckResult::Pass), check(CheckResult::Unknown)];
        assert_eq!(aggregate(&checks), CheckResult::Pass);
    }

    #[test]
    fn test_certificate_with_stamp_passes() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let issued = today.checked_sub_days(Days::new(8)).unwrap();
        let claim = ApplicantClaim {
            full_name: "Иванова Анна".to_string(),
            document_type: DocumentType::Certificate,
        };
        let fields = normalize_fields(&ExtractedFields {
            applicant_name: Some("ИВАНОВА  Анна".to_string()),
            document_type_label: Some("Справка".to_string()),
            issue_date: Some(issued.format("%d.%m.%Y").to_string()),
            ..ExtractedFields::default()
        });
        let evidence = ArtifactEvidence {
            stamp: ArtifactSignal {
                present: Tristate::True,
                confidence: Some(90.0),
            },
            ..ArtifactEvidence::default()
        };

        let verdict = evaluate(
            ReconciliationInput {
                claim: &claim,
                fields: &fields,
                evidence: &evidence,
                media_kind: MediaKind::Image,
                page_count: None,
            },
            today,
        );

        assert_eq!(verdict.overall, CheckResult::Pass);
        assert!(verdict.errors.is_empty());
        let results: Vec<_> = verdict.checks.iter().map(|c| (c.rule, c.result)).collect();
        assert_eq!(
            results,
            vec![
                (RuleName::NameMatch, CheckResult::Pass),
                (RuleName::DocumentTypeMatch, CheckResult::Pass),
                (RuleName::ValidityWindow, CheckResult::Pass),
                (RuleName::ArtifactPresence, CheckResult::Pass),
                (RuleName::SinglePageDocument, CheckResult::Unknown),
            ]
        );
    }

    #[test]
    fn test_failures_map_to_error_codes_in_rule_order() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let claim = ApplicantClaim {
            full_name: "Иванова Анна".to_string(),
            document_type: DocumentType::SickLeave,
        };
        let fields = normalize_fields(&ExtractedFields {
            applicant_name: Some("Петров Пётр".to_string()),
            document_type_label: Some("Приказ".to_string()),
            issue_date: Some("01.01.2023".to_string()),
            ..ExtractedFields::default()
        });
        let evidence = ArtifactEvidence {
            stamp: ArtifactSignal {
                present: Tristate::False,
                confidence: Some(10.0),
            },
            qr_code: ArtifactSignal {
                present: Tristate::False,
                confidence: Some(5.0),
            },
            ..ArtifactEvidence::default()
        };

        let verdict = evaluate(
            ReconciliationInput {
                claim: &claim,
                fields: &fields,
                evidence: &evidence,
                media_kind: MediaKind::Pdf,
                page_count: Some(2),
            },
            today,
        );

        assert_eq!(verdict.overall, CheckResult::Fail);
        let codes: Vec<_> = verdict.errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::ForeignApplicant,
                ErrorCode::InvalidFormat,
                ErrorCode::Outdated,
                ErrorCode::MissingConfirmation,
                ErrorCode::MultipleDocuments,
            ]
        );
    }

    #[test]
    fn test_empty_fields_give_unknown_verdict() {
        let claim = ApplicantClaim {
            full_name: "Иванова Анна".to_string(),
            document_type: DocumentType::Order,
        };
        let verdict = evaluate(
            ReconciliationInput {
                claim: &claim,
                fields: &NormalizedFields::default(),
                evidence: &ArtifactEvidence::default(),
                media_kind: MediaKind::Image,
                page_count: None,
            },
            NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
        );

        assert_eq!(verdict.overall, CheckResult::Unknown);
        assert!(verdict.errors.is_empty());
        assert!(verdict.checks.iter().all(|c| c.result == CheckResult::Unknown));
    }
}
