//! Tests for the PII codec

use super::*;

#[test]
fn test_mask_empty_input() {
    let result = mask("");
    assert_eq!(result.masked, "");
    assert!(result.mapping.is_empty());
}

#[test]
fn test_unmask_without_mapping_is_noop() {
    let text = "Nothing to restore [here]";
    assert_eq!(unmask(text, &PiiMapping::new()), text);
}

#[test]
fn test_mask_email() {
    let result = mask("Reach me at jane.doe@example.com");
    assert_eq!(result.masked, "Reach me at [PII_EMAIL_1]");
    assert_eq!(result.mapping.get("[PII_EMAIL_1]"), Some("jane.doe@example.com"));
}

#[test]
fn test_distinct_emails_get_distinct_ordinals() {
    let result = mask("a@x.io, b@y.io");
    assert_eq!(result.masked, "[PII_EMAIL_1], [PII_EMAIL_2]");
    assert_eq!(result.mapping.len(), 2);
}

#[test]
fn test_repeated_email_restored_everywhere() {
    let text = "Primary a@x.io, also a@x.io";
    let result = mask(text);

    assert_eq!(result.masked, "Primary [PII_EMAIL_1], also [PII_EMAIL_1]");
    assert_eq!(result.mapping.len(), 1);
    assert_eq!(unmask(&result.masked, &result.mapping), text);
}

#[test]
fn test_mask_french_phone() {
    let result = mask("Tél : 06 12 34 56 78");
    assert_eq!(result.masked, "Tél : [PII_PHONE_1]");
    assert_eq!(result.mapping.get("[PII_PHONE_1]"), Some("06 12 34 56 78"));

    let result = mask("+33 6 12 34 56 78");
    assert_eq!(result.masked, "[PII_PHONE_1]");
}

#[test]
fn test_mask_international_phone() {
    let result = mask("Call +1 (555) 123-4567 today");
    assert_eq!(result.masked, "Call [PII_PHONE_1] today");
    assert_eq!(result.mapping.get("[PII_PHONE_1]"), Some("+1 (555) 123-4567"));
}

#[test]
fn test_phone_kinds_share_counter() {
    let result = mask("06 12 34 56 78 or +1 (555) 123-4567");
    assert_eq!(result.masked, "[PII_PHONE_1] or [PII_PHONE_2]");
}

#[test]
fn test_date_ranges_are_not_phones() {
    let text = "Engineer 2019-2023 at Acme";
    let result = mask(text);
    assert_eq!(result.masked, text);
    assert!(result.mapping.is_empty());
    assert!(!contains_pii(text));
}

#[test]
fn test_mask_french_address() {
    let result = mask("Adresse : 12 rue de la Paix, Paris");
    assert_eq!(result.masked, "Adresse : [PII_ADDRESS_1], Paris");
    assert_eq!(result.mapping.get("[PII_ADDRESS_1]"), Some("12 rue de la Paix"));
}

#[test]
fn test_mask_english_address() {
    let result = mask("Lives at 221B Baker Street, London");
    assert_eq!(result.masked, "Lives at [PII_ADDRESS_1], London");
}

#[test]
fn test_email_takes_precedence_over_phone() {
    let result = mask("0612345678@example.com");
    assert_eq!(result.masked, "[PII_EMAIL_1]");
    assert!(result.mapping.iter().all(|(token, _)| token.starts_with("[PII_EMAIL_")));
}

#[test]
fn test_unknown_token_left_in_place() {
    let result = mask("a@x.io");
    let reply = "Sent to [PII_EMAIL_1] and [PII_EMAIL_7]";
    assert_eq!(
        unmask(reply, &result.mapping),
        "Sent to a@x.io and [PII_EMAIL_7]"
    );
}

#[test]
fn test_contains_pii() {
    assert!(contains_pii("mail me: someone@host.org"));
    assert!(contains_pii("06.12.34.56.78"));
    assert!(contains_pii("12 avenue Victor Hugo"));
    assert!(!contains_pii("Led a team of 5 engineers"));
    assert!(!contains_pii(""));
}

#[test]
fn test_mapping_serializes_as_plain_object() {
    let result = mask("a@x.io");
    let json = serde_json::to_string(&result.mapping).unwrap();
    assert_eq!(json, r#"{"[PII_EMAIL_1]":"a@x.io"}"#);

    let back: PiiMapping = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result.mapping);
}

#[test]
fn test_kind_labels() {
    assert_eq!(PiiKind::Email.label(), "EMAIL");
    assert_eq!(PiiKind::LocalePhone.label(), PiiKind::Phone.label());
    assert_eq!(PiiKind::Address.label(), "ADDRESS");
}

// ============================================================================
// StreamUnmasker
// ============================================================================

#[test]
fn test_stream_unmasker_joins_split_token() {
    let result = mask("mail: jane@ex.com");
    let mut unmasker = StreamUnmasker::new(result.mapping);

    assert_eq!(unmasker.push("Write to [PII_EM"), "Write to ");
    assert_eq!(unmasker.push("AIL_1] now"), "jane@ex.com now");
    assert_eq!(unmasker.finish(), "");
}

#[test]
fn test_stream_unmasker_releases_plain_brackets() {
    let result = mask("mail: jane@ex.com");
    let mut unmasker = StreamUnmasker::new(result.mapping);

    assert_eq!(unmasker.push("[see"), "");
    assert_eq!(unmasker.push(" notes] ok"), "[see notes] ok");
}

#[test]
fn test_stream_unmasker_releases_overlong_tail() {
    let result = mask("mail: jane@ex.com");
    let mut unmasker = StreamUnmasker::new(result.mapping);

    let long_tail = format!("[{}", "a".repeat(20));
    assert_eq!(unmasker.push(&long_tail), long_tail);
}

#[test]
fn test_stream_unmasker_finish_flushes_pending() {
    let result = mask("mail: jane@ex.com");
    let mut unmasker = StreamUnmasker::new(result.mapping);

    assert_eq!(unmasker.push("end [PII"), "end ");
    assert_eq!(unmasker.finish(), "[PII");
}

#[test]
fn test_stream_unmasker_without_mapping_passes_through() {
    let mut unmasker = StreamUnmasker::new(PiiMapping::new());
    assert_eq!(unmasker.push("[PII_EM"), "[PII_EM");
}
