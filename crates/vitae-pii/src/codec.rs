//! Mask / unmask operations

use crate::mapping::PiiMapping;
use crate::patterns::PiiKind;
use std::collections::HashMap;
use tracing::debug;

/// Result of [`mask`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Masked {
    /// Text with every detected span replaced by a token
    pub masked: String,
    /// How to reverse the replacement
    pub mapping: PiiMapping,
}

/// Replace every email, phone number and street address in `text` with a
/// `[PII_<KIND>_<n>]` token.
///
/// Categories are applied in [`PiiKind::PRECEDENCE`] order. Ordinals start
/// at 1 for each label and only count distinct originals: the same email
/// appearing twice is replaced by the same token both times.
#[must_use]
pub fn mask(text: &str) -> Masked {
    if text.is_empty() {
        return Masked::default();
    }

    let mut masked = text.to_string();
    let mut mapping = PiiMapping::new();
    let mut ordinals: HashMap<&'static str, usize> = HashMap::new();
    let mut issued: HashMap<(&'static str, String), String> = HashMap::new();

    for kind in PiiKind::PRECEDENCE {
        let label = kind.label();
        masked = replace_matches(&masked, kind, |original| {
            let key = (label, original.to_string());
            if let Some(token) = issued.get(&key) {
                return token.clone();
            }
            let ordinal = ordinals.entry(label).or_insert(0);
            *ordinal += 1;
            let token = format!("[PII_{}_{}]", label, ordinal);
            mapping.insert(token.clone(), original.to_string());
            issued.insert(key, token.clone());
            token
        });
    }

    if !mapping.is_empty() {
        debug!(tokens = mapping.len(), "Masked PII spans");
    }

    Masked { masked, mapping }
}

fn replace_matches(text: &str, kind: PiiKind, mut tokenize: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in kind.find_in(text) {
        out.push_str(&text[last..m.start()]);
        out.push_str(&tokenize(m.as_str()));
        last = m.end();
    }

    out.push_str(&text[last..]);
    out
}

/// Restore the originals recorded in `mapping`.
///
/// Every occurrence of every token is replaced. Tokens absent from the
/// mapping are left as they are, so an unexpected token in model output
/// never discards the rest of the text.
#[must_use]
pub fn unmask(text: &str, mapping: &PiiMapping) -> String {
    let mut restored = text.to_string();
    for (token, original) in mapping.iter() {
        if restored.contains(token) {
            restored = restored.replace(token, original);
        }
    }
    restored
}

/// Whether `text` contains anything [`mask`] would replace
#[must_use]
pub fn contains_pii(text: &str) -> bool {
    PiiKind::PRECEDENCE
        .iter()
        .any(|kind| kind.find_in(text).next().is_some())
}
