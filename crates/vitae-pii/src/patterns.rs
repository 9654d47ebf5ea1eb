//! Detection patterns
//!
//! Patterns are compiled once and shared. [`PiiKind::PRECEDENCE`] fixes the
//! order in which categories claim text, so a span already replaced by an
//! earlier category is never matched again.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Fewest digits a generic phone number may carry
const MIN_PHONE_DIGITS: usize = 9;

/// Most digits a generic phone number may carry (E.164 limit)
const MAX_PHONE_DIGITS: usize = 15;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .expect("EMAIL_RE is a compile-time constant")
});

// 06 12 34 56 78, 06.12.34.56.78, 0612345678, +33 6 12 34 56 78, 0033612345678
static LOCALE_PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(?:\+|\b00)33[\s.-]?(?:\(0\)[\s.-]?)?|\b0)[1-9](?:[\s.-]?\d{2}){4}\b")
        .expect("LOCALE_PHONE_RE is a compile-time constant")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{1,4}\)[\s.-]?)?\b\d{2,4}(?:[\s.-]?\d{2,4}){1,4}\b")
        .expect("PHONE_RE is a compile-time constant")
});

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b\d{1,5}[a-z]?(?:\s+(?:bis|ter))?,?\s+",
        r"(?:",
        // 12 rue de la Paix
        r"(?:rue|avenue|av\.|boulevard|bd|place|chemin|allée|allee|impasse|quai|route|square)",
        r"(?:\s+[\p{L}'’-]+){1,5}",
        r"|",
        // 221 Baker Street
        r"(?:[\p{L}'’-]+\s+){1,3}",
        r"(?:(?:street|avenue|road|lane|drive|boulevard|court|way)\b|(?:st|ave|rd|blvd)\.)",
        r")",
    ))
    .expect("ADDRESS_RE is a compile-time constant")
});

/// Category of personal data recognised by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiKind {
    /// Email address
    Email,
    /// Phone number in French digit grouping
    LocalePhone,
    /// Any other phone number with 9 to 15 digits
    Phone,
    /// Street address
    Address,
}

impl PiiKind {
    /// Masking order. Earlier kinds claim their spans first.
    pub const PRECEDENCE: [PiiKind; 4] = [
        PiiKind::Email,
        PiiKind::LocalePhone,
        PiiKind::Phone,
        PiiKind::Address,
    ];

    /// Label embedded in the token text
    ///
    /// Both phone kinds share `PHONE`, and therefore one ordinal counter.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::LocalePhone | Self::Phone => "PHONE",
            Self::Address => "ADDRESS",
        }
    }

    pub(crate) fn regex(&self) -> &'static Regex {
        match self {
            Self::Email => &EMAIL_RE,
            Self::LocalePhone => &LOCALE_PHONE_RE,
            Self::Phone => &PHONE_RE,
            Self::Address => &ADDRESS_RE,
        }
    }

    /// Extra acceptance check applied to a raw pattern match
    ///
    /// The generic phone pattern also matches date ranges such as
    /// `2019-2023`, so it only accepts plausible digit counts.
    pub(crate) fn accepts(&self, candidate: &str) -> bool {
        match self {
            Self::Phone => {
                let digits = candidate.chars().filter(char::is_ascii_digit).count();
                (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
            }
            _ => true,
        }
    }

    /// Accepted matches of this kind in `text`, in order
    pub(crate) fn find_in(self, text: &str) -> impl Iterator<Item = regex::Match<'_>> {
        self.regex()
            .find_iter(text)
            .filter(move |m| self.accepts(m.as_str()))
    }
}
