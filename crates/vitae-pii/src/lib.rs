//! Vitae PII - Reversible masking of personal data
//!
//! Résumé text is full of contact details. Before any of it leaves the
//! process for a remote model, this crate swaps each sensitive span for a
//! synthetic token and remembers how to put it back:
//! - Email addresses: `[PII_EMAIL_n]`
//! - Phone numbers (French grouping first, then international): `[PII_PHONE_n]`
//! - Street addresses: `[PII_ADDRESS_n]`
//!
//! # Example
//!
//! ```
//! use vitae_pii::{mask, unmask};
//!
//! let masked = mask("Reach me at jane.doe@example.com");
//! assert_eq!(masked.masked, "Reach me at [PII_EMAIL_1]");
//!
//! let reply = "Contact: [PII_EMAIL_1]";
//! assert_eq!(unmask(reply, &masked.mapping), "Contact: jane.doe@example.com");
//! ```
//!
//! A [`PiiMapping`] belongs to exactly one `mask` call. Keep it for the
//! matching `unmask` and drop it afterwards.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod mapping;
mod patterns;
mod stream;

#[cfg(test)]
mod tests;

pub use codec::{contains_pii, mask, unmask, Masked};
pub use mapping::PiiMapping;
pub use patterns::PiiKind;
pub use stream::StreamUnmasker;
