// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(clippy::significant_drop_tightening)]

//! Outreach core
//!
//! Turns loosely formatted text (pasted lists, PDF page text) into a clean,
//! deduplicated set of recipient addresses, and drives a paced, sequential
//! send loop over that set behind trial/paid access control.
//!
//! # Features
//!
//! - Email extraction with repair of TLDs glued together by PDF extraction
//! - Per-page PDF text recovery that never fails the whole upload
//! - Explicit configuration object instead of process-wide globals
//! - Server-side credential store keyed by opaque session ids
//! - Trial/paid entitlement store (in memory or a single JSON file)
//! - RFC 5322 message rendering for the mail provider
//!
//! # Example
//!
//! ```rust
//! use outreach_core::{RawInput, RecipientExtractor, extract_addresses};
//!
//! let found = extract_addresses("reach out foo@example.comjane@sample.org");
//! assert_eq!(found.as_slice(), ["foo@example.com", "jane@sample.org"]);
//!
//! let input = RawInput::new("x@y.com").with_page("contact: Z@W.org");
//! let recipients = input.extract(&RecipientExtractor::default());
//! assert_eq!(recipients.len(), 2);
//! ```

mod access;
mod campaign;
mod config;
mod error;
mod extract;
mod input;
mod message;
mod pdf;
mod session;

pub use access::*;
pub use campaign::*;
pub use config::*;
pub use error::{OutreachError, PageError, Result};
pub use extract::*;
pub use input::RawInput;
pub use message::{Attachment, OutgoingMessage};
pub use pdf::PdfPages;
pub use session::*;
