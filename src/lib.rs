// SPDX-License-Identifier: MPL-2.0

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Client-side encoder for Prio: https://crypto.stanford.edu/prio/
//!
//! A client reports a set of boolean (or bit-encoded integer) measurements to two aggregation
//! servers. The measurements are encoded into a vector of field elements, split into two
//! additive shares, accompanied by a split proof that every element is 0 or 1, and each side's
//! shares are encrypted under that server's public key. Neither server alone learns anything
//! about the measurements, both can check the proof together, and summing accepted shares
//! yields only the aggregate.
//!
//! ```no_run
//! use prio_encoder::{encode, MeasurementSet};
//!
//! # fn main() -> Result<(), prio_encoder::EncodeError> {
//! # let (public_key_a, public_key_b) = ([9u8; 32], [9u8; 32]);
//! let measurements: MeasurementSet = [
//!     ("browserIsUserDefault".to_string(), 1),
//!     ("newTabPageEnabled".to_string(), 0),
//!     ("userChromeCssLoaded".to_string(), 1),
//! ]
//! .into();
//! let packet = encode(b"2021-01-01", &public_key_a, &public_key_b, &measurements)?;
//! println!("{} {}", packet.a().len(), packet.b().len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod encode;
pub mod encrypt;
pub mod field;
mod fp;
pub mod packet;
mod polynomial;
pub mod proof;
pub mod schema;
pub mod share;
#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod verify;

pub use client::{encode, encode_with_schema, Client, EncodeError};
pub use encode::MeasurementSet;
pub use encrypt::{PrivateKey, PublicKey};
pub use packet::Packet;
pub use schema::{Metric, MetricKind, MetricSchema};
