//! # Roost Testkit
//!
//! Testing utilities for Roost.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known messages whose canonical text must stay byte-stable
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! Golden vectors pin down the canonical rendering and the multihash derived from it:
//!
//! ```rust
//! use roost_testkit::vectors::{all_vectors, generate_message_from_vector};
//!
//! for vector in all_vectors() {
//!     let message = generate_message_from_vector(&vector);
//!     println!("{}: {}", vector.name, message.multihash());
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use roost_testkit::generators::{message_from_params, MessageParams};
//!
//! proptest! {
//!     #[test]
//!     fn multihash_is_deterministic(params: MessageParams) {
//!         let m1 = message_from_params(&params);
//!         let m2 = message_from_params(&params);
//!         prop_assert_eq!(m1.multihash(), m2.multihash());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use roost_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let message = fixture.db.add_message("hello", [("foo", "bar")]).unwrap();
//! assert_eq!(message.depth(), 0);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, sign_record, TestFixture};
pub use generators::{message_from_params, MessageParams};
pub use vectors::{all_vectors, generate_message_from_vector, verify_all_vectors, GoldenVector};
