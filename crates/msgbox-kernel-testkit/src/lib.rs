//! # Message Box Kernel Testkit
//!
//! Testing utilities for the Message Box Kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Scenario vectors**: Batches with known final watermarks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A deterministic genesis, attester and message helpers
//!
//! ## Scenario Vectors
//!
//! ```rust
//! use msgbox_kernel_testkit::fixtures::TestFixture;
//! use msgbox_kernel_testkit::vectors::{all_vectors, run_vector};
//!
//! let fixture = TestFixture::new();
//! let builder = fixture.builder();
//! let resolver = fixture.resolver();
//!
//! for vector in all_vectors() {
//!     let watermark = run_vector(&builder, &resolver, &vector).unwrap();
//!     assert_eq!(watermark.get(), vector.expected);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use msgbox_kernel_testkit::generators::{expected_watermark, message_stream};
//!
//! proptest! {
//!     #[test]
//!     fn chain_matches_classification(stream in message_stream(32)) {
//!         let expected = expected_watermark(0, &stream);
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    credentialed, inverted_location, location, valid_run, TestFixture, GENESIS_AGENT,
    GENESIS_CODE,
};
pub use generators::{classified_message, expected_watermark, message_stream, Expect};
pub use vectors::{all_vectors, reshuffled, run_vector, vectors_json, ScenarioVector};
