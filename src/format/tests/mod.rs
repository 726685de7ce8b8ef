//! Tests for the project codec, the legacy upgrade and path handling.

mod paths_tests;
mod roundtrip_tests;
