//! CI/local test-run configuration shared across property-test suites.

pub mod property_test_profile;
