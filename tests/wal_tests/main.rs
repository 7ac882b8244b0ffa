//! WAL test binary

mod recovery_tests;
