//! Engine test binary

mod database_tests;
