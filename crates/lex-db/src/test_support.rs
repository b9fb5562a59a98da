//! Shared test utilities for lex-db tests.
