//! ermis Acceptance Test Suite
//!
//! This crate provides the fixtures behind the behaviour scenarios for the ermis
//! load-balancer alias service. Scenarios create, modify, move and delete a
//! well-known test alias through the live REST API and assert on the status codes
//! and alias fields that come back, switching Kerberos identities as they go.
//!
//! # Features
//!
//! - `kerberos`: Send SPNEGO `Authorization: Negotiate` tokens from the local credential cache
//! - `acceptance`: Run the cucumber scenarios in `tests/features` (implies `kerberos`)
//!
//! # Prerequisites
//!
//! 1. Kerberos client tools in PATH (`kinit`, `klist`, `kdestroy`)
//! 2. A valid ticket of your own (it is saved first and restored at the end)
//! 3. Test account passwords in the secrets store, or `ERMIS_PASSWORD_<USER>` set
//!
//! # Usage
//!
//! ```bash
//! # Unit tests only - never contacts the service
//! cargo test -p ermis-tests
//!
//! # Full acceptance run against the configured endpoint
//! cargo test -p ermis-tests --features acceptance --test acceptance
//!
//! # Against a staging instance
//! ERMIS_API_URL=https://ermis-qa.cern.ch/api/v1/aliases \
//!     cargo test -p ermis-tests --features acceptance --test acceptance
//! ```

pub mod config;
pub mod credentials;
pub mod expectations;
pub mod fixtures;
