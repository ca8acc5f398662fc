//! Test fixtures for interacting with the ermis API.

pub mod alias;
pub mod ermis_client;
pub mod negotiate;
pub mod requests;

pub use alias::{AliasList, AliasObject, AliasPayload};
pub use ermis_client::{AliasLookup, ApiResponse, ErmisClient, Target};
pub use requests::RequestContext;
