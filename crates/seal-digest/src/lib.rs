//! Digest stage for batchseal.
//!
//! Turns an input file or directory into an ordered [`LeafSet`]: each
//! document is optionally validated against a JSON schema, unwrapped if it
//! was sealed before, salted, digested and written to a staging directory.
//!
//! Nothing here touches the final output location; the orchestrator in
//! `seal-batch` owns that.

pub mod digester;
pub mod error;
pub mod salt;
pub mod schema;
pub mod stage;

pub use digester::{DocumentDigester, FlattenedLeafDigester};
pub use error::{DigestError, DigestResult, SchemaLoadError, ValidationIssue};
pub use salt::{salt_value, unsalt_value, SaltMode};
pub use schema::{load_schema, Schema, SchemaValidator};
pub use stage::{
    digest_all, enumerate_documents, read_document, write_document, DigestOptions, Leaf, LeafSet,
    SignaturePolicy, DOCUMENT_EXTENSIONS,
};
