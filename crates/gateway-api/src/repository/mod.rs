//! 영속 저장소 구현.

pub mod credentials;

pub use credentials::PgCredentialStore;
