//! Persistence for account records.
//!
//! The use cases only see the [`UserRepository`] trait; the in-memory and
//! Postgres stores are picked at startup from `database.backend`.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

pub use memory::InMemoryUserRepository;
pub use models::{Account, Address, Profile, Role, TokenPair};
pub use postgres::PgUserRepository;
pub use repository::UserRepository;
