//! Repository layer
//!
//! Thin data-access structs over the shared connection pool.

pub mod chat;
pub mod group;
pub mod order;
pub mod prompt;
pub mod security;
pub mod store;
pub mod user;

pub use chat::ChatRepository;
pub use group::{AdminRepository, ApplicationRepository, GroupRepository, MemberRepository};
pub use order::{OrderRepository, SessionRepository, TodayStoreRepository};
pub use prompt::PromptRepository;
pub use security::SecurityLogRepository;
pub use store::StoreRepository;
pub use user::UserRepository;
