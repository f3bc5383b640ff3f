//! Message handlers
//!
//! Parsing, canned replies, and the router that ties group, admin,
//! application and one-on-one flows together.

pub mod admin;
pub mod application;
pub mod commands;
pub mod personal;
pub mod replies;
pub mod router;

pub use admin::AdminHandler;
pub use application::ApplicationHandler;
pub use commands::{
    parse_admin_command, parse_personal_command, parse_quick_command, should_respond,
    AdminCommand, PersonalCommand, QuickCommand,
};
pub use personal::PersonalHandler;
pub use router::{IncomingMessage, MessageRouter};
