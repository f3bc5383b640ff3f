//! Service layer
//!
//! Business logic built on the repositories: input hygiene, price and
//! store resolution, AI gateway, and action execution.

pub mod ai;
pub mod executor;
pub mod matching;
pub mod pricing;
pub mod prompt;
pub mod sanitizer;
pub mod stores;

pub use ai::{AiAction, AiGateway, AiRequest, AiResponse, HistoryMessage, ProcessGateway};
pub use executor::{ActionExecutor, ExecutionReport, GroupContext};
pub use matching::{match_by_name, Match};
pub use pricing::{resolve_price, ResolvedPrice};
pub use prompt::{PromptService, APPLICATION_PROMPT, GROUP_PROMPT, PERSONAL_PROMPT};
pub use sanitizer::{join_reasons, sanitize, SanitizeOutcome, TriggerReason};
pub use stores::TodayStoreService;

use crate::database::DatabaseService;
use std::sync::Arc;

/// Bundles the services the message router depends on
pub struct ServiceFactory {
    pub prompts: Arc<PromptService>,
    pub today_stores: Arc<TodayStoreService>,
    pub executor: Arc<ActionExecutor>,
}

impl ServiceFactory {
    pub fn new(db: DatabaseService) -> Self {
        Self {
            prompts: Arc::new(PromptService::new(db.prompts.clone())),
            today_stores: Arc::new(TodayStoreService::new(db.clone())),
            executor: Arc::new(ActionExecutor::new(db)),
        }
    }
}
