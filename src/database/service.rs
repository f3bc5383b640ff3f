//! Database service layer
//!
//! Aggregates the repositories behind one cloneable handle.

use crate::database::repositories::{
    AdminRepository, ApplicationRepository, ChatRepository, GroupRepository, MemberRepository,
    OrderRepository, PromptRepository, SecurityLogRepository, SessionRepository, StoreRepository,
    TodayStoreRepository, UserRepository,
};
use crate::database::DatabasePool;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub groups: GroupRepository,
    pub applications: ApplicationRepository,
    pub members: MemberRepository,
    pub admins: AdminRepository,
    pub stores: StoreRepository,
    pub sessions: SessionRepository,
    pub today_stores: TodayStoreRepository,
    pub orders: OrderRepository,
    pub chat: ChatRepository,
    pub security: SecurityLogRepository,
    pub prompts: PromptRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            applications: ApplicationRepository::new(pool.clone()),
            members: MemberRepository::new(pool.clone()),
            admins: AdminRepository::new(pool.clone()),
            stores: StoreRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone()),
            today_stores: TodayStoreRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            chat: ChatRepository::new(pool.clone()),
            security: SecurityLogRepository::new(pool.clone()),
            prompts: PromptRepository::new(pool),
        }
    }
}
