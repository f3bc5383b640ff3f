//! System prompt loading
//!
//! Prompts live in the database so operators can tune them without a
//! redeploy. Loaded once per name and cached in process.

use crate::database::repositories::PromptRepository;
use crate::utils::errors::OrderBuddyError;
use std::collections::HashMap;
use std::sync::Mutex;

pub const GROUP_PROMPT: &str = "group_order";
pub const PERSONAL_PROMPT: &str = "personal_assistant";
pub const APPLICATION_PROMPT: &str = "group_application";

const DEFAULT_APPLICATION_PROMPT: &str = "You are onboarding a new group for a food ordering \
service. Collect the group's name, a contact, and the group code they want to use, then emit a \
submit_application action. Reply with a JSON object holding a \"message\" string and an \
\"actions\" array.";

const DEFAULT_GROUP_PROMPT: &str = "You are a food ordering assistant for a group chat. \
Help members build their lunch orders from today's menus. \
Reply with a JSON object holding a \"message\" string and an \"actions\" array. \
Use an empty message and no actions when the conversation does not need you.";

const DEFAULT_PERSONAL_PROMPT: &str = "You are a personal food ordering assistant. \
Help the user review their order history and maintain their food preferences. \
Reply with a JSON object holding a \"message\" string and an \"actions\" array.";

pub struct PromptService {
    repository: PromptRepository,
    cache: Mutex<HashMap<String, String>>,
}

impl PromptService {
    pub fn new(repository: PromptRepository) -> Self {
        Self {
            repository,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load a prompt by name, falling back to the built-in default when
    /// no active row exists.
    pub async fn get(&self, name: &str) -> Result<String, OrderBuddyError> {
        if let Some(content) = self.cache.lock().unwrap().get(name) {
            return Ok(content.clone());
        }

        let content = match self.repository.get_by_name(name).await? {
            Some(prompt) => prompt.content,
            None => default_prompt(name).to_string(),
        };

        self.cache
            .lock()
            .unwrap()
            .insert(name.to_string(), content.clone());
        Ok(content)
    }

    /// Drop cached prompts so edited rows take effect
    pub fn invalidate(&self) {
        self.cache.lock().unwrap().clear();
    }
}

fn default_prompt(name: &str) -> &'static str {
    match name {
        PERSONAL_PROMPT => DEFAULT_PERSONAL_PROMPT,
        APPLICATION_PROMPT => DEFAULT_APPLICATION_PROMPT,
        _ => DEFAULT_GROUP_PROMPT,
    }
}
