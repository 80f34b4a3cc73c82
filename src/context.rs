use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::ports::session::Session;

/// Everything the save and inspect services need from the running process.
#[derive(Clone)]
pub struct SessionContext {
    pub session: Arc<dyn Session>,
    /// Print subscriber counts next to playlist names.
    pub show_subscribers: bool,
    pub link_base_url: String,
}

impl SessionContext {
    pub fn new(session: Arc<dyn Session>, config: &Config) -> Self {
        Self {
            session,
            show_subscribers: config.show_subscribers,
            link_base_url: config.link_base_url().to_string(),
        }
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("user", &self.session.user_name())
            .field("show_subscribers", &self.show_subscribers)
            .field("link_base_url", &self.link_base_url)
            .finish()
    }
}
