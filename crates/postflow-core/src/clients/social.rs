//! Publishers for platforms without an API integration yet

use crate::error::Result;
use crate::workflow::traits::Publisher;
use async_trait::async_trait;
use postflow_types::{Platform, Post};

/// Logs the platform text instead of calling the platform API
#[derive(Debug, Clone, Copy)]
pub struct LogOnlyPublisher {
    platform: Platform,
}

impl LogOnlyPublisher {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Publisher for LogOnlyPublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn publish(&self, post: &Post) -> Result<()> {
        log::info!("[{}] {}", self.platform, post.text_for(self.platform));
        Ok(())
    }
}
