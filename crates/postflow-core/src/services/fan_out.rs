//! Concurrent publishing of an approved post

use crate::workflow::traits::Publisher;
use futures::future::join_all;
use postflow_types::{Platform, Post, PublishStatus};
use std::sync::Arc;

/// Dispatches one post to every configured platform at once.
/// A failing platform never affects the others.
#[derive(Clone, Default)]
pub struct PublishFanOut {
    publishers: Vec<Arc<dyn Publisher>>,
}

impl PublishFanOut {
    pub fn new(publishers: Vec<Arc<dyn Publisher>>) -> Self {
        Self { publishers }
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.publishers.iter().map(|p| p.platform()).collect()
    }

    /// Publish everywhere; results are in publisher order
    pub async fn publish(&self, post: &Post) -> Vec<PublishStatus> {
        let attempts = self.publishers.iter().map(|publisher| async move {
            let platform = publisher.platform();
            match publisher.publish(post).await {
                Ok(()) => {
                    log::info!("Published '{}' to {}", post.title, platform);
                    PublishStatus::succeeded(platform)
                }
                Err(e) => {
                    log::error!("Publishing '{}' to {} failed: {}", post.title, platform, e);
                    PublishStatus::failed(platform, e.to_string())
                }
            }
        });

        join_all(attempts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PostflowError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakePublisher {
        platform: Platform,
        fail: bool,
        delay: Duration,
        published: AtomicUsize,
    }

    impl FakePublisher {
        fn new(platform: Platform, fail: bool, delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                platform,
                fail,
                delay: Duration::from_millis(delay_ms),
                published: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn publish(&self, _post: &Post) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(PostflowError::Publish {
                    platform: self.platform.to_string(),
                    reason: "token expired".to_string(),
                });
            }
            self.published.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_one_failure_is_isolated() {
        let linkedin = FakePublisher::new(Platform::LinkedIn, false, 30);
        let instagram = FakePublisher::new(Platform::Instagram, true, 0);
        let facebook = FakePublisher::new(Platform::Facebook, false, 10);
        let twitter = FakePublisher::new(Platform::Twitter, false, 0);

        let publishers: Vec<Arc<dyn Publisher>> = vec![
            linkedin.clone(),
            instagram.clone(),
            facebook.clone(),
            twitter.clone(),
        ];
        let fan_out = PublishFanOut::new(publishers);

        let results = fan_out.publish(&Post::new("Launch", "We are live")).await;

        assert_eq!(results.len(), 4);
        assert_eq!(results.iter().filter(|r| r.success).count(), 3);

        let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].platform, Platform::Instagram);
        assert!(failed[0].error.as_deref().unwrap().contains("token expired"));

        // Successful publications stay done
        assert_eq!(linkedin.published.load(Ordering::SeqCst), 1);
        assert_eq!(facebook.published.load(Ordering::SeqCst), 1);
        assert_eq!(twitter.published.load(Ordering::SeqCst), 1);
        assert_eq!(instagram.published.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_results_keep_publisher_order() {
        let publishers: Vec<Arc<dyn Publisher>> = vec![
            FakePublisher::new(Platform::Twitter, false, 20),
            FakePublisher::new(Platform::LinkedIn, false, 0),
        ];
        let fan_out = PublishFanOut::new(publishers);

        let results = fan_out.publish(&Post::new("t", "x")).await;
        let platforms: Vec<_> = results.iter().map(|r| r.platform).collect();
        assert_eq!(platforms, vec![Platform::Twitter, Platform::LinkedIn]);
        assert_eq!(fan_out.platforms(), platforms);
    }

    #[tokio::test]
    async fn test_publishers_run_concurrently() {
        let publishers: Vec<Arc<dyn Publisher>> = vec![
            FakePublisher::new(Platform::LinkedIn, false, 100),
            FakePublisher::new(Platform::Facebook, false, 100),
            FakePublisher::new(Platform::Twitter, false, 100),
        ];
        let fan_out = PublishFanOut::new(publishers);

        let started = std::time::Instant::now();
        fan_out.publish(&Post::new("t", "x")).await;
        assert!(started.elapsed() < Duration::from_millis(280));
    }
}
