use async_trait::async_trait;

/// Trait contract for `TokenProvider` behavior.
///
/// Consulted once per request. Returning `None` sends the request
/// unauthenticated; whether that is acceptable is the backend's policy
/// decision. Implementations may refresh tokens internally and must be safe
/// to invoke from concurrent in-flight requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

/// Provider for deployments that run unauthenticated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl TokenProvider for NoAuth {
    async fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// Wraps a fixed token, e.g. one injected at page load.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}
