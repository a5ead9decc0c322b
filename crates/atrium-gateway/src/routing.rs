/// Network topology the client is deployed behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// The backend is reachable directly; logical paths are used verbatim
    /// against the base URL.
    Direct,
    /// Requests go through a same-origin reverse proxy that strips its own
    /// prefix before forwarding upstream.
    Proxied,
}

pub const DEFAULT_PROXY_PREFIX: &str = "/gateway";
pub const DEFAULT_UPSTREAM_PREFIX: &str = "/v1";

/// Pure route computation. No I/O, no shared state; safe to call from any
/// number of concurrent callers.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub mode: TransportMode,
    pub base_url: String,
    pub proxy_prefix: String,
    pub upstream_prefix: String,
}

impl RouteConfig {
    pub fn direct(base_url: impl Into<String>) -> Self {
        Self {
            mode: TransportMode::Direct,
            base_url: base_url.into(),
            proxy_prefix: DEFAULT_PROXY_PREFIX.to_string(),
            upstream_prefix: DEFAULT_UPSTREAM_PREFIX.to_string(),
        }
    }

    pub fn proxied(base_url: impl Into<String>) -> Self {
        Self {
            mode: TransportMode::Proxied,
            base_url: base_url.into(),
            proxy_prefix: DEFAULT_PROXY_PREFIX.to_string(),
            upstream_prefix: DEFAULT_UPSTREAM_PREFIX.to_string(),
        }
    }

    /// Computes the concrete URL for a logical path.
    ///
    /// Proxied mode applies each prefix at most once, whatever shape the
    /// caller hands in: a fully proxy-prefixed path is returned unchanged,
    /// an upstream-prefixed path gains only the proxy prefix, and a bare
    /// path gains both.
    pub fn route(&self, logical_path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = leading_slash(logical_path);

        match self.mode {
            TransportMode::Direct => format!("{base}{path}"),
            TransportMode::Proxied => {
                let routed = if has_path_prefix(&path, &self.proxy_prefix) {
                    path
                } else if has_path_prefix(&path, &self.upstream_prefix) {
                    format!("{}{}", self.proxy_prefix, path)
                } else {
                    format!("{}{}{}", self.proxy_prefix, self.upstream_prefix, path)
                };
                format!("{base}{routed}")
            }
        }
    }
}

fn leading_slash(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Whole-segment prefix match: `/gateway` matches `/gateway/x` but not
/// `/gatewayfoo`.
fn has_path_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{RouteConfig, TransportMode};

    fn proxied() -> RouteConfig {
        RouteConfig::proxied("")
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn direct_mode_uses_logical_path_verbatim() {
        let routes = RouteConfig::direct("https://backend.example.com/");
        assert_eq!(
            routes.route("/v1/chat"),
            "https://backend.example.com/v1/chat"
        );
        assert_eq!(
            routes.route("v1/chat"),
            "https://backend.example.com/v1/chat"
        );
    }

    #[test]
    fn functional_each_starting_shape_gets_exactly_one_of_each_prefix() {
        let routes = proxied();
        for input in ["/actions/run", "/v1/actions/run", "/gateway/v1/actions/run"] {
            let routed = routes.route(input);
            assert_eq!(routed, "/gateway/v1/actions/run", "input {input}");
            assert_eq!(count(&routed, "/gateway"), 1, "input {input}");
            assert_eq!(count(&routed, "/v1"), 1, "input {input}");
        }
    }

    #[test]
    fn regression_routing_is_idempotent_in_proxied_mode() {
        let routes = proxied();
        let once = routes.route("/v1/chat");
        let twice = routes.route(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn prefix_matching_is_segment_aware() {
        let routes = proxied();
        // `/v1beta` is not the upstream prefix; it gains both prefixes.
        assert_eq!(routes.route("/v1beta/chat"), "/gateway/v1/v1beta/chat");
        assert_eq!(routes.route("/gatewayed/chat"), "/gateway/v1/gatewayed/chat");
    }

    #[test]
    fn proxied_mode_joins_a_non_empty_base() {
        let mut routes = proxied();
        routes.base_url = "https://app.example.com/".to_string();
        assert_eq!(
            routes.route("/v1/chat"),
            "https://app.example.com/gateway/v1/chat"
        );
        assert_eq!(routes.mode, TransportMode::Proxied);
    }
}
