//! Network-origin filter for the health endpoint.
//!
//! This is an allow-by-default filter, not authentication. A probe is allowed
//! when any of the following hold:
//! - it is a local process invocation (the `check` command)
//! - the caller's user agent contains the `healthcheck` marker
//! - the client address is loopback
//! - no user agent was supplied at all
//!
//! The last rule admits any client that simply omits the header. It exists for
//! orchestrators and internal callers that send no user agent, but it means the
//! filter offers no protection if the endpoint is reachable from an untrusted
//! network. Keep the listener on an internal interface.

use std::net::IpAddr;

use crate::config::HEALTHCHECK_AGENT_MARKER;

/// Metadata describing who is asking for a health report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    pub local_process: bool,
    pub user_agent: Option<String>,
    pub remote_addr: Option<IpAddr>,
}

impl RequestOrigin {
    /// Origin of a direct process invocation.
    pub fn local_process() -> Self {
        Self {
            local_process: true,
            ..Self::default()
        }
    }

    /// Origin of an HTTP request.
    pub fn http(user_agent: Option<String>, remote_addr: Option<IpAddr>) -> Self {
        Self {
            local_process: false,
            user_agent,
            remote_addr,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.local_process
            || self
                .user_agent
                .as_deref()
                .is_none_or(|agent| agent.contains(HEALTHCHECK_AGENT_MARKER))
            || self.remote_addr.is_some_and(is_loopback)
    }
}

fn is_loopback(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    const REMOTE: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));

    #[test]
    fn test_local_process_always_allowed() {
        assert!(RequestOrigin::local_process().is_allowed());
    }

    #[test]
    fn test_missing_user_agent_allowed() {
        assert!(RequestOrigin::http(None, Some(REMOTE)).is_allowed());
        assert!(RequestOrigin::http(None, None).is_allowed());
    }

    #[test]
    fn test_healthcheck_agent_allowed_from_anywhere() {
        let origin = RequestOrigin::http(Some("docker-healthcheck/1.0".to_string()), Some(REMOTE));
        assert!(origin.is_allowed());
    }

    #[test]
    fn test_loopback_allowed_with_any_agent() {
        let agent = Some("Mozilla/5.0".to_string());
        assert!(RequestOrigin::http(agent.clone(), Some(IpAddr::V4(Ipv4Addr::LOCALHOST))).is_allowed());
        assert!(RequestOrigin::http(agent.clone(), Some(IpAddr::V6(Ipv6Addr::LOCALHOST))).is_allowed());

        let mapped = IpAddr::V6(Ipv4Addr::LOCALHOST.to_ipv6_mapped());
        assert!(RequestOrigin::http(agent, Some(mapped)).is_allowed());
    }

    #[test]
    fn test_unknown_agent_from_remote_denied() {
        let origin = RequestOrigin::http(Some("curl/8.5.0".to_string()), Some(REMOTE));
        assert!(!origin.is_allowed());
    }

    #[test]
    fn test_unknown_agent_without_address_denied() {
        let origin = RequestOrigin::http(Some("curl/8.5.0".to_string()), None);
        assert!(!origin.is_allowed());
    }

    #[test]
    fn test_marker_match_is_case_sensitive() {
        let origin = RequestOrigin::http(Some("HealthCheck".to_string()), Some(REMOTE));
        assert!(!origin.is_allowed());
    }
}
