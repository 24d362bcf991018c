//! Routing-condition evaluation for [`crate::ResourceGraph::route`].
//!
//! Host and path values are glob patterns: `*` matches any run of
//! characters, `?` matches exactly one. Host matching ignores case; path
//! matching does not.

use regex::Regex;
use topology::RoutingCondition;
use tracing::warn;

/// A rule's conditions compiled to regular expressions.
#[derive(Debug)]
pub(crate) struct CompiledConditions {
    matchers: Vec<Matcher>,
}

#[derive(Debug)]
enum Matcher {
    Host(Vec<Regex>),
    Path(Vec<Regex>),
}

impl CompiledConditions {
    pub(crate) fn compile(conditions: &[RoutingCondition]) -> Self {
        let matchers = conditions
            .iter()
            .map(|condition| match condition {
                RoutingCondition::HostHeader(hosts) => {
                    Matcher::Host(hosts.iter().filter_map(|h| glob(h, true)).collect())
                }
                RoutingCondition::PathPattern(paths) => {
                    Matcher::Path(paths.iter().filter_map(|p| glob(p, false)).collect())
                }
            })
            .collect();
        Self { matchers }
    }

    /// Every condition must match; within one condition any value may.
    pub(crate) fn matches(&self, host: &str, path: &str) -> bool {
        self.matchers.iter().all(|matcher| match matcher {
            Matcher::Host(patterns) => patterns.iter().any(|p| p.is_match(host)),
            Matcher::Path(patterns) => patterns.iter().any(|p| p.is_match(path)),
        })
    }
}

fn glob(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    let body = regex::escape(pattern).replace(r"\*", ".*").replace(r"\?", ".");
    let flags = if case_insensitive { "(?i)" } else { "" };
    match Regex::new(&format!("{flags}^{body}$")) {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!(pattern, error = %err, "Invalid routing pattern, ignoring");
            None
        }
    }
}
