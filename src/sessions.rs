//! Privileged session lookup: which hosts have a high-value account logged in.
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::graph::Document;

/// Host display name to the privileged users seen on it.
pub type SessionMap = BTreeMap<String, BTreeSet<String>>;

/// Names under the privileged categories at the time of the call.
pub type PrivilegedAccountSet = HashSet<String>;

/// Collect sessions of `privileged` users, keyed by the node that holds the
/// session list. Empty usernames never match. Only the set passed in is
/// consulted, so callers decide which accounts count as privileged so far.
pub fn extract_sessions(doc: &Document, privileged: &PrivilegedAccountSet) -> SessionMap {
    let mut out = SessionMap::new();
    for node in &doc.nodes {
        let mut host: Option<String> = None;
        for session in &node.sessions {
            let user = session.username();
            if user.is_empty() || !privileged.contains(user) {
                continue;
            }
            let host = host.get_or_insert_with(|| node.display_name());
            out.entry(host.clone()).or_default().insert(user.to_string());
        }
    }
    out
}

/// Union `from` into `into`, host by host.
pub fn merge_sessions(into: &mut SessionMap, from: SessionMap) {
    for (host, users) in from {
        into.entry(host).or_default().extend(users);
    }
}
