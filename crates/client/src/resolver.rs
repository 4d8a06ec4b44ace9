//! Single-winner resolution
//!
//! Given the ordered match set, decide the one device+server pair an attach
//! or detach may act on, or fail diagnosably. Multiple matches are never
//! disambiguated silently, not even when they all live on one server; the
//! only escape hatch is `--first`, which picks the earliest entry by
//! configuration-then-device order. That choice is deterministic by
//! construction: the match set order comes from the configuration, not from
//! scan completion order. `list` never goes through here.

use crate::inventory::{InventoryEntry, MatchSet};
use thiserror::Error;
use tracing::debug;

/// Resolution failures, each carrying enough context to refine the filter
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Zero devices satisfy the filter across the scanned servers
    ///
    /// Reachable servers are listed so the user can tell "device absent"
    /// from "server unreachable".
    #[error(
        "No device matched filter [{filter}] (servers that answered: {})",
        display_list(reachable)
    )]
    NoMatch {
        filter: String,
        reachable: Vec<String>,
    },

    /// Several devices on one server satisfy the filter
    #[error(
        "Filter [{filter}] matched {} devices on {server}: {}. \
         Refine the filter or pass --first.",
        candidates.len(),
        display_list(candidates)
    )]
    Ambiguous {
        filter: String,
        server: String,
        candidates: Vec<String>,
    },

    /// Matching devices exist on more than one server
    #[error(
        "Filter [{filter}] matched devices on {} servers ({}): {}. \
         Refine the filter, pass --host, or pass --first.",
        servers.len(),
        display_list(servers),
        display_list(candidates)
    )]
    AmbiguousAcrossServers {
        filter: String,
        servers: Vec<String>,
        candidates: Vec<String>,
    },
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Resolve a match set to exactly one target
///
/// Pure function of its inputs: the same match set with the same flags
/// always yields the same outcome. `filter` and `reachable` only feed the
/// error messages.
pub fn resolve(
    matches: &MatchSet,
    filter_text: &str,
    reachable: &[String],
    first: bool,
) -> Result<InventoryEntry, ResolveError> {
    match matches.len() {
        0 => Err(ResolveError::NoMatch {
            filter: filter_text.to_string(),
            reachable: reachable.to_vec(),
        }),
        1 => Ok(matches.entries()[0].clone()),
        n if first => {
            let winner = matches.entries()[0].clone();
            debug!("--first: picking first of {} matches: {}", n, winner);
            Ok(winner)
        }
        _ => {
            let candidates: Vec<String> =
                matches.entries().iter().map(|e| e.to_string()).collect();
            let servers = matches.distinct_servers();
            if let [only] = servers.as_slice() {
                Err(ResolveError::Ambiguous {
                    filter: filter_text.to_string(),
                    server: only.to_string(),
                    candidates,
                })
            } else {
                Err(ResolveError::AmbiguousAcrossServers {
                    filter: filter_text.to_string(),
                    servers: servers.iter().map(|s| s.to_string()).collect(),
                    candidates,
                })
            }
        }
    }
}
