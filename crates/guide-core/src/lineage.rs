//! Successor chain resolution
//!
//! Every link whose `successor` is set belongs to a chain that should end
//! at a terminal link (one with no successor). The resolver reads the
//! whole `id -> successor` edge set in one query and walks it in memory,
//! memoizing each resolved chain so the catalog is traversed once.
//!
//! Two defects are tolerated rather than treated as errors:
//!
//! - a successor id that does not exist ends the chain at the last link
//!   that does (a link whose own successor is missing gets no entry and
//!   resolves to itself);
//! - a chain that revisits an id is reported as a cycle and left out of
//!   the mapping, while every other chain still resolves.

use std::collections::{BTreeMap, HashMap};

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::LinkId;
use crate::storage::gateway::{query_all, Gateway};
use crate::storage::{StoreError, StoreResult};

/// `id -> successor` for every link in the store
pub type SuccessorEdges = HashMap<LinkId, Option<LinkId>>;

/// A chain that loops back on itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// The link whose chain could not be resolved
    pub origin: LinkId,
    /// The loop, starting and ending at the repeated id
    pub chain: Vec<LinkId>,
}

impl From<CycleReport> for StoreError {
    fn from(report: CycleReport) -> Self {
        StoreError::CycleDetected {
            origin: report.origin,
            chain: report.chain,
        }
    }
}

/// Resolution of every chain in the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuccessorMap {
    /// Link id to the terminal id of its chain
    pub terminals: BTreeMap<LinkId, LinkId>,
    /// Chains abandoned because they contain a cycle
    pub cycles: Vec<CycleReport>,
}

impl SuccessorMap {
    /// Terminal id for a superseded link
    pub fn terminal_of(&self, id: LinkId) -> Option<LinkId> {
        self.terminals.get(&id).copied()
    }

    /// Cycle report for a link, if its chain loops
    pub fn cycle_for(&self, id: LinkId) -> Option<&CycleReport> {
        self.cycles.iter().find(|c| c.origin == id)
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Terminal(LinkId),
    Cycle(Vec<LinkId>),
}

/// Resolve every chain in `edges`
pub fn resolve(edges: &SuccessorEdges) -> SuccessorMap {
    let mut origins: Vec<LinkId> = edges
        .iter()
        .filter_map(|(id, successor)| successor.map(|_| *id))
        .collect();
    origins.sort_unstable();

    let mut memo: HashMap<LinkId, Outcome> = HashMap::new();

    for &origin in &origins {
        if memo.contains_key(&origin) {
            continue;
        }

        let mut path = vec![origin];
        let mut position: HashMap<LinkId, usize> = HashMap::from([(origin, 0)]);
        let mut current = origin;

        let outcome = loop {
            let next = match edges.get(&current).copied().flatten() {
                Some(next) => next,
                None => break Outcome::Terminal(current),
            };

            if !edges.contains_key(&next) {
                warn!(
                    "Link {} points at missing successor {}; resolving to {}",
                    current, next, current
                );
                break Outcome::Terminal(current);
            }

            if let Some(known) = memo.get(&next) {
                break known.clone();
            }

            if let Some(&start) = position.get(&next) {
                let mut chain = path[start..].to_vec();
                chain.push(next);
                warn!("Successor cycle detected: {:?}", chain);
                break Outcome::Cycle(chain);
            }

            position.insert(next, path.len());
            path.push(next);
            current = next;
        };

        for id in path {
            memo.insert(id, outcome.clone());
        }
    }

    let mut map = SuccessorMap::default();
    for origin in origins {
        match memo.remove(&origin) {
            Some(Outcome::Terminal(terminal)) if terminal != origin => {
                map.terminals.insert(origin, terminal);
            }
            Some(Outcome::Terminal(_)) => {}
            Some(Outcome::Cycle(chain)) => map.cycles.push(CycleReport { origin, chain }),
            None => {}
        }
    }

    debug!(
        "Resolved {} chain(s), {} cyclic",
        map.terminals.len(),
        map.cycles.len()
    );
    map
}

/// Read the full successor edge set
pub fn load_edges(conn: &Connection) -> StoreResult<SuccessorEdges> {
    let rows: Vec<(LinkId, Option<LinkId>)> =
        query_all(conn, "SELECT id, successor FROM links", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
    Ok(rows.into_iter().collect())
}

/// Resolve the live id for `id` against a resolved map
///
/// A link without a successor is its own live version.
pub fn live_id(map: &SuccessorMap, edges: &SuccessorEdges, id: LinkId) -> StoreResult<LinkId> {
    if let Some(report) = map.cycle_for(id) {
        return Err(report.clone().into());
    }
    if let Some(terminal) = map.terminal_of(id) {
        return Ok(terminal);
    }
    if edges.contains_key(&id) {
        Ok(id)
    } else {
        Err(StoreError::NotFound { id })
    }
}

/// Read-only lineage queries over the store
#[derive(Debug, Clone)]
pub struct LineageResolver {
    gateway: Gateway,
}

impl LineageResolver {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Terminal id for every link that has a successor
    pub fn fetch_successor_map(&self) -> StoreResult<SuccessorMap> {
        let edges = self.gateway.with_connection(load_edges)?;
        Ok(resolve(&edges))
    }

    /// The live id a request for `id` should be redirected to
    pub fn resolve_live(&self, id: LinkId) -> StoreResult<LinkId> {
        let edges = self.gateway.with_connection(load_edges)?;
        let map = resolve(&edges);
        live_id(&map, &edges, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(LinkId, Option<LinkId>)]) -> SuccessorEdges {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_linear_chain() {
        // A -> B -> C
        let map = resolve(&edges(&[(1, Some(2)), (2, Some(3)), (3, None)]));

        assert_eq!(map.terminals, BTreeMap::from([(1, 3), (2, 3)]));
        assert!(map.terminal_of(3).is_none());
        assert!(map.cycles.is_empty());
    }

    #[test]
    fn test_no_successors() {
        let map = resolve(&edges(&[(1, None), (2, None)]));
        assert!(map.is_empty());
        assert!(map.cycles.is_empty());
    }

    #[test]
    fn test_branches_share_terminal() {
        // 1 -> 3, 2 -> 3, 3 -> 4
        let map = resolve(&edges(&[(1, Some(3)), (2, Some(3)), (3, Some(4)), (4, None)]));
        assert_eq!(map.terminals, BTreeMap::from([(1, 4), (2, 4), (3, 4)]));
    }

    #[test]
    fn test_two_node_cycle() {
        // A -> B -> A
        let map = resolve(&edges(&[(1, Some(2)), (2, Some(1))]));

        assert!(map.terminals.is_empty());
        assert_eq!(map.cycles.len(), 2);
        assert_eq!(map.cycle_for(1).unwrap().chain, vec![1, 2, 1]);
        assert!(map.cycle_for(2).is_some());
    }

    #[test]
    fn test_self_loop() {
        let map = resolve(&edges(&[(5, Some(5))]));
        assert_eq!(map.cycle_for(5).unwrap().chain, vec![5, 5]);
    }

    #[test]
    fn test_cycle_does_not_abort_other_chains() {
        // 1 -> 2 -> 3 -> 2 (tail into a loop), 10 -> 11
        let map = resolve(&edges(&[
            (1, Some(2)),
            (2, Some(3)),
            (3, Some(2)),
            (10, Some(11)),
            (11, None),
        ]));

        assert_eq!(map.terminals, BTreeMap::from([(10, 11)]));
        let origins: Vec<LinkId> = map.cycles.iter().map(|c| c.origin).collect();
        assert_eq!(origins, vec![1, 2, 3]);
        assert_eq!(map.cycle_for(1).unwrap().chain, vec![2, 3, 2]);
    }

    #[test]
    fn test_dangling_successor_resolves_to_last_existing() {
        // 1 -> 2 -> 99 (missing)
        let map = resolve(&edges(&[(1, Some(2)), (2, Some(99))]));

        assert_eq!(map.terminals, BTreeMap::from([(1, 2)]));
        assert!(map.terminal_of(2).is_none());
        assert!(map.cycles.is_empty());

        let edges = edges(&[(1, Some(2)), (2, Some(99))]);
        assert_eq!(live_id(&map, &edges, 2).unwrap(), 2);
        assert_eq!(live_id(&map, &edges, 1).unwrap(), 2);
    }

    #[test]
    fn test_long_chain() {
        let pairs: Vec<(LinkId, Option<LinkId>)> = (1..=10_000)
            .map(|id| (id, if id < 10_000 { Some(id + 1) } else { None }))
            .collect();
        let map = resolve(&edges(&pairs));

        assert_eq!(map.len(), 9_999);
        assert!(map.terminals.values().all(|&t| t == 10_000));
    }

    #[test]
    fn test_live_id() {
        let edges = edges(&[(1, Some(2)), (2, None), (3, Some(4)), (4, Some(3))]);
        let map = resolve(&edges);

        assert_eq!(live_id(&map, &edges, 1).unwrap(), 2);
        assert_eq!(live_id(&map, &edges, 2).unwrap(), 2);
        assert!(matches!(
            live_id(&map, &edges, 3),
            Err(StoreError::CycleDetected { origin: 3, .. })
        ));
        assert!(live_id(&map, &edges, 8).unwrap_err().is_not_found());
    }

    #[test]
    fn test_resolver_reads_store() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let gateway = Gateway::new(temp_dir.path().join("guide.db"));
        gateway
            .with_connection(|conn| {
                conn.execute_batch(
                    r#"
                    INSERT INTO links (id, url, name, valid, successor) VALUES (1, 'https://a', 'A', 0, 2);
                    INSERT INTO links (id, url, name, valid, successor) VALUES (2, 'https://b', 'B', 0, 3);
                    INSERT INTO links (id, url, name, valid, successor) VALUES (3, 'https://c', 'C', 1, NULL);
                    "#,
                )?;
                Ok(())
            })
            .unwrap();

        let resolver = LineageResolver::new(gateway);
        let map = resolver.fetch_successor_map().unwrap();
        assert_eq!(map.terminals, BTreeMap::from([(1, 3), (2, 3)]));
        assert_eq!(resolver.resolve_live(1).unwrap(), 3);
        assert_eq!(resolver.resolve_live(3).unwrap(), 3);
    }
}
