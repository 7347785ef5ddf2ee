use crate::model::{ClusterBucket, FilterCriteria, Snapshot, Workload};
use std::collections::BTreeMap;

/// Derives the display subset from the authoritative snapshot. Pure: the
/// input snapshot is never touched, so re-running with the same criteria is
/// idempotent relative to the last poll.
pub fn project(snapshot: &Snapshot, criteria: &FilterCriteria) -> Snapshot {
    Snapshot {
        deployments: project_buckets(&snapshot.deployments, criteria),
        pods: project_buckets(&snapshot.pods, criteria),
    }
}

fn project_buckets<T>(
    buckets: &BTreeMap<String, ClusterBucket<T>>,
    criteria: &FilterCriteria,
) -> BTreeMap<String, ClusterBucket<T>>
where
    T: Workload + Clone,
{
    buckets
        .iter()
        .filter(|(key, _)| criteria.cluster.selects(key))
        .map(|(key, bucket)| {
            // Buckets without an item list pass through unchanged.
            let items = bucket.items.as_ref().map(|items| {
                items
                    .iter()
                    .filter(|item| passes(*item, criteria))
                    .cloned()
                    .collect::<Vec<_>>()
            });
            (key.clone(), ClusterBucket { items })
        })
        .collect()
}

fn passes<T: Workload>(item: &T, criteria: &FilterCriteria) -> bool {
    item.matches_search(&criteria.search) && (!criteria.failed_only || !item.is_healthy())
}

/// Cluster keys offered by the selector control: every cluster holding at
/// least one item, across both workload kinds.
pub fn cluster_choices(snapshot: &Snapshot) -> Vec<String> {
    let mut choices = snapshot
        .deployments
        .iter()
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(key, _)| key.clone())
        .chain(
            snapshot
                .pods
                .iter()
                .filter(|(_, bucket)| !bucket.is_empty())
                .map(|(key, _)| key.clone()),
        )
        .collect::<Vec<_>>();
    choices.sort();
    choices.dedup();
    choices
}
