use std::collections::HashSet;

use tracing::debug;

use crate::models::{Id, Nexio};
use crate::repo::{NexioPurge, Repo, RepoResult};

/// Every post reachable from `root` through child references, level by level.
///
/// Walks an explicit frontier of ids, one batched fetch per tree level, so
/// depth of the comment tree never turns into call-stack depth. Each id is
/// fetched at most once.
pub(crate) async fn collect_descendants(repo: &dyn Repo, root: &Nexio) -> RepoResult<Vec<Nexio>> {
    let mut seen: HashSet<Id> = HashSet::from([root.id]);
    let mut frontier: Vec<Id> = root.children.clone();
    let mut out = Vec::new();
    let mut depth = 0usize;

    loop {
        frontier.retain(|id| seen.insert(*id));
        if frontier.is_empty() {
            break;
        }
        depth += 1;
        let level = repo.find_nexios(&frontier).await?;
        frontier = level.iter().flat_map(|n| n.children.iter().copied()).collect();
        out.extend(level);
    }

    debug!(root = root.id, descendants = out.len(), depth, "collected subtree");
    Ok(out)
}

/// Ids to delete plus the deduplicated authors and communities that index them.
pub(crate) fn purge_plan(root: &Nexio, descendants: &[Nexio]) -> NexioPurge {
    let mut plan = NexioPurge::default();
    for n in std::iter::once(root).chain(descendants) {
        plan.ids.push(n.id);
        plan.author_ids.insert(n.author_id);
        plan.community_ids.extend(n.community_id);
    }
    plan
}
