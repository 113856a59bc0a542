// Round-robin assignment rotation, keyed by (org, workflow)

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use leadhub_shared::OrgUser;

/// Rotation cursors for round-robin assignment. One cursor per
/// (org, workflow) pair, mutex-guarded so concurrent events neither skip
/// nor double-assign an index. Cursor state is persisted best-effort by the
/// executor and preloaded at startup.
#[derive(Debug, Default)]
pub struct AssignmentBalancer {
    cursors: Mutex<HashMap<(Uuid, Uuid), usize>>,
}

impl AssignmentBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed cursors from persisted rotation state.
    pub fn preload(&self, entries: impl IntoIterator<Item = ((Uuid, Uuid), usize)>) {
        let mut cursors = self.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        cursors.extend(entries);
    }

    /// Pick the next user in rotation and advance the cursor, wrapping over
    /// the ordered eligible list. Returns the selection and the new cursor
    /// position for persistence. None when the list is empty.
    pub fn next(
        &self,
        org_id: Uuid,
        workflow_id: Uuid,
        users: &[OrgUser],
    ) -> Option<(OrgUser, usize)> {
        if users.is_empty() {
            return None;
        }
        let mut cursors = self.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = cursors.entry((org_id, workflow_id)).or_insert(0);
        let index = *slot % users.len();
        *slot = (index + 1) % users.len();
        Some((users[index].clone(), *slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(n: usize) -> Vec<OrgUser> {
        (0..n)
            .map(|i| OrgUser {
                id: Uuid::new_v4(),
                name: format!("user-{i}"),
                email: None,
                phone: None,
            })
            .collect()
    }

    #[test]
    fn wraps_after_full_rotation() {
        let balancer = AssignmentBalancer::new();
        let org = Uuid::new_v4();
        let workflow = Uuid::new_v4();
        let pool = users(3);

        let picks: Vec<Uuid> = (0..4)
            .map(|_| balancer.next(org, workflow, &pool).unwrap().0.id)
            .collect();

        assert_eq!(picks[0], pool[0].id);
        assert_eq!(picks[1], pool[1].id);
        assert_eq!(picks[2], pool[2].id);
        // Call N+1 lands back on the first user.
        assert_eq!(picks[3], picks[0]);
    }

    #[test]
    fn cursors_are_independent_per_workflow() {
        let balancer = AssignmentBalancer::new();
        let org = Uuid::new_v4();
        let pool = users(2);

        let (first_a, _) = balancer.next(org, Uuid::new_v4(), &pool).unwrap();
        let (first_b, _) = balancer.next(org, Uuid::new_v4(), &pool).unwrap();
        assert_eq!(first_a.id, pool[0].id);
        assert_eq!(first_b.id, pool[0].id);
    }

    #[test]
    fn preloaded_cursor_resumes_rotation() {
        let balancer = AssignmentBalancer::new();
        let org = Uuid::new_v4();
        let workflow = Uuid::new_v4();
        let pool = users(3);

        balancer.preload([((org, workflow), 2)]);
        let (pick, position) = balancer.next(org, workflow, &pool).unwrap();
        assert_eq!(pick.id, pool[2].id);
        assert_eq!(position, 0);
    }

    #[test]
    fn empty_pool_yields_none() {
        let balancer = AssignmentBalancer::new();
        assert!(balancer.next(Uuid::new_v4(), Uuid::new_v4(), &[]).is_none());
    }

    #[test]
    fn shrunken_pool_still_wraps() {
        let balancer = AssignmentBalancer::new();
        let org = Uuid::new_v4();
        let workflow = Uuid::new_v4();
        balancer.preload([((org, workflow), 5)]);

        let pool = users(2);
        // Stale cursor beyond the list length wraps instead of panicking.
        let (pick, _) = balancer.next(org, workflow, &pool).unwrap();
        assert_eq!(pick.id, pool[1].id);
    }
}
