use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;
use tracing::debug;

use super::{
    directory::{self, UserDirectory},
    permissions::Viewer,
    role::Role,
    store::UserStore,
};

struct Slot {
    dir: Arc<UserDirectory>,
    last_used: Instant,
}

/// One active directory per signed-in staff viewer.
///
/// The map lock only guards the map itself; store reads happen outside it.
/// Directories idle for longer than `idle_ttl` are dropped on the next access.
#[derive(Clone)]
pub struct DirectoryRegistry {
    store: Arc<dyn UserStore>,
    idle_ttl: Duration,
    active: Arc<Mutex<HashMap<String, Slot>>>,
}

impl DirectoryRegistry {
    pub fn new(store: Arc<dyn UserStore>, idle_ttl: Duration) -> Self {
        Self {
            store,
            idle_ttl,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The viewer's directory, activating it on first use.
    ///
    /// The viewer's role is read from the store on every call. A viewer who
    /// is not staff gets `None`, and any directory they held is dropped.
    pub async fn for_staff(&self, viewer_id: &str) -> Option<Arc<UserDirectory>> {
        let role = directory::lookup_role(self.store.as_ref(), viewer_id).await;
        if !role.is_some_and(Role::is_staff) {
            if self.deactivate(viewer_id).await {
                debug!(viewer_id, "directory dropped, viewer is no longer staff");
            }
            return None;
        }

        if let Some(dir) = self.touch(viewer_id).await {
            dir.set_viewer(Viewer::new(viewer_id, role)).await;
            return Some(dir);
        }

        let fresh = Arc::new(
            UserDirectory::activate(self.store.clone(), Some(viewer_id.to_string())).await,
        );
        let mut active = self.active.lock().await;
        let slot = active.entry(viewer_id.to_string()).or_insert_with(|| {
            debug!(viewer_id, "directory activated");
            Slot {
                dir: fresh,
                last_used: Instant::now(),
            }
        });
        Some(slot.dir.clone())
    }

    /// Re-resolves the viewer of an already active directory after a sign-in.
    pub async fn on_sign_in(&self, viewer_id: &str) {
        let dir = self
            .active
            .lock()
            .await
            .get(viewer_id)
            .map(|slot| slot.dir.clone());
        if let Some(dir) = dir {
            dir.on_auth_changed(Some(viewer_id.to_string())).await;
        }
    }

    /// Drops the viewer's directory. Returns whether one was active.
    pub async fn deactivate(&self, viewer_id: &str) -> bool {
        let removed = self.active.lock().await.remove(viewer_id);
        if let Some(slot) = &removed {
            slot.dir.on_auth_changed(None).await;
            debug!(viewer_id, "directory deactivated");
        }
        removed.is_some()
    }

    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }

    async fn touch(&self, viewer_id: &str) -> Option<Arc<UserDirectory>> {
        let (hit, idle) = {
            let mut active = self.active.lock().await;
            let idle = evict_idle(&mut active, self.idle_ttl);
            let hit = active.get_mut(viewer_id).map(|slot| {
                slot.last_used = Instant::now();
                slot.dir.clone()
            });
            (hit, idle)
        };
        for dir in idle {
            dir.on_auth_changed(None).await;
        }
        hit
    }
}

fn evict_idle(active: &mut HashMap<String, Slot>, ttl: Duration) -> Vec<Arc<UserDirectory>> {
    let now = Instant::now();
    let expired: Vec<String> = active
        .iter()
        .filter(|(_, slot)| now.duration_since(slot.last_used) >= ttl)
        .map(|(id, _)| id.clone())
        .collect();
    expired
        .into_iter()
        .filter_map(|id| {
            debug!(viewer_id = %id, "idle directory evicted");
            active.remove(&id).map(|slot| slot.dir)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{record::UserRecord, store::memory::MemoryUserStore};

    const HOUR: Duration = Duration::from_secs(3600);

    fn seeded() -> Arc<MemoryUserStore> {
        Arc::new(MemoryUserStore::with_users(vec![
            UserRecord::new("sa", "root@x.com", Some(Role::SuperAdmin)),
            UserRecord::new("ad", "staff@x.com", Some(Role::Admin)),
            UserRecord::new("c", "c@x.com", Some(Role::Client)),
        ]))
    }

    #[tokio::test]
    async fn reuses_the_active_directory() {
        let reg = DirectoryRegistry::new(seeded(), HOUR);
        let a = reg.for_staff("sa").await.unwrap();
        let b = reg.for_staff("sa").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.active_count().await, 1);
        assert_eq!(a.viewer().await.role, Some(Role::SuperAdmin));
    }

    #[tokio::test]
    async fn deactivate_clears_viewer_and_entry() {
        let reg = DirectoryRegistry::new(seeded(), HOUR);
        let dir = reg.for_staff("sa").await.unwrap();
        assert!(reg.deactivate("sa").await);
        assert!(!reg.deactivate("sa").await);
        assert_eq!(reg.active_count().await, 0);
        assert_eq!(dir.viewer().await.id, None);

        let fresh = reg.for_staff("sa").await.unwrap();
        assert!(!Arc::ptr_eq(&dir, &fresh));
    }

    #[tokio::test]
    async fn clients_never_get_a_directory() {
        let reg = DirectoryRegistry::new(seeded(), HOUR);
        assert!(reg.for_staff("c").await.is_none());
        assert!(reg.for_staff("nobody").await.is_none());
        assert_eq!(reg.active_count().await, 0);
    }

    #[tokio::test]
    async fn demoted_admin_loses_the_directory() {
        let store = seeded();
        let reg = DirectoryRegistry::new(store.clone(), HOUR);
        let admin_dir = reg.for_staff("ad").await.unwrap();
        let root_dir = reg.for_staff("sa").await.unwrap();

        assert!(root_dir.set_role("ad", Role::Client).await);
        assert!(reg.for_staff("ad").await.is_none());
        assert_eq!(reg.active_count().await, 1);
        assert_eq!(admin_dir.viewer().await, Viewer::default());
        assert!(!admin_dir.toggle_blocked("c", false).await);
    }

    #[tokio::test]
    async fn promoted_client_gets_in_on_next_request() {
        let store = seeded();
        let reg = DirectoryRegistry::new(store.clone(), HOUR);
        assert!(reg.for_staff("c").await.is_none());

        store.update_role("c", Role::Admin).await.unwrap();
        let dir = reg.for_staff("c").await.unwrap();
        assert_eq!(dir.viewer().await.role, Some(Role::Admin));
    }

    #[tokio::test]
    async fn role_change_between_requests_updates_the_viewer() {
        let store = seeded();
        let reg = DirectoryRegistry::new(store.clone(), HOUR);
        let dir = reg.for_staff("ad").await.unwrap();
        store.update_role("ad", Role::SuperAdmin).await.unwrap();

        let same = reg.for_staff("ad").await.unwrap();
        assert!(Arc::ptr_eq(&dir, &same));
        assert_eq!(dir.viewer().await.role, Some(Role::SuperAdmin));
    }

    #[tokio::test]
    async fn sign_in_re_resolves_an_active_viewer() {
        let store = seeded();
        let reg = DirectoryRegistry::new(store.clone(), HOUR);
        let dir = reg.for_staff("ad").await.unwrap();
        store.update_role("ad", Role::Client).await.unwrap();

        reg.on_sign_in("ad").await;
        assert_eq!(dir.viewer().await, Viewer::new("ad", Some(Role::Client)));
        reg.on_sign_in("nobody").await;
        assert_eq!(reg.active_count().await, 1);
    }

    #[tokio::test]
    async fn idle_directories_are_evicted() {
        let reg = DirectoryRegistry::new(seeded(), Duration::ZERO);
        let first = reg.for_staff("sa").await.unwrap();
        let second = reg.for_staff("ad").await.unwrap();

        assert_eq!(first.viewer().await.id, None);
        assert_eq!(second.viewer().await.role, Some(Role::Admin));
        assert_eq!(reg.active_count().await, 1);
    }
}
