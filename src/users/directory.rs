use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::{
    error::DirectoryError,
    permissions::{self, RowCapabilities, Viewer},
    projection::{self, SortField, SortState},
    record::UserRecord,
    role::Role,
    store::UserStore,
};

/// A transient, dismissable message for the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub kind: &'static str,
    pub message: String,
}

/// One projected row as the admin view shows it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRow {
    #[serde(flatten)]
    pub user: UserRecord,
    pub display_label: String,
    pub capabilities: RowCapabilities,
}

#[derive(Default)]
struct DirectoryState {
    roster: Vec<UserRecord>,
    viewer: Viewer,
    loading: bool,
    search: String,
    sort: SortState,
    notices: Vec<Notice>,
}

/// Roster, viewer context and view state behind the admin users view.
///
/// Locks are never held across a store call: checks read a snapshot, the
/// write goes out unlocked, and the local apply re-locks. Two mutations of
/// the same user may therefore interleave; whichever write lands last wins
/// locally, same as in the store.
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    state: RwLock<DirectoryState>,
    next_notice: AtomicU64,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            state: RwLock::new(DirectoryState::default()),
            next_notice: AtomicU64::new(1),
        }
    }

    /// Loads the roster and resolves the viewer concurrently.
    pub async fn activate(store: Arc<dyn UserStore>, identity: Option<String>) -> Self {
        let dir = Self::new(store);
        tokio::join!(dir.load(), dir.on_auth_changed(identity));
        dir
    }

    /// Bulk read of the roster. A failed read leaves it empty.
    pub async fn load(&self) {
        self.state.write().await.loading = true;
        let result = self.store.list_by_email().await;
        let mut st = self.state.write().await;
        st.loading = false;
        match result {
            Ok(users) => {
                st.roster = dedupe(users);
                debug!(count = st.roster.len(), "roster loaded");
            }
            Err(e) => {
                warn!(error = %e, "roster load failed");
                st.roster.clear();
            }
        }
    }

    /// Re-resolves the viewer for a new signed-in identity, or clears it.
    pub async fn on_auth_changed(&self, identity: Option<String>) {
        let Some(id) = identity else {
            self.state.write().await.viewer = Viewer::default();
            return;
        };
        self.state.write().await.viewer = Viewer::new(id.clone(), None);

        let role = lookup_role(self.store.as_ref(), &id).await;

        let mut st = self.state.write().await;
        // a later identity change may have replaced the viewer meanwhile
        if st.viewer.is(&id) {
            st.viewer.role = role;
        }
    }

    /// Applies a viewer resolved elsewhere, e.g. by the registry's per-request lookup.
    pub async fn set_viewer(&self, viewer: Viewer) {
        self.state.write().await.viewer = viewer;
    }

    pub async fn viewer(&self) -> Viewer {
        self.state.read().await.viewer.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn record(&self, user_id: &str) -> Option<UserRecord> {
        let st = self.state.read().await;
        st.roster.iter().find(|u| u.id == user_id).cloned()
    }

    pub async fn set_search(&self, text: impl Into<String>) {
        self.state.write().await.search = text.into();
    }

    pub async fn search(&self) -> String {
        self.state.read().await.search.clone()
    }

    pub async fn select_sort(&self, field: SortField) {
        self.state.write().await.sort.select(field);
    }

    pub async fn sort_state(&self) -> SortState {
        self.state.read().await.sort
    }

    /// The current projection, with capability flags per row.
    pub async fn rows(&self) -> Vec<DirectoryRow> {
        let st = self.state.read().await;
        projection::project(&st.roster, &st.search, st.sort)
            .into_iter()
            .map(|user| DirectoryRow {
                display_label: user.display_label().to_string(),
                capabilities: permissions::row_capabilities(&st.viewer, user),
                user: user.clone(),
            })
            .collect()
    }

    pub async fn set_role(&self, user_id: &str, new_role: Role) -> bool {
        match self.try_set_role(user_id, new_role).await {
            Ok(()) => true,
            Err(e) => {
                self.report(user_id, e).await;
                false
            }
        }
    }

    pub async fn try_set_role(&self, user_id: &str, new_role: Role) -> Result<(), DirectoryError> {
        let viewer = self.viewer().await;
        permissions::check_change_role(&viewer)?;

        self.store.update_role(user_id, new_role).await?;

        let mut st = self.state.write().await;
        if let Some(user) = st.roster.iter_mut().find(|u| u.id == user_id) {
            user.set_role(new_role);
        }
        info!(user_id, role = new_role.as_str(), by = ?viewer.id, "role changed");
        Ok(())
    }

    pub async fn toggle_blocked(&self, user_id: &str, current_status: bool) -> bool {
        match self.try_toggle_blocked(user_id, current_status).await {
            Ok(()) => true,
            Err(e) => {
                self.report(user_id, e).await;
                false
            }
        }
    }

    pub async fn try_toggle_blocked(
        &self,
        user_id: &str,
        current_status: bool,
    ) -> Result<(), DirectoryError> {
        let viewer = {
            let st = self.state.read().await;
            if st.viewer.is(user_id) {
                return Err(DirectoryError::SelfActionDenied);
            }
            let target = st
                .roster
                .iter()
                .find(|u| u.id == user_id)
                .ok_or(DirectoryError::NotFound)?;
            permissions::can_toggle_block(&st.viewer, target)?;
            st.viewer.clone()
        };

        let blocked = !current_status;
        self.store.update_blocked(user_id, blocked).await?;

        let mut st = self.state.write().await;
        if let Some(user) = st.roster.iter_mut().find(|u| u.id == user_id) {
            user.is_blocked = blocked;
        }
        info!(user_id, blocked, by = ?viewer.id, "block status changed");
        Ok(())
    }

    /// Drains pending notices.
    pub async fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state.write().await.notices)
    }

    pub async fn dismiss(&self, notice_id: u64) -> bool {
        let mut st = self.state.write().await;
        let before = st.notices.len();
        st.notices.retain(|n| n.id != notice_id);
        st.notices.len() != before
    }

    async fn report(&self, user_id: &str, err: DirectoryError) {
        match &err {
            DirectoryError::NotFound => {
                debug!(user_id, "mutation target not in roster");
                return;
            }
            DirectoryError::BackendFailure(inner) => {
                error!(error = %inner, user_id, "directory write failed");
            }
            other => warn!(user_id, kind = other.kind(), "directory action refused"),
        }
        let notice = Notice {
            id: self.next_notice.fetch_add(1, Ordering::Relaxed),
            kind: err.kind(),
            message: err.to_string(),
        };
        self.state.write().await.notices.push(notice);
    }
}

/// The role on the user's own record. Missing records and failed reads
/// both resolve to `None`.
pub async fn lookup_role(store: &dyn UserStore, user_id: &str) -> Option<Role> {
    match store.get(user_id).await {
        Ok(Some(own)) => own.role,
        Ok(None) => {
            warn!(user_id, "viewer has no user record");
            None
        }
        Err(e) => {
            warn!(error = %e, user_id, "viewer role lookup failed");
            None
        }
    }
}

fn dedupe(users: Vec<UserRecord>) -> Vec<UserRecord> {
    let mut seen = HashSet::new();
    users
        .into_iter()
        .filter(|u| seen.insert(u.id.clone()))
        .collect()
}
