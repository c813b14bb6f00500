use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    catalog::repo_types::{Order, Product},
    users::record::UserRecord,
};

const RECENT_ORDERS: usize = 5;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: usize,
    pub blocked_users: usize,
    pub users_by_role: BTreeMap<&'static str, usize>,
    pub total_products: usize,
    pub total_orders: usize,
    pub revenue: f64,
    pub recent_orders: Vec<Order>,
}

pub fn compute_stats(users: &[UserRecord], products: &[Product], orders: Vec<Order>) -> DashboardStats {
    let mut users_by_role = BTreeMap::new();
    let mut blocked_users = 0;
    for u in users {
        let key = u.role.map(|r| r.as_str()).unwrap_or("unknown");
        *users_by_role.entry(key).or_insert(0) += 1;
        if u.is_blocked {
            blocked_users += 1;
        }
    }

    let revenue: f64 = orders
        .iter()
        .filter(|o| !o.is_cancelled())
        .map(|o| o.total)
        .sum();
    let total_orders = orders.len();

    let mut recent_orders = orders;
    recent_orders.sort_by_key(|o| std::cmp::Reverse(o.created_at.unwrap_or(OffsetDateTime::UNIX_EPOCH)));
    recent_orders.truncate(RECENT_ORDERS);

    DashboardStats {
        total_users: users.len(),
        blocked_users,
        users_by_role,
        total_products: products.len(),
        total_orders,
        revenue,
        recent_orders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::role::Role;
    use serde_json::json;

    fn order(id: &str, total: f64, status: &str, secs: i64) -> Order {
        serde_json::from_value(json!({
            "id": id,
            "total": total,
            "status": status,
            "createdAt": { "seconds": secs, "nanoseconds": 0 }
        }))
        .unwrap()
    }

    #[test]
    fn counts_users_and_revenue() {
        let mut blocked = UserRecord::new("u3", "c@x.com", Some(Role::Client));
        blocked.is_blocked = true;
        let users = vec![
            UserRecord::new("u1", "a@x.com", Some(Role::Client)),
            UserRecord::new("u2", "b@x.com", Some(Role::Admin)),
            blocked,
            UserRecord::new("u4", "d@x.com", None),
        ];
        let orders = vec![
            order("o1", 25.0, "paid", 100),
            order("o2", 50.0, "cancelled", 200),
            order("o3", 10.5, "paid", 300),
        ];
        let stats = compute_stats(&users, &[], orders);

        assert_eq!(stats.total_users, 4);
        assert_eq!(stats.blocked_users, 1);
        assert_eq!(stats.users_by_role["client"], 2);
        assert_eq!(stats.users_by_role["admin"], 1);
        assert_eq!(stats.users_by_role["unknown"], 1);
        assert_eq!(stats.total_orders, 3);
        assert!((stats.revenue - 35.5).abs() < f64::EPSILON);
        let recent: Vec<_> = stats.recent_orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(recent, ["o3", "o2", "o1"]);
    }

    #[test]
    fn keeps_only_five_recent_orders() {
        let orders = (0..8).map(|i| order(&format!("o{i}"), 1.0, "paid", i)).collect();
        let stats = compute_stats(&[], &[], orders);
        assert_eq!(stats.recent_orders.len(), 5);
        assert_eq!(stats.recent_orders[0].id, "o7");
        assert_eq!(stats.total_orders, 8);
    }
}
