// ==========================================
// 传单配布调度系统 - 订单数量承诺
// ==========================================
// Commitment 为派生值，不持久化:
//   total_assigned = Σ planned_count (同一 order_id + flyer_id 的全部槽位)
// 上限 authorized_count 在订单配布确认时一次性写入
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// OrderFlyerAuthorization - 订单授权份数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFlyerAuthorization {
    pub order_id: i64,
    pub flyer_id: i64,
    pub authorized_count: i64,
}

// ==========================================
// Commitment - 跨计划份数承诺
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub order_id: i64,
    pub flyer_id: i64,
    pub authorized_count: Option<i64>, // 无授权记录时为 None (不设上限)
    pub total_assigned: i64,
}

impl Commitment {
    /// 是否超出授权份数
    pub fn is_over(&self) -> bool {
        self.authorized_count
            .map_or(false, |authorized| self.total_assigned > authorized)
    }

    /// 超出份数 (未超出时为 0)
    pub fn excess(&self) -> i64 {
        self.authorized_count
            .map_or(0, |authorized| (self.total_assigned - authorized).max(0))
    }
}
