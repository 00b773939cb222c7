// ==========================================
// 传单配布调度系统 - 主数据 (只读引用)
// ==========================================
// 区域 / 营业所 / 配布员 / 传单: 由外部维护，本引擎只保存ID并在展示时关联
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::area::AreaCapacity;

/// 小区域
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub area_id: i64,
    pub area_code: String,
    pub area_name: String,
    pub door_to_door_count: i64,
    pub multi_family_count: i64,
    pub capped_count: i64,
}

impl Area {
    pub fn capacity(&self) -> AreaCapacity {
        AreaCapacity {
            area_id: self.area_id,
            door_to_door_count: self.door_to_door_count,
            multi_family_count: self.multi_family_count,
            capped_count: self.capped_count,
        }
    }
}

/// 营业所
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub branch_id: i64,
    pub branch_name: String,
}

/// 配布员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distributor {
    pub distributor_id: i64,
    pub distributor_name: String,
}

/// 传单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flyer {
    pub flyer_id: i64,
    pub flyer_name: String,
    pub flyer_code: Option<String>, // 外部传单编码 (可为空)
}
