// ==========================================
// 传单配布调度系统 - 小区域产能领域模型
// ==========================================
// 产能数值由外部 (多边形计算) 产出，这里只作为不透明输入使用
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;

use crate::domain::types::DistributionMethod;

// ==========================================
// AreaCapacity - 小区域产能
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaCapacity {
    pub area_id: i64,
    pub door_to_door_count: i64, // 全户数
    pub multi_family_count: i64, // 集合住宅户数
    pub capped_count: i64,       // 排除后上限数
}

impl AreaCapacity {
    /// 按配布方式取产能
    pub fn for_method(&self, method: DistributionMethod) -> i64 {
        match method {
            DistributionMethod::DoorToDoor => self.door_to_door_count,
            DistributionMethod::MultiFamily => self.multi_family_count,
            DistributionMethod::CappedWithExclusions => self.capped_count,
        }
    }
}

// ==========================================
// Trait: AreaCapacityProvider
// ==========================================
// 用途: 按需求生成计划时，为首个槽位份数封顶
// 实现者: AreaRepository（从 area 表读取）
pub trait AreaCapacityProvider: Send + Sync {
    /// 查询区域产能
    ///
    /// # 返回
    /// - Ok(Some): 区域存在
    /// - Ok(None): 区域未登记产能
    fn capacity_of(&self, area_id: i64) -> Result<Option<AreaCapacity>, Box<dyn Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_selected_by_method() {
        let cap = AreaCapacity {
            area_id: 5,
            door_to_door_count: 2500,
            multi_family_count: 900,
            capped_count: 2100,
        };
        assert_eq!(cap.for_method(DistributionMethod::DoorToDoor), 2500);
        assert_eq!(cap.for_method(DistributionMethod::MultiFamily), 900);
        assert_eq!(cap.for_method(DistributionMethod::CappedWithExclusions), 2100);
    }
}
