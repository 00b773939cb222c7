// ==========================================
// 传单配布调度系统 - 落位校验引擎
// ==========================================
// 职责: assign / move 前的纯校验，目标日期决策，首槽份数封顶
// 红线: Engine 不拼 SQL, 所有拒绝必须输出 reason
// 校验顺序: 区域一致 → 传单不重复 → 槽位空闲
// ==========================================

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::domain::demand::DemandUnit;
use crate::domain::schedule::Schedule;

// ==========================================
// 校验输入
// ==========================================

/// 待落位的传单（来自需求或被移动的分配）
#[derive(Debug, Clone)]
pub struct PlacementCandidate {
    pub area_id: i64,
    pub flyer_id: i64,
    pub flyer_code: Option<String>,
    pub slot_index: u8,
    /// 被移动的分配自身，重复/占用校验时排除
    pub moving_item_id: Option<String>,
}

/// 目标计划中已有的落位
#[derive(Debug, Clone)]
pub struct SlotOccupant {
    pub item_id: String,
    pub slot_index: u8,
    pub flyer_id: i64,
    pub flyer_code: Option<String>,
}

// ==========================================
// AllocationViolation - 拒绝原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AllocationViolation {
    AreaMismatch {
        candidate_area_id: i64,
        schedule_area_id: i64,
    },
    DuplicateFlyer {
        flyer_id: i64,
        existing_item_id: String,
        matched_code: Option<String>,
    },
    SlotOccupied {
        slot_index: u8,
        existing_item_id: String,
    },
}

impl fmt::Display for AllocationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationViolation::AreaMismatch {
                candidate_area_id,
                schedule_area_id,
            } => write!(
                f,
                "区域不一致: 传单区域={} 计划区域={}",
                candidate_area_id, schedule_area_id
            ),
            AllocationViolation::DuplicateFlyer {
                flyer_id,
                existing_item_id,
                matched_code: Some(code),
            } => write!(
                f,
                "传单编码{}已在计划中 (flyer_id={}, 已有分配={})",
                code, flyer_id, existing_item_id
            ),
            AllocationViolation::DuplicateFlyer {
                flyer_id,
                existing_item_id,
                matched_code: None,
            } => write!(f, "传单{}已在计划中 (已有分配={})", flyer_id, existing_item_id),
            AllocationViolation::SlotOccupied {
                slot_index,
                existing_item_id,
            } => write!(f, "槽位{}已被占用 (已有分配={})", slot_index, existing_item_id),
        }
    }
}

// ==========================================
// TargetDate - 由需求生成计划时的日期决策
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetDate {
    pub date: NaiveDate,
    /// 请求日期不在需求窗口内，已回退
    pub fell_back: bool,
    /// 目标日期不在当前视图内，调用方需扩展视图
    pub view_shift_required: bool,
}

/// 首槽份数封顶结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedCount {
    pub slot_count: i64,
    /// 超出产能的部分，放回需求池
    pub residual: i64,
}

// ==========================================
// AllocationEngine - 落位校验引擎
// ==========================================
pub struct AllocationEngine {
    // 无状态引擎
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 校验落位
    ///
    /// 重复判断: flyer_id 相同 OR (双方均有编码且编码相同)，两者独立
    pub fn check_placement(
        &self,
        schedule: &Schedule,
        candidate: &PlacementCandidate,
        occupants: &[SlotOccupant],
    ) -> Result<(), AllocationViolation> {
        if candidate.area_id != schedule.area_id {
            return Err(AllocationViolation::AreaMismatch {
                candidate_area_id: candidate.area_id,
                schedule_area_id: schedule.area_id,
            });
        }

        let others = occupants
            .iter()
            .filter(|o| Some(o.item_id.as_str()) != candidate.moving_item_id.as_deref());

        for occupant in others.clone() {
            if occupant.flyer_id == candidate.flyer_id {
                return Err(AllocationViolation::DuplicateFlyer {
                    flyer_id: candidate.flyer_id,
                    existing_item_id: occupant.item_id.clone(),
                    matched_code: None,
                });
            }
            if let (Some(mine), Some(theirs)) = (&candidate.flyer_code, &occupant.flyer_code) {
                if mine == theirs {
                    return Err(AllocationViolation::DuplicateFlyer {
                        flyer_id: candidate.flyer_id,
                        existing_item_id: occupant.item_id.clone(),
                        matched_code: Some(mine.clone()),
                    });
                }
            }
        }

        if let Some(occupant) = others.into_iter().find(|o| o.slot_index == candidate.slot_index) {
            return Err(AllocationViolation::SlotOccupied {
                slot_index: candidate.slot_index,
                existing_item_id: occupant.item_id.clone(),
            });
        }

        Ok(())
    }

    /// 决定由需求生成计划的日期
    ///
    /// 规则:
    /// 1) 请求日期在需求窗口内 → 请求日期
    /// 2) 否则 → 结束日；无结束日 → 开始日；均无 → 请求日期
    /// 3) 给出视图时，目标日期超出视图即需扩展视图；
    ///    未给出视图时，以是否偏离请求日期判断
    pub fn resolve_target_date(
        &self,
        demand: &DemandUnit,
        requested: NaiveDate,
        view: Option<(NaiveDate, NaiveDate)>,
    ) -> TargetDate {
        let (date, fell_back) = if demand.window_contains(requested) {
            (requested, false)
        } else {
            let fallback = demand.end_date.or(demand.start_date).unwrap_or(requested);
            (fallback, true)
        };

        let view_shift_required = match view {
            Some((from, to)) => date < from || date > to,
            None => date != requested,
        };

        TargetDate {
            date,
            fell_back,
            view_shift_required,
        }
    }

    /// 首槽份数 = min(需求份数, 区域产能)
    ///
    /// 产能未知时不封顶
    pub fn cap_to_capacity(&self, planned_count: i64, capacity: Option<i64>) -> CappedCount {
        match capacity {
            Some(cap) if planned_count > cap.max(0) => CappedCount {
                slot_count: cap.max(0),
                residual: planned_count - cap.max(0),
            },
            _ => CappedCount {
                slot_count: planned_count,
                residual: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::DistributionMethod;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn schedule(area_id: i64) -> Schedule {
        Schedule::new(d(3, 5), area_id, None, None)
    }

    fn candidate(area_id: i64, flyer_id: i64, code: Option<&str>, slot: u8) -> PlacementCandidate {
        PlacementCandidate {
            area_id,
            flyer_id,
            flyer_code: code.map(str::to_string),
            slot_index: slot,
            moving_item_id: None,
        }
    }

    fn occupant(item: &str, slot: u8, flyer_id: i64, code: Option<&str>) -> SlotOccupant {
        SlotOccupant {
            item_id: item.to_string(),
            slot_index: slot,
            flyer_id,
            flyer_code: code.map(str::to_string),
        }
    }

    #[test]
    fn test_area_mismatch_checked_first() {
        let engine = AllocationEngine::new();
        let occupants = vec![occupant("I1", 1, 7, None)];
        let err = engine
            .check_placement(&schedule(5), &candidate(6, 7, None, 1), &occupants)
            .unwrap_err();
        assert!(matches!(err, AllocationViolation::AreaMismatch { .. }));
    }

    #[test]
    fn test_duplicate_by_id_or_code() {
        let engine = AllocationEngine::new();
        let occupants = vec![occupant("I1", 1, 7, Some("FC-7"))];

        let by_id = engine
            .check_placement(&schedule(5), &candidate(5, 7, None, 2), &occupants)
            .unwrap_err();
        assert!(matches!(by_id, AllocationViolation::DuplicateFlyer { matched_code: None, .. }));

        let by_code = engine
            .check_placement(&schedule(5), &candidate(5, 8, Some("FC-7"), 2), &occupants)
            .unwrap_err();
        assert!(matches!(
            by_code,
            AllocationViolation::DuplicateFlyer { matched_code: Some(_), .. }
        ));

        // 一方无编码不构成重复
        assert!(engine
            .check_placement(&schedule(5), &candidate(5, 8, None, 2), &occupants)
            .is_ok());
    }

    #[test]
    fn test_slot_occupied_after_duplicate() {
        let engine = AllocationEngine::new();
        let occupants = vec![occupant("I1", 1, 7, None)];
        let err = engine
            .check_placement(&schedule(5), &candidate(5, 8, None, 1), &occupants)
            .unwrap_err();
        assert_eq!(
            err,
            AllocationViolation::SlotOccupied {
                slot_index: 1,
                existing_item_id: "I1".to_string()
            }
        );
    }

    #[test]
    fn test_moving_item_excluded_from_checks() {
        let engine = AllocationEngine::new();
        let occupants = vec![occupant("I1", 1, 7, None), occupant("I2", 2, 8, None)];
        let mut moving = candidate(5, 7, None, 3);
        moving.moving_item_id = Some("I1".to_string());
        assert!(engine.check_placement(&schedule(5), &moving, &occupants).is_ok());

        moving.slot_index = 2;
        assert!(matches!(
            engine.check_placement(&schedule(5), &moving, &occupants),
            Err(AllocationViolation::SlotOccupied { .. })
        ));
    }

    fn demand(start: Option<NaiveDate>, end: Option<NaiveDate>) -> DemandUnit {
        DemandUnit {
            demand_id: "D1".to_string(),
            order_id: 100,
            flyer_id: 7,
            area_id: 5,
            method: DistributionMethod::DoorToDoor,
            planned_count: 3000,
            start_date: start,
            end_date: end,
            spare_date: None,
        }
    }

    #[test]
    fn test_target_date_falls_back_to_end_date() {
        let engine = AllocationEngine::new();
        let unit = demand(Some(d(3, 8)), Some(d(3, 10)));

        let target = engine.resolve_target_date(&unit, d(3, 3), Some((d(3, 1), d(3, 5))));
        assert_eq!(target.date, d(3, 10));
        assert!(target.fell_back);
        assert!(target.view_shift_required);

        let inside = engine.resolve_target_date(&unit, d(3, 9), Some((d(3, 6), d(3, 12))));
        assert_eq!(inside.date, d(3, 9));
        assert!(!inside.fell_back);
        assert!(!inside.view_shift_required);
    }

    #[test]
    fn test_target_date_without_end_uses_start() {
        let engine = AllocationEngine::new();
        let unit = demand(Some(d(3, 8)), None);
        let target = engine.resolve_target_date(&unit, d(3, 3), None);
        assert_eq!(target.date, d(3, 8));
        assert!(target.view_shift_required);
    }

    #[test]
    fn test_cap_to_capacity() {
        let engine = AllocationEngine::new();
        assert_eq!(
            engine.cap_to_capacity(3000, Some(2500)),
            CappedCount { slot_count: 2500, residual: 500 }
        );
        assert_eq!(
            engine.cap_to_capacity(1000, Some(2500)),
            CappedCount { slot_count: 1000, residual: 0 }
        );
        assert_eq!(
            engine.cap_to_capacity(1000, None),
            CappedCount { slot_count: 1000, residual: 0 }
        );
    }
}
