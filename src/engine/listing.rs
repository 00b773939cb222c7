// ==========================================
// 传单配布调度系统 - 列表过滤排序引擎
// ==========================================
// 职责: 计划列表的状态/关键字过滤 + 稳定排序，需求池视图过滤
// 红线: Engine 不拼 SQL
// ==========================================

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::domain::demand::DemandUnit;
use crate::domain::types::{ScheduleSortKey, ScheduleStatus, SortDirection};

// ==========================================
// Trait: ListingRow - 可列表化的计划行
// ==========================================
pub trait ListingRow {
    fn schedule_date(&self) -> NaiveDate;
    fn status(&self) -> ScheduleStatus;
    fn area_code(&self) -> Option<&str>;
    fn branch_name(&self) -> Option<&str>;
    /// 关键字检索目标: 配布员名、区域名、全部传单名
    fn search_texts(&self) -> Vec<&str>;
}

/// 计划列表过滤条件
#[derive(Debug, Clone)]
pub struct ScheduleFilter {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub status: Option<ScheduleStatus>,
    pub query: Option<String>,
    pub sort_key: ScheduleSortKey,
    pub sort_dir: SortDirection,
}

pub struct ListingEngine {
    // 无状态引擎
}

impl Default for ListingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 过滤 + 稳定排序
    ///
    /// - 日期区间含边界
    /// - 状态精确匹配
    /// - 关键字: 去首尾空白后大小写不敏感的子串匹配，空关键字不过滤
    /// - 排序: 相等键保持输入顺序；缺失的区域代码/营业所无论升降序均排最后
    pub fn filter_and_sort<T: ListingRow>(&self, rows: Vec<T>, filter: &ScheduleFilter) -> Vec<T> {
        let needle = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut kept: Vec<T> = rows
            .into_iter()
            .filter(|row| {
                let date = row.schedule_date();
                date >= filter.date_from && date <= filter.date_to
            })
            .filter(|row| filter.status.map_or(true, |s| row.status() == s))
            .filter(|row| match &needle {
                Some(q) => row
                    .search_texts()
                    .iter()
                    .any(|text| text.to_lowercase().contains(q.as_str())),
                None => true,
            })
            .collect();

        let dir = filter.sort_dir;
        match filter.sort_key {
            ScheduleSortKey::Date => {
                kept.sort_by(|a, b| directed(a.schedule_date().cmp(&b.schedule_date()), dir))
            }
            ScheduleSortKey::AreaCode => {
                kept.sort_by(|a, b| compare_optional(a.area_code(), b.area_code(), dir))
            }
            ScheduleSortKey::Branch => {
                kept.sort_by(|a, b| compare_optional(a.branch_name(), b.branch_name(), dir))
            }
        }
        kept
    }

    /// 需求池视图过滤: 需求窗口与视图相交 (空边界视为无界)
    pub fn filter_unassigned(
        &self,
        units: Vec<DemandUnit>,
        view_from: Option<NaiveDate>,
        view_to: Option<NaiveDate>,
    ) -> Vec<DemandUnit> {
        units
            .into_iter()
            .filter(|u| u.intersects_view(view_from, view_to))
            .collect()
    }
}

fn directed(ord: Ordering, dir: SortDirection) -> Ordering {
    match dir {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

fn compare_optional(a: Option<&str>, b: Option<&str>, dir: SortDirection) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => directed(x.cmp(y), dir),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        id: &'static str,
        date: NaiveDate,
        status: ScheduleStatus,
        area_code: Option<&'static str>,
        branch: Option<&'static str>,
        texts: Vec<&'static str>,
    }

    impl ListingRow for Row {
        fn schedule_date(&self) -> NaiveDate {
            self.date
        }
        fn status(&self) -> ScheduleStatus {
            self.status
        }
        fn area_code(&self) -> Option<&str> {
            self.area_code
        }
        fn branch_name(&self) -> Option<&str> {
            self.branch
        }
        fn search_texts(&self) -> Vec<&str> {
            self.texts.clone()
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: "a", date: d(3), status: ScheduleStatus::Unstarted, area_code: Some("A-02"), branch: Some("南"), texts: vec!["Tanaka", "Spring Sale"] },
            Row { id: "b", date: d(1), status: ScheduleStatus::Completed, area_code: Some("A-01"), branch: None, texts: vec!["Suzuki"] },
            Row { id: "c", date: d(3), status: ScheduleStatus::Unstarted, area_code: None, branch: Some("北"), texts: vec!["Grand Opening"] },
            Row { id: "d", date: d(9), status: ScheduleStatus::Unstarted, area_code: Some("A-01"), branch: Some("北"), texts: vec![] },
        ]
    }

    fn filter(key: ScheduleSortKey, dir: SortDirection) -> ScheduleFilter {
        ScheduleFilter {
            date_from: d(1),
            date_to: d(5),
            status: None,
            query: None,
            sort_key: key,
            sort_dir: dir,
        }
    }

    fn ids(rows: &[Row]) -> Vec<&'static str> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_date_sort_is_stable_both_directions() {
        let engine = ListingEngine::new();
        let asc = engine.filter_and_sort(rows(), &filter(ScheduleSortKey::Date, SortDirection::Asc));
        assert_eq!(ids(&asc), vec!["b", "a", "c"]);
        let desc = engine.filter_and_sort(rows(), &filter(ScheduleSortKey::Date, SortDirection::Desc));
        assert_eq!(ids(&desc), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_missing_keys_sort_last() {
        let engine = ListingEngine::new();
        let by_area = engine.filter_and_sort(rows(), &filter(ScheduleSortKey::AreaCode, SortDirection::Desc));
        assert_eq!(ids(&by_area), vec!["a", "b", "c"]);
        let by_branch = engine.filter_and_sort(rows(), &filter(ScheduleSortKey::Branch, SortDirection::Asc));
        assert_eq!(ids(&by_branch), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_status_and_query_filters() {
        let engine = ListingEngine::new();
        let mut f = filter(ScheduleSortKey::Date, SortDirection::Asc);
        f.status = Some(ScheduleStatus::Unstarted);
        f.query = Some("  spring ".to_string());
        assert_eq!(ids(&engine.filter_and_sort(rows(), &f)), vec!["a"]);

        f.query = Some("   ".to_string());
        assert_eq!(ids(&engine.filter_and_sort(rows(), &f)), vec!["a", "c"]);
    }
}
