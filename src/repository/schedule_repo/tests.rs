use super::{ScheduleRepository, SlotAssignmentRepository};
use crate::domain::demand::DemandUnit;
use crate::domain::schedule::{Schedule, SlotAssignment};
use crate::domain::types::{DistributionMethod, ScheduleStatus};
use crate::repository::error::RepositoryError;
use crate::repository::order_repo::OrderAuthorizationRepository;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn setup() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()))
}

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, m, day).unwrap()
}

fn demand(flyer_id: i64, count: i64) -> DemandUnit {
    DemandUnit {
        demand_id: format!("D{}", flyer_id),
        order_id: 100,
        flyer_id,
        area_id: 5,
        method: DistributionMethod::DoorToDoor,
        planned_count: count,
        start_date: Some(d(3, 1)),
        end_date: Some(d(3, 10)),
        spare_date: None,
    }
}

#[test]
fn test_schedule_insert_find_update_delete() {
    let conn = setup();
    let repo = ScheduleRepository::new(conn.clone());
    let mut schedule = Schedule::new(d(3, 5), 5, Some(1), None);

    {
        let c = conn.lock().unwrap();
        ScheduleRepository::insert_in(&c, &schedule).unwrap();
    }
    let found = repo.find_by_id(&schedule.schedule_id).unwrap().unwrap();
    assert_eq!(found.schedule_date, d(3, 5));
    assert_eq!(found.status, ScheduleStatus::Unstarted);

    schedule.status = ScheduleStatus::InProgress;
    schedule.distributor_id = Some(9);
    {
        let c = conn.lock().unwrap();
        ScheduleRepository::update_in(&c, &schedule).unwrap();
    }
    let found = repo.find_by_id(&schedule.schedule_id).unwrap().unwrap();
    assert_eq!(found.status, ScheduleStatus::InProgress);
    assert_eq!(found.distributor_id, Some(9));

    let c = conn.lock().unwrap();
    ScheduleRepository::delete_in(&c, &schedule.schedule_id).unwrap();
    let err = ScheduleRepository::delete_in(&c, &schedule.schedule_id).unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[test]
fn test_list_by_date_range_is_inclusive() {
    let conn = setup();
    {
        let c = conn.lock().unwrap();
        for day in [1, 5, 10, 11] {
            ScheduleRepository::insert_in(&c, &Schedule::new(d(3, day), 5, None, None)).unwrap();
        }
    }
    let repo = ScheduleRepository::new(conn);
    let dates: Vec<NaiveDate> = repo
        .list_by_date_range(d(3, 1), d(3, 10))
        .unwrap()
        .into_iter()
        .map(|s| s.schedule_date)
        .collect();
    assert_eq!(dates, vec![d(3, 1), d(3, 5), d(3, 10)]);
}

#[test]
fn test_slot_unique_constraints() {
    let conn = setup();
    let schedule = Schedule::new(d(3, 5), 5, None, None);
    let c = conn.lock().unwrap();
    ScheduleRepository::insert_in(&c, &schedule).unwrap();

    let first = SlotAssignment::from_demand(&demand(7, 100), &schedule.schedule_id, 1);
    SlotAssignmentRepository::insert_in(&c, &first).unwrap();

    // 同槽位
    let same_slot = SlotAssignment::from_demand(&demand(8, 100), &schedule.schedule_id, 1);
    let err = SlotAssignmentRepository::insert_in(&c, &same_slot).unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

    // 同传单
    let same_flyer = SlotAssignment::from_demand(&demand(7, 100), &schedule.schedule_id, 2);
    let err = SlotAssignmentRepository::insert_in(&c, &same_flyer).unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
}

#[test]
fn test_slot_requires_existing_schedule() {
    let conn = setup();
    let c = conn.lock().unwrap();
    let orphan = SlotAssignment::from_demand(&demand(7, 100), "missing", 1);
    let err = SlotAssignmentRepository::insert_in(&c, &orphan).unwrap_err();
    assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
}

#[test]
fn test_slot_move_quantity_and_sum() {
    let conn = setup();
    let a = Schedule::new(d(3, 5), 5, None, None);
    let b = Schedule::new(d(3, 6), 5, None, None);
    let c = conn.lock().unwrap();
    ScheduleRepository::insert_in(&c, &a).unwrap();
    ScheduleRepository::insert_in(&c, &b).unwrap();

    let item = SlotAssignment::from_demand(&demand(7, 600), &a.schedule_id, 1);
    let other = SlotAssignment::from_demand(&demand(7, 600), &b.schedule_id, 1);
    SlotAssignmentRepository::insert_in(&c, &item).unwrap();
    SlotAssignmentRepository::insert_in(&c, &other).unwrap();
    assert_eq!(OrderAuthorizationRepository::commitment_in(&c, 100, 7).unwrap().total_assigned, 1200);

    SlotAssignmentRepository::update_quantity_in(&c, &item.item_id, 400).unwrap();
    assert_eq!(OrderAuthorizationRepository::commitment_in(&c, 100, 7).unwrap().total_assigned, 1000);
    assert_eq!(OrderAuthorizationRepository::commitment_in(&c, 100, 8).unwrap().total_assigned, 0);

    SlotAssignmentRepository::delete_in(&c, &other.item_id).unwrap();
    SlotAssignmentRepository::update_parent_in(&c, &item.item_id, &b.schedule_id, 4).unwrap();
    let moved = SlotAssignmentRepository::require_in(&c, &item.item_id).unwrap();
    assert_eq!(moved.schedule_id, b.schedule_id);
    assert_eq!(moved.slot_index, 4);

    let ids = vec![a.schedule_id.clone(), b.schedule_id.clone()];
    let all = SlotAssignmentRepository::find_by_schedules_in(&c, &ids).unwrap();
    assert_eq!(all.len(), 1);
    assert!(SlotAssignmentRepository::find_by_schedule_in(&c, &a.schedule_id)
        .unwrap()
        .is_empty());
}
