use chrono::{Duration, Local};
use std::error::Error;
use std::fs;
use std::path::Path;

use flyer_dispatch::api::dto::{
    AreaAllocation, AssignRequest, ConfirmDistributionRequest, CreateFromDemandRequest,
    CreateScheduleRequest,
};
use flyer_dispatch::app::{get_default_db_path, AppState};
use flyer_dispatch::domain::{Area, Branch, Distributor, Flyer};
use flyer_dispatch::repository::{AreaRepository, MasterDataRepository};

const SEED_ACTOR: &str = "seed";

fn main() -> Result<(), Box<dyn Error>> {
    flyer_dispatch::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path.clone())?;
    let conn = std::sync::Arc::new(std::sync::Mutex::new(
        flyer_dispatch::db::open_sqlite_connection(&db_path)?,
    ));

    seed_master_data(&AreaRepository::new(conn.clone()), &MasterDataRepository::new(conn))?;
    seed_dispatch(&state)?;

    let today = Local::now().date_naive();
    let views = state.query_api.list_schedules(Default::default())?;
    let pool = state.query_api.list_unassigned(None, None)?;
    eprintln!(
        "Seeded {}: {} schedules in view from {}, {} unassigned demands",
        db_path,
        views.len(),
        today,
        pool.len()
    );
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_master_data(areas: &AreaRepository, master: &MasterDataRepository) -> Result<(), Box<dyn Error>> {
    let area_rows = [
        (101, "N-01", "北町一丁目", 1200, 800, 1000),
        (102, "N-02", "北町二丁目", 950, 600, 900),
        (201, "S-01", "南台一丁目", 1500, 1100, 1300),
    ];
    for (area_id, code, name, d2d, mf, capped) in area_rows {
        areas.upsert(&Area {
            area_id,
            area_code: code.to_string(),
            area_name: name.to_string(),
            door_to_door_count: d2d,
            multi_family_count: mf,
            capped_count: capped,
        })?;
    }

    for (branch_id, name) in [(1, "北営業所"), (2, "南営業所")] {
        master.upsert_branch(&Branch {
            branch_id,
            branch_name: name.to_string(),
        })?;
    }
    for (distributor_id, name) in [(11, "田中"), (12, "佐藤")] {
        master.upsert_distributor(&Distributor {
            distributor_id,
            distributor_name: name.to_string(),
        })?;
    }
    let flyers = [
        (501, "春のセール", Some("FL-SPRING")),
        (502, "新店オープン", Some("FL-OPEN")),
        (503, "地域情報誌", None),
    ];
    for (flyer_id, name, code) in flyers {
        master.upsert_flyer(&Flyer {
            flyer_id,
            flyer_name: name.to_string(),
            flyer_code: code.map(str::to_string),
        })?;
    }
    Ok(())
}

fn seed_dispatch(state: &AppState) -> Result<(), Box<dyn Error>> {
    let base = Local::now().date_naive();
    let fmt = |offset: i64| (base + Duration::days(offset)).format("%Y-%m-%d").to_string();

    let spring = state.intake_api.confirm_distribution_request(
        ConfirmDistributionRequest {
            order_id: 9001,
            flyer_id: 501,
            method: "DOOR_TO_DOOR".to_string(),
            authorized_count: 3000,
            start_date: Some(fmt(0)),
            end_date: Some(fmt(5)),
            spare_date: Some(fmt(7)),
            areas: vec![
                AreaAllocation { area_id: 101, planned_count: 1500 },
                AreaAllocation { area_id: 102, planned_count: 900 },
            ],
        },
        SEED_ACTOR,
    )?;

    let opening = state.intake_api.confirm_distribution_request(
        ConfirmDistributionRequest {
            order_id: 9002,
            flyer_id: 502,
            method: "MULTI_FAMILY".to_string(),
            authorized_count: 1000,
            start_date: Some(fmt(1)),
            end_date: Some(fmt(3)),
            spare_date: None,
            areas: vec![
                AreaAllocation { area_id: 101, planned_count: 700 },
                AreaAllocation { area_id: 201, planned_count: 900 },
            ],
        },
        SEED_ACTOR,
    )?;

    // 北町一丁目: 由需求生成 (超出区域产能的部分回到需求池)
    let first = state.dispatch_api.create_schedule_from_demand(
        CreateFromDemandRequest {
            demand_id: spring.demands[0].demand_id.clone(),
            date: fmt(1),
            view_from: Some(fmt(0)),
            view_to: Some(fmt(6)),
        },
        SEED_ACTOR,
    )?;

    let same_area = opening
        .demands
        .iter()
        .find(|d| d.area_id == first.schedule.area_id)
        .ok_or("demo demand for area 101 missing")?;
    state.dispatch_api.assign(
        AssignRequest {
            schedule_id: first.schedule.schedule_id.clone(),
            slot_index: 2,
            demand_id: same_area.demand_id.clone(),
        },
        SEED_ACTOR,
    )?;

    // 南台一丁目: 空计划，留给操作员落位
    state.dispatch_api.create_schedule(
        CreateScheduleRequest {
            date: fmt(2),
            area_id: 201,
            branch_id: Some(2),
            distributor_id: Some(12),
        },
        SEED_ACTOR,
    )?;
    Ok(())
}
