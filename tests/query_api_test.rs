// ==========================================
// QueryApi / IntakeApi 集成测试
// ==========================================
// 测试范围:
// 1. 告警: 超量 (跨计划汇总) / 早于开始日 / 超预备日 / 超结束日
// 2. 列表: 日期区间 / 状态 / 关键字 / 排序
// 3. 需求池: 视图相交过滤
// 4. 受理: 校验与需求生成
// ==========================================


use chrono::{Duration, NaiveDate};
use flyer_dispatch::api::dto::{
    AreaAllocation, AssignRequest, ConfirmDistributionRequest, ListSchedulesRequest,
    UpdateQuantityRequest,
};
use flyer_dispatch::api::ApiError;
use flyer_dispatch::config::config_manager::MAX_VIEW_DAYS;
use flyer_dispatch::config::config_keys;
use flyer_dispatch::domain::{AlertReason, ScheduleFieldUpdate, ScheduleStatus};
use test_helpers::*;

fn place(env: &TestEnv, schedule_id: &str, slot_index: i64, demand_id: &str) -> String {
    env.state
        .dispatch_api
        .assign(
            AssignRequest {
                schedule_id: schedule_id.to_string(),
                slot_index,
                demand_id: demand_id.to_string(),
            },
            ACTOR,
        )
        .expect("落位失败")
        .item_id
}

fn list(env: &TestEnv, req: ListSchedulesRequest) -> Vec<flyer_dispatch::api::dto::ScheduleView> {
    env.state.query_api.list_schedules(req).expect("列表查询失败")
}

fn march(sort_key: Option<&str>, sort_dir: Option<&str>) -> ListSchedulesRequest {
    ListSchedulesRequest {
        date_from: Some(ds(3, 1)),
        date_to: Some(ds(3, 31)),
        sort_key: sort_key.map(str::to_string),
        sort_dir: sort_dir.map(str::to_string),
        ..Default::default()
    }
}

// ==========================================
// 告警
// ==========================================

#[test]
fn test_over_count_跨计划汇总且按建议份数修正后消除() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let demands = env.confirm(
        500,
        FLYER_AUTUMN,
        1000,
        OPEN_WINDOW,
        &[(AREA_EAST, 700), (AREA_WEST, 500)],
    );
    let east = env.create_schedule(d(3, 4), AREA_EAST);
    let west = env.create_schedule(d(3, 5), AREA_WEST);
    for demand in &demands {
        let schedule = if demand.area_id == AREA_EAST { &east } else { &west };
        place(&env, &schedule.schedule_id, 1, &demand.demand_id);
    }

    let views = list(&env, march(None, None));
    assert_eq!(views.len(), 2);
    for view in &views {
        let slot = &view.slots[0];
        assert!(slot.alert.is_over_count);
        assert!(slot.alert.is_danger);
        assert_eq!(slot.alert.excess, 200);
        assert_eq!(slot.alert.alert_reasons, vec![AlertReason::OverCount]);
        assert!(view.has_alert);
    }

    // 对其中一条应用建议份数
    let east_slot = &views
        .iter()
        .find(|v| v.area_id == AREA_EAST)
        .unwrap()
        .slots[0];
    assert_eq!(east_slot.alert.suggested_count, Some(500));
    env.state
        .dispatch_api
        .update_quantity(
            UpdateQuantityRequest {
                item_id: east_slot.item_id.clone(),
                planned_count: east_slot.alert.suggested_count.unwrap(),
            },
            ACTOR,
        )
        .unwrap();

    let views = list(&env, march(None, None));
    for view in &views {
        assert!(!view.slots[0].alert.is_over_count, "修正后双方都不再超量");
        assert_eq!(view.slots[0].alert.suggested_count, None);
        assert!(!view.has_alert);
    }

    let commitment = env.state.intake_api.get_commitment(500, FLYER_AUTUMN).unwrap();
    assert_eq!(commitment.total_assigned, 1000);
    assert_eq!(commitment.authorized_count, Some(1000));
    assert!(!commitment.is_over);
}

#[test]
fn test_over_count_超量随份数单调() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let demand = env.confirm(501, FLYER_SPRING, 1000, OPEN_WINDOW, &[(AREA_EAST, 900)]).remove(0);
    let schedule = env.create_schedule(d(3, 4), AREA_EAST);
    let item_id = place(&env, &schedule.schedule_id, 1, &demand.demand_id);

    let mut was_over = false;
    for count in [900, 1000, 1001, 1500] {
        env.state
            .dispatch_api
            .update_quantity(
                UpdateQuantityRequest {
                    item_id: item_id.clone(),
                    planned_count: count,
                },
                ACTOR,
            )
            .unwrap();
        let view = env.state.query_api.get_schedule(&schedule.schedule_id).unwrap();
        let is_over = view.slots[0].alert.is_over_count;
        assert_eq!(is_over, count > 1000, "count={}", count);
        assert!(!was_over || is_over, "份数增加后超量不应消失");
        was_over = is_over;
    }
}

#[test]
fn test_date_alerts_超结束日为警告_超预备日为危险() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let demand = env.demand(
        600,
        FLYER_SPRING,
        AREA_EAST,
        100,
        (Some(d(3, 20)), Some(d(4, 1)), Some(d(4, 5))),
    );
    let schedule = env.create_schedule(d(4, 3), AREA_EAST);
    place(&env, &schedule.schedule_id, 1, &demand.demand_id);

    let view = env.state.query_api.get_schedule(&schedule.schedule_id).unwrap();
    let alert = &view.slots[0].alert;
    assert!(alert.is_warning);
    assert!(!alert.is_danger);
    assert!(alert.is_over_end_date);
    assert_eq!(alert.alert_reasons, vec![AlertReason::OverEndDate]);
    assert!(!view.has_alert, "仅警告不计入计划告警");

    env.state
        .dispatch_api
        .update_schedule_fields(&schedule.schedule_id, vec![ScheduleFieldUpdate::Date(d(4, 6))], ACTOR)
        .unwrap();

    let view = env.state.query_api.get_schedule(&schedule.schedule_id).unwrap();
    let alert = &view.slots[0].alert;
    assert!(alert.is_danger);
    assert!(alert.is_over_spare_date);
    assert!(!alert.is_warning);
    assert_eq!(alert.alert_reasons, vec![AlertReason::OverSpareDate]);
    assert!(view.has_alert);
}

#[test]
fn test_date_alerts_早于开始日() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let demand = env.demand(601, FLYER_SPRING, AREA_EAST, 100, (Some(d(3, 10)), Some(d(3, 20)), None));
    let schedule = env.create_schedule(d(3, 9), AREA_EAST);
    place(&env, &schedule.schedule_id, 1, &demand.demand_id);

    let view = env.state.query_api.get_schedule(&schedule.schedule_id).unwrap();
    assert!(view.slots[0].alert.is_before_start);
    assert_eq!(view.slots[0].alert.alert_reasons, vec![AlertReason::BeforeStart]);
    assert!(view.has_alert);
}

#[test]
fn test_get_schedule_关联主数据名称() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let schedule = env.create_schedule(d(3, 4), AREA_EAST);
    env.state
        .dispatch_api
        .update_schedule_fields(
            &schedule.schedule_id,
            vec![
                ScheduleFieldUpdate::BranchId(Some(2)),
                ScheduleFieldUpdate::DistributorId(Some(12)),
            ],
            ACTOR,
        )
        .unwrap();
    let demand = env.demand(602, FLYER_SPRING, AREA_EAST, 100, OPEN_WINDOW);
    place(&env, &schedule.schedule_id, 2, &demand.demand_id);

    let view = env.state.query_api.get_schedule(&schedule.schedule_id).unwrap();
    assert_eq!(view.area_code.as_deref(), Some("E-05"));
    assert_eq!(view.branch_name.as_deref(), Some("South Branch"));
    assert_eq!(view.distributor_name.as_deref(), Some("Sato"));
    assert_eq!(view.slots[0].flyer_name.as_deref(), Some("Spring Sale"));
    assert_eq!(view.slots[0].flyer_code.as_deref(), Some("FL-100"));

    let missing = env.state.query_api.get_schedule("missing");
    assert!(matches!(missing, Err(ApiError::NotFound(_))));
}

// ==========================================
// 列表
// ==========================================

#[test]
fn test_list_schedules_日期区间含边界() {
    let env = TestEnv::new().expect("无法创建测试环境");
    for day in [1, 5, 10, 11] {
        env.create_schedule(d(3, day), AREA_EAST);
    }

    let views = list(
        &env,
        ListSchedulesRequest {
            date_from: Some(ds(3, 5)),
            date_to: Some(ds(3, 10)),
            ..Default::default()
        },
    );
    let dates: Vec<_> = views.iter().map(|v| v.schedule_date).collect();
    assert_eq!(dates, vec![d(3, 5), d(3, 10)]);
}

#[test]
fn test_list_schedules_单侧日期按默认天数展开() {
    let env = TestEnv::new().expect("无法创建测试环境");
    for day in [1, 7, 8] {
        env.create_schedule(d(3, day), AREA_EAST);
    }

    // 默认 7 天: 3/1 ~ 3/7
    let views = list(
        &env,
        ListSchedulesRequest {
            date_from: Some(ds(3, 1)),
            ..Default::default()
        },
    );
    assert_eq!(views.len(), 2);
}

#[test]
fn test_list_schedules_非法参数() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let bad_requests = [
        ListSchedulesRequest {
            date_from: Some(ds(3, 10)),
            date_to: Some(ds(3, 1)),
            ..Default::default()
        },
        ListSchedulesRequest {
            status: Some("PAUSED".to_string()),
            ..Default::default()
        },
        ListSchedulesRequest {
            sort_key: Some("flyer".to_string()),
            ..Default::default()
        },
        ListSchedulesRequest {
            date_from: Some("03/01/2026".to_string()),
            ..Default::default()
        },
    ];
    for req in bad_requests {
        let result = env.state.query_api.list_schedules(req.clone());
        assert!(matches!(result, Err(ApiError::InvalidInput(_))), "{:?}", req);
    }
}

#[test]
fn test_list_schedules_单侧日期贴近日历边界时报错而不崩溃() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let fmt = |date: NaiveDate| date.format("%Y-%m-%d").to_string();

    let near_max = ListSchedulesRequest {
        date_from: Some(fmt(NaiveDate::MAX - Duration::days(2))),
        ..Default::default()
    };
    let near_min = ListSchedulesRequest {
        date_to: Some(fmt(NaiveDate::MIN + Duration::days(2))),
        ..Default::default()
    };
    for req in [near_max, near_min] {
        let result = env.state.query_api.list_schedules(req.clone());
        assert!(matches!(result, Err(ApiError::InvalidInput(_))), "{:?}", req);
    }

    // 区间两端都给出时无需展开
    let exact = ListSchedulesRequest {
        date_from: Some(fmt(NaiveDate::MAX - Duration::days(2))),
        date_to: Some(fmt(NaiveDate::MAX)),
        ..Default::default()
    };
    assert!(env.state.query_api.list_schedules(exact).unwrap().is_empty());
}

#[test]
fn test_list_schedules_视图天数配置过大时按上限展开() {
    let env = TestEnv::new().expect("无法创建测试环境");
    env.state
        .config_manager
        .set_global_config_value(config_keys::DEFAULT_VIEW_DAYS, "100000000")
        .unwrap();
    let today = chrono::Local::now().date_naive();
    env.create_schedule(today + Duration::days(MAX_VIEW_DAYS - 1), AREA_EAST);
    env.create_schedule(today + Duration::days(MAX_VIEW_DAYS), AREA_EAST);

    let views = list(&env, ListSchedulesRequest::default());
    assert_eq!(views.len(), 1);
}

#[test]
fn test_list_schedules_状态精确匹配() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let a = env.create_schedule(d(3, 4), AREA_EAST);
    env.create_schedule(d(3, 5), AREA_EAST);
    env.state
        .dispatch_api
        .update_schedule_fields(
            &a.schedule_id,
            vec![ScheduleFieldUpdate::Status(ScheduleStatus::InProgress)],
            ACTOR,
        )
        .unwrap();

    let views = list(
        &env,
        ListSchedulesRequest {
            status: Some("IN_PROGRESS".to_string()),
            ..march(None, None)
        },
    );
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].schedule_id, a.schedule_id);
}

#[test]
fn test_list_schedules_关键字匹配配布员区域传单() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let east = env.create_schedule(d(3, 4), AREA_EAST);
    let west = env.create_schedule(d(3, 5), AREA_WEST);
    env.state
        .dispatch_api
        .update_schedule_fields(
            &west.schedule_id,
            vec![ScheduleFieldUpdate::DistributorId(Some(11))],
            ACTOR,
        )
        .unwrap();
    let demand = env.demand(700, FLYER_AUTUMN, AREA_EAST, 100, OPEN_WINDOW);
    place(&env, &east.schedule_id, 1, &demand.demand_id);

    let search = |q: &str| -> Vec<String> {
        list(
            &env,
            ListSchedulesRequest {
                query: Some(q.to_string()),
                ..march(None, None)
            },
        )
        .into_iter()
        .map(|v| v.schedule_id)
        .collect()
    };

    assert_eq!(search("autumn"), vec![east.schedule_id.clone()], "传单名，大小写不敏感");
    assert_eq!(search(" TANAKA "), vec![west.schedule_id.clone()], "配布员名，去首尾空白");
    assert_eq!(search("west town"), vec![west.schedule_id.clone()], "区域名");
    assert_eq!(search("").len(), 2, "空关键字不过滤");
    assert!(search("nothing-matches").is_empty());
}

#[test]
fn test_list_schedules_排序稳定且缺失值排最后() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let first = env.create_schedule(d(3, 6), AREA_WEST);
    let second = env.create_schedule(d(3, 4), AREA_EAST);
    let third = env.create_schedule(d(3, 5), AREA_EAST);
    env.state
        .dispatch_api
        .update_schedule_fields(&first.schedule_id, vec![ScheduleFieldUpdate::BranchId(Some(1))], ACTOR)
        .unwrap();

    let ids = |views: Vec<flyer_dispatch::api::dto::ScheduleView>| -> Vec<String> {
        views.into_iter().map(|v| v.schedule_id).collect()
    };

    // 区域代码升序: E-05 (按日期的输入顺序保持) → W-06
    assert_eq!(
        ids(list(&env, march(Some("areaCode"), Some("asc")))),
        vec![second.schedule_id.clone(), third.schedule_id.clone(), first.schedule_id.clone()]
    );
    // 区域代码降序: 相等键仍保持输入顺序
    assert_eq!(
        ids(list(&env, march(Some("areaCode"), Some("desc")))),
        vec![first.schedule_id.clone(), second.schedule_id.clone(), third.schedule_id.clone()]
    );
    // 营业所降序: 未设置营业所的计划排最后
    assert_eq!(
        ids(list(&env, march(Some("branch"), Some("desc"))))[0],
        first.schedule_id
    );
    // 日期降序
    assert_eq!(
        ids(list(&env, march(Some("date"), Some("desc")))),
        vec![first.schedule_id, third.schedule_id, second.schedule_id]
    );
}

// ==========================================
// 需求池
// ==========================================

#[test]
fn test_list_unassigned_视图相交() {
    let env = TestEnv::new().expect("无法创建测试环境");
    env.demand(800, FLYER_SPRING, AREA_EAST, 10, (Some(d(3, 1)), Some(d(3, 3)), None)); // 视图之前
    env.demand(801, FLYER_SPRING, AREA_EAST, 10, (Some(d(3, 4)), Some(d(3, 12)), None)); // 跨越视图
    env.demand(802, FLYER_SPRING, AREA_EAST, 10, (None, Some(d(3, 5)), None)); // 无开始日
    env.demand(803, FLYER_SPRING, AREA_EAST, 10, (Some(d(3, 20)), None, None)); // 视图之后

    let orders = |from: Option<&str>, to: Option<&str>| -> Vec<i64> {
        let mut ids: Vec<i64> = env
            .state
            .query_api
            .list_unassigned(from, to)
            .unwrap()
            .into_iter()
            .map(|u| u.order_id)
            .collect();
        ids.sort();
        ids
    };

    let from = ds(3, 5);
    let to = ds(3, 10);
    assert_eq!(orders(Some(&from), Some(&to)), vec![801, 802]);
    assert_eq!(orders(None, None), vec![800, 801, 802, 803]);
    assert_eq!(orders(Some(&from), None), vec![801, 802, 803]);

    let inverted = env.state.query_api.list_unassigned(Some(&to), Some(&from));
    assert!(matches!(inverted, Err(ApiError::InvalidInput(_))));
}

// ==========================================
// 受理
// ==========================================

fn intake(areas: Vec<AreaAllocation>) -> ConfirmDistributionRequest {
    ConfirmDistributionRequest {
        order_id: 900,
        flyer_id: FLYER_SPRING,
        method: "MULTI_FAMILY".to_string(),
        authorized_count: 1000,
        start_date: Some(ds(3, 1)),
        end_date: Some(ds(3, 10)),
        spare_date: Some(ds(3, 12)),
        areas,
    }
}

#[test]
fn test_confirm_distribution_每个区域生成一个需求() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let resp = env
        .state
        .intake_api
        .confirm_distribution_request(
            intake(vec![
                AreaAllocation { area_id: AREA_EAST, planned_count: 600 },
                AreaAllocation { area_id: AREA_WEST, planned_count: 300 },
            ]),
            ACTOR,
        )
        .unwrap();

    assert_eq!(resp.demands.len(), 2);
    assert_eq!(resp.authorization.authorized_count, 1000);
    assert_eq!(env.demand_count(), 2);
    assert!(resp.demands.iter().all(|demand| demand.end_date == Some(d(3, 10))));

    let commitment = env.state.intake_api.get_commitment(900, FLYER_SPRING).unwrap();
    assert_eq!(commitment.total_assigned, 0, "需求池中的份数不计入已分配");
}

#[test]
fn test_confirm_distribution_校验失败不写入() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let area = |count| AreaAllocation { area_id: AREA_EAST, planned_count: count };

    let mut bad_dates = intake(vec![area(10)]);
    bad_dates.end_date = Some(ds(3, 15)); // 晚于预备日
    let mut bad_method = intake(vec![area(10)]);
    bad_method.method = "POSTING".to_string();
    let mut negative_auth = intake(vec![area(10)]);
    negative_auth.authorized_count = -5;

    let cases = vec![
        intake(vec![]),
        intake(vec![area(-1)]),
        intake(vec![area(10), area(20)]),
        bad_dates,
        bad_method,
        negative_auth,
    ];
    for req in cases {
        let result = env.state.intake_api.confirm_distribution_request(req, ACTOR);
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }
    assert_eq!(env.demand_count(), 0);
    assert_eq!(env.action_log_count(), 0);
}
