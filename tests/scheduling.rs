use schedex::constraint::{ConstraintSpec, Ordering};
use schedex::indicator::IndicatorSpec;
use schedex::{
    BindingOptions, BufferKind, CardinalityKind, Direction, Horizon, Problem, ResourceRef,
    Solver, SolverConfig, TaskSpec,
};
use z3::{Config, Context};

fn new_ctx() -> Context {
    Context::new(&Config::new())
}

#[test]
fn two_tasks_on_one_worker_never_overlap() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "single_worker", Horizon::Fixed(20));

    let w = problem.add_worker(Some("w1".into()), 1, None).unwrap();
    let t1 = problem
        .add_fixed_duration_task(TaskSpec::new().named("t1"), 5)
        .unwrap();
    let t2 = problem
        .add_fixed_duration_task(TaskSpec::new().named("t2"), 5)
        .unwrap();
    problem
        .add_required_resource(&t1, ResourceRef::Worker(w.clone()), BindingOptions::default())
        .unwrap();
    problem
        .add_required_resource(&t2, ResourceRef::Worker(w), BindingOptions::default())
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let solution = solver.check(&problem).unwrap();

    let s1 = solution.tasks.get("t1").unwrap();
    let s2 = solution.tasks.get("t2").unwrap();
    assert!(s1.end <= s2.start || s2.end <= s1.start);
}

#[test]
fn precedence_orders_two_tasks() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "precedence", Horizon::Fixed(50));

    problem
        .add_fixed_duration_task(TaskSpec::new().named("before"), 3)
        .unwrap();
    problem
        .add_fixed_duration_task(TaskSpec::new().named("after"), 3)
        .unwrap();
    problem
        .add_constraint(
            None,
            false,
            ConstraintSpec::Precedence {
                before: "before".into(),
                after: "after".into(),
                offset: 2,
                kind: Ordering::Lax,
            },
        )
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let solution = solver.check(&problem).unwrap();
    let before = solution.tasks.get("before").unwrap();
    let after = solution.tasks.get("after").unwrap();
    assert!(before.end + 2 <= after.start);
}

#[test]
fn optional_task_may_go_unscheduled_when_infeasible() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "optional", Horizon::Fixed(5));

    problem
        .add_fixed_duration_task(TaskSpec::new().named("impossible").optional(), 10)
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let solution = solver.check(&problem).unwrap();
    let task = solution.tasks.get("impossible").unwrap();
    assert!(!task.scheduled);
}

#[test]
fn select_workers_picks_exactly_one_of_two_candidates() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "select", Horizon::Fixed(20));

    problem.add_worker(Some("a".into()), 1, None).unwrap();
    problem.add_worker(Some("b".into()), 1, None).unwrap();
    let select = problem
        .add_select_workers(None, vec!["a".into(), "b".into()], 1, CardinalityKind::Exact)
        .unwrap();
    let task = problem
        .add_fixed_duration_task(TaskSpec::new().named("job"), 4)
        .unwrap();
    problem
        .add_required_resource(&task, ResourceRef::SelectWorkers(select), BindingOptions::default())
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let solution = solver.check(&problem).unwrap();
    let job = solution.tasks.get("job").unwrap();
    assert_eq!(job.assigned_resources.len(), 1);
}

#[test]
fn makespan_indicator_tracks_latest_task_end() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "makespan", Horizon::Fixed(30));

    problem
        .add_fixed_duration_task(TaskSpec::new().named("a"), 4)
        .unwrap();
    problem
        .add_fixed_duration_task(TaskSpec::new().named("b"), 7)
        .unwrap();
    let makespan = problem
        .add_indicator(
            None,
            IndicatorSpec::Makespan {
                tasks: vec!["a".into(), "b".into()],
            },
            None,
            None,
        )
        .unwrap();
    problem
        .add_objective_over_indicator(None, &makespan, Direction::Minimize, 1.0)
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let solution = solver.check(&problem).unwrap();
    let value = solution.indicators.get(&makespan).unwrap().value;
    let max_end = solution.tasks.values().map(|t| t.end).max().unwrap();
    assert_eq!(value, max_end);
}

#[test]
fn buffer_level_respects_load_and_unload_order() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "buffer", Horizon::Fixed(30));

    let buffer = problem
        .add_buffer(Some("stock".into()), BufferKind::NonConcurrent, 0, Some(0), Some(100), None)
        .unwrap();
    let producer = problem
        .add_fixed_duration_task(TaskSpec::new().named("produce"), 3)
        .unwrap();
    let consumer = problem
        .add_fixed_duration_task(TaskSpec::new().named("consume"), 3)
        .unwrap();
    problem
        .add_constraint(
            None,
            false,
            ConstraintSpec::TaskLoadBuffer {
                task: producer.clone(),
                buffer: buffer.clone(),
                quantity: 10,
            },
        )
        .unwrap();
    problem
        .add_constraint(
            None,
            false,
            ConstraintSpec::TaskUnloadBuffer {
                task: consumer.clone(),
                buffer,
                quantity: 10,
            },
        )
        .unwrap();
    problem
        .add_constraint(
            None,
            false,
            ConstraintSpec::Precedence {
                before: producer,
                after: consumer,
                offset: 0,
                kind: Ordering::Lax,
            },
        )
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let solution = solver.check(&problem).unwrap();
    let stock = solution.buffers.get("stock").unwrap();
    assert_eq!(stock.levels.first().copied(), Some(0));
    assert!(stock.levels.iter().all(|&l| l >= 0 && l <= 100));
}

#[test]
fn find_another_solution_differs_from_the_first() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "alt", Horizon::Fixed(20));
    problem
        .add_fixed_duration_task(TaskSpec::new().named("free"), 3)
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let first = solver.check(&problem).unwrap();
    let second = solver.find_another_solution(&problem, &first).unwrap();

    let first_start = first.tasks.get("free").unwrap().start;
    let second_start = second.tasks.get("free").unwrap().start;
    assert_ne!(first_start, second_start);
}

#[test]
fn json_entity_round_trip_adds_a_fixed_duration_task() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "json", Horizon::Fixed(10));
    let name = problem
        .add_from_json(r#"{"type": "FixedDurationTask", "name": "from_json", "duration": 4}"#)
        .unwrap();
    assert_eq!(name, "from_json");
    assert_eq!(problem.task(&name).unwrap().duration_value(), Some(4));
}

#[test]
fn json_unknown_entity_type_is_rejected() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "json_bad", Horizon::Fixed(10));
    let result = problem.add_from_json(r#"{"type": "NotARealEntity"}"#);
    assert!(result.is_err());
}

#[test]
fn json_entity_with_unknown_field_is_rejected() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "json_strict", Horizon::Fixed(10));
    let result = problem.add_from_json(
        r#"{"type": "FixedDurationTask", "name": "x", "duration": 4, "bogus": 1}"#,
    );
    assert!(result.is_err());
}

#[test]
fn flowtime_indicator_sums_task_ends() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "flowtime", Horizon::Fixed(30));

    problem
        .add_fixed_duration_task(TaskSpec::new().named("a"), 5)
        .unwrap();
    problem
        .add_fixed_duration_task(TaskSpec::new().named("b"), 8)
        .unwrap();
    problem
        .add_constraint(None, false, ConstraintSpec::TaskEndAt { task: "a".into(), value: 5 })
        .unwrap();
    problem
        .add_constraint(None, false, ConstraintSpec::TaskEndAt { task: "b".into(), value: 8 })
        .unwrap();
    let flowtime = problem
        .add_indicator(
            None,
            IndicatorSpec::Flowtime {
                tasks: vec!["a".into(), "b".into()],
            },
            None,
            None,
        )
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let solution = solver.check(&problem).unwrap();
    assert_eq!(solution.indicators.get(&flowtime).unwrap().value, 13);
}

#[test]
fn utilization_indicator_is_a_percentage_of_horizon() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "utilization", Horizon::Fixed(10));

    let w = problem.add_worker(Some("w1".into()), 1, None).unwrap();
    let t = problem
        .add_fixed_duration_task(TaskSpec::new().named("t"), 5)
        .unwrap();
    problem
        .add_constraint(None, false, ConstraintSpec::TaskStartAt { task: t.clone(), value: 0 })
        .unwrap();
    problem
        .add_required_resource(&t, ResourceRef::Worker(w.clone()), BindingOptions::default())
        .unwrap();
    let utilization = problem
        .add_indicator(None, IndicatorSpec::Utilization { resource: w }, None, None)
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let solution = solver.check(&problem).unwrap();
    assert_eq!(solution.indicators.get(&utilization).unwrap().value, 50);
}

#[test]
fn resource_idle_indicator_sums_gaps_between_busy_intervals() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "idle", Horizon::Fixed(30));

    let w = problem.add_worker(Some("w1".into()), 1, None).unwrap();
    let t1 = problem
        .add_fixed_duration_task(TaskSpec::new().named("t1"), 3)
        .unwrap();
    let t2 = problem
        .add_fixed_duration_task(TaskSpec::new().named("t2"), 3)
        .unwrap();
    problem
        .add_constraint(None, false, ConstraintSpec::TaskStartAt { task: t1.clone(), value: 0 })
        .unwrap();
    problem
        .add_constraint(None, false, ConstraintSpec::TaskStartAt { task: t2.clone(), value: 10 })
        .unwrap();
    problem
        .add_required_resource(&t1, ResourceRef::Worker(w.clone()), BindingOptions::default())
        .unwrap();
    problem
        .add_required_resource(&t2, ResourceRef::Worker(w.clone()), BindingOptions::default())
        .unwrap();
    let idle = problem
        .add_indicator(None, IndicatorSpec::ResourceIdle { resource: w }, None, None)
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let solution = solver.check(&problem).unwrap();
    assert_eq!(solution.indicators.get(&idle).unwrap().value, 7);
}

#[test]
fn work_amount_picks_the_worker_that_covers_it() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "work_amount", Horizon::Fixed(20));

    problem.add_worker(Some("slow".into()), 1, None).unwrap();
    problem.add_worker(Some("fast".into()), 2, None).unwrap();
    let select = problem
        .add_select_workers(None, vec!["slow".into(), "fast".into()], 1, CardinalityKind::Exact)
        .unwrap();
    let job = problem
        .add_fixed_duration_task(TaskSpec::new().named("job").work_amount(8), 4)
        .unwrap();
    problem
        .add_required_resource(&job, ResourceRef::SelectWorkers(select), BindingOptions::default())
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let solution = solver.check(&problem).unwrap();
    let solved = solution.tasks.get("job").unwrap();
    assert_eq!(solved.assigned_resources, vec!["fast".to_string()]);
}

#[test]
fn mandatory_task_end_cannot_exceed_horizon() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "tight_horizon", Horizon::Fixed(5));
    problem
        .add_fixed_duration_task(TaskSpec::new().named("too_long"), 10)
        .unwrap();

    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let result = solver.check(&problem);
    assert!(matches!(result, Err(schedex::SchedexError::Unsat)));
}

#[test]
fn duplicate_buffer_assertion_is_rejected() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "dup_assertion", Horizon::Fixed(20));

    let buffer = problem
        .add_buffer(Some("stock".into()), BufferKind::NonConcurrent, 0, None, None, None)
        .unwrap();
    let producer = problem
        .add_fixed_duration_task(TaskSpec::new().named("produce"), 3)
        .unwrap();
    problem
        .add_constraint(
            None,
            false,
            ConstraintSpec::TaskLoadBuffer {
                task: producer.clone(),
                buffer: buffer.clone(),
                quantity: 10,
            },
        )
        .unwrap();
    let result = problem.add_constraint(
        None,
        false,
        ConstraintSpec::TaskLoadBuffer {
            task: producer,
            buffer,
            quantity: 10,
        },
    );
    assert!(matches!(result, Err(schedex::SchedexError::DuplicateAssertion(_))));
}

#[test]
fn export_to_smt2_contains_declared_task_symbols() {
    let ctx = new_ctx();
    let mut problem = Problem::new(&ctx, "export", Horizon::Fixed(10));
    problem
        .add_fixed_duration_task(TaskSpec::new().named("x"), 2)
        .unwrap();
    let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
    let text = solver.export_to_smt2();
    assert!(text.contains("x_start"));
}
