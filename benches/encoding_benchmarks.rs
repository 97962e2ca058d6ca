// Criterion benchmarks for the theory-assertion encoding cost of building
// problems of increasing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use schedex::{Horizon, Problem, ResourceRef, Solver, SolverConfig, TaskSpec};
use z3::{Config, Context};

fn build_chain(ctx: &Context, num_tasks: usize) -> Problem<'_> {
    let mut problem = Problem::new(ctx, "bench", Horizon::Fixed(num_tasks as i64 * 10));
    let worker = problem.add_worker(Some("w".into()), 1, None).unwrap();

    let mut previous: Option<String> = None;
    for i in 0..num_tasks {
        let name = format!("t{i}");
        problem
            .add_fixed_duration_task(TaskSpec::new().named(name.clone()), 5)
            .unwrap();
        problem
            .add_required_resource(&name, ResourceRef::Worker(worker.clone()), Default::default())
            .unwrap();
        if let Some(prev) = &previous {
            problem
                .add_constraint(
                    None,
                    false,
                    schedex::ConstraintSpec::Precedence {
                        before: prev.clone(),
                        after: name.clone(),
                        offset: 0,
                        kind: schedex::constraint::Ordering::Lax,
                    },
                )
                .unwrap();
        }
        previous = Some(name);
    }
    problem
}

fn bench_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("problem_assembly");
    for num_tasks in [4usize, 16, 64].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(num_tasks), num_tasks, |b, &n| {
            b.iter(|| {
                let cfg = Config::new();
                let ctx = Context::new(&cfg);
                let problem = build_chain(&ctx, n);
                black_box(problem.task_names().count())
            });
        });
    }
    group.finish();
}

fn bench_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("problem_check");
    group.sample_size(10);
    for num_tasks in [4usize, 16].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(num_tasks), num_tasks, |b, &n| {
            b.iter(|| {
                let cfg = Config::new();
                let ctx = Context::new(&cfg);
                let problem = build_chain(&ctx, n);
                let solver = Solver::new(&problem, SolverConfig::default()).unwrap();
                black_box(solver.check(&problem).is_ok())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_assembly, bench_check);
criterion_main!(benches);
