//! Task-resource binding: busy-interval synthesis for the static, dynamic,
//! `SelectWorkers` and `CumulativeWorker` requirement modes (spec §4.3).

use z3::ast::{Ast, Int};

use crate::error::{SchedexError, SchedexResult};
use crate::problem::Problem;
use crate::symbol::{int_lit, named_int};

/// The resource a task requirement refers to.
pub enum ResourceRef {
    Worker(String),
    CumulativeWorker(String),
    SelectWorkers(String),
}

/// Extra binding behavior (spec §4.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingOptions {
    pub dynamic: bool,
    pub delay_in: i64,
    pub early_out: i64,
}

impl<'ctx> Problem<'ctx> {
    /// Bind `resource` as a required resource of `task_name`.
    pub fn add_required_resource(
        &mut self,
        task_name: &str,
        resource: ResourceRef,
        options: BindingOptions,
    ) -> SchedexResult<()> {
        match resource {
            ResourceRef::Worker(worker_name) => {
                self.bind_single_worker(task_name, &worker_name, options)
            }
            ResourceRef::SelectWorkers(select_name) => {
                self.bind_select_workers(task_name, &select_name)
            }
            ResourceRef::CumulativeWorker(cumulative_name) => {
                let select_name = self.select_workers_for_cumulative(&cumulative_name)?;
                self.bind_select_workers(task_name, &select_name)
            }
        }
    }

    fn bind_single_worker(
        &mut self,
        task_name: &str,
        worker_name: &str,
        options: BindingOptions,
    ) -> SchedexResult<()> {
        self.worker(worker_name)?;
        {
            let task = self.task(task_name)?;
            if task.required_resources().contains(&worker_name.to_string()) {
                return Err(SchedexError::DuplicateRequirement {
                    task: task_name.to_string(),
                    worker: worker_name.to_string(),
                });
            }
        }

        let ctx = self.ctx();
        let (task_start, task_end) = {
            let task = self.task(task_name)?;
            (task.start.clone(), task.end.clone())
        };

        let busy_start = named_int(ctx, &format!("{worker_name}_busy_{task_name}_start"));
        let busy_end = named_int(ctx, &format!("{worker_name}_busy_{task_name}_end"));

        let mut assertions = Vec::new();
        if options.dynamic {
            assertions.push(busy_end.le(&task_end));
            assertions.push(busy_start.ge(&task_start));
        } else {
            if options.early_out > 0 {
                assertions.push(busy_end._eq(&Int::sub(
                    ctx,
                    &[&task_end, &int_lit(ctx, options.early_out)],
                )));
            } else {
                assertions.push(busy_end._eq(&task_end));
            }
            if options.delay_in > 0 {
                assertions.push(busy_start._eq(&Int::add(
                    ctx,
                    &[&task_start, &int_lit(ctx, options.delay_in)],
                )));
            } else {
                assertions.push(busy_start._eq(&task_start));
            }
        }

        let worker = self.workers.get_mut(worker_name).expect("checked above");
        worker.add_busy_interval(task_name.to_string(), (busy_start, busy_end));

        let task = self.tasks.get_mut(task_name).expect("checked above");
        task.assertions.extend(assertions);
        task.required_resources.push(worker_name.to_string());

        Ok(())
    }

    fn bind_select_workers(&mut self, task_name: &str, select_name: &str) -> SchedexResult<()> {
        let ctx = self.ctx();
        let (task_start, task_end) = {
            let task = self.task(task_name)?;
            (task.start.clone(), task.end.clone())
        };

        let candidates = self
            .select_workers
            .get(select_name)
            .ok_or_else(|| SchedexError::UnknownEntity {
                kind: "SelectWorkers",
                name: select_name.to_string(),
            })?
            .candidates
            .clone();

        let mut new_assertions = Vec::new();
        let mut newly_required = Vec::new();

        for worker_name in &candidates {
            {
                let task = self.task(task_name)?;
                if task.required_resources().contains(worker_name) {
                    return Err(SchedexError::DuplicateRequirement {
                        task: task_name.to_string(),
                        worker: worker_name.clone(),
                    });
                }
            }

            let busy_start = named_int(ctx, &format!("{worker_name}_maybe_busy_{task_name}_start"));
            let busy_end = named_int(ctx, &format!("{worker_name}_maybe_busy_{task_name}_end"));

            let selector = self
                .select_workers
                .get(select_name)
                .unwrap()
                .selector_for(worker_name)
                .expect("every candidate has a selector")
                .clone();

            let schedule_as_usual =
                z3::ast::Bool::and(ctx, &[&busy_start._eq(&task_start), &busy_end._eq(&task_end)]);
            let sentinel = int_lit(ctx, self.fresh_sentinel());
            let move_to_past =
                z3::ast::Bool::and(ctx, &[&busy_start._eq(&sentinel), &busy_end._eq(&sentinel)]);
            new_assertions.push(selector.ite(&schedule_as_usual, &move_to_past));

            let worker = self.workers.get_mut(worker_name).expect("checked above");
            worker.add_busy_interval(task_name.to_string(), (busy_start, busy_end));
            newly_required.push(worker_name.clone());
        }

        let selection_assertion = self
            .select_workers
            .get(select_name)
            .unwrap()
            .selection_assertion
            .clone();
        new_assertions.push(selection_assertion);

        let task = self.tasks.get_mut(task_name).expect("checked above");
        task.assertions.extend(new_assertions);
        task.required_resources.extend(newly_required);

        Ok(())
    }
}
