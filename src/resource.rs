//! The resource model: atomic [`Worker`]s, pooled [`CumulativeWorker`]s that
//! fan out into atomic workers, and [`SelectWorkers`] k-of-n alternative
//! selection.

use crate::cost::CostFunction;
use crate::error::{SchedexError, SchedexResult};
use crate::problem::Problem;
use crate::symbol::{cardinality, named_bool, BoolVar, CardinalityKind, IntVar};

/// An atomic, indivisible resource (a person, a machine, ...).
pub struct Worker<'ctx> {
    pub productivity: i64,
    pub cost: Option<CostFunction>,
    /// `(busy_start, busy_end)` per task name that requires this worker,
    /// in the order requirements were added.
    pub(crate) busy_intervals: Vec<(String, (IntVar<'ctx>, IntVar<'ctx>))>,
}

impl<'ctx> Worker<'ctx> {
    pub fn busy_intervals(&self) -> &[(String, (IntVar<'ctx>, IntVar<'ctx>))] {
        &self.busy_intervals
    }

    pub(crate) fn add_busy_interval(&mut self, task: String, interval: (IntVar<'ctx>, IntVar<'ctx>)) {
        self.busy_intervals.push((task, interval));
    }
}

/// Distribute an integer `p` over `n` buckets: integer quotient in every
/// bucket, remainder folded into the first one (spec §3 "Resource").
pub(crate) fn distribute_over_n(p: i64, n: i64) -> Vec<i64> {
    let mut out = vec![p / n + p % n];
    out.extend(std::iter::repeat(p / n).take((n - 1) as usize));
    out
}

/// Distribute an optional constant cost over `n` buckets the same way.
pub(crate) fn distribute_cost_over_n(
    cost: Option<&CostFunction>,
    n: i64,
) -> Vec<Option<CostFunction>> {
    match cost {
        None => std::iter::repeat(None).take(n as usize).collect(),
        Some(c) if c.is_constant() => {
            let value = c.evaluate_i64(0);
            distribute_over_n(value, n)
                .into_iter()
                .map(|v| Some(CostFunction::Constant(v)))
                .collect()
        }
        Some(c) => std::iter::repeat(Some(c.clone())).take(n as usize).collect(),
    }
}

/// A pool of `size` interchangeable atomic workers, processing up to `size`
/// tasks in parallel. Construction immediately registers `size` [`Worker`]s
/// into the owning [`Problem`] named `<name>_CumulativeWorker_<k>`.
pub struct CumulativeWorker {
    pub size: i64,
    pub productivity: i64,
    pub cost: Option<CostFunction>,
    pub(crate) atomic_worker_names: Vec<String>,
}

impl CumulativeWorker {
    pub fn atomic_worker_names(&self) -> &[String] {
        &self.atomic_worker_names
    }
}

/// The selection of `nb_to_select` workers among `candidates`
/// (length >= 2), with one boolean selector per candidate.
pub struct SelectWorkers<'ctx> {
    pub candidates: Vec<String>,
    pub nb_to_select: i64,
    pub kind: CardinalityKind,
    pub(crate) selectors: Vec<(String, BoolVar<'ctx>)>,
    pub(crate) selection_assertion: BoolVar<'ctx>,
}

impl<'ctx> SelectWorkers<'ctx> {
    pub fn selector_for(&self, worker_name: &str) -> Option<&BoolVar<'ctx>> {
        self.selectors
            .iter()
            .find(|(n, _)| n == worker_name)
            .map(|(_, b)| b)
    }
}

impl<'ctx> Problem<'ctx> {
    /// Add an atomic worker.
    pub fn add_worker(
        &mut self,
        name: Option<String>,
        productivity: i64,
        cost: Option<CostFunction>,
    ) -> SchedexResult<String> {
        if productivity < 0 {
            return Err(SchedexError::InvalidParameter(
                "worker productivity must be non-negative".into(),
            ));
        }
        let name = name.unwrap_or_else(|| self.generate_name("Worker"));
        let worker = Worker {
            productivity,
            cost,
            busy_intervals: Vec::new(),
        };
        self.register_worker(name.clone(), worker)?;
        Ok(name)
    }

    /// Add a cumulative worker, fanning it out into `size` atomic workers.
    pub fn add_cumulative_worker(
        &mut self,
        name: Option<String>,
        size: i64,
        productivity: i64,
        cost: Option<CostFunction>,
    ) -> SchedexResult<String> {
        if size <= 1 {
            return Err(SchedexError::InvalidParameter(
                "cumulative worker size must be > 1".into(),
            ));
        }
        let name = name.unwrap_or_else(|| self.generate_name("CumulativeWorker"));

        let productivities = distribute_over_n(productivity, size);
        let costs = distribute_cost_over_n(cost.as_ref(), size);

        let mut atomic_worker_names = Vec::with_capacity(size as usize);
        for i in 0..size {
            let worker_name = format!("{name}_CumulativeWorker_{}", i + 1);
            self.add_worker(
                Some(worker_name.clone()),
                productivities[i as usize],
                costs[i as usize].clone(),
            )?;
            atomic_worker_names.push(worker_name);
        }

        let cumulative = CumulativeWorker {
            size,
            productivity,
            cost,
            atomic_worker_names,
        };
        self.register_cumulative_worker(name.clone(), cumulative)?;
        Ok(name)
    }

    /// Add a `SelectWorkers` over a list of atomic worker names.
    pub fn add_select_workers(
        &mut self,
        name: Option<String>,
        candidates: Vec<String>,
        nb_to_select: i64,
        kind: CardinalityKind,
    ) -> SchedexResult<String> {
        if candidates.len() < 2 {
            return Err(SchedexError::InvalidParameter(
                "SelectWorkers needs at least two candidates".into(),
            ));
        }
        if nb_to_select < 1 || nb_to_select > candidates.len() as i64 {
            return Err(SchedexError::InvalidParameter(
                "nb_to_select must be between 1 and the number of candidates".into(),
            ));
        }
        for candidate in &candidates {
            self.worker(candidate)?;
        }

        let name = name.unwrap_or_else(|| self.generate_name("SelectWorkers"));
        let ctx = self.ctx();

        let selectors: Vec<(String, BoolVar<'ctx>)> = candidates
            .iter()
            .map(|c| (c.clone(), named_bool(ctx, &format!("Selected_{c}_{name}"))))
            .collect();
        let literals: Vec<BoolVar<'ctx>> = selectors.iter().map(|(_, b)| b.clone()).collect();
        let selection_assertion = cardinality(ctx, &literals, nb_to_select as i32, kind);

        let select = SelectWorkers {
            candidates,
            nb_to_select,
            kind,
            selectors,
            selection_assertion,
        };
        self.register_select_workers(name.clone(), select)?;
        Ok(name)
    }

    /// The `SelectWorkers(atomic_workers, 1, min)` synthesized whenever a
    /// [`CumulativeWorker`] is required by a task (spec §4.3).
    pub(crate) fn select_workers_for_cumulative(
        &mut self,
        cumulative_name: &str,
    ) -> SchedexResult<String> {
        let atomic_names = self
            .cumulative_workers
            .get(cumulative_name)
            .ok_or_else(|| SchedexError::UnknownEntity {
                kind: "CumulativeWorker",
                name: cumulative_name.to_string(),
            })?
            .atomic_worker_names
            .clone();
        self.add_select_workers(None, atomic_names, 1, CardinalityKind::Min)
    }
}
