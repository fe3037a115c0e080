#![forbid(unsafe_code)]

/// Message carried by every result when the crate is built without Z3.
///
/// Keeps the workspace buildable on machines without libz3.
pub const NO_Z3_MESSAGE: &str = "Z3 prover is not enabled; rebuild with `--features covenant-verify/z3`";

#[cfg(feature = "z3")]
pub mod z3_session {
    use z3::{Config, Context, Model, Params, SatResult, Solver};

    use crate::config::VerifyOptions;

    /// One context per verification call; contexts are never shared.
    pub fn new_context() -> Context {
        let mut cfg = Config::new();
        cfg.set_model_generation(true);
        Context::new(&cfg)
    }

    /// A solver bounded by the effective timeout, with fixed seeds so reruns agree.
    pub fn bounded_solver<'ctx>(ctx: &'ctx Context, options: &VerifyOptions) -> Solver<'ctx> {
        let solver = Solver::new(ctx);
        let mut params = Params::new(ctx);
        params.set_u32("timeout", options.effective_timeout_ms());
        params.set_u32("smt.random_seed", options.random_seed);
        params.set_u32("sat.random_seed", options.random_seed);
        solver.set_params(&params);
        solver
    }

    pub enum Verdict<'ctx> {
        /// Satisfiable; the model is absent only if Z3 declined to produce one.
        Sat(Option<Model<'ctx>>),
        Unsat,
        /// Timeout or incompleteness, with Z3's own explanation.
        Unknown(String),
    }

    pub fn check<'ctx>(solver: &Solver<'ctx>) -> Verdict<'ctx> {
        match solver.check() {
            SatResult::Sat => Verdict::Sat(solver.get_model()),
            SatResult::Unsat => Verdict::Unsat,
            SatResult::Unknown => Verdict::Unknown(
                solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
        }
    }

}
