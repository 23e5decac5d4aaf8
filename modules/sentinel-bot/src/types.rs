use std::fmt;

/// Lifecycle of an `ActionLoop`. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Looping,
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Looping => write!(f, "looping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One iteration, then stop.
    SingleShot,
    /// Iterate until the stop flag is raised.
    Continuous,
}

/// One step of an iteration, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    UpdatePrice,
    Synchronize,
    EnsureAllowances,
    EvaluateAndAct,
    ClaimRewards,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdatePrice => write!(f, "update_price"),
            Self::Synchronize => write!(f, "synchronize"),
            Self::EnsureAllowances => write!(f, "ensure_allowances"),
            Self::EvaluateAndAct => write!(f, "evaluate_and_act"),
            Self::ClaimRewards => write!(f, "claim_rewards"),
        }
    }
}

/// An iteration that failed after exhausting its retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationFailure {
    pub iteration: u64,
    pub step: Step,
    pub message: String,
}

impl fmt::Display for IterationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iteration {} failed at {}: {}", self.iteration, self.step, self.message)
    }
}

/// What a call to `ActionLoop::run` did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub iterations: u64,
    pub failures: Vec<IterationFailure>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iterations={} failed_iterations={}",
            self.iterations,
            self.failures.len()
        )
    }
}
