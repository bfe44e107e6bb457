//! Process-group lifecycle (`spec.md` §4.1).

mod transport;

pub use transport::{ChannelTransport, Transport};

use crate::core::{report_and_abort, ErrorCode, QDistError};
use crate::precision::{Real, SCALAR_BYTES};

/// One rank's handle to the process group: its rank id, the group size,
/// and the transport used for exchanges and collectives.
///
/// `Environment` is created once per simulated process by
/// [`Environment::run_distributed`] and passed to the body closure; the
/// public lifecycle operations (`initialize`/`barrier`/`reduce_success`/
/// `finalize`) mirror `spec.md` §4.1 exactly, just as methods rather than
/// free functions taking an implicit global environment.
pub struct Environment {
    transport: Box<dyn Transport>,
    initialized: bool,
    finalized: bool,
}

impl Environment {
    fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            initialized: false,
            finalized: false,
        }
    }

    /// Spawns `num_ranks` simulated ranks (OS threads wired by a
    /// [`ChannelTransport`] mesh), calls `body(&mut Environment)` on each,
    /// and joins. Each invocation of `body` is responsible for calling
    /// [`Environment::initialize`] and [`Environment::finalize`] itself, as
    /// every rank would in a real deployment.
    ///
    /// If any rank's `body` returns `Err`, every rank's result is still
    /// collected (ranks that already passed their last collective call are
    /// not retroactively aborted), and this function returns the first
    /// error encountered in rank order.
    pub fn run_distributed<T, F>(num_ranks: usize, body: F) -> Result<Vec<T>, QDistError>
    where
        T: Send + 'static,
        F: Fn(&mut Environment) -> Result<T, QDistError> + Send + Sync + 'static,
    {
        if num_ranks == 0 || !num_ranks.is_power_of_two() {
            return Err(QDistError::InvalidPartitioning {
                num_qubits: 0,
                num_ranks,
                reason: "rank count must be a nonzero power of two".to_string(),
            });
        }
        let transports = ChannelTransport::build_mesh(num_ranks);
        let body = std::sync::Arc::new(body);
        let handles: Vec<_> = transports
            .into_iter()
            .map(|transport| {
                let body = body.clone();
                std::thread::spawn(move || {
                    let mut env = Environment::new(Box::new(transport));
                    body(&mut env)
                })
            })
            .collect();

        let mut results = Vec::with_capacity(num_ranks);
        let mut first_err = None;
        for handle in handles {
            match handle.join().expect("rank thread panicked") {
                Ok(value) => results.push(value),
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    /// This rank's id, `0..num_ranks()`.
    pub fn rank(&self) -> usize {
        self.transport.rank()
    }

    /// The total number of ranks in the group.
    pub fn num_ranks(&self) -> usize {
        self.transport.num_ranks()
    }

    /// Idempotently joins the process group. Repeated initialization is
    /// reported (via [`report_and_abort`]'s warning path) but not fatal.
    pub fn initialize(&mut self) -> Result<(), QDistError> {
        if self.initialized {
            self.report_and_abort("initialize", QDistError::AlreadyInitialized);
            return Ok(());
        }
        self.initialized = true;
        Ok(())
    }

    /// Releases the group once. Repeated finalize is reported, not fatal.
    pub fn finalize(&mut self) -> Result<(), QDistError> {
        if self.finalized {
            self.report_and_abort("finalize", QDistError::AlreadyFinalized);
            return Ok(());
        }
        self.finalized = true;
        Ok(())
    }

    /// Blocks until every rank reaches this call.
    pub fn barrier(&self) -> Result<(), QDistError> {
        self.transport.barrier()
    }

    /// The logical AND of `local` across every rank.
    pub fn reduce_success(&self, local: bool) -> Result<bool, QDistError> {
        self.transport.reduce_success(local)
    }

    /// Broadcasts `*value` from `root` to every rank.
    pub(crate) fn broadcast(&self, root: usize, value: &mut Real) -> Result<(), QDistError> {
        self.transport.broadcast(root, value)
    }

    /// Sums `local` across every rank (`spec.md` §4.5's cross-rank
    /// probability reduction).
    pub(crate) fn reduce_sum(&self, local: Real) -> Result<Real, QDistError> {
        self.transport.reduce_sum(local)
    }

    /// Pairwise exchange primitive used by [`crate::exchange`]; not part of
    /// the public API.
    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Rank 0 logs a human-readable banner: rank count, thread backend
    /// availability, and scalar byte size.
    pub fn report(&self) {
        if self.rank() != 0 {
            return;
        }
        let threaded = cfg!(feature = "backend-threaded");
        tracing::info!(
            num_ranks = self.num_ranks(),
            threaded,
            scalar_bytes = SCALAR_BYTES,
            "qdist environment ready"
        );
    }

    /// Records a collective abort with `code`/`message`; every rank's next
    /// collective call observes it and fails with
    /// [`QDistError::Aborted`]. Rust libraries must not terminate the host
    /// process, so unlike a standalone MPI program this does not call
    /// `std::process::exit` — the abort is surfaced as an `Err` that
    /// propagates out of [`Environment::run_distributed`] instead.
    pub fn abort(&self, err: QDistError) -> QDistError {
        let code = err.code();
        let message = err.to_string();
        self.transport.trigger_abort(code, message.clone());
        QDistError::Aborted { code, message }
    }

    /// The error-reporting entry point every argument-domain and
    /// numerical-precondition check routes through (`spec.md` §7): prints
    /// the `function_name: message` diagnostic via [`report_and_abort`],
    /// then, for every fatal variant, calls [`Environment::abort`]'s
    /// collective-abort primitive so every other rank's next collective
    /// call observes it. Recoverable variants (`AlreadyInitialized`,
    /// `AlreadyFinalized`) are reported but never trigger a collective
    /// abort.
    pub(crate) fn report_and_abort(&self, function_name: &str, err: QDistError) -> QDistError {
        let reported = report_and_abort(function_name, self.rank(), err);
        if let QDistError::Aborted { code, message } = &reported {
            self.transport.trigger_abort(*code, message.clone());
        }
        reported
    }

    /// `Some((code, message))` once some rank has called
    /// [`Environment::abort`].
    pub fn is_aborted(&self) -> Option<(ErrorCode, String)> {
        self.transport.aborted()
    }
}
