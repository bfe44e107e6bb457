//! The `Transport` trait and its channel-based default implementation.
//!
//! `spec.md` treats the message-passing substrate as an external
//! collaborator; this codebase's dependency lineage has no MPI-style crate,
//! so ranks are realized as OS threads within one process and the
//! substrate is a full mesh of `std::sync::mpsc` channels plus a small
//! shared rendezvous block for the collective operations (barrier,
//! reduce-AND, broadcast).

use crate::core::{ErrorCode, QDistError};
use crate::precision::Real;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Barrier, Mutex};

/// The message-passing and collective substrate one rank uses to talk to
/// its peers. Object-safe so `Environment` can hold it as `Box<dyn
/// Transport>`.
pub trait Transport: Send {
    /// This rank's id.
    fn rank(&self) -> usize;

    /// Total number of ranks in the group.
    fn num_ranks(&self) -> usize;

    /// One paired send/receive round with `peer`: sends `send` to `peer`
    /// and fills `recv` with what `peer` sent to this rank. `send.len()`
    /// and `recv.len()` may differ from the peer's, but the exchange
    /// protocol always calls this with matching chunk lengths on both
    /// sides.
    fn send_recv(&self, peer: usize, send: &[Real], recv: &mut [Real]) -> Result<(), QDistError>;

    /// Blocks until every rank has called `barrier`.
    fn barrier(&self) -> Result<(), QDistError>;

    /// Logical AND of `local` across every rank.
    fn reduce_success(&self, local: bool) -> Result<bool, QDistError>;

    /// Broadcasts `*value` from `root` to every rank, overwriting `*value`
    /// on non-root ranks.
    fn broadcast(&self, root: usize, value: &mut Real) -> Result<(), QDistError>;

    /// Sums `local` across every rank; every rank observes the same total.
    fn reduce_sum(&self, local: Real) -> Result<Real, QDistError>;

    /// Records a collective abort with `code`/`message`, visible to every
    /// rank's next collective call. Idempotent: the first abort wins.
    fn trigger_abort(&self, code: ErrorCode, message: String);

    /// `Some((code, message))` if some rank has already called
    /// [`Transport::trigger_abort`].
    fn aborted(&self) -> Option<(ErrorCode, String)>;
}

struct GroupState {
    num_ranks: usize,
    rendezvous: Barrier,
    stage_entry: Barrier,
    stage_exit: Barrier,
    bool_slots: Mutex<Vec<bool>>,
    real_slot: Mutex<Real>,
    real_slots: Mutex<Vec<Real>>,
    aborted: AtomicBool,
    abort_code: AtomicU32,
    abort_message: Mutex<String>,
}

impl GroupState {
    fn new(num_ranks: usize) -> Self {
        Self {
            num_ranks,
            rendezvous: Barrier::new(num_ranks),
            stage_entry: Barrier::new(num_ranks),
            stage_exit: Barrier::new(num_ranks),
            bool_slots: Mutex::new(vec![false; num_ranks]),
            real_slot: Mutex::new(0.0),
            real_slots: Mutex::new(vec![0.0; num_ranks]),
            aborted: AtomicBool::new(false),
            abort_code: AtomicU32::new(0),
            abort_message: Mutex::new(String::new()),
        }
    }
}

/// The channel-backed [`Transport`] spawned by
/// [`crate::env::Environment::run_distributed`] for every rank.
pub struct ChannelTransport {
    rank: usize,
    num_ranks: usize,
    senders: Vec<Option<Sender<Vec<Real>>>>,
    receivers: Vec<Option<Receiver<Vec<Real>>>>,
    group: std::sync::Arc<GroupState>,
}

impl ChannelTransport {
    /// Builds `num_ranks` transports wired into a full mesh, one per rank,
    /// in rank order.
    pub(crate) fn build_mesh(num_ranks: usize) -> Vec<ChannelTransport> {
        let mut senders: Vec<Vec<Option<Sender<Vec<Real>>>>> = (0..num_ranks).map(|_| (0..num_ranks).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Vec<Real>>>>> = (0..num_ranks).map(|_| (0..num_ranks).map(|_| None).collect()).collect();
        for i in 0..num_ranks {
            for j in 0..num_ranks {
                if i == j {
                    continue;
                }
                let (tx, rx) = std::sync::mpsc::channel::<Vec<Real>>();
                senders[i][j] = Some(tx);
                receivers[j][i] = Some(rx);
            }
        }
        let group = std::sync::Arc::new(GroupState::new(num_ranks));
        (0..num_ranks)
            .map(|rank| ChannelTransport {
                rank,
                num_ranks,
                senders: std::mem::take(&mut senders[rank]),
                receivers: std::mem::take(&mut receivers[rank]),
                group: group.clone(),
            })
            .collect()
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    fn send_recv(&self, peer: usize, send: &[Real], recv: &mut [Real]) -> Result<(), QDistError> {
        if let Some((code, message)) = self.aborted() {
            return Err(QDistError::Aborted { code, message });
        }
        let sender = self.senders[peer].as_ref().ok_or_else(|| QDistError::Transport {
            peer,
            message: "no channel wired to this peer".to_string(),
        })?;
        sender.send(send.to_vec()).map_err(|e| QDistError::Transport {
            peer,
            message: e.to_string(),
        })?;
        let receiver = self.receivers[peer].as_ref().ok_or_else(|| QDistError::Transport {
            peer,
            message: "no channel wired from this peer".to_string(),
        })?;
        let payload = receiver.recv().map_err(|e| QDistError::Transport {
            peer,
            message: e.to_string(),
        })?;
        if payload.len() != recv.len() {
            return Err(QDistError::Transport {
                peer,
                message: format!("expected {} elements, received {}", recv.len(), payload.len()),
            });
        }
        recv.copy_from_slice(&payload);
        Ok(())
    }

    fn barrier(&self) -> Result<(), QDistError> {
        if let Some((code, message)) = self.aborted() {
            return Err(QDistError::Aborted { code, message });
        }
        self.group.rendezvous.wait();
        Ok(())
    }

    fn reduce_success(&self, local: bool) -> Result<bool, QDistError> {
        if let Some((code, message)) = self.aborted() {
            return Err(QDistError::Aborted { code, message });
        }
        {
            let mut slots = self.group.bool_slots.lock().expect("bool_slots poisoned");
            slots[self.rank] = local;
        }
        self.group.stage_entry.wait();
        let result = {
            let slots = self.group.bool_slots.lock().expect("bool_slots poisoned");
            slots.iter().all(|&b| b)
        };
        self.group.stage_exit.wait();
        Ok(result)
    }

    fn broadcast(&self, root: usize, value: &mut Real) -> Result<(), QDistError> {
        if let Some((code, message)) = self.aborted() {
            return Err(QDistError::Aborted { code, message });
        }
        if self.rank == root {
            *self.group.real_slot.lock().expect("real_slot poisoned") = *value;
        }
        self.group.stage_entry.wait();
        if self.rank != root {
            *value = *self.group.real_slot.lock().expect("real_slot poisoned");
        }
        self.group.stage_exit.wait();
        Ok(())
    }

    fn reduce_sum(&self, local: Real) -> Result<Real, QDistError> {
        if let Some((code, message)) = self.aborted() {
            return Err(QDistError::Aborted { code, message });
        }
        {
            let mut slots = self.group.real_slots.lock().expect("real_slots poisoned");
            slots[self.rank] = local;
        }
        self.group.stage_entry.wait();
        let total = {
            let slots = self.group.real_slots.lock().expect("real_slots poisoned");
            slots.iter().sum()
        };
        self.group.stage_exit.wait();
        Ok(total)
    }

    fn trigger_abort(&self, code: ErrorCode, message: String) {
        if self
            .group
            .aborted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.group.abort_code.store(code, Ordering::SeqCst);
            *self.group.abort_message.lock().expect("abort_message poisoned") = message;
        }
    }

    fn aborted(&self) -> Option<(ErrorCode, String)> {
        if self.group.aborted.load(Ordering::SeqCst) {
            Some((
                self.group.abort_code.load(Ordering::SeqCst),
                self.group.abort_message.lock().expect("abort_message poisoned").clone(),
            ))
        } else {
            None
        }
    }
}
