use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug, Default)]
pub struct TaskSeq {
    next: u64,
}

impl TaskSeq {
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// A single-slot delayed task: scheduling a new one cancels the previous.
///
/// Stored in `TuiState` and mutated by the reducer/runtime. Dropping it
/// cancels whatever is still pending.
#[derive(Debug, Default)]
pub struct DeferredTask {
    seq: TaskSeq,
    active: Option<(TaskId, CancellationToken)>,
}

impl DeferredTask {
    /// Supersedes any pending task and returns the id/token for a new one.
    pub fn schedule(&mut self) -> (TaskId, CancellationToken) {
        self.cancel();
        let id = self.seq.next_id();
        let token = CancellationToken::new();
        self.active = Some((id, token.clone()));
        (id, token)
    }

    pub fn is_pending(&self) -> bool {
        self.active.is_some()
    }

    /// Clears the slot if `id` is the active task. Stale ids return false.
    pub fn finish_if_active(&mut self, id: TaskId) -> bool {
        let ok = self.active.as_ref().is_some_and(|(active, _)| *active == id);
        if ok {
            self.active = None;
        }
        ok
    }

    pub fn cancel(&mut self) {
        if let Some((_, token)) = self.active.take() {
            token.cancel();
        }
    }
}

impl Drop for DeferredTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
