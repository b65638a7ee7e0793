use indexmap::IndexMap;
use parking_lot::RwLock;
use rewardnet_model::{
    AccountId, Decision, Entity, NewRequest, Request, RequestId, RequestKind, RequestStatus,
};
use time::OffsetDateTime;

#[derive(Debug)]
struct Slot {
    request: Request,
    claimed: bool,
}

#[derive(Debug, Default)]
struct Pending {
    slots: IndexMap<RequestId, Slot>,
    last_id: u64,
}

/// Approval queue.
///
/// Pending requests and the append-only log of terminal requests are kept
/// apart. A request leaves the queue in three steps:
///
/// 1. [`claim`](Self::claim) marks a pending request as being decided, so no
///    other decision can start on it.
/// 2. The caller applies the effects of the decision.
/// 3. [`commit`](Self::commit) moves it to the terminal log, or
///    [`release`](Self::release) hands it back to the queue if applying the
///    effects failed.
///
/// Locks are always taken in the order pending then terminal.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: RwLock<Pending>,
    terminal: RwLock<IndexMap<RequestId, Request>>,
}

impl RequestQueue {
    /// Restore a queue from its records.
    pub fn from_records(
        pending: impl IntoIterator<Item = Request>,
        terminal: impl IntoIterator<Item = Request>,
        last_id: u64,
    ) -> rewardnet_model::Result<Self> {
        let mut restored = Pending {
            last_id,
            ..Default::default()
        };
        let mut log = IndexMap::new();
        for request in terminal {
            if !request.status().is_terminal() {
                return Err(rewardnet_model::Error::InvalidState(
                    "pending request found in the terminal log",
                ));
            }
            restored.last_id = restored.last_id.max(request.id().get());
            if log.insert(request.id(), request).is_some() {
                return Err(rewardnet_model::Error::InvalidState(
                    "duplicate request in the terminal log",
                ));
            }
        }
        for request in pending {
            if request.status().is_terminal() || log.contains_key(&request.id()) {
                return Err(rewardnet_model::Error::InvalidState(
                    "terminal request found in the pending queue",
                ));
            }
            restored.last_id = restored.last_id.max(request.id().get());
            let slot = Slot {
                request,
                claimed: false,
            };
            if let Some(slot) = restored.slots.insert(slot.request.id(), slot) {
                return Err(rewardnet_model::Error::Conflict(
                    "request id",
                    slot.request.id().to_string(),
                ));
            }
        }
        Ok(Self {
            pending: RwLock::new(restored),
            terminal: RwLock::new(log),
        })
    }

    /// Get the last assigned request id.
    pub fn last_id(&self) -> u64 {
        self.pending.read().last_id
    }

    /// Enqueue a new pending request.
    ///
    /// `admit` is called with every pending or approved request while the
    /// queue is locked, so rules that depend on other requests (such as one
    /// withdrawal per day) cannot be raced by a concurrent submission.
    ///
    /// Fails with [`Error::DuplicateEvidence`](rewardnet_model::Error::DuplicateEvidence)
    /// if a pending or approved request of the same kind holds the same
    /// evidence.
    pub fn submit(
        &self,
        params: NewRequest,
        submitted_at: OffsetDateTime,
        admit: impl FnOnce(&[&Request]) -> rewardnet_model::Result<()>,
    ) -> rewardnet_model::Result<Request> {
        let mut pending = self.pending.write();
        let terminal = self.terminal.read();
        let live = pending
            .slots
            .values()
            .map(|slot| &slot.request)
            .chain(
                terminal
                    .values()
                    .filter(|request| request.status() == RequestStatus::Approved),
            )
            .collect::<Vec<_>>();

        if let Some(evidence) = params.evidence.as_ref() {
            let kind = params.payload.kind();
            if live
                .iter()
                .any(|request| request.holds_evidence(kind, evidence))
            {
                return Err(rewardnet_model::Error::DuplicateEvidence(
                    evidence.to_string(),
                ));
            }
        }
        admit(&live)?;
        drop(live);
        drop(terminal);

        let next = pending
            .last_id
            .checked_add(1)
            .ok_or(rewardnet_model::Error::Overflow)?;
        let request = Request::new(RequestId::new(next), params, submitted_at);
        pending.last_id = next;
        pending.slots.insert(
            request.id(),
            Slot {
                request: request.clone(),
                claimed: false,
            },
        );
        Ok(request)
    }

    /// Claim a pending request for a decision.
    pub fn claim(&self, id: RequestId) -> rewardnet_model::Result<Request> {
        let mut pending = self.pending.write();
        if let Some(slot) = pending.slots.get_mut(&id) {
            if slot.claimed {
                return Err(rewardnet_model::Error::InvalidState(
                    "the request is being decided",
                ));
            }
            slot.claimed = true;
            return Ok(slot.request.clone());
        }
        if self.terminal.read().contains_key(&id) {
            Err(rewardnet_model::Error::AlreadyProcessed(id))
        } else {
            Err(not_found(id))
        }
    }

    /// Hand a claimed request back to the queue.
    pub fn release(&self, id: RequestId) {
        if let Some(slot) = self.pending.write().slots.get_mut(&id) {
            slot.claimed = false;
        }
    }

    /// Move a claimed request to the terminal log.
    pub fn commit(
        &self,
        id: RequestId,
        decision: &Decision,
        decided_at: OffsetDateTime,
    ) -> rewardnet_model::Result<Request> {
        let mut pending = self.pending.write();
        let mut terminal = self.terminal.write();
        match pending.slots.get(&id) {
            Some(slot) if !slot.claimed => {
                return Err(rewardnet_model::Error::InvalidState(
                    "the request has not been claimed",
                ));
            }
            Some(_) => {}
            None if terminal.contains_key(&id) => {
                return Err(rewardnet_model::Error::AlreadyProcessed(id));
            }
            None => return Err(not_found(id)),
        }
        let Some(Slot { mut request, .. }) = pending.slots.shift_remove(&id) else {
            return Err(not_found(id));
        };
        request.finalize(decision, decided_at)?;
        terminal.insert(id, request.clone());
        Ok(request)
    }

    /// Get a request, pending or terminal.
    pub fn request(&self, id: RequestId) -> rewardnet_model::Result<Request> {
        if let Some(slot) = self.pending.read().slots.get(&id) {
            return Ok(slot.request.clone());
        }
        self.terminal
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Get pending requests in submission order, optionally of one kind.
    pub fn pending(&self, kind: Option<RequestKind>) -> Vec<Request> {
        self.pending
            .read()
            .slots
            .values()
            .map(|slot| &slot.request)
            .filter(|request| kind.map_or(true, |kind| request.kind() == kind))
            .cloned()
            .collect()
    }

    /// Get the terminal log in decision order.
    pub fn terminal(&self) -> Vec<Request> {
        self.terminal.read().values().cloned().collect()
    }

    /// Returns whether the member owns a pending request.
    pub fn has_pending(&self, member: AccountId) -> bool {
        self.pending
            .read()
            .slots
            .values()
            .any(|slot| slot.request.member() == member)
    }
}

fn not_found(id: RequestId) -> rewardnet_model::Error {
    rewardnet_model::Error::NotFound(Entity::Request, id.to_string())
}
