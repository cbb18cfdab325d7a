use cosign_types::{CosignError, Result, TxIdentity};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Received,
    Merged,
    NotYetAuthorized,
    Authorized,
    Submitted,
}

/// One pass of a delivered envelope through merge, authorization and
/// submission. Nothing here is persisted; every delivery starts a fresh cycle
/// from whatever the store holds.
pub struct CollectCycle {
    current_state: CycleState,
    identity: TxIdentity,
    signatures: usize,
}

impl CollectCycle {
    pub fn new(identity: TxIdentity) -> Self {
        Self {
            current_state: CycleState::Received,
            identity,
            signatures: 0,
        }
    }

    pub fn current_state(&self) -> CycleState {
        self.current_state
    }

    pub fn identity(&self) -> &TxIdentity {
        &self.identity
    }

    /// Signature count of the merged record.
    pub fn signatures(&self) -> usize {
        self.signatures
    }

    pub fn merged(&mut self, signatures: usize) -> Result<()> {
        self.transition(CycleState::Merged, &[CycleState::Received])?;
        self.signatures = signatures;
        Ok(())
    }

    pub fn not_yet_authorized(&mut self) -> Result<()> {
        self.transition(CycleState::NotYetAuthorized, &[CycleState::Merged])
    }

    pub fn authorized(&mut self) -> Result<()> {
        self.transition(CycleState::Authorized, &[CycleState::Merged])
    }

    pub fn submitted(&mut self) -> Result<()> {
        self.transition(CycleState::Submitted, &[CycleState::Authorized])
    }

    fn transition(&mut self, new_state: CycleState, allowed_from: &[CycleState]) -> Result<()> {
        if !allowed_from.contains(&self.current_state) {
            return Err(CosignError::InvalidTransition(format!(
                "tx {}: {:?} -> {:?}, allowed from {:?}",
                self.identity, self.current_state, new_state, allowed_from
            )));
        }

        match new_state {
            CycleState::Authorized | CycleState::Submitted => info!(
                "tx {}: {:?} -> {:?}",
                self.identity, self.current_state, new_state
            ),
            _ => debug!(
                "tx {}: {:?} -> {:?}",
                self.identity, self.current_state, new_state
            ),
        }

        self.current_state = new_state;
        Ok(())
    }

}
