//! Two-step ownership for privileged setters.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::Address;
use crate::{CvgError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable2Step {
    owner: Address,
    pending_owner: Option<Address>,
}

impl Ownable2Step {
    pub fn new(owner: Address) -> Ownable2Step {
        Ownable2Step {
            owner,
            pending_owner: None,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn pending_owner(&self) -> Option<Address> {
        self.pending_owner
    }

    pub fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(CvgError::NotOwner);
        }
        Ok(())
    }

    /// Nominates `new_owner`; ownership moves only once they accept.
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        self.pending_owner = Some(new_owner);
        Ok(())
    }

    pub fn accept_ownership(&mut self, caller: &Address) -> Result<()> {
        if self.pending_owner != Some(*caller) {
            return Err(CvgError::NotOwner);
        }
        info!(previous = %self.owner, new = %caller, "ownership transferred");
        self.owner = *caller;
        self.pending_owner = None;
        Ok(())
    }
}
