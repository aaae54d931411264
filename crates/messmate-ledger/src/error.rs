use messmate_store::StoreError;
use messmate_types::{GroupId, UserId};
use thiserror::Error;

/// Ledger validation and policy failures. Every variant except
/// [`LedgerError::Store`] is raised before any write is issued.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("amount must be a positive number of minor units")]
    NonPositiveAmount,

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("{0} is not a member of this room")]
    NotAMember(UserId),

    #[error("room name must be 1 to 40 characters")]
    InvalidName,

    #[error("only the owner may {action} this room")]
    OwnerOnly { action: &'static str },

    #[error("the owner cannot leave; delete the room instead")]
    OwnerCannotLeave,

    #[error("a room needs two distinct founding members")]
    SelfGroup,

    #[error("cannot settle with yourself")]
    SelfSettlement,

    #[error(transparent)]
    Store(#[from] StoreError),
}
