use messmate_store::StoreError;
use messmate_types::{Gender, GroupId, InviteId, UserId, MAX_MEMBERS};
use thiserror::Error;

/// Invite validation and policy failures. Every variant except
/// [`InviteError::Store`] is raised before any write is issued.
#[derive(Debug, Error)]
pub enum InviteError {
    #[error("you cannot invite yourself")]
    SelfInvite,

    #[error("set your gender first: new-room invites require male or female")]
    GenderRequired,

    #[error("gender mismatch: this room is for {locked} only")]
    GenderMismatch { locked: Gender },

    #[error("room already has the maximum {} members", MAX_MEMBERS)]
    RoomFull,

    #[error("{0} is already a member of this room")]
    AlreadyMember(UserId),

    #[error("no account found for {email}; ask them to sign in first")]
    UnknownEmail { email: String },

    #[error("invite {0} not found")]
    InviteNotFound(InviteId),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("no public profile for {0}")]
    ProfileNotFound(UserId),

    #[error("invite {invite} is not addressed to {actor}")]
    NotRecipient { invite: InviteId, actor: UserId },

    #[error("join invite {0} carries no group id")]
    MissingGroup(InviteId),

    #[error(transparent)]
    Store(#[from] StoreError),
}
