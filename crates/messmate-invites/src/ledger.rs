use std::sync::Arc;

use messmate_store::{Directory, RemoteStore, StoreError, WriteOp};
use messmate_types::{
    now_millis, paths, Group, GroupId, Invite, InviteId, InviteKind, InviteStatus, PublicProfile,
    UserId,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::InviteError;

/// What accepting an invite materialized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// A brand-new room was created with sender and recipient.
    Created(GroupId),
    /// The recipient joined an existing room.
    Joined(GroupId),
}

impl AcceptOutcome {
    pub fn group_id(&self) -> &GroupId {
        match self {
            AcceptOutcome::Created(gid) | AcceptOutcome::Joined(gid) => gid,
        }
    }
}

/// State machine over invite records. All operations take the acting
/// user explicitly; there is no ambient identity.
pub struct InviteLedger {
    store: Arc<dyn RemoteStore>,
    directory: Directory,
}

impl InviteLedger {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        let directory = Directory::new(Arc::clone(&store));
        Self { store, directory }
    }

    /// Propose a brand-new room to `peer`. No room exists until they
    /// accept. The sender's gender must be concrete and is locked onto
    /// the invite.
    pub async fn invite_to_new_room(
        &self,
        actor: &UserId,
        peer: &UserId,
        group_name: Option<String>,
    ) -> Result<InviteId, InviteError> {
        if actor == peer {
            return Err(InviteError::SelfInvite);
        }
        let me = self.require_profile(actor).await?;
        if !me.gender.is_concrete() {
            return Err(InviteError::GenderRequired);
        }
        let them = self.require_profile(peer).await?;
        if them.gender != me.gender {
            return Err(InviteError::GenderMismatch { locked: me.gender });
        }

        let name = group_name.unwrap_or_else(|| {
            let label = if them.display_name.is_empty() {
                peer.short().to_string()
            } else {
                them.display_name.clone()
            };
            format!("{} with {}", me.gender.room_label(), label)
        });

        let invite = Invite {
            from: actor.clone(),
            to: peer.clone(),
            kind: InviteKind::NewRoom,
            group_id: None,
            group_name: name,
            gender: Some(me.gender),
            status: InviteStatus::Pending,
            created_at: now_millis(),
        };
        self.write_invite(invite).await
    }

    /// Invite someone, looked up by email, into an existing room. The
    /// room must have space; a locked room gender must admit them.
    pub async fn invite_to_group(
        &self,
        actor: &UserId,
        group_id: &GroupId,
        recipient_email: &str,
    ) -> Result<InviteId, InviteError> {
        let group = self.load_group(group_id).await?;
        if !group.has_room() {
            return Err(InviteError::RoomFull);
        }

        let recipient = self
            .directory
            .uid_for_email(recipient_email)
            .await?
            .ok_or_else(|| InviteError::UnknownEmail {
                email: recipient_email.trim().to_lowercase(),
            })?;
        if recipient == *actor {
            return Err(InviteError::SelfInvite);
        }
        if group.is_member(&recipient) {
            return Err(InviteError::AlreadyMember(recipient));
        }

        // Locked room gender, falling back to the inviter's own gender
        // when the room was created through the ungated path.
        let locked = match group.gender {
            Some(g) => Some(g),
            None => {
                let me = self.require_profile(actor).await?;
                me.gender.is_concrete().then_some(me.gender)
            }
        };
        if let Some(locked) = locked {
            let them = self.require_profile(&recipient).await?;
            if them.gender != locked {
                return Err(InviteError::GenderMismatch { locked });
            }
        }

        let invite = Invite {
            from: actor.clone(),
            to: recipient,
            kind: InviteKind::JoinGroup,
            group_id: Some(group_id.clone()),
            group_name: group.name.clone(),
            gender: locked,
            status: InviteStatus::Pending,
            created_at: now_millis(),
        };
        self.write_invite(invite).await
    }

    /// Accept a pending invite. The gender lock is re-validated against
    /// the recipient's *current* profile — it may have changed since the
    /// invite was sent. The group side effect and the removal of the
    /// invite plus both indexes land in one atomic write.
    pub async fn accept_invite(
        &self,
        actor: &UserId,
        invite_id: &InviteId,
    ) -> Result<AcceptOutcome, InviteError> {
        let invite = self.load_invite(invite_id).await?;
        if invite.to != *actor {
            return Err(InviteError::NotRecipient {
                invite: invite_id.clone(),
                actor: actor.clone(),
            });
        }
        let me = self.require_profile(actor).await?;
        if let Some(locked) = invite.gender {
            if me.gender != locked {
                return Err(InviteError::GenderMismatch { locked });
            }
        }

        match invite.kind {
            InviteKind::NewRoom => {
                let gid = GroupId::generate();
                let group = Group {
                    name: invite.group_name.clone(),
                    created_by: invite.from.clone(),
                    members: [(invite.from.clone(), true), (invite.to.clone(), true)]
                        .into_iter()
                        .collect(),
                    gender: invite.gender.or(me.gender.is_concrete().then_some(me.gender)),
                    active: true,
                    created_at: now_millis(),
                };
                let record = encode(&paths::group(&gid), &group)?;
                let mut ops = vec![WriteOp::put(paths::group(&gid), record)];
                ops.extend(removal_ops(invite_id, &invite));
                self.store.apply(ops).await?;
                debug!(invite = %invite_id, group = %gid, "accepted new-room invite");
                Ok(AcceptOutcome::Created(gid))
            }
            InviteKind::JoinGroup => {
                let gid = invite
                    .group_id
                    .clone()
                    .ok_or_else(|| InviteError::MissingGroup(invite_id.clone()))?;
                let group = self.load_group(&gid).await?;
                if !group.has_room() {
                    return Err(InviteError::RoomFull);
                }
                let mut ops = vec![WriteOp::put(
                    paths::member(&gid, actor),
                    Value::Bool(true),
                )];
                ops.extend(removal_ops(invite_id, &invite));
                self.store.apply(ops).await?;
                debug!(invite = %invite_id, group = %gid, "accepted join-group invite");
                Ok(AcceptOutcome::Joined(gid))
            }
        }
    }

    /// Decline a pending invite: one atomic delete of the record and
    /// both indexes. No group is touched.
    pub async fn decline_invite(
        &self,
        actor: &UserId,
        invite_id: &InviteId,
    ) -> Result<(), InviteError> {
        let invite = self.load_invite(invite_id).await?;
        if invite.to != *actor {
            return Err(InviteError::NotRecipient {
                invite: invite_id.clone(),
                actor: actor.clone(),
            });
        }
        self.store.apply(removal_ops(invite_id, &invite)).await?;
        debug!(invite = %invite_id, "declined invite");
        Ok(())
    }

    /// The actor's inbox: every pending invite addressed to them.
    pub async fn pending_for(
        &self,
        actor: &UserId,
    ) -> Result<Vec<(InviteId, Invite)>, InviteError> {
        let index = match self.store.get(&paths::invites_to(actor)).await? {
            Some(Value::Object(map)) => map,
            _ => return Ok(Vec::new()),
        };
        let mut invites = Vec::with_capacity(index.len());
        for iid in index.keys() {
            let iid = InviteId::new(iid.clone());
            match self.store.get(&paths::invite(&iid)).await? {
                Some(value) => {
                    let invite: Invite = decode(&paths::invite(&iid), value)?;
                    if invite.status == InviteStatus::Pending {
                        invites.push((iid, invite));
                    }
                }
                // Index entry outlived its record; tolerate the race.
                None => warn!(invite = %iid, "dangling inbound invite index"),
            }
        }
        Ok(invites)
    }

    async fn write_invite(&self, invite: Invite) -> Result<InviteId, InviteError> {
        let iid = InviteId::generate();
        let record = encode(&paths::invite(&iid), &invite)?;
        self.store
            .apply(vec![
                WriteOp::put(paths::invite(&iid), record),
                WriteOp::put(paths::invite_to(&invite.to, &iid), Value::Bool(true)),
                WriteOp::put(paths::invite_from(&invite.from, &iid), Value::Bool(true)),
            ])
            .await?;
        debug!(invite = %iid, from = %invite.from, to = %invite.to, kind = ?invite.kind, "sent invite");
        Ok(iid)
    }

    async fn require_profile(&self, uid: &UserId) -> Result<PublicProfile, InviteError> {
        self.directory
            .public_profile(uid)
            .await?
            .ok_or_else(|| InviteError::ProfileNotFound(uid.clone()))
    }

    async fn load_invite(&self, iid: &InviteId) -> Result<Invite, InviteError> {
        match self.store.get(&paths::invite(iid)).await? {
            Some(value) => Ok(decode(&paths::invite(iid), value)?),
            None => Err(InviteError::InviteNotFound(iid.clone())),
        }
    }

    async fn load_group(&self, gid: &GroupId) -> Result<Group, InviteError> {
        match self.store.get(&paths::group(gid)).await? {
            Some(value) => Ok(decode(&paths::group(gid), value)?),
            None => Err(InviteError::GroupNotFound(gid.clone())),
        }
    }
}

fn removal_ops(iid: &InviteId, invite: &Invite) -> Vec<WriteOp> {
    vec![
        WriteOp::delete(paths::invite(iid)),
        WriteOp::delete(paths::invite_to(&invite.to, iid)),
        WriteOp::delete(paths::invite_from(&invite.from, iid)),
    ]
}

fn encode<T: serde::Serialize>(path: &str, record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|source| StoreError::Corrupt {
        path: path.to_string(),
        source,
    })
}

fn decode<T: serde::de::DeserializeOwned>(path: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
        path: path.to_string(),
        source,
    })
}
