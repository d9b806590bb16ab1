use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};

use roost_store::Error;
use roost_types::api::PermissionChangeRequest;
use roost_types::models::{PERM_MEMBER, PERM_OWNER};

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::AuthUser;

pub async fn change_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<PermissionChangeRequest>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let target = data.user(req.user_id)?;
        if req.perm != PERM_OWNER && req.perm != PERM_MEMBER {
            return Err(Error::invalid("unknown permission level"));
        }
        let target_perm = target.perm;
        if data.user(auth.user_id)?.perm != PERM_OWNER {
            return Err(Error::forbidden("need global owner permissions"));
        }
        if target_perm == req.perm {
            return Err(Error::invalid("user already has that permission level"));
        }
        let owners = data.users.iter().filter(|u| u.perm == PERM_OWNER).count();
        if target_perm == PERM_OWNER && owners == 1 {
            return Err(Error::invalid("cannot demote the only global owner"));
        }
        data.user_mut(req.user_id)?.perm = req.perm;
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

/// Expel a user from the workspace. Their profile survives as
/// "Removed user" with a retrievable user id, their messages are blanked to
/// the same marker, and every membership, ownership and session goes away.
pub async fn remove_user(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let target = data.user(user_id)?;
        let target_perm = target.perm;
        if data.user(auth.user_id)?.perm != PERM_OWNER {
            return Err(Error::forbidden("need global owner permissions"));
        }
        let owners = data.users.iter().filter(|u| u.perm == PERM_OWNER).count();
        if target_perm == PERM_OWNER && owners == 1 {
            return Err(Error::invalid("cannot remove the only global owner"));
        }

        let user = data.user_mut(user_id)?;
        user.name_first = "Removed".to_string();
        user.name_last = "user".to_string();
        user.email = String::new();
        user.handle = String::new();
        user.perm = PERM_MEMBER;
        user.notifications.clear();

        for channel in &mut data.channels {
            channel.members.retain(|id| *id != user_id);
            channel.owners.retain(|id| *id != user_id);
            for message in &mut channel.messages {
                if message.sender_id == user_id {
                    message.body = "Removed user".to_string();
                }
            }
        }
        for dm in &mut data.dms {
            dm.members.retain(|id| *id != user_id);
            dm.owners.retain(|id| *id != user_id);
            for message in &mut dm.messages {
                if message.sender_id == user_id {
                    message.body = "Removed user".to_string();
                }
            }
        }
        data.sessions.retain(|s| s.user_id != user_id);
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}
