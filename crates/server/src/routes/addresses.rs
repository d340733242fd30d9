//! Address book route handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use tracing::instrument;

use bazaar_core::{Address, AddressFields, AddressId, AddressSlot, UserId};

use super::{IdQuery, Message, required_id, with_deadline};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::address::SlotEdit;
use crate::state::AppState;

fn caller(auth: &RequireAuth, query: &IdQuery) -> Result<UserId> {
    auth.ensure_self(required_id(query.id.as_deref())?)
}

/// The caller's addresses in slot order.
#[instrument(skip(state, auth))]
pub async fn index(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: std::result::Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Vec<Address>>> {
    let Query(query) = query?;
    let user_id = caller(&auth, &query)?;

    let addresses = with_deadline(state.config().cart_timeout, state.addresses().list(user_id))
        .await?;

    Ok(Json(addresses))
}

/// Add an address in the next free slot.
#[instrument(skip(state, auth, payload))]
pub async fn create(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: std::result::Result<Query<IdQuery>, QueryRejection>,
    payload: std::result::Result<Json<AddressFields>, JsonRejection>,
) -> Result<(StatusCode, Json<Address>)> {
    let Query(query) = query?;
    let user_id = caller(&auth, &query)?;
    let Json(fields) = payload?;

    let address = with_deadline(
        state.config().checkout_timeout,
        state.addresses().add(user_id, fields),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(address)))
}

/// Edit the home address.
#[instrument(skip(state, auth, payload))]
pub async fn edit_home(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: std::result::Result<Query<IdQuery>, QueryRejection>,
    payload: std::result::Result<Json<AddressFields>, JsonRejection>,
) -> Result<Json<Message>> {
    let Query(query) = query?;
    edit(state, auth, query, payload, AddressSlot::Home).await
}

/// Edit the work address.
#[instrument(skip(state, auth, payload))]
pub async fn edit_work(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: std::result::Result<Query<IdQuery>, QueryRejection>,
    payload: std::result::Result<Json<AddressFields>, JsonRejection>,
) -> Result<Json<Message>> {
    let Query(query) = query?;
    edit(state, auth, query, payload, AddressSlot::Work).await
}

async fn edit(
    state: AppState,
    auth: RequireAuth,
    query: IdQuery,
    payload: std::result::Result<Json<AddressFields>, JsonRejection>,
    slot: AddressSlot,
) -> Result<Json<Message>> {
    let user_id = caller(&auth, &query)?;
    let Json(fields) = payload?;

    let edit = with_deadline(
        state.config().cart_timeout,
        state.addresses().edit(user_id, slot, fields),
    )
    .await?;

    let message = match edit {
        SlotEdit::Updated => format!("Successfully updated the {} address", slot.as_str()),
        SlotEdit::Empty => format!("No {} address to update", slot.as_str()),
    };
    Ok(Json(Message::new(message)))
}

/// Remove every address.
#[instrument(skip(state, auth))]
pub async fn clear(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: std::result::Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Message>> {
    let Query(query) = query?;
    let user_id = caller(&auth, &query)?;

    with_deadline(state.config().cart_timeout, state.addresses().clear(user_id)).await?;

    Ok(Json(Message::new("Successfully deleted")))
}

/// Remove one address.
#[instrument(skip(state, auth))]
pub async fn remove(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(address_id): Path<String>,
    query: std::result::Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Message>> {
    let Query(query) = query?;
    let user_id = caller(&auth, &query)?;
    let address_id: AddressId = required_id(Some(address_id.as_str()))?;

    with_deadline(
        state.config().cart_timeout,
        state.addresses().remove(user_id, address_id),
    )
    .await?;

    Ok(Json(Message::new("Successfully deleted")))
}
