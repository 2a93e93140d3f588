use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::net::IpAddr;

use crate::http::server::AppState;
use crate::security::IpReputation;
use crate::shield::ShieldStatus;

#[derive(Debug, Serialize)]
pub struct ListChange {
    pub ip: IpAddr,
    pub list: &'static str,
    pub listed: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<ShieldStatus> {
    Json(state.shield.status())
}

pub async fn add_whitelist(State(state): State<AppState>, Path(ip): Path<IpAddr>) -> Json<ListChange> {
    state.shield.add_to_whitelist(ip);
    Json(ListChange {
        ip,
        list: "whitelist",
        listed: true,
    })
}

pub async fn remove_whitelist(
    State(state): State<AppState>,
    Path(ip): Path<IpAddr>,
) -> Result<Json<ListChange>, StatusCode> {
    if !state.shield.remove_from_whitelist(ip) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(ListChange {
        ip,
        list: "whitelist",
        listed: false,
    }))
}

pub async fn add_blacklist(State(state): State<AppState>, Path(ip): Path<IpAddr>) -> Json<ListChange> {
    state.shield.add_to_blacklist(ip);
    Json(ListChange {
        ip,
        list: "blacklist",
        listed: true,
    })
}

pub async fn remove_blacklist(
    State(state): State<AppState>,
    Path(ip): Path<IpAddr>,
) -> Result<Json<ListChange>, StatusCode> {
    if !state.shield.remove_from_blacklist(ip) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(ListChange {
        ip,
        list: "blacklist",
        listed: false,
    }))
}

pub async fn get_reputation(
    State(state): State<AppState>,
    Path(ip): Path<IpAddr>,
) -> Result<Json<IpReputation>, StatusCode> {
    state.shield.reputation(ip).map(Json).ok_or(StatusCode::NOT_FOUND)
}
