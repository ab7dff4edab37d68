// region:    --- Imports
use crate::bidding::commands::{handle_place_bid, PlaceBidCommand};
use crate::bidding::model::VehicleSnapshot;
use crate::catalog::{
    handle_create_vehicle, handle_remove_vehicle, handle_reschedule_vehicle, CreateVehicleCommand,
};
use crate::error::{AdminError, BidError, LedgerError};
use crate::hub::BroadcastHub;
use crate::ledger::Ledger;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
// endregion: --- Imports

pub type AppState = (Arc<dyn Ledger>, Arc<BroadcastHub>);

/// All routes of the service.
pub fn routes(ledger: Arc<dyn Ledger>, hub: Arc<BroadcastHub>) -> Router {
    Router::new()
        .route("/api/bids", post(place_bid))
        .route("/api/vehicles", get(list_vehicles))
        .route("/api/vehicles/:id", get(get_vehicle))
        .route("/api/vehicles/:id/bids", get(get_bid_history))
        .route("/api/vehicles/:id/highest-bid", get(get_highest_bid))
        .route("/admin/vehicles", post(admin_add_vehicle))
        .route("/admin/vehicles/:id", delete(admin_delete_vehicle))
        .route("/admin/vehicles/:id/auction-end", put(admin_reschedule))
        .route("/ws/auction", get(ws_handler))
        .with_state((ledger, hub))
}

// region:    --- Bid Handlers

/// Bid placement boundary.
async fn place_bid(
    State((ledger, hub)): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<impl IntoResponse, BidError> {
    info!("{:<12} --> bid request: {:?}", "Handler", cmd);
    let bid = handle_place_bid(cmd, &*ledger, &hub).await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

// endregion: --- Bid Handlers

// region:    --- Query Handlers

/// Active lots only; closed or expired lots never show up here even when
/// the scheduled sweep has not reached them yet.
async fn list_vehicles(
    State((ledger, _)): State<AppState>,
) -> Result<Json<Vec<VehicleSnapshot>>, LedgerError> {
    let vehicles = ledger.list_active(Utc::now()).await?;
    Ok(Json(vehicles.iter().map(|v| v.snapshot()).collect()))
}

async fn get_vehicle(
    State((ledger, _)): State<AppState>,
    Path(vehicle_id): Path<i64>,
) -> Result<impl IntoResponse, BidError> {
    let vehicle = ledger.read(vehicle_id).await?.ok_or(BidError::NotFound)?;
    Ok(Json(vehicle.snapshot()))
}

/// Bid history, newest first.
async fn get_bid_history(
    State((ledger, _)): State<AppState>,
    Path(vehicle_id): Path<i64>,
) -> Result<impl IntoResponse, LedgerError> {
    let bids = ledger.bid_history(vehicle_id).await?;
    Ok(Json(bids))
}

async fn get_highest_bid(
    State((ledger, _)): State<AppState>,
    Path(vehicle_id): Path<i64>,
) -> Result<impl IntoResponse, LedgerError> {
    let bid = ledger.highest_bid(vehicle_id).await?;
    Ok(Json(bid))
}

// endregion: --- Query Handlers

// region:    --- Admin Handlers

#[derive(Debug, Deserialize)]
struct AdminAuth {
    admin_id: i64,
}

#[derive(Debug, Deserialize)]
struct RescheduleRequest {
    admin_id: i64,
    auction_end: DateTime<Utc>,
}

async fn admin_add_vehicle(
    State((ledger, hub)): State<AppState>,
    Json(cmd): Json<CreateVehicleCommand>,
) -> Result<impl IntoResponse, AdminError> {
    let vehicle = handle_create_vehicle(cmd, &*ledger, &hub).await?;
    Ok((StatusCode::CREATED, Json(vehicle.snapshot())))
}

async fn admin_delete_vehicle(
    State((ledger, hub)): State<AppState>,
    Path(vehicle_id): Path<i64>,
    Json(auth): Json<AdminAuth>,
) -> Result<impl IntoResponse, AdminError> {
    handle_remove_vehicle(auth.admin_id, vehicle_id, &*ledger, &hub).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_reschedule(
    State((ledger, _)): State<AppState>,
    Path(vehicle_id): Path<i64>,
    Json(req): Json<RescheduleRequest>,
) -> Result<impl IntoResponse, AdminError> {
    let vehicle =
        handle_reschedule_vehicle(req.admin_id, vehicle_id, req.auction_end, &*ledger).await?;
    Ok(Json(vehicle.snapshot()))
}

// endregion: --- Admin Handlers

// region:    --- WebSocket Handler

/// Observer endpoint: upgrades to WebSocket and registers with the hub.
/// Server-to-client only; inbound frames are liveness signals and are
/// otherwise ignored.
async fn ws_handler(ws: WebSocketUpgrade, State((_, hub)): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (observer_id, mut rx) = hub.connect().await;
    let (mut sink, mut stream) = socket.split();

    // Forward hub messages to the socket until either side goes away.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {
                debug!("{:<12} --> liveness frame from {}", "Ws", observer_id);
            }
        }
    }

    hub.disconnect(observer_id).await;
    send_task.abort();
    info!("{:<12} --> observer {} left", "Ws", observer_id);
}

// endregion: --- WebSocket Handler
