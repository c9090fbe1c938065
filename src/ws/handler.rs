//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{ConnectionId, Inbound, PacketRouter, ProtocolError, SimulationHandle};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::connection::{ConnectionHandle, ConnectionOutbox};
use crate::ws::protocol::ServerMsg;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = state.next_connection_id();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (handle, outbox) = ConnectionHandle::new(conn_id);
    if state.simulation.submit(Inbound::Open(handle)).await.is_err() {
        warn!(conn_id = %conn_id, "Simulation stopped, refusing connection");
        return;
    }

    let (ws_sink, ws_stream) = socket.split();
    let writer_handle = tokio::spawn(run_writer(conn_id, ws_sink, outbox));

    let limiter = PlayerRateLimiter::new(state.config.input_rate_limit);
    run_reader(conn_id, ws_stream, &state.simulation, &limiter).await;

    // Disconnect must reach the simulation even if the socket died mid-frame
    if state.simulation.submit(Inbound::Close(conn_id)).await.is_err() {
        debug!(conn_id = %conn_id, "Simulation already stopped");
    }

    writer_handle.abort();
    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> router -> simulation inbox
async fn run_reader(
    conn_id: ConnectionId,
    mut ws_stream: SplitStream<WebSocket>,
    simulation: &SimulationHandle,
    limiter: &PlayerRateLimiter,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let command = match PacketRouter::decode(&text) {
                    Ok(command) => command,
                    Err(e) => {
                        warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                if !limiter.allows(&command) {
                    debug!(
                        conn_id = %conn_id,
                        error = %ProtocolError::RateLimited,
                        "Angle update dropped"
                    );
                    continue;
                }

                let inbound = Inbound::Command {
                    id: conn_id,
                    command,
                };
                if simulation.submit(inbound).await.is_err() {
                    debug!(conn_id = %conn_id, "Simulation stopped");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Writer task: reliable events and the latest position frame -> WebSocket
async fn run_writer(
    conn_id: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    outbox: ConnectionOutbox,
) {
    let ConnectionOutbox {
        mut events_rx,
        mut frames_rx,
    } = outbox;

    loop {
        let result = tokio::select! {
            // Events first so a spawn reply is never overtaken by a frame
            biased;
            event = events_rx.recv() => match event {
                Some(msg) => send_event(&mut ws_sink, &msg).await,
                None => break,
            },
            changed = frames_rx.changed() => match changed {
                Ok(()) => {
                    let frame = frames_rx.borrow_and_update().clone();
                    ws_sink
                        .send(Message::Binary(frame.to_vec()))
                        .await
                        .map_err(|e| e.to_string())
                }
                Err(_) => break,
            },
        };

        if let Err(e) = result {
            debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Send a named event as JSON text
async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
