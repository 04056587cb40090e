// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::future;
use std::net::SocketAddr;

use axum::extract::ws::{Message as Frame, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::live::MessageDispatcher;
use crate::model::{DecodeError, Message};
use crate::store::KeyStore;

use super::AppState;

pub async fn message_socket<S: KeyStore>(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState<S>>,
) -> Response {
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| serve_socket(dispatcher, remote, socket))
}

/// Decodes a data frame. Control frames yield `None`.
fn decode_frame(frame: Frame) -> Option<Result<Message, DecodeError>> {
    match frame {
        Frame::Text(text) => Some(Message::decode(text.as_str().as_bytes())),
        Frame::Binary(bytes) => Some(Message::decode(&bytes)),
        Frame::Ping(_) | Frame::Pong(_) | Frame::Close(_) => None,
    }
}

/// A transport error or a close frame ends the inbound stream.
fn is_open(frame: &Result<Frame, axum::Error>) -> bool {
    matches!(frame, Ok(frame) if !matches!(frame, Frame::Close(_)))
}

async fn serve_socket<S: KeyStore>(
    dispatcher: MessageDispatcher<S>,
    remote: SocketAddr,
    socket: WebSocket,
) {
    let (mut sink, mut frames) = socket.split();

    let first = loop {
        match frames.next().await {
            Some(Ok(Frame::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(frame)) => {
                if let Some(decoded) = decode_frame(frame) {
                    break decoded;
                }
            }
        }
    };
    let first = match first {
        Ok(first) => first,
        Err(err) => {
            warn!(remote = %remote, error = %err, "closing live connection on bad first envelope");
            let _ = sink.close().await;
            return;
        }
    };

    let (outbound, replies) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_replies(sink, replies, remote));

    let inbound = frames
        .take_while(|frame| future::ready(is_open(frame)))
        .filter_map(|frame| future::ready(frame.ok().and_then(decode_frame)));
    let inbound = std::pin::pin!(inbound);

    if let Err(err) = dispatcher.run_connection(remote, first, inbound, outbound).await {
        debug!(remote = %remote, error = %err, "live connection ended with an error");
    }

    if let Err(err) = writer.await {
        error!(remote = %remote, error = %err, "live connection writer panicked");
    }
}

async fn write_replies(
    mut sink: SplitSink<WebSocket, Frame>,
    mut replies: mpsc::UnboundedReceiver<Message>,
    remote: SocketAddr,
) {
    while let Some(reply) = replies.recv().await {
        let text = match serde_json::to_string(&reply) {
            Ok(text) => text,
            Err(err) => {
                error!(remote = %remote, error = %err, "cannot encode reply");
                continue;
            }
        };
        if sink.send(Frame::Text(text.into())).await.is_err() {
            debug!(remote = %remote, "live connection closed while sending");
            break;
        }
    }
    let _ = sink.close().await;
}
