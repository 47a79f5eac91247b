//! Client side of one gRPC call
//!
//! Every call is opened as a bidirectional stream. On the wire a unary or
//! client-stream method looks the same once the client has sent its
//! messages and half-closed, so one call type serves all four shapes.
//! Requests are fed through a bounded channel; the response headers are
//! awaited on their own task so messages can flow before the server
//! answers.

use bytes::Bytes;
use futures_util::stream;
use http::uri::PathAndQuery;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tonic::client::Grpc;
use tonic::transport::Channel;
use tonic::{Request, Response, Status, Streaming};

use super::{RawCodec, RpcError};

/// Request messages queued ahead of the transport
const REQUEST_BUFFER: usize = 16;

enum Inbound {
    Opening(JoinHandle<Result<Response<Streaming<Bytes>>, Status>>),
    Open(Streaming<Bytes>),
    Done,
}

/// One outgoing call
pub struct ClientCall {
    method: String,
    outbound: Option<mpsc::Sender<Bytes>>,
    inbound: Inbound,
}

impl ClientCall {
    /// Open a call on `method` over `channel`
    pub async fn open(channel: Channel, method: &str) -> Result<Self, RpcError> {
        let path = PathAndQuery::try_from(method)
            .map_err(|_| RpcError::InvalidMethod(method.to_string()))?;
        let mut grpc = Grpc::new(channel);
        grpc.ready().await?;

        let (outbound, requests) = mpsc::channel(REQUEST_BUFFER);
        let requests = stream::unfold(requests, |mut requests| async move {
            requests.recv().await.map(|message| (message, requests))
        });
        let opening = tokio::spawn(async move {
            grpc.streaming(Request::new(requests), path, RawCodec).await
        });

        Ok(Self {
            method: method.to_string(),
            outbound: Some(outbound),
            inbound: Inbound::Opening(opening),
        })
    }

    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Send one request message
    ///
    /// If the server already ended the call, its status is returned.
    pub async fn send_message(&mut self, message: Bytes) -> Result<(), RpcError> {
        let Some(outbound) = &self.outbound else {
            return Err(RpcError::SendClosed);
        };
        if outbound.send(message).await.is_err() {
            self.outbound = None;
            return Err(self.terminal_error().await);
        }
        Ok(())
    }

    /// Half-close the request side; idempotent
    pub fn close_send(&mut self) {
        self.outbound = None;
    }

    /// Next response message
    ///
    /// `None` once the server ended the call with OK. A non-OK status is
    /// returned as `RpcError::Status`.
    pub async fn recv_message(&mut self) -> Result<Option<Bytes>, RpcError> {
        loop {
            match &mut self.inbound {
                Inbound::Opening(opening) => {
                    let opened = opening.await;
                    self.inbound = Inbound::Done;
                    let response = opened.map_err(|_| RpcError::Closed)??;
                    self.inbound = Inbound::Open(response.into_inner());
                }
                Inbound::Open(responses) => {
                    return match responses.message().await {
                        Ok(Some(message)) => Ok(Some(message)),
                        Ok(None) => {
                            self.inbound = Inbound::Done;
                            Ok(None)
                        }
                        Err(status) => {
                            self.inbound = Inbound::Done;
                            Err(RpcError::Status(status))
                        }
                    };
                }
                Inbound::Done => return Ok(None),
            }
        }
    }

    /// Half-close and drain every remaining response message
    pub async fn finish(mut self) -> Result<Vec<Bytes>, RpcError> {
        self.close_send();
        let mut responses = Vec::new();
        while let Some(message) = self.recv_message().await? {
            responses.push(message);
        }
        Ok(responses)
    }

    /// Read to the end of the call and report why it stopped
    async fn terminal_error(&mut self) -> RpcError {
        loop {
            match self.recv_message().await {
                Ok(Some(_)) => {}
                Ok(None) => return RpcError::Closed,
                Err(e) => return e,
            }
        }
    }
}

impl Drop for ClientCall {
    fn drop(&mut self) {
        if let Inbound::Opening(opening) = &self.inbound {
            opening.abort();
        }
    }
}

impl std::fmt::Debug for ClientCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCall")
            .field("method", &self.method)
            .field("send_closed", &self.outbound.is_none())
            .finish()
    }
}
