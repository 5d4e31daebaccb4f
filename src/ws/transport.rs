//! Client transport adapters.
//!
//! The relay duties are written against a plain [`Stream`] of
//! [`ClientFrame`]s and a [`Sink`] of text payloads so that they do not
//! depend on a particular WebSocket implementation. [`split_socket`]
//! adapts an upgraded axum [`WebSocket`] into that pair.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};

use crate::error::RelayError;

/// A frame read from the client, reduced to what the relay acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// A chat line typed by the user.
    Text(String),
    /// The client asked to close the connection.
    Close,
}

/// Splits an upgraded socket into a frame reader and a text writer.
///
/// Ping and pong frames are dropped from the reader. Binary frames are
/// accepted when they carry valid UTF-8; otherwise the reader yields a
/// [`RelayError::Transport`].
pub fn split_socket(
    socket: WebSocket,
) -> (
    impl Stream<Item = Result<ClientFrame, RelayError>> + Send + Unpin + 'static,
    impl Sink<String, Error = RelayError> + Send + Unpin + 'static,
) {
    let (ws_tx, ws_rx) = socket.split();

    let reader = ws_rx.filter_map(|msg| future::ready(client_frame(msg)));
    let writer = ws_tx
        .sink_map_err(RelayError::from)
        .with(|text: String| future::ready(Ok::<_, RelayError>(Message::text(text))));

    (reader, writer)
}

fn client_frame(msg: Result<Message, axum::Error>) -> Option<Result<ClientFrame, RelayError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(ClientFrame::Text(text.as_str().to_owned()))),
        Ok(Message::Binary(bytes)) => Some(
            String::from_utf8(bytes.to_vec())
                .map(ClientFrame::Text)
                .map_err(|err| RelayError::Transport(format!("binary frame is not UTF-8: {err}"))),
        ),
        Ok(Message::Close(_)) => Some(Ok(ClientFrame::Close)),
        Ok(_) => None,
        Err(err) => Some(Err(err.into())),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::Bytes;

    use super::*;

    #[test]
    fn text_frame_becomes_text() {
        let frame = client_frame(Ok(Message::text("hi")));
        assert_eq!(frame.and_then(Result::ok), Some(ClientFrame::Text("hi".to_string())));
    }

    #[test]
    fn close_frame_becomes_close() {
        let frame = client_frame(Ok(Message::Close(None)));
        assert_eq!(frame.and_then(Result::ok), Some(ClientFrame::Close));
    }

    #[test]
    fn ping_is_skipped() {
        assert!(client_frame(Ok(Message::Ping(Bytes::new()))).is_none());
    }

    #[test]
    fn utf8_binary_is_relayed_as_text() {
        let frame = client_frame(Ok(Message::Binary(Bytes::from_static(b"bin"))));
        assert_eq!(frame.and_then(Result::ok), Some(ClientFrame::Text("bin".to_string())));
    }

    #[test]
    fn invalid_binary_is_a_transport_error() {
        let frame = client_frame(Ok(Message::Binary(Bytes::from_static(&[0xff, 0xfe]))));
        let Some(Err(err)) = frame else {
            panic!("expected transport error");
        };
        assert!(err.is_disconnect());
    }
}
