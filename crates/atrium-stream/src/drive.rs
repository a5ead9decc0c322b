use futures_util::{Stream, StreamExt};
use thiserror::Error;

use atrium_core::CooperativeCancellationToken;

use crate::decoder::SseDecoder;
use crate::event::StreamEvent;

/// How a driven stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The stream ran to end-of-stream; any trailing record was flushed.
    Completed,
    /// The cancellation token was set; reading stopped and no further
    /// events (terminal or otherwise) were dispatched.
    Aborted,
}

/// Enumerates supported `DecodeError` values.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("transport error while reading stream: {0}")]
    Transport(String),
}

/// Pumps a byte-chunk stream through a fresh decoder, emitting each event
/// in wire order. Suspends once per chunk read; a set cancellation token
/// resolves `Aborted` exactly once, even when buffered data remains.
pub async fn drive<S, B, E>(
    stream: S,
    cancel: &CooperativeCancellationToken,
    mut emit: impl FnMut(StreamEvent),
) -> Result<DriveOutcome, DecodeError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = SseDecoder::new();

    loop {
        if cancel.is_cancelled() {
            return Ok(DriveOutcome::Aborted);
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(DriveOutcome::Aborted),
            chunk = stream.next() => match chunk {
                Some(Ok(chunk)) => decoder.feed(chunk.as_ref(), &mut emit),
                Some(Err(error)) => return Err(DecodeError::Transport(error.to_string())),
                None => {
                    decoder.finish(&mut emit);
                    return Ok(DriveOutcome::Completed);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use atrium_core::CooperativeCancellationToken;

    use super::{drive, DriveOutcome};
    use crate::event::StreamEvent;

    type Chunk = Result<Vec<u8>, std::convert::Infallible>;

    fn ok_chunk(text: &str) -> Chunk {
        Ok(text.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn drives_a_whole_stream_to_completion() {
        let chunks = vec![
            ok_chunk("event: delta\ndata: {\"text\":\"a\"}\n\n"),
            ok_chunk("event: final\ndata: {\"content\":\"ab\"}\n\n"),
        ];
        let cancel = CooperativeCancellationToken::new();
        let mut events = Vec::new();

        let outcome = drive(stream::iter(chunks), &cancel, |event| events.push(event))
            .await
            .expect("stream should drive");

        assert_eq!(outcome, DriveOutcome::Completed);
        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn functional_cancelled_token_aborts_without_terminal_event() {
        let chunks = vec![
            ok_chunk("event: delta\ndata: {\"text\":\"a\"}\n\n"),
            ok_chunk("event: final\ndata: {\"content\":\"never seen\"}\n\n"),
        ];
        let cancel = CooperativeCancellationToken::new();
        cancel.cancel();
        let mut events = Vec::new();

        let outcome = drive(stream::iter(chunks), &cancel, |event| events.push(event))
            .await
            .expect("abort is not an error");

        assert_eq!(outcome, DriveOutcome::Aborted);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn transport_errors_surface_as_decode_errors() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"event: delta\ndata: {\"text\":\"a\"}\n\n".to_vec()),
            Err("connection reset".to_string()),
        ];
        let cancel = CooperativeCancellationToken::new();
        let mut events = Vec::new();

        let error = drive(stream::iter(chunks), &cancel, |event| events.push(event))
            .await
            .expect_err("transport failure should error");

        assert!(error.to_string().contains("connection reset"));
        assert_eq!(
            events,
            vec![StreamEvent::Delta {
                text: "a".to_string()
            }]
        );
    }
}
