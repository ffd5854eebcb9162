use crate::router;
use crate::subsystems::pipeline::AppState;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use moodwell_core::ipc::{MoodwellRequest, MoodwellResponse};
use std::path::Path;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

/// 4-byte little-endian length prefix, MessagePack payload.
fn le_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder().little_endian().new_codec()
}

pub async fn run_unix_server(
    socket_path: &str,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)?;
    tracing::info!("IPC Server listening on {}", socket_path);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, _) = res?;
                let state = state.clone();
                tokio::spawn(async move {
                    serve_connection(stream, state).await;
                });
            }
            _ = shutdown.recv() => {
                tracing::info!("Shutting down IPC server...");
                break;
            }
        }
    }

    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    Ok(())
}

async fn serve_connection(stream: UnixStream, state: Arc<AppState>) {
    let (read, write) = stream.into_split();
    let mut framed_read = FramedRead::new(read, le_codec());
    let mut framed_write = FramedWrite::new(write, le_codec());

    while let Some(frame) = framed_read.next().await {
        let bytes_mut = match frame {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("Frame error: {}", e);
                break;
            }
        };

        let response = match rmp_serde::from_slice::<MoodwellRequest>(&bytes_mut) {
            Ok(request) => router::handle_request(request, &state).await,
            Err(e) => MoodwellResponse::err(
                "invalid_input",
                format!("Deserialization error: {}", e),
            ),
        };

        match rmp_serde::to_vec_named(&response) {
            Ok(resp_bytes) => {
                if let Err(e) = framed_write.send(Bytes::from(resp_bytes)).await {
                    tracing::error!("Failed to send response: {}", e);
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodwell_core::MoodwellConfig;
    use std::time::Duration;

    async fn roundtrip(
        socket_path: &str,
        frames: Vec<Vec<u8>>,
    ) -> Vec<MoodwellResponse> {
        let stream = UnixStream::connect(socket_path).await.unwrap();
        let (read, write) = stream.into_split();
        let mut reader = FramedRead::new(read, le_codec());
        let mut writer = FramedWrite::new(write, le_codec());

        let mut responses = Vec::new();
        for frame in frames {
            writer.send(Bytes::from(frame)).await.unwrap();
            let bytes = reader.next().await.unwrap().unwrap();
            responses.push(rmp_serde::from_slice(&bytes).unwrap());
        }
        responses
    }

    async fn wait_for_socket(path: &str) {
        for _ in 0..50 {
            if Path::new(path).exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("socket {} never appeared", path);
    }

    #[tokio::test]
    async fn test_ipc_ping_and_send_message() {
        let socket_path = std::env::temp_dir()
            .join(format!("moodwell-test-{}.sock", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .to_string();
        let state = Arc::new(AppState::from_config(MoodwellConfig::default()).await.unwrap());
        let (tx, _rx) = broadcast::channel(1);

        let server = {
            let path = socket_path.clone();
            let shutdown = tx.subscribe();
            tokio::spawn(async move { run_unix_server(&path, state, shutdown).await })
        };
        wait_for_socket(&socket_path).await;

        let ping = rmp_serde::to_vec_named(&MoodwellRequest::Ping).unwrap();
        let send = rmp_serde::to_vec_named(&MoodwellRequest::SendMessage {
            conversation_id: "ipc".to_string(),
            text: "I'm worried about tomorrow".to_string(),
        })
        .unwrap();
        let responses = roundtrip(&socket_path, vec![ping, send, b"not msgpack".to_vec()]).await;

        assert!(responses[0].is_ok());
        assert_eq!(responses[0].data.as_ref().unwrap()["pong"], true);
        assert!(responses[1].is_ok());
        assert_eq!(responses[1].data.as_ref().unwrap()["source"], "local");
        assert!(!responses[2].is_ok());
        assert_eq!(responses[2].kind.as_deref(), Some("invalid_input"));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert!(!Path::new(&socket_path).exists());
    }
}
