use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use common::config::JudgeServerConfig;
use common::judge::{JudgeRequest, JudgeResponse, ResourceLimit};

use crate::codec::{self, MAX_FRAME_SIZE};
use crate::error::{ClientError, CodecError};

/// Client for the judge server's length-prefixed JSON protocol.
///
/// Each call is a single atomic round trip over a fresh connection: one
/// request frame out, one response frame back, close. No retries and no
/// streaming; retry policy belongs to the caller, persistence does not
/// belong here at all.
#[derive(Debug, Clone)]
pub struct JudgeClient {
    config: JudgeServerConfig,
}

impl JudgeClient {
    pub fn new(config: JudgeServerConfig) -> Self {
        Self { config }
    }

    /// Response deadline for one call: the problem's CPU bound plus a grace
    /// margin for compile time and transfer overhead.
    pub fn response_deadline(&self, limit: &ResourceLimit) -> Duration {
        Duration::from_millis(limit.max_cpu_time.max(0) as u64 + self.config.grace_ms)
    }

    /// Perform one judge round trip.
    ///
    /// A response that arrives but cannot be decoded is substituted with a
    /// synthetic SystemError response, so `Err` here always means the
    /// transport failed: connect, I/O, or deadline. Those are the failures
    /// a caller may retry.
    #[instrument(skip(self, request), fields(task_id = %request.task_id))]
    pub async fn judge(&self, request: &JudgeRequest) -> Result<JudgeResponse, ClientError> {
        let endpoint = self.config.endpoint();
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);

        let stream = match timeout(connect_timeout, TcpStream::connect(&endpoint)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ClientError::Connect { endpoint, source }),
            Err(_) => return Err(ClientError::ConnectTimeout(endpoint)),
        };

        let deadline = self.response_deadline(&request.limit);
        match timeout(deadline, round_trip(stream, request)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Deadline(deadline)),
        }
    }
}

async fn round_trip(
    mut stream: TcpStream,
    request: &JudgeRequest,
) -> Result<JudgeResponse, ClientError> {
    let payload = serde_json::to_vec(request)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ClientError::RequestTooLarge(payload.len()));
    }

    match codec::write_frame(&mut stream, &payload).await {
        Ok(()) => {}
        Err(CodecError::Io(err)) => return Err(ClientError::Io(err)),
        // Length already checked; nothing else can fail on the write path.
        Err(err) => return Err(ClientError::Io(std::io::Error::other(err.to_string()))),
    }
    debug!(bytes = payload.len(), "judge request sent");

    match codec::read_frame(&mut stream).await {
        Ok(bytes) => match serde_json::from_slice::<JudgeResponse>(&bytes) {
            Ok(response) => {
                debug!(status = response.status, "judge response received");
                Ok(response)
            }
            Err(err) => {
                warn!(error = %err, "judge response is not valid JSON, synthesizing SystemError");
                Ok(JudgeResponse::system_error(format!(
                    "Failed to decode judge server result: {err}"
                )))
            }
        },
        // Transport faults bubble up for the caller's retry policy.
        Err(CodecError::Io(err)) => Err(ClientError::Io(err)),
        // Anything else is a malformed frame: recovered locally so the
        // submission can still reach a terminal state.
        Err(err) => {
            warn!(error = %err, "judge response frame is malformed, synthesizing SystemError");
            Ok(JudgeResponse::system_error(format!(
                "Failed to decode judge server result: {err}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SubmissionStatus;
    use common::judge::JudgeVerdict;
    use serde_json::json;
    use std::net::SocketAddr;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn client_for(addr: SocketAddr, grace_ms: u64) -> JudgeClient {
        JudgeClient::new(JudgeServerConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            connect_timeout_ms: 1000,
            grace_ms,
            ..Default::default()
        })
    }

    fn sample_request() -> JudgeRequest {
        JudgeRequest {
            task_id: "31".into(),
            case_id: "0b7cbba6-13f2-4b9a-b9b2-91a3a171c2b0".into(),
            spj_id: None,
            test_case_config: json!([{"name": "1", "score": 100}]),
            subcheck_config: None,
            lang: "cpp".into(),
            code: "#include <iostream>\nint main() {}".into(),
            limit: ResourceLimit {
                max_cpu_time: 1000,
                max_memory: 256 * 1024 * 1024,
            },
        }
    }

    /// Accept one connection, read one request frame, then run `respond`
    /// on the socket. Returns the request payload through the handle.
    async fn spawn_judge_server<F, Fut>(respond: F) -> (SocketAddr, JoinHandle<Vec<u8>>)
    where
        F: FnOnce(TcpStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = codec::read_frame(&mut stream).await.unwrap();
            respond(stream).await;
            request
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn round_trip_decodes_the_response() {
        let response = json!({
            "status": 0,
            "score": 100,
            "statistics": {"max_time": 120, "max_memory": 4096},
            "log": "",
            "detail": [{"name": "1", "status": 0}],
        });
        let frame = codec::encode_frame(&response).unwrap();
        let (addr, server) = spawn_judge_server(move |mut stream| async move {
            stream.write_all(&frame).await.unwrap();
        })
        .await;

        let client = client_for(addr, 5000);
        let got = client.judge(&sample_request()).await.unwrap();

        assert_eq!(got.status, JudgeVerdict::Accepted as i32);
        assert_eq!(got.score, 100);
        assert_eq!(got.statistics.max_time, 120);
        assert_eq!(got.detail, json!([{"name": "1", "status": 0}]));

        // The request frame the server saw is the client's exact payload.
        let sent: serde_json::Value = serde_json::from_slice(&server.await.unwrap()).unwrap();
        assert_eq!(sent["task_id"], "31");
        assert_eq!(sent["spj_id"], serde_json::Value::Null);
        assert_eq!(sent["limit"]["max_memory"], 268_435_456);
    }

    #[tokio::test]
    async fn invalid_json_response_becomes_synthetic_system_error() {
        let mut frame = (12i32).to_be_bytes().to_vec();
        frame.extend_from_slice(b"not json at ");
        let (addr, _server) = spawn_judge_server(move |mut stream| async move {
            stream.write_all(&frame).await.unwrap();
        })
        .await;

        let client = client_for(addr, 5000);
        let got = client.judge(&sample_request()).await.unwrap();

        assert_eq!(
            common::judge::map_result_code(got.status),
            SubmissionStatus::SystemError
        );
        assert_eq!(got.score, 0);
        assert_eq!(got.detail, json!([]));
        assert!(got.log.contains("decode"));
    }

    #[tokio::test]
    async fn truncated_response_becomes_synthetic_system_error() {
        let (addr, _server) = spawn_judge_server(|mut stream| async move {
            stream.write_all(&100i32.to_be_bytes()).await.unwrap();
            stream.write_all(b"partial").await.unwrap();
            // Close with most of the promised payload missing.
        })
        .await;

        let client = client_for(addr, 5000);
        let got = client.judge(&sample_request()).await.unwrap();

        assert_eq!(got.status, JudgeVerdict::SystemError as i32);
        assert_eq!(got.score, 0);
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(addr, 5000);
        match client.judge(&sample_request()).await {
            Err(ClientError::Connect { .. }) => {}
            other => panic!("expected Connect error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unresponsive_server_hits_the_deadline() {
        let (addr, _server) = spawn_judge_server(|stream| async move {
            // Hold the connection open without ever replying.
            let _held = stream;
            tokio::time::sleep(Duration::from_secs(30)).await;
        })
        .await;

        let mut request = sample_request();
        request.limit.max_cpu_time = 0;

        let client = client_for(addr, 200);
        match client.judge(&request).await {
            Err(ClientError::Deadline(d)) => assert_eq!(d, Duration::from_millis(200)),
            other => panic!("expected Deadline error, got {other:?}"),
        }
    }

    #[test]
    fn deadline_tracks_the_cpu_limit() {
        let client = client_for("127.0.0.1:18082".parse().unwrap(), 10_000);
        let limit = ResourceLimit {
            max_cpu_time: 2000,
            max_memory: 0,
        };
        assert_eq!(
            client.response_deadline(&limit),
            Duration::from_millis(12_000)
        );
    }
}
