//! HTTP multipart client for the classification service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::{Classifier, ClassifierError};
use crate::audio::WavPayload;

/// Multipart field carrying the audio
const FILE_FIELD: &str = "file";
const FILE_NAME: &str = "audio.wav";
const MIME_WAV: &str = "audio/wav";

/// Posts WAV payloads to a prediction endpoint
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, payload: WavPayload) -> Result<String, ClassifierError> {
        let bytes = payload.into_bytes();
        debug!(endpoint = %self.endpoint, bytes = bytes.len(), "sending audio for classification");

        let part = Part::bytes(bytes)
            .file_name(FILE_NAME)
            .mime_str(MIME_WAV)?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%body, "classification response received");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::{self, AudioSampleBuffer};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn payload() -> WavPayload {
        let mut buffer = AudioSampleBuffer::new(1, 16_000);
        buffer.extend_from_slice(&[0.0, 0.25, -0.25]);
        wav::encode(&buffer)
    }

    /// Serve one HTTP request with a canned response, returning the request
    async fn serve_once(listener: TcpListener, status_line: &str, body: &str) -> String {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        // The multipart body ends with the closing boundary "--\r\n"
        while !request.ends_with(b"--\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    }

    #[tokio::test]
    async fn test_classify_uploads_multipart_wav() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(listener, "HTTP/1.1 200 OK", r#"{"command":"vola"}"#));

        let classifier =
            HttpClassifier::new(format!("http://{}/predict", addr), Duration::from_secs(5)).unwrap();
        let body = classifier.classify(payload()).await.unwrap();
        assert_eq!(body, r#"{"command":"vola"}"#);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /predict"));
        assert!(request.contains(r#"name="file""#));
        assert!(request.contains(r#"filename="audio.wav""#));
        assert!(request.contains("audio/wav"));
        assert!(request.contains("RIFF"));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(
            listener,
            "HTTP/1.1 500 Internal Server Error",
            r#"{"error":"model crashed"}"#,
        ));

        let classifier =
            HttpClassifier::new(format!("http://{}/predict", addr), Duration::from_secs(5)).unwrap();
        let result = classifier.classify(payload()).await;
        assert!(matches!(result, Err(ClassifierError::Status { status: 500, .. })));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let classifier =
            HttpClassifier::new(format!("http://{}/predict", addr), Duration::from_secs(5)).unwrap();
        let result = classifier.classify(payload()).await;
        assert!(matches!(result, Err(ClassifierError::Transport(_))));
    }
}
