use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::upload::PDF_MIME;

/// Body of a successful `/upload/pdf` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReply {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of a successful `/chat/query` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryReply {
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// The two calls the client makes against the document backend.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn upload_pdf(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadReply, ApiError>;

    async fn query(&self, query: &str) -> Result<QueryReply, ApiError>;
}

#[derive(Clone)]
pub struct HttpDocumentApi {
    client: Client,
    base_url: String,
}

impl HttpDocumentApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DocumentApi for HttpDocumentApi {
    async fn upload_pdf(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadReply, ApiError> {
        let url = format!("{}/upload/pdf", self.base_url);
        log::debug!("POST {} ({} bytes, {})", url, bytes.len(), file_name);

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)?;
        let form = Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        Ok(body_or_default(response).await?)
    }

    async fn query(&self, query: &str) -> Result<QueryReply, ApiError> {
        let url = format!("{}/chat/query", self.base_url);
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&QueryRequest { query })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        Ok(body_or_default(response).await?)
    }
}

/// A 2xx body that isn't the expected JSON object reads as an empty one.
async fn body_or_default<T>(response: Response) -> Result<T, reqwest::Error>
where
    T: for<'de> Deserialize<'de> + Default,
{
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes).unwrap_or_default())
}

async fn error_from(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let detail = match response.bytes().await {
        Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|body| body.detail)
            .and_then(|value| match value {
                serde_json::Value::String(text) if !text.is_empty() => Some(text),
                _ => None,
            }),
        Err(_) => None,
    };
    ApiError::Status { status, detail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one canned HTTP response and hand back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }

            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (format!("http://{}", addr), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let headers = text[..header_end].to_ascii_lowercase();
        let body_len = raw.len() - (header_end + 4);

        if let Some(line) = headers.lines().find(|l| l.starts_with("content-length:")) {
            let expected: usize = line["content-length:".len()..].trim().parse().unwrap_or(0);
            return body_len >= expected;
        }
        if headers.contains("transfer-encoding: chunked") {
            return text.ends_with("0\r\n\r\n");
        }
        true
    }

    #[tokio::test]
    async fn test_query_posts_json_and_reads_response() {
        let (base, server) = serve_once("200 OK", r#"{"response":"It covers..."}"#).await;
        let api = HttpDocumentApi::new(&base);

        let reply = api.query("What is the summary?").await.unwrap();
        assert_eq!(reply.response.as_deref(), Some("It covers..."));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /chat/query"));
        assert!(request.contains(r#"{"query":"What is the summary?"}"#));
    }

    #[tokio::test]
    async fn test_query_error_carries_detail() {
        let (base, _server) = serve_once("400 Bad Request", r#"{"detail":"index not found"}"#).await;
        let api = HttpDocumentApi::new(&base);

        let err = api.query("anything").await.unwrap_err();
        match &err {
            ApiError::Status { status, .. } => assert_eq!(*status, 400),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.detail().as_deref(), Some("index not found"));
    }

    #[tokio::test]
    async fn test_error_without_string_detail_has_none() {
        let (base, _server) = serve_once("422 Unprocessable Entity", r#"{"detail":[{"msg":"field required"}]}"#).await;
        let api = HttpDocumentApi::new(&base);

        let err = api.query("anything").await.unwrap_err();
        assert_eq!(err.detail(), None);
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_file_field() {
        let (base, server) = serve_once("200 OK", r#"{"message":"Indexed 12 pages"}"#).await;
        let api = HttpDocumentApi::new(&format!("{}///", base));

        let reply = api.upload_pdf("report.pdf", b"%PDF-1.4 test".to_vec()).await.unwrap();
        assert_eq!(reply.message.as_deref(), Some("Indexed 12 pages"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /upload/pdf"));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains(r#"name="file""#));
        assert!(request.contains(r#"filename="report.pdf""#));
        assert!(request.contains("application/pdf"));
    }

    #[tokio::test]
    async fn test_non_json_success_body_reads_as_empty() {
        let (base, _server) = serve_once("200 OK", "ok").await;
        let api = HttpDocumentApi::new(&base);

        let reply = api.query("anything").await.unwrap();
        assert_eq!(reply, QueryReply::default());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = HttpDocumentApi::new(&format!("http://{}", addr));
        let err = api.query("anything").await.unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
        assert_eq!(err.detail(), None);
    }
}
