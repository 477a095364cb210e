//! In-process stand-ins for the external collaborators, for tests in this
//! crate and in dependents (enable the `test-utils` feature).

use crate::embeddings::CharacterNgramEmbedder;
use crate::error::{IngestError, ProviderError};
use crate::extractor::{PageText, PdfExtractor};
use crate::pipeline::PipelineBuilder;
use crate::traits::Answerer;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct Observation {
    path: Option<PathBuf>,
    existed: bool,
    bytes: Vec<u8>,
    thread: Option<ThreadId>,
}

fn observe(slot: &Mutex<Observation>, path: &Path) {
    let mut observation = slot.lock().expect("observation lock poisoned");
    observation.path = Some(path.to_path_buf());
    observation.existed = path.exists();
    observation.bytes = std::fs::read(path).unwrap_or_default();
    observation.thread = Some(thread::current().id());
}

/// Returns fixed pages and remembers the file it was pointed at.
#[derive(Debug, Default)]
pub struct RecordingExtractor {
    pages: Vec<PageText>,
    observation: Mutex<Observation>,
}

impl RecordingExtractor {
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: pages
                .iter()
                .enumerate()
                .map(|(index, text)| PageText {
                    number: index as u32 + 1,
                    text: text.to_string(),
                })
                .collect(),
            observation: Mutex::default(),
        }
    }

    pub fn seen_path(&self) -> Option<PathBuf> {
        self.observation.lock().ok()?.path.clone()
    }

    pub fn file_existed(&self) -> bool {
        self.observation
            .lock()
            .map(|observation| observation.existed)
            .unwrap_or(false)
    }

    /// Thread the extraction ran on.
    pub fn seen_thread(&self) -> Option<ThreadId> {
        self.observation.lock().ok()?.thread
    }

    pub fn seen_bytes(&self) -> Vec<u8> {
        self.observation
            .lock()
            .map(|observation| observation.bytes.clone())
            .unwrap_or_default()
    }
}

impl PdfExtractor for RecordingExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        observe(&self.observation, path);
        Ok(self.pages.clone())
    }
}

#[derive(Debug, Default)]
pub struct FailingExtractor {
    observation: Mutex<Observation>,
}

impl FailingExtractor {
    pub fn seen_path(&self) -> Option<PathBuf> {
        self.observation.lock().ok()?.path.clone()
    }
}

impl PdfExtractor for FailingExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        observe(&self.observation, path);
        Err(IngestError::PdfParse("invalid cross-reference table".to_string()))
    }
}

/// Answers with the rendered prompt itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoAnswerer;

#[async_trait]
impl Answerer for EchoAnswerer {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn answer(&self, prompt: &str) -> Result<String, ProviderError> {
        Ok(prompt.to_string())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FailingAnswerer;

#[async_trait]
impl Answerer for FailingAnswerer {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn answer(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Request("rate limit exceeded".to_string()))
    }
}

/// Offline builder: fixed pages, trigram embeddings, echoing answerer.
pub fn builder_with_pages(pages: &[&str]) -> PipelineBuilder {
    PipelineBuilder::new(
        Arc::new(RecordingExtractor::with_pages(pages)),
        Arc::new(CharacterNgramEmbedder::default()),
        Some(Arc::new(EchoAnswerer)),
    )
}

/// HTTP client that never routes loopback traffic through a proxy.
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("plain client should build")
}

/// One-shot HTTP/1.1 server on loopback. Answers the first request with
/// `status` and a JSON `body`; the handle resolves to the raw request text.
pub async fn serve_once(
    status: u16,
    body: &str,
) -> std::io::Result<(String, JoinHandle<String>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}/", listener.local_addr()?);
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return String::new();
        };
        let request = read_request(&mut stream).await.unwrap_or_default();
        let response = format!(
            "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
        request
    });

    Ok((base_url, handle))
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let Some(head_end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buffer[..head_end]).to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buffer.len() >= head_end + 4 + content_length {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
