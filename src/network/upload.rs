use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::{EventSender, NetEvent};
use crate::model::{decode_upload_body, PacketRecord};
use crate::state::UploadTicket;

/// Multipart field the server reads the capture from.
pub const UPLOAD_FIELD: &str = "pcapfile";

const BODY_EXCERPT: usize = 200;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server rejected the upload ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("server response is not a packet list: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Sends `path` to the upload endpoint and returns the parsed packets.
///
/// The file is not inspected here: any extension or content is forwarded
/// and the server decides whether it is a capture.
pub async fn upload_capture(
    client: &reqwest::Client,
    endpoint: &Url,
    path: &Path,
) -> Result<Vec<PacketRecord>, UploadError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "capture.pcap".to_string());
    debug!(file = %path.display(), size = bytes.len(), "uploading capture");

    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("application/octet-stream")?;
    let form = Form::new().part(UPLOAD_FIELD, part);

    let response = client.post(endpoint.clone()).multipart(form).send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        return Err(UploadError::Status {
            status: status.as_u16(),
            body: excerpt(text.trim()),
        });
    }

    let records = decode_upload_body(&body)?;
    info!(file = %path.display(), count = records.len(), "capture parsed by server");
    Ok(records)
}

/// Runs [`upload_capture`] on a task and reports the result under `ticket`.
pub fn spawn_upload(
    client: reqwest::Client,
    endpoint: Url,
    file: PathBuf,
    ticket: UploadTicket,
    events: EventSender,
) {
    tokio::spawn(async move {
        let result = upload_capture(&client, &endpoint, &file).await;
        let _ = events.send(NetEvent::Upload {
            ticket,
            file,
            result,
        });
    });
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(BODY_EXCERPT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
