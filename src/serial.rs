use crate::error::{ClientError, SerialError};
use crate::types::UploadReceipt;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_LOG_FILE: &str = "datalog.txt";
const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Command asking the logger to dump `file`
pub fn read_command(file: &str) -> String {
    format!("READ:{}\n", file)
}

/// Destination for decoded log chunks
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, data: &str) -> Result<UploadReceipt, ClientError>;
}

/// Byte stream to the logging device
pub struct SerialLink<R, W> {
    reader: R,
    writer: W,
    chunk_size: usize,
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,
}

impl<R, W> SerialLink<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        SerialLink {
            reader,
            writer,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pending: Vec::new(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(4);
        self
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    pub async fn write_command(&mut self, command: &str) -> Result<(), SerialError> {
        self.writer.write_all(command.as_bytes()).await?;
        self.writer.flush().await?;
        log::debug!("Sent command {:?}", command.trim_end());
        Ok(())
    }

    /// Next decoded text chunk, `None` once the stream ends
    pub async fn next_chunk(&mut self) -> Result<Option<String>, SerialError> {
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = self.reader.read(&mut buf).await?;
            if n == 0 {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                let tail = std::mem::take(&mut self.pending);
                return Ok(Some(String::from_utf8_lossy(&tail).into_owned()));
            }

            let text = self.decode(&buf[..n]);
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }

    fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut text = String::new();
        let mut rest = input.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        text
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PumpReport {
    pub chunks: usize,
    pub uploaded: usize,
    pub failed: usize,
    /// Points stored across all successful uploads
    pub points: usize,
}

/// Forward every chunk from `link` to `uploader`, one upload per chunk
pub async fn pump<R, W, U>(
    link: &mut SerialLink<R, W>,
    uploader: &U,
) -> Result<PumpReport, SerialError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    U: Uploader + ?Sized,
{
    let mut report = PumpReport::default();

    while let Some(chunk) = link.next_chunk().await? {
        report.chunks += 1;
        log::debug!("Received chunk of {} bytes", chunk.len());

        match uploader.upload(&chunk).await {
            Ok(receipt) => {
                report.uploaded += 1;
                report.points += receipt.stored;
                log::info!(
                    "Uploaded chunk {} as route {} ({} stored, {} discarded)",
                    report.chunks,
                    receipt.id,
                    receipt.stored,
                    receipt.discarded
                );
            }
            Err(e) => {
                report.failed += 1;
                log::error!("Upload of chunk {} failed: {}", report.chunks, e);
            }
        }
    }

    Ok(report)
}
