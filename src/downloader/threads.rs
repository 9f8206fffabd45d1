#[cfg(feature = "verification")]
use crate::downloader::verify::Checksum;

use crate::{downloader::Credentials, error::DownloadError};
use reqwest::{header::RANGE, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use std::cmp::min;
use tokio::{
    fs::File,
    io::{AsyncSeekExt, AsyncWriteExt, SeekFrom},
};

/// The byte ranges of one remote file, fetched concurrently and held in memory
/// until they are verified and written out.
pub(crate) struct Chunks {
    chunks: Vec<Chunk>,
    split: bool,
}

impl Chunks {
    /// Splits `length` bytes into `parts` contiguous ranges. With a single part
    /// the file is fetched with a plain request, no `Range` header.
    pub(crate) fn new(parts: u8, length: u64) -> Self {
        let parts = parts.max(1) as u64;
        let size = length.div_ceil(parts).max(1);
        let chunks = (0..parts)
            .map(|part| size * part)
            .take_while(|begin| *begin < length || (*begin == 0 && length == 0))
            .map(|begin| {
                let end = min(begin + size, length);
                log::debug!("Chunk: {begin}-{end} of {length}");
                Chunk { buf: Vec::new(), begin, end }
            })
            .collect::<Vec<Chunk>>();
        Self { split: chunks.len() > 1, chunks }
    }
    pub(crate) fn len(&self) -> usize {
        self.chunks.len()
    }
    pub(crate) async fn download(
        &mut self,
        client: &ClientWithMiddleware,
        url: &Url,
        credentials: Option<&Credentials>,
        #[cfg(feature = "render_progress")] progress: Option<indicatif::ProgressBar>,
    ) -> Result<(), DownloadError> {
        let split = self.split;
        let futures = self.chunks.iter_mut().map(|chunk| {
            chunk.download(
                client,
                url,
                credentials,
                split,
                #[cfg(feature = "render_progress")]
                progress.clone(),
            )
        });
        futures::future::join_all(futures)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, DownloadError>>()?;
        #[cfg(feature = "render_progress")]
        if let Some(progress) = progress {
            progress.finish();
        }
        self.chunks.sort_by_key(|chunk| chunk.begin);
        Ok(())
    }
    pub(crate) async fn save(self, mut output: File) -> Result<(), DownloadError> {
        for chunk in self.chunks {
            chunk.save(&mut output).await?;
        }
        output.flush().await?;
        output.sync_all().await?;
        Ok(())
    }
    #[cfg(feature = "verification")]
    pub(crate) fn verify(&self, mut checksum: Checksum) -> Result<(), DownloadError> {
        self.chunks.iter().for_each(|chunk| checksum.update(&chunk.buf));
        checksum.verify().map_err(|_| DownloadError::InvalidChecksum)
    }
}

struct Chunk {
    buf: Vec<u8>,
    begin: u64,
    end: u64,
}

impl Chunk {
    async fn download(
        &mut self,
        client: &ClientWithMiddleware,
        url: &Url,
        credentials: Option<&Credentials>,
        ranged: bool,
        #[cfg(feature = "render_progress")] progress: Option<indicatif::ProgressBar>,
    ) -> Result<(), DownloadError> {
        let mut request = client.get(url.clone());
        if ranged {
            request = request.header(RANGE, format!("bytes={}-{}", self.begin, self.end - 1));
        }
        if let Some(credentials) = credentials {
            request = credentials.apply(request);
        }
        let response = request.send().await?;
        let status = response.status();
        let accepted = if ranged {
            status == StatusCode::PARTIAL_CONTENT
        } else {
            status.is_success()
        };
        if !accepted {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let mut stream = response.bytes_stream();
        while let Some(bytes) = futures::StreamExt::next(&mut stream).await.transpose()? {
            self.buf.extend_from_slice(&bytes);
            #[cfg(feature = "render_progress")]
            if let Some(ref progress) = progress {
                progress.inc(bytes.len() as u64);
            }
        }
        let expected = self.end - self.begin;
        if ranged && self.buf.len() as u64 != expected {
            log::debug!("Chunk {}-{} returned {} bytes, expected {expected}", self.begin, self.end, self.buf.len());
            return Err(DownloadError::ContentLength);
        }
        Ok(())
    }
    async fn save(self, output: &mut File) -> Result<(), DownloadError> {
        output.seek(SeekFrom::Start(self.begin)).await?;
        output.write_all(self.buf.as_slice()).await?;
        log::debug!("Wrote {} bytes at {}", self.buf.len(), self.begin);
        Ok(())
    }
}
