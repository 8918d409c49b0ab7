//! Sequential chunk upload to the `upload_url` handed out by a FILE_UPLOAD init.
//!
//! Chunks go strictly in order, one PUT each. The first failure ends the
//! session: TikTok's upload offset is never re-queried, so there is no resume.

use super::chunk::ChunkRange;
use super::error::UploadError;
use super::publish::PublishSession;
use bytes::Bytes;
use log::{debug, error, info};

pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, Clone)]
pub struct ChunkUploader {
    client: reqwest::Client,
}

impl ChunkUploader {
    /// Expects the long-timeout upload client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Uploads every planned chunk of `video` to the session's `upload_url`,
    /// advancing `uploaded_chunks` after each accepted PUT.
    pub async fn upload_all(
        &self,
        session: &mut PublishSession,
        video: &Bytes,
    ) -> Result<(), UploadError> {
        let upload_url = session
            .upload_url
            .clone()
            .ok_or(UploadError::MissingUploadUrl)?;
        let plan = session.plan();

        if video.len() as u64 != plan.total_bytes {
            return Err(UploadError::SizeMismatch {
                expected: plan.total_bytes,
                actual: video.len() as u64,
            });
        }

        let mut uploaded_bytes = 0u64;
        for range in plan.ranges() {
            self.upload_chunk(&upload_url, video, range, plan.total_bytes, uploaded_bytes)
                .await?;
            uploaded_bytes += range.len();
            session.uploaded_chunks = range.index + 1;
            debug!(
                "Chunk {}/{} uploaded for {}",
                session.uploaded_chunks, plan.total_chunks, session.publish_id
            );
        }

        info!(
            "All {} chunk(s) uploaded for {} ({} bytes)",
            plan.total_chunks, session.publish_id, plan.total_bytes
        );
        Ok(())
    }

    async fn upload_chunk(
        &self,
        upload_url: &str,
        video: &Bytes,
        range: ChunkRange,
        total_bytes: u64,
        uploaded_bytes: u64,
    ) -> Result<(), UploadError> {
        let chunk = video.slice(range.start as usize..=range.end as usize);

        let response = self
            .client
            .put(upload_url)
            .header("Content-Type", VIDEO_CONTENT_TYPE)
            .header("Content-Length", chunk.len().to_string())
            .header("Content-Range", range.content_range(total_bytes))
            .body(chunk)
            .send()
            .await
            .map_err(|e| UploadError::Network {
                chunk_index: range.index,
                message: e.to_string(),
                uploaded_bytes,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "Chunk {} ({}) rejected with HTTP {}: {}",
                range.index,
                range.content_range(total_bytes),
                status,
                body
            );
            return Err(UploadError::Rejected {
                chunk_index: range.index,
                status: status.as_u16(),
                body,
                uploaded_bytes,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::tiktok::chunk;
    use crate::channels::tiktok::types::PublishMode;
    use crate::tests::test_util::setup;
    use crate::assert_err;

    fn session(upload_url: Option<String>, video_size: u64) -> PublishSession {
        let plan = chunk::plan(video_size).unwrap();
        PublishSession {
            publish_id: "v_pub_test".to_string(),
            upload_url,
            mode: PublishMode::FileUploadDirect,
            video_size,
            chunk_size: plan.chunk_size,
            total_chunks: plan.total_chunks,
            uploaded_chunks: 0,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_size_mismatch_sends_nothing() {
        setup();
        let mut server = mockito::Server::new_async().await;
        let put = server
            .mock("PUT", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut session = session(Some(format!("{}/upload/v_pub_test", server.url())), 4096);
        let video = Bytes::from(vec![9u8; 1024]);
        let err = assert_err!(
            ChunkUploader::new(reqwest::Client::new())
                .upload_all(&mut session, &video)
                .await
        );

        assert_eq!(
            err,
            UploadError::SizeMismatch {
                expected: 4096,
                actual: 1024
            }
        );
        assert_eq!(session.uploaded_chunks, 0);
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_upload_url_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let put = server
            .mock("PUT", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut session = session(None, 1024);
        let video = Bytes::from(vec![9u8; 1024]);
        let err = assert_err!(
            ChunkUploader::new(reqwest::Client::new())
                .upload_all(&mut session, &video)
                .await
        );

        assert_eq!(err, UploadError::MissingUploadUrl);
        assert_eq!(session.uploaded_chunks, 0);
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_single_chunk_advances_progress() {
        let mut server = mockito::Server::new_async().await;
        let put = server
            .mock("PUT", "/upload/v_pub_test")
            .match_header("content-length", "1024")
            .match_header("content-range", "bytes 0-1023/1024")
            .with_status(201)
            .expect(1)
            .create_async()
            .await;

        let mut session = session(Some(format!("{}/upload/v_pub_test", server.url())), 1024);
        let video = Bytes::from(vec![9u8; 1024]);
        ChunkUploader::new(reqwest::Client::new())
            .upload_all(&mut session, &video)
            .await
            .unwrap();

        assert!(session.is_fully_uploaded());
        put.assert_async().await;
    }
}
