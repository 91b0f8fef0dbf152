use reqwest::header::{CONTENT_TYPE, ETAG};
use reqwest::Method;
use tracing::info;

use super::types::{FinishUploadRequest, FinishUploadResponse, UploadRequest, UploadTicket};
use super::ViduClient;
use crate::codec::PngSource;
use crate::error::{ViduError, ViduResult};

const UPLOAD_SCENE: &str = "vidu";

impl ViduClient {
    /// Three-step upload: request a pre-signed URL, PUT the PNG bytes, then
    /// confirm with the returned ETag. Any failure abandons the session; the
    /// caller restarts from step 1.
    pub async fn upload_image<I>(&self, image: &I) -> ViduResult<String>
    where
        I: PngSource + ?Sized,
    {
        // Encode first so a bad input never opens an upload session.
        let png = image.to_png()?;

        info!("upload step 1/3: requesting upload permission");
        let ticket: UploadTicket = self
            .request(
                Method::POST,
                "/tools/v2/files/uploads",
                Some(&UploadRequest {
                    scene: UPLOAD_SCENE,
                }),
            )
            .await?;
        let put_url = ticket
            .put_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ViduError::upload("upload permission response has no put_url"))?;
        let resource_id = ticket
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ViduError::upload("upload permission response has no id"))?;

        info!(resource_id = %resource_id, bytes = png.len(), "upload step 2/3: uploading image data");
        let etag = self.put_object(&put_url, png).await?;

        info!(resource_id = %resource_id, etag = %etag, "upload step 3/3: finishing upload");
        let finish_endpoint = format!("/tools/v2/files/uploads/{resource_id}/finish");
        let finished: FinishUploadResponse = self
            .request(
                Method::PUT,
                &finish_endpoint,
                Some(&FinishUploadRequest { etag: &etag }),
            )
            .await?;

        let uri = finished
            .uri
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ViduError::upload("finish response has no uri"))?;
        info!(resource_id = %resource_id, uri = %uri, "image uploaded");
        Ok(uri)
    }

    /// Raw PUT to the storage endpoint. No API credentials are sent; the
    /// pre-signed URL carries its own authorization.
    async fn put_object(&self, put_url: &str, png: Vec<u8>) -> ViduResult<String> {
        let resp = self
            .http()
            .put(put_url)
            .header(CONTENT_TYPE, "image/png")
            .body(png)
            .send()
            .await
            .map_err(|e| ViduError::upload(format!("PUT to storage failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ViduError::upload(format!(
                "storage rejected upload (status {}): {body}",
                status.as_u16()
            )));
        }

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().trim_matches('"').to_string())
            .unwrap_or_default();
        if etag.is_empty() {
            return Err(ViduError::upload("storage response has no ETag header"));
        }
        Ok(etag)
    }
}
