//! Featured presets: template-driven generation via `/ent/v2/template2video`.

use serde_json::{Map, Value};
use tracing::info;

use super::{generate, upload_all, Artifact, Node, OutputOptions, RunContext};
use crate::codec::ImageInput;
use crate::error::{ViduError, ViduResult};
use crate::vidu::types::{TaskEndpoint, TemplatePreset, VideoTaskRequest};

pub const OUTFIT_SHOW_IMAGES: usize = 2;

#[derive(Debug, Clone)]
pub struct PresetParams {
    pub template: TemplatePreset,
    pub images: Vec<ImageInput>,
    pub prompt: String,
    pub bgm: bool,
    pub seed: u64,
    /// Raw JSON object merged over the payload right before submission.
    pub extra_json: String,
    pub output: OutputOptions,
}

impl Default for PresetParams {
    fn default() -> Self {
        Self {
            template: TemplatePreset::OutfitShow,
            images: Vec::new(),
            prompt: String::new(),
            bgm: true,
            seed: 0,
            extra_json: "{}".to_string(),
            output: OutputOptions::default(),
        }
    }
}

impl PresetParams {
    pub fn validate(&self) -> ViduResult<()> {
        match self.template {
            TemplatePreset::OutfitShow if self.images.len() != OUTFIT_SHOW_IMAGES => {
                Err(ViduError::validation(format!(
                    "template \"outfit_show\" needs exactly {OUTFIT_SHOW_IMAGES} images, got {}",
                    self.images.len()
                )))
            }
            TemplatePreset::OutfitShow => Ok(()),
        }
    }
}

/// Parse the extra-parameters field. Blank input means no extras.
pub fn parse_extra(raw: &str) -> ViduResult<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ViduError::validation(format!(
            "extra parameters must be a JSON object, got {other}"
        ))),
        Err(e) => Err(ViduError::validation(format!(
            "extra parameters are not valid JSON: {e}"
        ))),
    }
}

/// Serialize the typed request and let `extra` override or extend its keys.
fn merge_extra(req: &VideoTaskRequest, extra: Map<String, Value>) -> ViduResult<Value> {
    let mut payload = serde_json::to_value(req)
        .map_err(|e| ViduError::InvalidResponse(format!("failed to encode payload: {e}")))?;
    if let Value::Object(fields) = &mut payload {
        fields.extend(extra);
    }
    Ok(payload)
}

pub async fn template2video(ctx: &RunContext, params: PresetParams) -> ViduResult<Artifact> {
    params.validate()?;
    // Bad extras must fail before any upload.
    let extra = parse_extra(&params.extra_json)?;
    info!(node = "featured_preset", template = %params.template, "starting preset task");

    let refs: Vec<&ImageInput> = params.images.iter().collect();
    let images = upload_all(ctx, &refs).await?;

    let req = VideoTaskRequest {
        template: Some(params.template),
        images: Some(images),
        prompt: Some(params.prompt),
        bgm: Some(params.bgm),
        seed: Some(params.seed),
        ..Default::default()
    };
    if !extra.is_empty() {
        info!(keys = ?extra.keys().collect::<Vec<_>>(), "merging extra parameters");
    }
    let payload = merge_extra(&req, extra)?;

    generate(ctx, Node::FeaturedPreset, TaskEndpoint::Template2Video, &payload, &params.output).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::poll::PollConfig;
    use crate::vidu::ViduClient;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pixel() -> ImageInput {
        ImageInput::Rgb {
            width: 1,
            height: 1,
            pixels: vec![0, 0, 0],
        }
    }

    fn offline_ctx(out: &std::path::Path) -> RunContext {
        RunContext::new(ViduClient::new("http://127.0.0.1:9", "k"), out)
    }

    #[test]
    fn extra_parameters_must_be_an_object() {
        assert!(parse_extra("").unwrap().is_empty());
        assert!(parse_extra("  {} ").unwrap().is_empty());
        assert_eq!(parse_extra(r#"{"seed": 7}"#).unwrap()["seed"], 7);
        assert!(matches!(parse_extra("[1,2]"), Err(ViduError::Validation(_))));
        assert!(matches!(parse_extra("{oops"), Err(ViduError::Validation(_))));
    }

    #[test]
    fn extras_override_typed_fields() {
        let req = VideoTaskRequest {
            template: Some(TemplatePreset::OutfitShow),
            bgm: Some(true),
            seed: Some(0),
            ..Default::default()
        };
        let extra = parse_extra(r#"{"bgm": false, "aspect_ratio": "9:16"}"#).unwrap();
        let merged = merge_extra(&req, extra).unwrap();
        assert_eq!(merged["template"], "outfit_show");
        assert_eq!(merged["bgm"], false);
        assert_eq!(merged["aspect_ratio"], "9:16");
    }

    #[tokio::test]
    async fn outfit_show_needs_two_images() {
        let out = tempfile::tempdir().unwrap();
        let params = PresetParams {
            images: vec![pixel()],
            prompt: "runway walk".into(),
            ..Default::default()
        };
        let err = template2video(&offline_ctx(out.path()), params).await.unwrap_err();
        assert!(matches!(err, ViduError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_extras_fail_before_upload() {
        let out = tempfile::tempdir().unwrap();
        let params = PresetParams {
            images: vec![pixel(), pixel()],
            extra_json: "not json".into(),
            ..Default::default()
        };
        let err = template2video(&offline_ctx(out.path()), params).await.unwrap_err();
        assert!(matches!(err, ViduError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn submits_template_payload_with_extras() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tools/v2/files/uploads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "u",
                "put_url": format!("{}/storage/u", server.uri()),
            })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/storage/u"))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "e"))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/tools/v2/files/uploads/u/finish$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"uri": "ssupload:?id=u"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/ent/v2/template2video"))
            .and(body_json(serde_json::json!({
                "template": "outfit_show",
                "images": ["ssupload:?id=u", "ssupload:?id=u"],
                "prompt": "runway walk",
                "bgm": true,
                "seed": 9,
                "aspect_ratio": "9:16"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "p1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ent/v2/tasks/p1/creations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "state": "success",
                "creations": [{"url": format!("{}/v.mp4", server.uri())}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"v".to_vec()))
            .mount(&server)
            .await;

        let out = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(ViduClient::new(server.uri(), "k"), out.path()).with_poll(PollConfig {
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        });
        let params = PresetParams {
            images: vec![pixel(), pixel()],
            prompt: "runway walk".into(),
            seed: 9,
            extra_json: r#"{"aspect_ratio": "9:16"}"#.into(),
            ..Default::default()
        };
        let artifact = template2video(&ctx, params).await.unwrap();
        assert_eq!(artifact.task_id, "p1");
        assert_eq!(artifact.cover_url, None);
        let name = artifact.video_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Vidu_Preset_"));
    }
}
