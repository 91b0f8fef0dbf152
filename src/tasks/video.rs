//! Text, image, reference and start/end-frame video nodes.

use tracing::info;

use super::{
    check_model, generate, non_blank, upload_all, Artifact, Node, OutputOptions, RunContext,
    IMG2VIDEO_MODELS, MAX_REFERENCE_IMAGES, REFERENCE2VIDEO_MODELS, START_END2VIDEO_MODELS,
    TEXT2VIDEO_MODELS,
};
use crate::codec::ImageInput;
use crate::error::{ViduError, ViduResult};
use crate::vidu::types::{
    AspectRatio, Model, MovementAmplitude, Resolution, Style, TaskEndpoint, VideoDuration,
    VideoTaskRequest,
};

// ---------------------------------------------------------------------------
// Text to video
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Text2VideoParams {
    pub prompt: String,
    pub model: Model,
    pub style: Style,
    pub duration: VideoDuration,
    pub resolution: Resolution,
    pub aspect_ratio: AspectRatio,
    pub seed: u64,
    pub movement_amplitude: MovementAmplitude,
    pub output: OutputOptions,
}

impl Default for Text2VideoParams {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model: Model::Vidu1_5,
            style: Style::General,
            duration: VideoDuration::default(),
            resolution: Resolution::R720p,
            aspect_ratio: AspectRatio::Landscape,
            seed: 0,
            movement_amplitude: MovementAmplitude::Auto,
            output: OutputOptions::default(),
        }
    }
}

impl Text2VideoParams {
    pub fn validate(&self) -> ViduResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(ViduError::validation("prompt must not be empty"));
        }
        check_model(Node::Text2Video, self.model, TEXT2VIDEO_MODELS)
    }
}

pub async fn text2video(ctx: &RunContext, params: Text2VideoParams) -> ViduResult<Artifact> {
    params.validate()?;
    info!(node = "text2video", model = %params.model, style = %params.style, "starting text-to-video task");

    let req = VideoTaskRequest {
        model: Some(params.model),
        style: Some(params.style),
        prompt: Some(params.prompt),
        duration: Some(params.duration),
        seed: Some(params.seed),
        aspect_ratio: Some(params.aspect_ratio),
        resolution: Some(params.resolution),
        movement_amplitude: Some(params.movement_amplitude),
        ..Default::default()
    };
    generate(ctx, Node::Text2Video, TaskEndpoint::Text2Video, &req, &params.output).await
}

// ---------------------------------------------------------------------------
// Image to video
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Img2VideoParams {
    pub image: ImageInput,
    pub prompt: String,
    pub model: Model,
    pub duration: VideoDuration,
    pub resolution: Resolution,
    pub seed: u64,
    pub movement_amplitude: MovementAmplitude,
    pub output: OutputOptions,
}

impl Img2VideoParams {
    pub fn new(image: ImageInput) -> Self {
        Self {
            image,
            prompt: String::new(),
            model: Model::Vidu2_0,
            duration: VideoDuration::default(),
            resolution: Resolution::R720p,
            seed: 0,
            movement_amplitude: MovementAmplitude::Auto,
            output: OutputOptions::default(),
        }
    }

    pub fn validate(&self) -> ViduResult<()> {
        check_model(Node::Img2Video, self.model, IMG2VIDEO_MODELS)
    }
}

pub async fn img2video(ctx: &RunContext, params: Img2VideoParams) -> ViduResult<Artifact> {
    params.validate()?;
    info!(node = "img2video", model = %params.model, "starting image-to-video task");

    let images = upload_all(ctx, &[&params.image]).await?;
    let req = VideoTaskRequest {
        model: Some(params.model),
        images: Some(images),
        prompt: non_blank(&params.prompt),
        duration: Some(params.duration),
        seed: Some(params.seed),
        resolution: Some(params.resolution),
        movement_amplitude: Some(params.movement_amplitude),
        ..Default::default()
    };
    generate(ctx, Node::Img2Video, TaskEndpoint::Img2Video, &req, &params.output).await
}

// ---------------------------------------------------------------------------
// Reference to video
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Reference2VideoParams {
    /// 1 to 7 reference images, uploaded in order.
    pub images: Vec<ImageInput>,
    pub prompt: String,
    pub model: Model,
    pub duration: VideoDuration,
    pub resolution: Resolution,
    pub aspect_ratio: AspectRatio,
    pub seed: u64,
    pub movement_amplitude: MovementAmplitude,
    pub output: OutputOptions,
}

impl Default for Reference2VideoParams {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            prompt: String::new(),
            model: Model::Vidu2_0,
            duration: VideoDuration::default(),
            resolution: Resolution::R720p,
            aspect_ratio: AspectRatio::Landscape,
            seed: 0,
            movement_amplitude: MovementAmplitude::Auto,
            output: OutputOptions::default(),
        }
    }
}

impl Reference2VideoParams {
    pub fn validate(&self) -> ViduResult<()> {
        if self.images.is_empty() {
            return Err(ViduError::validation("at least one reference image is required"));
        }
        if self.images.len() > MAX_REFERENCE_IMAGES {
            return Err(ViduError::validation(format!(
                "at most {MAX_REFERENCE_IMAGES} reference images are allowed, got {}",
                self.images.len()
            )));
        }
        if self.prompt.trim().is_empty() {
            return Err(ViduError::validation("prompt must not be empty"));
        }
        check_model(Node::Reference2Video, self.model, REFERENCE2VIDEO_MODELS)
    }
}

pub async fn reference2video(ctx: &RunContext, params: Reference2VideoParams) -> ViduResult<Artifact> {
    params.validate()?;
    info!(
        node = "reference2video",
        model = %params.model,
        images = params.images.len(),
        "starting reference-to-video task"
    );

    let refs: Vec<&ImageInput> = params.images.iter().collect();
    let images = upload_all(ctx, &refs).await?;
    let req = VideoTaskRequest {
        model: Some(params.model),
        images: Some(images),
        prompt: Some(params.prompt),
        duration: Some(params.duration),
        seed: Some(params.seed),
        aspect_ratio: Some(params.aspect_ratio),
        resolution: Some(params.resolution),
        movement_amplitude: Some(params.movement_amplitude),
        ..Default::default()
    };
    generate(ctx, Node::Reference2Video, TaskEndpoint::Reference2Video, &req, &params.output).await
}

// ---------------------------------------------------------------------------
// Start / end frame to video
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StartEnd2VideoParams {
    pub start_frame: ImageInput,
    pub end_frame: ImageInput,
    /// Optional; only sent when it has visible content.
    pub prompt: String,
    pub model: Model,
    pub duration: VideoDuration,
    pub resolution: Resolution,
    pub seed: u64,
    pub movement_amplitude: MovementAmplitude,
    pub output: OutputOptions,
}

impl StartEnd2VideoParams {
    pub fn new(start_frame: ImageInput, end_frame: ImageInput) -> Self {
        Self {
            start_frame,
            end_frame,
            prompt: String::new(),
            model: Model::Vidu2_0,
            duration: VideoDuration::default(),
            resolution: Resolution::R720p,
            seed: 0,
            movement_amplitude: MovementAmplitude::Auto,
            output: OutputOptions::default(),
        }
    }

    pub fn validate(&self) -> ViduResult<()> {
        check_model(Node::StartEnd2Video, self.model, START_END2VIDEO_MODELS)
    }
}

pub async fn start_end2video(ctx: &RunContext, params: StartEnd2VideoParams) -> ViduResult<Artifact> {
    params.validate()?;
    // The API rejects frame pairs whose aspect ratios differ by more than 0.8-1.25.
    info!(node = "start_end2video", model = %params.model, "starting start/end-frame task");

    let images = upload_all(ctx, &[&params.start_frame, &params.end_frame]).await?;
    let req = VideoTaskRequest {
        model: Some(params.model),
        images: Some(images),
        prompt: non_blank(&params.prompt),
        duration: Some(params.duration),
        seed: Some(params.seed),
        resolution: Some(params.resolution),
        movement_amplitude: Some(params.movement_amplitude),
        ..Default::default()
    };
    generate(ctx, Node::StartEnd2Video, TaskEndpoint::StartEnd2Video, &req, &params.output).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::poll::PollConfig;
    use crate::vidu::ViduClient;
    use std::time::Duration;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_ctx(server: &MockServer, out: &std::path::Path) -> RunContext {
        RunContext::new(ViduClient::new(server.uri(), "k"), out).with_poll(PollConfig {
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        })
    }

    fn pixel() -> ImageInput {
        ImageInput::Rgb {
            width: 1,
            height: 1,
            pixels: vec![1, 2, 3],
        }
    }

    async fn mount_finished_task(server: &MockServer, task_id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/ent/v2/tasks/{task_id}/creations")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": task_id,
                "state": "success",
                "creations": [{
                    "id": "c1",
                    "url": format!("{}/files/v.mp4", server.uri()),
                    "cover_url": "https://x/c.jpg"
                }]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
            .mount(server)
            .await;
    }

    /// Every upload returns a fresh resource id so the URIs keep their order.
    async fn mount_uploads(server: &MockServer, ids: &[&str]) {
        for id in ids {
            Mock::given(method("POST"))
                .and(path("/tools/v2/files/uploads"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": id,
                    "put_url": format!("{}/storage/{id}", server.uri()),
                })))
                .up_to_n_times(1)
                .mount(server)
                .await;
            Mock::given(method("PUT"))
                .and(path(format!("/storage/{id}")))
                .respond_with(ResponseTemplate::new(200).insert_header("ETag", format!("\"etag-{id}\"")))
                .mount(server)
                .await;
            Mock::given(method("PUT"))
                .and(path(format!("/tools/v2/files/uploads/{id}/finish")))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "uri": format!("ssupload:?id={id}")
                })))
                .mount(server)
                .await;
        }
    }

    #[tokio::test]
    async fn text2video_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ent/v2/text2video"))
            .and(body_json(serde_json::json!({
                "model": "vidu1.5",
                "style": "general",
                "prompt": "test",
                "duration": 4,
                "seed": 0,
                "aspect_ratio": "16:9",
                "resolution": "720p",
                "movement_amplitude": "auto"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "t1"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_finished_task(&server, "t1").await;

        let out = tempfile::tempdir().unwrap();
        let ctx = test_ctx(&server, out.path());
        let params = Text2VideoParams {
            prompt: "test".into(),
            model: "vidu1.5".parse().unwrap(),
            duration: VideoDuration::try_from(4).unwrap(),
            resolution: "720p".parse().unwrap(),
            ..Default::default()
        };

        let artifact = text2video(&ctx, params).await.unwrap();
        assert!(artifact.video_path.to_string_lossy().ends_with(".mp4"));
        assert_eq!(artifact.cover_url.as_deref(), Some("https://x/c.jpg"));
        assert_eq!(artifact.task_id, "t1");
        assert_eq!(std::fs::read(&artifact.video_path).unwrap(), b"mp4-bytes");
    }

    #[tokio::test]
    async fn text2video_rejects_model_not_offered_for_text() {
        let out = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(ViduClient::new("http://127.0.0.1:9", "k"), out.path());
        let params = Text2VideoParams {
            prompt: "a fox".into(),
            model: Model::Vidu2_0,
            ..Default::default()
        };
        let err = text2video(&ctx, params).await.unwrap_err();
        assert!(matches!(err, ViduError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn reference2video_rejects_empty_slots_before_network() {
        let out = tempfile::tempdir().unwrap();
        // Unroutable: any network call would surface as Network, not Validation.
        let ctx = RunContext::new(ViduClient::new("http://127.0.0.1:9", "k"), out.path());
        let params = Reference2VideoParams {
            prompt: "a cute character running".into(),
            ..Default::default()
        };
        let err = reference2video(&ctx, params).await.unwrap_err();
        assert!(matches!(err, ViduError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn reference2video_rejects_more_than_seven_images() {
        let out = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(ViduClient::new("http://127.0.0.1:9", "k"), out.path());
        let params = Reference2VideoParams {
            images: vec![pixel(); 8],
            prompt: "crowd".into(),
            ..Default::default()
        };
        let err = reference2video(&ctx, params).await.unwrap_err();
        assert!(matches!(err, ViduError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn reference2video_uploads_in_order() {
        let server = MockServer::start().await;
        mount_uploads(&server, &["r1", "r2"]).await;
        Mock::given(method("POST"))
            .and(path("/ent/v2/reference2video"))
            .and(body_partial_json(serde_json::json!({
                "images": ["ssupload:?id=r1", "ssupload:?id=r2"],
                "aspect_ratio": "9:16",
                "movement_amplitude": "large"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "t2"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_finished_task(&server, "t2").await;

        let out = tempfile::tempdir().unwrap();
        let params = Reference2VideoParams {
            images: vec![pixel(), pixel()],
            prompt: "two friends".into(),
            aspect_ratio: AspectRatio::Portrait,
            movement_amplitude: "大".parse().unwrap(),
            ..Default::default()
        };
        let artifact = reference2video(&test_ctx(&server, out.path()), params).await.unwrap();
        assert_eq!(artifact.task_id, "t2");
        let name = artifact.video_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Vidu_Reference2Video_"));
    }

    #[tokio::test]
    async fn start_end_omits_blank_prompt() {
        let server = MockServer::start().await;
        mount_uploads(&server, &["s1", "e1"]).await;
        Mock::given(method("POST"))
            .and(path("/ent/v2/start-end2video"))
            .and(body_json(serde_json::json!({
                "model": "viduq1-classic",
                "images": ["ssupload:?id=s1", "ssupload:?id=e1"],
                "duration": 5,
                "seed": 42,
                "resolution": "1080p",
                "movement_amplitude": "auto"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "t3"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_finished_task(&server, "t3").await;

        let out = tempfile::tempdir().unwrap();
        let mut params = StartEnd2VideoParams::new(pixel(), pixel());
        params.prompt = "   ".into();
        params.model = Model::ViduQ1Classic;
        params.duration = VideoDuration::try_from(5).unwrap();
        params.resolution = Resolution::R1080p;
        params.seed = 42;

        let artifact = start_end2video(&test_ctx(&server, out.path()), params).await.unwrap();
        assert_eq!(artifact.task_id, "t3");
    }

    #[tokio::test]
    async fn img2video_success_without_creations_is_invalid_response() {
        let server = MockServer::start().await;
        mount_uploads(&server, &["i1"]).await;
        Mock::given(method("POST"))
            .and(path("/ent/v2/img2video"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "t4"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ent/v2/tasks/t4/creations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"state": "success"})))
            .mount(&server)
            .await;

        let out = tempfile::tempdir().unwrap();
        let mut params = Img2VideoParams::new(pixel());
        params.prompt = "the astronaut waves".into();
        let err = img2video(&test_ctx(&server, out.path()), params).await.unwrap_err();
        assert!(matches!(err, ViduError::InvalidResponse(_)), "got {err:?}");
    }
}
