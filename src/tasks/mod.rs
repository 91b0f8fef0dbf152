pub mod download;
pub mod poll;
pub mod preset;
pub mod recommend;
pub mod video;

use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::codec::ImageInput;
use crate::error::{ViduError, ViduResult};
use crate::vidu::types::{Model, TaskEndpoint};
use crate::vidu::ViduClient;
use poll::PollConfig;

// ---------------------------------------------------------------------------
// Valid values — single source of truth for the adapters AND the MCP tools
// ---------------------------------------------------------------------------

pub const TEXT2VIDEO_MODELS: &[Model] = &[Model::Vidu1_5, Model::ViduQ1];
pub const IMG2VIDEO_MODELS: &[Model] = &[Model::Vidu2_0, Model::Vidu1_5, Model::ViduQ1];
pub const REFERENCE2VIDEO_MODELS: &[Model] = &[Model::Vidu2_0, Model::Vidu1_5, Model::ViduQ1];
pub const START_END2VIDEO_MODELS: &[Model] = &[
    Model::Vidu2_0,
    Model::Vidu1_5,
    Model::ViduQ1,
    Model::ViduQ1Classic,
];

pub const MAX_REFERENCE_IMAGES: usize = 7;

/// The host-facing nodes. Used for log fields and default file prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Text2Video,
    Img2Video,
    Reference2Video,
    StartEnd2Video,
    FeaturedPreset,
    PromptRecommender,
}

impl Node {
    pub fn name(self) -> &'static str {
        match self {
            Node::Text2Video => "text2video",
            Node::Img2Video => "img2video",
            Node::Reference2Video => "reference2video",
            Node::StartEnd2Video => "start_end2video",
            Node::FeaturedPreset => "featured_preset",
            Node::PromptRecommender => "prompt_recommender",
        }
    }

    /// Filename prefix for nodes that save a video. The recommender saves none.
    pub fn default_prefix(self) -> Option<&'static str> {
        match self {
            Node::Text2Video => Some("Vidu_Text2Video"),
            Node::Img2Video => Some("Vidu_Image2Video"),
            Node::Reference2Video => Some("Vidu_Reference2Video"),
            Node::StartEnd2Video => Some("Vidu_StartEnd2Video"),
            Node::FeaturedPreset => Some("Vidu_Preset"),
            Node::PromptRecommender => None,
        }
    }
}

pub(crate) fn check_model(node: Node, model: Model, allowed: &[Model]) -> ViduResult<()> {
    if allowed.contains(&model) {
        return Ok(());
    }
    let valid: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
    Err(ViduError::validation(format!(
        "model \"{model}\" is not available for {}. Valid: {}",
        node.name(),
        valid.join(", ")
    )))
}

pub(crate) fn non_blank(prompt: &str) -> Option<String> {
    let trimmed = prompt.trim();
    (!trimmed.is_empty()).then(|| prompt.to_string())
}

// ---------------------------------------------------------------------------
// Per-call context and outputs
// ---------------------------------------------------------------------------

/// Everything one node invocation needs, passed explicitly to every step.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub client: ViduClient,
    pub poll: PollConfig,
    pub output_dir: PathBuf,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(client: ViduClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            poll: PollConfig::default(),
            output_dir: output_dir.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Per-call API address override, as the host lets each node set one.
    pub fn with_base_url(mut self, base_url: Option<&str>) -> Self {
        if let Some(url) = base_url.map(str::trim).filter(|u| !u.is_empty()) {
            self.client = self.client.with_base_url(url);
        }
        self
    }
}

/// Where a node writes its video.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    pub dir: Option<PathBuf>,
    pub file_prefix: Option<String>,
}

impl OutputOptions {
    fn resolve(&self, ctx: &RunContext, node: Node) -> (PathBuf, String) {
        let dir = self.dir.clone().unwrap_or_else(|| ctx.output_dir.clone());
        let prefix = self
            .file_prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .or(node.default_prefix())
            .unwrap_or("Vidu")
            .to_string();
        (dir, prefix)
    }
}

/// A finished generation: local video, cover image URL and remote task id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub video_path: PathBuf,
    pub cover_url: Option<String>,
    pub task_id: String,
}

/// Host rendering of a node result: three output slots. On failure the video
/// slot is empty, the cover slot holds the message and the task id reads
/// `"error"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutputs {
    pub video_path: Option<PathBuf>,
    pub cover_url: String,
    pub task_id: String,
}

impl NodeOutputs {
    pub fn from_result(node: Node, result: ViduResult<Artifact>) -> Self {
        match result {
            Ok(artifact) => Self {
                video_path: Some(artifact.video_path),
                cover_url: artifact.cover_url.unwrap_or_default(),
                task_id: artifact.task_id,
            },
            Err(e) => {
                error!(node = node.name(), kind = e.kind(), "node failed: {e}");
                Self {
                    video_path: None,
                    cover_url: format!("Vidu {} error: {e}", node.name()),
                    task_id: "error".to_string(),
                }
            }
        }
    }

    pub fn is_error(&self) -> bool {
        self.video_path.is_none()
    }
}

// ---------------------------------------------------------------------------
// Shared pipeline: upload → submit → poll → download
// ---------------------------------------------------------------------------

/// Upload images strictly one after another, preserving order.
pub(crate) async fn upload_all(ctx: &RunContext, images: &[&ImageInput]) -> ViduResult<Vec<String>> {
    let mut uris = Vec::with_capacity(images.len());
    for (i, image) in images.iter().enumerate() {
        info!(index = i + 1, total = images.len(), "uploading image");
        uris.push(ctx.client.upload_image(*image).await?);
    }
    Ok(uris)
}

pub(crate) async fn generate<B>(
    ctx: &RunContext,
    node: Node,
    endpoint: TaskEndpoint,
    payload: &B,
    output: &OutputOptions,
) -> ViduResult<Artifact>
where
    B: Serialize + ?Sized,
{
    let task_id = ctx.client.create_task(endpoint, payload).await?;

    let creations = poll::wait_for_completion(&ctx.client, &task_id, &ctx.poll, &ctx.cancel).await?;
    let creation = creations.into_iter().next().ok_or_else(|| {
        ViduError::InvalidResponse(format!("task {task_id} succeeded but returned no creations"))
    })?;

    let (dir, prefix) = output.resolve(ctx, node);
    let url = creation.url.unwrap_or_default();
    let video_path = download::download_video(&ctx.client, &url, &dir, &prefix).await?;

    info!(node = node.name(), task_id = %task_id, path = %video_path.display(), "generation complete");
    Ok(Artifact {
        video_path,
        cover_url: creation.cover_url,
        task_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_renders_error_sentinel() {
        let out = NodeOutputs::from_result(
            Node::Text2Video,
            Err(ViduError::validation("prompt must not be empty")),
        );
        assert!(out.is_error());
        assert_eq!(out.task_id, "error");
        assert!(out.cover_url.contains("text2video"));
        assert!(out.cover_url.contains("prompt must not be empty"));
    }

    #[test]
    fn success_renders_three_slots() {
        let out = NodeOutputs::from_result(
            Node::Img2Video,
            Ok(Artifact {
                video_path: PathBuf::from("output/a.mp4"),
                cover_url: Some("https://x/c.jpg".into()),
                task_id: "t1".into(),
            }),
        );
        assert!(!out.is_error());
        assert_eq!(out.cover_url, "https://x/c.jpg");
        assert_eq!(out.task_id, "t1");
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["videoPath"], "output/a.mp4");
        assert_eq!(v["taskId"], "t1");
    }

    #[test]
    fn output_options_fall_back_to_context_and_node_prefix() {
        let ctx = RunContext::new(ViduClient::new("http://localhost", "k"), "out");
        let (dir, prefix) = OutputOptions::default().resolve(&ctx, Node::StartEnd2Video);
        assert_eq!(dir, PathBuf::from("out"));
        assert_eq!(prefix, "Vidu_StartEnd2Video");

        let custom = OutputOptions {
            dir: Some(PathBuf::from("/tmp/v")),
            file_prefix: Some("  ".into()),
        };
        let (dir, prefix) = custom.resolve(&ctx, Node::FeaturedPreset);
        assert_eq!(dir, PathBuf::from("/tmp/v"));
        assert_eq!(prefix, "Vidu_Preset");
    }

    #[test]
    fn only_video_nodes_have_a_default_prefix() {
        assert_eq!(Node::Img2Video.default_prefix(), Some("Vidu_Image2Video"));
        assert_eq!(Node::PromptRecommender.default_prefix(), None);
    }

    #[test]
    fn base_url_override_ignores_blank_values() {
        let ctx = RunContext::new(ViduClient::new("https://api.vidu.cn", "k"), "out");
        let same = ctx.clone().with_base_url(Some("   "));
        assert_eq!(same.client.base_url(), "https://api.vidu.cn");
        let other = ctx.with_base_url(Some("https://api.vidu.com/"));
        assert_eq!(other.client.base_url(), "https://api.vidu.com");
    }

    #[test]
    fn model_availability_is_checked_per_node() {
        assert!(check_model(Node::Text2Video, Model::ViduQ1, TEXT2VIDEO_MODELS).is_ok());
        let err = check_model(Node::Text2Video, Model::Vidu2_0, TEXT2VIDEO_MODELS).unwrap_err();
        assert!(err.to_string().contains("vidu1.5, viduq1"));
    }
}
