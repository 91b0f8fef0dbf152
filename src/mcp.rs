use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::error;

use crate::codec::ImageInput;
use crate::error::{ViduError, ViduResult};
use crate::tasks::preset::{self, PresetParams};
use crate::tasks::recommend::{self, RecommendParams};
use crate::tasks::video::{
    self, Img2VideoParams, Reference2VideoParams, StartEnd2VideoParams, Text2VideoParams,
};
use crate::tasks::{Artifact, Node, NodeOutputs, OutputOptions, RunContext};
use crate::vidu::types::{RecommendKind, VideoDuration};

// ---------------------------------------------------------------------------
// Tool parameter schemas (derive JsonSchema for rmcp auto-schema)
//
// Enumerated fields are plain strings here and go through the same label
// tables the library uses, so host labels like "自动" are accepted too.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Text2VideoArgs {
    /// Text prompt describing the video.
    pub prompt: String,
    /// Model: "vidu1.5" (default) or "viduq1".
    #[serde(default)]
    pub model: Option<String>,
    /// Style: "general" (default) or "anime".
    #[serde(default)]
    pub style: Option<String>,
    /// Duration in seconds: 4 (default), 5 or 8.
    #[serde(default)]
    pub duration: Option<u32>,
    /// Resolution: "360p", "720p" (default) or "1080p".
    #[serde(default)]
    pub resolution: Option<String>,
    /// Aspect ratio: "16:9" (default), "9:16" or "1:1".
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    /// Random seed. 0 lets the service pick.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Movement amplitude: "auto" (default), "small", "medium" or "large".
    #[serde(default)]
    pub movement_amplitude: Option<String>,
    #[serde(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Img2VideoArgs {
    /// Start image: a local file path or a data:image/...;base64 URI.
    pub image: String,
    /// Optional prompt guiding the motion.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Model: "vidu2.0" (default), "vidu1.5" or "viduq1".
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub movement_amplitude: Option<String>,
    #[serde(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Reference2VideoArgs {
    /// 1 to 7 reference images (paths or data URIs), in order.
    pub images: Vec<String>,
    /// Text prompt describing the video.
    pub prompt: String,
    /// Model: "vidu2.0" (default), "vidu1.5" or "viduq1".
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub movement_amplitude: Option<String>,
    #[serde(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StartEnd2VideoArgs {
    /// First frame (path or data URI).
    pub start_image: String,
    /// Last frame (path or data URI). Its aspect ratio must be close to the first frame's.
    pub end_image: String,
    #[serde(default)]
    pub prompt: Option<String>,
    /// Model: "vidu2.0" (default), "vidu1.5", "viduq1" or "viduq1-classic".
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub movement_amplitude: Option<String>,
    #[serde(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Template2VideoArgs {
    /// Preset template. Only "outfit_show" is available.
    #[serde(default)]
    pub template: Option<String>,
    /// Template images. "outfit_show" needs exactly two.
    pub images: Vec<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    /// Background music. Defaults to true.
    #[serde(default)]
    pub bgm: Option<bool>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// JSON object merged over the request body, e.g. {"aspect_ratio": "9:16"}.
    #[serde(default)]
    pub extra: Option<String>,
    #[serde(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecommendPromptsArgs {
    /// Image to get prompt ideas for (path or data URI).
    pub image: String,
    /// "template+img2video" (default), "template" or "img2video".
    #[serde(default)]
    pub kind: Option<String>,
    /// Number of suggestions, 1-10. Defaults to 5.
    #[serde(default)]
    pub count: Option<u32>,
    /// Only "360p" is supported.
    #[serde(default)]
    pub resolution: Option<String>,
    /// Override the API address for this call.
    #[serde(default)]
    pub api_base: Option<String>,
}

/// Fields every generation tool accepts.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CommonArgs {
    /// Override the API address for this call, e.g. "https://api.vidu.com".
    #[serde(default)]
    pub api_base: Option<String>,
    /// Directory to save the video in. Defaults to the configured output dir.
    #[serde(default)]
    pub output_dir: Option<String>,
    /// Filename prefix; the file is saved as {prefix}_{unix_seconds}.mp4.
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl CommonArgs {
    fn output(&self) -> OutputOptions {
        OutputOptions {
            dir: self
                .output_dir
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(PathBuf::from),
            file_prefix: self.file_prefix.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Argument conversion
// ---------------------------------------------------------------------------

fn parse_or<T>(value: Option<&str>, default: T) -> ViduResult<T>
where
    T: FromStr<Err = ViduError>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.parse(),
        None => Ok(default),
    }
}

fn duration_or_default(secs: Option<u32>) -> ViduResult<VideoDuration> {
    secs.map(VideoDuration::try_from)
        .transpose()
        .map(Option::unwrap_or_default)
}

fn images(refs: &[String]) -> ViduResult<Vec<ImageInput>> {
    refs.iter().map(|r| ImageInput::from_reference(r)).collect()
}

impl Text2VideoArgs {
    pub fn into_params(self) -> ViduResult<Text2VideoParams> {
        let d = Text2VideoParams::default();
        Ok(Text2VideoParams {
            model: parse_or(self.model.as_deref(), d.model)?,
            style: parse_or(self.style.as_deref(), d.style)?,
            duration: duration_or_default(self.duration)?,
            resolution: parse_or(self.resolution.as_deref(), d.resolution)?,
            aspect_ratio: parse_or(self.aspect_ratio.as_deref(), d.aspect_ratio)?,
            seed: self.seed.unwrap_or_default(),
            movement_amplitude: parse_or(self.movement_amplitude.as_deref(), d.movement_amplitude)?,
            output: self.common.output(),
            prompt: self.prompt,
        })
    }
}

impl Img2VideoArgs {
    pub fn into_params(self) -> ViduResult<Img2VideoParams> {
        let mut p = Img2VideoParams::new(ImageInput::from_reference(&self.image)?);
        p.model = parse_or(self.model.as_deref(), p.model)?;
        p.duration = duration_or_default(self.duration)?;
        p.resolution = parse_or(self.resolution.as_deref(), p.resolution)?;
        p.seed = self.seed.unwrap_or_default();
        p.movement_amplitude = parse_or(self.movement_amplitude.as_deref(), p.movement_amplitude)?;
        p.prompt = self.prompt.unwrap_or_default();
        p.output = self.common.output();
        Ok(p)
    }
}

impl Reference2VideoArgs {
    pub fn into_params(self) -> ViduResult<Reference2VideoParams> {
        let d = Reference2VideoParams::default();
        Ok(Reference2VideoParams {
            images: images(&self.images)?,
            model: parse_or(self.model.as_deref(), d.model)?,
            duration: duration_or_default(self.duration)?,
            resolution: parse_or(self.resolution.as_deref(), d.resolution)?,
            aspect_ratio: parse_or(self.aspect_ratio.as_deref(), d.aspect_ratio)?,
            seed: self.seed.unwrap_or_default(),
            movement_amplitude: parse_or(self.movement_amplitude.as_deref(), d.movement_amplitude)?,
            output: self.common.output(),
            prompt: self.prompt,
        })
    }
}

impl StartEnd2VideoArgs {
    pub fn into_params(self) -> ViduResult<StartEnd2VideoParams> {
        let mut p = StartEnd2VideoParams::new(
            ImageInput::from_reference(&self.start_image)?,
            ImageInput::from_reference(&self.end_image)?,
        );
        p.model = parse_or(self.model.as_deref(), p.model)?;
        p.duration = duration_or_default(self.duration)?;
        p.resolution = parse_or(self.resolution.as_deref(), p.resolution)?;
        p.seed = self.seed.unwrap_or_default();
        p.movement_amplitude = parse_or(self.movement_amplitude.as_deref(), p.movement_amplitude)?;
        p.prompt = self.prompt.unwrap_or_default();
        p.output = self.common.output();
        Ok(p)
    }
}

impl Template2VideoArgs {
    pub fn into_params(self) -> ViduResult<PresetParams> {
        let d = PresetParams::default();
        Ok(PresetParams {
            template: parse_or(self.template.as_deref(), d.template)?,
            images: images(&self.images)?,
            prompt: self.prompt.unwrap_or_default(),
            bgm: self.bgm.unwrap_or(d.bgm),
            seed: self.seed.unwrap_or_default(),
            extra_json: self.extra.unwrap_or(d.extra_json),
            output: self.common.output(),
        })
    }
}

impl RecommendPromptsArgs {
    pub fn into_params(self) -> ViduResult<RecommendParams> {
        let image = ImageInput::from_reference(&self.image)?;
        let kind = parse_or(self.kind.as_deref(), RecommendKind::TemplateAndImg2Video)?;
        let mut p = RecommendParams::new(image, kind);
        p.count = self.count.unwrap_or(recommend::DEFAULT_COUNT);
        p.resolution = parse_or(self.resolution.as_deref(), p.resolution)?;
        Ok(p)
    }
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ViduMcp {
    ctx: RunContext,
    tool_router: ToolRouter<Self>,
}

impl ViduMcp {
    pub fn new(ctx: RunContext) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    /// A context for one tool call. Cancelling the server token interrupts
    /// every call in flight; each call gets its own child token.
    fn call_context(&self, api_base: Option<&str>) -> RunContext {
        self.ctx
            .clone()
            .with_base_url(api_base)
            .with_cancel(self.ctx.cancel.child_token())
    }
}

fn render(node: Node, result: ViduResult<Artifact>) -> CallToolResult {
    let outputs = NodeOutputs::from_result(node, result);
    if outputs.is_error() {
        return CallToolResult::error(vec![Content::text(outputs.cover_url)]);
    }
    match serde_json::to_string(&outputs) {
        Ok(json) => CallToolResult::success(vec![Content::text(json)]),
        Err(e) => CallToolResult::error(vec![Content::text(format!(
            "Failed to encode result: {e}"
        ))]),
    }
}

#[tool_router]
impl ViduMcp {
    #[tool(description = "Generate a video from a text prompt with Vidu. \
        Blocks until the video is downloaded (typically 1-5 min) and returns \
        {videoPath, coverUrl, taskId}. Models: vidu1.5 (default), viduq1.")]
    async fn text2video(
        &self,
        Parameters(args): Parameters<Text2VideoArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let ctx = self.call_context(args.common.api_base.as_deref());
        let result = match args.into_params() {
            Ok(params) => video::text2video(&ctx, params).await,
            Err(e) => Err(e),
        };
        Ok(render(Node::Text2Video, result))
    }

    #[tool(description = "Animate a single image into a video with Vidu. \
        Returns {videoPath, coverUrl, taskId}. Models: vidu2.0 (default), vidu1.5, viduq1.")]
    async fn img2video(
        &self,
        Parameters(args): Parameters<Img2VideoArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let ctx = self.call_context(args.common.api_base.as_deref());
        let result = match args.into_params() {
            Ok(params) => video::img2video(&ctx, params).await,
            Err(e) => Err(e),
        };
        Ok(render(Node::Img2Video, result))
    }

    #[tool(description = "Generate a video that keeps the subjects of 1-7 reference images \
        consistent. A prompt is required. Returns {videoPath, coverUrl, taskId}.")]
    async fn reference2video(
        &self,
        Parameters(args): Parameters<Reference2VideoArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let ctx = self.call_context(args.common.api_base.as_deref());
        let result = match args.into_params() {
            Ok(params) => video::reference2video(&ctx, params).await,
            Err(e) => Err(e),
        };
        Ok(render(Node::Reference2Video, result))
    }

    #[tool(description = "Generate a transition video between a first and a last frame. \
        Both frames should have similar aspect ratios. Returns {videoPath, coverUrl, taskId}.")]
    async fn start_end2video(
        &self,
        Parameters(args): Parameters<StartEnd2VideoArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let ctx = self.call_context(args.common.api_base.as_deref());
        let result = match args.into_params() {
            Ok(params) => video::start_end2video(&ctx, params).await,
            Err(e) => Err(e),
        };
        Ok(render(Node::StartEnd2Video, result))
    }

    #[tool(description = "Generate a video from a featured preset template. \
        \"outfit_show\" takes exactly two images plus a prompt. Extra JSON parameters \
        are merged over the request. Returns {videoPath, coverUrl, taskId}.")]
    async fn template2video(
        &self,
        Parameters(args): Parameters<Template2VideoArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let ctx = self.call_context(args.common.api_base.as_deref());
        let result = match args.into_params() {
            Ok(params) => preset::template2video(&ctx, params).await,
            Err(e) => Err(e),
        };
        Ok(render(Node::FeaturedPreset, result))
    }

    #[tool(description = "Suggest prompts for an image: template effects, \
        image-to-video prompts, or both. Returns a formatted text report.")]
    async fn recommend_prompts(
        &self,
        Parameters(args): Parameters<RecommendPromptsArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let ctx = self.call_context(args.api_base.as_deref());
        let result = match args.into_params() {
            Ok(params) => recommend::recommend_prompts(&ctx, params).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(report) => Ok(CallToolResult::success(vec![Content::text(report)])),
            Err(e) => {
                let node = Node::PromptRecommender;
                error!(node = node.name(), kind = e.kind(), "node failed: {e}");
                Ok(CallToolResult::error(vec![Content::text(format!(
                    "Vidu {} error: {e}",
                    node.name()
                ))]))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for ViduMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Server instructions — injected as domain knowledge for AI clients
// ---------------------------------------------------------------------------

const SERVER_INSTRUCTIONS: &str = "\
Vidu MCP server: generate short videos with the Vidu API.

# Workflow

1. Optional: call recommend_prompts with a source image to get prompt ideas.
2. Call one generation tool. It uploads the images, submits the task, waits
   for it to finish and saves the video locally. Expect 1-5 minutes.
3. The result is {videoPath, coverUrl, taskId}. On failure the tool returns
   an error message instead.

# Images

Pass images as local file paths or data:image/...;base64 URIs. They are
converted to PNG before upload.

# Parameters

- Durations: 4 (default), 5 or 8 seconds.
- Resolutions: 360p, 720p (default), 1080p.
- Aspect ratios (text2video, reference2video): 16:9 (default), 9:16, 1:1.
- Movement amplitude: auto (default), small, medium, large.
- Model availability differs per tool; see each tool's description.
";
