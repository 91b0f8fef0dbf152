use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ViduError, ViduResult};

// ---------------------------------------------------------------------------
// Wire vocabulary — closed enumerations with their host label tables.
// Each entry lists the wire value first, then the display labels the host
// shows for it.
// ---------------------------------------------------------------------------

type LabelTable<T> = &'static [(&'static [&'static str], T)];

fn parse_label<T: Copy>(field: &str, input: &str, table: LabelTable<T>) -> ViduResult<T> {
    let needle = input.trim();
    for (labels, value) in table {
        if labels.iter().any(|l| l.eq_ignore_ascii_case(needle)) {
            return Ok(*value);
        }
    }
    let valid: Vec<&str> = table.iter().map(|(labels, _)| labels[0]).collect();
    Err(ViduError::validation(format!(
        "invalid {field} \"{input}\". Valid: {}",
        valid.join(", ")
    )))
}

fn wire_name<T: Copy + PartialEq>(table: LabelTable<T>, value: T) -> &'static str {
    table
        .iter()
        .find(|(_, v)| *v == value)
        .map(|(labels, _)| labels[0])
        .unwrap_or_default()
}

macro_rules! labelled {
    ($ty:ident, $field:literal, $table:expr) => {
        impl $ty {
            const LABELS: LabelTable<$ty> = $table;

            pub fn as_str(self) -> &'static str {
                wire_name(Self::LABELS, self)
            }
        }

        impl FromStr for $ty {
            type Err = ViduError;

            fn from_str(s: &str) -> ViduResult<Self> {
                parse_label($field, s, Self::LABELS)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Model {
    #[serde(rename = "vidu2.0")]
    Vidu2_0,
    #[serde(rename = "vidu1.5")]
    Vidu1_5,
    #[serde(rename = "viduq1")]
    ViduQ1,
    #[serde(rename = "viduq1-classic")]
    ViduQ1Classic,
}

labelled!(
    Model,
    "model",
    &[
        (&["vidu2.0"], Model::Vidu2_0),
        (&["vidu1.5"], Model::Vidu1_5),
        (&["viduq1"], Model::ViduQ1),
        (&["viduq1-classic"], Model::ViduQ1Classic),
    ]
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    General,
    Anime,
}

labelled!(
    Style,
    "style",
    &[
        (&["general", "通用"], Style::General),
        (&["anime", "动漫"], Style::Anime),
    ]
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementAmplitude {
    Auto,
    Small,
    Medium,
    Large,
}

labelled!(
    MovementAmplitude,
    "movement amplitude",
    &[
        (&["auto", "自动"], MovementAmplitude::Auto),
        (&["small", "小"], MovementAmplitude::Small),
        (&["medium", "中"], MovementAmplitude::Medium),
        (&["large", "大"], MovementAmplitude::Large),
    ]
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    #[serde(rename = "360p")]
    R360p,
    #[serde(rename = "720p")]
    R720p,
    #[serde(rename = "1080p")]
    R1080p,
}

labelled!(
    Resolution,
    "resolution",
    &[
        (&["360p"], Resolution::R360p),
        (&["720p"], Resolution::R720p),
        (&["1080p"], Resolution::R1080p),
    ]
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

labelled!(
    AspectRatio,
    "aspect ratio",
    &[
        (&["16:9"], AspectRatio::Landscape),
        (&["9:16"], AspectRatio::Portrait),
        (&["1:1"], AspectRatio::Square),
    ]
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplatePreset {
    OutfitShow,
}

labelled!(
    TemplatePreset,
    "template",
    &[(&["outfit_show"], TemplatePreset::OutfitShow)]
);

/// Which prompt families the recommendation endpoint should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendKind {
    TemplateAndImg2Video,
    Template,
    Img2Video,
}

labelled!(
    RecommendKind,
    "recommendation type",
    &[
        (
            &["template+img2video", "all", "特效和图生视频"],
            RecommendKind::TemplateAndImg2Video
        ),
        (&["template", "仅特效"], RecommendKind::Template),
        (&["img2video", "仅图生视频"], RecommendKind::Img2Video),
    ]
);

impl RecommendKind {
    pub fn api_types(self) -> Vec<PromptType> {
        match self {
            RecommendKind::TemplateAndImg2Video => vec![PromptType::Template, PromptType::Img2Video],
            RecommendKind::Template => vec![PromptType::Template],
            RecommendKind::Img2Video => vec![PromptType::Img2Video],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptType {
    #[serde(rename = "template")]
    Template,
    #[serde(rename = "img2video")]
    Img2Video,
}

/// Clip length in seconds. The API only accepts 4, 5 or 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VideoDuration(u32);

impl VideoDuration {
    pub const ALLOWED: &'static [u32] = &[4, 5, 8];

    pub fn seconds(self) -> u32 {
        self.0
    }
}

impl Default for VideoDuration {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u32> for VideoDuration {
    type Error = ViduError;

    fn try_from(secs: u32) -> ViduResult<Self> {
        if Self::ALLOWED.contains(&secs) {
            Ok(Self(secs))
        } else {
            Err(ViduError::validation(format!(
                "duration must be one of 4, 5, 8 seconds, got {secs}"
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEndpoint {
    Text2Video,
    Img2Video,
    Reference2Video,
    StartEnd2Video,
    Template2Video,
}

impl TaskEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            TaskEndpoint::Text2Video => "/ent/v2/text2video",
            TaskEndpoint::Img2Video => "/ent/v2/img2video",
            TaskEndpoint::Reference2Video => "/ent/v2/reference2video",
            TaskEndpoint::StartEnd2Video => "/ent/v2/start-end2video",
            TaskEndpoint::Template2Video => "/ent/v2/template2video",
        }
    }
}

// ---------------------------------------------------------------------------
// Upload handshake
// POST /tools/v2/files/uploads            → put_url + id
// PUT  <put_url>                          → ETag header
// PUT  /tools/v2/files/uploads/{id}/finish → uri
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UploadRequest {
    pub scene: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct UploadTicket {
    pub put_url: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FinishUploadRequest<'a> {
    pub etag: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct FinishUploadResponse {
    pub uri: Option<String>,
}

// ---------------------------------------------------------------------------
// Video generation — async task pattern
// POST /ent/v2/{mode}               → task_id
// GET  /ent/v2/tasks/{id}/creations → state + creations
// POST /ent/v2/tasks/{id}/cancel
// ---------------------------------------------------------------------------

/// Body shared by every generation endpoint; each mode fills the fields it uses.
#[derive(Debug, Default, Serialize)]
pub struct VideoTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplatePreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<VideoDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement_amplitude: Option<MovementAmplitude>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgm: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskResponse {
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Success,
    Failed,
    /// created | queueing | processing | anything else not yet terminal
    #[serde(other)]
    Pending,
}

#[derive(Debug, Deserialize)]
pub struct TaskCreations {
    pub state: Option<TaskState>,
    pub err_code: Option<serde_json::Value>,
    pub creations: Option<Vec<Creation>>,
}

impl TaskCreations {
    pub fn err_code(&self) -> String {
        match &self.err_code {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Null) | None => "N/A".to_string(),
            Some(serde_json::Value::String(_)) => "N/A".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Creation {
    pub url: Option<String>,
    pub cover_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelTaskRequest<'a> {
    pub id: &'a str,
}

// ---------------------------------------------------------------------------
// Prompt recommendation — synchronous
// POST /ent/v2/img2video-prompt-recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PromptRecommendationRequest {
    pub images: Vec<String>,
    #[serde(rename = "type")]
    pub types: Vec<PromptType>,
    pub count: u32,
    pub resolution: Resolution,
}

#[derive(Debug, Deserialize)]
pub struct PromptRecommendationResponse {
    #[serde(default)]
    pub prompts: Vec<RecommendedPrompt>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendedPrompt {
    #[serde(rename = "type")]
    pub prompt_type: Option<String>,
    pub content: Option<String>,
    pub template: Option<String>,
    pub resolution: Option<String>,
    pub prompt: Option<String>,
}
