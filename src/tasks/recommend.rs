use tracing::info;

use super::{upload_all, RunContext};
use crate::codec::ImageInput;
use crate::error::{ViduError, ViduResult};
use crate::vidu::types::{PromptRecommendationRequest, RecommendKind, RecommendedPrompt, Resolution};

pub const MIN_COUNT: u32 = 1;
pub const MAX_COUNT: u32 = 10;
pub const DEFAULT_COUNT: u32 = 5;

pub const NO_PROMPTS: &str = "No prompt recommendations received.";

#[derive(Debug, Clone)]
pub struct RecommendParams {
    pub image: ImageInput,
    pub kind: RecommendKind,
    pub count: u32,
    /// Only 360p is offered for recommendations.
    pub resolution: Resolution,
}

impl RecommendParams {
    pub fn new(image: ImageInput, kind: RecommendKind) -> Self {
        Self {
            image,
            kind,
            count: DEFAULT_COUNT,
            resolution: Resolution::R360p,
        }
    }

    pub fn validate(&self) -> ViduResult<()> {
        if !(MIN_COUNT..=MAX_COUNT).contains(&self.count) {
            return Err(ViduError::validation(format!(
                "count must be between {MIN_COUNT} and {MAX_COUNT}, got {}",
                self.count
            )));
        }
        if self.resolution != Resolution::R360p {
            return Err(ViduError::validation(format!(
                "recommendations only support 360p, got {}",
                self.resolution
            )));
        }
        Ok(())
    }
}

/// Upload the image, ask for prompt suggestions and return them as a report.
pub async fn recommend_prompts(ctx: &RunContext, params: RecommendParams) -> ViduResult<String> {
    params.validate()?;
    info!(node = "prompt_recommender", kind = %params.kind, count = params.count, "requesting prompt recommendations");

    let images = upload_all(ctx, &[&params.image]).await?;
    let req = PromptRecommendationRequest {
        images,
        types: params.kind.api_types(),
        count: params.count,
        resolution: params.resolution,
    };
    let resp = ctx.client.recommend_prompts(&req).await?;
    info!(received = resp.prompts.len(), "prompt recommendations received");
    Ok(format_report(&resp.prompts))
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

/// Render suggestions grouped by family: template effects first, then
/// image-to-video prompts. Entries of any other type are skipped.
pub fn format_report(prompts: &[RecommendedPrompt]) -> String {
    if prompts.is_empty() {
        return NO_PROMPTS.to_string();
    }

    let of_type = |t: &str| -> Vec<&RecommendedPrompt> {
        prompts
            .iter()
            .filter(|p| p.prompt_type.as_deref() == Some(t))
            .collect()
    };
    let templates = of_type("template");
    let img2video = of_type("img2video");

    let mut lines: Vec<String> = Vec::new();
    if !templates.is_empty() {
        lines.push("--- Template Prompts ---".to_string());
        for (i, p) in templates.iter().enumerate() {
            lines.push(format!("\n[{}] Effect: {}", i + 1, field(&p.content)));
            lines.push(format!("    - Template: {}", field(&p.template)));
            lines.push(format!("    - Recommended resolution: {}", field(&p.resolution)));
            lines.push(format!(
                "    - Dedicated prompt (paste into a generation node):\n      {}",
                field(&p.prompt)
            ));
        }
        lines.push(format!("\n{}", "=".repeat(40)));
    }
    if !img2video.is_empty() {
        lines.push("\n--- Image to Video Prompts ---".to_string());
        for (i, p) in img2video.iter().enumerate() {
            lines.push(format!("\n[{}] {}", i + 1, field(&p.content)));
        }
    }
    lines.join("\n")
}
