use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use ai_client::OpenAi;
use content_factory_common::{parse_score, ContentSource, FileConfig, PlanStructure};

use crate::traits::ContentAnalyzer;

const CAPTION_PREVIEW_CHARS: usize = 300;
const SCORE_MAX_TOKENS: u32 = 10;

const SCORING_SYSTEM: &str = "Оцени этот контент на релевантность для менеджеров Wildberries \
и инвесторов в маркетплейсы. Ответь ТОЛЬКО ЧИСЛО от 0 до 100.";

const PLANNING_SYSTEM: &str = r#"Ты эксперт по контенту для Wildberries. Создай структуру карусели для Instagram (8-10 слайдов) на основе этого материала.
Целевая аудитория: селлеры и менеджеры WB.
Тон: экспертный, полезный.

Верни ТОЛЬКО JSON следующей структуры:
{
  "title": "Заголовок карусели",
  "description": "Описание для поста",
  "slides": [
    {
      "number": 1,
      "type": "cover",
      "headline": "Текст заголовка на слайде",
      "body_text": "Основной текст слайда (если есть)",
      "visual_hint": "Описание, что должно быть на фоне"
    }
  ],
  "cta_final": {
    "text": "Текст призыва к действию",
    "link": "Ссылка (если есть)"
  }
}"#;

/// OpenAI-backed scorer and planner, each on its own model.
pub struct OpenAiAnalyzer {
    scorer: OpenAi,
    planner: OpenAi,
}

impl OpenAiAnalyzer {
    pub fn new(ai: OpenAi, config: &FileConfig) -> Self {
        Self {
            scorer: ai.with_model(&config.models.scoring),
            planner: ai.with_model(&config.models.planning),
        }
    }
}

pub(crate) fn scoring_prompt(content: &ContentSource) -> String {
    let caption: String = match content.caption.as_deref() {
        Some(c) if !c.trim().is_empty() => c.chars().take(CAPTION_PREVIEW_CHARS).collect(),
        _ => "No caption".to_string(),
    };
    format!(
        "Контент:\nCaption: {caption}\nLikes: {}\nViews: {}\nAuthor: {}",
        content.likes(),
        content.views(),
        content.author(),
    )
}

pub(crate) fn planning_prompt(content: &ContentSource) -> String {
    let caption = content
        .caption
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or("No caption");
    format!("Исходный материал:\n{caption}")
}

#[async_trait]
impl ContentAnalyzer for OpenAiAnalyzer {
    async fn score(&self, content: &ContentSource) -> Result<f64> {
        let reply = self
            .scorer
            .chat_completion(SCORING_SYSTEM, scoring_prompt(content), Some(SCORE_MAX_TOKENS))
            .await
            .with_context(|| format!("Scoring content {} failed", content.id))?;
        let score = parse_score(&reply);
        info!(content_id = content.id, score, "Scored content");
        Ok(score)
    }

    async fn plan(&self, content: &ContentSource) -> Result<PlanStructure> {
        let plan = self
            .planner
            .extract::<PlanStructure>(PLANNING_SYSTEM, planning_prompt(content))
            .await
            .with_context(|| format!("Planning carousel for content {} failed", content.id))?
            .normalized()?;
        info!(
            content_id = content.id,
            slides = plan.slides.len(),
            title = %plan.title,
            "Carousel plan generated"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use content_factory_common::{ContentStatus, Platform};

    fn content(caption: Option<&str>) -> ContentSource {
        ContentSource {
            id: 7,
            url: "https://www.instagram.com/p/A/".into(),
            platform: Platform::Instagram,
            caption: caption.map(String::from),
            metadata: serde_json::json!({"likes": 42, "views": 1000, "author": "wb_guru"}),
            status: ContentStatus::Pending,
            score: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn scoring_prompt_truncates_caption() {
        let long = "я".repeat(400);
        let prompt = scoring_prompt(&content(Some(&long)));
        let caption_line = prompt.lines().nth(1).unwrap();
        assert_eq!(
            caption_line.chars().count(),
            "Caption: ".len() + CAPTION_PREVIEW_CHARS
        );
        assert!(prompt.contains("Likes: 42"));
        assert!(prompt.contains("Views: 1000"));
        assert!(prompt.contains("Author: wb_guru"));
    }

    #[test]
    fn missing_caption_is_labelled() {
        assert!(scoring_prompt(&content(None)).contains("Caption: No caption"));
        assert!(planning_prompt(&content(Some("  "))).contains("No caption"));
    }
}
