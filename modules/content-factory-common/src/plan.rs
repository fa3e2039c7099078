use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ContentFactoryError, Result};

pub const UNTITLED: &str = "Untitled";

/// Slide-by-slide structure of a carousel, as produced by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanStructure {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slides: Vec<Slide>,
    #[serde(default)]
    pub cta_final: Option<CallToAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Slide {
    #[serde(default)]
    pub number: u32,
    /// cover, content, list, cta...
    #[serde(rename = "type", default)]
    pub slide_type: Option<String>,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub visual_hint: Option<String>,
}

impl Slide {
    /// Body text, `None` when absent or blank.
    pub fn body(&self) -> Option<&str> {
        self.body_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CallToAction {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub link: Option<String>,
}

impl PlanStructure {
    /// Parse a planner response into a validated plan.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let plan: PlanStructure = serde_json::from_value(value)
            .map_err(|e| ContentFactoryError::Validation(format!("malformed plan: {e}")))?;
        plan.normalized()
    }

    /// Fill a blank title, number unnumbered slides by position, and reject
    /// plans with no slides or duplicate slide numbers.
    pub fn normalized(mut self) -> Result<Self> {
        if self.title.trim().is_empty() {
            self.title = UNTITLED.to_string();
        } else {
            self.title = self.title.trim().to_string();
        }

        if self.slides.is_empty() {
            return Err(ContentFactoryError::Validation(
                "plan has no slides".into(),
            ));
        }

        for (idx, slide) in self.slides.iter_mut().enumerate() {
            if slide.number == 0 {
                slide.number = idx as u32 + 1;
            }
        }

        let mut seen = HashSet::new();
        for slide in &self.slides {
            if !seen.insert(slide.number) {
                return Err(ContentFactoryError::Validation(format!(
                    "duplicate slide number {}",
                    slide.number
                )));
            }
        }

        Ok(self)
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
