//! Submission options for the replace-background-and-relight job

use crate::error::{RelightError, Result};
use clap::ValueEnum;
use std::fmt;

/// Maximum seed accepted by the service; 0 lets the service pick one.
pub const MAX_SEED: u64 = 4_294_967_294;

/// Direction of the synthetic light source
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LightDirection {
    Above,
    Below,
    Left,
    Right,
}

impl LightDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightDirection::Above => "above",
            LightDirection::Below => "below",
            LightDirection::Left => "left",
            LightDirection::Right => "right",
        }
    }
}

impl fmt::Display for LightDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested encoding of the produced image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
        }
    }

    /// File extension for artifacts saved in this format
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options accompanying a job submission.
///
/// Field names mirror the multipart form fields of the service. All scalar
/// weights live in [0,1]; `validate` rejects anything out of range before a
/// single byte goes over the wire.
#[derive(Debug, Clone)]
pub struct RelightOptions {
    /// Description of the desired background (required unless the original
    /// background is kept)
    pub background_prompt: Option<String>,

    /// Description of the subject, to help segmentation
    pub foreground_prompt: Option<String>,

    /// What the result should not contain
    pub negative_prompt: Option<String>,

    /// How strongly the original subject is preserved, [0,1]
    pub preserve_original_subject: Option<f64>,

    /// Depth influence of the original background, [0,1]
    pub original_background_depth: Option<f64>,

    /// Keep the original background and only relight
    pub keep_original_background: bool,

    /// Where the light comes from
    pub light_source_direction: Option<LightDirection>,

    /// Strength of the light source, [0,1]
    pub light_source_strength: Option<f64>,

    /// Deterministic seed; 0 = service-chosen random
    pub seed: u64,

    /// Encoding of the produced image
    pub output_format: OutputFormat,
}

impl Default for RelightOptions {
    fn default() -> Self {
        Self {
            background_prompt: None,
            foreground_prompt: None,
            negative_prompt: None,
            preserve_original_subject: None,
            original_background_depth: None,
            keep_original_background: false,
            light_source_direction: None,
            light_source_strength: None,
            seed: 0,
            output_format: OutputFormat::Png,
        }
    }
}

impl RelightOptions {
    /// Check the option set before any network call.
    pub fn validate(&self) -> Result<()> {
        if !self.keep_original_background {
            match &self.background_prompt {
                Some(prompt) if !prompt.trim().is_empty() => {}
                _ => {
                    return Err(RelightError::Validation(
                        "a background prompt is required unless the original background is kept"
                            .to_string(),
                    ))
                }
            }
        }

        check_unit_range("preserve-original-subject", self.preserve_original_subject)?;
        check_unit_range("original-background-depth", self.original_background_depth)?;
        check_unit_range("light-source-strength", self.light_source_strength)?;

        if self.light_source_strength.is_some() && self.light_source_direction.is_none() {
            return Err(RelightError::Validation(
                "light-source-strength requires a light-source-direction".to_string(),
            ));
        }

        if self.seed > MAX_SEED {
            return Err(RelightError::Validation(format!(
                "seed must be at most {} (got {})",
                MAX_SEED, self.seed
            )));
        }

        Ok(())
    }

    /// Scalar form fields for the multipart submission, in wire order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();

        if let Some(prompt) = &self.background_prompt {
            fields.push(("background_prompt", prompt.clone()));
        }
        if let Some(prompt) = &self.foreground_prompt {
            fields.push(("foreground_prompt", prompt.clone()));
        }
        if let Some(prompt) = &self.negative_prompt {
            fields.push(("negative_prompt", prompt.clone()));
        }
        if let Some(weight) = self.preserve_original_subject {
            fields.push(("preserve_original_subject", weight.to_string()));
        }
        if let Some(weight) = self.original_background_depth {
            fields.push(("original_background_depth", weight.to_string()));
        }
        if self.keep_original_background {
            fields.push(("keep_original_background", "true".to_string()));
        }
        if let Some(direction) = self.light_source_direction {
            fields.push(("light_source_direction", direction.as_str().to_string()));
        }
        if let Some(strength) = self.light_source_strength {
            fields.push(("light_source_strength", strength.to_string()));
        }
        if self.seed != 0 {
            fields.push(("seed", self.seed.to_string()));
        }
        fields.push(("output_format", self.output_format.as_str().to_string()));

        fields
    }
}

fn check_unit_range(name: &str, value: Option<f64>) -> Result<()> {
    if let Some(v) = value {
        if !(0.0..=1.0).contains(&v) || v.is_nan() {
            return Err(RelightError::Validation(format!(
                "{} must be in [0,1] (got {})",
                name, v
            )));
        }
    }
    Ok(())
}
