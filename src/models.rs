use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::DesignError;
use crate::report::ReportSection;

pub const MAX_DESIGN_STYLES: usize = 3;

pub const ROOM_TYPES: &[&str] = &[
    "Entryway / Foyer", "Living Room", "Family Room", "Dining Room", "Kitchen",
    "Breakfast Nook", "Bedroom", "Guest Bedroom", "Kid's Bedroom", "Nursery",
    "Bathroom", "Guest Bathroom", "Powder Room", "Home Office", "Study",
    "Laundry Room", "Mudroom", "Hallway", "Front Porch", "Deck",
    "Deck with Outdoor Kitchen", "Patio", "Backyard", "Backyard with Pool",
    "Man Cave", "She Shed", "Game Room",
];

pub const DESIGN_STYLES: &[&str] = &[
    "Traditional", "Modern", "Contemporary", "Transitional", "Farmhouse (Modern Farmhouse)",
    "Scandinavian", "Minimalist", "Bohemian (Boho)", "Coastal / Hamptons", "Mid-Century Modern",
    "Industrial", "Rustic", "Organic Modern", "Japandi", "French Country",
    "Mediterranean", "Spanish Modern", "Shabby Chic", "Art Deco", "Hollywood Glam (Hollywood Regency)",
    "Southwestern", "Biophilic", "Wabi-Sabi", "Maximalist", "Eclectic",
];

/// Raw form submission, as posted by the web page.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DesignForm {
    #[serde(default)]
    pub room_type: String,
    #[serde(default)]
    pub design_style: Vec<String>,
    #[serde(default)]
    pub color_palette: String,
    #[serde(default)]
    pub key_elements: Option<String>,
    #[serde(default)]
    pub inspirational_photo_details: Option<String>,
}

impl DesignForm {
    pub fn validate(&self) -> Result<DesignRequest, DesignError> {
        let room_type = self.room_type.trim();
        let styles: Vec<String> = self
            .design_style
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let color_palette = self.color_palette.trim();

        let mut missing = Vec::new();
        if room_type.is_empty() { missing.push("Room Type"); }
        if styles.is_empty() { missing.push("Design Style"); }
        if color_palette.is_empty() { missing.push("Color Palette"); }
        if !missing.is_empty() {
            return Err(DesignError::Validation(format!(
                "Please fill in all required fields: {}",
                missing.join(", ")
            )));
        }

        if styles.len() > MAX_DESIGN_STYLES {
            return Err(DesignError::Validation(format!("Select up to {MAX_DESIGN_STYLES} design styles")));
        }
        if !ROOM_TYPES.contains(&room_type) {
            return Err(DesignError::Validation(format!("Unknown room type: {room_type}")));
        }
        if let Some(unknown) = styles.iter().find(|s| !DESIGN_STYLES.contains(&s.as_str())) {
            return Err(DesignError::Validation(format!("Unknown design style: {unknown}")));
        }

        let optional = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Ok(DesignRequest {
            room_type: room_type.to_string(),
            design_style: styles,
            color_palette: color_palette.to_string(),
            key_elements: optional(&self.key_elements),
            inspirational_photo_details: optional(&self.inspirational_photo_details),
        })
    }
}

/// A validated submission. Consumed once by a pipeline run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DesignRequest {
    pub room_type: String,
    pub design_style: Vec<String>,
    pub color_palette: String,
    pub key_elements: Option<String>,
    pub inspirational_photo_details: Option<String>,
}

impl DesignRequest {
    pub fn styles(&self) -> String {
        self.design_style.join(", ")
    }
}

/// Persisted artifacts of one report run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutputBundle {
    pub output_dir: PathBuf,
    pub html_path: PathBuf,
    pub image_paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize, Clone)]
pub struct GeneratedContent {
    pub bundle: OutputBundle,
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DesignOptions {
    pub output_dir: PathBuf,
    pub concept_text: String,
    pub options: Vec<PathBuf>,
}

/// Session state for one visitor, passed explicitly through the handlers.
#[derive(Debug, Serialize, Clone)]
pub struct DesignContext {
    pub id: Uuid,
    pub form: DesignForm,
    pub generated: Option<GeneratedContent>,
    pub options: Option<DesignOptions>,
    pub selected_option: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DesignContext {
    pub fn new(id: Uuid, form: DesignForm) -> Self {
        Self {
            id,
            form,
            generated: None,
            options: None,
            selected_option: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn reset(&self) -> Self {
        Self::new(self.id, DesignForm::default())
    }

    /// Directory holding the files this context may serve.
    pub fn output_dir(&self) -> Option<&PathBuf> {
        self.generated
            .as_ref()
            .map(|g| &g.bundle.output_dir)
            .or_else(|| self.options.as_ref().map(|o| &o.output_dir))
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct FormOptions {
    pub room_types: &'static [&'static str],
    pub design_styles: &'static [&'static str],
    pub max_design_styles: usize,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self { room_types: ROOM_TYPES, design_styles: DESIGN_STYLES, max_design_styles: MAX_DESIGN_STYLES }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form() -> DesignForm {
        DesignForm {
            room_type: "Kitchen".into(),
            design_style: vec!["Modern".into(), "Japandi".into()],
            color_palette: "Neutral with blue accents".into(),
            key_elements: Some("  ".into()),
            inspirational_photo_details: None,
        }
    }

    #[test]
    fn validate_accepts_complete_form() {
        let request = form().validate().unwrap();
        assert_eq!(request.styles(), "Modern, Japandi");
        assert_eq!(request.key_elements, None);
    }

    #[test]
    fn validate_names_missing_fields() {
        let err = DesignForm { room_type: "Kitchen".into(), ..Default::default() }.validate().unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all required fields: Design Style, Color Palette");
    }

    #[test]
    fn validate_caps_style_count() {
        let mut f = form();
        f.design_style = vec!["Modern".into(), "Rustic".into(), "Industrial".into(), "Eclectic".into()];
        assert!(matches!(f.validate(), Err(DesignError::Validation(_))));
    }

    #[test]
    fn validate_rejects_unknown_room() {
        let mut f = form();
        f.room_type = "Spaceship".into();
        assert!(matches!(f.validate(), Err(DesignError::Validation(_))));
    }

    #[test]
    fn reset_keeps_id_and_clears_state() {
        let id = Uuid::new_v4();
        let mut ctx = DesignContext::new(id, form());
        ctx.selected_option = Some(2);
        let fresh = ctx.reset();
        assert_eq!(fresh.id, id);
        assert_eq!(fresh.form, DesignForm::default());
        assert_eq!(fresh.selected_option, None);
        assert!(fresh.output_dir().is_none());
    }
}
