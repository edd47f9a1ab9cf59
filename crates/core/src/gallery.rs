//! View models for the project list, cards and the detail gallery.

use serde::Serialize;

use crate::project::{ImageSlot, Project};
use crate::types::DbId;

/// Number of placeholder cards shown while the list is loading.
pub const LOADING_PLACEHOLDERS: usize = 9;

/// Message shown by the gallery when a project has no images.
pub const NO_IMAGES: &str = "No images available";

/// One tile in the project grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectCard {
    pub id: DbId,
    pub name: String,
    pub desc: String,
    /// Populated image URLs in slot order.
    pub images: Vec<String>,
}

impl From<&Project> for ProjectCard {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            desc: project.desc.clone(),
            images: project
                .images
                .populated()
                .map(|(_, url)| url.to_string())
                .collect(),
        }
    }
}

/// Caption under an image in the detail gallery.
pub fn gallery_caption(slot: ImageSlot) -> &'static str {
    match slot.number() {
        1..=3 => "16:9 Aspect Ratio",
        8 => "1:1 Aspect Ratio",
        _ => "3:4 Aspect Ratio",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryImage {
    pub slot: u8,
    pub src: String,
    pub caption: &'static str,
}

/// The detail dialog for a single project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectGallery {
    pub title: String,
    pub description: String,
    pub images: Vec<GalleryImage>,
}

impl ProjectGallery {
    /// Previous/next controls only make sense with more than one image.
    pub fn has_navigation(&self) -> bool {
        self.images.len() > 1
    }
}

impl From<&Project> for ProjectGallery {
    fn from(project: &Project) -> Self {
        Self {
            title: project.name.clone(),
            description: project.desc.clone(),
            images: project
                .images
                .populated()
                .map(|(slot, url)| GalleryImage {
                    slot: slot.number(),
                    src: url.to_string(),
                    caption: gallery_caption(slot),
                })
                .collect(),
        }
    }
}

/// What the dashboard grid shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ListView {
    Loading { placeholders: usize },
    Empty,
    Cards { cards: Vec<ProjectCard> },
}

impl ListView {
    pub fn build(projects: &[Project], is_loading: bool) -> Self {
        if is_loading {
            return Self::Loading {
                placeholders: LOADING_PLACEHOLDERS,
            };
        }
        if projects.is_empty() {
            return Self::Empty;
        }
        Self::Cards {
            cards: projects.iter().map(ProjectCard::from).collect(),
        }
    }
}
