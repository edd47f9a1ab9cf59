//! Project records and their image slots.
//!
//! A project carries nine independent image references. They travel over
//! the wire as the flat fields `image1` .. `image9` (empty string when
//! unset) and are held in memory as a fixed, ordered [`ImageSlots`] array.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::Validate;

use crate::error::CoreError;
use crate::types::DbId;

/// Number of image slots on every project.
pub const IMAGE_SLOT_COUNT: usize = 9;

/// Minimum project name length, in characters.
pub const NAME_MIN_CHARS: u64 = 3;

/// Minimum project description length, in characters.
pub const DESC_MIN_CHARS: u64 = 20;

// ---------------------------------------------------------------------------
// Image slots
// ---------------------------------------------------------------------------

/// A 1-based image slot number (`1..=9`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageSlot(u8);

impl ImageSlot {
    /// Convert a 1-based slot number into an `ImageSlot`.
    pub fn new(n: u8) -> Result<Self, CoreError> {
        if n == 0 || n as usize > IMAGE_SLOT_COUNT {
            return Err(CoreError::Validation(format!(
                "Invalid image slot {n}. Must be between 1 and {IMAGE_SLOT_COUNT}"
            )));
        }
        Ok(Self(n))
    }

    /// All nine slots in order.
    pub fn all() -> impl Iterator<Item = ImageSlot> {
        (1..=IMAGE_SLOT_COUNT as u8).map(ImageSlot)
    }

    /// 1-based slot number.
    pub fn number(self) -> u8 {
        self.0
    }

    /// 0-based position in [`ImageSlots`].
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// Wire field name, e.g. `image4`.
    pub fn field_name(self) -> String {
        format!("image{}", self.0)
    }

    /// Parse a wire field name (`image1` .. `image9`).
    pub fn from_field_name(name: &str) -> Option<Self> {
        let n: u8 = name.strip_prefix("image")?.parse().ok()?;
        Self::new(n).ok()
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image{}", self.0)
    }
}

/// The nine optional image URLs of a project, in slot order.
///
/// Empty strings are normalised to `None` on every write path so that
/// "populated" always means a non-empty reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSlots([Option<String>; IMAGE_SLOT_COUNT]);

impl ImageSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: ImageSlot) -> Option<&str> {
        self.0[slot.index()].as_deref()
    }

    pub fn set(&mut self, slot: ImageSlot, url: Option<String>) {
        self.0[slot.index()] = url.filter(|u| !u.is_empty());
    }

    pub fn clear(&mut self, slot: ImageSlot) {
        self.0[slot.index()] = None;
    }

    /// Every slot with its value, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ImageSlot, Option<&str>)> + '_ {
        ImageSlot::all().map(move |slot| (slot, self.get(slot)))
    }

    /// Only the populated slots, in slot order.
    pub fn populated(&self) -> impl Iterator<Item = (ImageSlot, &str)> + '_ {
        self.iter().filter_map(|(slot, url)| url.map(|u| (slot, u)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

impl<S: Into<String>> FromIterator<(ImageSlot, S)> for ImageSlots {
    fn from_iter<I: IntoIterator<Item = (ImageSlot, S)>>(iter: I) -> Self {
        let mut slots = Self::default();
        for (slot, url) in iter {
            slots.set(slot, Some(url.into()));
        }
        slots
    }
}

impl Serialize for ImageSlots {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(IMAGE_SLOT_COUNT))?;
        for (slot, url) in self.iter() {
            map.serialize_entry(&slot.field_name(), url.unwrap_or(""))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ImageSlots {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlotsVisitor;

        impl<'de> Visitor<'de> for SlotsVisitor {
            type Value = ImageSlots;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map containing image1..image9 fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ImageSlots, A::Error> {
                let mut slots = ImageSlots::default();
                while let Some(key) = map.next_key::<String>()? {
                    match ImageSlot::from_field_name(&key) {
                        Some(slot) => {
                            let url: Option<String> = map.next_value()?;
                            slots.set(slot, url);
                        }
                        None => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(slots)
            }
        }

        deserializer.deserialize_map(SlotsVisitor)
    }
}

// ---------------------------------------------------------------------------
// Project records
// ---------------------------------------------------------------------------

/// A persisted project as held by the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Project {
    pub id: DbId,
    #[validate(length(min = 3, message = "Name must be at least 3 characters."))]
    pub name: String,
    #[validate(length(
        min = 20,
        message = "Description must be at least 20 characters long."
    ))]
    pub desc: String,
    #[serde(flatten)]
    pub images: ImageSlots,
}

/// A project that has not been assigned an id yet (create body, form draft).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProjectDraft {
    #[validate(length(min = 3, message = "Name must be at least 3 characters."))]
    pub name: String,
    #[validate(length(
        min = 20,
        message = "Description must be at least 20 characters long."
    ))]
    pub desc: String,
    #[serde(flatten)]
    pub images: ImageSlots,
}

impl Project {
    /// Copy of this project without its id.
    pub fn to_draft(&self) -> ProjectDraft {
        ProjectDraft {
            name: self.name.clone(),
            desc: self.desc.clone(),
            images: self.images.clone(),
        }
    }
}

impl ProjectDraft {
    /// Attach a server-assigned id.
    pub fn with_id(self, id: DbId) -> Project {
        Project {
            id,
            name: self.name,
            desc: self.desc,
            images: self.images,
        }
    }

    /// Run the name/description rules, collapsing failures into one
    /// [`CoreError::Validation`].
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate().map_err(CoreError::from)
    }
}

/// Wire representation returned by the REST API: a project plus
/// server-side timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseProject {
    #[serde(flatten)]
    pub project: Project,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResponseProject {
    /// Drop the timestamps.
    pub fn into_project(self) -> Project {
        self.project
    }
}

impl From<ResponseProject> for Project {
    fn from(value: ResponseProject) -> Self {
        value.into_project()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
