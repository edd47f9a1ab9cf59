//! Project form wizard steps, validation and draft state.
//!
//! The add/edit dialog walks through four steps: project details, then
//! three pages of three image slots each. This module holds the pure state
//! machine; the asynchronous upload and submit plumbing lives in the admin
//! crate.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::project::{ImageSlot, Project, ProjectDraft, IMAGE_SLOT_COUNT};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Form steps
// ---------------------------------------------------------------------------

/// The four steps in the project form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    Details,
    WideImages,
    PortraitImages,
    FinalImages,
}

/// Total number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 4;

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 4;

/// Image slots shown on each image step.
const SLOTS_PER_STEP: u8 = 3;

impl FormStep {
    /// Convert a 1-based step number to a `FormStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::Details),
            2 => Ok(Self::WideImages),
            3 => Ok(Self::PortraitImages),
            4 => Ok(Self::FinalImages),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between {MIN_STEP} and {MAX_STEP}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::Details => 1,
            Self::WideImages => 2,
            Self::PortraitImages => 3,
            Self::FinalImages => 4,
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::Details => "Details",
            Self::WideImages => "Wide Images",
            Self::PortraitImages => "Portrait Images",
            Self::FinalImages => "Final Images",
        }
    }

    /// The step after this one, if any.
    pub fn following(self) -> Option<Self> {
        Self::from_number(self.to_number() + 1).ok()
    }

    /// The step before this one, if any.
    pub fn preceding(self) -> Option<Self> {
        Self::from_number(self.to_number() - 1).ok()
    }

    /// Image slots edited on this step. Empty for [`FormStep::Details`].
    pub fn slots(self) -> Vec<ImageSlot> {
        match self {
            Self::Details => Vec::new(),
            other => {
                let first = (other.to_number() - 2) * SLOTS_PER_STEP + 1;
                (first..first + SLOTS_PER_STEP)
                    .filter_map(|n| ImageSlot::new(n).ok())
                    .collect()
            }
        }
    }
}

/// Caption shown next to a slot's file input.
pub fn slot_caption(slot: ImageSlot) -> &'static str {
    match slot.number() {
        1..=3 => "16:9 Aspect Ratio Image",
        8 => "1:1 Aspect Ratio Image",
        _ => "3:4 Aspect Ratio Image",
    }
}

// ---------------------------------------------------------------------------
// Previews
// ---------------------------------------------------------------------------

/// Local preview of an image slot, prior to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePreview {
    /// A file picked from disk.
    Local { file_name: String, bytes: Vec<u8> },
    /// An image that is already hosted (seeded from the project being edited).
    Remote(String),
}

impl ImagePreview {
    /// Short label for display: the file name or the URL.
    pub fn label(&self) -> &str {
        match self {
            Self::Local { file_name, .. } => file_name,
            Self::Remote(url) => url,
        }
    }
}

/// What the form will do when submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(ProjectDraft),
    Update(Project),
}

/// Current state of one slot on the active step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub slot: ImageSlot,
    pub caption: &'static str,
    /// Preview label if one is pending, else the draft's URL.
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Form state
// ---------------------------------------------------------------------------

/// Draft state of one open add/edit dialog.
#[derive(Debug, Clone)]
pub struct ProjectForm {
    editing: Option<DbId>,
    step: FormStep,
    draft: ProjectDraft,
    previews: [Option<ImagePreview>; IMAGE_SLOT_COUNT],
    uploading: bool,
}

impl ProjectForm {
    /// Empty form for a new project.
    pub fn create() -> Self {
        Self {
            editing: None,
            step: FormStep::Details,
            draft: ProjectDraft::default(),
            previews: Default::default(),
            uploading: false,
        }
    }

    /// Form seeded from an existing project. Hosted images become remote
    /// previews so they are carried through the next upload.
    pub fn edit(project: &Project) -> Self {
        let mut form = Self::create();
        form.editing = Some(project.id);
        form.draft = project.to_draft();
        for (slot, url) in project.images.populated() {
            form.previews[slot.index()] = Some(ImagePreview::Remote(url.to_string()));
        }
        form
    }

    pub fn editing(&self) -> Option<DbId> {
        self.editing
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn draft(&self) -> &ProjectDraft {
        &self.draft
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    pub fn set_desc(&mut self, desc: impl Into<String>) {
        self.draft.desc = desc.into();
    }

    /// Title shown in the dialog header.
    pub fn title(&self) -> String {
        let verb = if self.editing.is_some() {
            "Edit project"
        } else {
            "Add a new project"
        };
        format!("{verb} - Step {} of {TOTAL_STEPS}", self.step.to_number())
    }

    /// Advance one step. Leaving step 1 requires a valid name and
    /// description.
    pub fn next(&mut self) -> Result<FormStep, CoreError> {
        if self.step == FormStep::Details {
            self.draft.check()?;
        }
        self.step = self.step.following().ok_or_else(|| {
            CoreError::Validation(format!("Already on the last step ({TOTAL_STEPS})"))
        })?;
        Ok(self.step)
    }

    /// Go back one step.
    pub fn back(&mut self) -> Result<FormStep, CoreError> {
        self.step = self
            .step
            .preceding()
            .ok_or_else(|| CoreError::Validation("Already on the first step".to_string()))?;
        Ok(self.step)
    }

    pub fn preview(&self, slot: ImageSlot) -> Option<&ImagePreview> {
        self.previews[slot.index()].as_ref()
    }

    pub fn select_image(&mut self, slot: ImageSlot, preview: ImagePreview) {
        self.previews[slot.index()] = Some(preview);
    }

    /// Drop both the pending preview and the draft's URL for a slot.
    pub fn remove_image(&mut self, slot: ImageSlot) {
        self.previews[slot.index()] = None;
        self.draft.images.clear(slot);
    }

    /// Slots of the active step with their captions and current source.
    pub fn step_slots(&self) -> Vec<SlotView> {
        self.step
            .slots()
            .into_iter()
            .map(|slot| SlotView {
                slot,
                caption: slot_caption(slot),
                source: self
                    .preview(slot)
                    .map(|p| p.label().to_string())
                    .or_else(|| self.draft.images.get(slot).map(str::to_string)),
            })
            .collect()
    }

    /// Whether any slot holds a file that has not been uploaded yet.
    pub fn has_local_previews(&self) -> bool {
        self.previews
            .iter()
            .flatten()
            .any(|p| matches!(p, ImagePreview::Local { .. }))
    }

    /// Upload is offered once either of the two lead slots has a preview.
    pub fn can_upload(&self) -> bool {
        !self.uploading && (self.previews[0].is_some() || self.previews[1].is_some())
    }

    /// Mark the form busy and return every slot holding a preview.
    ///
    /// All nine slots are included whichever step is active.
    pub fn begin_upload(&mut self) -> Result<Vec<(ImageSlot, ImagePreview)>, CoreError> {
        if !self.can_upload() {
            return Err(CoreError::Validation(
                "Select an image for slot 1 or 2 before uploading".to_string(),
            ));
        }
        self.uploading = true;
        Ok(ImageSlot::all()
            .filter_map(|slot| self.preview(slot).cloned().map(|p| (slot, p)))
            .collect())
    }

    /// Abandon an in-flight batch. The draft keeps its current image
    /// fields and the previews stay selected.
    pub fn cancel_upload(&mut self) {
        self.uploading = false;
    }

    /// Settle an upload batch: every draft image field is overwritten with
    /// the uploaded URL for its slot, or cleared when none arrived.
    pub fn finish_upload<I>(&mut self, uploaded: I)
    where
        I: IntoIterator<Item = (ImageSlot, String)>,
    {
        let mut urls: [Option<String>; IMAGE_SLOT_COUNT] = Default::default();
        for (slot, url) in uploaded {
            urls[slot.index()] = Some(url);
        }
        for slot in ImageSlot::all() {
            self.draft.images.set(slot, urls[slot.index()].take());
        }
        self.uploading = false;
    }

    /// Submission is offered on the last step once slot 1 or 2 holds an
    /// uploaded image.
    pub fn can_submit(&self) -> bool {
        let images = &self.draft.images;
        self.step == FormStep::FinalImages
            && (images.populated().any(|(slot, _)| slot.number() <= 2))
    }

    /// Validate the whole draft and build the create or update request.
    pub fn submission(&self) -> Result<Submission, CoreError> {
        if !self.can_submit() {
            return Err(CoreError::Validation(format!(
                "Cannot submit from step {}: upload an image for slot 1 or 2 first",
                self.step.to_number()
            )));
        }
        self.draft.check()?;
        Ok(match self.editing {
            Some(id) => Submission::Update(self.draft.clone().with_id(id)),
            None => Submission::Create(self.draft.clone()),
        })
    }

    /// Back to step 1 with an empty draft and no previews.
    pub fn reset(&mut self) {
        self.step = FormStep::Details;
        self.draft = ProjectDraft::default();
        self.previews = Default::default();
        self.uploading = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ImageSlots;

    fn slot(n: u8) -> ImageSlot {
        ImageSlot::new(n).unwrap()
    }

    fn local(name: &str) -> ImagePreview {
        ImagePreview::Local {
            file_name: name.to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    fn valid_form() -> ProjectForm {
        let mut form = ProjectForm::create();
        form.set_name("Villa");
        form.set_desc("A twenty-character description here");
        form
    }

    fn existing() -> Project {
        Project {
            id: 7,
            name: "Harbour Office".into(),
            desc: "Four storey office by the harbour".into(),
            images: [(slot(1), "http://x/1.jpg"), (slot(8), "http://x/8.jpg")]
                .into_iter()
                .collect(),
        }
    }

    // -- FormStep --

    #[test]
    fn step_from_number_valid() {
        assert_eq!(FormStep::from_number(1).unwrap(), FormStep::Details);
        assert_eq!(FormStep::from_number(4).unwrap(), FormStep::FinalImages);
    }

    #[test]
    fn step_from_number_invalid() {
        assert!(FormStep::from_number(0).is_err());
        assert!(FormStep::from_number(5).is_err());
    }

    #[test]
    fn step_to_number_roundtrip() {
        for n in MIN_STEP..=MAX_STEP {
            let step = FormStep::from_number(n).unwrap();
            assert_eq!(step.to_number(), n);
            assert!(!step.label().is_empty());
        }
    }

    #[test]
    fn image_steps_cover_each_slot_once() {
        assert!(FormStep::Details.slots().is_empty());
        let numbers: Vec<u8> = [
            FormStep::WideImages,
            FormStep::PortraitImages,
            FormStep::FinalImages,
        ]
        .into_iter()
        .flat_map(FormStep::slots)
        .map(ImageSlot::number)
        .collect();
        assert_eq!(numbers, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn captions_follow_aspect_ratios() {
        assert_eq!(slot_caption(slot(2)), "16:9 Aspect Ratio Image");
        assert_eq!(slot_caption(slot(5)), "3:4 Aspect Ratio Image");
        assert_eq!(slot_caption(slot(8)), "1:1 Aspect Ratio Image");
        assert_eq!(slot_caption(slot(9)), "3:4 Aspect Ratio Image");
    }

    #[test]
    fn following_and_preceding_stop_at_the_ends() {
        assert_eq!(FormStep::Details.following(), Some(FormStep::WideImages));
        assert_eq!(FormStep::FinalImages.following(), None);
        assert_eq!(FormStep::WideImages.preceding(), Some(FormStep::Details));
        assert_eq!(FormStep::Details.preceding(), None);
    }

    // -- Navigation --

    #[test]
    fn valid_details_advance_to_step_two() {
        let mut form = valid_form();
        assert_eq!(form.next().unwrap(), FormStep::WideImages);
    }

    #[test]
    fn invalid_details_stay_on_step_one() {
        let mut form = ProjectForm::create();
        form.set_name("Ab");
        form.set_desc("A twenty-character description here");
        assert!(form.next().is_err());
        assert_eq!(form.step(), FormStep::Details);

        form.set_name("Abc");
        form.set_desc("too short");
        assert!(form.next().is_err());
        assert_eq!(form.step(), FormStep::Details);
    }

    #[test]
    fn cannot_move_past_either_end() {
        let mut form = valid_form();
        assert!(form.back().is_err());
        form.next().unwrap();
        form.next().unwrap();
        form.next().unwrap();
        assert_eq!(form.step(), FormStep::FinalImages);
        assert!(form.next().is_err());
        assert_eq!(form.back().unwrap(), FormStep::PortraitImages);
    }

    #[test]
    fn title_reflects_mode_and_step() {
        assert_eq!(ProjectForm::create().title(), "Add a new project - Step 1 of 4");
        assert_eq!(ProjectForm::edit(&existing()).title(), "Edit project - Step 1 of 4");
    }

    // -- Images --

    #[test]
    fn edit_seeds_remote_previews() {
        let form = ProjectForm::edit(&existing());
        assert_eq!(
            form.preview(slot(1)),
            Some(&ImagePreview::Remote("http://x/1.jpg".into()))
        );
        assert_eq!(form.preview(slot(2)), None);
        assert_eq!(form.draft().images.get(slot(8)), Some("http://x/8.jpg"));
    }

    #[test]
    fn remove_image_clears_preview_and_field() {
        let mut form = ProjectForm::edit(&existing());
        form.remove_image(slot(8));
        assert_eq!(form.preview(slot(8)), None);
        assert_eq!(form.draft().images.get(slot(8)), None);
    }

    #[test]
    fn upload_requires_a_lead_slot_preview() {
        let mut form = valid_form();
        form.select_image(slot(4), local("four.png"));
        assert!(!form.can_upload());
        assert!(form.begin_upload().is_err());

        form.select_image(slot(2), local("two.png"));
        assert!(form.can_upload());
    }

    #[test]
    fn remote_previews_are_not_pending_files() {
        let mut form = ProjectForm::edit(&existing());
        assert!(!form.has_local_previews());
        form.select_image(slot(3), local("three.png"));
        assert!(form.has_local_previews());
    }

    #[test]
    fn begin_upload_collects_all_slots_regardless_of_step() {
        let mut form = valid_form();
        form.next().unwrap();
        form.select_image(slot(1), local("one.png"));
        form.select_image(slot(9), local("nine.png"));

        let batch = form.begin_upload().unwrap();
        let slots: Vec<u8> = batch.iter().map(|(s, _)| s.number()).collect();
        assert_eq!(slots, vec![1, 9]);
        assert!(form.is_uploading());
        assert!(!form.can_upload());
    }

    #[test]
    fn cancelled_upload_can_be_retried() {
        let mut form = ProjectForm::edit(&existing());
        form.begin_upload().unwrap();
        assert!(!form.can_upload());

        form.cancel_upload();
        assert!(!form.is_uploading());
        assert!(form.can_upload());
        assert_eq!(form.draft().images.get(slot(8)), Some("http://x/8.jpg"));
    }

    #[test]
    fn finish_upload_overwrites_every_field() {
        let mut form = ProjectForm::edit(&existing());
        form.begin_upload().unwrap();
        form.finish_upload(vec![(slot(1), "http://cdn/1.jpg".to_string())]);

        assert!(!form.is_uploading());
        assert_eq!(form.draft().images.get(slot(1)), Some("http://cdn/1.jpg"));
        // Slot 8 had a preview but no URL came back for it.
        assert_eq!(form.draft().images.get(slot(8)), None);
    }

    #[test]
    fn step_slots_prefer_preview_over_field() {
        let mut form = ProjectForm::edit(&existing());
        form.next().unwrap();
        form.select_image(slot(1), local("new.png"));
        let views = form.step_slots();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].source.as_deref(), Some("new.png"));
        assert_eq!(views[1].source, None);
        assert_eq!(views[0].caption, "16:9 Aspect Ratio Image");
    }

    // -- Submission --

    #[test]
    fn submission_requires_last_step_and_lead_image() {
        let mut form = valid_form();
        for _ in 0..3 {
            form.next().unwrap();
        }
        assert!(!form.can_submit());
        assert!(form.submission().is_err());

        form.select_image(slot(2), local("two.png"));
        form.begin_upload().unwrap();
        form.finish_upload(vec![(slot(2), "http://cdn/2.jpg".to_string())]);
        assert!(form.can_submit());

        match form.submission().unwrap() {
            Submission::Create(draft) => {
                assert_eq!(draft.name, "Villa");
                assert_eq!(draft.images.get(slot(2)), Some("http://cdn/2.jpg"));
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn edit_submission_keeps_original_id() {
        let mut form = ProjectForm::edit(&existing());
        form.set_name("Harbour Offices");
        for _ in 0..3 {
            form.next().unwrap();
        }
        match form.submission().unwrap() {
            Submission::Update(project) => {
                assert_eq!(project.id, 7);
                assert_eq!(project.name, "Harbour Offices");
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn reset_clears_everything() {
        let mut form = ProjectForm::edit(&existing());
        form.next().unwrap();
        form.reset();
        assert_eq!(form.step(), FormStep::Details);
        assert_eq!(form.draft().images, ImageSlots::new());
        assert!(form.draft().name.is_empty());
        assert!(ImageSlot::all().all(|s| form.preview(s).is_none()));
    }
}
