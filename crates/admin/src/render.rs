//! Plain-text rendering of the display surfaces for the terminal.

use std::fmt::Write;

use krn_core::form_wizard::ProjectForm;
use krn_core::gallery::{ListView, ProjectCard, ProjectGallery, NO_IMAGES};
use krn_events::{Notice, NoticeKind};

pub fn list(view: &ListView) -> String {
    match view {
        ListView::Loading { placeholders } => {
            let mut out = String::new();
            for _ in 0..*placeholders {
                out.push_str("[ ............ ]\n");
            }
            out
        }
        ListView::Empty => String::new(),
        ListView::Cards { cards } => cards.iter().map(card).collect(),
    }
}

pub fn card(card: &ProjectCard) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{:<5} {}  [Project]", card.id, card.name);
    let _ = writeln!(out, "       {}", card.desc);
    match card.images.first() {
        Some(cover) => {
            let _ = writeln!(out, "       {cover} (+{} more)", card.images.len() - 1);
        }
        None => {
            let _ = writeln!(out, "       (no images)");
        }
    }
    out
}

pub fn gallery(gallery: &ProjectGallery) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", gallery.title);
    let _ = writeln!(out, "{}", gallery.description);
    let _ = writeln!(out);
    if gallery.images.is_empty() {
        let _ = writeln!(out, "{NO_IMAGES}");
        return out;
    }
    for image in &gallery.images {
        let _ = writeln!(out, "  [{}] {:<18} {}", image.slot, image.caption, image.src);
    }
    out
}

/// Dialog header plus the active step's slots.
pub fn form(form: &ProjectForm) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", form.title());
    for view in form.step_slots() {
        let _ = writeln!(
            out,
            "  image{} ({}): {}",
            view.slot.number(),
            view.caption,
            view.source.as_deref().unwrap_or("-")
        );
    }
    out
}

pub fn notice(notice: &Notice) -> String {
    let marker = match notice.kind {
        NoticeKind::Loading => "...",
        NoticeKind::Success => "ok ",
        NoticeKind::Error => "err",
    };
    format!("[{marker}] {}", notice.message)
}
