//! The editing-session state machine.
//!
//! ```text
//! Viewing --toggle--> ModeOn --click region--> Editing
//!    ^                  |                        |  click other region (discard)
//!    +------toggle------+                        |  save success/failure (stays)
//!    +--------------- toggle off / cancel -------+
//! ```
//!
//! `active` holds the region and its snapshot together, so a region is never
//! active without a snapshot and vice versa.

use crate::persistence::{
    PageContext, PersistError, Persistence, PersistenceTarget, SavePayload, SaveReceipt,
};
use crate::region::{Marker, RegionId, RegionSurface};
use crate::rich_text::{FormatCommand, RichTextToolbar};
use crate::toast::{Severity, ToastNotifier};

use thiserror::Error;

pub const STATUS_MODE_ON: &str = "Edit mode active - Click content to edit";
pub const STATUS_SAVING: &str = "Saving...";
pub const STATUS_SAVED: &str = "Saved successfully";
pub const STATUS_SAVE_FAILED: &str = "Save failed";
pub const DEFAULT_SHORTCUT_HINT: &str = "Ctrl+S to save, Ctrl+Esc to cancel";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Viewing,
    ModeOn,
    Editing,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SaveError {
    #[error("No content being edited")]
    NoActiveRegion,
    #[error("Unknown content type")]
    UnknownContentType(String),
    #[error("Missing content identifier")]
    MissingContentId,
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ActiveEdit {
    region: RegionId,
    snapshot: String,
    epoch: u64,
}

/// Identifies the activation a save was issued for, plus the markup it sent.
/// A result whose ticket no longer matches the active edit is dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveTicket {
    pub region: RegionId,
    pub epoch: u64,
    pub markup: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSave {
    pub ticket: SaveTicket,
    pub endpoint: String,
    pub payload: SavePayload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Reverted,
    Stale,
}

pub struct EditSession<S: RegionSurface> {
    surface: S,
    toasts: ToastNotifier,
    page: PageContext,
    global_edit_mode: bool,
    active: Option<ActiveEdit>,
    rich_toolbar: Option<RichTextToolbar>,
    status: String,
    epoch: u64,
    shortcut_hint: String,
}

impl<S: RegionSurface> EditSession<S> {
    pub fn new(surface: S, page: PageContext) -> Self {
        Self {
            surface,
            toasts: ToastNotifier::new(),
            page,
            global_edit_mode: false,
            active: None,
            rich_toolbar: None,
            status: String::new(),
            epoch: 0,
            shortcut_hint: DEFAULT_SHORTCUT_HINT.to_string(),
        }
    }

    pub fn with_shortcut_hint(mut self, hint: impl Into<String>) -> Self {
        self.shortcut_hint = hint.into();
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn toasts(&self) -> &ToastNotifier {
        &self.toasts
    }

    pub fn toasts_mut(&mut self) -> &mut ToastNotifier {
        &mut self.toasts
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    pub fn is_edit_mode(&self) -> bool {
        self.global_edit_mode
    }

    pub fn active_region(&self) -> Option<RegionId> {
        self.active.as_ref().map(|a| a.region)
    }

    pub fn snapshot(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.snapshot.as_str())
    }

    pub fn rich_toolbar(&self) -> Option<&RichTextToolbar> {
        self.rich_toolbar.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn state(&self) -> SessionState {
        match (self.global_edit_mode, &self.active) {
            (false, _) => SessionState::Viewing,
            (true, None) => SessionState::ModeOn,
            (true, Some(_)) => SessionState::Editing,
        }
    }

    pub fn toggle_global_mode(&mut self) {
        if self.global_edit_mode {
            self.leave_edit_mode();
        } else {
            self.global_edit_mode = true;
            for id in self.surface.regions() {
                self.surface.set_marker(id, Marker::EditableHover, true);
            }
            self.status = STATUS_MODE_ON.to_string();
            tracing::info!("edit mode on");
        }
    }

    /// Activates `region`. Any other active region is discarded first.
    /// Activating the region that is already active re-captures its snapshot
    /// from the current markup, so a later cancel reverts to that point.
    /// Returns false when edit mode is off or the region does not exist.
    pub fn start_editing(&mut self, region: RegionId) -> bool {
        if !self.global_edit_mode {
            tracing::debug!(%region, "click ignored outside edit mode");
            return false;
        }
        let Some(content_type) = self.surface.content_type(region) else {
            tracing::warn!(%region, "no such region");
            return false;
        };

        if let Some(active) = &mut self.active {
            if active.region == region {
                active.snapshot = self.surface.markup(region).unwrap_or_default();
                self.surface.focus(region);
                tracing::debug!(%region, "active region re-clicked, snapshot refreshed");
                return true;
            }
            self.switch_discard();
        }

        let snapshot = self.surface.markup(region).unwrap_or_default();
        self.epoch += 1;
        self.surface.set_editable(region, true);
        self.surface.set_marker(region, Marker::EditingActive, true);
        if content_type.supports_formatting() {
            self.rich_toolbar = Some(RichTextToolbar::attach(region));
        }
        self.surface.focus(region);
        self.active = Some(ActiveEdit {
            region,
            snapshot,
            epoch: self.epoch,
        });

        self.status = format!("Editing {} - {}", content_type.label(), self.shortcut_hint);
        tracing::info!(%region, label = content_type.label(), epoch = self.epoch, "editing started");
        true
    }

    /// Validates the active edit and builds the request for it. Local
    /// failures are reported and reverted here; the error is returned so the
    /// caller knows no request should go out.
    pub fn begin_save(&mut self) -> Result<PendingSave, SaveError> {
        let Some(active) = &self.active else {
            self.toasts
                .show(SaveError::NoActiveRegion.to_string(), Severity::Warning);
            return Err(SaveError::NoActiveRegion);
        };
        let region = active.region;
        let epoch = active.epoch;

        let content_type = self
            .surface
            .content_type(region)
            .filter(|ct| ct.is_recognized());
        let target = match (content_type, &self.page.content_id) {
            (None, _) => {
                let label = self.surface.label(region).unwrap_or_default().to_string();
                Err(SaveError::UnknownContentType(label))
            }
            (Some(_), None) => Err(SaveError::MissingContentId),
            (Some(ct), Some(id)) => Ok((
                ct,
                PersistenceTarget {
                    kind: self.page.kind,
                    id: id.clone(),
                },
            )),
        };
        let (content_type, target) = match target {
            Ok(found) => found,
            Err(err) => {
                self.fail_save(&err);
                return Err(err);
            }
        };

        let markup = self.surface.markup(region).unwrap_or_default();
        self.status = STATUS_SAVING.to_string();
        tracing::debug!(%region, %target, "save requested");
        Ok(PendingSave {
            payload: SavePayload::new(content_type.label(), &markup),
            endpoint: target.endpoint(),
            ticket: SaveTicket {
                region,
                epoch,
                markup,
            },
        })
    }

    /// Applies a save result, unless the edit it was issued for has ended.
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<SaveReceipt, PersistError>,
    ) -> SaveOutcome {
        let current = self
            .active
            .as_mut()
            .filter(|a| a.region == ticket.region && a.epoch == ticket.epoch);
        let Some(active) = current else {
            tracing::warn!(region = %ticket.region, epoch = ticket.epoch, "dropping result of a stale save");
            return SaveOutcome::Stale;
        };

        match result {
            Ok(receipt) => {
                active.snapshot = ticket.markup;
                self.status = STATUS_SAVED.to_string();
                self.toasts
                    .show("Changes saved successfully!", Severity::Success);
                tracing::info!(region = %ticket.region, server_message = ?receipt.message, "region saved");
                SaveOutcome::Saved
            }
            Err(err) => {
                self.fail_save(&SaveError::Persist(err));
                SaveOutcome::Reverted
            }
        }
    }

    /// Runs a save to completion against `persistence`.
    pub async fn save_changes<P: Persistence + ?Sized>(
        &mut self,
        persistence: &P,
    ) -> Result<SaveOutcome, SaveError> {
        let pending = self.begin_save()?;
        let result = persistence.save(&pending.endpoint, &pending.payload).await;
        Ok(self.complete_save(pending.ticket, result))
    }

    /// Reverts the active region, then leaves edit mode entirely.
    pub fn cancel_edit(&mut self) {
        if self.active.is_some() {
            self.toasts.show("Changes discarded", Severity::Info);
        }
        self.leave_edit_mode();
    }

    /// Routes a toolbar command to the active content region.
    pub fn apply_format(&mut self, command: FormatCommand, value: Option<&str>) -> bool {
        let Some(toolbar) = &self.rich_toolbar else {
            return false;
        };
        toolbar.apply(command, &mut self.surface, value)
    }

    /// Switching regions silently drops the unsaved edits of the one left.
    fn switch_discard(&mut self) {
        if let Some(region) = self.active_region() {
            tracing::info!(%region, "switching regions, unsaved changes discarded");
        }
        self.discard_active();
    }

    fn leave_edit_mode(&mut self) {
        self.discard_active();
        self.global_edit_mode = false;
        for id in self.surface.regions() {
            self.surface.set_marker(id, Marker::EditableHover, false);
            self.surface.set_marker(id, Marker::EditingActive, false);
        }
        self.status.clear();
        tracing::info!("edit mode off");
    }

    /// The no-save stop sequence: restore the snapshot, end native editing,
    /// drop markers and the rich toolbar, clear the active edit.
    fn discard_active(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.surface.set_markup(active.region, &active.snapshot);
        self.surface.set_editable(active.region, false);
        self.surface
            .set_marker(active.region, Marker::EditingActive, false);
        self.rich_toolbar = None;
    }

    fn fail_save(&mut self, err: &SaveError) {
        self.status = STATUS_SAVE_FAILED.to_string();
        self.toasts
            .show(format!("Error saving: {err}"), Severity::Error);
        if let Some(active) = &self.active {
            self.surface.set_markup(active.region, &active.snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentSurface;
    use crate::persistence::ResourceKind;
    use crate::rich_text::BlockFormat;
    use crate::toast::ToastMessage;

    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;

    const PAGE: &str = r#"<body data-content-id="5">
        <h1 data-editable="title">Hello</h1>
        <div data-editable="content"><p>Body</p></div>
        <aside data-editable="sidebar">Side</aside>
    </body>"#;

    const TITLE: RegionId = RegionId(0);
    const CONTENT: RegionId = RegionId(1);
    const SIDEBAR: RegionId = RegionId(2);

    fn context(content_id: Option<&str>) -> PageContext {
        PageContext {
            kind: ResourceKind::Post,
            content_id: content_id.map(str::to_string),
            staff_user: true,
            csrf_token: None,
        }
    }

    fn session() -> EditSession<DocumentSurface> {
        EditSession::new(DocumentSurface::from_html(PAGE), context(Some("5")))
    }

    fn last_toast(session: &EditSession<DocumentSurface>) -> ToastMessage {
        session.toasts().latest().cloned().expect("a toast")
    }

    fn retype(session: &mut EditSession<DocumentSurface>, region: RegionId, text: &str) {
        session.surface_mut().select_all(region);
        session.surface_mut().insert_str(region, text);
    }

    struct Canned {
        result: Result<SaveReceipt, PersistError>,
        calls: Mutex<Vec<(String, SavePayload)>>,
    }

    impl Canned {
        fn new(result: Result<SaveReceipt, PersistError>) -> Self {
            Self {
                result,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Persistence for Canned {
        async fn save(
            &self,
            endpoint: &str,
            payload: &SavePayload,
        ) -> Result<SaveReceipt, PersistError> {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), payload.clone()));
            self.result.clone()
        }
    }

    #[test]
    fn starts_viewing_and_toggles_through_mode_on() {
        let mut s = session();
        assert_eq!(s.state(), SessionState::Viewing);

        s.toggle_global_mode();
        assert_eq!(s.state(), SessionState::ModeOn);
        assert_eq!(s.status(), STATUS_MODE_ON);
        assert!(s.surface().has_marker(TITLE, Marker::EditableHover));
        assert!(s.surface().has_marker(SIDEBAR, Marker::EditableHover));

        s.toggle_global_mode();
        assert_eq!(s.state(), SessionState::Viewing);
        assert_eq!(s.status(), "");
        assert!(!s.surface().has_marker(TITLE, Marker::EditableHover));
    }

    #[test]
    fn clicking_outside_edit_mode_does_nothing() {
        let mut s = session();
        assert!(!s.start_editing(TITLE));
        assert_eq!(s.active_region(), None);
        assert!(!s.surface().is_editable(TITLE));
    }

    #[test]
    fn start_editing_captures_snapshot_and_marks_region() {
        let mut s = session();
        s.toggle_global_mode();
        assert!(s.start_editing(TITLE));

        assert_eq!(s.state(), SessionState::Editing);
        assert_eq!(s.snapshot(), Some("Hello"));
        assert!(s.surface().is_editable(TITLE));
        assert!(s.surface().has_marker(TITLE, Marker::EditingActive));
        assert_eq!(s.surface().focused(), Some(TITLE));
        assert!(s.rich_toolbar().is_none());
        assert_eq!(s.status(), "Editing title - Ctrl+S to save, Ctrl+Esc to cancel");
    }

    #[test]
    fn only_content_regions_get_the_rich_toolbar() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(CONTENT);
        assert_eq!(s.rich_toolbar().map(|t| t.region()), Some(CONTENT));

        s.start_editing(TITLE);
        assert!(s.rich_toolbar().is_none());
    }

    #[test]
    fn switching_regions_discards_unsaved_changes() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        retype(&mut s, TITLE, "Changed");

        s.start_editing(CONTENT);
        assert_eq!(s.surface().markup(TITLE).as_deref(), Some("Hello"));
        assert!(!s.surface().is_editable(TITLE));
        assert!(!s.surface().has_marker(TITLE, Marker::EditingActive));
        assert_eq!(s.active_region(), Some(CONTENT));
        assert_eq!(s.snapshot(), Some("<p>Body</p>"));
    }

    #[test]
    fn reclicking_the_active_region_refreshes_its_snapshot() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        retype(&mut s, TITLE, "Typed");
        assert!(s.start_editing(TITLE));
        assert_eq!(s.active_region(), Some(TITLE));
        assert_eq!(s.snapshot(), Some("Typed"));
        assert_eq!(s.surface().markup(TITLE).as_deref(), Some("Typed"));
        assert!(s.rich_toolbar().is_none());

        s.cancel_edit();
        assert_eq!(s.surface().markup(TITLE).as_deref(), Some("Typed"));
    }

    #[test]
    fn toggling_off_discards_the_active_edit() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(CONTENT);
        retype(&mut s, CONTENT, "draft");

        s.toggle_global_mode();
        assert_eq!(s.state(), SessionState::Viewing);
        assert_eq!(s.surface().markup(CONTENT).as_deref(), Some("<p>Body</p>"));
        assert!(s.rich_toolbar().is_none());
        assert!(s.snapshot().is_none());
    }

    #[test]
    fn cancel_without_changes_round_trips_and_exits_mode() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        s.cancel_edit();

        assert_eq!(s.state(), SessionState::Viewing);
        assert_eq!(s.surface().markup(TITLE).as_deref(), Some("Hello"));
        assert_eq!(last_toast(&s).text, "Changes discarded");
        assert_eq!(last_toast(&s).severity, Severity::Info);
    }

    #[test]
    fn cancel_twice_is_the_same_as_once() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        retype(&mut s, TITLE, "Nope");
        s.cancel_edit();
        let toasts = s.toasts().len();

        s.cancel_edit();
        assert_eq!(s.state(), SessionState::Viewing);
        assert_eq!(s.toasts().len(), toasts);
        assert_eq!(s.surface().markup(TITLE).as_deref(), Some("Hello"));
    }

    #[test]
    fn cancel_in_mode_on_still_turns_mode_off() {
        let mut s = session();
        s.toggle_global_mode();
        s.cancel_edit();
        assert!(!s.is_edit_mode());
        assert!(s.toasts().is_empty());
    }

    #[test]
    fn save_without_active_region_warns() {
        let mut s = session();
        assert_eq!(s.begin_save(), Err(SaveError::NoActiveRegion));
        assert_eq!(last_toast(&s).text, "No content being edited");
        assert_eq!(last_toast(&s).severity, Severity::Warning);
    }

    #[test]
    fn unknown_content_type_fails_before_any_request() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(SIDEBAR);
        retype(&mut s, SIDEBAR, "edited");

        let err = s.begin_save().unwrap_err();
        assert_eq!(err, SaveError::UnknownContentType("sidebar".into()));
        assert_eq!(last_toast(&s).text, "Error saving: Unknown content type");
        assert_eq!(s.surface().markup(SIDEBAR).as_deref(), Some("Side"));
        assert_eq!(s.state(), SessionState::Editing);
        assert_eq!(s.status(), STATUS_SAVE_FAILED);
    }

    #[test]
    fn missing_content_id_fails_locally() {
        let mut s = EditSession::new(DocumentSurface::from_html(PAGE), context(None));
        s.toggle_global_mode();
        s.start_editing(TITLE);
        assert_eq!(s.begin_save(), Err(SaveError::MissingContentId));
        assert_eq!(s.state(), SessionState::Editing);
    }

    #[test]
    fn pending_save_targets_the_post_endpoint() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        retype(&mut s, TITLE, "Hi");

        let pending = s.begin_save().unwrap();
        assert_eq!(pending.endpoint, "/blog/edit/post/5/");
        assert_eq!(pending.payload.get("title"), Some("Hi"));
        assert_eq!(pending.ticket.markup, "Hi");
        assert_eq!(s.status(), STATUS_SAVING);
    }

    #[tokio::test]
    async fn successful_save_updates_snapshot_and_stays_editing() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        retype(&mut s, TITLE, "Hi");

        let backend = Canned::new(Ok(SaveReceipt { message: None }));
        let outcome = s.save_changes(&backend).await;

        assert_eq!(outcome, Ok(SaveOutcome::Saved));
        assert_eq!(s.surface().markup(TITLE).as_deref(), Some("Hi"));
        assert_eq!(s.snapshot(), Some("Hi"));
        assert_eq!(s.state(), SessionState::Editing);
        assert_eq!(last_toast(&s).severity, Severity::Success);
        assert_eq!(s.status(), STATUS_SAVED);
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_save_reverts_and_reports_reason() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        retype(&mut s, TITLE, "Hi");

        let backend = Canned::new(Err(PersistError::Rejected("Permission denied".into())));
        let outcome = s.save_changes(&backend).await;

        assert_eq!(outcome, Ok(SaveOutcome::Reverted));
        assert_eq!(s.surface().markup(TITLE).as_deref(), Some("Hello"));
        assert_eq!(s.snapshot(), Some("Hello"));
        assert_eq!(s.state(), SessionState::Editing);
        let toast = last_toast(&s);
        assert_eq!(toast.severity, Severity::Error);
        assert!(toast.text.contains("Permission denied"));
    }

    #[test]
    fn result_for_a_region_no_longer_active_is_dropped() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        retype(&mut s, TITLE, "Hi");
        let pending = s.begin_save().unwrap();

        s.start_editing(CONTENT);
        retype(&mut s, CONTENT, "new body");
        let outcome = s.complete_save(
            pending.ticket,
            Err(PersistError::Transport("connection reset".into())),
        );

        assert_eq!(outcome, SaveOutcome::Stale);
        assert_eq!(s.surface().markup(CONTENT).as_deref(), Some("new body"));
        assert_eq!(s.snapshot(), Some("<p>Body</p>"));
    }

    #[test]
    fn result_for_an_earlier_activation_of_the_same_region_is_dropped() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        let pending = s.begin_save().unwrap();

        s.cancel_edit();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        retype(&mut s, TITLE, "second");

        let outcome = s.complete_save(pending.ticket, Ok(SaveReceipt { message: None }));
        assert_eq!(outcome, SaveOutcome::Stale);
        assert_eq!(s.snapshot(), Some("Hello"));
    }

    #[test]
    fn format_commands_only_reach_content_regions() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(TITLE);
        s.surface_mut().select_all(TITLE);
        assert!(!s.apply_format(FormatCommand::Bold, None));

        s.start_editing(CONTENT);
        s.surface_mut().set_caret(CONTENT, 3, false);
        s.surface_mut().set_caret(CONTENT, 7, true);
        assert!(s.apply_format(FormatCommand::FormatBlock(BlockFormat::H2), None));
        assert_eq!(s.surface().markup(CONTENT).as_deref(), Some("<h2>Body</h2>"));
        assert_eq!(s.surface().focused(), Some(CONTENT));
    }

    #[test]
    fn link_without_url_is_a_no_op() {
        let mut s = session();
        s.toggle_global_mode();
        s.start_editing(CONTENT);
        s.surface_mut().select_all(CONTENT);
        assert!(!s.apply_format(FormatCommand::CreateLink, Some("  ")));
        assert_eq!(s.surface().markup(CONTENT).as_deref(), Some("<p>Body</p>"));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Toggle,
        Click(usize),
        Type(char),
        Cancel,
        Save(bool),
        Format,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Toggle),
            (0usize..4).prop_map(Op::Click),
            any::<char>().prop_map(Op::Type),
            Just(Op::Cancel),
            any::<bool>().prop_map(Op::Save),
            Just(Op::Format),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_event_sequence(ops in prop::collection::vec(op(), 0..40)) {
            let mut s = session();
            for op in ops {
                match op {
                    Op::Toggle => s.toggle_global_mode(),
                    Op::Click(i) => { s.start_editing(RegionId(i)); }
                    Op::Type(c) => {
                        if let Some(id) = s.active_region() {
                            s.surface_mut().insert_char(id, c);
                        }
                    }
                    Op::Cancel => s.cancel_edit(),
                    Op::Save(ok) => {
                        if let Ok(pending) = s.begin_save() {
                            let result = if ok {
                                Ok(SaveReceipt { message: None })
                            } else {
                                Err(PersistError::Rejected("no".into()))
                            };
                            s.complete_save(pending.ticket, result);
                        }
                    }
                    Op::Format => {
                        if let Some(id) = s.active_region() {
                            s.surface_mut().select_all(id);
                        }
                        s.apply_format(FormatCommand::Italic, None);
                    }
                }

                // an active region always has a snapshot
                prop_assert_eq!(s.active_region().is_some(), s.snapshot().is_some());
                // at most one region is marked and editable
                let active: Vec<_> = s.surface().regions().into_iter()
                    .filter(|id| s.surface().has_marker(*id, Marker::EditingActive))
                    .collect();
                prop_assert!(active.len() <= 1);
                prop_assert_eq!(active.first().copied(), s.active_region());
                let editable = s.surface().regions().into_iter()
                    .filter(|id| s.surface().is_editable(*id))
                    .count();
                prop_assert!(editable <= 1);
                // nothing is active outside edit mode
                if !s.is_edit_mode() {
                    prop_assert!(s.active_region().is_none());
                }
                // rich toolbar lives only with an active content region
                if let Some(toolbar) = s.rich_toolbar() {
                    prop_assert_eq!(Some(toolbar.region()), s.active_region());
                }
            }
        }
    }
}
