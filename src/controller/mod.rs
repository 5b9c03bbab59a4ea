//! Per-page view controllers.
//!
//! Each page composes the viewer, the authorization policy, a
//! [`ResourceListStore`], and the API service into the call contract the
//! rendering layer drives. Auth failures come back as a login redirect;
//! anything else is an inline message near the triggering control and never
//! touches the session or unrelated state.

use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::models::{Comment, Sample, SampleFields};
use crate::api::SampleService;
use crate::identity::Viewer;
use crate::policy;
use crate::store::{LoadState, ResourceListStore};

/// What the rendering layer should do after an action settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Completed,
    /// Send the user to the login page. The session, if any, is already
    /// torn down.
    RedirectToLogin,
    /// Show this message next to the triggering control.
    Failed(String),
}

fn feedback(err: ApiError) -> ActionResult {
    if err.requires_login() {
        ActionResult::RedirectToLogin
    } else {
        ActionResult::Failed(err.to_string())
    }
}

/// Disabled-while-pending discipline, keyed per control.
///
/// A pending action refuses a duplicate submission of the same control while
/// leaving independent controls free: one comment edit can be in flight
/// while a different comment is being deleted.
#[derive(Debug, Default)]
pub struct ActionGate {
    pending: HashSet<String>,
}

impl ActionGate {
    pub fn begin(&mut self, key: &str) -> bool {
        self.pending.insert(key.to_string())
    }

    pub fn finish(&mut self, key: &str) {
        self.pending.remove(key);
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }
}

// ============================================================================
// Samples list page
// ============================================================================

pub struct SamplesPage<S: SampleService> {
    service: S,
    store: ResourceListStore<Sample>,
    gate: ActionGate,
    /// Bumped on every load/refresh; completions carrying an older
    /// generation are from an abandoned request and get discarded.
    generation: u64,
}

impl<S: SampleService> SamplesPage<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            store: ResourceListStore::new(),
            gate: ActionGate::default(),
            generation: 0,
        }
    }

    pub fn viewer(&self) -> Viewer {
        self.service.viewer()
    }

    pub fn state(&self) -> &LoadState {
        self.store.state()
    }

    pub fn samples(&self) -> &[Sample] {
        self.store.items()
    }

    /// Rows matching the search box, in fetch order. Empty query shows all.
    pub fn visible(&self, search: &str) -> Vec<&Sample> {
        let query = search.trim();
        if query.is_empty() {
            self.store.items().iter().collect()
        } else {
            self.store
                .items()
                .iter()
                .filter(|s| s.matches(query))
                .collect()
        }
    }

    pub fn can_modify(&self, sample: &Sample) -> bool {
        policy::can_modify(&self.viewer(), sample.owner_id())
    }

    /// Start a load (or explicit refresh), returning the generation token
    /// to hand back to [`complete_load`].
    ///
    /// [`complete_load`]: Self::complete_load
    pub fn begin_load(&mut self, refresh: bool) -> u64 {
        if refresh {
            self.store.begin_refresh();
        } else {
            self.store.begin_load();
        }
        self.generation += 1;
        self.generation
    }

    /// Apply a settled load. A token from a superseded load is ignored:
    /// the page has moved on and the response is stale.
    pub fn complete_load(&mut self, token: u64, result: Result<Vec<Sample>, ApiError>) {
        if token != self.generation {
            debug!(token, current = self.generation, "Discarding stale load");
            return;
        }
        match result {
            Ok(samples) => self.store.finish_load(samples),
            Err(e) => self.store.fail_load(e.to_string()),
        }
    }

    /// Fetch the collection and settle the store in one step.
    pub async fn load(&mut self) {
        let token = self.begin_load(false);
        let result = self.service.list_samples().await;
        self.complete_load(token, result);
    }

    pub async fn refresh(&mut self) {
        let token = self.begin_load(true);
        let result = self.service.list_samples().await;
        self.complete_load(token, result);
    }

    /// Upload a new sample; the confirmed resource is inserted locally
    /// without re-fetching the collection.
    pub async fn create(&mut self, fields: &SampleFields, audio: &Path) -> ActionResult {
        const KEY: &str = "create-sample";
        if !self.gate.begin(KEY) {
            return ActionResult::Failed("A sample is already being created".to_string());
        }
        let result = self.service.create_sample(fields, audio).await;
        self.gate.finish(KEY);
        match result {
            Ok(sample) => {
                self.store.insert_one(sample);
                ActionResult::Completed
            }
            Err(e) => feedback(e),
        }
    }

    /// Delete a sample the viewer is allowed to modify; on confirmation the
    /// row is removed locally.
    pub async fn delete(&mut self, id: &str) -> ActionResult {
        let Some(sample) = self.store.items().iter().find(|s| s.id == id) else {
            return ActionResult::Failed("Sample not found".to_string());
        };
        if !self.can_modify(sample) {
            return ActionResult::Failed("You are not allowed to delete this sample".to_string());
        }

        let key = format!("delete-sample:{}", id);
        if !self.gate.begin(&key) {
            return ActionResult::Failed("Delete already in progress".to_string());
        }
        let result = self.service.delete_sample(id).await;
        self.gate.finish(&key);
        match result {
            Ok(()) => {
                self.store.remove_by_id(id);
                ActionResult::Completed
            }
            Err(e) => feedback(e),
        }
    }
}

// ============================================================================
// Sample detail page
// ============================================================================

pub struct SampleDetailPage<S: SampleService> {
    service: S,
    /// The sample this page currently targets. A response for any other id
    /// belongs to a page the user already left.
    target: Option<String>,
    sample: Option<Sample>,
    comments: ResourceListStore<Comment>,
    gate: ActionGate,
}

impl<S: SampleService> SampleDetailPage<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            target: None,
            sample: None,
            comments: ResourceListStore::new(),
            gate: ActionGate::default(),
        }
    }

    pub fn viewer(&self) -> Viewer {
        self.service.viewer()
    }

    pub fn sample(&self) -> Option<&Sample> {
        self.sample.as_ref()
    }

    pub fn comments(&self) -> &[Comment] {
        self.comments.items()
    }

    pub fn state(&self) -> &LoadState {
        self.comments.state()
    }

    pub fn can_modify_sample(&self) -> bool {
        self.sample
            .as_ref()
            .is_some_and(|s| policy::can_modify(&self.viewer(), s.owner_id()))
    }

    /// Edit/delete on a comment share one policy with sample moderation.
    pub fn can_modify_comment(&self, comment: &Comment) -> bool {
        policy::can_modify(&self.viewer(), comment.owner_id())
    }

    /// Point the page at a sample and mark the fetch in flight.
    pub fn begin_load(&mut self, id: &str) {
        self.target = Some(id.to_string());
        if self.sample.is_some() {
            self.comments.begin_refresh();
        } else {
            self.comments.begin_load();
        }
    }

    /// Apply a settled fetch, unless the page has navigated elsewhere.
    pub fn complete_load(&mut self, id: &str, result: Result<Sample, ApiError>) {
        if self.target.as_deref() != Some(id) {
            debug!(id, "Discarding response for a page the user left");
            return;
        }
        match result {
            Ok(sample) => self.set_sample(sample),
            Err(e) => self.comments.fail_load(e.to_string()),
        }
    }

    pub async fn load(&mut self, id: &str) {
        self.begin_load(id);
        let result = self.service.get_sample(id).await;
        self.complete_load(id, result);
    }

    /// Replace the local sample (and its comment thread) wholesale with the
    /// server's canonical value. Never a field-by-field merge.
    fn set_sample(&mut self, sample: Sample) {
        self.comments.finish_load(sample.comments.clone());
        self.sample = Some(sample);
    }

    /// Save edited sample fields. The response replaces the local sample.
    pub async fn edit_sample(&mut self, fields: &SampleFields) -> ActionResult {
        if !self.can_modify_sample() {
            return ActionResult::Failed("You are not allowed to edit this sample".to_string());
        }
        let Some(id) = self.target.clone() else {
            return ActionResult::Failed("No sample loaded".to_string());
        };

        const KEY: &str = "edit-sample";
        if !self.gate.begin(KEY) {
            return ActionResult::Failed("Save already in progress".to_string());
        }
        let result = self.service.update_sample(&id, fields).await;
        self.gate.finish(KEY);
        match result {
            Ok(sample) => {
                self.set_sample(sample);
                ActionResult::Completed
            }
            Err(e) => feedback(e),
        }
    }

    /// Post a comment. The server answers with the entire updated sample,
    /// which replaces the local one.
    pub async fn post_comment(&mut self, text: &str) -> ActionResult {
        let text = text.trim();
        if text.is_empty() {
            return ActionResult::Failed("Comment cannot be empty".to_string());
        }
        let Some(id) = self.target.clone() else {
            return ActionResult::Failed("No sample loaded".to_string());
        };

        const KEY: &str = "post-comment";
        if !self.gate.begin(KEY) {
            return ActionResult::Failed("Comment is already being posted".to_string());
        }
        let result = self.service.add_comment(&id, text).await;
        self.gate.finish(KEY);
        match result {
            Ok(posted) => {
                if let Some(sample) = posted.sample {
                    self.set_sample(sample);
                }
                ActionResult::Completed
            }
            Err(e) => feedback(e),
        }
    }

    /// Save an edited comment; on confirmation only that comment's text is
    /// patched locally, leaving the rest of the thread untouched.
    pub async fn edit_comment(&mut self, comment_id: &str, text: &str) -> ActionResult {
        let text = text.trim().to_string();
        if text.is_empty() {
            return ActionResult::Failed("Comment cannot be empty".to_string());
        }
        let Some(comment) = self.comments.items().iter().find(|c| c.id == comment_id) else {
            return ActionResult::Failed("Comment not found".to_string());
        };
        if !self.can_modify_comment(comment) {
            return ActionResult::Failed("You are not allowed to edit this comment".to_string());
        }
        let Some(id) = self.target.clone() else {
            return ActionResult::Failed("No sample loaded".to_string());
        };

        let key = format!("edit-comment:{}", comment_id);
        if !self.gate.begin(&key) {
            return ActionResult::Failed("Edit already in progress".to_string());
        }
        let result = self.service.update_comment(&id, comment_id, &text).await;
        self.gate.finish(&key);
        match result {
            Ok(()) => {
                self.comments.patch_by_id(comment_id, |c| c.text = text);
                ActionResult::Completed
            }
            Err(e) => feedback(e),
        }
    }

    /// Delete a comment; on confirmation it is removed from the local
    /// thread without re-fetching the sample.
    pub async fn delete_comment(&mut self, comment_id: &str) -> ActionResult {
        let Some(comment) = self.comments.items().iter().find(|c| c.id == comment_id) else {
            return ActionResult::Failed("Comment not found".to_string());
        };
        if !self.can_modify_comment(comment) {
            return ActionResult::Failed(
                "You are not allowed to delete this comment".to_string(),
            );
        }
        let Some(id) = self.target.clone() else {
            return ActionResult::Failed("No sample loaded".to_string());
        };

        let key = format!("delete-comment:{}", comment_id);
        if !self.gate.begin(&key) {
            return ActionResult::Failed("Delete already in progress".to_string());
        }
        let result = self.service.delete_comment(&id, comment_id).await;
        self.gate.finish(&key);
        match result {
            Ok(()) => {
                self.comments.remove_by_id(comment_id);
                ActionResult::Completed
            }
            Err(e) => feedback(e),
        }
    }
}
