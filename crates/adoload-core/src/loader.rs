//! Hierarchy orchestrator: walks the Feature → User Story → Task tree in a
//! single strictly-sequential, depth-first pass, creating each item and
//! linking it under its parent. Failures are isolated per node — a failed
//! Feature skips its whole subtree, a failed Story skips only its Tasks,
//! and a failed link never rolls back the created child. The run as a
//! whole only fails for fatal input problems.

use crate::backlog::{Backlog, FeatureNode, StoryNode, TaskNode};
use crate::client::WorkItemClient;
use crate::error::{LoaderError, Result};
use crate::patch::{parent_link_patch, PatchBuilder};
use crate::template::{ResolvedFields, Templates};
use tracing::{info, warn};

pub const FEATURE_TYPE: &str = "Feature";
pub const USER_STORY_TYPE: &str = "User Story";
pub const TASK_TYPE: &str = "Task";

pub const ACCEPTANCE_CRITERIA_FIELD: &str = "Microsoft.VSTS.Common.AcceptanceCriteria";
pub const ACTIVITY_FIELD: &str = "Microsoft.VSTS.Common.Activity";
pub const REMAINING_WORK_FIELD: &str = "Microsoft.VSTS.Scheduling.RemainingWork";

pub const ACCEPTANCE_CRITERIA_PLACEHOLDER: &str = "Acceptance criteria to be defined";
pub const DEFAULT_ACTIVITY: &str = "Development";

pub struct Loader<'a, C: WorkItemClient> {
    client: &'a C,
    templates: Templates,
    patches: PatchBuilder,
    organization_url: String,
    project: String,
}

impl<'a, C: WorkItemClient> Loader<'a, C> {
    pub fn new(
        client: &'a C,
        templates: Templates,
        patches: PatchBuilder,
        organization_url: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            client,
            templates,
            patches,
            organization_url: organization_url.into(),
            project: project.into(),
        }
    }

    /// Process the whole backlog. Fatal only when there is nothing to do;
    /// per-node failures are logged and the remaining siblings continue.
    pub fn run(&self, backlog: &Backlog) -> Result<()> {
        if backlog.features.is_empty() {
            return Err(LoaderError::NoFeatures);
        }

        for feature in &backlog.features {
            let Some(feature_id) = self.create_feature(feature) else {
                // The whole subtree is skipped: no stories, no tasks.
                continue;
            };

            for story in &feature.user_stories {
                let Some(story_id) = self.create_story(story, feature_id) else {
                    continue;
                };

                for task in &story.tasks {
                    self.create_task(task, story_id);
                }
            }
        }

        info!("work item creation completed");
        Ok(())
    }

    fn create_feature(&self, feature: &FeatureNode) -> Option<i64> {
        info!(title = %feature.title, "creating Feature");

        let fields = self.templates.resolve(FEATURE_TYPE, feature);
        let patch =
            self.patches
                .create_patch(FEATURE_TYPE, &feature.title, &feature.description, &fields);

        match self.client.create_item(FEATURE_TYPE, &patch) {
            Ok(id) => {
                info!(title = %feature.title, id, "created Feature");
                Some(id)
            }
            Err(e) => {
                warn!(title = %feature.title, error = %e, "failed to create Feature — skipping its stories and tasks");
                None
            }
        }
    }

    fn create_story(&self, story: &StoryNode, feature_id: i64) -> Option<i64> {
        info!(title = %story.title, "creating User Story");

        let acceptance_criteria = if story.acceptance_criteria.trim().is_empty() {
            ACCEPTANCE_CRITERIA_PLACEHOLDER
        } else {
            &story.acceptance_criteria
        };

        // Built-in fields first, template fields second: a template rule
        // targeting the same path wins.
        let mut fields = ResolvedFields::new();
        fields.insert(
            ACCEPTANCE_CRITERIA_FIELD,
            serde_json::json!(self.patches.formatter().format(acceptance_criteria)),
        );
        fields.extend(self.templates.resolve(USER_STORY_TYPE, story));

        let patch = self.patches.create_patch(
            USER_STORY_TYPE,
            &story.title,
            &story.description,
            &fields,
        );

        match self.client.create_item(USER_STORY_TYPE, &patch) {
            Ok(id) => {
                info!(title = %story.title, id, "created User Story");
                self.link_to_parent(id, feature_id);
                Some(id)
            }
            Err(e) => {
                warn!(title = %story.title, error = %e, "failed to create User Story — skipping its tasks");
                None
            }
        }
    }

    fn create_task(&self, task: &TaskNode, story_id: i64) -> Option<i64> {
        info!(title = %task.title, "creating Task");

        let activity = task.activity.as_deref().unwrap_or(DEFAULT_ACTIVITY);
        let remaining_work = task.remaining_work.unwrap_or(0.0);

        let mut fields = ResolvedFields::new();
        fields.insert(ACTIVITY_FIELD, serde_json::json!(activity));
        fields.insert(REMAINING_WORK_FIELD, work_value(remaining_work));
        fields.extend(self.templates.resolve(TASK_TYPE, task));

        let patch =
            self.patches
                .create_patch(TASK_TYPE, &task.title, &task.description, &fields);

        match self.client.create_item(TASK_TYPE, &patch) {
            Ok(id) => {
                info!(title = %task.title, id, "created Task");
                self.link_to_parent(id, story_id);
                Some(id)
            }
            Err(e) => {
                warn!(title = %task.title, error = %e, "failed to create Task");
                None
            }
        }
    }

    /// Append the reverse-hierarchy relation on the child. A failed link
    /// leaves the child created but unlinked; that is logged, not retried.
    fn link_to_parent(&self, child_id: i64, parent_id: i64) -> bool {
        let patch = parent_link_patch(&self.organization_url, &self.project, parent_id);
        match self.client.update_item(child_id, &patch) {
            Ok(()) => {
                info!(child_id, parent_id, "linked child to parent");
                true
            }
            Err(e) => {
                warn!(child_id, parent_id, error = %e, "failed to add parent-child link");
                false
            }
        }
    }
}

/// Whole-number remaining work is written as an integer, matching how it
/// appears in the backlog file.
fn work_value(hours: f64) -> serde_json::Value {
    if hours.fract() == 0.0 {
        serde_json::json!(hours as i64)
    } else {
        serde_json::json!(hours)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
