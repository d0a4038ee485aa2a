//! JSON-patch document assembly for work item creation and parent-child
//! linking. Pure: no I/O, no network; every value is taken as already
//! resolved.

use crate::format::TextFormatter;
use crate::template::ResolvedFields;
use serde::{Deserialize, Serialize};

pub const PARENT_LINK_REL: &str = "System.LinkTypes.Hierarchy-Reverse";

// ---------------------------------------------------------------------------
// PatchOperation
// ---------------------------------------------------------------------------

/// One entry of an `application/json-patch+json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    pub value: serde_json::Value,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: "add".to_string(),
            path: path.into(),
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// PatchBuilder
// ---------------------------------------------------------------------------

/// Builds create-patch documents with the fixed built-in field prefix
/// (title, type, description, area, iteration) followed by resolved
/// template fields in mapping order.
#[derive(Debug, Clone)]
pub struct PatchBuilder {
    pub area_path: String,
    pub iteration_path: String,
    formatter: TextFormatter,
}

impl PatchBuilder {
    pub fn new(
        area_path: impl Into<String>,
        iteration_path: impl Into<String>,
        formatter: TextFormatter,
    ) -> Self {
        Self {
            area_path: area_path.into(),
            iteration_path: iteration_path.into(),
            formatter,
        }
    }

    pub fn formatter(&self) -> &TextFormatter {
        &self.formatter
    }

    pub fn create_patch(
        &self,
        work_item_type: &str,
        title: &str,
        description: &str,
        extra: &ResolvedFields,
    ) -> Vec<PatchOperation> {
        let mut document = vec![
            PatchOperation::add("/fields/System.Title", serde_json::json!(title)),
            PatchOperation::add(
                "/fields/System.WorkItemType",
                serde_json::json!(work_item_type),
            ),
            PatchOperation::add(
                "/fields/System.Description",
                serde_json::json!(self.formatter.format(description)),
            ),
            PatchOperation::add("/fields/System.AreaPath", serde_json::json!(self.area_path)),
            PatchOperation::add(
                "/fields/System.IterationPath",
                serde_json::json!(self.iteration_path),
            ),
        ];

        for (path, value) in extra.iter() {
            document.push(PatchOperation::add(
                format!("/fields/{path}"),
                value.clone(),
            ));
        }

        document
    }
}

/// The single append-a-relation operation that places a child under its
/// parent, addressed by the parent's id within the target project.
pub fn parent_link_patch(
    organization_url: &str,
    project: &str,
    parent_id: i64,
) -> Vec<PatchOperation> {
    let url = format!(
        "{}/{}/_apis/wit/workItems/{}",
        organization_url.trim_end_matches('/'),
        project,
        parent_id
    );
    vec![PatchOperation::add(
        "/relations/-",
        serde_json::json!({
            "rel": PARENT_LINK_REL,
            "url": url,
            "attributes": {
                "comment": "Parent-child link created by work item loader"
            }
        }),
    )]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PatchBuilder {
        PatchBuilder::new("Proj\\Area", "Proj\\Sprint 1", TextFormatter::new(false))
    }

    #[test]
    fn create_patch_emits_builtins_in_fixed_order() {
        let patch = builder().create_patch("Feature", "Login", "Sign-in flow", &ResolvedFields::new());
        let paths: Vec<&str> = patch.iter().map(|op| op.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/fields/System.Title",
                "/fields/System.WorkItemType",
                "/fields/System.Description",
                "/fields/System.AreaPath",
                "/fields/System.IterationPath",
            ]
        );
        assert!(patch.iter().all(|op| op.op == "add"));
        assert_eq!(patch[0].value, serde_json::json!("Login"));
        assert_eq!(patch[1].value, serde_json::json!("Feature"));
        assert_eq!(patch[3].value, serde_json::json!("Proj\\Area"));
    }

    #[test]
    fn extra_fields_append_in_mapping_order() {
        let mut extra = ResolvedFields::new();
        extra.insert("Microsoft.VSTS.Common.Priority", serde_json::json!(2));
        extra.insert("System.Tags", serde_json::json!("backend"));

        let patch = builder().create_patch("Task", "T", "", &extra);
        assert_eq!(patch.len(), 7);
        assert_eq!(patch[5].path, "/fields/Microsoft.VSTS.Common.Priority");
        assert_eq!(patch[5].value, serde_json::json!(2));
        assert_eq!(patch[6].path, "/fields/System.Tags");
    }

    #[test]
    fn patch_serializes_as_json_patch() {
        let patch = vec![PatchOperation::add("/fields/System.Title", serde_json::json!("x"))];
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"[{"op":"add","path":"/fields/System.Title","value":"x"}]"#);
    }

    #[test]
    fn parent_link_targets_parent_id() {
        let patch = parent_link_patch("https://dev.azure.com/org", "Proj", 42);
        assert_eq!(patch.len(), 1);
        assert_eq!(patch[0].path, "/relations/-");
        assert_eq!(patch[0].value["rel"], serde_json::json!(PARENT_LINK_REL));
        assert_eq!(
            patch[0].value["url"],
            serde_json::json!("https://dev.azure.com/org/Proj/_apis/wit/workItems/42")
        );
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn description_runs_through_formatter() {
        let b = PatchBuilder::new("A", "I", TextFormatter::new(true));
        let patch = b.create_patch("Feature", "t", "some *markdown*", &ResolvedFields::new());
        assert!(patch[2].value.as_str().unwrap().contains("<em>markdown</em>"));
    }
}
