/// Task request bodies
///
/// Enum and date fields arrive as raw strings so that a bad value becomes a
/// field error alongside any others instead of failing deserialization.
/// For optional fields an explicit `null` or `""` means "clear".
///
/// Unknown keys, including any client-supplied `createdBy`, are ignored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use crate::models::task::{
    normalize_tags, split_tags, Attachment, NewTask, TaskChanges, TaskPriority, TaskStatus,
};
use crate::validation::{from_validator, FieldError};

/// Tags as `"a, b"` or `["a", "b"]`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    Csv(String),
    List(Vec<String>),
}

impl TagsInput {
    pub fn normalize(&self) -> Vec<String> {
        match self {
            TagsInput::Csv(csv) => split_tags(csv),
            TagsInput::List(list) => normalize_tags(list.iter().map(String::as_str)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub filename: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Body of `POST /api/tasks` and `PUT /api/tasks/:id`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<String>,
    pub priority: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,

    pub tags: Option<TagsInput>,
    pub attachments: Option<Vec<AttachmentInput>>,
}

/// Distinguishes a missing key (`None`) from an explicit `null` (`Some(None)`)
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Validate)]
struct TaskText {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    title: Option<String>,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    description: Option<String>,
}

/// Fields after parsing; `None` means "not provided"
#[derive(Debug, Default)]
struct Checked {
    title: Option<String>,
    description: Option<Option<String>>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    due_date: Option<Option<DateTime<Utc>>>,
    assigned_to: Option<Option<Uuid>>,
    tags: Option<Vec<String>>,
    attachments: Option<Vec<Attachment>>,
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Treats `null`, `""` and whitespace as "clear", otherwise yields the trimmed text
fn clearable(value: &Option<Option<String>>) -> Option<Option<&str>> {
    value
        .as_ref()
        .map(|v| v.as_deref().map(str::trim).filter(|s| !s.is_empty()))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TaskPayload {
    fn check(&self, creating: bool) -> Result<Checked, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut checked = Checked::default();

        let title = self.title.as_deref().map(str::trim);
        let description = clearable(&self.description);

        let text = TaskText {
            title: title.map(str::to_string),
            description: description.flatten().map(str::to_string),
        };
        if let Err(e) = text.validate() {
            errors.extend(from_validator(&e));
        }
        if creating && title.map_or(true, str::is_empty) {
            errors.retain(|e: &FieldError| e.field != "title");
            errors.push(FieldError::new("title", "Title is required"));
        }
        checked.title = title.map(str::to_string);
        checked.description = description.map(|d| d.map(str::to_string));

        if let Some(raw) = non_empty(&self.status) {
            match raw.parse::<TaskStatus>() {
                Ok(status) => checked.status = Some(status),
                Err(msg) => errors.push(FieldError::new("status", msg)),
            }
        }

        if let Some(raw) = non_empty(&self.priority) {
            match raw.parse::<TaskPriority>() {
                Ok(priority) => checked.priority = Some(priority),
                Err(msg) => errors.push(FieldError::new("priority", msg)),
            }
        }

        match clearable(&self.due_date) {
            None => {}
            Some(None) => checked.due_date = Some(None),
            Some(Some(raw)) => match parse_due_date(raw) {
                Some(date) => checked.due_date = Some(Some(date)),
                None => errors.push(FieldError::new(
                    "dueDate",
                    "Due date must be an RFC 3339 timestamp or YYYY-MM-DD",
                )),
            },
        }

        match clearable(&self.assigned_to) {
            None => {}
            Some(None) => checked.assigned_to = Some(None),
            Some(Some(raw)) => match Uuid::parse_str(raw) {
                Ok(id) => checked.assigned_to = Some(Some(id)),
                Err(_) => errors.push(FieldError::new("assignedTo", "assignedTo must be a valid user id")),
            },
        }

        checked.tags = self.tags.as_ref().map(TagsInput::normalize);

        if let Some(ref inputs) = self.attachments {
            let mut attachments = Vec::with_capacity(inputs.len());
            for (i, input) in inputs.iter().enumerate() {
                let url = input.url.trim();
                let filename = input.filename.trim();
                if url.is_empty() || filename.is_empty() {
                    errors.push(FieldError::new(
                        format!("attachments[{i}]"),
                        "Attachment requires url and filename",
                    ));
                    continue;
                }
                attachments.push(Attachment {
                    url: url.to_string(),
                    filename: filename.to_string(),
                    uploaded_at: input.uploaded_at.unwrap_or_else(Utc::now),
                });
            }
            checked.attachments = Some(attachments);
        }

        if errors.is_empty() {
            Ok(checked)
        } else {
            Err(errors)
        }
    }

    /// Validates a creation request; `creator` always becomes the creator
    pub fn into_new_task(self, creator: Uuid) -> Result<NewTask, Vec<FieldError>> {
        let checked = self.check(true)?;

        Ok(NewTask {
            title: checked.title.unwrap_or_default(),
            description: checked.description.flatten(),
            status: checked.status.unwrap_or_default(),
            priority: checked.priority.unwrap_or_default(),
            due_date: checked.due_date.flatten(),
            assigned_to: checked.assigned_to.flatten(),
            created_by: creator,
            tags: checked.tags.unwrap_or_default(),
            attachments: checked.attachments.unwrap_or_default(),
        })
    }

    /// Validates a partial update
    pub fn into_changes(self) -> Result<TaskChanges, Vec<FieldError>> {
        let checked = self.check(false)?;

        Ok(TaskChanges {
            title: checked.title,
            description: checked.description,
            status: checked.status,
            priority: checked.priority,
            due_date: checked.due_date,
            assigned_to: checked.assigned_to,
            tags: checked.tags,
            attachments: checked.attachments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> TaskPayload {
        serde_json::from_value(value).unwrap()
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_create_applies_defaults() {
        let creator = Uuid::new_v4();
        let task = payload(json!({"title": "  Write tests  "}))
            .into_new_task(creator)
            .unwrap();

        assert_eq!(task.title, "Write tests");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.created_by, creator);
        assert!(task.tags.is_empty());
    }

    #[test]
    fn test_client_supplied_creator_is_ignored() {
        let creator = Uuid::new_v4();
        let task = payload(json!({"title": "Mine", "createdBy": Uuid::new_v4()}))
            .into_new_task(creator)
            .unwrap();

        assert_eq!(task.created_by, creator);
    }

    #[test]
    fn test_reports_every_violated_field() {
        let errors = payload(json!({
            "title": "ab",
            "description": "x".repeat(501),
            "status": "done",
            "priority": "urgent",
            "assignedTo": "not-a-uuid",
            "dueDate": "next tuesday",
            "attachments": [{"url": "", "filename": "a.png"}]
        }))
        .into_new_task(Uuid::new_v4())
        .unwrap_err();

        let mut names = fields(&errors);
        names.sort();
        assert_eq!(
            names,
            vec!["assignedTo", "attachments[0]", "description", "dueDate", "priority", "status", "title"]
        );
    }

    #[test]
    fn test_missing_title_on_create() {
        let errors = payload(json!({"description": "no title"}))
            .into_new_task(Uuid::new_v4())
            .unwrap_err();
        assert_eq!(errors, vec![FieldError::new("title", "Title is required")]);

        let errors = payload(json!({"title": "   "}))
            .into_new_task(Uuid::new_v4())
            .unwrap_err();
        assert_eq!(fields(&errors), vec!["title"]);
    }

    #[test]
    fn test_tags_from_csv_and_list() {
        let from_csv = payload(json!({"title": "Tags", "tags": "urgent, frontend"}))
            .into_new_task(Uuid::new_v4())
            .unwrap();
        assert_eq!(from_csv.tags, vec!["urgent", "frontend"]);

        let from_list = payload(json!({"title": "Tags", "tags": ["urgent", " urgent ", "", "api"]}))
            .into_new_task(Uuid::new_v4())
            .unwrap();
        assert_eq!(from_list.tags, vec!["urgent", "api"]);
    }

    #[test]
    fn test_update_distinguishes_absent_from_cleared() {
        let changes = payload(json!({"status": "completed"})).into_changes().unwrap();
        assert_eq!(changes.status, Some(TaskStatus::Completed));
        assert!(changes.title.is_none());
        assert!(changes.assigned_to.is_none());
        assert!(changes.due_date.is_none());

        let changes = payload(json!({"assignedTo": null, "dueDate": "", "description": null}))
            .into_changes()
            .unwrap();
        assert_eq!(changes.assigned_to, Some(None));
        assert_eq!(changes.due_date, Some(None));
        assert_eq!(changes.description, Some(None));
    }

    #[test]
    fn test_update_rejects_short_title() {
        let errors = payload(json!({"title": "no"})).into_changes().unwrap_err();
        assert_eq!(fields(&errors), vec!["title"]);
    }

    #[test]
    fn test_due_date_formats() {
        assert!(parse_due_date("2025-03-01").is_some());
        assert!(parse_due_date("2025-03-01T09:30:00Z").is_some());
        assert!(parse_due_date("2025-03-01T09:30:00+02:00").is_some());
        assert!(parse_due_date("03/01/2025").is_none());
    }

    #[test]
    fn test_attachment_defaults_upload_time() {
        let task = payload(json!({
            "title": "With file",
            "attachments": [{"url": "https://files.example.com/a.png", "filename": "a.png"}]
        }))
        .into_new_task(Uuid::new_v4())
        .unwrap();

        assert_eq!(task.attachments.len(), 1);
        assert_eq!(task.attachments[0].filename, "a.png");
    }
}
