use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::netschool::{errors::NetSchoolError, helpers::deserialize_date_time};

#[derive(Deserialize, Debug, Serialize, PartialEq, Clone)]
pub struct Attachment {
    pub id: i64,
    #[serde(rename(deserialize = "originalFileName"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Serialize, PartialEq, Clone)]
pub struct Author {
    pub id: i64,
    #[serde(rename(deserialize = "fio"))]
    pub full_name: String,
    #[serde(rename(deserialize = "nickName"))]
    pub nickname: String,
}

#[derive(Deserialize, Debug, Serialize, PartialEq, Clone)]
pub struct Announcement {
    pub name: String,
    pub author: Author,
    #[serde(rename(deserialize = "description"))]
    pub content: String,
    #[serde(
        rename(deserialize = "postDate"),
        deserialize_with = "deserialize_date_time"
    )]
    pub post_date: NaiveDateTime,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// One entry of the `get-attachments` answer, there is one per requested assignment.
#[derive(Deserialize)]
struct AttachmentGroup {
    attachments: Vec<Attachment>,
}

impl Announcement {
    pub fn list_from_json(body: &[u8]) -> Result<Vec<Announcement>, NetSchoolError> {
        Ok(serde_json::from_slice(body)?)
    }
}

impl Attachment {
    /// An empty answer means the assignment has no attachments at all.
    pub fn list_from_json(body: &[u8]) -> Result<Vec<Attachment>, NetSchoolError> {
        let groups: Vec<AttachmentGroup> = serde_json::from_slice(body)?;
        Ok(groups
            .into_iter()
            .next()
            .map(|group| group.attachments)
            .unwrap_or_default())
    }
}
