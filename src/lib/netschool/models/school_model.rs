//! School card (`schools/{id}/card`) and school search (`schools/search`) models.
use serde::{Deserialize, Serialize};

use crate::netschool::errors::NetSchoolError;

#[derive(Deserialize, Debug, Serialize, PartialEq, Clone)]
pub struct ShortSchool {
    pub name: String,
    pub id: i64,
    #[serde(rename(deserialize = "addressString"))]
    pub address: String,
}

/// School card with the common, contact and management blocks flattened.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct School {
    pub name: String,
    pub about: Option<String>,
    pub address: String,
    pub email: Option<String>,
    pub site: Option<String>,
    pub phone: Option<String>,
    pub director: Option<String>,
    pub ahc: Option<String>,
    pub it: Option<String>,
    pub uvr: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchool {
    common_info: RawCommonInfo,
    contact_info: RawContactInfo,
    management_info: RawManagementInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommonInfo {
    full_school_name: String,
    about: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContactInfo {
    juridical_address: Option<String>,
    post_address: Option<String>,
    email: Option<String>,
    web: Option<String>,
    phones: Option<String>,
}

#[derive(Deserialize)]
struct RawManagementInfo {
    director: Option<String>,
    #[serde(rename = "principalAHC")]
    principal_ahc: Option<String>,
    #[serde(rename = "principalIT")]
    principal_it: Option<String>,
    #[serde(rename = "principalUVR")]
    principal_uvr: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchoolSearchEntry {
    id: i64,
    short_name: Option<String>,
}

impl School {
    pub fn from_json(body: &[u8]) -> Result<School, NetSchoolError> {
        let raw: RawSchool = serde_json::from_slice(body)?;
        let RawContactInfo {
            juridical_address,
            post_address,
            email,
            web,
            phones,
        } = raw.contact_info;
        let address = juridical_address
            .filter(|address| !address.is_empty())
            .or(post_address)
            .ok_or_else(|| {
                NetSchoolError::Deserialization(
                    "school card has neither juridical nor post address".to_owned(),
                )
            })?;

        Ok(School {
            name: raw.common_info.full_school_name,
            about: raw.common_info.about,
            address,
            email,
            site: web,
            phone: phones,
            director: raw.management_info.director,
            ahc: raw.management_info.principal_ahc,
            it: raw.management_info.principal_it,
            uvr: raw.management_info.principal_uvr,
        })
    }
}

impl ShortSchool {
    pub fn list_from_json(body: &[u8]) -> Result<Vec<ShortSchool>, NetSchoolError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Picks the id of the first school whose short name equals `school_name`.
pub fn find_school_id(body: &[u8], school_name: &str) -> Result<i64, NetSchoolError> {
    let schools: Vec<SchoolSearchEntry> = serde_json::from_slice(body)?;
    schools
        .into_iter()
        .find(|school| school.short_name.as_deref() == Some(school_name))
        .map(|school| school.id)
        .ok_or_else(|| NetSchoolError::SchoolNotFound(school_name.to_owned()))
}
