use std::time::Duration;

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{
    errors::NetSchoolError,
    helpers::{encode_password, form_value, week_bounds},
    models::{
        announcement_model::{Announcement, Attachment},
        diary_model::{Assignment, AssignmentTypes, Diary},
        school_model::{find_school_id, School, ShortSchool},
    },
    requester::{ClientWrapper, RawResponse, RequestSpec, RequestTimeout, DEFAULT_TRANSPORT_TIMEOUT},
};

const DEFAULT_SCHOOLS_SEARCH: &str = "У";
const DEFAULT_AUTH_ERROR: &str = "wrong login, password or school";
const LOGIN_FIRST: &str = ".login() before making requests that need authorization";

/// A school given either by its numeric id or by its short name.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SchoolRef {
    Id(i64),
    Name(String),
}

impl From<i64> for SchoolRef {
    fn from(id: i64) -> Self {
        SchoolRef::Id(id)
    }
}

impl From<&str> for SchoolRef {
    fn from(name: &str) -> Self {
        SchoolRef::Name(name.to_owned())
    }
}

impl From<String> for SchoolRef {
    fn from(name: String) -> Self {
        SchoolRef::Name(name)
    }
}

/// Authenticated context against the diary: token, identifiers of the
/// student and the assignment type names. Replaced as a whole on every login.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub student_id: i64,
    pub year_id: i64,
    pub school_id: i64,
    pub assignment_types: AssignmentTypes,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            access_token: None,
            student_id: -1,
            year_id: -1,
            school_id: -1,
            assignment_types: AssignmentTypes::new(),
        }
    }
}

/// Kept after a successful login only to log in again when the token dies.
#[derive(Clone)]
struct Credentials {
    user_name: String,
    password: String,
    school: SchoolRef,
}

#[derive(Deserialize)]
struct AuthResult {
    at: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiaryInit {
    students: Vec<StudentRef>,
    current_student_id: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudentRef {
    student_id: i64,
}

#[derive(Deserialize)]
struct YearRef {
    id: i64,
}

#[derive(Deserialize)]
struct AssignmentTypeRef {
    id: i64,
    name: String,
}

/// One session against one NetSchool instance.
///
/// Calls that may log in again take `&mut self`, so calls on one client are
/// serialized by the borrow checker. [`NetSchoolApi::full_logout`] consumes
/// the client and releases its connection pools.
pub struct NetSchoolApi {
    wrapped_client: ClientWrapper,
    session: Session,
    login_data: Option<Credentials>,
}

impl NetSchoolApi {
    /// `url` is the diary address without `/webapi`, a trailing slash is ignored.
    pub fn new(
        url: &str,
        default_requests_timeout: Option<RequestTimeout>,
    ) -> Result<Self, NetSchoolError> {
        Self::with_transport_timeout(url, default_requests_timeout, DEFAULT_TRANSPORT_TIMEOUT)
    }

    pub fn with_transport_timeout(
        url: &str,
        default_requests_timeout: Option<RequestTimeout>,
        transport_timeout: Duration,
    ) -> Result<Self, NetSchoolError> {
        Ok(NetSchoolApi {
            wrapped_client: ClientWrapper::new(url, default_requests_timeout, transport_timeout)?,
            session: Session::default(),
            login_data: None,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.access_token.is_some()
    }

    pub async fn login(
        &mut self,
        user_name: &str,
        password: &str,
        school: impl Into<SchoolRef>,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<(), NetSchoolError> {
        let credentials = Credentials {
            user_name: user_name.to_owned(),
            password: password.to_owned(),
            school: school.into(),
        };
        self.login_with(credentials, requests_timeout).await
    }

    async fn login_with(
        &mut self,
        credentials: Credentials,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<(), NetSchoolError> {
        info!(
            "Logging in to {} as {}",
            self.wrapped_client.base_url(),
            credentials.user_name
        );
        let client = &self.wrapped_client;
        client
            .request(requests_timeout, &RequestSpec::get("logindata"), None, false)
            .await?;

        let mut login_meta: Map<String, Value> = client
            .request(requests_timeout, &RequestSpec::post("auth/getdata"), None, false)
            .await?
            .json()?;
        let salt = match login_meta.remove("salt") {
            Some(Value::String(salt)) => salt,
            Some(salt) => salt.to_string(),
            None => {
                return Err(NetSchoolError::Deserialization(
                    "login data has no salt".to_owned(),
                ))
            }
        };
        let (pw2, pw) = encode_password(&credentials.password, &salt);

        let school_id = match &credentials.school {
            SchoolRef::Id(id) => *id,
            SchoolRef::Name(name) => self.get_school_id(name, requests_timeout).await?,
        };

        let mut form = vec![
            ("loginType".to_owned(), "1".to_owned()),
            ("scid".to_owned(), school_id.to_string()),
            ("un".to_owned(), credentials.user_name.clone()),
            ("pw".to_owned(), pw),
            ("pw2".to_owned(), pw2),
        ];
        form.extend(
            login_meta
                .into_iter()
                .map(|(key, value)| (key, form_value(value))),
        );

        let auth_response = match client
            .request(requests_timeout, &RequestSpec::post("login").form(form), None, false)
            .await
        {
            Err(NetSchoolError::Status { status, body }) if status == StatusCode::CONFLICT => {
                return Err(NetSchoolError::Auth(conflict_message(&body)));
            }
            other => other?,
        };
        let auth_result: AuthResult = auth_response.json()?;
        let Some(access_token) = auth_result.at else {
            return Err(NetSchoolError::Auth(
                auth_result
                    .message
                    .unwrap_or_else(|| DEFAULT_AUTH_ERROR.to_owned()),
            ));
        };
        let token = Some(access_token.as_str());

        let diary_info: DiaryInit = client
            .request(requests_timeout, &RequestSpec::get("student/diary/init"), token, false)
            .await?
            .json()?;
        let student_id = diary_info
            .students
            .get(diary_info.current_student_id)
            .map(|student| student.student_id)
            .ok_or_else(|| {
                NetSchoolError::Deserialization(format!(
                    "diary init has no student number {}",
                    diary_info.current_student_id
                ))
            })?;

        let year: YearRef = client
            .request(requests_timeout, &RequestSpec::get("years/current"), token, false)
            .await?
            .json()?;

        let assignment_types: Vec<AssignmentTypeRef> = client
            .request(
                requests_timeout,
                &RequestSpec::get("grade/assignment/types").query("all", false),
                token,
                false,
            )
            .await?
            .json()?;
        debug!("Got {} assignment types", assignment_types.len());

        self.session = Session {
            access_token: Some(access_token),
            student_id,
            year_id: year.id,
            school_id,
            assignment_types: assignment_types
                .into_iter()
                .map(|assignment_type| (assignment_type.id, assignment_type.name))
                .collect(),
        };
        info!(
            "Logged in as {}, student {}, year {}",
            credentials.user_name, student_id, year.id
        );
        self.login_data = Some(credentials);
        Ok(())
    }

    /// Sends `spec` with the current token. A 401 answer triggers one new login
    /// with the cached credentials and one retry of the same call.
    pub async fn request(
        &mut self,
        requests_timeout: Option<RequestTimeout>,
        spec: RequestSpec,
        follow_redirects: bool,
    ) -> Result<RawResponse, NetSchoolError> {
        match self
            .wrapped_client
            .request(
                requests_timeout,
                &spec,
                self.session.access_token.as_deref(),
                follow_redirects,
            )
            .await
        {
            Err(err) if err.is_unauthorized() => {
                let Some(credentials) = self.login_data.clone() else {
                    return Err(NetSchoolError::Auth(LOGIN_FIRST.to_owned()));
                };
                warn!(
                    "Session expired on {} {}, logging in again",
                    spec.method, spec.path
                );
                self.login_with(credentials, None).await?;
                self.wrapped_client
                    .request(
                        requests_timeout,
                        &spec,
                        self.session.access_token.as_deref(),
                        follow_redirects,
                    )
                    .await
            }
            other => other,
        }
    }

    pub async fn download_attachment<W>(
        &mut self,
        attachment_id: i64,
        buffer: &mut W,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<(), NetSchoolError>
    where
        W: AsyncWrite + Unpin,
    {
        let spec = RequestSpec::get(format!("attachments/{}", attachment_id));
        let response = self.request(requests_timeout, spec, false).await?;
        buffer.write_all(&response.body).await?;
        Ok(())
    }

    /// Lessons of the `[start, end]` window, which defaults to the current
    /// week from Monday to Saturday.
    pub async fn diary(
        &mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<Diary, NetSchoolError> {
        let spec = self.week_request("student/diary", start, end);
        let response = self.request(requests_timeout, spec, false).await?;
        Diary::from_json(&response.body, &self.session.assignment_types)
    }

    pub async fn overdue(
        &mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<Vec<Assignment>, NetSchoolError> {
        let spec = self.week_request("student/diary/pastMandatory", start, end);
        let response = self.request(requests_timeout, spec, false).await?;
        Assignment::list_from_json(&response.body, &self.session.assignment_types)
    }

    /// `take` of `None` asks for every announcement.
    pub async fn announcements(
        &mut self,
        take: Option<i64>,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<Vec<Announcement>, NetSchoolError> {
        let spec = RequestSpec::get("announcements").query("take", take.unwrap_or(-1));
        let response = self.request(requests_timeout, spec, false).await?;
        Announcement::list_from_json(&response.body)
    }

    pub async fn attachments(
        &mut self,
        assignment_id: i64,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<Vec<Attachment>, NetSchoolError> {
        let spec = RequestSpec::post("student/diary/get-attachments")
            .query("studentId", self.session.student_id)
            .json(json!({ "assignId": [assignment_id] }));
        let response = self.request(requests_timeout, spec, false).await?;
        Attachment::list_from_json(&response.body)
    }

    pub async fn school(
        &mut self,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<School, NetSchoolError> {
        let spec = RequestSpec::get(format!("schools/{}/card", self.session.school_id));
        let response = self.request(requests_timeout, spec, false).await?;
        School::from_json(&response.body)
    }

    /// Ends the session on the server. A 401 answer means it is dead already.
    pub async fn logout(
        &self,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<(), NetSchoolError> {
        match self
            .wrapped_client
            .request(
                requests_timeout,
                &RequestSpec::post("auth/logout"),
                self.session.access_token.as_deref(),
                false,
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.is_unauthorized() => {
                debug!("Session is dead already, nothing to log out from");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn full_logout(
        self,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<(), NetSchoolError> {
        self.logout(requests_timeout).await?;
        info!("Closing connections to {}", self.wrapped_client.base_url());
        Ok(())
    }

    /// Schools whose name contains "У", which is most of them.
    pub async fn schools(
        &self,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<Vec<ShortSchool>, NetSchoolError> {
        self.search_schools(DEFAULT_SCHOOLS_SEARCH, requests_timeout)
            .await
    }

    pub async fn search_schools(
        &self,
        name: &str,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<Vec<ShortSchool>, NetSchoolError> {
        let response = self
            .wrapped_client
            .request(
                requests_timeout,
                &RequestSpec::get("schools/search").query("name", name),
                self.session.access_token.as_deref(),
                false,
            )
            .await?;
        ShortSchool::list_from_json(&response.body)
    }

    async fn get_school_id(
        &self,
        school_name: &str,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<i64, NetSchoolError> {
        let response = self
            .wrapped_client
            .request(
                requests_timeout,
                &RequestSpec::get("schools/search").query("name", school_name),
                None,
                false,
            )
            .await?;
        let school_id = find_school_id(&response.body, school_name)?;
        debug!("School {:?} has id {}", school_name, school_id);
        Ok(school_id)
    }

    pub async fn download_profile_picture<W>(
        &mut self,
        user_id: i64,
        buffer: &mut W,
        requests_timeout: Option<RequestTimeout>,
    ) -> Result<(), NetSchoolError>
    where
        W: AsyncWrite + Unpin,
    {
        let spec = RequestSpec::get("users/photo")
            .query("at", self.session.access_token.as_deref().unwrap_or_default())
            .query("userId", user_id);
        let response = self.request(requests_timeout, spec, true).await?;
        buffer.write_all(&response.body).await?;
        Ok(())
    }

    fn week_request(
        &self,
        path: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> RequestSpec {
        let (start, end) = week_bounds(start, end, Local::now().date_naive());
        RequestSpec::get(path)
            .query("studentId", self.session.student_id)
            .query("yearId", self.session.year_id)
            .query("weekStart", start)
            .query("weekEnd", end)
    }
}

fn conflict_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Conflict {
        message: Option<String>,
    }

    serde_json::from_str::<Conflict>(body)
        .ok()
        .and_then(|conflict| conflict.message)
        .unwrap_or_else(|| DEFAULT_AUTH_ERROR.to_owned())
}
