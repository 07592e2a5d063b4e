use std::fs;

use chrono::NaiveDate;
use mockito::{Matcher, Mock, Server, ServerGuard};
use netschool::netschool::{NetSchoolApi, NetSchoolError};
use reqwest::StatusCode;
use serde_json::json;

const USER: &str = "ИвановИ";
const PASSWORD: &str = "123456";
const SCHOOL: &str = "МАОУ СОШ №102";
const TOKEN: &str = "token-1";

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

async fn login_data_mocks(server: &mut ServerGuard, hits: usize) -> Vec<Mock> {
    vec![
        server
            .mock("GET", "/webapi/logindata")
            .with_body("{}")
            .expect(hits)
            .create_async()
            .await,
        server
            .mock("POST", "/webapi/auth/getdata")
            .with_header("content-type", "application/json")
            .with_body(r#"{"lt": "1693814400", "ver": "987", "salt": "987654321"}"#)
            .expect(hits)
            .create_async()
            .await,
    ]
}

async fn school_search_mock(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("GET", "/webapi/schools/search")
        .match_query(Matcher::UrlEncoded("name".into(), SCHOOL.into()))
        .with_body(fixture("schools_search.json"))
        .expect(hits)
        .create_async()
        .await
}

async fn session_mocks(server: &mut ServerGuard, hits: usize) -> Vec<Mock> {
    vec![
        server
            .mock("POST", "/webapi/login")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("loginType".into(), "1".into()),
                Matcher::UrlEncoded("scid".into(), "102".into()),
                Matcher::UrlEncoded("un".into(), USER.into()),
                Matcher::UrlEncoded("pw".into(), "6ca165".into()),
                Matcher::UrlEncoded("pw2".into(), "6ca1652115a70cdc629799abfd2dd938".into()),
                Matcher::UrlEncoded("lt".into(), "1693814400".into()),
                Matcher::UrlEncoded("ver".into(), "987".into()),
            ]))
            .with_body(json!({ "at": TOKEN, "timeOut": 2700000 }).to_string())
            .expect(hits)
            .create_async()
            .await,
        server
            .mock("GET", "/webapi/student/diary/init")
            .match_header("at", TOKEN)
            .with_body(
                json!({
                    "students": [
                        { "studentId": 555, "nickName": "Иванова Мария" },
                        { "studentId": 777, "nickName": "Иванов Иван" }
                    ],
                    "currentStudentId": 1
                })
                .to_string(),
            )
            .expect(hits)
            .create_async()
            .await,
        server
            .mock("GET", "/webapi/years/current")
            .match_header("at", TOKEN)
            .with_body(r#"{"id": 2023, "name": "2023/2024"}"#)
            .expect(hits)
            .create_async()
            .await,
        server
            .mock("GET", "/webapi/grade/assignment/types")
            .match_query(Matcher::UrlEncoded("all".into(), "false".into()))
            .with_body(
                json!([
                    { "id": 1, "abbr": "ДЗ", "name": "Домашнее задание" },
                    { "id": 3, "abbr": "К", "name": "Контрольная работа" }
                ])
                .to_string(),
            )
            .expect(hits)
            .create_async()
            .await,
    ]
}

/// Every endpoint of a successful login by school name, each hit `hits` times.
async fn login_mocks(server: &mut ServerGuard, hits: usize) -> Vec<Mock> {
    let mut mocks = login_data_mocks(server, hits).await;
    mocks.push(school_search_mock(server, hits).await);
    mocks.extend(session_mocks(server, hits).await);
    mocks
}

async fn assert_all(mocks: &[Mock]) {
    for mock in mocks {
        mock.assert_async().await;
    }
}

async fn logged_in_api(server: &mut ServerGuard, login_hits: usize) -> (NetSchoolApi, Vec<Mock>) {
    let mocks = login_mocks(server, login_hits).await;
    let mut api = NetSchoolApi::new(&format!("{}/", server.url()), None).unwrap();
    api.login(USER, PASSWORD, SCHOOL, None).await.unwrap();
    (api, mocks)
}

fn diary_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("studentId".into(), "777".into()),
        Matcher::UrlEncoded("yearId".into(), "2023".into()),
        Matcher::UrlEncoded("weekStart".into(), "2023-09-04".into()),
        Matcher::UrlEncoded("weekEnd".into(), "2023-09-09".into()),
    ])
}

#[tokio::test]
async fn login_resolves_school_and_fills_session() {
    let mut server = Server::new_async().await;
    let (api, mocks) = logged_in_api(&mut server, 1).await;

    let session = api.session();
    assert!(api.is_authenticated());
    assert_eq!(session.access_token.as_deref(), Some(TOKEN));
    assert_eq!(session.student_id, 777);
    assert_eq!(session.year_id, 2023);
    assert_eq!(session.school_id, 102);
    assert_eq!(session.assignment_types.get(&3).unwrap(), "Контрольная работа");
    assert_all(&mocks).await;
}

#[tokio::test]
async fn login_with_school_id_skips_search() {
    let mut server = Server::new_async().await;
    let mut mocks = login_data_mocks(&mut server, 1).await;
    mocks.push(school_search_mock(&mut server, 0).await);
    mocks.extend(session_mocks(&mut server, 1).await);

    let mut api = NetSchoolApi::new(&server.url(), None).unwrap();
    api.login(USER, PASSWORD, 102, None).await.unwrap();

    assert_eq!(api.session().school_id, 102);
    assert_all(&mocks).await;
}

#[tokio::test]
async fn login_with_unknown_school_fails() {
    let mut server = Server::new_async().await;
    let _login_data = login_data_mocks(&mut server, 1).await;
    let search = server
        .mock("GET", "/webapi/schools/search")
        .match_query(Matcher::UrlEncoded("name".into(), "МАОУ СОШ №1".into()))
        .with_body(fixture("schools_search.json"))
        .create_async()
        .await;
    let login = server
        .mock("POST", "/webapi/login")
        .expect(0)
        .create_async()
        .await;

    let mut api = NetSchoolApi::new(&server.url(), None).unwrap();
    let err = api
        .login(USER, PASSWORD, "МАОУ СОШ №1", None)
        .await
        .unwrap_err();

    assert!(matches!(err, NetSchoolError::SchoolNotFound(name) if name == "МАОУ СОШ №1"));
    assert!(!api.is_authenticated());
    search.assert_async().await;
    login.assert_async().await;
}

#[tokio::test]
async fn login_conflict_is_auth_error() {
    let mut server = Server::new_async().await;
    let _login_data = login_data_mocks(&mut server, 1).await;
    let _search = school_search_mock(&mut server, 1).await;
    let _login = server
        .mock("POST", "/webapi/login")
        .with_status(409)
        .with_body(r#"{"message": "Неправильный пароль или имя пользователя"}"#)
        .create_async()
        .await;

    let mut api = NetSchoolApi::new(&server.url(), None).unwrap();
    let err = api.login(USER, PASSWORD, SCHOOL, None).await.unwrap_err();

    assert!(
        matches!(err, NetSchoolError::Auth(message) if message == "Неправильный пароль или имя пользователя")
    );
}

#[tokio::test]
async fn login_answer_without_token_is_auth_error() {
    let mut server = Server::new_async().await;
    let _login_data = login_data_mocks(&mut server, 1).await;
    let _search = school_search_mock(&mut server, 1).await;
    let _login = server
        .mock("POST", "/webapi/login")
        .with_body(r#"{"message": "Учётная запись заблокирована"}"#)
        .create_async()
        .await;
    let init = server
        .mock("GET", "/webapi/student/diary/init")
        .expect(0)
        .create_async()
        .await;

    let mut api = NetSchoolApi::new(&server.url(), None).unwrap();
    let err = api.login(USER, PASSWORD, SCHOOL, None).await.unwrap_err();

    assert!(matches!(err, NetSchoolError::Auth(message) if message == "Учётная запись заблокирована"));
    assert_eq!(api.session().student_id, -1);
    init.assert_async().await;
}

#[tokio::test]
async fn diary_after_login() {
    let mut server = Server::new_async().await;
    let (mut api, mocks) = logged_in_api(&mut server, 1).await;
    let diary_mock = server
        .mock("GET", "/webapi/student/diary")
        .match_query(diary_query())
        .match_header("at", TOKEN)
        .with_body(fixture("diary.json"))
        .create_async()
        .await;

    let diary = api
        .diary(Some(date(2023, 9, 4)), None, None)
        .await
        .unwrap();

    assert_eq!(diary.schedule.len(), 2);
    let test = &diary.schedule[0].lessons[0].assignments[0];
    assert_eq!(test.kind, "Контрольная работа");
    assert_eq!(test.mark, Some(5));
    diary_mock.assert_async().await;
    assert_all(&mocks).await;
}

#[tokio::test]
async fn expired_session_logs_in_again_once() {
    let mut server = Server::new_async().await;
    let (mut api, mocks) = logged_in_api(&mut server, 2).await;
    let expired = server
        .mock("GET", "/webapi/student/diary/pastMandatory")
        .match_query(diary_query())
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/webapi/student/diary/pastMandatory")
        .match_query(diary_query())
        .with_body(fixture("overdue.json"))
        .expect(1)
        .create_async()
        .await;

    let overdue = api
        .overdue(Some(date(2023, 9, 4)), Some(date(2023, 9, 9)), None)
        .await
        .unwrap();

    assert_eq!(overdue[0].content, "Сочинение");
    expired.assert_async().await;
    retried.assert_async().await;
    assert_all(&mocks).await;
}

#[tokio::test]
async fn unauthorized_without_login_is_not_retried() {
    let mut server = Server::new_async().await;
    let unauthorized = server
        .mock("GET", "/webapi/announcements")
        .match_query(Matcher::UrlEncoded("take".into(), "-1".into()))
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let login_data = server
        .mock("GET", "/webapi/logindata")
        .expect(0)
        .create_async()
        .await;

    let mut api = NetSchoolApi::new(&server.url(), None).unwrap();
    let err = api.announcements(None, None).await.unwrap_err();

    assert!(matches!(err, NetSchoolError::Auth(_)));
    unauthorized.assert_async().await;
    login_data.assert_async().await;
}

#[tokio::test]
async fn second_unauthorized_answer_is_returned() {
    let mut server = Server::new_async().await;
    let (mut api, mocks) = logged_in_api(&mut server, 2).await;
    let unauthorized = server
        .mock("GET", "/webapi/announcements")
        .match_query(Matcher::UrlEncoded("take".into(), "-1".into()))
        .with_status(401)
        .expect(2)
        .create_async()
        .await;

    let err = api.announcements(None, None).await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    unauthorized.assert_async().await;
    assert_all(&mocks).await;
}

#[tokio::test]
async fn failed_login_keeps_previous_session() {
    let mut server = Server::new_async().await;
    let mut mocks = login_data_mocks(&mut server, 2).await;
    mocks.push(school_search_mock(&mut server, 2).await);
    mocks.extend(session_mocks(&mut server, 1).await);
    /* the second login gets another token, its year lookup breaks */
    mocks.push(
        server
            .mock("POST", "/webapi/login")
            .with_body(r#"{"at": "token-2"}"#)
            .expect(1)
            .create_async()
            .await,
    );
    mocks.push(
        server
            .mock("GET", "/webapi/student/diary/init")
            .match_header("at", "token-2")
            .with_body(r#"{"students": [{"studentId": 888}], "currentStudentId": 0}"#)
            .expect(1)
            .create_async()
            .await,
    );
    mocks.push(
        server
            .mock("GET", "/webapi/years/current")
            .match_header("at", "token-2")
            .with_status(500)
            .expect(1)
            .create_async()
            .await,
    );
    let expired = server
        .mock("GET", "/webapi/announcements")
        .match_query(Matcher::UrlEncoded("take".into(), "-1".into()))
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let mut api = NetSchoolApi::new(&server.url(), None).unwrap();
    api.login(USER, PASSWORD, SCHOOL, None).await.unwrap();
    let before = api.session().clone();

    let err = api.announcements(None, None).await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(api.session(), &before);
    assert_eq!(api.session().access_token.as_deref(), Some(TOKEN));
    assert_eq!(api.session().student_id, 777);
    assert_eq!(api.session().year_id, 2023);
    assert!(api.is_authenticated());
    expired.assert_async().await;
    assert_all(&mocks).await;
}

#[tokio::test]
async fn server_error_is_propagated_without_login() {
    let mut server = Server::new_async().await;
    let (mut api, mocks) = logged_in_api(&mut server, 1).await;
    let _broken = server
        .mock("GET", "/webapi/schools/102/card")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let err = api.school(None).await.unwrap_err();

    assert!(matches!(
        err,
        NetSchoolError::Status { status, body } if status == StatusCode::INTERNAL_SERVER_ERROR && body == "Internal Server Error"
    ));
    assert_all(&mocks).await;
}

#[tokio::test]
async fn school_card_of_resolved_school() {
    let mut server = Server::new_async().await;
    let (mut api, _mocks) = logged_in_api(&mut server, 1).await;
    let _card = server
        .mock("GET", "/webapi/schools/102/card")
        .match_header("at", TOKEN)
        .with_body(fixture("school.json"))
        .create_async()
        .await;

    let school = api.school(None).await.unwrap();

    assert_eq!(school.address, "A");
    assert_eq!(school.uvr.as_deref(), Some("Кузнецова Елена Викторовна"));
}

#[tokio::test]
async fn schools_search_without_login() {
    let mut server = Server::new_async().await;
    let search = server
        .mock("GET", "/webapi/schools/search")
        .match_query(Matcher::UrlEncoded("name".into(), "У".into()))
        .with_body(fixture("schools_search.json"))
        .create_async()
        .await;

    let api = NetSchoolApi::new(&server.url(), None).unwrap();
    let schools = api.schools(None).await.unwrap();

    assert_eq!(schools.len(), 2);
    assert_eq!(schools[0].id, 88);
    search.assert_async().await;
}

#[tokio::test]
async fn attachments_of_assignment() {
    let mut server = Server::new_async().await;
    let (mut api, _mocks) = logged_in_api(&mut server, 1).await;
    let _empty = server
        .mock("POST", "/webapi/student/diary/get-attachments")
        .match_query(Matcher::UrlEncoded("studentId".into(), "777".into()))
        .match_body(Matcher::Json(json!({ "assignId": [5002] })))
        .with_body("[]")
        .create_async()
        .await;
    let _filled = server
        .mock("POST", "/webapi/student/diary/get-attachments")
        .match_query(Matcher::UrlEncoded("studentId".into(), "777".into()))
        .match_body(Matcher::Json(json!({ "assignId": [5001] })))
        .with_body(fixture("attachments.json"))
        .create_async()
        .await;

    assert!(api.attachments(5002, None).await.unwrap().is_empty());
    let attachments = api.attachments(5001, None).await.unwrap();
    assert_eq!(attachments.len(), 2);
    assert_eq!(attachments[1].name, "ответы.pdf");
}

#[tokio::test]
async fn downloads_are_written_to_buffer() {
    let mut server = Server::new_async().await;
    let (mut api, _mocks) = logged_in_api(&mut server, 1).await;
    let _attachment = server
        .mock("GET", "/webapi/attachments/7001")
        .match_header("at", TOKEN)
        .with_body(b"PK\x03\x04 docx")
        .create_async()
        .await;
    let _photo = server
        .mock("GET", "/webapi/users/photo")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("at".into(), TOKEN.into()),
            Matcher::UrlEncoded("userId".into(), "12".into()),
        ]))
        .with_status(302)
        .with_header("location", "/pictures/12.png")
        .create_async()
        .await;
    let _picture = server
        .mock("GET", "/pictures/12.png")
        .with_body(b"\x89PNG")
        .create_async()
        .await;

    let mut attachment = Vec::new();
    api.download_attachment(7001, &mut attachment, None)
        .await
        .unwrap();
    assert_eq!(attachment, b"PK\x03\x04 docx");

    let mut picture = Vec::new();
    api.download_profile_picture(12, &mut picture, None)
        .await
        .unwrap();
    assert_eq!(picture, b"\x89PNG");
}

#[tokio::test]
async fn logout_of_dead_session_succeeds() {
    let mut server = Server::new_async().await;
    let (api, _mocks) = logged_in_api(&mut server, 1).await;
    let logout = server
        .mock("POST", "/webapi/auth/logout")
        .match_header("at", TOKEN)
        .with_status(401)
        .expect(2)
        .create_async()
        .await;

    api.logout(None).await.unwrap();
    api.full_logout(None).await.unwrap();
    logout.assert_async().await;
}
