//! Integration tests: HomeloadTV API client and a full pipeline pass against
//! a local server that plays both the API and the file hosts.

mod common;

use std::fs;

use base64::{engine::general_purpose, Engine as _};
use common::http_server::{Reply, TestServer};
use hltv_core::downloader::Downloader;
use hltv_core::link_source::{
    ApiError, HomeloadTvClient, LinkSource, LinkState, StateReport, BROKEN_LINK,
};
use hltv_core::notify::LogFileNotifier;
use hltv_core::pipeline::{FailureKind, Outcome, Pipeline, PipelineSettings};
use hltv_core::recording::THUMBNAIL_SUFFIXES;
use tempfile::tempdir;

const REC: &str = "Tatort_14.01.05_20-15_ard_90_TVOON_DE";

fn client(server: &TestServer) -> HomeloadTvClient {
    HomeloadTvClient::new(server.url("/api/"), "tic@tac.toe", "pw")
}

#[test]
fn getlinks_parses_batch_and_sends_credentials() {
    let server = TestServer::start();
    server.route(
        "/api/",
        vec![Reply::text(
            "INTERVAL=5;LINKS=2;LIST=42;LINKCOUNT=7;HHSTART=2;HHEND=8;\n\
             http://h/1_a.avi;11;\n\
             http://h/2_b.avi;12;\n",
        )],
    );
    let batch = client(&server).fetch_batch(2, true, false).unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch.links[0].id, 11);
    assert_eq!(batch.links[1].url, "http://h/2_b.avi");
    assert_eq!(batch.list_id, Some(42));
    assert_eq!(batch.link_count, Some(7));
    assert_eq!(batch.happy_hour_end, Some(8));

    let q = server.requests_for("/api/")[0].query();
    assert_eq!(q["do"], "getlinks");
    assert_eq!(q["uid"], "tic@tac.toe");
    assert_eq!(q["password"], "pw");
    assert_eq!(q["limit"], "2");
    assert_eq!(q["protocnew"], "true");
    assert_eq!(q["onlyhh"], "false");
}

#[test]
fn getlinks_no_new_links_and_errors() {
    let server = TestServer::start();
    let mut api = client(&server);

    server.route("/api/", vec![Reply::text("NO_NEW_LINKS")]);
    assert!(api.fetch_batch(100, true, true).unwrap().is_empty());

    server.route("/api/", vec![Reply::text("WRONG_PASSWORD")]);
    let err = api.fetch_batch(100, true, true).unwrap_err();
    assert!(matches!(err, ApiError::Server(ref m) if m == "WRONG_PASSWORD"), "{:?}", err);

    server.route("/api/", vec![Reply::text("")]);
    assert!(matches!(
        api.fetch_batch(100, true, true),
        Err(ApiError::EmptyResponse)
    ));

    server.route("/api/", vec![Reply::status(500)]);
    assert!(matches!(
        api.fetch_batch(100, true, true),
        Err(ApiError::Http(500))
    ));
}

#[test]
fn setstate_encodes_report_and_checks_ok() {
    let server = TestServer::start();
    server.route("/api/", vec![Reply::text("OK"), Reply::text("FAILED")]);
    let mut api = client(&server);
    let report = StateReport {
        id: 9,
        state: LinkState::Damaged,
        size_kib: 3,
        speed_kbit: 40,
        error: "HTTP 404 & more".into(),
        filename: "a b.avi".into(),
    };
    assert!(api.report_state(&report).unwrap());
    assert!(!api.report_state(&report).unwrap());

    let q = server.requests_for("/api/")[0].query();
    assert_eq!(q["do"], "setstate");
    assert_eq!(q["id"], "9");
    assert_eq!(q["state"], "damaged");
    assert_eq!(q["error"], "HTTP 404 & more");
    assert_eq!(q["filesize"], "3");
    assert_eq!(q["speed"], "40");
    assert_eq!(
        general_purpose::STANDARD.decode(&q["file"]).unwrap(),
        b"a b.avi"
    );
    assert!(!q.contains_key("password"));
}

#[test]
fn set_processing_marks_list() {
    let server = TestServer::start();
    server.route("/api/", vec![Reply::text("OK\n")]);
    assert!(client(&server).set_processing(42).unwrap());
    let q = server.requests_for("/api/")[0].query();
    assert_eq!(q["state"], "processing");
    assert_eq!(q["list"], "42");
}

#[test]
fn full_pass_downloads_reports_and_logs() {
    let server = TestServer::start();
    let video: Vec<u8> = (0u8..200).cycle().take(30_000).collect();
    server.route(
        &format!("/files/4711_{}.mpg.avi", REC),
        vec![Reply::file(video.clone())],
    );
    server.route("/files/dead.avi", vec![Reply::status(404)]);
    for (_, suffix) in THUMBNAIL_SUFFIXES {
        server.route(&format!("/thumbs/{}{}", REC, suffix), vec![Reply::file(b"jpg".to_vec())]);
    }
    let links = format!(
        "LIST=1;LINKCOUNT=0;\n{};1;\n{};2;\n",
        server.url(&format!("/files/4711_{}.mpg.avi", REC)),
        server.url("/files/dead.avi"),
    );
    server.route("/api/", vec![Reply::text(&links), Reply::text("OK")]);

    let dir = tempdir().unwrap();
    let mut settings = PipelineSettings::new(dir.path());
    settings.limit = 10;
    settings.thumbnail_prefix = server.url("/thumbs/");
    let mut api = client(&server);
    let downloader = Downloader::default();
    let notifier = LogFileNotifier::in_directory(dir.path());

    let report = Pipeline::new(&mut api, &downloader, &notifier, settings)
        .run()
        .unwrap();

    assert_eq!(report.outcome, Outcome::Completed);
    assert_eq!(report.batch_len, 2);

    let video_name = format!("{}.mpg.avi", REC);
    assert_eq!(fs::read(dir.path().join(&video_name)).unwrap(), video);
    for (_, suffix) in THUMBNAIL_SUFFIXES {
        let thumb = dir.path().join(format!("{}{}", video_name, suffix));
        assert_eq!(fs::read(&thumb).unwrap(), b"jpg", "{}", thumb.display());
    }

    let states: Vec<_> = server
        .requests_for("/api/")
        .into_iter()
        .skip(1)
        .map(|r| r.query())
        .collect();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0]["id"], "1");
    assert_eq!(states[0]["state"], "finished");
    assert_eq!(states[0]["filesize"], (30_000 / 1024).to_string());
    assert_eq!(
        general_purpose::STANDARD.decode(&states[0]["file"]).unwrap(),
        video_name.as_bytes()
    );
    assert_eq!(states[1]["id"], "2");
    assert_eq!(states[1]["state"], "damaged");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::Transfer);
    let log = fs::read_to_string(dir.path().join("hltv.log")).unwrap();
    assert!(log.contains("[link 2] transfer failed"));
    assert!(log.contains("\"http_status\": 404"));
}

#[test]
fn unreachable_link_is_broken_and_pass_continues() {
    let server = TestServer::start();
    server.route("/files/ok.bin", vec![Reply::file(b"fine".to_vec())]);
    let links = format!(
        "LIST=1;\nhttp://127.0.0.1:1/files/x.bin;1;\n{};2;\n",
        server.url("/files/ok.bin"),
    );
    server.route("/api/", vec![Reply::text(&links), Reply::text("OK")]);

    let dir = tempdir().unwrap();
    let mut settings = PipelineSettings::new(dir.path());
    settings.limit = 2;
    let mut api = client(&server);
    let downloader = Downloader::default();
    let notifier = LogFileNotifier::in_directory(dir.path());
    let report = Pipeline::new(&mut api, &downloader, &notifier, settings)
        .run()
        .unwrap();

    assert_eq!(report.outcome, Outcome::LimitReached);
    let states: Vec<_> = server
        .requests_for("/api/")
        .into_iter()
        .skip(1)
        .map(|r| r.query())
        .collect();
    assert_eq!(states[0]["state"], "finished");
    assert_eq!(states[0]["error"], BROKEN_LINK);
    assert_eq!(states[1]["state"], "finished");
    assert_eq!(states[1]["error"], "");
    assert_eq!(fs::read(dir.path().join("ok.bin")).unwrap(), b"fine");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::BrokenLink);
}

#[test]
fn server_error_reports_broken_link() {
    let server = TestServer::start();
    server.route("/files/dead.bin", vec![Reply::status(500)]);
    let links = format!("LIST=1;\n{};9;\n", server.url("/files/dead.bin"));
    server.route("/api/", vec![Reply::text(&links), Reply::text("OK")]);

    let dir = tempdir().unwrap();
    let mut api = client(&server);
    let downloader = Downloader::default();
    let notifier = LogFileNotifier::in_directory(dir.path());
    let report = Pipeline::new(&mut api, &downloader, &notifier, PipelineSettings::new(dir.path()))
        .run()
        .unwrap();

    let states: Vec<_> = server
        .requests_for("/api/")
        .into_iter()
        .skip(1)
        .map(|r| r.query())
        .collect();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0]["id"], "9");
    assert_eq!(states[0]["state"], "finished");
    assert_eq!(states[0]["error"], BROKEN_LINK);
    assert_eq!(states[0]["filesize"], "0");

    assert!(report.processed.is_empty());
    assert_eq!(report.failures[0].kind, FailureKind::BrokenLink);
    let log = fs::read_to_string(dir.path().join("hltv.log")).unwrap();
    assert!(log.contains("[link 9] broken link"));
    assert!(log.contains("\"http_status\": 500"));
}

#[test]
fn invalid_directory_reports_broken_link() {
    let server = TestServer::start();
    let links = format!("LIST=1;\n{};5;\n", server.url("/files/a.bin"));
    server.route("/api/", vec![Reply::text(&links), Reply::text("OK")]);
    let dir = tempdir().unwrap();
    let settings = PipelineSettings::new(dir.path().join("missing"));
    let mut api = client(&server);
    let downloader = Downloader::default();
    let notifier = LogFileNotifier::in_directory(dir.path());

    let report = Pipeline::new(&mut api, &downloader, &notifier, settings)
        .run()
        .unwrap();
    assert_eq!(report.failures[0].kind, FailureKind::BrokenLink);
    let q = server.requests_for("/api/")[1].query();
    assert_eq!(q["state"], "finished");
    assert_eq!(q["error"], BROKEN_LINK);
    assert_eq!(q["filesize"], "0");
    assert!(server.requests_for("/files/a.bin").is_empty());
}
