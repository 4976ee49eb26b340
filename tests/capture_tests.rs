/// HAR loading from files and directories
use authdiff::parsers::{CaptureParser, HarParser};
use authdiff::models::Method;
use std::fs;
use std::path::PathBuf;

fn har(url: &str, status: u16) -> String {
    format!(
        r#"{{"log": {{"version": "1.2", "entries": [
            {{"request": {{"method": "GET", "url": "{}", "headers": [{{"name": "Cookie", "value": "sid=1"}}]}},
              "response": {{"status": {}, "headers": [], "content": {{"text": "ok"}}}}}}
        ]}}}}"#,
        url, status
    )
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("authdiff_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_parse_single_file() {
    let dir = scratch_dir("single");
    let file = dir.join("capture.har");
    fs::write(&file, har("https://api.test/a", 200)).unwrap();

    let exchanges = HarParser::new().parse(file.to_str().unwrap()).unwrap();
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].request.method, Method::GET);
    assert_eq!(exchanges[0].response.body.as_deref(), Some("ok"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_parse_directory_in_file_name_order() {
    let dir = scratch_dir("dir");
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("b.har"), har("https://api.test/b", 200)).unwrap();
    fs::write(dir.join("a.har"), har("https://api.test/a", 200)).unwrap();
    fs::write(dir.join("nested").join("c.har"), har("https://api.test/c", 404)).unwrap();
    fs::write(dir.join("notes.txt"), "not a capture").unwrap();

    let exchanges = HarParser::new().parse(dir.to_str().unwrap()).unwrap();
    let urls: Vec<&str> = exchanges.iter().map(|e| e.request.url.as_str()).collect();
    assert_eq!(urls, vec!["https://api.test/a", "https://api.test/b", "https://api.test/c"]);
    assert_eq!(exchanges[2].response.status, 404);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(HarParser::new().parse("/definitely/not/here.har").is_err());
}
