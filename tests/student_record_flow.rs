use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_schooldeskd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schooldeskd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert!(
        !value.get("ok").and_then(|v| v.as_bool()).unwrap_or(true),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_str())
        .expect("error code")
        .to_string()
}

#[test]
fn save_then_fetch_updates_only_patched_fields() {
    let workspace = temp_dir("schooldesk-student-save");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.save",
        json!({ "roll": "7", "fields": { "roll": "7", "Name": "Ali", "Class": "5" } }),
    );

    let record = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.get",
        json!({ "roll": "7" }),
    );
    assert_eq!(record.get("roll").and_then(|v| v.as_str()), Some("7"));
    assert_eq!(record.get("Name").and_then(|v| v.as_str()), Some("Ali"));
    assert_eq!(record.get("Class").and_then(|v| v.as_str()), Some("5"));
    // Reconciliation added the whole mapped schema; untouched columns are empty.
    assert_eq!(record.get("FatherName").and_then(|v| v.as_str()), Some(""));
    assert_eq!(record.get("Math").and_then(|v| v.as_str()), Some(""));

    // Partial update: only Name changes, everything else stays.
    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.save",
        json!({ "roll": "7", "fields": { "Name": "Bilal" } }),
    );
    let record = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.get",
        json!({ "roll": "7" }),
    );
    assert_eq!(record.get("Name").and_then(|v| v.as_str()), Some("Bilal"));
    assert_eq!(record.get("Class").and_then(|v| v.as_str()), Some("5"));
}

#[test]
fn fetch_unknown_roll_is_not_found() {
    let workspace = temp_dir("schooldesk-student-404");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // No sheet yet at all.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.get",
        json!({ "roll": "7" }),
    );
    assert_eq!(code, "not_found");

    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.save",
        json!({ "roll": "7", "fields": { "Name": "Ali" } }),
    );
    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "students.get",
        json!({ "roll": "8" }),
    );
    assert_eq!(code, "not_found");
}

#[test]
fn save_without_roll_is_rejected_before_any_write() {
    let workspace = temp_dir("schooldesk-student-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.save",
        json!({ "fields": { "Name": "Ali" } }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "students.save",
        json!({ "roll": "   ", "fields": { "Name": "Ali" } }),
    );
    assert_eq!(code, "bad_params");

    assert!(
        !workspace.join("data").join("class.xlsx").exists(),
        "rejected save must not create the data file"
    );
}

#[test]
fn photo_access_path_rides_along_only_when_a_photo_exists() {
    let workspace = temp_dir("schooldesk-student-photo");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.save",
        json!({ "roll": "7", "fields": { "Name": "Ali" } }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.save",
        json!({ "roll": "8", "fields": { "Name": "Hina" } }),
    );
    std::fs::write(
        workspace.join("public").join("photos").join("7.jpg"),
        b"jpeg-bytes",
    )
    .expect("write photo");

    let with_photo = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.get",
        json!({ "roll": "7" }),
    );
    let image_path = with_photo
        .get("ImagePath")
        .and_then(|v| v.as_str())
        .expect("ImagePath present");
    assert!(image_path.starts_with("/photos/7.jpg?t="));

    let without_photo = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.get",
        json!({ "roll": "8" }),
    );
    assert!(without_photo.get("ImagePath").is_none());
}

#[test]
fn uploaded_photo_is_stored_under_roll_with_its_extension() {
    let workspace = temp_dir("schooldesk-student-photo-upload");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let staged = workspace.join("uploads").join("staged-photo");
    std::fs::write(&staged, b"png-bytes").expect("stage photo");

    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.save",
        json!({
            "roll": "7",
            "fields": { "Name": "Ali" },
            "photoPath": staged.to_string_lossy(),
            "photoName": "me.png",
        }),
    );

    let stored = workspace.join("public").join("photos").join("7.png");
    assert!(stored.is_file(), "photo moved into the photo directory");
    assert!(!staged.exists(), "staged upload consumed");
}
