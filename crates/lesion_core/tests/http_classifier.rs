use lesion_core::{
    Banner, ClientConfig, HttpClassifier, PredictError, Prediction, SelectedFile, Submission,
    Tone, UploadView,
};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

/// Answers exactly one request with `response` and hands back the raw request.
fn serve_once(response: String) -> (String, Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let request = read_request(&mut stream);
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
            let _ = tx.send(request);
        }
    });
    (format!("http://{addr}/predict"), rx)
}

fn read_request(stream: &mut impl Read) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let Ok(read) = stream.read(&mut buf) else {
            break;
        };
        if read == 0 {
            break;
        }
        data.extend_from_slice(&buf[..read]);
        if let Some(header_end) = find(&data, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= header_end + 4 + length {
                break;
            }
        }
    }
    data
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn json_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn classifier_for(endpoint: String) -> Arc<HttpClassifier> {
    let config = ClientConfig {
        endpoint,
        timeout_secs: 5,
        ..ClientConfig::default()
    };
    Arc::new(HttpClassifier::new(&config).unwrap())
}

fn lesion() -> SelectedFile {
    SelectedFile::new("lesion.jpg", vec![0xFFu8, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4])
}

fn submit_and_wait(classifier: Arc<HttpClassifier>) -> UploadView {
    let mut view = UploadView::new();
    view.select_file(Some(lesion()));
    assert!(!view.is_busy());
    assert!(matches!(
        view.submit(classifier, || {}),
        Submission::Started(_)
    ));
    assert!(view.is_busy());
    assert!(view.wait_timeout(WAIT));
    view
}

#[test]
fn benign_response_renders_success_banner() {
    let (url, _request) = serve_once(json_response(
        "200 OK",
        r#"{"result":"benign","probability":0.1234}"#,
    ));
    let view = submit_and_wait(classifier_for(url));
    assert!(!view.is_busy());
    let banner = view.banner("malignant").unwrap();
    assert_eq!(banner.tone(), Tone::Success);
    assert_eq!(
        banner,
        Banner::Verdict {
            label: "BENIGN".into(),
            probability: "0.1234".into(),
            malignant: false,
        }
    );
}

#[test]
fn malignant_response_renders_warning_banner() {
    let (url, _request) = serve_once(json_response(
        "200 OK",
        r#"{"result":"malignant","probability":0.98}"#,
    ));
    let view = submit_and_wait(classifier_for(url));
    let banner = view.banner("malignant").unwrap();
    assert_eq!(banner.tone(), Tone::Warning);
    let Banner::Verdict {
        label, probability, ..
    } = banner
    else {
        panic!("expected verdict");
    };
    assert_eq!(label, "MALIGNANT");
    assert_eq!(probability, "0.9800");
}

#[test]
fn server_error_and_unreachable_host_look_the_same() {
    let (url, _request) = serve_once(json_response(
        "500 Internal Server Error",
        r#"{"error":"boom"}"#,
    ));
    let failed = submit_and_wait(classifier_for(url));
    assert!(!failed.is_busy());

    let closed = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = closed.local_addr().unwrap();
    drop(closed);
    let unreachable = submit_and_wait(classifier_for(format!("http://{addr}/predict")));
    assert!(!unreachable.is_busy());

    let expected = Prediction::Error("Error connecting to backend.".into());
    assert_eq!(failed.outcome(), Some(&expected));
    assert_eq!(unreachable.outcome(), Some(&expected));
}

#[test]
fn non_json_success_body_is_a_connectivity_error() {
    let (url, _request) = serve_once(json_response("200 OK", "<html>proxy page</html>"));
    let classifier = classifier_for(url);
    let err = lesion_core::Classifier::classify(classifier.as_ref(), &lesion()).unwrap_err();
    assert!(matches!(err, PredictError::RequestFailed(_)));
}

#[test]
fn request_is_a_single_image_multipart_field() {
    let (url, request) = serve_once(json_response(
        "200 OK",
        r#"{"result":"benign","probability":0.5}"#,
    ));
    let view = submit_and_wait(classifier_for(url));
    assert!(matches!(view.outcome(), Some(Prediction::Success { .. })));

    let raw = request.recv_timeout(WAIT).unwrap();
    let text = String::from_utf8_lossy(&raw);
    assert!(text.starts_with("POST /predict "));
    assert!(text.to_ascii_lowercase().contains("content-type: multipart/form-data"));
    assert_eq!(text.matches("Content-Disposition: form-data;").count(), 1);
    assert!(text.contains(r#"name="image""#));
    assert!(text.contains(r#"filename="lesion.jpg""#));
    assert!(text.contains("Content-Type: image/jpeg"));
}

#[test]
fn classifier_posts_to_configured_endpoint() {
    let classifier = classifier_for("http://classifier.internal:9000/v2/predict".to_string());
    assert_eq!(classifier.endpoint(), "http://classifier.internal:9000/v2/predict");
}
