use futures::executor::block_on;
use futures::future::{BoxFuture, FutureExt};

use prescription_pad::raster::{OverflowPolicy, RasterContext};
use prescription_pad::{
    CaptureConfig, CaptureMode, CaptureSession, InputEvent, PrescriptionPayload, RasterArtifact,
    RasterError, RasterOptions, RasterPipeline, RasterStrategy, Submission, SubmissionError,
    export_to_dir,
};

const RX_HTML: &str = "<p><b>Rx</b>: 500mg</p>";

fn text_payload(html: &str, plain: &str) -> PrescriptionPayload {
    PrescriptionPayload::Text {
        html: html.to_string(),
        plain: plain.to_string(),
    }
}

fn decoded_size(artifact: &RasterArtifact) -> (u32, u32) {
    let image = image::load_from_memory(artifact.bytes()).unwrap();
    (image.width(), image.height())
}

/// Styled capture that always fails the way a broken layout engine would
struct BrokenCapture;

impl RasterStrategy for BrokenCapture {
    fn name(&self) -> &'static str {
        "broken-capture"
    }

    fn rasterize<'a>(
        &'a self,
        _payload: &'a PrescriptionPayload,
        _ctx: &'a RasterContext<'a>,
    ) -> BoxFuture<'a, Result<RasterArtifact, RasterError>> {
        async { Err(RasterError::Capture("layout engine unavailable".into())) }.boxed()
    }
}

#[test]
fn test_draw_save_without_strokes_is_empty() {
    let mut session = CaptureSession::default();
    session.drawing_mut().resize(100.0, 100.0).unwrap();

    let payload = session.save().unwrap();
    assert_eq!(payload, PrescriptionPayload::Drawing { data_uri: None });

    let pipeline = RasterPipeline::default();
    assert!(block_on(pipeline.rasterize(&payload, "Ann")).unwrap().is_none());
    assert!(block_on(session.save_and_rasterize(&pipeline, "Ann"))
        .unwrap()
        .is_none());
    assert_eq!(pipeline.object_urls().live_count(), 0);
}

#[test]
fn test_stroke_to_artifact_matches_device_pixels() {
    let config = CaptureConfig {
        device_pixel_ratio: 2.0,
        ..CaptureConfig::default()
    };
    let mut session = CaptureSession::from_config(&config).unwrap();
    session.drawing_mut().resize(120.0, 80.0).unwrap();
    session.handle_input(&InputEvent::pointer_down(10.0, 10.0));
    session.handle_input(&InputEvent::pointer_move(60.0, 40.0));
    session.handle_input(&InputEvent::pointer_up(110.0, 70.0));

    let pipeline = RasterPipeline::new(config.raster.clone());
    let artifact = block_on(session.save_and_rasterize(&pipeline, "Ann Lee"))
        .unwrap()
        .unwrap();

    assert_eq!((artifact.width(), artifact.height()), (240, 160));
    assert_eq!(decoded_size(&artifact), (240, 160));
    assert_eq!(artifact.content_type(), "image/png");
    assert!(artifact.suggested_filename().starts_with("prescription-ann-lee-"));
    assert!(artifact.suggested_filename().ends_with(".png"));
    assert!(artifact.data_uri().starts_with("data:image/png;base64,"));
}

#[test]
fn test_text_through_fidelity_capture() {
    let pipeline = RasterPipeline::default();
    let artifact = block_on(pipeline.rasterize(&text_payload(RX_HTML, "Rx: 500mg"), "Ann"))
        .unwrap()
        .unwrap();

    assert!(artifact.size() > 0);
    assert!(artifact.width() > 0 && artifact.height() > 0);
    assert_eq!(decoded_size(&artifact), (artifact.width(), artifact.height()));
    assert_eq!(artifact.truncated_lines(), 0);
}

#[test]
fn test_text_through_manual_layout() {
    let pipeline = RasterPipeline::default();
    let artifact =
        block_on(pipeline.rasterize_fallback(&text_payload(RX_HTML, "Rx: 500mg"), "Ann")).unwrap();

    assert!(artifact.size() > 0);
    assert_eq!((artifact.width(), artifact.height()), (800, 1000));
    assert_eq!(decoded_size(&artifact), (800, 1000));
}

#[test]
fn test_manual_layout_derives_plain_text_from_html() {
    let pipeline = RasterPipeline::default();
    let artifact = block_on(pipeline.rasterize_fallback(&text_payload(RX_HTML, ""), "Ann")).unwrap();
    assert!(artifact.size() > 0);
}

#[test]
fn test_malformed_data_uri_is_invalid_image_data() {
    let pipeline = RasterPipeline::default();
    for uri in ["not a uri", "data:image/png;base64,!!!", "data:text/plain;base64,aGk="] {
        let payload = PrescriptionPayload::Drawing {
            data_uri: Some(uri.to_string()),
        };
        let err = block_on(pipeline.rasterize(&payload, "Ann")).unwrap_err();
        assert!(matches!(err, RasterError::InvalidImageData(_)), "{}", uri);
    }
}

#[test]
fn test_failed_capture_falls_back_to_manual_layout() {
    let pipeline = RasterPipeline::default().with_text_strategy(Box::new(BrokenCapture));
    let payload = text_payload(RX_HTML, "Rx: 500mg");

    assert!(matches!(
        block_on(pipeline.rasterize(&payload, "Ann")),
        Err(RasterError::Capture(_))
    ));

    let artifact = block_on(pipeline.rasterize_or_fallback(&payload, "Ann"))
        .unwrap()
        .unwrap();
    assert_eq!((artifact.width(), artifact.height()), (800, 1000));
}

#[test]
fn test_drawing_errors_are_not_retried_as_text() {
    let pipeline = RasterPipeline::default().with_text_strategy(Box::new(BrokenCapture));
    let payload = PrescriptionPayload::Drawing {
        data_uri: Some("garbage".into()),
    };
    assert!(matches!(
        block_on(pipeline.rasterize_or_fallback(&payload, "Ann")),
        Err(RasterError::InvalidImageData(_))
    ));
}

#[test]
fn test_truncating_layout_reports_dropped_lines() {
    let options = RasterOptions {
        overflow: OverflowPolicy::Truncate,
        ..RasterOptions::default()
    };
    let pipeline = RasterPipeline::new(options);
    let plain = (1..=200).map(|i| format!("Line {}", i)).collect::<Vec<_>>().join("\n");

    let artifact = block_on(pipeline.rasterize_fallback(&text_payload("", &plain), "Ann")).unwrap();
    assert_eq!(artifact.height(), 1000);
    assert!(artifact.truncated_lines() > 0);
    assert!(artifact.truncated_lines() < 200);
}

#[test]
fn test_extending_layout_keeps_every_line() {
    let pipeline = RasterPipeline::default();
    let plain = (1..=200).map(|i| format!("Line {}", i)).collect::<Vec<_>>().join("\n");

    let artifact = block_on(pipeline.rasterize_fallback(&text_payload("", &plain), "Ann")).unwrap();
    assert!(artifact.height() > 1000);
    assert_eq!(artifact.truncated_lines(), 0);
}

#[test]
fn test_object_url_lifecycle() {
    let pipeline = RasterPipeline::default();
    let artifact = block_on(pipeline.rasterize_fallback(&text_payload("", "Rx"), "Ann")).unwrap();
    let urls = pipeline.object_urls();

    let (content_type, bytes) = urls.resolve(artifact.object_url()).unwrap();
    assert_eq!(content_type, "image/png");
    assert_eq!(&*bytes, artifact.bytes());
    assert_eq!(urls.live_count(), 1);

    assert!(urls.revoke(artifact.object_url()));
    assert!(urls.resolve(artifact.object_url()).is_none());
    assert_eq!(urls.live_count(), 0);
}

#[test]
fn test_type_save_restores_read_only_state() {
    let mut session = CaptureSession::default();
    session.set_mode(CaptureMode::Type);
    session.handle_input(&InputEvent::Text("Rx: 500mg".into()));

    let pipeline = RasterPipeline::default().with_text_strategy(Box::new(BrokenCapture));
    let artifact = block_on(session.save_and_rasterize(&pipeline, "Ann")).unwrap();
    assert!(artifact.is_some());
    assert!(!session.text().is_read_only());

    session.text_mut().set_read_only(true);
    block_on(session.save_and_rasterize(&pipeline, "Ann")).unwrap();
    assert!(session.text().is_read_only());
}

#[test]
fn test_submission_and_export() {
    let pipeline = RasterPipeline::default();
    let artifact = block_on(pipeline.rasterize_fallback(&text_payload("", "Rx"), "Ann")).unwrap();

    let submission = Submission::prepare(&artifact, Some("  take with food ")).unwrap();
    assert_eq!(submission.metadata.size, artifact.size());
    assert_eq!(submission.metadata.content_type, "image/png");
    assert_eq!(submission.metadata.notes.as_deref(), Some("take with food"));
    let json = submission.metadata_json().unwrap();
    assert!(json.contains("\"createdAt\""));

    let dir = std::env::temp_dir().join(format!("prescription-pad-{}", uuid::Uuid::new_v4()));
    let path = export_to_dir(&artifact, &dir).unwrap();
    assert_eq!(
        path.file_name().and_then(|name| name.to_str()),
        Some(artifact.suggested_filename())
    );
    assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes());
    std::fs::remove_dir_all(&dir).unwrap();

    // An unwritable target surfaces as an I/O error
    let blocker = std::env::temp_dir().join(format!("prescription-pad-file-{}", uuid::Uuid::new_v4()));
    std::fs::write(&blocker, b"x").unwrap();
    assert!(matches!(
        export_to_dir(&artifact, &blocker),
        Err(SubmissionError::Io(_))
    ));
    std::fs::remove_file(&blocker).unwrap();
}
