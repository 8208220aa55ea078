use autotagger::{
    analysis::AnalysisOptions,
    pipeline::{Pipeline, PipelineOptions, RunSummary},
};
use serde_json::Value;
use std::path::Path;
use tagger_sdk::{
    tagger_sdk_test::{HostCall, MockGenerateResult, MockLanguageModel, MockPhotoHost, WriteKind},
    Album, LanguageModelError, LanguageModelInput, LanguageModelPricing, Location, Message,
    ModelUsage, Part, Photo, PrivacyFilter,
};

const GOOD_REPLY: &str =
    r#"{"title":"Sunset beach","description":"Waves at dusk.","keywords":["beach","sunset","sea"]}"#;

fn album(id: &str, title: &str) -> Album {
    Album {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
    }
}

fn photo(id: &str, description: &str) -> Photo {
    Photo {
        id: id.to_string(),
        title: format!("IMG_{id}"),
        image_url: Some(format!("https://live.staticflickr.com/1/{id}_m.jpg")),
        description: description.to_string(),
        location: None,
    }
}

fn usage() -> Option<ModelUsage> {
    Some(ModelUsage {
        input_tokens: 1000,
        output_tokens: 100,
    })
}

fn analysis_options() -> AnalysisOptions {
    AnalysisOptions {
        pricing: LanguageModelPricing {
            input_cost_per_1k_tokens: 0.000_15,
            output_cost_per_1k_tokens: 0.000_6,
            cost_per_image: 0.0,
        },
        ..AnalysisOptions::default()
    }
}

fn pipeline_options(output_path: &Path) -> PipelineOptions {
    PipelineOptions {
        album_id: None,
        skip_prefixes: vec!["#".to_string()],
        placeholder_descriptions: vec!["OLYMPUS DIGITAL CAMERA".to_string()],
        privacy_filter: PrivacyFilter::Public,
        page_size: 100,
        use_location: false,
        dry_run: false,
        output_path: output_path.to_path_buf(),
    }
}

async fn run(
    host: &MockPhotoHost,
    model: &MockLanguageModel,
    options: PipelineOptions,
) -> RunSummary {
    Pipeline::new(host, model, analysis_options(), options)
        .run()
        .await
        .unwrap()
}

#[tokio::test]
async fn single_photo_is_analyzed_and_written() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(
        Album {
            description: "Summer trip".to_string(),
            ..album("set-1", "Vacation")
        },
        vec![photo("100", "")],
    );
    let model = MockLanguageModel::new();
    model.enqueue_generate(MockGenerateResult::text(GOOD_REPLY, usage()));

    let summary = run(&host, &model, pipeline_options(&output)).await;

    assert_eq!(model.generate_calls(), 1);
    assert_eq!(
        context_text(&model.tracked_generate_inputs()[0]),
        r#"{"albumTitle":"Vacation","albumDescription":"Summer trip"}"#
    );

    assert_eq!(
        host.write_calls(),
        vec![
            HostCall::SetTags {
                photo_id: "100".to_string(),
                tags: "beach,sunset,sea".to_string(),
            },
            HostCall::SetMeta {
                photo_id: "100".to_string(),
                title: "Sunset beach".to_string(),
                description: "Waves at dusk.".to_string(),
            },
        ]
    );
    assert_eq!(summary.photos_written, 1);
    assert!((summary.total_cost - 0.000_21).abs() < 1e-12);

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(saved[0]["album_id"], "set-1");
    assert_eq!(saved[0]["photo_id"], "100");
    assert_eq!(saved[0]["keywords"], serde_json::json!(["beach", "sunset", "sea"]));
    assert_eq!(saved[0]["usage"]["prompt_tokens"], 1000);
}

#[tokio::test]
async fn skip_prefixed_album_is_never_touched() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(album("set-1", "#private"), vec![photo("100", "")]);
    let model = MockLanguageModel::new();

    let summary = run(&host, &model, pipeline_options(&output)).await;

    assert_eq!(model.generate_calls(), 0);
    assert!(host.write_calls().is_empty());
    assert!(!host
        .calls()
        .iter()
        .any(|call| matches!(call, HostCall::ListPhotos { .. })));
    assert_eq!(summary.albums_skipped, 1);
    assert_eq!(summary.total_cost, 0.0);
    assert!(!output.exists());
}

#[tokio::test]
async fn unparseable_reply_is_neither_written_nor_saved() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(album("set-1", "Vacation"), vec![photo("100", "")]);
    let model = MockLanguageModel::new();
    model.enqueue_generate(MockGenerateResult::text(
        "Sorry, I can't describe this image.",
        usage(),
    ));

    let summary = run(&host, &model, pipeline_options(&output)).await;

    assert!(host.write_calls().is_empty());
    assert_eq!(summary.parse_errors, 1);
    assert_eq!(summary.total_cost, 0.0);
    assert!(!summary.output_written);
    assert!(!output.exists());
}

#[tokio::test]
async fn repeated_bad_request_skips_only_that_photo() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(
        album("set-1", "Vacation"),
        vec![photo("100", ""), photo("101", "")],
    );
    let model = MockLanguageModel::new();
    model.enqueue_generate_results([
        MockGenerateResult::error(LanguageModelError::BadRequest("timeout".into())),
        MockGenerateResult::error(LanguageModelError::BadRequest("timeout".into())),
        MockGenerateResult::text(GOOD_REPLY, usage()),
    ]);

    let summary = run(&host, &model, pipeline_options(&output)).await;

    assert_eq!(model.generate_calls(), 3);
    assert_eq!(summary.analysis_failures, 1);
    assert_eq!(summary.photos_written, 1);
    let written: Vec<String> = host
        .write_calls()
        .into_iter()
        .filter_map(|call| match call {
            HostCall::SetTags { photo_id, .. } => Some(photo_id),
            _ => None,
        })
        .collect();
    assert_eq!(written, vec!["101"]);
}

#[tokio::test]
async fn run_without_results_writes_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(
        album("set-1", "Vacation"),
        vec![photo("100", "Grandma's birthday cake")],
    );
    host.add_album(album("set-2", "Empty"), vec![]);
    let model = MockLanguageModel::new();

    let summary = run(&host, &model, pipeline_options(&output)).await;

    assert_eq!(model.generate_calls(), 0);
    assert_eq!(summary.photos_filtered, 1);
    assert_eq!(summary.albums_processed, 1);
    assert!(!output.exists());
}

#[tokio::test]
async fn placeholder_description_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(
        album("set-1", "Vacation"),
        vec![photo("100", "OLYMPUS DIGITAL CAMERA")],
    );
    let model = MockLanguageModel::new();
    model.enqueue_generate(MockGenerateResult::text(GOOD_REPLY, None));

    let summary = run(&host, &model, pipeline_options(&output)).await;

    assert_eq!(summary.photos_written, 1);
    assert_eq!(host.write_calls().len(), 2);
}

#[tokio::test]
async fn single_album_mode_uses_the_given_album() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(album("set-1", "#hidden"), vec![photo("100", "")]);
    host.add_album(album("set-2", "Other"), vec![photo("200", "")]);
    let model = MockLanguageModel::new();
    model.enqueue_generate(MockGenerateResult::text(GOOD_REPLY, None));

    let options = PipelineOptions {
        album_id: Some("set-1".to_string()),
        ..pipeline_options(&output)
    };
    let summary = run(&host, &model, options).await;

    assert_eq!(summary.photos_written, 1);
    assert!(!host
        .calls()
        .iter()
        .any(|call| matches!(call, HostCall::ListAlbums { .. })));
    assert_eq!(
        host.calls()[1],
        HostCall::ListPhotos {
            album_id: "set-1".to_string(),
            privacy_filter: PrivacyFilter::Public,
        }
    );
}

#[tokio::test]
async fn location_is_sent_and_written_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(
        album("set-1", "Paris"),
        vec![Photo {
            location: Some(Location {
                latitude: 48.5,
                longitude: 2.25,
            }),
            ..photo("100", "")
        }],
    );
    let model = MockLanguageModel::new();
    model.enqueue_generate(MockGenerateResult::text(GOOD_REPLY, None));

    let options = PipelineOptions {
        use_location: true,
        ..pipeline_options(&output)
    };
    run(&host, &model, options).await;

    assert_eq!(
        context_text(&model.tracked_generate_inputs()[0]),
        r#"{"albumTitle":"Paris","location":{"latitude":48.5,"longitude":2.25}}"#
    );
    assert_eq!(
        host.write_calls()[2],
        HostCall::SetLocation {
            photo_id: "100".to_string(),
            latitude: 48.5,
            longitude: 2.25,
        }
    );
}

#[tokio::test]
async fn failed_photo_listing_skips_the_album() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(album("set-1", "Broken"), vec![photo("100", "")]);
    host.add_album(album("set-2", "Fine"), vec![photo("200", "")]);
    host.fail_photo_listing("set-1");
    let model = MockLanguageModel::new();
    model.enqueue_generate(MockGenerateResult::text(GOOD_REPLY, None));

    let summary = run(&host, &model, pipeline_options(&output)).await;

    assert_eq!(summary.albums_failed, 1);
    assert_eq!(summary.albums_processed, 1);
    assert_eq!(summary.photos_written, 1);
}

#[tokio::test]
async fn failed_album_listing_ends_the_run_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(album("set-1", "Vacation"), vec![photo("100", "")]);
    host.fail_album_page(1);
    let model = MockLanguageModel::new();

    let summary = run(&host, &model, pipeline_options(&output)).await;

    assert_eq!(summary.albums_failed, 1);
    assert_eq!(summary.albums_processed, 0);
    assert_eq!(model.generate_calls(), 0);
    assert!(!summary.output_written);
    assert!(!output.exists());
}

#[tokio::test]
async fn unknown_single_album_ends_the_run_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(album("set-1", "Vacation"), vec![photo("100", "")]);
    let model = MockLanguageModel::new();

    let options = PipelineOptions {
        album_id: Some("set-404".to_string()),
        ..pipeline_options(&output)
    };
    let summary = run(&host, &model, options).await;

    assert_eq!(summary.albums_failed, 1);
    assert_eq!(model.generate_calls(), 0);
    assert!(!host
        .calls()
        .iter()
        .any(|call| matches!(call, HostCall::ListPhotos { .. })));
    assert!(!output.exists());
}

#[tokio::test]
async fn write_failures_are_counted_and_results_still_saved() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(album("set-1", "Vacation"), vec![photo("100", "")]);
    host.fail_writes(WriteKind::Meta);
    let model = MockLanguageModel::new();
    model.enqueue_generate(MockGenerateResult::text(GOOD_REPLY, None));

    let summary = run(&host, &model, pipeline_options(&output)).await;

    assert_eq!(summary.write_failures, 1);
    assert_eq!(host.write_calls().len(), 2);
    assert!(output.exists());
}

#[tokio::test]
async fn dry_run_saves_results_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let host = MockPhotoHost::new();
    host.add_album(album("set-1", "Vacation"), vec![photo("100", "")]);
    let model = MockLanguageModel::new();
    model.enqueue_generate(MockGenerateResult::text(GOOD_REPLY, None));

    let options = PipelineOptions {
        dry_run: true,
        ..pipeline_options(&output)
    };
    let summary = run(&host, &model, options).await;

    assert!(host.write_calls().is_empty());
    assert_eq!(summary.photos_written, 1);
    assert!(output.exists());
}

fn context_text(input: &LanguageModelInput) -> String {
    let Message::User(message) = &input.messages[0];
    match &message.content[0] {
        Part::Text(part) => part.text.clone(),
        Part::ImageUrl(_) => panic!("expected the context first"),
    }
}
