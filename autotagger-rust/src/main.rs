use anyhow::{Context, Result};
use autotagger::{
    config::{Args, Config},
    credential_store::{authorize, ConsoleVerifier, CredentialStore, StaticVerifier, VerifierProvider},
    pipeline::Pipeline,
};
use clap::Parser;
use tagger_sdk::{
    flickr::{FlickrClient, FlickrClientOptions},
    openai::{OpenAIChatModel, OpenAIChatModelOptions},
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::resolve(Args::parse())?;

    let flickr = FlickrClient::new(FlickrClientOptions {
        api_key: config.flickr_api_key.clone(),
        api_secret: config.flickr_api_secret.clone(),
        ..FlickrClientOptions::default()
    });

    let store = CredentialStore::new(&config.credential_path, config.credential.clone());
    let verifier: Box<dyn VerifierProvider> = match &config.verifier {
        Some(code) => Box::new(StaticVerifier::new(code)),
        None => Box::new(ConsoleVerifier),
    };
    let credential = authorize(
        &flickr,
        &store,
        verifier.as_ref(),
        config.max_authorization_attempts,
    )
    .await
    .context("Failed to authorize with Flickr")?;
    let flickr = flickr.with_credential(credential);

    let model = OpenAIChatModel::new(
        config.model.clone(),
        OpenAIChatModelOptions {
            api_key: config.openai_api_key.clone(),
            ..OpenAIChatModelOptions::default()
        },
    );

    let pipeline = Pipeline::new(
        &flickr,
        &model,
        config.analysis_options(),
        config.pipeline_options(),
    );
    let summary = pipeline.run().await?;

    info!(
        albums = summary.albums_processed,
        albums_skipped = summary.albums_skipped,
        albums_failed = summary.albums_failed,
        analyzed = summary.photos_analyzed,
        filtered = summary.photos_filtered,
        analysis_failures = summary.analysis_failures,
        parse_errors = summary.parse_errors,
        validation_skips = summary.validation_skips,
        written = summary.photos_written,
        write_failures = summary.write_failures,
        "run complete"
    );
    info!("Total cost: ${:.4}", summary.total_cost);
    if summary.output_written {
        info!(path = %config.output_path.display(), "results saved");
    }

    Ok(())
}
