use crate::{
    albums::{is_skipped, AlbumEnumerator},
    analysis::{AnalysisClient, AnalysisOptions, AnalysisResult, PhotoAnalysis},
    photo_filter::PhotoFilter,
    writer::{MetadataWriter, SkipReason, WriteOutcome},
    AnalysisError, AutotaggerError,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tagger_sdk::{Album, LanguageModel, PhotoHost, PrivacyFilter};
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Process only this album. When `None`, every album not matching
    /// `skip_prefixes` is processed.
    pub album_id: Option<String>,
    pub skip_prefixes: Vec<String>,
    pub placeholder_descriptions: Vec<String>,
    pub privacy_filter: PrivacyFilter,
    pub page_size: usize,
    /// Pass each photo's location to the model and write it back.
    pub use_location: bool,
    pub dry_run: bool,
    pub output_path: PathBuf,
}

/// One line of the output file.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhotoRecord {
    pub album_id: String,
    pub photo_id: String,
    #[serde(flatten)]
    pub analysis: PhotoAnalysis,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub albums_processed: usize,
    pub albums_skipped: usize,
    pub albums_failed: usize,
    pub photos_analyzed: usize,
    /// Photos that already had a real description.
    pub photos_filtered: usize,
    /// Photos for which no model reply was obtained.
    pub analysis_failures: usize,
    pub parse_errors: usize,
    pub validation_skips: usize,
    pub photos_written: usize,
    pub write_failures: usize,
    /// USD.
    pub total_cost: f64,
    pub output_written: bool,
}

/// Accumulates results over a run.
#[derive(Debug, Default)]
pub struct RunAggregate {
    records: Vec<PhotoRecord>,
    summary: RunSummary,
}

impl RunAggregate {
    /// Record an analysis. Only successful analyses are kept and priced.
    pub fn record(&mut self, album_id: &str, photo_id: &str, result: &AnalysisResult) {
        self.summary.photos_analyzed += 1;
        match result {
            AnalysisResult::Ok(analysis) => {
                self.summary.total_cost += result.cost();
                self.records.push(PhotoRecord {
                    album_id: album_id.to_string(),
                    photo_id: photo_id.to_string(),
                    analysis: analysis.clone(),
                });
            }
            AnalysisResult::Err { .. } => self.summary.parse_errors += 1,
        }
    }

    pub fn record_outcome(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Written { failed_calls } => {
                self.summary.photos_written += 1;
                self.summary.write_failures += failed_calls;
            }
            WriteOutcome::Skipped(SkipReason::MissingFields) => {
                self.summary.validation_skips += 1;
            }
            WriteOutcome::Skipped(SkipReason::AnalysisFailed) => {}
        }
    }

    #[must_use]
    pub fn records(&self) -> &[PhotoRecord] {
        &self.records
    }

    #[must_use]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Write the records as a pretty-printed JSON array. Nothing is written
    /// when there are no records. Returns whether the file was written.
    pub fn persist(&mut self, path: &Path) -> Result<bool, AutotaggerError> {
        if self.records.is_empty() {
            info!("no results to save");
            return Ok(false);
        }

        let content = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(path, content)?;
        info!(path = %path.display(), records = self.records.len(), "saved results");
        self.summary.output_written = true;
        Ok(true)
    }

    #[must_use]
    pub fn into_summary(self) -> RunSummary {
        self.summary
    }
}

/// Drives a run: albums, then photos, then analysis and write-back.
/// Work is strictly sequential.
pub struct Pipeline<'a> {
    host: &'a dyn PhotoHost,
    analysis: AnalysisClient<'a>,
    filter: PhotoFilter,
    writer: MetadataWriter<'a>,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        host: &'a dyn PhotoHost,
        model: &'a dyn LanguageModel,
        analysis_options: AnalysisOptions,
        options: PipelineOptions,
    ) -> Self {
        Self {
            host,
            analysis: AnalysisClient::new(model, analysis_options),
            filter: PhotoFilter::new(options.placeholder_descriptions.clone()),
            writer: MetadataWriter::new(host, options.dry_run),
            options,
        }
    }

    pub async fn run(&self) -> Result<RunSummary, AutotaggerError> {
        let mut aggregate = RunAggregate::default();

        let albums = self.target_albums(&mut aggregate).await;
        info!(albums = albums.len(), dry_run = self.options.dry_run, "starting run");

        for album in &albums {
            self.process_album(album, &mut aggregate)
                .instrument(info_span!("album", album_id = %album.id))
                .await;
        }

        aggregate.persist(&self.options.output_path)?;
        Ok(aggregate.into_summary())
    }

    /// Albums to process. A failed lookup is counted and leaves nothing to
    /// process.
    async fn target_albums(&self, aggregate: &mut RunAggregate) -> Vec<Album> {
        let enumerator = AlbumEnumerator::new(self.host, self.options.page_size);

        if let Some(album_id) = &self.options.album_id {
            return match enumerator.get_one(album_id).await {
                Ok(album) => vec![album],
                Err(error) => {
                    warn!(album_id = %album_id, %error, "cannot fetch album, skipping it");
                    aggregate.summary.albums_failed += 1;
                    Vec::new()
                }
            };
        }

        let mut albums = match enumerator.list_all().await {
            Ok(albums) => albums,
            Err(error) => {
                warn!(%error, "cannot list albums");
                aggregate.summary.albums_failed += 1;
                return Vec::new();
            }
        };
        albums.retain(|album| {
            let skipped = is_skipped(&album.title, &self.options.skip_prefixes);
            if skipped {
                info!(album_id = %album.id, title = %album.title, "skipping album");
                aggregate.summary.albums_skipped += 1;
            }
            !skipped
        });
        albums
    }

    async fn process_album(&self, album: &Album, aggregate: &mut RunAggregate) {
        let photos = match self
            .host
            .list_photos(&album.id, self.options.privacy_filter)
            .await
        {
            Ok(photos) => photos,
            Err(error) => {
                warn!(album_id = %album.id, %error, "cannot list photos, skipping album");
                aggregate.summary.albums_failed += 1;
                return;
            }
        };

        if photos.is_empty() {
            debug!(album_id = %album.id, "album has no visible photos");
            return;
        }

        info!(album_id = %album.id, title = %album.title, photos = photos.len(), "processing album");
        aggregate.summary.albums_processed += 1;
        let mut album_cost = 0.0;

        for photo in &photos {
            if !self.filter.should_analyze(photo) {
                debug!(photo_id = %photo.id, "photo already has a description");
                aggregate.summary.photos_filtered += 1;
                continue;
            }

            let location = if self.options.use_location {
                photo.location
            } else {
                None
            };

            let result = match self
                .analysis
                .analyze(
                    photo,
                    Some(album.title.as_str()),
                    Some(album.description.as_str()),
                    location,
                )
                .await
            {
                Ok(result) => result,
                Err(AnalysisError::MissingImage) => {
                    warn!(photo_id = %photo.id, "photo has no image URL, skipping");
                    aggregate.summary.analysis_failures += 1;
                    continue;
                }
                Err(error) => {
                    warn!(photo_id = %photo.id, %error, "analysis failed, skipping photo");
                    aggregate.summary.analysis_failures += 1;
                    continue;
                }
            };

            album_cost += result.cost();
            aggregate.record(&album.id, &photo.id, &result);
            let outcome = self.writer.apply(&photo.id, &result).await;
            aggregate.record_outcome(outcome);
        }

        info!(album_id = %album.id, cost = album_cost, "finished album");
    }
}
