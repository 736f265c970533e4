//! Builds the library components from a loaded config.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use secrecy::{ExposeSecret, SecretString};

use clipcast::clients::{
    http::build_client, GeminiClient, GraphApiClient, HttpError, HttpMediaFetcher, MergeClient,
    ResolverClient, StoreMediaFetcher, TelegramNotifier,
};
use clipcast::db::{database_path, Database};
use clipcast::dispatcher::{Dispatcher, JobQueue};
use clipcast::gallery::{ArtifactStore, CategoryList};
use clipcast::ledger::Ledger;
use clipcast::pipeline::{
    ChatProgress, ContentGenerator, DubbingPipeline, MediaResolver, Notifier, NullNotifier,
    PipelineConfig, ScriptOutcome,
};
use clipcast::publish::{
    CaptionBuilder, CaptionGenerator, MediaFetcher, PendingComments, PublishPipeline, PublishingApi,
    TitleBackfill,
};
use clipcast::scheduler::{parse_timezone, Scheduler, SlotClaims};
use clipcast::secrets::expand_home;
use clipcast::store::{tenant_from_token, FsBlobStore, TenantStore};
use clipcast::targets::TargetRegistry;
use clipcast::{Config, Result, SecretError};

pub struct App {
    pub config: Config,
    pub dispatcher: Dispatcher,
    pub artifacts: ArtifactStore,
    pub categories: CategoryList,
    /// `None` without an AI key.
    pub titles: Option<TitleBackfill>,
    pub targets: TargetRegistry,
    pub ledger: Ledger,
    pub scheduler: Scheduler,
}

impl App {
    pub fn build(config: Config) -> Result<Self> {
        let data_dir = PathBuf::from(expand_home(&config.data_directory));
        let db = Database::open(&database_path(&data_dir))?;
        let backend = Arc::new(FsBlobStore::new(data_dir.join("objects")));

        let bot_token = config.telegram.bot_token.resolve_optional()?;
        let tenant = match config.tenant_token.resolve_optional()?.or_else(|| bot_token.clone()) {
            Some(token) => tenant_from_token(token.expose_secret()),
            None => tenant_from_token(""),
        };
        let store = TenantStore::new(backend, &tenant)?;
        info!("Using tenant '{}' under {}", tenant, data_dir.display());

        let http = build_client()?;
        let fetcher: Arc<dyn MediaFetcher> = Arc::new(StoreMediaFetcher::new(
            store.clone(),
            HttpMediaFetcher::new(http.clone()),
        ));

        let notifier: Arc<dyn Notifier> = match bot_token {
            Some(token) => Arc::new(TelegramNotifier::new(http.clone(), &config.telegram.api_base, token)),
            None => Arc::new(NullNotifier),
        };

        let categories = CategoryList::new(store.clone(), config.categories.clone());
        let (generator, captions): (Arc<dyn ContentGenerator>, Option<Arc<dyn CaptionGenerator>>) =
            match ai_key(&config)? {
                Some(key) => {
                    let gemini = Arc::new(GeminiClient::new(
                        http.clone(),
                        &config.ai,
                        key,
                        categories.clone(),
                        fetcher.clone(),
                    ));
                    let captions: Arc<dyn CaptionGenerator> = gemini.clone();
                    (gemini, Some(captions))
                }
                None => {
                    warn!("No AI API key configured; pipeline runs will fail at the script step");
                    (Arc::new(MissingApiKey) as Arc<dyn ContentGenerator>, None)
                }
            };

        let resolver: Option<Arc<dyn MediaResolver>> = config
            .resolver
            .base_url
            .as_deref()
            .map(|base| Arc::new(ResolverClient::new(http.clone(), base)) as Arc<dyn MediaResolver>);
        let merger = Arc::new(MergeClient::new(
            http.clone(),
            &config.merge.base_url,
            config.merge.sample_rate,
        ));

        let artifacts = ArtifactStore::new(store.clone(), config.media.clone());
        let titles = captions
            .clone()
            .map(|generator| TitleBackfill::new(artifacts.clone(), generator));
        let pipeline = DubbingPipeline::new(
            Arc::new(PipelineConfig::from_config(&config)),
            resolver,
            fetcher.clone(),
            generator,
            merger,
            artifacts.clone(),
            Arc::new(ChatProgress::new(notifier)),
        );
        let dispatcher = Dispatcher::new(JobQueue::new(store.clone()), Arc::new(pipeline));

        let ledger = Ledger::new(db.clone());
        let targets = TargetRegistry::new(db, parse_timezone(&config.default_timezone)?);

        let api: Arc<dyn PublishingApi> =
            Arc::new(GraphApiClient::new(http, &config.publishing.graph_api_base));
        let comments = PendingComments::new(
            store.clone(),
            api.clone(),
            Duration::from_secs(config.publishing.comment_delay_secs),
            &config.publishing.comment_template,
        );
        let publisher = PublishPipeline::new(
            api,
            fetcher,
            CaptionBuilder::new(captions, &config.publishing),
            ledger.clone(),
            targets.clone(),
            comments,
            &config.publishing,
        );
        let scheduler = Scheduler::new(
            targets.clone(),
            artifacts.clone(),
            SlotClaims::new(store),
            publisher,
            &config.scheduler,
        );

        Ok(Self {
            config,
            dispatcher,
            artifacts,
            categories,
            titles,
            targets,
            ledger,
            scheduler,
        })
    }
}

/// The key source defaults to `$GOOGLE_API_KEY`; that variable being unset
/// means no key rather than a startup error.
fn ai_key(config: &Config) -> Result<Option<SecretString>> {
    match config.ai.api_key.resolve_optional() {
        Err(SecretError::EnvUnset(name)) => {
            warn!("AI key variable ${} is not set", name);
            Ok(None)
        }
        other => Ok(other?),
    }
}

/// Generator used when no AI key is configured.
struct MissingApiKey;

#[async_trait]
impl ContentGenerator for MissingApiKey {
    async fn generate_script(&self, _media_url: &str, _duration_seconds: f64) -> std::result::Result<ScriptOutcome, HttpError> {
        Err(HttpError::api("AI API key is not configured"))
    }

    async fn synthesize_voice(&self, _script: &str) -> std::result::Result<String, HttpError> {
        Err(HttpError::api("AI API key is not configured"))
    }
}
