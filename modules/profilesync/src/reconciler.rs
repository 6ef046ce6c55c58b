use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use profilesync_common::{Config, Network, PersistedSnapshot, ProfileSnapshot, ProfileSyncError, Result};
use tracing::{info, warn};

use crate::adapters::SOURCE_FIELDS;
use crate::cascade::{Cascade, CascadeOutcome};
use crate::images::{
    locate, resolve_image, HttpImageDownloader, HttpImageProbe, ImageChoice, ImageDownloader,
    ImageLocation, ImageProbe,
};
use crate::store::SnapshotStore;

/// What happened to one network during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkStatus {
    Refreshed { adapter: String },
    /// The prior entry was kept as-is. `failed_attempts` is 0 when the
    /// network has no credentials configured.
    CarriedForward { failed_attempts: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkReport {
    pub network: Network,
    pub status: NetworkStatus,
    /// Set only for refreshed networks; carried-forward entries are not
    /// re-resolved.
    pub image: Option<ImageChoice>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub networks: Vec<NetworkReport>,
    pub snapshot: PersistedSnapshot,
    pub output_path: PathBuf,
    pub saved: bool,
}

impl RunReport {
    pub fn refreshed(&self) -> usize {
        self.networks
            .iter()
            .filter(|n| matches!(n.status, NetworkStatus::Refreshed { .. }))
            .count()
    }

    pub fn network(&self, network: Network) -> Option<&NetworkReport> {
        self.networks.iter().find(|n| n.network == network)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} networks refreshed",
            self.refreshed(),
            self.networks.len()
        )?;
        for report in &self.networks {
            match &report.status {
                NetworkStatus::Refreshed { adapter } => {
                    write!(f, ", {} via {}", report.network, adapter)?;
                    if let Some(image) = &report.image {
                        write!(f, " [image {}]", image.kind())?;
                    }
                }
                NetworkStatus::CarriedForward { failed_attempts } => {
                    write!(
                        f,
                        ", {} carried forward ({} failed attempts)",
                        report.network, failed_attempts
                    )?;
                }
            }
        }
        if self.saved {
            write!(f, ", saved to {}", self.output_path.display())?;
        }
        Ok(())
    }
}

/// Per-network result of the fetch and image phases, before merging.
enum Resolved {
    Refreshed {
        adapter: String,
        profile: ProfileSnapshot,
        image: ImageChoice,
    },
    CarriedForward {
        failed_attempts: usize,
    },
}

/// One reconciliation pass: fetch every network, resolve images, merge with
/// the last snapshot, persist.
pub struct Reconciler {
    store: SnapshotStore,
    cascades: Vec<Cascade>,
    probe: Arc<dyn ImageProbe>,
    downloader: Option<Arc<dyn ImageDownloader>>,
    fallback_image: String,
    dry_run: bool,
}

impl Reconciler {
    pub fn new(
        store: SnapshotStore,
        cascades: Vec<Cascade>,
        probe: Arc<dyn ImageProbe>,
        fallback_image: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cascades,
            probe,
            downloader: None,
            fallback_image: fallback_image.into(),
            dry_run: false,
        }
    }

    /// Store freshly chosen remote images locally.
    pub fn with_downloader(mut self, downloader: Arc<dyn ImageDownloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Skip the final save; the merged snapshot is still returned.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Production wiring: one shared HTTP client with the configured timeout,
    /// a cascade per tracked network, and the HTTP probe and downloader.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("profilesync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProfileSyncError::Config(format!("failed to build HTTP client: {e}")))?;

        let cascades = Network::ALL
            .iter()
            .map(|network| Cascade::from_config(*network, config, &http))
            .collect();

        let reconciler = Self::new(
            SnapshotStore::new(&config.output_path),
            cascades,
            Arc::new(HttpImageProbe::new(http.clone())),
            config.fallback_image.clone(),
        );

        Ok(if config.save_profile_images {
            reconciler.with_downloader(Arc::new(HttpImageDownloader::new(http, &config.image_dir)))
        } else {
            reconciler
        })
    }

    /// Run one pass. Only a failed save is an error; every upstream or image
    /// problem degrades to carrying forward what was there before.
    pub async fn run(&self) -> Result<RunReport> {
        let prior = self.store.load().await;

        let fetched = join_all(self.cascades.iter().map(|cascade| async move {
            (cascade.network(), cascade.run().await)
        }))
        .await;

        let resolved = join_all(fetched.into_iter().map(|(network, outcome)| {
            let prior_image = prior
                .profile(network)
                .and_then(|p| p.image_reference.as_deref());
            async move { (network, self.resolve(network, prior_image, outcome).await) }
        }))
        .await;

        let (snapshot, networks) = merge(&prior, resolved);

        let saved = if self.dry_run {
            info!("Dry run, snapshot not saved");
            false
        } else {
            self.store.save(&snapshot).await?;
            true
        };

        Ok(RunReport {
            networks,
            snapshot,
            output_path: self.store.path().to_path_buf(),
            saved,
        })
    }

    async fn resolve(
        &self,
        network: Network,
        prior_image: Option<&str>,
        outcome: CascadeOutcome,
    ) -> Resolved {
        match outcome {
            CascadeOutcome::Fetched { adapter, profile } => {
                let choice = resolve_image(
                    self.probe.as_ref(),
                    prior_image,
                    profile.image_reference.as_deref(),
                    &self.fallback_image,
                )
                .await;
                let image = self.store_image_locally(network, choice).await;
                info!(%network, image = %image, "Image resolved");
                Resolved::Refreshed {
                    adapter,
                    profile,
                    image,
                }
            }
            CascadeOutcome::Unavailable { attempts } => {
                warn!(%network, "Using existing data");
                Resolved::CarriedForward {
                    failed_attempts: attempts.len(),
                }
            }
        }
    }

    /// Download a fresh remote image when a downloader is configured. A
    /// failed download keeps the remote URL.
    async fn store_image_locally(&self, network: Network, choice: ImageChoice) -> ImageChoice {
        let (Some(downloader), ImageChoice::Fresh(url)) = (&self.downloader, &choice) else {
            return choice;
        };
        if !matches!(locate(url), ImageLocation::Remote(_)) {
            return choice;
        }

        match downloader.download(network, url).await {
            Ok(path) => ImageChoice::Fresh(path.to_string_lossy().into_owned()),
            Err(e) => {
                warn!(%network, error = %e, "Keeping remote image reference");
                choice
            }
        }
    }
}

/// Fold per-network results into the prior snapshot. Refreshed networks take
/// the fresh fields and the resolved image. Unknown keys of the prior entry
/// are kept, except the source fields the adapters write, which only ever
/// come from the fresh fetch. Carried-forward entries are left untouched.
fn merge(
    prior: &PersistedSnapshot,
    resolved: Vec<(Network, Resolved)>,
) -> (PersistedSnapshot, Vec<NetworkReport>) {
    let mut next = prior.clone();
    let mut reports = Vec::with_capacity(resolved.len());

    for (network, result) in resolved {
        match result {
            Resolved::Refreshed {
                adapter,
                mut profile,
                image,
            } => {
                profile.image_reference = Some(image.reference().to_string());
                let mut extra = prior
                    .profile(network)
                    .map(|p| p.extra.clone())
                    .unwrap_or_default();
                extra.retain(|key, _| !SOURCE_FIELDS.contains(&key.as_str()));
                extra.extend(std::mem::take(&mut profile.extra));
                profile.extra = extra;
                next.set_profile(network, profile);
                reports.push(NetworkReport {
                    network,
                    status: NetworkStatus::Refreshed { adapter },
                    image: Some(image),
                });
            }
            Resolved::CarriedForward { failed_attempts } => {
                next.profiles.entry(network).or_default();
                reports.push(NetworkReport {
                    network,
                    status: NetworkStatus::CarriedForward { failed_attempts },
                    image: None,
                });
            }
        }
    }

    next.last_updated = Some(Utc::now());
    (next, reports)
}
