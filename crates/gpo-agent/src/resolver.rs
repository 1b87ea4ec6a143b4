//! Resolution orchestrator
//!
//! `get_policies` sequences one request:
//!
//! 1. computer identities must name the local host
//! 2. the private ticket is prepared
//! 3. the directory lists applicable objects, in precedence order
//! 4. objects are downloaded and parsed with bounded concurrency, keeping the
//!    directory order; the first failure aborts the whole resolution
//! 5. the ordered GPO list replaces the identity's resolution record
//!
//! When the directory is offline the last record is served instead.

use crate::config::{detect_release, PolicyConfig, OS_RELEASE_PATH};
use crate::context::RequestContext;
use crate::dump::{self, Section};
use futures::{stream, StreamExt, TryStreamExt};
use gpo_core::{
    unique_rules, DirectoryEffects, DirectoryError, Gpo, Identity, ObjectClass, PolicyError,
    PolicyObjectRef, PolicyParser, Result, Rules, TransportEffects, UniqueRules,
};
use gpo_effects::{
    CommandDirectory, DownloadCache, FilesystemTransport, ResolutionCache, TicketCacheManager,
};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use sysinfo::System;
use tracing::{debug, info, instrument, warn};

/// Ordered GPOs of one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// GPOs in precedence order, highest first
    pub gpos: Vec<Gpo>,
    /// Served from the last cached resolution because the directory was offline
    pub is_offline: bool,
}

impl Resolution {
    /// Effective entry of every (domain, key)
    pub fn unique_rules(&self) -> UniqueRules {
        unique_rules(&self.gpos)
    }
}

/// Resolves and caches policies for users and the local machine
pub struct PolicyResolver {
    hostname: String,
    max_concurrent_downloads: usize,
    parser: PolicyParser,
    tickets: TicketCacheManager,
    downloads: DownloadCache,
    resolutions: ResolutionCache,
    directory: Arc<dyn DirectoryEffects>,
}

impl std::fmt::Debug for PolicyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyResolver")
            .field("hostname", &self.hostname)
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .finish_non_exhaustive()
    }
}

impl PolicyResolver {
    /// Resolver querying the configured listing command and reading objects
    /// from the filesystem
    pub fn new(config: &PolicyConfig) -> Result<Self> {
        let directory = Arc::new(CommandDirectory::new(
            config.gpo_list_cmd.clone(),
            config.ad_server.clone(),
            config.query_timeout(),
        ));
        let transport = Arc::new(FilesystemTransport::new(config.sysvol_mount.clone()));
        Self::with_effects(config, directory, transport)
    }

    /// Resolver using the given directory and transport.
    ///
    /// Creates the private ticket and resolution record directories, so
    /// an unwritable run or cache directory fails here with `SetupFailed`.
    pub fn with_effects(
        config: &PolicyConfig,
        directory: Arc<dyn DirectoryEffects>,
        transport: Arc<dyn TransportEffects>,
    ) -> Result<Self> {
        config.validate()?;

        let release = match &config.release {
            Some(release) => release.clone(),
            None => detect_release(Path::new(OS_RELEASE_PATH))?,
        };
        let hostname = match &config.hostname {
            Some(hostname) => hostname.clone(),
            None => System::host_name().ok_or_else(|| {
                PolicyError::configuration("hostname", "cannot detect local hostname")
            })?,
        };

        let tickets =
            TicketCacheManager::new(&config.run_dir, &config.sss_cache_dir, &config.ad_domain);
        tickets.create_dir()?;
        let resolutions = ResolutionCache::new(&config.cache_dir);
        resolutions.create_dir()?;

        info!(
            release = %release,
            hostname = %hostname,
            cache_dir = %config.cache_dir.display(),
            "policy resolver ready"
        );

        Ok(Self {
            hostname,
            max_concurrent_downloads: config.max_concurrent_downloads,
            parser: PolicyParser::new(&config.distro, release),
            tickets,
            downloads: DownloadCache::new(&config.cache_dir, transport, config.download_timeout()),
            resolutions,
            directory,
        })
    }

    /// Local hostname computer identities must match
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Release multi-release overrides are resolved for
    pub fn release(&self) -> &str {
        self.parser.release()
    }

    /// Identity of the local machine
    pub fn machine_identity(&self) -> Result<Identity> {
        Identity::computer(&self.hostname)
    }

    /// Resolve the ordered GPO list of `identity`.
    ///
    /// `ticket` is the caller's Kerberos ticket; `None` reuses the private
    /// copy of the previous resolution. Computer identities always use the
    /// machine credential store.
    #[instrument(skip_all, fields(identity = %identity))]
    pub async fn get_policies(
        &self,
        ctx: &RequestContext,
        identity: &Identity,
        ticket: Option<&Path>,
    ) -> Result<Resolution> {
        self.check_mapping(identity)?;

        let prepared = self.tickets.prepare(identity, ticket).await?;

        let listed = ctx
            .bounded(self.directory.list_applicable_objects(identity, &prepared.path))
            .await
            .unwrap_or_else(|_| Err(DirectoryError::Offline("request deadline exceeded".into())));

        let objects = match listed {
            Ok(objects) => objects,
            Err(DirectoryError::Offline(reason)) => {
                return self.offline_fallback(identity, &reason).await
            }
            Err(DirectoryError::Failed(reason)) => {
                return Err(PolicyError::DirectoryQueryFailed {
                    identity: identity.name().to_string(),
                    reason,
                })
            }
        };
        info!(
            objects = objects.len(),
            ticket_refreshed = prepared.refreshed,
            "directory listed applicable objects"
        );

        let class = identity.object_class();
        let ticket = prepared.path.as_path();
        let gpos: Vec<Gpo> = stream::iter(objects)
            .map(move |object| async move { self.fetch_gpo(ctx, &object, class, ticket).await })
            .buffered(self.max_concurrent_downloads)
            .try_collect()
            .await?;

        self.resolutions.save(identity, &gpos).await?;
        info!(gpos = gpos.len(), "policies resolved");

        Ok(Resolution {
            gpos,
            is_offline: false,
        })
    }

    /// Users holding a private ticket from a previous resolution
    pub async fn list_active_users(&self) -> Result<BTreeSet<String>> {
        self.tickets.list_known_identities().await
    }

    /// When the last successful online resolution of `identity` was saved
    pub async fn last_update_for(&self, identity: &Identity) -> Result<SystemTime> {
        self.resolutions
            .last_modified(identity)
            .await?
            .ok_or_else(|| no_record(identity))
    }

    /// Listing of the cached policies of `identity`.
    ///
    /// For a user, the machine policies come first since they take
    /// precedence. Rules masked by a higher-precedence GPO are only listed
    /// with `with_overridden`.
    pub async fn dump_policies(
        &self,
        identity: &Identity,
        with_rules: bool,
        with_overridden: bool,
    ) -> Result<String> {
        info!(identity = %identity, "dumping policies");

        if identity.object_class() == ObjectClass::Computer {
            let gpos = self.load_record(identity).await?;
            return Ok(dump::render(
                &[Section {
                    title: None,
                    gpos: &gpos,
                }],
                with_rules,
                with_overridden,
            ));
        }

        let machine = self.load_record(&self.machine_identity()?).await?;
        let user = self.load_record(identity).await?;
        Ok(dump::render(
            &[
                Section {
                    title: Some("Policies from machine configuration:"),
                    gpos: &machine,
                },
                Section {
                    title: Some("Policies from user configuration:"),
                    gpos: &user,
                },
            ],
            with_rules,
            with_overridden,
        ))
    }

    fn check_mapping(&self, identity: &Identity) -> Result<()> {
        if identity.object_class() == ObjectClass::Computer
            && !identity.name().eq_ignore_ascii_case(&self.hostname)
        {
            return Err(PolicyError::IdentityMismatch {
                identity: identity.name().to_string(),
                hostname: self.hostname.clone(),
            });
        }
        Ok(())
    }

    async fn fetch_gpo(
        &self,
        ctx: &RequestContext,
        object: &PolicyObjectRef,
        class: ObjectClass,
        ticket: &Path,
    ) -> Result<Gpo> {
        let raw = self.downloads.fetch(object, ticket, ctx.deadline).await?;

        let rules = match self.parser.parse(&object.id, &raw, class) {
            Ok(rules) => rules,
            Err(e) if !e.is_fatal() => {
                debug!(gpo_id = %object.id, error = %e, "no rules for this object class");
                Rules::new()
            }
            Err(e) => return Err(e),
        };

        Ok(Gpo {
            id: object.id.clone(),
            name: object.name.clone(),
            rules,
        })
    }

    async fn offline_fallback(&self, identity: &Identity, reason: &str) -> Result<Resolution> {
        warn!(identity = %identity, reason, "directory offline, serving cached policies");
        match self.resolutions.load(identity).await? {
            Some(gpos) => Ok(Resolution {
                gpos,
                is_offline: true,
            }),
            None => Err(PolicyError::DirectoryUnreachable {
                identity: identity.name().to_string(),
            }),
        }
    }

    async fn load_record(&self, identity: &Identity) -> Result<Vec<Gpo>> {
        self.resolutions
            .load(identity)
            .await?
            .ok_or_else(|| no_record(identity))
    }
}

fn no_record(identity: &Identity) -> PolicyError {
    PolicyError::state_unavailable(format!("no policy applied for {identity}"))
}
