//! Asset replacement: stage bytes in engine storage, then swap the asset.
//!
//! # Single replacement
//!
//! `write_file(filename)` first, then the kind-specific replace call. Fonts
//! take a longer path: stage, `index_font`, replace, and only then the font
//! pickers in the control registry re-read the font list. A failure at any
//! step skips the asset with a diagnostic; nothing is raised.
//!
//! # Pending batch
//!
//! Assets a scene references without embedding are fetched from an
//! [`AssetSource`] in parallel (rayon). The engine is only touched after the
//! whole batch has returned, from the calling thread. One failed fetch does
//! not stop its siblings from being wired in, but the batch as a whole
//! reports failure.

use crate::core::event_bus::EventEmitter;
use crate::core::player_events::{AssetReplacedEvent, AssetSkippedEvent};
use crate::engine::{Engine, EngineError};
use crate::entities::{AssetDescriptor, AssetKind};
use crate::widgets::ae::ControlRegistry;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Byte provider for assets. Fetches run on rayon workers.
pub trait AssetSource: Sync {
    fn fetch(&self, asset: &AssetDescriptor) -> Result<Vec<u8>>;
}

/// Reads `<root>/<filename>`.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirSource {
    fn fetch(&self, asset: &AssetDescriptor) -> Result<Vec<u8>> {
        let path = self.root.join(&asset.filename);
        std::fs::read(&path).with_context(|| format!("Failed to read asset {} from {}", asset.asset_id, path.display()))
    }
}

/// What happened to one asset.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetOutcome {
    Replaced,
    Skipped(String),
}

impl AssetOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, AssetOutcome::Replaced)
    }
}

/// Result of a pending-asset batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub wired: Vec<String>,
    pub failed: Vec<String>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct AssetPipeline {
    events: EventEmitter,
}

impl AssetPipeline {
    pub fn new(events: EventEmitter) -> Self {
        Self { events }
    }

    /// Stage `bytes` and swap the asset. Font swaps refresh font pickers in
    /// `registry` once indexing succeeded.
    pub fn replace(
        &self,
        engine: &mut dyn Engine,
        registry: Option<&mut ControlRegistry>,
        asset: &AssetDescriptor,
        bytes: &[u8],
    ) -> AssetOutcome {
        if let AssetKind::Unsupported(kind) = &asset.kind {
            return self.skip(asset, format!("unsupported asset kind '{}'", kind));
        }

        match self.wire(engine, asset, bytes) {
            Ok(()) => {
                info!("Replaced {} asset {} with {}", asset.kind, asset.asset_id, asset.filename);
                if asset.kind == AssetKind::Font
                    && let Some(registry) = registry
                {
                    registry.refresh_font_controls(&*engine);
                }
                self.events.emit(AssetReplacedEvent {
                    asset_id: asset.asset_id.clone(),
                    kind: asset.kind.clone(),
                });
                AssetOutcome::Replaced
            }
            Err(e) => self.skip(asset, e.to_string()),
        }
    }

    fn wire(&self, engine: &mut dyn Engine, asset: &AssetDescriptor, bytes: &[u8]) -> Result<(), EngineError> {
        let (id, file) = (asset.asset_id.as_str(), asset.filename.as_str());
        engine.write_file(file, bytes)?;
        debug!("Staged {} ({} bytes)", file, bytes.len());
        match &asset.kind {
            AssetKind::Image => engine.replace_image(id, file),
            AssetKind::Font => {
                engine.index_font(file)?;
                engine.replace_font(id, file)
            }
            AssetKind::Csv => engine.replace_csv(id, file),
            AssetKind::Svg => engine.replace_svg(id, file),
            AssetKind::Excel => engine.replace_excel(id, file),
            AssetKind::GoogleSheet => engine.replace_google_sheet(id, file),
            AssetKind::Unsupported(kind) => Err(EngineError::Asset {
                asset_id: id.to_string(),
                reason: format!("unsupported kind {}", kind),
            }),
        }
    }

    fn skip(&self, asset: &AssetDescriptor, reason: String) -> AssetOutcome {
        warn!("Asset {} skipped: {}", asset.asset_id, reason);
        self.events.emit(AssetSkippedEvent {
            asset_id: asset.asset_id.clone(),
            reason: reason.clone(),
        });
        AssetOutcome::Skipped(reason)
    }

    /// Fetch every pending asset concurrently, then wire the successful ones
    /// in declaration order.
    ///
    /// Runs before controls exist, so font swaps here refresh nothing.
    pub fn load_pending(
        &self,
        engine: &mut dyn Engine,
        pending: &[AssetDescriptor],
        source: &dyn AssetSource,
    ) -> BatchReport {
        if pending.is_empty() {
            return BatchReport::default();
        }
        info!("Fetching {} pending assets", pending.len());

        let fetched: Vec<(&AssetDescriptor, Result<Vec<u8>>)> =
            pending.par_iter().map(|asset| (asset, source.fetch(asset))).collect();

        let mut report = BatchReport::default();
        for (asset, bytes) in fetched {
            let outcome = match bytes {
                Ok(bytes) => self.replace(engine, None, asset, &bytes),
                Err(e) => self.skip(asset, format!("{:#}", e)),
            };
            if outcome.is_replaced() {
                report.wired.push(asset.asset_id.clone());
            } else {
                report.failed.push(asset.asset_id.clone());
            }
        }
        if !report.is_complete() {
            warn!(
                "Pending assets: {} wired, {} failed ({})",
                report.wired.len(),
                report.failed.len(),
                report.failed.join(", ")
            );
        }
        report
    }
}
