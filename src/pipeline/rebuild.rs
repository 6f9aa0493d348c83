//! Full rebuild orchestration over the shadow slot

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::index::IndexService;
use crate::pipeline::{ChangeProcessor, StampStore};

/// Drives a zero-downtime rebuild: clear the shadow slot, repopulate it from
/// the content tree, then swap when the shadow probes healthy
pub struct RebuildCoordinator {
    service: Arc<IndexService>,
    processor: Arc<ChangeProcessor>,
    stamps: Arc<dyn StampStore>,
}

impl RebuildCoordinator {
    pub fn new(
        service: Arc<IndexService>,
        processor: Arc<ChangeProcessor>,
        stamps: Arc<dyn StampStore>,
    ) -> Self {
        Self {
            service,
            processor,
            stamps,
        }
    }

    /// Rebuild one index. Returns whether the slots were swapped; `false`
    /// either means a rebuild was already running or the shadow came up
    /// empty and the old active slot kept serving.
    pub async fn rebuild(&self, alias: &str) -> Result<bool> {
        if !self.service.start_rebuild(alias).await? {
            return Ok(false);
        }

        // Stamps describe what is in the index being built, so they restart
        // with it
        self.stamps.clear(alias).await?;

        match self.processor.reindex_all(alias).await {
            Ok(written) => {
                let swapped = self.service.complete_rebuild(alias).await?;
                info!(
                    alias = %alias,
                    written = written,
                    swapped = swapped,
                    "rebuild finished"
                );
                Ok(swapped)
            }
            Err(error) => {
                warn!(alias = %alias, error = %error, "rebuild failed, keeping active slot");
                self.service.cancel_rebuild(alias)?;
                Err(error)
            }
        }
    }
}
