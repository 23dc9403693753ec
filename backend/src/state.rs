use std::sync::Arc;

use crate::services::enrichment_service::EnrichmentService;
use crate::services::holdings_loader::HoldingsLoader;

#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<dyn HoldingsLoader>,
    pub enricher: Arc<EnrichmentService>,
}
