use pdf_qa_core::{PipelineBuilder, ProviderCredentials, QaService, SessionRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: QaService,
    pub credentials: ProviderCredentials,
}

impl AppState {
    pub fn new(builder: PipelineBuilder, credentials: ProviderCredentials) -> Self {
        Self {
            service: QaService::new(Arc::new(SessionRegistry::new()), Arc::new(builder)),
            credentials,
        }
    }
}
