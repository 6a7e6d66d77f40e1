use std::sync::Arc;

use crate::application::pastes::PasteService;
use crate::infra::db::PostgresPastes;

#[derive(Clone)]
pub struct AppState {
    pub pastes: Arc<PasteService>,
    pub db: Arc<PostgresPastes>,
}
