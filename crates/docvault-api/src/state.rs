//! Application state shared by all handlers.

use crate::auth::Authenticator;
use docvault_core::Config;
use docvault_db::UserRepository;
use docvault_services::UploadCoordinator;
use docvault_storage::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: DocumentStore,
    pub coordinator: UploadCoordinator,
    pub authenticator: Authenticator,
    /// Absent when no database is configured
    pub users: Option<UserRepository>,
}
