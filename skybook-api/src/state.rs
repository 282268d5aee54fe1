use skybook_booking::BookingServices;
use skybook_store::DbClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub services: BookingServices,
    pub auth: AuthConfig,
    /// `None` when running over the in-process store
    pub db: Option<DbClient>,
}
