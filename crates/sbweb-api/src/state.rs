use std::sync::Arc;

use sbweb_session::SessionProvider;
use sbweb_shared::CookieSettings;

use crate::auth::Authenticator;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionProvider>,
    pub authenticator: Arc<dyn Authenticator>,
    pub cookie: CookieSettings,
}
