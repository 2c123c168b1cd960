use adviser::relay::Relay;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
}

impl AppState {
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }
}
