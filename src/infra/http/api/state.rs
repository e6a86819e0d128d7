use std::sync::Arc;

use crate::application::coordinator::RequestCoordinator;
use crate::application::health::HealthService;
use crate::application::runtime::Gateway;

#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<RequestCoordinator>,
    pub health: Arc<HealthService>,
}

impl From<&Gateway> for ApiState {
    fn from(gateway: &Gateway) -> Self {
        Self {
            coordinator: gateway.coordinator(),
            health: gateway.health(),
        }
    }
}
