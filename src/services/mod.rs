//! Business logic services

pub mod checkout;
pub mod circulation;
pub mod inventory;
pub mod reservations;
pub mod sweeper;

use crate::{config::CirculationConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub circulation: circulation::CirculationService,
    pub inventory: inventory::InventoryService,
    pub reservations: reservations::ReservationsService,
    pub checkout: checkout::CheckoutService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, circulation_config: CirculationConfig) -> Self {
        Self {
            circulation: circulation::CirculationService::new(
                repository.clone(),
                circulation_config.clone(),
            ),
            inventory: inventory::InventoryService::new(repository.clone()),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                circulation_config.clone(),
            ),
            checkout: checkout::CheckoutService::new(repository, circulation_config),
        }
    }
}
