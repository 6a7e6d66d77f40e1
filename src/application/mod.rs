pub mod clients;
pub mod pastes;
pub mod repos;
pub mod repository;
