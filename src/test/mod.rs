mod campaign;
mod config;
mod sim_driver;
