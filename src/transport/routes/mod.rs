pub mod gateway_routes;
pub mod player_routes;
pub mod stats_routes;

pub use gateway_routes as gateway;
pub use player_routes as player;
pub use stats_routes as stats;
