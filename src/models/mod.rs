pub mod api;
pub mod attendance;
pub mod building;
pub mod calendar;
pub mod feedback;
pub mod location;
pub mod material;
pub mod signin;
pub mod user;
pub mod wecom;
