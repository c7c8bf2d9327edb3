//! Use cases shared by both front ends. Handlers translate HTTP in and out;
//! everything that decides state lives here, behind the ownership guard.

mod accounts;
mod points;
mod routes;
pub mod validation;

pub use accounts::AccountService;
pub use points::PointService;
pub use routes::RouteService;
