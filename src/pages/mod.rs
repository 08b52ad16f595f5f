mod auth;
mod common;
mod dashboard;
mod exercises;
mod personal;
mod plans;
mod profile;
mod routines;
mod workout;

pub use auth::{ForgotPassword, Login, Register, ResetPassword};
pub use common::PageLoading;
pub use dashboard::Dashboard;
pub use exercises::Exercises;
pub use personal::Personal;
pub use plans::{Checkout, Home, Plans};
pub use profile::Profile;
pub use routines::Routines;
pub use workout::Workout;
