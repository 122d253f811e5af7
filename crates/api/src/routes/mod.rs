mod activity;
mod badges;
mod misc;

pub use activity::activity_routes;
pub use badges::badge_routes;
pub use misc::misc_routes;
