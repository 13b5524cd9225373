pub mod about;
pub mod admin;
pub mod database;
pub mod detection_overlay;
pub mod history;
pub mod home;
pub mod live_detection;
pub mod navbar;
pub mod notification;
pub mod stat_card;
pub mod student_form;
