pub mod badges_view;
pub mod chat_view;
pub mod complaints_view;
pub mod donations_view;
pub mod login;
pub mod main_window;
pub mod notifications_view;
