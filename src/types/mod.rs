pub mod decimal;
pub mod event;
pub mod note;
pub mod time_signature;
