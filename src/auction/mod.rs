pub mod events;
pub mod validator;
