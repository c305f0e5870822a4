pub mod lock;
pub mod recorder;
pub mod validator;
