pub mod scheduler;
pub mod timer;
pub mod validator;
