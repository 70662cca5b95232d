pub mod compiler;
pub mod entries;
pub mod escape;
pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod sections;
pub mod store;
pub mod template;
pub mod validator;
