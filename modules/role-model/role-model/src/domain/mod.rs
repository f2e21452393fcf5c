pub mod access;
pub mod apply;
pub mod audit;
pub mod bootstrap;
pub mod custom;
pub mod enforcer;
pub mod error;
pub mod grants;
pub mod iam;
pub mod privileges;
pub mod vocabulary;

#[cfg(test)]
mod service_test;
