pub mod banner;
pub mod config;
pub mod consts;
pub mod doctor;
pub mod error;
pub mod history;
pub mod invoker;
pub mod spinner;
pub mod validate;
