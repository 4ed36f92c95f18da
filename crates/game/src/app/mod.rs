pub(crate) mod bootstrap;
pub(crate) mod demo;
pub(crate) mod loop_runner;
pub(crate) mod platform;
