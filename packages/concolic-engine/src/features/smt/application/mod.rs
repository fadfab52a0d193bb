//! Checker use case

pub mod checker;

pub use checker::{
    BackendFactory, Checker, CheckerError, ConfiguredBackend, ConfiguredBackendFactory,
    PredicateStateProvider,
};
