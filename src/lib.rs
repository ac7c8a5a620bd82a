//! Antibiotic-resistance predictions from a store of pre-trained classifiers.
//!
//! At startup the model store is loaded into a [`registry::Registry`] and the
//! encoder mapping into a [`parsing::mapping::EncoderMapping`]. A
//! [`predict::Dispatcher`] then turns each observation into the feature row
//! every model was trained on and collects one prediction per antibiotic.

pub mod config;
pub mod error;
pub mod evaluate;
pub mod logging;
pub mod model;
pub mod parsing;
pub mod predict;
pub mod registry;
pub mod server;
