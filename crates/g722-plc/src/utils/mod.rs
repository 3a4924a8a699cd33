//! Utility modules shared by the codec core and the concealment engine

pub mod basic_ops;
