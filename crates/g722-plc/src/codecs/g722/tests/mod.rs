//! G.722 Test Modules
//!
//! Codec tests independent of the concealment engine.
