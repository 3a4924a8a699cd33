//! Codec implementations
//!
//! Only the G.722 sub-band ADPCM codec lives here; its decoder is the normal
//! decode path the concealment engine runs alongside.

pub mod g722;
