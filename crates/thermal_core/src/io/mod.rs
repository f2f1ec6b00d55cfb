pub mod frame;
pub mod sounding;
