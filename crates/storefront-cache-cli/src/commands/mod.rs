pub mod invalidate;
pub mod status;
