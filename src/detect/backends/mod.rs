mod descriptor;
mod stub;
#[cfg(feature = "backend-tract")]
mod tract;

pub use descriptor::DescriptorBackend;
pub use stub::StubBackend;
#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
