mod mirror;

pub use mirror::MirrorSite;
