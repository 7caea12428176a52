pub mod observe;

pub use observe::RequestObserver;
