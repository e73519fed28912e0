mod signature;

pub use signature::SignatureMiddlewareFactory;
