//! Use-case services that run the record lifecycle around repository calls.

mod post_service;

pub use post_service::PostService;
