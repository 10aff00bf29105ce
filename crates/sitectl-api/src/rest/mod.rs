// REST API client
//
// Hand-written async client for the sites, content and documents REST
// surfaces. Uses basic or bearer credentials on every request.

pub mod client;
pub mod content;
pub mod documents;
pub mod sites;
pub mod types;

pub use client::RestClient;
pub use documents::HOME_FOLDER;
pub use sites::SiteTransition;
