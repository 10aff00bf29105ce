// Legacy IDC service client
//
// Hand-written client for the `/documents/web?IdcService=...` surface.
// Responses use the `{ LocalData, ResultSets }` envelope; mutating services
// are only reachable through the local relay, which holds the session token.

pub mod client;
pub mod jobs;
pub mod models;
pub mod service;
pub mod session;
pub mod sites;

pub use client::IdcClient;
pub use models::{
    IdcResponse, IdcSite, ImportConflict, LanguageValidation, LocalData, PageValidation, Record,
    SiteProperties, SiteValidation,
};
pub use service::{
    CopySiteForm, EnterpriseCopy, IdcOperation, IdcService, MemberChange, RepositoryPrefix,
    RepositoryRef, SecureSiteMember,
};
pub use session::SessionToken;
pub use sites::FolderKind;
