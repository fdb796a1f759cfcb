pub mod access;
pub mod account_service;
pub mod account_service_impl;
pub mod catalog_service;
pub mod catalog_service_impl;
pub mod mailer;
pub mod review_service;
pub mod review_service_impl;
pub mod tokens;

pub use access::{Access, Action, Actor, AuthenticatedActor, DenyReason, ResourceKind, Role, decide};
pub use account_service::{AccountError, AccountService, NewUser, ProfileUpdate, UserProfile};
pub use account_service_impl::SeaOrmAccountServiceImpl;
pub use catalog_service::{
    CatalogError, CatalogService, CategoryView, GenreView, NewTitle, TitlePatch, TitleView,
};
pub use catalog_service_impl::SeaOrmCatalogServiceImpl;
pub use mailer::{LogMailer, Mailer, OutgoingMail, RecordingMailer};
pub use review_service::{CommentView, ReviewError, ReviewService, ReviewView};
pub use review_service_impl::SeaOrmReviewServiceImpl;
pub use tokens::{Claims, TokenIssuer};
