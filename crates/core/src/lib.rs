//! Domain library for the Memoria API: documents, field normalization,
//! filters, storage, chat fan-out and credentials.

pub mod auth;
pub mod chat;
pub mod document;
pub mod events;
pub mod mutation;
pub mod normalize;
pub mod query;
pub mod store;
