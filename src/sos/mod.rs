//! SOS module - contacts, dispatch, and external delivery collaborators

mod contacts;
mod channels;
mod dispatcher;

pub use contacts::{ContactRegistry, ContactUpdate, SosContact};
pub use channels::*;
pub use dispatcher::{DispatchReport, SosDispatcher};
